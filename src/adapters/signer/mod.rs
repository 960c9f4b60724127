//! Signer Adapters
//!
//! In-process key custody for the `Signer` port.

pub mod local;

pub use local::LocalSigner;
