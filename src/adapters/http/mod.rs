//! HTTP Adapters
//!
//! reqwest-backed implementation of the `HttpClient` port.

pub mod client;

pub use client::{ReqwestHttpClient, ReqwestHttpConfig};
