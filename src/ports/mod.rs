//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the domain/usecases layer
//! requires from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `Clock`: Wall time, injectable for deterministic tests
//! - `ExchangeAdapter`: Per-venue URL and response shape
//! - `HttpClient`: Certified GET against exchange APIs
//! - `Signer`: Signatures and public keys per curve

pub mod clock;
pub mod exchange;
pub mod http_client;
pub mod signer;
