//! Networking layer for the browser's connection-trust checks.
//!
//! This crate handles:
//! - TLS handshakes against WebPKI roots
//! - Server certificate parsing
//! - Expiry and hostname validation
//! - Security level classification
//! - Certificate caching

pub mod error;
pub mod connection;
pub mod certificate;
pub mod cache;
pub mod validator;

pub use error::{FailureKind, TlsError};
pub use connection::ConnectionKey;
pub use certificate::{CertificateSnapshot, SanEntry, SanType};
pub use cache::CertificateCache;
pub use validator::{CertificateValidator, ValidatorConfig};
