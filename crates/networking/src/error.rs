//! TLS and certificate errors.

use std::time::Duration;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Certificate retrieval and validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TlsError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("URL has no host: {0}")]
    MissingHost(String),
    #[error("Not a secure URL (scheme {0})")]
    NotSecure(String),
    #[error("TLS configuration error: {0}")]
    Config(String),
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Connection timed out after {0:?}")]
    Timeout(Duration),
    #[error("SSL error: {0}")]
    Handshake(String),
    #[error("Server presented no certificate")]
    MissingCertificate,
    #[error("Malformed certificate: {0}")]
    CertificateFormat(String),
    #[error("Certificate expired at {not_after}")]
    Expired { not_after: DateTime<Utc> },
    #[error("Certificate does not match host {0}")]
    HostnameMismatch(String),
}

/// Coarse failure classes used for logging and UI.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The input URL could not be used.
    UrlParse,
    /// TLS negotiation failed.
    Handshake,
    /// TCP connection failed or timed out.
    Connection,
    /// The certificate could not be read.
    CertificateFormat,
    /// The certificate was read but is not valid for the host.
    Validation,
}

impl TlsError {
    /// Classify the error.
    pub fn kind(&self) -> FailureKind {
        match self {
            TlsError::InvalidUrl(_) | TlsError::MissingHost(_) | TlsError::NotSecure(_) => {
                FailureKind::UrlParse
            }
            TlsError::Config(_) | TlsError::Handshake(_) => FailureKind::Handshake,
            TlsError::Connection(_) | TlsError::Timeout(_) => FailureKind::Connection,
            TlsError::MissingCertificate | TlsError::CertificateFormat(_) => {
                FailureKind::CertificateFormat
            }
            TlsError::Expired { .. } | TlsError::HostnameMismatch(_) => FailureKind::Validation,
        }
    }

    /// Check if this is a TLS negotiation failure.
    pub fn is_handshake_error(&self) -> bool {
        self.kind() == FailureKind::Handshake
    }

    /// Check if this is a network-level failure.
    pub fn is_connection_error(&self) -> bool {
        self.kind() == FailureKind::Connection
    }
}

impl From<url::ParseError> for TlsError {
    fn from(err: url::ParseError) -> Self {
        TlsError::InvalidUrl(err.to_string())
    }
}
