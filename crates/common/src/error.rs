//! Common error types.

use thiserror::Error;

/// Error type for the application edge: configuration, I/O and input parsing.
#[derive(Error, Debug)]
pub enum GuardError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigFormat(#[from] serde_json::Error),

    #[error("Network error: {0}")]
    Network(String),
}

pub type GuardResult<T> = Result<T, GuardError>;

impl GuardError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }
}
