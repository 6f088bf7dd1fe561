//! Oxide Guard - connection-trust and content-gating layer for the browser.
//!
//! This crate wires the security components together for the UI layer:
//! - Popup and window-creation blocking
//! - Navigation filtering
//! - TLS certificate validation and security indicators
//! - Mixed content detection

pub mod config;
pub mod engine;

pub use config::GuardConfig;
pub use engine::GuardEngine;

/// Guard version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
