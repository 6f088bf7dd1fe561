//! Common types shared by the guard crates.

pub mod error;

pub use error::{GuardError, GuardResult};
