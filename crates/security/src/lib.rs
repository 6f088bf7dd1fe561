//! Browser security features.
//!
//! This crate implements the content-gating side of the security layer:
//! - Popup blocking with domain lists and URL heuristics
//! - Navigation filtering for dangerous URL schemes
//! - Mixed content detection
//! - Connection security classification
//! - Security event dispatch

pub mod domain_policy;
pub mod patterns;
pub mod popup;
pub mod navigation;
pub mod mixed_content;
pub mod secure_context;
pub mod events;

pub use domain_policy::{DomainList, DomainPolicySnapshot, DomainPolicyStore, TRUSTED_DOMAINS};
pub use patterns::PatternMatcher;
pub use popup::{BlockingStats, PopupBlocker, PopupDecisionEngine, PopupReason, PopupRequest, PopupVerdict};
pub use navigation::{NavigationDecision, NavigationError, NavigationFilter, WindowType};
pub use mixed_content::MixedContentScanner;
pub use secure_context::{SecureContext, SecurityLevel};
pub use events::{EventDispatcher, SecurityEvent, SecurityEventListener};
