//! Navigation and window creation gating.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// URL fragments that are never navigated to.
const DANGEROUS_FRAGMENTS: [&str; 3] = ["data:text/html", "javascript:", "vbscript:"];

/// Schemes a user may load directly.
const LOADABLE_SCHEMES: [&str; 3] = ["http", "https", "file"];

/// Navigation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavigationError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Unsafe URL scheme: {0}")]
    UnsafeScheme(String),
    #[error("Blocked dangerous URL pattern: {0}")]
    DangerousPattern(&'static str),
}

/// Kind of browsing context the page asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowType {
    /// Foreground tab.
    BrowserTab,
    /// Separate browser window.
    BrowserWindow,
    /// Dialog-style window without browser chrome.
    WebDialog,
    /// Tab opened without focus.
    BackgroundTab,
}

impl WindowType {
    /// Get the window type name.
    pub fn name(&self) -> &'static str {
        match self {
            WindowType::BrowserTab => "tab",
            WindowType::BrowserWindow => "window",
            WindowType::WebDialog => "dialog",
            WindowType::BackgroundTab => "background-tab",
        }
    }
}

/// Whether a navigation may proceed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NavigationDecision {
    /// Navigation is allowed.
    Allow,
    /// Navigation is denied.
    Deny(NavigationError),
}

impl NavigationDecision {
    /// Check if the navigation is allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, NavigationDecision::Allow)
    }
}

/// Filters navigations requested by pages and URLs loaded by the user.
#[derive(Clone, Copy, Debug, Default)]
pub struct NavigationFilter;

impl NavigationFilter {
    /// Create a new filter.
    pub fn new() -> Self {
        Self
    }

    /// Get the first dangerous fragment contained in a URL.
    pub fn dangerous_pattern(&self, url: &str) -> Option<&'static str> {
        let url = url.to_lowercase();
        DANGEROUS_FRAGMENTS
            .iter()
            .copied()
            .find(|fragment| url.contains(fragment))
    }

    /// Decide a navigation requested by page content.
    pub fn on_navigation_requested(&self, url: &str) -> NavigationDecision {
        match self.dangerous_pattern(url) {
            Some(fragment) => {
                tracing::warn!("Blocked navigation to {}: contains {}", url, fragment);
                NavigationDecision::Deny(NavigationError::DangerousPattern(fragment))
            }
            None => NavigationDecision::Allow,
        }
    }

    /// Validate a URL the user asked to load.
    pub fn check_user_load(&self, url: &str) -> Result<Url, NavigationError> {
        let parsed =
            Url::parse(url.trim()).map_err(|e| NavigationError::InvalidUrl(e.to_string()))?;
        if !LOADABLE_SCHEMES.contains(&parsed.scheme()) {
            return Err(NavigationError::UnsafeScheme(parsed.scheme().to_string()));
        }
        Ok(parsed)
    }
}
