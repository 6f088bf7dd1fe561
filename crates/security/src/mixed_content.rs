//! Mixed content detection.

use crate::secure_context::SecureContext;

/// Finds HTTP sub-resources referenced by an HTTPS page.
#[derive(Clone, Copy, Debug, Default)]
pub struct MixedContentScanner;

impl MixedContentScanner {
    /// Create a new scanner.
    pub fn new() -> Self {
        Self
    }

    /// Report the resources that weaken the page's transport security.
    ///
    /// Returns nothing for a non-HTTPS page. Otherwise every resource that
    /// is not HTTPS is returned in input order.
    pub fn scan<S: AsRef<str>>(&self, main_url: &str, resource_urls: &[S]) -> Vec<String> {
        if !SecureContext::is_secure_connection(main_url) {
            return Vec::new();
        }

        let mixed: Vec<String> = resource_urls
            .iter()
            .map(AsRef::as_ref)
            .filter(|resource| !SecureContext::is_secure_connection(resource))
            .map(str::to_string)
            .collect();

        if !mixed.is_empty() {
            tracing::debug!("{} mixed content resource(s) on {}", mixed.len(), main_url);
        }
        mixed
    }

    /// Check if a single resource is mixed content under a page.
    pub fn is_mixed(&self, main_url: &str, resource_url: &str) -> bool {
        SecureContext::is_secure_connection(main_url)
            && !SecureContext::is_secure_connection(resource_url)
    }
}
