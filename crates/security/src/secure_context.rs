//! Connection security classification.

use std::fmt;
use serde::{Deserialize, Serialize};
use url::Url;

/// Security level shown in the address bar.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityLevel {
    /// Not served over HTTPS.
    Insecure,
    /// HTTPS, but the certificate failed validation or could not be checked.
    Warning,
    /// HTTPS with a validated certificate.
    Secure,
}

impl SecurityLevel {
    /// Get the level name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityLevel::Insecure => "insecure",
            SecurityLevel::Warning => "warning",
            SecurityLevel::Secure => "secure",
        }
    }

    /// Check if this level is secure.
    pub fn is_secure(&self) -> bool {
        matches!(self, SecurityLevel::Secure)
    }

    /// Indicator glyph for the address bar.
    pub fn indicator(&self) -> &'static str {
        match self {
            SecurityLevel::Secure => "🔒",
            SecurityLevel::Warning | SecurityLevel::Insecure => "⚠️",
        }
    }

    /// Indicator tooltip for the address bar.
    pub fn tooltip(&self) -> &'static str {
        match self {
            SecurityLevel::Secure => "Secure connection",
            SecurityLevel::Warning => "Certificate could not be verified",
            SecurityLevel::Insecure => "Insecure connection",
        }
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Secure connection checks on raw URL strings.
#[derive(Clone, Copy, Debug, Default)]
pub struct SecureContext;

impl SecureContext {
    /// Check if a URL uses HTTPS. Unparsable input is not secure.
    pub fn is_secure_connection(url: &str) -> bool {
        Url::parse(url)
            .map(|url| Self::is_secure_url(&url))
            .unwrap_or(false)
    }

    /// Check if a parsed URL uses HTTPS.
    pub fn is_secure_url(url: &Url) -> bool {
        url.scheme() == "https"
    }

    /// Classify a URL given the outcome of certificate validation.
    ///
    /// Non-HTTPS URLs are `Insecure` whatever the validation outcome.
    pub fn classify(url: &str, certificate_valid: bool) -> SecurityLevel {
        if !Self::is_secure_connection(url) {
            SecurityLevel::Insecure
        } else if certificate_valid {
            SecurityLevel::Secure
        } else {
            SecurityLevel::Warning
        }
    }
}
