//! Guard configuration.

use std::path::Path;
use std::time::Duration;
use common::{GuardError, GuardResult};
use networking::ValidatorConfig;
use serde::{Deserialize, Serialize};

/// Guard configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardConfig {
    /// Whether popups are checked at all.
    pub popup_blocking_enabled: bool,
    /// Domains allowed to open popups.
    pub popup_whitelist: Vec<String>,
    /// Domains never allowed to open popups.
    pub popup_blacklist: Vec<String>,
    /// TLS connect and handshake timeout in seconds.
    pub connection_timeout: u64,
    /// Certificate cache lifetime in seconds, 0 to disable.
    pub certificate_cache_ttl: u64,
}

impl GuardConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration with popup blocking turned off.
    pub fn permissive() -> Self {
        Self {
            popup_blocking_enabled: false,
            ..Self::default()
        }
    }

    /// Configuration that caches certificates for a minute.
    pub fn cached() -> Self {
        Self {
            certificate_cache_ttl: 60,
            ..Self::default()
        }
    }

    /// Load configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> GuardResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Parse configuration from JSON text.
    pub fn from_json_str(text: &str) -> GuardResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check field ranges.
    pub fn validate(&self) -> GuardResult<()> {
        if self.connection_timeout == 0 {
            return Err(GuardError::config("connection_timeout must be at least 1 second"));
        }
        Ok(())
    }

    /// Set popup blocking.
    pub fn with_popup_blocking(mut self, enabled: bool) -> Self {
        self.popup_blocking_enabled = enabled;
        self
    }

    /// Add a whitelisted domain.
    pub fn with_whitelisted(mut self, domain: &str) -> Self {
        self.popup_whitelist.push(domain.to_string());
        self
    }

    /// Add a blacklisted domain.
    pub fn with_blacklisted(mut self, domain: &str) -> Self {
        self.popup_blacklist.push(domain.to_string());
        self
    }

    /// Set the connection timeout in seconds.
    pub fn with_connection_timeout(mut self, secs: u64) -> Self {
        self.connection_timeout = secs;
        self
    }

    /// Set the certificate cache lifetime in seconds.
    pub fn with_certificate_cache_ttl(mut self, secs: u64) -> Self {
        self.certificate_cache_ttl = secs;
        self
    }

    /// Settings for the certificate validator.
    pub fn validator_config(&self) -> ValidatorConfig {
        ValidatorConfig {
            connect_timeout: Duration::from_secs(self.connection_timeout),
            cache_ttl: Duration::from_secs(self.certificate_cache_ttl),
        }
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            popup_blocking_enabled: true,
            popup_whitelist: Vec::new(),
            popup_blacklist: Vec::new(),
            connection_timeout: 10,
            certificate_cache_ttl: 0,
        }
    }
}
