//! Server certificate validation.

use std::sync::Arc;
use std::time::Duration;
use browser_security::{SecureContext, SecurityLevel};
use chrono::Utc;
use tokio_rustls::TlsConnector;
use url::Url;

use crate::cache::CertificateCache;
use crate::certificate::CertificateSnapshot;
use crate::connection::{fetch_peer_certificate, webpki_connector, ConnectionKey};
use crate::error::TlsError;

/// Validator configuration.
#[derive(Clone, Debug)]
pub struct ValidatorConfig {
    /// Bound on TCP connect plus TLS handshake.
    pub connect_timeout: Duration,
    /// Certificate cache lifetime. Zero disables the cache.
    pub cache_ttl: Duration,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            cache_ttl: Duration::ZERO,
        }
    }
}

/// Retrieves and checks server certificates.
pub struct CertificateValidator {
    connector: TlsConnector,
    config: ValidatorConfig,
    cache: Option<CertificateCache>,
}

impl CertificateValidator {
    /// Create a validator with default configuration.
    pub fn new() -> Result<Self, TlsError> {
        Self::with_config(ValidatorConfig::default())
    }

    /// Create a validator with custom configuration.
    pub fn with_config(config: ValidatorConfig) -> Result<Self, TlsError> {
        let cache = if config.cache_ttl.is_zero() {
            None
        } else {
            Some(CertificateCache::new(config.cache_ttl))
        };

        Ok(Self {
            connector: webpki_connector()?,
            config,
            cache,
        })
    }

    /// Get validator configuration.
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Check if a URL uses HTTPS.
    pub fn is_secure_connection(&self, url: &str) -> bool {
        SecureContext::is_secure_connection(url)
    }

    /// Validate the certificate served for a URL.
    ///
    /// Non-HTTPS URLs have no certificate and validate trivially; classify
    /// them with [`Self::security_level`] instead.
    pub async fn validate_certificate(&self, url: &str) -> Result<(), TlsError> {
        let parsed = Url::parse(url)?;
        if !SecureContext::is_secure_url(&parsed) {
            return Ok(());
        }

        let key = ConnectionKey::from_url(&parsed)?;
        let certificate = self.certificate_for(&key).await?;
        certificate.validate_for_host(&key.host, Utc::now())
    }

    /// Security level for the address bar.
    pub async fn security_level(&self, url: &str) -> SecurityLevel {
        self.assess(url).await.0
    }

    /// Security level together with the validation failure behind a
    /// `Warning`, if any.
    pub async fn assess(&self, url: &str) -> (SecurityLevel, Option<TlsError>) {
        if !self.is_secure_connection(url) {
            return (SecurityLevel::Insecure, None);
        }

        match self.validate_certificate(url).await {
            Ok(()) => (SecurityLevel::Secure, None),
            Err(err) => {
                tracing::warn!("Certificate validation failed for {}: {}", url, err);
                (SecurityLevel::Warning, Some(err))
            }
        }
    }

    /// Retrieve certificate details for a URL.
    pub async fn inspect(&self, url: &str) -> Result<CertificateSnapshot, TlsError> {
        let parsed = Url::parse(url)?;
        let key = ConnectionKey::from_url(&parsed)?;
        let certificate = self.certificate_for(&key).await?;
        Ok(certificate.as_ref().clone())
    }

    /// Drop any cached certificate for the URL's host and port.
    pub fn invalidate(&self, url: &str) {
        let key = Url::parse(url)
            .ok()
            .and_then(|parsed| ConnectionKey::from_url(&parsed).ok());
        if let (Some(cache), Some(key)) = (&self.cache, key) {
            cache.invalidate(&key);
        }
    }

    /// Drop all cached certificates.
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    /// Number of cached certificates.
    pub fn cached_count(&self) -> usize {
        self.cache.as_ref().map_or(0, CertificateCache::len)
    }

    async fn certificate_for(&self, key: &ConnectionKey) -> Result<Arc<CertificateSnapshot>, TlsError> {
        if let Some(cached) = self.cache.as_ref().and_then(|cache| cache.get(key, Utc::now())) {
            tracing::debug!("Using cached certificate for {}", key);
            return Ok(cached);
        }

        tracing::debug!("Fetching certificate for {}", key);
        let der = fetch_peer_certificate(&self.connector, key, self.config.connect_timeout).await?;
        let certificate = CertificateSnapshot::from_der(&der)?;

        Ok(match &self.cache {
            Some(cache) => cache.insert(key.clone(), certificate),
            None => Arc::new(certificate),
        })
    }
}

impl std::fmt::Debug for CertificateValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateValidator")
            .field("config", &self.config)
            .field("cached", &self.cached_count())
            .finish()
    }
}
