//! Short-lived cache of retrieved server certificates.
//!
//! Entries hold the certificate itself, not a validation result, so every
//! lookup is re-validated by the caller against the current time.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::certificate::CertificateSnapshot;
use crate::connection::ConnectionKey;

#[derive(Clone, Debug)]
struct CacheEntry {
    certificate: Arc<CertificateSnapshot>,
    expires: Instant,
}

impl CacheEntry {
    fn is_usable(&self, now: DateTime<Utc>) -> bool {
        Instant::now() < self.expires && !self.certificate.is_expired_at(now)
    }
}

/// Certificate cache keyed by host and port.
#[derive(Debug)]
pub struct CertificateCache {
    entries: RwLock<HashMap<ConnectionKey, CacheEntry>>,
    ttl: Duration,
}

impl CertificateCache {
    /// Create a cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Get a cached certificate. Stale or expired entries are dropped.
    pub fn get(&self, key: &ConnectionKey, now: DateTime<Utc>) -> Option<Arc<CertificateSnapshot>> {
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if entry.is_usable(now) => return Some(entry.certificate.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        let mut entries = self.entries.write();
        match entries.get(key) {
            Some(entry) if entry.is_usable(now) => Some(entry.certificate.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store a certificate, replacing any previous one for the key.
    /// Unusable entries for other keys are dropped at the same time.
    pub fn insert(&self, key: ConnectionKey, certificate: CertificateSnapshot) -> Arc<CertificateSnapshot> {
        let certificate = Arc::new(certificate);
        let entry = CacheEntry {
            certificate: certificate.clone(),
            expires: Instant::now() + self.ttl,
        };

        let now = Utc::now();
        let mut entries = self.entries.write();
        entries.retain(|existing, cached| existing == &key || cached.is_usable(now));
        if let Some(previous) = entries.insert(key.clone(), entry) {
            if previous.certificate.fingerprint_sha256 != certificate.fingerprint_sha256 {
                tracing::info!("Certificate for {} changed", key);
            }
        }
        certificate
    }

    /// Drop the entry for a key.
    pub fn invalidate(&self, key: &ConnectionKey) {
        self.entries.write().remove(key);
    }

    /// Drop all entries.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Remove entries that are no longer usable.
    pub fn cleanup(&self, now: DateTime<Utc>) {
        self.entries.write().retain(|_, entry| entry.is_usable(now));
    }

    /// Number of entries, including stale ones not yet cleaned up.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Entry lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::tests::snapshot;

    fn key() -> ConnectionKey {
        ConnectionKey::new("example.com", 443)
    }

    #[test]
    fn test_cache_hit() {
        let cache = CertificateCache::new(Duration::from_secs(60));
        let now = Utc::now();
        cache.insert(key(), snapshot("example.com", &[], now + chrono::Duration::days(10)));

        let cached = cache.get(&key(), now).unwrap();
        assert_eq!(cached.common_name(), Some("example.com"));
        assert!(cache.get(&ConnectionKey::new("example.com", 8443), now).is_none());
    }

    #[test]
    fn test_expired_certificate_not_served() {
        let cache = CertificateCache::new(Duration::from_secs(3600));
        let now = Utc::now();
        cache.insert(key(), snapshot("example.com", &[], now + chrono::Duration::seconds(5)));

        assert!(cache.get(&key(), now).is_some());
        assert!(cache.get(&key(), now + chrono::Duration::seconds(10)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_ttl_elapsed() {
        let cache = CertificateCache::new(Duration::ZERO);
        let now = Utc::now();
        cache.insert(key(), snapshot("example.com", &[], now + chrono::Duration::days(10)));
        assert!(cache.get(&key(), now).is_none());
    }

    #[test]
    fn test_replace_and_invalidate() {
        let cache = CertificateCache::new(Duration::from_secs(60));
        let now = Utc::now();
        let later = now + chrono::Duration::days(10);
        cache.insert(key(), snapshot("old.example.com", &[], later));
        cache.insert(key(), snapshot("new.example.com", &[], later));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key(), now).unwrap().common_name(), Some("new.example.com"));

        cache.invalidate(&key());
        assert!(cache.get(&key(), now).is_none());
    }

    #[test]
    fn test_insert_prunes_unusable_entries() {
        let cache = CertificateCache::new(Duration::from_secs(60));
        let now = Utc::now();
        cache.insert(ConnectionKey::new("old.com", 443), snapshot("old", &[], now - chrono::Duration::days(1)));
        cache.insert(ConnectionKey::new("gone.com", 443), snapshot("gone", &[], now - chrono::Duration::days(2)));
        assert_eq!(cache.len(), 1);

        cache.insert(key(), snapshot("example.com", &[], now + chrono::Duration::days(10)));
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&key(), now).is_some());
    }

    #[test]
    fn test_stale_lookup_keeps_replacement() {
        let cache = CertificateCache::new(Duration::from_secs(60));
        let now = Utc::now();
        cache.insert(key(), snapshot("example.com", &[], now + chrono::Duration::seconds(5)));

        let later = now + chrono::Duration::seconds(10);
        cache.insert(key(), snapshot("example.com", &[], now + chrono::Duration::days(10)));
        assert!(cache.get(&key(), later).is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cleanup() {
        let cache = CertificateCache::new(Duration::from_secs(60));
        let now = Utc::now();
        cache.insert(key(), snapshot("a", &[], now - chrono::Duration::days(1)));
        cache.insert(ConnectionKey::new("b.com", 443), snapshot("b", &[], now + chrono::Duration::days(1)));

        cache.cleanup(now);
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.is_empty());
    }
}
