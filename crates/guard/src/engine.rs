//! Guard engine - coordinates the security subsystems for the UI layer.

use std::collections::HashMap;
use std::sync::Arc;
use parking_lot::RwLock;
use url::Url;

use browser_security::{
    BlockingStats, DomainPolicyStore, EventDispatcher, MixedContentScanner, NavigationDecision,
    NavigationError, NavigationFilter, PopupBlocker, PopupRequest, PopupVerdict,
    SecurityEvent, SecurityEventListener, SecurityLevel, WindowType,
};
use common::{GuardError, GuardResult};
use networking::{CertificateSnapshot, CertificateValidator, TlsError};

use crate::config::GuardConfig;

/// The guard engine.
pub struct GuardEngine {
    /// Guard configuration.
    config: GuardConfig,
    /// Event fan-out shared with the popup blocker.
    events: Arc<EventDispatcher>,
    popups: PopupBlocker,
    navigation: NavigationFilter,
    certificates: CertificateValidator,
    mixed_content: MixedContentScanner,
    /// Last level published per origin.
    levels: RwLock<HashMap<String, SecurityLevel>>,
}

impl GuardEngine {
    /// Create a new guard engine.
    pub fn new(config: GuardConfig) -> GuardResult<Self> {
        config.validate()?;

        let policy = Arc::new(DomainPolicyStore::with_lists(
            &config.popup_whitelist,
            &config.popup_blacklist,
        ));
        let events = Arc::new(EventDispatcher::new());
        let popups = PopupBlocker::new(policy, events.clone());
        popups.set_enabled(config.popup_blocking_enabled);

        let certificates = CertificateValidator::with_config(config.validator_config())
            .map_err(|e| GuardError::network(e.to_string()))?;

        Ok(Self {
            config,
            events,
            popups,
            navigation: NavigationFilter::new(),
            certificates,
            mixed_content: MixedContentScanner::new(),
            levels: RwLock::new(HashMap::new()),
        })
    }

    /// Create with default configuration.
    pub fn with_defaults() -> GuardResult<Self> {
        Self::new(GuardConfig::default())
    }

    /// Register an event listener.
    pub fn subscribe(&self, listener: Arc<dyn SecurityEventListener>) {
        self.events.subscribe(listener);
    }

    /// Decide whether a page may open a new browsing context.
    pub fn on_window_creation_requested(&self, source_url: &str, window_type: WindowType) -> bool {
        tracing::debug!("{} requested a new {}", source_url, window_type.name());
        self.check_popup(&PopupRequest::new(source_url)).is_allowed()
    }

    /// Decide a popup request.
    pub fn check_popup(&self, request: &PopupRequest) -> PopupVerdict {
        self.popups.check(request)
    }

    /// Decide whether page content may navigate to a URL.
    pub fn on_navigation_requested(&self, url: &str) -> bool {
        match self.navigation.on_navigation_requested(url) {
            NavigationDecision::Allow => true,
            NavigationDecision::Deny(err) => {
                self.events.publish(SecurityEvent::NavigationBlocked {
                    url: url.to_string(),
                    message: err.to_string(),
                });
                false
            }
        }
    }

    /// Validate a URL the user asked to load.
    pub fn check_user_load(&self, url: &str) -> Result<Url, NavigationError> {
        self.navigation.check_user_load(url)
    }

    /// Compute the security level of a URL and publish it if it changed
    /// for the URL's origin.
    pub async fn security_level(&self, url: &str) -> SecurityLevel {
        let (level, failure) = self.certificates.assess(url).await;
        if let Some(err) = failure {
            self.events.publish(SecurityEvent::CertificateError {
                url: url.to_string(),
                message: err.to_string(),
            });
        }

        self.publish_level(url, level);
        level
    }

    fn publish_level(&self, url: &str, level: SecurityLevel) {
        let previous = self.levels.write().insert(origin_key(url), level);
        if previous != Some(level) {
            self.events.publish(SecurityEvent::SecurityLevelChanged {
                url: url.to_string(),
                level,
            });
        }
    }

    /// Forget the last published level for a URL's origin, e.g. when its
    /// tab closes.
    pub fn forget(&self, url: &str) {
        self.levels.write().remove(&origin_key(url));
    }

    /// Forget all published levels.
    pub fn clear_levels(&self) {
        self.levels.write().clear();
    }

    /// Number of origins with a published level.
    pub fn tracked_origins(&self) -> usize {
        self.levels.read().len()
    }

    /// Retrieve certificate details for the certificate viewer.
    pub async fn certificate_details(&self, url: &str) -> Result<CertificateSnapshot, TlsError> {
        self.certificates.inspect(url).await
    }

    /// Report HTTP resources of an HTTPS page.
    pub fn scan_mixed_content<S: AsRef<str>>(&self, main_url: &str, resource_urls: &[S]) -> Vec<String> {
        self.mixed_content.scan(main_url, resource_urls)
    }

    /// The popup domain lists.
    pub fn policy(&self) -> &Arc<DomainPolicyStore> {
        self.popups.policy()
    }

    /// Enable or disable popup blocking.
    pub fn set_popup_blocking_enabled(&self, enabled: bool) {
        self.popups.set_enabled(enabled);
    }

    /// Check if popup blocking is enabled.
    pub fn is_popup_blocking_enabled(&self) -> bool {
        self.popups.is_enabled()
    }

    /// Popup blocking statistics.
    pub fn blocking_stats(&self) -> BlockingStats {
        self.popups.stats()
    }

    /// The certificate validator.
    pub fn certificates(&self) -> &CertificateValidator {
        &self.certificates
    }

    /// Get configuration.
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }
}

/// Key for per-origin state. Unparsable URLs key on their own text.
fn origin_key(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed.origin().ascii_serialization(),
        Err(_) => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use browser_security::{DomainList, PopupReason};
    use parking_lot::Mutex;

    fn recording_engine(config: GuardConfig) -> (GuardEngine, Arc<Mutex<Vec<SecurityEvent>>>) {
        let engine = GuardEngine::new(config).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        engine.subscribe(Arc::new(move |event: &SecurityEvent| {
            sink.lock().push(event.clone());
        }));
        (engine, seen)
    }

    #[test]
    fn test_engine_creation() {
        let engine = GuardEngine::with_defaults().unwrap();
        assert!(engine.is_popup_blocking_enabled());
        assert_eq!(engine.blocking_stats().total_blocked, 0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = GuardConfig::new().with_connection_timeout(0);
        assert!(GuardEngine::new(config).is_err());
    }

    #[test]
    fn test_window_creation() {
        let (engine, seen) = recording_engine(GuardConfig::new().with_whitelisted("example.com"));

        assert!(engine.on_window_creation_requested("https://www.example.com/", WindowType::BrowserTab));
        assert!(engine.on_window_creation_requested("https://github.com/", WindowType::WebDialog));
        assert!(!engine.on_window_creation_requested("https://unknown.org/", WindowType::BrowserWindow));

        let seen = seen.lock();
        assert_eq!(seen.len(), 3);
        assert_eq!(
            seen[2],
            SecurityEvent::PopupBlocked {
                url: "https://unknown.org/".to_string(),
                reason: PopupReason::DefaultDeny,
            }
        );
    }

    #[test]
    fn test_popup_blocking_toggle() {
        let engine = GuardEngine::new(GuardConfig::permissive().with_blacklisted("evil.com")).unwrap();
        assert!(engine.on_window_creation_requested("http://evil.com/", WindowType::BrowserTab));

        engine.set_popup_blocking_enabled(true);
        assert!(!engine.on_window_creation_requested("http://evil.com/", WindowType::BrowserTab));
        assert_eq!(engine.blocking_stats().blacklist_size, 1);
    }

    #[test]
    fn test_policy_updates_apply() {
        let engine = GuardEngine::with_defaults().unwrap();
        assert!(!engine.on_window_creation_requested("https://docs.rs/", WindowType::BrowserTab));

        engine.policy().add(DomainList::Whitelist, "docs.rs");
        assert!(engine.on_window_creation_requested("https://docs.rs/", WindowType::BrowserTab));
    }

    #[test]
    fn test_navigation_events() {
        let (engine, seen) = recording_engine(GuardConfig::default());
        assert!(engine.on_navigation_requested("https://example.com/"));
        assert!(!engine.on_navigation_requested("javascript:alert(1)"));

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(matches!(seen[0], SecurityEvent::NavigationBlocked { .. }));
    }

    #[test]
    fn test_mixed_content() {
        let engine = GuardEngine::with_defaults().unwrap();
        let mixed = engine.scan_mixed_content("https://a.com", &["https://b.com/x", "http://c.com/y"]);
        assert_eq!(mixed, vec!["http://c.com/y"]);
    }

    #[tokio::test]
    async fn test_security_level_published_on_change() {
        let (engine, seen) = recording_engine(GuardConfig::default());

        assert_eq!(engine.security_level("http://a.com/").await, SecurityLevel::Insecure);
        assert_eq!(engine.security_level("http://a.com/").await, SecurityLevel::Insecure);

        let seen = seen.lock();
        assert_eq!(
            *seen,
            vec![SecurityEvent::SecurityLevelChanged {
                url: "http://a.com/".to_string(),
                level: SecurityLevel::Insecure,
            }]
        );
    }

    #[tokio::test]
    async fn test_levels_tracked_per_origin() {
        let (engine, seen) = recording_engine(GuardConfig::default());

        for i in 0..50 {
            let url = format!("http://a.com/page?id={}", i);
            assert_eq!(engine.security_level(&url).await, SecurityLevel::Insecure);
        }
        engine.security_level("http://b.com/").await;
        assert_eq!(engine.tracked_origins(), 2);
        assert_eq!(seen.lock().len(), 2);

        engine.forget("http://a.com/other");
        assert_eq!(engine.tracked_origins(), 1);
        engine.security_level("http://a.com/again").await;
        assert_eq!(seen.lock().len(), 3);

        engine.clear_levels();
        assert_eq!(engine.tracked_origins(), 0);
    }

    #[test]
    fn test_origin_key() {
        assert_eq!(origin_key("https://Example.com:443/a?b=c"), "https://example.com");
        assert_eq!(origin_key("http://example.com:8080/"), "http://example.com:8080");
        assert_eq!(origin_key("not a url"), "not a url");
    }

    #[tokio::test]
    async fn test_unreachable_https_is_warning() {
        let (engine, seen) = recording_engine(GuardConfig::new().with_connection_timeout(5));

        let level = engine.security_level("https://127.0.0.1:1/").await;
        assert_eq!(level, SecurityLevel::Warning);

        let seen = seen.lock();
        assert!(matches!(seen[0], SecurityEvent::CertificateError { .. }));
        assert!(matches!(
            seen[1],
            SecurityEvent::SecurityLevelChanged { level: SecurityLevel::Warning, .. }
        ));
    }
}
