//! Popup blocking.
//!
//! [`PopupDecisionEngine`] is a pure function of a request and a snapshot
//! of the domain lists. [`PopupBlocker`] wraps it with the enable switch,
//! the shared [`DomainPolicyStore`], statistics and event publication.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain_policy::{DomainList, DomainPolicySnapshot, DomainPolicyStore};
use crate::events::{EventDispatcher, SecurityEvent};
use crate::patterns::PatternMatcher;

/// A request to open a new browsing context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PopupRequest {
    /// URL of the page asking for the popup.
    pub source_url: String,
    /// URL the popup would load, when known.
    pub popup_url: Option<String>,
}

impl PopupRequest {
    /// Create a request without a target URL.
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            popup_url: None,
        }
    }

    /// Set the popup target URL.
    pub fn with_popup_url(mut self, popup_url: impl Into<String>) -> Self {
        self.popup_url = Some(popup_url.into());
        self
    }
}

/// Why a popup was allowed or blocked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopupReason {
    /// Source domain is whitelisted.
    Whitelisted,
    /// Source domain is blacklisted.
    Blacklisted,
    /// Source domain is a built-in trusted domain.
    Trusted,
    /// Popup URL matches a popup pattern.
    PopupPatternMatch,
    /// Source URL matches a popup pattern.
    SourcePatternMatch,
    /// Source domain looks suspicious.
    SuspiciousDomain,
    /// No rule allowed the popup.
    DefaultDeny,
    /// The request could not be evaluated.
    ErrorFallback,
    /// Popup blocking is turned off.
    BlockingDisabled,
}

impl PopupReason {
    /// Human readable description.
    pub fn description(&self) -> &'static str {
        match self {
            PopupReason::Whitelisted => "Domain whitelisted",
            PopupReason::Blacklisted => "Domain blacklisted",
            PopupReason::Trusted => "Trusted domain",
            PopupReason::PopupPatternMatch => "Matches popup patterns",
            PopupReason::SourcePatternMatch => "Source matches popup patterns",
            PopupReason::SuspiciousDomain => "Suspicious domain",
            PopupReason::DefaultDeny => "Default popup blocking",
            PopupReason::ErrorFallback => "Error in popup detection",
            PopupReason::BlockingDisabled => "Popup blocking disabled",
        }
    }
}

impl fmt::Display for PopupReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Outcome of a popup decision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PopupVerdict {
    /// Whether the popup is blocked.
    pub blocked: bool,
    /// The rule that decided.
    pub reason: PopupReason,
    /// Matched pattern or error text, for diagnostics.
    pub detail: Option<String>,
}

impl PopupVerdict {
    fn allow(reason: PopupReason) -> Self {
        Self {
            blocked: false,
            reason,
            detail: None,
        }
    }

    fn block(reason: PopupReason) -> Self {
        Self {
            blocked: true,
            reason,
            detail: None,
        }
    }

    fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Check if the popup is allowed.
    pub fn is_allowed(&self) -> bool {
        !self.blocked
    }

    /// Check if the verdict came from the error path rather than a policy rule.
    pub fn is_error_fallback(&self) -> bool {
        self.reason == PopupReason::ErrorFallback
    }
}

/// Extract the lower-cased host of a URL. URLs without a host yield "".
pub fn url_domain(url: &str) -> Result<String, url::ParseError> {
    let parsed = Url::parse(url.trim())?;
    Ok(parsed
        .host_str()
        .map(|host| host.trim_start_matches('[').trim_end_matches(']').to_lowercase())
        .unwrap_or_default())
}

/// Evaluates popup requests against the domain lists and URL heuristics.
#[derive(Clone, Copy, Debug, Default)]
pub struct PopupDecisionEngine {
    matcher: PatternMatcher,
}

impl PopupDecisionEngine {
    /// Create a new engine.
    pub fn new() -> Self {
        Self {
            matcher: PatternMatcher::new(),
        }
    }

    /// Decide a request. The first matching rule wins:
    /// whitelist, blacklist, trusted, popup URL pattern, source URL
    /// pattern, suspicious domain, then default deny.
    pub fn decide(&self, request: &PopupRequest, policy: &DomainPolicySnapshot) -> PopupVerdict {
        let domain = match url_domain(&request.source_url) {
            Ok(domain) => domain,
            Err(err) => {
                return PopupVerdict::block(PopupReason::ErrorFallback)
                    .with_detail(format!("invalid source URL: {}", err));
            }
        };

        if policy.is_whitelisted(&domain) {
            return PopupVerdict::allow(PopupReason::Whitelisted);
        }
        if policy.is_blacklisted(&domain) {
            return PopupVerdict::block(PopupReason::Blacklisted);
        }
        if policy.is_trusted(&domain) {
            return PopupVerdict::allow(PopupReason::Trusted);
        }

        if let Some(rule) = request
            .popup_url
            .as_deref()
            .and_then(|popup_url| self.matcher.popup_match(popup_url))
        {
            return PopupVerdict::block(PopupReason::PopupPatternMatch).with_detail(rule);
        }
        if let Some(rule) = self.matcher.popup_match(&request.source_url) {
            return PopupVerdict::block(PopupReason::SourcePatternMatch).with_detail(rule);
        }
        if let Some(rule) = self.matcher.suspicious_match(&domain) {
            return PopupVerdict::block(PopupReason::SuspiciousDomain).with_detail(rule);
        }

        // Over-blocks ordinary new tabs from unlisted sites; kept as the
        // documented default-deny policy.
        PopupVerdict::block(PopupReason::DefaultDeny)
    }
}

/// Popup blocking statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BlockingStats {
    pub total_blocked: u64,
    pub total_allowed: u64,
    pub whitelist_size: usize,
    pub blacklist_size: usize,
}

/// Popup blocker: the decision engine plus its shared state and events.
#[derive(Debug)]
pub struct PopupBlocker {
    engine: PopupDecisionEngine,
    policy: Arc<DomainPolicyStore>,
    events: Arc<EventDispatcher>,
    enabled: AtomicBool,
    blocked: AtomicU64,
    allowed: AtomicU64,
}

impl PopupBlocker {
    /// Create an enabled blocker over a policy store.
    pub fn new(policy: Arc<DomainPolicyStore>, events: Arc<EventDispatcher>) -> Self {
        Self {
            engine: PopupDecisionEngine::new(),
            policy,
            events,
            enabled: AtomicBool::new(true),
            blocked: AtomicU64::new(0),
            allowed: AtomicU64::new(0),
        }
    }

    /// Create a blocker with its own store and no listeners.
    pub fn standalone() -> Self {
        Self::new(
            Arc::new(DomainPolicyStore::new()),
            Arc::new(EventDispatcher::new()),
        )
    }

    /// Enable or disable popup blocking.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
        tracing::info!("Popup blocking {}", if enabled { "enabled" } else { "disabled" });
    }

    /// Check if popup blocking is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// The shared policy store.
    pub fn policy(&self) -> &Arc<DomainPolicyStore> {
        &self.policy
    }

    /// Decide a request and publish the verdict.
    pub fn check(&self, request: &PopupRequest) -> PopupVerdict {
        if !self.is_enabled() {
            return PopupVerdict::allow(PopupReason::BlockingDisabled);
        }

        let verdict = self.engine.decide(request, &self.policy.snapshot());
        self.record(request, &verdict);
        verdict
    }

    /// Convenience wrapper returning only whether to block.
    pub fn should_block_popup(&self, source_url: &str, popup_url: Option<&str>) -> bool {
        let mut request = PopupRequest::new(source_url);
        request.popup_url = popup_url.map(str::to_string);
        self.check(&request).blocked
    }

    fn record(&self, request: &PopupRequest, verdict: &PopupVerdict) {
        let url = match (verdict.reason, &request.popup_url) {
            (PopupReason::PopupPatternMatch, Some(popup_url)) => popup_url.clone(),
            _ => request.source_url.clone(),
        };

        if verdict.blocked {
            self.blocked.fetch_add(1, Ordering::Relaxed);
            if verdict.is_error_fallback() {
                tracing::warn!(
                    "Blocked popup from {}: {}",
                    url,
                    verdict.detail.as_deref().unwrap_or_default()
                );
            } else {
                tracing::debug!("Blocked popup from {}: {}", url, verdict.reason);
            }
            self.events.publish(SecurityEvent::PopupBlocked {
                url,
                reason: verdict.reason,
            });
        } else {
            self.allowed.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Allowed popup from {}: {}", url, verdict.reason);
            self.events.publish(SecurityEvent::PopupAllowed {
                url,
                reason: verdict.reason,
            });
        }
    }

    /// Get blocking statistics.
    pub fn stats(&self) -> BlockingStats {
        BlockingStats {
            total_blocked: self.blocked.load(Ordering::Relaxed),
            total_allowed: self.allowed.load(Ordering::Relaxed),
            whitelist_size: self.policy.len(DomainList::Whitelist),
            blacklist_size: self.policy.len(DomainList::Blacklist),
        }
    }
}
