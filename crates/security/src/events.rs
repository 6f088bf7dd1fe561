//! Security events published to the UI layer.

use std::sync::Arc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::popup::PopupReason;
use crate::secure_context::SecurityLevel;

/// Event emitted by the security layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SecurityEvent {
    /// A popup was blocked.
    PopupBlocked { url: String, reason: PopupReason },
    /// A popup was allowed.
    PopupAllowed { url: String, reason: PopupReason },
    /// The security level of a URL changed.
    SecurityLevelChanged { url: String, level: SecurityLevel },
    /// Certificate retrieval or validation failed.
    CertificateError { url: String, message: String },
    /// A navigation was rejected.
    NavigationBlocked { url: String, message: String },
}

impl SecurityEvent {
    /// The URL the event refers to.
    pub fn url(&self) -> &str {
        match self {
            SecurityEvent::PopupBlocked { url, .. }
            | SecurityEvent::PopupAllowed { url, .. }
            | SecurityEvent::SecurityLevelChanged { url, .. }
            | SecurityEvent::CertificateError { url, .. }
            | SecurityEvent::NavigationBlocked { url, .. } => url,
        }
    }
}

/// Receives security events.
pub trait SecurityEventListener: Send + Sync {
    fn on_event(&self, event: &SecurityEvent);
}

impl<F> SecurityEventListener for F
where
    F: Fn(&SecurityEvent) + Send + Sync,
{
    fn on_event(&self, event: &SecurityEvent) {
        self(event)
    }
}

/// Fans events out to registered listeners.
#[derive(Default)]
pub struct EventDispatcher {
    listeners: RwLock<Vec<Arc<dyn SecurityEventListener>>>,
}

impl EventDispatcher {
    /// Create a dispatcher with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener.
    pub fn subscribe(&self, listener: Arc<dyn SecurityEventListener>) {
        self.listeners.write().push(listener);
    }

    /// Remove all listeners.
    pub fn clear(&self) {
        self.listeners.write().clear();
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Deliver an event to every listener.
    pub fn publish(&self, event: SecurityEvent) {
        tracing::debug!(?event, "security event");
        // Listeners may subscribe from inside a callback.
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            listener.on_event(&event);
        }
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_publish_reaches_all_listeners() {
        let dispatcher = EventDispatcher::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for _ in 0..2 {
            let seen = seen.clone();
            dispatcher.subscribe(Arc::new(move |event: &SecurityEvent| {
                seen.lock().push(event.url().to_string());
            }));
        }

        dispatcher.publish(SecurityEvent::SecurityLevelChanged {
            url: "https://a.com".to_string(),
            level: SecurityLevel::Secure,
        });

        assert_eq!(dispatcher.listener_count(), 2);
        assert_eq!(seen.lock().len(), 2);
    }

    #[test]
    fn test_event_serialization() {
        let event = SecurityEvent::PopupBlocked {
            url: "http://1.2.3.4/".to_string(),
            reason: PopupReason::SuspiciousDomain,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "popup_blocked");
        assert_eq!(json["reason"], "suspicious_domain");
    }
}
