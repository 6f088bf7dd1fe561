//! Domain allow/deny lists for popup blocking.

use std::collections::HashSet;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use url::Host;

/// Domains that may always open popups.
pub const TRUSTED_DOMAINS: [&str; 8] = [
    "google.com",
    "youtube.com",
    "github.com",
    "stackoverflow.com",
    "microsoft.com",
    "apple.com",
    "mozilla.org",
    "wikipedia.org",
];

/// User-editable domain lists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainList {
    /// Domains allowed to open popups.
    Whitelist,
    /// Domains never allowed to open popups.
    Blacklist,
}

impl DomainList {
    /// Get the list name.
    pub fn name(&self) -> &'static str {
        match self {
            DomainList::Whitelist => "whitelist",
            DomainList::Blacklist => "blacklist",
        }
    }
}

/// Point-in-time copy of the domain lists.
///
/// Lookups are suffix matches: the entry `example.com` covers
/// `example.com`, `ads.example.com` and also `badexample.com`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DomainPolicySnapshot {
    whitelist: HashSet<String>,
    blacklist: HashSet<String>,
    trusted: HashSet<String>,
}

impl DomainPolicySnapshot {
    /// Check if a domain is whitelisted.
    pub fn is_whitelisted(&self, domain: &str) -> bool {
        suffix_match(&self.whitelist, domain)
    }

    /// Check if a domain is blacklisted.
    pub fn is_blacklisted(&self, domain: &str) -> bool {
        suffix_match(&self.blacklist, domain)
    }

    /// Check if a domain is trusted.
    pub fn is_trusted(&self, domain: &str) -> bool {
        suffix_match(&self.trusted, domain)
    }
}

#[derive(Debug, Default)]
struct DomainLists {
    whitelist: HashSet<String>,
    blacklist: HashSet<String>,
}

impl DomainLists {
    fn get(&self, list: DomainList) -> &HashSet<String> {
        match list {
            DomainList::Whitelist => &self.whitelist,
            DomainList::Blacklist => &self.blacklist,
        }
    }

    fn get_mut(&mut self, list: DomainList) -> &mut HashSet<String> {
        match list {
            DomainList::Whitelist => &mut self.whitelist,
            DomainList::Blacklist => &mut self.blacklist,
        }
    }
}

/// Domain policy store shared between the popup engine and the settings UI.
#[derive(Debug)]
pub struct DomainPolicyStore {
    /// Whitelist and blacklist.
    lists: RwLock<DomainLists>,
    /// Built-in trusted domains.
    trusted: HashSet<String>,
}

impl DomainPolicyStore {
    /// Create a store with empty lists and the built-in trusted domains.
    pub fn new() -> Self {
        Self {
            lists: RwLock::new(DomainLists::default()),
            trusted: TRUSTED_DOMAINS.iter().map(|d| d.to_string()).collect(),
        }
    }

    /// Create a store pre-populated with whitelist and blacklist entries.
    pub fn with_lists<W, B>(whitelist: W, blacklist: B) -> Self
    where
        W: IntoIterator,
        W::Item: AsRef<str>,
        B: IntoIterator,
        B::Item: AsRef<str>,
    {
        let store = Self::new();
        for domain in whitelist {
            store.add(DomainList::Whitelist, domain.as_ref());
        }
        for domain in blacklist {
            store.add(DomainList::Blacklist, domain.as_ref());
        }
        store
    }

    /// Add a domain to a list. Adding an existing entry is a no-op.
    pub fn add(&self, list: DomainList, domain: &str) {
        let domain = normalize(domain);
        if domain.is_empty() {
            return;
        }
        if self.lists.write().get_mut(list).insert(domain.clone()) {
            tracing::info!("Added {} to popup {}", domain, list.name());
        }
    }

    /// Remove a domain from a list. Removing a missing entry is a no-op.
    pub fn remove(&self, list: DomainList, domain: &str) {
        let domain = normalize(domain);
        if self.lists.write().get_mut(list).remove(&domain) {
            tracing::info!("Removed {} from popup {}", domain, list.name());
        }
    }

    /// Check if a domain is whitelisted.
    pub fn is_whitelisted(&self, domain: &str) -> bool {
        suffix_match(&self.lists.read().whitelist, domain)
    }

    /// Check if a domain is blacklisted.
    pub fn is_blacklisted(&self, domain: &str) -> bool {
        suffix_match(&self.lists.read().blacklist, domain)
    }

    /// Check if a domain is trusted.
    pub fn is_trusted(&self, domain: &str) -> bool {
        suffix_match(&self.trusted, domain)
    }

    /// Clear the whitelist and blacklist. Trusted domains are kept.
    pub fn clear(&self) {
        let mut lists = self.lists.write();
        lists.whitelist.clear();
        lists.blacklist.clear();
        tracing::info!("Cleared popup whitelist and blacklist");
    }

    /// Copy the current lists for a decision.
    pub fn snapshot(&self) -> DomainPolicySnapshot {
        let lists = self.lists.read();
        DomainPolicySnapshot {
            whitelist: lists.whitelist.clone(),
            blacklist: lists.blacklist.clone(),
            trusted: self.trusted.clone(),
        }
    }

    /// Get the entries of a list, sorted.
    pub fn entries(&self, list: DomainList) -> Vec<String> {
        let mut entries: Vec<String> = self.lists.read().get(list).iter().cloned().collect();
        entries.sort();
        entries
    }

    /// Get the whitelist entries, sorted.
    pub fn whitelist(&self) -> Vec<String> {
        self.entries(DomainList::Whitelist)
    }

    /// Get the blacklist entries, sorted.
    pub fn blacklist(&self) -> Vec<String> {
        self.entries(DomainList::Blacklist)
    }

    /// Number of entries in a list.
    pub fn len(&self, list: DomainList) -> usize {
        self.lists.read().get(list).len()
    }

    /// Check if both user lists are empty.
    pub fn is_empty(&self) -> bool {
        let lists = self.lists.read();
        lists.whitelist.is_empty() && lists.blacklist.is_empty()
    }
}

impl Default for DomainPolicyStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Lower-case a domain and convert internationalized names to the ASCII
/// form `url` produces for hosts. Text that is not a valid host is only
/// lower-cased.
fn normalize(domain: &str) -> String {
    let domain = domain.trim().to_lowercase();
    match Host::parse(&domain) {
        Ok(Host::Domain(ascii)) => ascii,
        Ok(Host::Ipv4(addr)) => addr.to_string(),
        Ok(Host::Ipv6(addr)) => addr.to_string(),
        Err(_) => domain,
    }
}

fn suffix_match(entries: &HashSet<String>, domain: &str) -> bool {
    let domain = normalize(domain);
    if domain.is_empty() {
        return false;
    }
    entries.iter().any(|entry| domain.ends_with(entry.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suffix_match() {
        let store = DomainPolicyStore::new();
        store.add(DomainList::Whitelist, "example.com");

        assert!(store.is_whitelisted("example.com"));
        assert!(store.is_whitelisted("ads.example.com"));
        assert!(!store.is_whitelisted("example.org"));
    }

    #[test]
    fn test_case_insensitive() {
        let store = DomainPolicyStore::new();
        store.add(DomainList::Blacklist, "Spam.NET");

        assert!(store.is_blacklisted("spam.net"));
        assert!(store.is_blacklisted("WWW.SPAM.NET"));
        assert_eq!(store.blacklist(), vec!["spam.net".to_string()]);
    }

    #[test]
    fn test_internationalized_entries() {
        let store = DomainPolicyStore::new();
        store.add(DomainList::Blacklist, "bücher.de");
        store.add(DomainList::Whitelist, "Straße.de");

        assert_eq!(store.blacklist(), vec!["xn--bcher-kva.de".to_string()]);
        assert!(store.is_blacklisted("xn--bcher-kva.de"));
        assert!(store.is_blacklisted("shop.BÜCHER.de"));
        assert!(store.is_whitelisted("straße.de"));

        store.remove(DomainList::Blacklist, "BÜCHER.DE");
        assert!(!store.is_blacklisted("bücher.de"));
    }

    #[test]
    fn test_add_remove_idempotent() {
        let store = DomainPolicyStore::new();
        store.add(DomainList::Whitelist, "a.com");
        store.add(DomainList::Whitelist, "A.com");
        assert_eq!(store.len(DomainList::Whitelist), 1);

        store.remove(DomainList::Whitelist, "a.com");
        store.remove(DomainList::Whitelist, "a.com");
        store.remove(DomainList::Blacklist, "never-added.com");
        assert!(store.is_empty());
    }

    #[test]
    fn test_empty_domain_never_matches() {
        let store = DomainPolicyStore::new();
        store.add(DomainList::Whitelist, "example.com");
        store.add(DomainList::Whitelist, "   ");

        assert_eq!(store.len(DomainList::Whitelist), 1);
        assert!(!store.is_whitelisted(""));
        assert!(!store.is_trusted(""));
    }

    #[test]
    fn test_trusted_domains() {
        let store = DomainPolicyStore::new();
        assert!(store.is_trusted("github.com"));
        assert!(store.is_trusted("en.wikipedia.org"));
        assert!(store.is_trusted("Docs.Google.com"));
        assert!(!store.is_trusted("example.com"));
    }

    #[test]
    fn test_clear_keeps_trusted() {
        let store = DomainPolicyStore::with_lists(["a.com"], ["b.com"]);
        assert!(!store.is_empty());

        store.clear();
        assert!(store.is_empty());
        assert!(!store.is_whitelisted("a.com"));
        assert!(!store.is_blacklisted("b.com"));
        assert!(store.is_trusted("mozilla.org"));
    }

    #[test]
    fn test_snapshot_is_detached() {
        let store = DomainPolicyStore::new();
        store.add(DomainList::Blacklist, "evil.com");
        let snapshot = store.snapshot();

        store.remove(DomainList::Blacklist, "evil.com");
        assert!(snapshot.is_blacklisted("evil.com"));
        assert!(!store.is_blacklisted("evil.com"));
        assert!(snapshot.is_trusted("apple.com"));
    }
}
