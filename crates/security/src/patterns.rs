//! URL and domain heuristics for popup blocking.

use once_cell::sync::Lazy;
use regex::Regex;

/// Rules that mark a URL as popup, ad or malicious content.
const POPUP_RULES: [&str; 19] = [
    r"popup",
    r"pop-up",
    r"advertisement",
    r"ads\.",
    r"advert",
    r"banner",
    r"sponsored",
    r"promo",
    r"offer",
    r"deal",
    r"casino",
    r"gambling",
    r"adult",
    r"xxx",
    r"porn",
    r"malware",
    r"virus",
    r"scam",
    r"phishing",
];

/// Rules that mark a domain as suspicious.
const SUSPICIOUS_RULES: [&str; 6] = [
    // IPv4 literal
    r"\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}",
    // long random-looking label
    r"[a-z]{10,}\.com",
    r"-ads?[-.]",
    r"click",
    r"track",
    r"affiliate",
];

static POPUP_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| compile(&POPUP_RULES));
static SUSPICIOUS_PATTERNS: Lazy<Vec<(&'static str, Regex)>> =
    Lazy::new(|| compile(&SUSPICIOUS_RULES));

fn compile(rules: &[&'static str]) -> Vec<(&'static str, Regex)> {
    rules
        .iter()
        .map(|rule| (*rule, Regex::new(rule).expect("built-in pattern rule must compile")))
        .collect()
}

fn first_match(patterns: &[(&'static str, Regex)], text: &str) -> Option<&'static str> {
    let text = text.to_lowercase();
    patterns
        .iter()
        .find(|(_, pattern)| pattern.is_match(&text))
        .map(|(rule, _)| *rule)
}

/// Stateless matcher over the built-in rule sets.
#[derive(Clone, Copy, Debug, Default)]
pub struct PatternMatcher;

impl PatternMatcher {
    /// Create a new matcher.
    pub fn new() -> Self {
        Self
    }

    /// Check if text contains any popup/ad pattern (case-insensitive).
    pub fn matches_popup_pattern(&self, text: &str) -> bool {
        self.popup_match(text).is_some()
    }

    /// Get the first popup rule matching the text.
    pub fn popup_match(&self, text: &str) -> Option<&'static str> {
        first_match(&POPUP_PATTERNS, text)
    }

    /// Check if a domain has a suspicious shape.
    pub fn is_suspicious_domain(&self, domain: &str) -> bool {
        self.suspicious_match(domain).is_some()
    }

    /// Get the first suspicious-domain rule matching the domain.
    pub fn suspicious_match(&self, domain: &str) -> Option<&'static str> {
        first_match(&SUSPICIOUS_PATTERNS, domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_popup_patterns() {
        let matcher = PatternMatcher::new();
        assert!(matcher.matches_popup_pattern("https://example.com/popup.html"));
        assert!(matcher.matches_popup_pattern("https://ads.example.com/"));
        assert!(matcher.matches_popup_pattern("https://CASINO-royale.net"));
        assert!(!matcher.matches_popup_pattern("https://example.com/docs"));
    }

    #[test]
    fn test_ads_requires_dot() {
        let matcher = PatternMatcher::new();
        assert!(!matcher.matches_popup_pattern("https://example.com/loads"));
        assert!(matcher.matches_popup_pattern("https://example.com/uploads.php"));
    }

    #[test]
    fn test_popup_match_reports_first_rule() {
        let matcher = PatternMatcher::new();
        assert_eq!(matcher.popup_match("https://x.com/pop-up/promo"), Some("pop-up"));
        assert_eq!(matcher.popup_match("https://ads.x.com"), Some(r"ads\."));
        assert_eq!(matcher.popup_match("https://x.com"), None);
    }

    #[test]
    fn test_suspicious_ip_literal() {
        let matcher = PatternMatcher::new();
        assert!(matcher.is_suspicious_domain("123.45.67.89"));
        assert!(matcher.is_suspicious_domain("10.0.0.1"));
        assert!(!matcher.is_suspicious_domain("example.com"));
    }

    #[test]
    fn test_suspicious_long_label() {
        let matcher = PatternMatcher::new();
        assert!(matcher.is_suspicious_domain("qwertyuiopasdf.com"));
        assert!(!matcher.is_suspicious_domain("shortname.com"));
        assert!(!matcher.is_suspicious_domain("qwertyuiopasdf.org"));
    }

    #[test]
    fn test_suspicious_tokens() {
        let matcher = PatternMatcher::new();
        assert!(matcher.is_suspicious_domain("my-ads.net"));
        assert!(matcher.is_suspicious_domain("get-ad-now.net"));
        assert!(matcher.is_suspicious_domain("clickbait.net"));
        assert!(matcher.is_suspicious_domain("Tracker.io"));
        assert!(matcher.is_suspicious_domain("shop-affiliate.net"));
        assert!(!matcher.is_suspicious_domain("adobe.net"));
        assert_eq!(matcher.suspicious_match("1.2.3.4"), Some(r"\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}"));
    }
}
