use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Reserved all-zero identifier. A source carrying it is visible to everyone.
pub const GLOBAL_SCOPE: &str = "00000000-0000-0000-0000-000000000000";

/// ScopeId is an opaque grant boundary: the global wildcard, a user id,
/// a group id or a chat id. Which one it is only becomes known by set
/// membership at authorization time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopeId(String);

impl ScopeId {
    /// Parses a raw scope id, returning None for malformed input
    /// (empty, whitespace-only, or containing control characters).
    pub fn parse(raw: &str) -> Option<ScopeId> {
        if is_malformed(raw) {
            return None;
        }
        Some(ScopeId(raw.to_string()))
    }

    #[must_use]
    pub fn global() -> ScopeId {
        ScopeId(GLOBAL_SCOPE.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_global(&self) -> bool {
        self.0 == GLOBAL_SCOPE
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

fn is_malformed(raw: &str) -> bool {
    raw.trim().is_empty() || raw.chars().any(char::is_control)
}

/// Drops malformed entries, keeping the order of the rest.
pub fn filter_scope_ids<I, S>(raw: I) -> Vec<ScopeId>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .filter_map(|s| ScopeId::parse(s.as_ref()))
        .collect()
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ScopeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ScopeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<ScopeId> for String {
    fn from(s: ScopeId) -> Self {
        s.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(ScopeId::parse("").is_none());
        assert!(ScopeId::parse("   ").is_none());
        assert!(ScopeId::parse("abc\ndef").is_none());
        assert_eq!(ScopeId::parse("g1").unwrap().as_str(), "g1");
    }

    #[test]
    fn test_global() {
        assert!(ScopeId::global().is_global());
        assert!(ScopeId::parse(GLOBAL_SCOPE).unwrap().is_global());
        assert!(!ScopeId::parse("user-1").unwrap().is_global());
    }

    #[test]
    fn test_filter_keeps_order() {
        let ids = filter_scope_ids(["b", "", "a", " \t", "c"]);
        let ids: Vec<&str> = ids.iter().map(ScopeId::as_str).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }
}
