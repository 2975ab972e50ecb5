//! Commits — immutable snapshot records in the history DAG.
//!
//! A commit carries a message, a millisecond timestamp, up to two parent
//! hashes, and the mapping of tracked paths to blob hashes. Commits are
//! stored under the SHA-1 of their serialized form, so the encoding must be
//! canonical: field order is fixed by declaration, `tracked` is a `BTreeMap`
//! (keys serialize sorted), and the timestamp is a plain integer.

use std::collections::BTreeMap;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Message carried by the root commit of every repository.
pub const INITIAL_MESSAGE: &str = "initial commit";

/// An immutable commit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Commit {
    /// Commit message.
    pub message: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    /// Parent commit hashes: empty for the initial commit, one for an
    /// ordinary commit, two for a merge (`parents[0]` is the current-branch
    /// side).
    #[serde(default)]
    pub parents: Vec<String>,
    /// Tracked paths mapped to their blob hashes.
    #[serde(default)]
    pub tracked: BTreeMap<String, String>,
}

impl Commit {
    /// The initial commit shared by every repository: fixed message, epoch
    /// timestamp, no parents, nothing tracked. Content addressing makes it
    /// hash identically everywhere, so any two repositories always share at
    /// least one ancestor.
    pub fn initial() -> Self {
        Commit {
            message: INITIAL_MESSAGE.to_string(),
            timestamp_ms: 0,
            parents: Vec::new(),
            tracked: BTreeMap::new(),
        }
    }

    /// Create a commit stamped with the current wall-clock time.
    pub fn new(message: &str, parents: Vec<String>, tracked: BTreeMap<String, String>) -> Self {
        Commit {
            message: message.to_string(),
            timestamp_ms: Utc::now().timestamp_millis(),
            parents,
            tracked,
        }
    }

    /// The first parent — the linear-history predecessor.
    pub fn first_parent(&self) -> Option<&str> {
        self.parents.first().map(String::as_str)
    }

    /// Parent hash by index, if present.
    pub fn parent(&self, index: usize) -> Option<&str> {
        self.parents.get(index).map(String::as_str)
    }

    /// True iff this commit has two parents.
    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// Render the timestamp for log output, e.g.
    /// `Thu Jan 01 00:00:00 1970 +0000` (local timezone).
    pub fn date_string(&self) -> String {
        let utc = DateTime::from_timestamp_millis(self.timestamp_ms)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        utc.with_timezone(&Local)
            .format("%a %b %d %H:%M:%S %Y %z")
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_commit_fields() {
        let c = Commit::initial();
        assert_eq!(c.message, "initial commit");
        assert_eq!(c.timestamp_ms, 0);
        assert!(c.parents.is_empty());
        assert!(c.tracked.is_empty());
        assert!(!c.is_merge());
    }

    #[test]
    fn test_initial_commit_hashes_identically() {
        let a = serde_json::to_vec(&Commit::initial()).unwrap();
        let b = serde_json::to_vec(&Commit::initial()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_parent_accessors() {
        let c = Commit::new(
            "merge",
            vec!["aaa".to_string(), "bbb".to_string()],
            BTreeMap::new(),
        );
        assert_eq!(c.first_parent(), Some("aaa"));
        assert_eq!(c.parent(1), Some("bbb"));
        assert_eq!(c.parent(2), None);
        assert!(c.is_merge());
    }

    #[test]
    fn test_serialization_round_trip_is_stable() {
        let mut tracked = BTreeMap::new();
        tracked.insert("b.txt".to_string(), "hash-b".to_string());
        tracked.insert("a.txt".to_string(), "hash-a".to_string());
        let c = Commit {
            message: "m".to_string(),
            timestamp_ms: 123_456_789,
            parents: vec!["parent".to_string()],
            tracked,
        };

        let bytes = serde_json::to_vec(&c).unwrap();
        let back: Commit = serde_json::from_slice(&bytes).unwrap();
        let bytes2 = serde_json::to_vec(&back).unwrap();
        assert_eq!(bytes, bytes2);
        assert_eq!(c, back);
    }

    #[test]
    fn test_date_string_epoch() {
        let c = Commit::initial();
        let date = c.date_string();
        // Local timezone varies; the year and the shape do not.
        assert!(date.contains("1970"), "unexpected date: {date}");
        assert_eq!(date.split(' ').count(), 6);
    }
}
