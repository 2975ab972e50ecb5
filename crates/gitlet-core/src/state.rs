//! The persisted repository-state record.
//!
//! Everything mutable lives here: branch tips, the active branch, the head
//! hash, the removal set, and the remote registry. Stored as JSON at
//! `.gitlet/Management` and rewritten atomically at the end of each command,
//! after all object writes, so a crash mid-command leaves at worst some
//! orphaned (content-addressed, harmless) objects behind.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GitletError, GitletResult};
use crate::fsutil::atomic_write;

/// The mutable repository metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepoState {
    /// Branch name → tip commit hash.
    pub branches: BTreeMap<String, String>,
    /// Name of the active branch; always a key of `branches`.
    pub current_branch: String,
    /// Hash of the commit the working directory is at.
    pub head: String,
    /// Paths staged for removal, in insertion order, deduplicated.
    #[serde(default)]
    pub removal: Vec<String>,
    /// Remote name → filesystem path of the peer repository.
    #[serde(default)]
    pub remotes: BTreeMap<String, PathBuf>,
    /// Set while a merge has already reported a conflict, so the
    /// "no changes" message is not printed on top of it. Always persisted
    /// as false — every command resets it before the final write.
    #[serde(default)]
    pub output: bool,
}

impl RepoState {
    /// Load the state record from disk.
    pub fn load(path: &Path) -> GitletResult<Self> {
        let data = fs::read(path)?;
        Ok(serde_json::from_slice(&data)?)
    }

    /// Save the state record atomically.
    pub fn save(&self, path: &Path) -> GitletResult<()> {
        let json = serde_json::to_vec_pretty(self)?;
        atomic_write(path, &json)
    }

    /// Create the branch or move its tip.
    pub fn set_branch_tip(&mut self, name: &str, hash: &str) {
        self.branches.insert(name.to_string(), hash.to_string());
    }

    /// Tip hash of the named branch.
    pub fn branch_tip(&self, name: &str) -> GitletResult<&str> {
        self.branches
            .get(name)
            .map(String::as_str)
            .ok_or(GitletError::NoSuchBranch)
    }

    /// Stage a path for removal, keeping the set deduplicated.
    pub fn add_removal(&mut self, name: &str) {
        if !self.removal.iter().any(|f| f == name) {
            self.removal.push(name.to_string());
        }
    }

    /// Drop a path from the removal set, if present.
    pub fn delete_from_removal(&mut self, name: &str) {
        self.removal.retain(|f| f != name);
    }

    /// Clear the removal set.
    pub fn clear_removal(&mut self) {
        self.removal.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Management");

        let mut state = RepoState::default();
        state.set_branch_tip("master", "abc123");
        state.current_branch = "master".to_string();
        state.head = "abc123".to_string();
        state.save(&path).unwrap();

        let loaded = RepoState::load(&path).unwrap();
        assert_eq!(loaded.branch_tip("master").unwrap(), "abc123");
        assert_eq!(loaded.current_branch, "master");
        assert_eq!(loaded.head, "abc123");
        assert!(loaded.removal.is_empty());
        assert!(!loaded.output);
    }

    #[test]
    fn test_load_missing_fails() {
        let dir = tempdir().unwrap();
        let result = RepoState::load(&dir.path().join("Management"));
        assert!(result.is_err());
    }

    #[test]
    fn test_branch_tip_unknown() {
        let state = RepoState::default();
        assert!(matches!(
            state.branch_tip("nope"),
            Err(GitletError::NoSuchBranch)
        ));
    }

    #[test]
    fn test_removal_deduplicates() {
        let mut state = RepoState::default();
        state.add_removal("a.txt");
        state.add_removal("b.txt");
        state.add_removal("a.txt");
        assert_eq!(state.removal, vec!["a.txt".to_string(), "b.txt".to_string()]);

        state.delete_from_removal("a.txt");
        assert_eq!(state.removal, vec!["b.txt".to_string()]);

        state.clear_removal();
        assert!(state.removal.is_empty());
    }

    #[test]
    fn test_branch_tip_moves() {
        let mut state = RepoState::default();
        state.set_branch_tip("dev", "one");
        state.set_branch_tip("dev", "two");
        assert_eq!(state.branch_tip("dev").unwrap(), "two");
        assert_eq!(state.branches.len(), 1);
    }
}
