//! Remote synchronization: add-remote/rm-remote, push, fetch, pull.
//!
//! A remote is a plain directory with the same layout as `.gitlet`
//! (`Management`, `blobs/`, `commits/`). All transfer is ordinary file
//! copying; because objects are content-addressed, overwriting an existing
//! object with the same name is always safe.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{GitletError, GitletResult};
use crate::fsutil::plain_filenames_in;
use crate::merge::MergeSummary;
use crate::repo::{Repository, MASTER_BRANCH, STATE_FILE};
use crate::state::RepoState;

/// Copy every plain file from one object directory into another.
fn copy_all(from: &Path, to: &Path) -> GitletResult<()> {
    fs::create_dir_all(to)?;
    for name in plain_filenames_in(from)? {
        fs::copy(from.join(&name), to.join(&name))?;
    }
    Ok(())
}

impl Repository {
    /// Register a peer repository directory under a name. Forward slashes
    /// in the supplied path are normalized to the host separator.
    pub fn add_remote(&self, name: &str, path: &str) -> GitletResult<()> {
        let _lock = self.lock()?;
        let mut state = self.load_state()?;
        if state.remotes.contains_key(name) {
            return Err(GitletError::RemoteExists);
        }
        let normalized = path.replace('/', std::path::MAIN_SEPARATOR_STR);
        state.remotes.insert(name.to_string(), PathBuf::from(normalized));
        self.save_state(&state)
    }

    /// Forget a registered remote. Objects already fetched stay put.
    pub fn rm_remote(&self, name: &str) -> GitletResult<()> {
        let _lock = self.lock()?;
        let mut state = self.load_state()?;
        if state.remotes.remove(name).is_none() {
            return Err(GitletError::NoSuchRemote);
        }
        self.save_state(&state)
    }

    fn remote_root(&self, state: &RepoState, name: &str) -> GitletResult<PathBuf> {
        let root = state
            .remotes
            .get(name)
            .cloned()
            .ok_or(GitletError::NoSuchRemote)?;
        if !root.is_dir() {
            return Err(GitletError::NoRemoteDir);
        }
        Ok(root)
    }

    /// Push the local head to a peer branch.
    ///
    /// If the peer already has the branch, its tip must lie on the local
    /// head's first-parent chain; otherwise the push is refused. All local
    /// objects are copied over, the peer branch tip is set to the local
    /// head, and pushing `master` also moves the peer's head.
    pub fn push(&self, name: &str, branch: &str) -> GitletResult<()> {
        let _lock = self.lock()?;
        let state = self.load_state()?;
        let remote = self.remote_root(&state, name)?;

        let peer_state_path = remote.join(STATE_FILE);
        let mut peer = RepoState::load(&peer_state_path)?;
        let local_head = state.head.clone();

        if let Some(tip) = peer.branches.get(branch).cloned() {
            let mut hash = local_head.clone();
            let found = loop {
                if hash == tip {
                    break true;
                }
                match self.objects.get_commit(&hash)?.first_parent() {
                    Some(parent) => hash = parent.to_string(),
                    None => break false,
                }
            };
            if !found {
                return Err(GitletError::PushNotFastForward);
            }
        }

        copy_all(&self.gitlet_dir.join("blobs"), &remote.join("blobs"))?;
        copy_all(&self.gitlet_dir.join("commits"), &remote.join("commits"))?;

        peer.set_branch_tip(branch, &local_head);
        if branch == MASTER_BRANCH {
            peer.head = local_head;
        }
        peer.save(&peer_state_path)
    }

    /// Copy a peer's objects locally and point the remote-tracking branch
    /// `<name>/<branch>` at the peer's tip. The working tree is untouched.
    pub fn fetch(&self, name: &str, branch: &str) -> GitletResult<()> {
        let _lock = self.lock()?;
        let mut state = self.load_state()?;
        let remote = self.remote_root(&state, name)?;

        let peer = RepoState::load(&remote.join(STATE_FILE))?;
        let tip = peer
            .branches
            .get(branch)
            .cloned()
            .ok_or(GitletError::NoSuchRemoteBranch)?;

        copy_all(&remote.join("blobs"), &self.gitlet_dir.join("blobs"))?;
        copy_all(&remote.join("commits"), &self.gitlet_dir.join("commits"))?;

        state.set_branch_tip(&format!("{name}/{branch}"), &tip);
        self.save_state(&state)
    }

    /// Fetch, then merge the remote-tracking branch into the current one.
    pub fn pull(&self, name: &str, branch: &str) -> GitletResult<MergeSummary> {
        self.fetch(name, branch)?;
        self.merge(&format!("{name}/{branch}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    fn write_file(root: &Path, name: &str, content: &str) {
        fs::write(root.join(name), content).unwrap();
    }

    /// Two freshly initialized repositories side by side, with the peer's
    /// `.gitlet` registered as remote "origin" in the local one.
    fn local_and_peer(dir: &tempfile::TempDir) -> (Repository, Repository) {
        let local_root = dir.path().join("local");
        let peer_root = dir.path().join("peer");
        fs::create_dir_all(&local_root).unwrap();
        fs::create_dir_all(&peer_root).unwrap();

        let local = Repository::init(&local_root).unwrap();
        let peer = Repository::init(&peer_root).unwrap();

        let remote_path = peer_root.join(".gitlet");
        local
            .add_remote("origin", remote_path.to_str().unwrap())
            .unwrap();
        (local, peer)
    }

    #[test]
    fn test_add_remote_duplicate_fails() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();

        repo.add_remote("origin", "/tmp/somewhere").unwrap();
        assert!(matches!(
            repo.add_remote("origin", "/tmp/elsewhere"),
            Err(GitletError::RemoteExists)
        ));
    }

    #[test]
    fn test_rm_remote() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();

        repo.add_remote("origin", "/tmp/somewhere").unwrap();
        repo.rm_remote("origin").unwrap();
        assert!(matches!(
            repo.rm_remote("origin"),
            Err(GitletError::NoSuchRemote)
        ));
    }

    #[test]
    fn test_push_missing_remote_dir() {
        let dir = tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();

        assert!(matches!(
            repo.push("origin", "master"),
            Err(GitletError::NoSuchRemote)
        ));

        repo.add_remote("origin", dir.path().join("gone").to_str().unwrap())
            .unwrap();
        assert!(matches!(
            repo.push("origin", "master"),
            Err(GitletError::NoRemoteDir)
        ));
    }

    #[test]
    fn test_push_updates_peer() {
        let dir = tempdir().unwrap();
        let (local, peer) = local_and_peer(&dir);
        let local_root = dir.path().join("local");

        write_file(&local_root, "a.txt", "A");
        local.add("a.txt").unwrap();
        let head = local.commit("m1").unwrap();

        local.push("origin", "master").unwrap();

        let peer_state = peer.load_state().unwrap();
        assert_eq!(peer_state.branch_tip("master").unwrap(), head);
        // Pushing master also moves the peer's head.
        assert_eq!(peer_state.head, head);

        // The peer now holds the commit and its blob.
        let commit = peer.objects.get_commit(&head).unwrap();
        let blob = &commit.tracked["a.txt"];
        assert_eq!(peer.objects.get_blob(blob).unwrap(), b"A");
    }

    #[test]
    fn test_push_other_branch_leaves_peer_head() {
        let dir = tempdir().unwrap();
        let (local, peer) = local_and_peer(&dir);
        let local_root = dir.path().join("local");

        let peer_head_before = peer.load_state().unwrap().head;

        write_file(&local_root, "a.txt", "A");
        local.add("a.txt").unwrap();
        let head = local.commit("m1").unwrap();

        local.push("origin", "feature").unwrap();

        let peer_state = peer.load_state().unwrap();
        assert_eq!(peer_state.branch_tip("feature").unwrap(), head);
        assert_eq!(peer_state.head, peer_head_before);
    }

    #[test]
    fn test_push_not_fast_forward() {
        let dir = tempdir().unwrap();
        let (local, _peer) = local_and_peer(&dir);
        let local_root = dir.path().join("local");
        let peer_root = dir.path().join("peer");

        // The peer's master advances on its own.
        let peer_repo = Repository::open(&peer_root).unwrap();
        write_file(&peer_root, "theirs.txt", "T");
        peer_repo.add("theirs.txt").unwrap();
        peer_repo.commit("peer work").unwrap();

        write_file(&local_root, "mine.txt", "M");
        local.add("mine.txt").unwrap();
        local.commit("local work").unwrap();

        assert!(matches!(
            local.push("origin", "master"),
            Err(GitletError::PushNotFastForward)
        ));
    }

    #[test]
    fn test_fetch_creates_tracking_branch() {
        let dir = tempdir().unwrap();
        let (local, peer) = local_and_peer(&dir);
        let peer_root = dir.path().join("peer");
        let local_root = dir.path().join("local");

        write_file(&peer_root, "b.txt", "B");
        peer.add("b.txt").unwrap();
        let tip = peer.commit("peer adds b").unwrap();

        local.fetch("origin", "master").unwrap();

        let state = local.load_state().unwrap();
        assert_eq!(state.branch_tip("origin/master").unwrap(), tip);
        // Objects arrived, the working tree did not change.
        local.objects.get_commit(&tip).unwrap();
        assert!(!local_root.join("b.txt").exists());
        // Head is still local.
        assert_ne!(state.head, tip);
    }

    #[test]
    fn test_fetch_unknown_branch() {
        let dir = tempdir().unwrap();
        let (local, _peer) = local_and_peer(&dir);

        assert!(matches!(
            local.fetch("origin", "nope"),
            Err(GitletError::NoSuchRemoteBranch)
        ));
    }

    #[test]
    fn test_pull_fast_forwards() {
        let dir = tempdir().unwrap();
        let (local, peer) = local_and_peer(&dir);
        let peer_root = dir.path().join("peer");
        let local_root = dir.path().join("local");

        write_file(&peer_root, "b.txt", "B");
        peer.add("b.txt").unwrap();
        let tip = peer.commit("peer adds b").unwrap();

        // Local is still at the shared initial commit, so the merge half of
        // the pull reduces to a fast-forward.
        assert!(matches!(
            local.pull("origin", "master"),
            Err(GitletError::FastForward)
        ));

        let state = local.load_state().unwrap();
        assert_eq!(state.head, tip);
        assert_eq!(state.branch_tip("master").unwrap(), tip);
        assert_eq!(fs::read(local_root.join("b.txt")).unwrap(), b"B");
    }

    #[test]
    fn test_pull_merges_divergent_histories() {
        let dir = tempdir().unwrap();
        let (local, peer) = local_and_peer(&dir);
        let peer_root = dir.path().join("peer");
        let local_root = dir.path().join("local");

        write_file(&peer_root, "theirs.txt", "T");
        peer.add("theirs.txt").unwrap();
        peer.commit("peer work").unwrap();

        write_file(&local_root, "mine.txt", "M");
        local.add("mine.txt").unwrap();
        local.commit("local work").unwrap();

        let summary = local.pull("origin", "master").unwrap();
        assert!(!summary.conflict);

        let merged = local.objects.get_commit(&summary.commit).unwrap();
        assert!(merged.is_merge());
        assert!(merged.tracked.contains_key("mine.txt"));
        assert!(merged.tracked.contains_key("theirs.txt"));
        assert_eq!(fs::read(local_root.join("theirs.txt")).unwrap(), b"T");
    }
}
