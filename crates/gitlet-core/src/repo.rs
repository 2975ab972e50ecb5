//! Repository — the main entry point for gitlet operations.
//!
//! A Repository ties together the object store, the staging area, and the
//! persisted state record. Every command loads the state once, works on
//! in-memory structures plus content-addressed object writes, and persists
//! the state record last.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use walkdir::WalkDir;

use crate::commit::Commit;
use crate::error::{GitletError, GitletResult};
use crate::hash::hash_bytes;
use crate::lock::RepoLock;
use crate::object::ObjectStore;
use crate::state::RepoState;

/// The `.gitlet` directory name.
pub(crate) const GITLET_DIR: &str = ".gitlet";

/// Name of the repository-state record inside `.gitlet`.
pub(crate) const STATE_FILE: &str = "Management";

/// Staging directory name inside `.gitlet`.
const STAGING_DIR: &str = "staging";

/// Default branch name.
pub(crate) const MASTER_BRANCH: &str = "master";

/// A gitlet repository.
pub struct Repository {
    /// Root of the working directory (where `.gitlet/` lives).
    pub(crate) root: PathBuf,
    /// Path to the `.gitlet/` directory.
    pub(crate) gitlet_dir: PathBuf,
    /// Content-addressed blob and commit storage.
    pub(crate) objects: ObjectStore,
}

/// How a file differs from what the next commit would record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModificationKind {
    /// Present on disk with different content.
    Modified,
    /// Expected but absent from the working tree.
    Deleted,
}

/// Everything the `status` command reports, each section sorted.
#[derive(Debug, Clone)]
pub struct StatusReport {
    /// All branch names.
    pub branches: Vec<String>,
    /// The active branch.
    pub current_branch: String,
    /// Paths with a staged copy.
    pub staged: Vec<String>,
    /// Paths staged for removal.
    pub removed: Vec<String>,
    /// Tracked or staged paths whose working-tree state diverges.
    pub modifications: Vec<(String, ModificationKind)>,
    /// Working-tree files gitlet knows nothing about.
    pub untracked: Vec<String>,
}

impl Repository {
    /// Initialize a new gitlet repository in the given directory.
    ///
    /// Creates the `.gitlet/` layout, stores the initial commit, and points
    /// a fresh `master` branch (and head) at it.
    pub fn init(root: &Path) -> GitletResult<Self> {
        let gitlet_dir = root.join(GITLET_DIR);
        if gitlet_dir.exists() {
            return Err(GitletError::AlreadyInitialized);
        }

        fs::create_dir_all(gitlet_dir.join(STAGING_DIR))?;
        let objects = ObjectStore::new(&gitlet_dir);
        objects.init_dirs()?;

        let hash = objects.put_commit(&Commit::initial())?;

        let mut state = RepoState::default();
        state.set_branch_tip(MASTER_BRANCH, &hash);
        state.current_branch = MASTER_BRANCH.to_string();
        state.head = hash;
        state.save(&gitlet_dir.join(STATE_FILE))?;

        Self::open(root)
    }

    /// Open an existing gitlet repository.
    pub fn open(root: &Path) -> GitletResult<Self> {
        let gitlet_dir = root.join(GITLET_DIR);
        if !gitlet_dir.exists() {
            return Err(GitletError::NotInitialized);
        }
        let objects = ObjectStore::new(&gitlet_dir);
        Ok(Self {
            root: root.to_path_buf(),
            gitlet_dir,
            objects,
        })
    }

    /// Default lock timeout for mutating operations.
    const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

    /// Acquire an exclusive lock on the repository.
    pub(crate) fn lock(&self) -> GitletResult<RepoLock> {
        RepoLock::acquire(&self.gitlet_dir, Self::LOCK_TIMEOUT)
    }

    // --- State and staging plumbing ---

    pub(crate) fn load_state(&self) -> GitletResult<RepoState> {
        RepoState::load(&self.gitlet_dir.join(STATE_FILE))
    }

    pub(crate) fn save_state(&self, state: &RepoState) -> GitletResult<()> {
        state.save(&self.gitlet_dir.join(STATE_FILE))
    }

    pub(crate) fn staged_path(&self, name: &str) -> PathBuf {
        self.gitlet_dir.join(STAGING_DIR).join(name)
    }

    /// Names of all staged files, sorted.
    pub(crate) fn staged_files(&self) -> GitletResult<Vec<String>> {
        crate::fsutil::plain_filenames_in(&self.gitlet_dir.join(STAGING_DIR))
    }

    pub(crate) fn clear_staging(&self) -> GitletResult<()> {
        for name in self.staged_files()? {
            fs::remove_file(self.staged_path(&name))?;
        }
        Ok(())
    }

    pub(crate) fn working_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Names of the plain files at the working-directory root, sorted.
    /// Only root-level files are ever tracked.
    pub(crate) fn working_files(&self) -> GitletResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// The commit the working directory is currently at.
    pub(crate) fn head_commit(&self, state: &RepoState) -> GitletResult<Commit> {
        self.objects.get_commit(&state.head)
    }

    // --- Commands ---

    /// Stage a working-tree file for the next commit.
    ///
    /// If the head already tracks the path at the file's current content,
    /// nothing is staged (and any stale staged copy is dropped). The path
    /// always leaves the removal set.
    pub fn add(&self, name: &str) -> GitletResult<()> {
        let _lock = self.lock()?;
        let mut state = self.load_state()?;

        let working = self.working_path(name);
        if !working.is_file() {
            return Err(GitletError::FileDoesNotExist);
        }

        let staged = self.staged_path(name);
        if staged.exists() {
            fs::remove_file(&staged)?;
        }

        let content = fs::read(&working)?;
        let hash = hash_bytes(&content);
        let head = self.head_commit(&state)?;
        if head.tracked.get(name) != Some(&hash) {
            fs::write(&staged, &content)?;
        }

        state.delete_from_removal(name);
        self.save_state(&state)
    }

    /// Unstage a file, or stage a tracked file for removal and delete it
    /// from the working tree.
    pub fn rm(&self, name: &str) -> GitletResult<()> {
        let _lock = self.lock()?;
        let mut state = self.load_state()?;
        let head = self.head_commit(&state)?;

        let tracked = head.tracked.contains_key(name);
        let staged = self.staged_path(name);
        if !tracked && !staged.exists() {
            return Err(GitletError::NothingToRemove);
        }

        if staged.exists() {
            fs::remove_file(&staged)?;
        }
        if tracked {
            state.add_removal(name);
            let working = self.working_path(name);
            if working.exists() {
                fs::remove_file(&working)?;
            }
        }
        self.save_state(&state)
    }

    /// Record the staged additions and pending removals as a new commit and
    /// advance the current branch. Returns the new commit's hash.
    pub fn commit(&self, message: &str) -> GitletResult<String> {
        if message.is_empty() {
            return Err(GitletError::EmptyMessage);
        }
        let _lock = self.lock()?;
        let mut state = self.load_state()?;

        if self.staged_files()?.is_empty() && state.removal.is_empty() {
            return Err(GitletError::NoChanges);
        }

        let parent = state.head.clone();
        let hash = self.build_commit(&mut state, message, vec![parent], false)?;
        self.save_state(&state)?;
        Ok(hash)
    }

    /// Turn the staging area and removal set into a commit on top of head.
    ///
    /// Shared by `commit` and the merge finalization; the latter also
    /// deletes removed paths from the working tree (`rm` already did that
    /// for the ordinary commit path).
    pub(crate) fn build_commit(
        &self,
        state: &mut RepoState,
        message: &str,
        parents: Vec<String>,
        delete_removed: bool,
    ) -> GitletResult<String> {
        let head = self.head_commit(state)?;
        let mut tracked = head.tracked.clone();

        for name in self.staged_files()? {
            let path = self.staged_path(&name);
            let content = fs::read(&path)?;
            let blob = self.objects.put_blob(&content)?;
            tracked.insert(name, blob);
            fs::remove_file(&path)?;
        }
        for name in &state.removal {
            tracked.remove(name);
            if delete_removed {
                let working = self.working_path(name);
                if working.exists() {
                    fs::remove_file(&working)?;
                }
            }
        }
        state.clear_removal();

        let commit = Commit::new(message, parents, tracked);
        let hash = self.objects.put_commit(&commit)?;
        state.head = hash.clone();
        let current = state.current_branch.clone();
        state.set_branch_tip(&current, &hash);
        Ok(hash)
    }

    /// The current branch's history: head first, following first parents.
    pub fn log(&self) -> GitletResult<Vec<(String, Commit)>> {
        let state = self.load_state()?;
        let mut records = Vec::new();
        let mut hash = state.head;
        loop {
            let commit = self.objects.get_commit(&hash)?;
            let parent = commit.first_parent().map(str::to_string);
            records.push((hash, commit));
            match parent {
                Some(p) => hash = p,
                None => break,
            }
        }
        Ok(records)
    }

    /// Every commit in the store, in storage order.
    pub fn global_log(&self) -> GitletResult<Vec<(String, Commit)>> {
        let mut records = Vec::new();
        for hash in self.objects.list_commits()? {
            let commit = self.objects.get_commit(&hash)?;
            records.push((hash, commit));
        }
        Ok(records)
    }

    /// Hashes of all commits whose message matches exactly.
    pub fn find(&self, message: &str) -> GitletResult<Vec<String>> {
        let mut hashes = Vec::new();
        for hash in self.objects.list_commits()? {
            if self.objects.get_commit(&hash)?.message == message {
                hashes.push(hash);
            }
        }
        Ok(hashes)
    }

    /// Summarize branches, staged/removed paths, unstaged modifications,
    /// and untracked files.
    pub fn status(&self) -> GitletResult<StatusReport> {
        let state = self.load_state()?;
        let head = self.head_commit(&state)?;

        let staged = self.staged_files()?;
        let staged_set: BTreeSet<&str> = staged.iter().map(String::as_str).collect();
        let mut removed = state.removal.clone();
        removed.sort();
        let working: BTreeSet<String> = self.working_files()?.into_iter().collect();

        let mut modifications: BTreeMap<String, ModificationKind> = BTreeMap::new();
        for (name, blob) in &head.tracked {
            let in_removal = state.removal.iter().any(|f| f == name);
            if !working.contains(name) {
                if !in_removal {
                    modifications.insert(name.clone(), ModificationKind::Deleted);
                }
            } else if !staged_set.contains(name.as_str()) && !in_removal {
                let content = fs::read(self.working_path(name))?;
                if hash_bytes(&content) != *blob {
                    modifications.insert(name.clone(), ModificationKind::Modified);
                }
            }
        }
        for name in &staged {
            if !working.contains(name) {
                modifications.insert(name.clone(), ModificationKind::Deleted);
            } else {
                let on_disk = fs::read(self.working_path(name))?;
                let staged_bytes = fs::read(self.staged_path(name))?;
                if hash_bytes(&on_disk) != hash_bytes(&staged_bytes) {
                    modifications.insert(name.clone(), ModificationKind::Modified);
                }
            }
        }

        // A path staged for removal that reappears on disk is untracked.
        let mut untracked = Vec::new();
        for name in &working {
            let tracked_now = head.tracked.contains_key(name)
                && !state.removal.iter().any(|f| f == name);
            if !staged_set.contains(name.as_str()) && !tracked_now {
                untracked.push(name.clone());
            }
        }

        Ok(StatusReport {
            branches: state.branches.keys().cloned().collect(),
            current_branch: state.current_branch,
            staged,
            removed,
            modifications: modifications.into_iter().collect(),
            untracked,
        })
    }

    /// Restore one file from the head commit into the working tree.
    pub fn checkout_file(&self, name: &str) -> GitletResult<()> {
        let state = self.load_state()?;
        let head = self.head_commit(&state)?;
        self.checkout_from_commit(&head, name)
    }

    /// Restore one file from the commit matching the given id prefix.
    pub fn checkout_file_at(&self, prefix: &str, name: &str) -> GitletResult<()> {
        let hash = self
            .objects
            .resolve_prefix(prefix)?
            .ok_or(GitletError::NoSuchCommit)?;
        let commit = self.objects.get_commit(&hash)?;
        self.checkout_from_commit(&commit, name)
    }

    fn checkout_from_commit(&self, commit: &Commit, name: &str) -> GitletResult<()> {
        let blob = commit
            .tracked
            .get(name)
            .ok_or(GitletError::FileNotInCommit)?;
        let bytes = self.objects.get_blob(blob)?;
        fs::write(self.working_path(name), bytes)?;
        Ok(())
    }

    /// Switch the working directory to another branch's tip.
    pub fn checkout_branch(&self, name: &str) -> GitletResult<()> {
        let _lock = self.lock()?;
        let mut state = self.load_state()?;

        if !state.branches.contains_key(name) {
            return Err(GitletError::NoSuchBranch);
        }
        if state.current_branch == name {
            return Err(GitletError::SameBranch);
        }

        let current = self.head_commit(&state)?;
        let tip = state.branch_tip(name)?.to_string();
        let target = self.objects.get_commit(&tip)?;
        self.ensure_no_untracked_overwrite(&current, &target)?;

        self.delete_tracked_files(&current)?;
        self.restore_commit_files(&target)?;
        self.clear_staging()?;
        state.clear_removal();

        state.current_branch = name.to_string();
        state.head = tip;
        self.save_state(&state)
    }

    /// Create a branch pointing at the current head.
    pub fn branch(&self, name: &str) -> GitletResult<()> {
        let _lock = self.lock()?;
        let mut state = self.load_state()?;
        if state.branches.contains_key(name) {
            return Err(GitletError::BranchExists);
        }
        let head = state.head.clone();
        state.set_branch_tip(name, &head);
        self.save_state(&state)
    }

    /// Delete a branch pointer. The commits it pointed at stay in the store.
    pub fn rm_branch(&self, name: &str) -> GitletResult<()> {
        let _lock = self.lock()?;
        let mut state = self.load_state()?;
        if !state.branches.contains_key(name) {
            return Err(GitletError::BranchNotFound);
        }
        if state.current_branch == name {
            return Err(GitletError::CannotRemoveCurrent);
        }
        state.branches.remove(name);
        self.save_state(&state)
    }

    /// Move the working directory, head, and the current branch's tip to
    /// the commit matching the given id prefix.
    pub fn reset(&self, prefix: &str) -> GitletResult<()> {
        let _lock = self.lock()?;
        let mut state = self.load_state()?;

        let hash = self
            .objects
            .resolve_prefix(prefix)?
            .ok_or(GitletError::NoSuchCommit)?;
        let target = self.objects.get_commit(&hash)?;
        let current = self.head_commit(&state)?;
        self.ensure_no_untracked_overwrite(&current, &target)?;

        self.delete_tracked_files(&current)?;
        self.clear_staging()?;
        self.restore_commit_files(&target)?;

        state.head = hash.clone();
        let current_branch = state.current_branch.clone();
        state.set_branch_tip(&current_branch, &hash);
        self.save_state(&state)
    }

    // --- Working-tree helpers shared with merge ---

    /// Refuse to clobber a working file the current head does not track but
    /// the target commit does. Runs before any filesystem mutation.
    pub(crate) fn ensure_no_untracked_overwrite(
        &self,
        current: &Commit,
        target: &Commit,
    ) -> GitletResult<()> {
        for name in target.tracked.keys() {
            if self.working_path(name).exists() && !current.tracked.contains_key(name) {
                return Err(GitletError::UntrackedOverwrite);
            }
        }
        Ok(())
    }

    /// Delete every working-tree file the commit tracks.
    pub(crate) fn delete_tracked_files(&self, commit: &Commit) -> GitletResult<()> {
        for name in commit.tracked.keys() {
            let path = self.working_path(name);
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    /// Copy every file the commit tracks from its blob into the working tree.
    pub(crate) fn restore_commit_files(&self, commit: &Commit) -> GitletResult<()> {
        for (name, blob) in &commit.tracked {
            let bytes = self.objects.get_blob(blob)?;
            fs::write(self.working_path(name), bytes)?;
        }
        Ok(())
    }
}
