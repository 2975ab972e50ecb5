//! Merge engine: split-point discovery, the per-path action table, and the
//! `merge` command.
//!
//! A merge compares three tracked maps — split point, current head, given
//! branch tip — path by path, with all comparisons by blob hash. Each path
//! classifies into one of four actions that are then applied to the working
//! tree, the staging area, and the removal set before a two-parent merge
//! commit finalizes the result.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fs;

use crate::error::{GitletError, GitletResult};
use crate::object::ObjectStore;
use crate::repo::Repository;

/// What a merge does to a single path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeAction {
    /// Keep whatever the current branch has.
    Remain,
    /// Take the given branch's version and stage it.
    Checkout,
    /// Stage the path for removal.
    Remove,
    /// Both sides changed it incompatibly: write conflict markers and stage.
    Conflict,
}

/// Outcome of a completed (non-degenerate) merge.
#[derive(Debug, Clone)]
pub struct MergeSummary {
    /// Hash of the merge commit.
    pub commit: String,
    /// True if any path conflicted.
    pub conflict: bool,
    /// True if the merge staged nothing, removed nothing, and had no
    /// conflict — the merge commit was still created.
    pub no_changes: bool,
}

/// Classify every path in the union of the three tracked maps.
///
/// `split`, `current`, and `given` map paths to blob hashes at the split
/// point, the current head, and the given branch tip.
pub fn classify(
    split: &BTreeMap<String, String>,
    current: &BTreeMap<String, String>,
    given: &BTreeMap<String, String>,
) -> BTreeMap<String, MergeAction> {
    let mut paths: BTreeSet<&String> = BTreeSet::new();
    paths.extend(split.keys());
    paths.extend(current.keys());
    paths.extend(given.keys());

    let mut actions = BTreeMap::new();
    for path in paths {
        let s = split.get(path);
        let c = current.get(path);
        let g = given.get(path);

        let action = match (s, c, g) {
            (Some(s), Some(c), Some(g)) => {
                if c == s && g == s {
                    MergeAction::Remain
                } else if c == s {
                    MergeAction::Checkout
                } else if g == s || c == g {
                    MergeAction::Remain
                } else {
                    MergeAction::Conflict
                }
            }
            // Deleted on both sides, or never reappeared.
            (Some(_), None, None) => MergeAction::Remain,
            (Some(s), Some(c), None) => {
                if c == s {
                    MergeAction::Remove
                } else {
                    MergeAction::Conflict
                }
            }
            (Some(s), None, Some(g)) => {
                if g == s {
                    MergeAction::Remain
                } else {
                    MergeAction::Conflict
                }
            }
            (None, Some(_), None) => MergeAction::Remain,
            (None, None, Some(_)) => MergeAction::Checkout,
            // Added on both sides: identical content is fine.
            (None, Some(c), Some(g)) => {
                if c == g {
                    MergeAction::Remain
                } else {
                    MergeAction::Conflict
                }
            }
            (None, None, None) => MergeAction::Remain,
        };
        actions.insert(path.clone(), action);
    }
    actions
}

/// Synthesize the conflict-marker file for a path. A side missing from its
/// commit contributes nothing between its markers; the trailing marker has
/// no newline.
pub fn conflict_bytes(current: Option<&[u8]>, given: Option<&[u8]>) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"<<<<<<< HEAD\n");
    if let Some(bytes) = current {
        out.extend_from_slice(bytes);
    }
    out.extend_from_slice(b"=======\n");
    if let Some(bytes) = given {
        out.extend_from_slice(bytes);
    }
    out.extend_from_slice(b">>>>>>>");
    out
}

/// Find the split point of two heads.
///
/// First pass: collect everything reachable from `given` (both parents,
/// breadth-first). Second pass: breadth-first from `current`, returning the
/// first commit that the given side also reaches. Both passes deduplicate
/// with a visited set, so tangled histories stay linear-time.
pub fn find_split_point(
    store: &ObjectStore,
    current: &str,
    given: &str,
) -> GitletResult<String> {
    let mut reachable = BTreeSet::new();
    let mut queue = VecDeque::from([given.to_string()]);
    while let Some(hash) = queue.pop_front() {
        if !reachable.insert(hash.clone()) {
            continue;
        }
        let commit = store.get_commit(&hash)?;
        for parent in &commit.parents {
            queue.push_back(parent.clone());
        }
    }

    let mut visited = BTreeSet::new();
    let mut queue = VecDeque::from([current.to_string()]);
    while let Some(hash) = queue.pop_front() {
        if reachable.contains(&hash) {
            return Ok(hash);
        }
        if !visited.insert(hash.clone()) {
            continue;
        }
        let commit = store.get_commit(&hash)?;
        for parent in &commit.parents {
            queue.push_back(parent.clone());
        }
    }
    // Unreachable for histories rooted at the shared initial commit.
    Err(GitletError::NoSuchCommit)
}

impl Repository {
    /// Merge the given branch into the current one.
    ///
    /// Degenerate cases surface as `AncestorMerge` (no state change) and
    /// `FastForward` (working tree and branch pointer already moved when it
    /// is returned), matching how the dispatcher reports them.
    pub fn merge(&self, branch: &str) -> GitletResult<MergeSummary> {
        let _lock = self.lock()?;
        let mut state = self.load_state()?;

        if !state.branches.contains_key(branch) {
            return Err(GitletError::BranchNotFound);
        }
        if state.current_branch == branch {
            return Err(GitletError::SelfMerge);
        }
        if !self.staged_files()?.is_empty() || !state.removal.is_empty() {
            return Err(GitletError::UncommittedChanges);
        }

        let curr_hash = state.head.clone();
        let given_hash = state.branch_tip(branch)?.to_string();
        let current = self.objects.get_commit(&curr_hash)?;
        let given = self.objects.get_commit(&given_hash)?;
        self.ensure_no_untracked_overwrite(&current, &given)?;

        let split_hash = find_split_point(&self.objects, &curr_hash, &given_hash)?;
        if split_hash == given_hash {
            return Err(GitletError::AncestorMerge);
        }
        if split_hash == curr_hash {
            self.delete_tracked_files(&current)?;
            self.restore_commit_files(&given)?;
            self.clear_staging()?;
            state.clear_removal();
            state.head = given_hash.clone();
            let current_branch = state.current_branch.clone();
            state.set_branch_tip(&current_branch, &given_hash);
            self.save_state(&state)?;
            return Err(GitletError::FastForward);
        }

        let split = self.objects.get_commit(&split_hash)?;
        let actions = classify(&split.tracked, &current.tracked, &given.tracked);
        for (path, action) in &actions {
            match action {
                MergeAction::Remain => {}
                MergeAction::Checkout => {
                    let blob = given
                        .tracked
                        .get(path)
                        .ok_or_else(|| GitletError::MissingObject(path.clone()))?;
                    let bytes = self.objects.get_blob(blob)?;
                    fs::write(self.working_path(path), &bytes)?;
                    fs::write(self.staged_path(path), &bytes)?;
                }
                MergeAction::Remove => state.add_removal(path),
                MergeAction::Conflict => {
                    let ours = match current.tracked.get(path) {
                        Some(blob) => Some(self.objects.get_blob(blob)?),
                        None => None,
                    };
                    let theirs = match given.tracked.get(path) {
                        Some(blob) => Some(self.objects.get_blob(blob)?),
                        None => None,
                    };
                    let bytes = conflict_bytes(ours.as_deref(), theirs.as_deref());
                    fs::write(self.working_path(path), &bytes)?;
                    fs::write(self.staged_path(path), &bytes)?;
                    state.output = true;
                }
            }
        }

        let conflict = state.output;
        let no_changes =
            self.staged_files()?.is_empty() && state.removal.is_empty() && !state.output;

        let message = format!("Merged {} into {}.", branch, state.current_branch);
        let hash = self.build_commit(&mut state, &message, vec![curr_hash, given_hash], true)?;
        state.output = false;
        self.save_state(&state)?;

        Ok(MergeSummary {
            commit: hash,
            conflict,
            no_changes,
        })
    }
}
