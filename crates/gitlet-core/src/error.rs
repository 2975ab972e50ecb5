//! Error types for gitlet operations.
//!
//! Every kind carries its canonical user-visible message; the CLI prints
//! `Display` output as a single line on standard output.

use std::fmt;
use std::io;

/// All possible gitlet errors.
#[derive(Debug)]
pub enum GitletError {
    /// The current directory is not a gitlet repository.
    NotInitialized,
    /// A gitlet repository already exists here.
    AlreadyInitialized,
    /// No command verb was supplied.
    NoCommand,
    /// The command verb is not recognized.
    UnknownCommand,
    /// A command was invoked with the wrong operands.
    BadArgs,
    /// `add` of a file that is not in the working directory.
    FileDoesNotExist,
    /// `commit` with an empty message.
    EmptyMessage,
    /// `commit` with nothing staged and nothing marked for removal.
    NoChanges,
    /// `rm` of a file that is neither staged nor tracked.
    NothingToRemove,
    /// No commit matches the given id or prefix.
    NoSuchCommit,
    /// The requested file is not tracked by the named commit.
    FileNotInCommit,
    /// `checkout` of a branch that does not exist.
    NoSuchBranch,
    /// `rm-branch` / `merge` of a branch that does not exist.
    BranchNotFound,
    /// `branch` with a name that is already taken.
    BranchExists,
    /// `rm-branch` of the active branch.
    CannotRemoveCurrent,
    /// `checkout` of the branch that is already active.
    SameBranch,
    /// `merge` of the active branch into itself.
    SelfMerge,
    /// A destructive operation would overwrite an untracked working file.
    UntrackedOverwrite,
    /// `merge` with a non-empty staging area or removal set.
    UncommittedChanges,
    /// The merged-in branch is already an ancestor of the current branch.
    AncestorMerge,
    /// The merge reduced to moving the branch pointer forward.
    FastForward,
    /// The registered remote path does not exist on disk.
    NoRemoteDir,
    /// `add-remote` with a name that is already registered.
    RemoteExists,
    /// The named remote is not registered.
    NoSuchRemote,
    /// The peer repository has no branch with that name.
    NoSuchRemoteBranch,
    /// `push` when the peer's branch tip is not on the local head's history.
    PushNotFastForward,
    /// A blob referenced by hash was not found in the object store.
    MissingObject(String),
    /// Could not acquire the repository lock within the timeout.
    LockTimeout,
    /// An I/O error occurred.
    Io(io::Error),
    /// JSON serialization/deserialization failed.
    Json(serde_json::Error),
}

impl fmt::Display for GitletError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GitletError::NotInitialized => {
                write!(f, "Not in an initialized Gitlet directory.")
            }
            GitletError::AlreadyInitialized => write!(
                f,
                "A Gitlet version-control system already exists in the current directory."
            ),
            GitletError::NoCommand => write!(f, "Please enter a command."),
            GitletError::UnknownCommand => write!(f, "No command with that name exists."),
            GitletError::BadArgs => write!(f, "Incorrect operands."),
            GitletError::FileDoesNotExist => write!(f, "File does not exist."),
            GitletError::EmptyMessage => write!(f, "Please enter a commit message."),
            GitletError::NoChanges => write!(f, "No changes added to the commit."),
            GitletError::NothingToRemove => write!(f, "No reason to remove the file."),
            GitletError::NoSuchCommit => write!(f, "No commit with that id exists."),
            GitletError::FileNotInCommit => {
                write!(f, "File does not exist in that commit.")
            }
            GitletError::NoSuchBranch => write!(f, "No such branch exists."),
            GitletError::BranchNotFound => {
                write!(f, "A branch with that name does not exist.")
            }
            GitletError::BranchExists => {
                write!(f, "A branch with that name already exists.")
            }
            GitletError::CannotRemoveCurrent => {
                write!(f, "Cannot remove the current branch.")
            }
            GitletError::SameBranch => write!(f, "No need to checkout the current branch."),
            GitletError::SelfMerge => write!(f, "Cannot merge a branch with itself."),
            GitletError::UntrackedOverwrite => write!(
                f,
                "There is an untracked file in the way; delete it or add it first."
            ),
            GitletError::UncommittedChanges => write!(f, "You have uncommitted changes."),
            GitletError::AncestorMerge => {
                write!(f, "Given branch is an ancestor of the current branch")
            }
            GitletError::FastForward => write!(f, "Current branch fast-forwarded."),
            GitletError::NoRemoteDir => write!(f, "Remote directory not found."),
            GitletError::RemoteExists => {
                write!(f, "A remote with that name already exists.")
            }
            GitletError::NoSuchRemote => {
                write!(f, "A remote with that name does not exist.")
            }
            GitletError::NoSuchRemoteBranch => {
                write!(f, "That remote does not have that branch.")
            }
            GitletError::PushNotFastForward => {
                write!(f, "Please pull down remote changes before pushing.")
            }
            GitletError::MissingObject(hash) => write!(f, "object not found: {hash}"),
            GitletError::LockTimeout => {
                write!(f, "could not acquire repository lock within timeout")
            }
            GitletError::Io(e) => write!(f, "I/O error: {e}"),
            GitletError::Json(e) => write!(f, "JSON error: {e}"),
        }
    }
}

impl std::error::Error for GitletError {}

impl From<io::Error> for GitletError {
    fn from(e: io::Error) -> Self {
        GitletError::Io(e)
    }
}

impl From<serde_json::Error> for GitletError {
    fn from(e: serde_json::Error) -> Self {
        GitletError::Json(e)
    }
}

/// Convenience alias for Results in gitlet.
pub type GitletResult<T> = Result<T, GitletError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_messages() {
        assert_eq!(
            GitletError::NotInitialized.to_string(),
            "Not in an initialized Gitlet directory."
        );
        assert_eq!(GitletError::BadArgs.to_string(), "Incorrect operands.");
        assert_eq!(
            GitletError::UntrackedOverwrite.to_string(),
            "There is an untracked file in the way; delete it or add it first."
        );
        // No trailing period on this one.
        assert_eq!(
            GitletError::AncestorMerge.to_string(),
            "Given branch is an ancestor of the current branch"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let err: GitletError = io_err.into();
        assert!(matches!(err, GitletError::Io(_)));
    }
}
