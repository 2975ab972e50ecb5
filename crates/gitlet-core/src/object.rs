//! Content-addressed object store.
//!
//! Blobs live in `.gitlet/blobs/` and commits in `.gitlet/commits/`, each
//! stored as a flat file named by its 40-char SHA-1 hash. Identical bytes
//! always land under the same key, so writes are idempotent and safe to
//! repeat (including overwrites during push/fetch).

use std::fs;
use std::path::{Path, PathBuf};

use crate::commit::Commit;
use crate::error::{GitletError, GitletResult};
use crate::fsutil::plain_filenames_in;
use crate::hash::hash_bytes;

/// The object store manages blob and commit storage on disk.
pub struct ObjectStore {
    /// `.gitlet/blobs/`
    blobs: PathBuf,
    /// `.gitlet/commits/`
    commits: PathBuf,
}

impl ObjectStore {
    /// Create an ObjectStore rooted inside the given `.gitlet` directory.
    pub fn new(gitlet_dir: &Path) -> Self {
        Self {
            blobs: gitlet_dir.join("blobs"),
            commits: gitlet_dir.join("commits"),
        }
    }

    /// Create the blob and commit directories.
    pub fn init_dirs(&self) -> GitletResult<()> {
        fs::create_dir_all(&self.blobs)?;
        fs::create_dir_all(&self.commits)?;
        Ok(())
    }

    /// Store raw bytes as a blob and return their content hash.
    ///
    /// If the blob already exists (same content), this is a no-op and
    /// simply returns the existing hash.
    pub fn put_blob(&self, data: &[u8]) -> GitletResult<String> {
        let hash = hash_bytes(data);
        let path = self.blob_path(&hash);
        if !path.exists() {
            fs::create_dir_all(&self.blobs)?;
            fs::write(&path, data)?;
        }
        Ok(hash)
    }

    /// Retrieve a blob by its hash.
    pub fn get_blob(&self, hash: &str) -> GitletResult<Vec<u8>> {
        let path = self.blob_path(hash);
        if !path.exists() {
            return Err(GitletError::MissingObject(hash.to_string()));
        }
        Ok(fs::read(&path)?)
    }

    /// Filesystem path of a blob.
    pub fn blob_path(&self, hash: &str) -> PathBuf {
        self.blobs.join(hash)
    }

    /// Hashes of every stored blob, sorted.
    pub fn list_blobs(&self) -> GitletResult<Vec<String>> {
        plain_filenames_in(&self.blobs)
    }

    /// Serialize a commit, store it under its content hash, and return the
    /// hash. The stored bytes are exactly the hashed bytes, so
    /// `hash(serialize(get_commit(h))) == h` for every commit written here.
    pub fn put_commit(&self, commit: &Commit) -> GitletResult<String> {
        let bytes = serde_json::to_vec(commit)?;
        let hash = hash_bytes(&bytes);
        let path = self.commit_path(&hash);
        if !path.exists() {
            fs::create_dir_all(&self.commits)?;
            fs::write(&path, &bytes)?;
        }
        Ok(hash)
    }

    /// Retrieve a commit by its full hash.
    pub fn get_commit(&self, hash: &str) -> GitletResult<Commit> {
        let path = self.commit_path(hash);
        if !path.exists() {
            return Err(GitletError::NoSuchCommit);
        }
        let bytes = fs::read(&path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Filesystem path of a commit.
    pub fn commit_path(&self, hash: &str) -> PathBuf {
        self.commits.join(hash)
    }

    /// Hashes of every stored commit, sorted.
    pub fn list_commits(&self) -> GitletResult<Vec<String>> {
        plain_filenames_in(&self.commits)
    }

    /// Resolve an abbreviated commit id to a full hash.
    ///
    /// Scans commit filenames in sorted order and returns the first one that
    /// starts with `prefix`; callers must pass prefixes long enough to be
    /// unique. `None` if nothing matches.
    pub fn resolve_prefix(&self, prefix: &str) -> GitletResult<Option<String>> {
        for name in self.list_commits()? {
            if name.starts_with(prefix) {
                return Ok(Some(name));
            }
        }
        Ok(None)
    }
}
