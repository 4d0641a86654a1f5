//! Collaborator seams for the committer.
//!
//! The hosting provider is modelled as four narrow capabilities: raw blob
//! storage, tree snapshots, commit records, and a mutable branch ref. The
//! committer is generic over anything that provides all four; the crate
//! ships [`crate::github::GithubClient`] for the GitHub git-data API and
//! [`crate::memory::MemoryRepo`] as an in-process implementation.

use crate::error::Result;
use crate::types::{CommitMeta, Oid, RefUpdate, Signature, TreeChange, TreeEntry};

/// Create and read content-addressed blobs.
pub trait BlobStore {
    /// Store raw bytes, returning their content address.
    fn create_blob(&self, data: &[u8]) -> Result<Oid>;

    /// Read a blob's bytes by content address.
    fn read_blob(&self, oid: &Oid) -> Result<Vec<u8>>;
}

/// Create and read immutable tree snapshots.
pub trait TreeStore {
    /// Build a new tree from `base` with `changes` applied.
    ///
    /// A change with `oid: Some` adds or replaces the path; `oid: None`
    /// removes it. Unchanged entries are carried over by address — the
    /// store must not re-hash or alter them. `base: None` starts from an
    /// empty tree.
    fn create_tree(&self, base: Option<&Oid>, changes: &[TreeChange]) -> Result<Oid>;

    /// List a tree's entries. With `recursive`, descends into subtrees and
    /// returns full slash-separated paths; subdirectory entries themselves
    /// are included either way.
    ///
    /// The listing is sorted by path.
    fn read_tree(&self, oid: &Oid, recursive: bool) -> Result<Vec<TreeEntry>>;
}

/// Create and read immutable commit records.
pub trait CommitStore {
    fn create_commit(
        &self,
        tree: &Oid,
        parents: &[Oid],
        message: &str,
        author: &Signature,
    ) -> Result<Oid>;

    fn read_commit(&self, oid: &Oid) -> Result<CommitMeta>;
}

/// Read and advance a named branch ref — the only mutable entity.
pub trait RefStore {
    /// The commit a branch currently points at.
    ///
    /// # Errors
    /// [`crate::Error::BranchNotFound`] if the branch does not exist.
    fn read_ref(&self, branch: &str) -> Result<Oid>;

    /// Compare-and-set the branch head.
    ///
    /// Advances `branch` from `expected` to `new` only if the head still
    /// equals `expected`; otherwise returns [`RefUpdate::Conflict`] with
    /// the head actually found. Never a blind overwrite.
    fn update_ref(&self, branch: &str, expected: &Oid, new: &Oid) -> Result<RefUpdate>;
}

/// Everything the committer needs from a hosting provider.
pub trait RepoClient: BlobStore + TreeStore + CommitStore + RefStore {}

impl<T: BlobStore + TreeStore + CommitStore + RefStore> RepoClient for T {}
