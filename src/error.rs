use crate::types::Oid;

/// All errors produced by gitcdn.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("path collision: {0}")]
    PathCollision(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("branch not found: {0}")]
    BranchNotFound(String),

    #[error("ref update conflict on '{branch}': expected {expected}, found {actual}")]
    RefUpdateConflict {
        branch: String,
        expected: Oid,
        actual: Oid,
    },

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The second phase of a rename failed and the compensating removal of
    /// the new path succeeded. The branch is back in its pre-rename state;
    /// the wrapped error is the phase-two failure.
    #[error("rename rolled back: {source}")]
    RenameRolledBack {
        #[source]
        source: Box<Error>,
    },

    /// The second phase of a rename failed and so did the compensating
    /// removal. Both paths survive with identical content; the caller must
    /// reconcile. Never retried automatically.
    #[error("partial rename: both '{old_path}' and '{new_path}' remain")]
    PartialRename { old_path: String, new_path: String },

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid branch name: {0}")]
    InvalidBranchName(String),

    #[error("api error: {0}")]
    Api(String),
}

pub type Result<T> = std::result::Result<T, Error>;

// ---------------------------------------------------------------------------
// Convenience constructors
// ---------------------------------------------------------------------------

impl Error {
    pub fn path_collision(path: impl Into<String>) -> Self {
        Self::PathCollision(path.into())
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    pub fn branch_not_found(branch: impl Into<String>) -> Self {
        Self::BranchNotFound(branch.into())
    }

    pub fn ref_conflict(branch: impl Into<String>, expected: Oid, actual: Oid) -> Self {
        Self::RefUpdateConflict {
            branch: branch.into(),
            expected,
            actual,
        }
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::StorageUnavailable(msg.into())
    }

    pub fn rolled_back(cause: Error) -> Self {
        Self::RenameRolledBack {
            source: Box::new(cause),
        }
    }

    pub fn partial_rename(old_path: impl Into<String>, new_path: impl Into<String>) -> Self {
        Self::PartialRename {
            old_path: old_path.into(),
            new_path: new_path.into(),
        }
    }

    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self::InvalidPath(path.into())
    }

    pub fn invalid_branch_name(name: impl Into<String>) -> Self {
        Self::InvalidBranchName(name.into())
    }

    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api(msg.into())
    }

    /// Whether a caller may safely retry the whole operation.
    ///
    /// Conflicts and transient storage failures are retryable; a rolled-back
    /// rename left the branch clean and may be reissued. `PartialRename` is
    /// terminal and must never be blindly retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RefUpdateConflict { .. }
                | Self::StorageUnavailable(_)
                | Self::RenameRolledBack { .. }
        )
    }
}
