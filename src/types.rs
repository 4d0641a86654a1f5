use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Mode constants
// ---------------------------------------------------------------------------

pub const MODE_BLOB: u32 = 0o100644;
pub const MODE_BLOB_EXEC: u32 = 0o100755;
pub const MODE_LINK: u32 = 0o120000;
pub const MODE_TREE: u32 = 0o040000;
pub const MODE_COMMIT: u32 = 0o160000;

// ---------------------------------------------------------------------------
// Oid
// ---------------------------------------------------------------------------

/// Opaque content address (hex hash) assigned by the object store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Oid(String);

impl Oid {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Oid {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Oid {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// EntryMode
// ---------------------------------------------------------------------------

/// The filemode of a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryMode {
    File,
    Executable,
    Symlink,
    Subdirectory,
    Submodule,
}

impl EntryMode {
    /// Convert a raw git mode to an `EntryMode`.
    pub fn from_mode(mode: u32) -> Option<Self> {
        match mode {
            MODE_BLOB => Some(Self::File),
            MODE_BLOB_EXEC => Some(Self::Executable),
            MODE_LINK => Some(Self::Symlink),
            MODE_TREE => Some(Self::Subdirectory),
            MODE_COMMIT => Some(Self::Submodule),
            _ => None,
        }
    }

    /// Convert to a raw git mode.
    pub fn to_mode(self) -> u32 {
        match self {
            Self::File => MODE_BLOB,
            Self::Executable => MODE_BLOB_EXEC,
            Self::Symlink => MODE_LINK,
            Self::Subdirectory => MODE_TREE,
            Self::Submodule => MODE_COMMIT,
        }
    }

    /// The zero-padded octal string used on the wire (e.g. `"100644"`).
    pub fn as_wire_str(self) -> &'static str {
        match self {
            Self::File => "100644",
            Self::Executable => "100755",
            Self::Symlink => "120000",
            Self::Subdirectory => "040000",
            Self::Submodule => "160000",
        }
    }

    /// Parse the wire string form.
    pub fn from_wire_str(s: &str) -> Option<Self> {
        match s {
            "100644" => Some(Self::File),
            "100755" => Some(Self::Executable),
            "120000" => Some(Self::Symlink),
            "040000" | "40000" => Some(Self::Subdirectory),
            "160000" => Some(Self::Submodule),
            _ => None,
        }
    }

    /// Whether this mode represents file content (blob or executable).
    pub fn is_file(self) -> bool {
        matches!(self, Self::File | Self::Executable)
    }
}

impl Default for EntryMode {
    fn default() -> Self {
        Self::File
    }
}

// ---------------------------------------------------------------------------
// ObjectType
// ---------------------------------------------------------------------------

/// The kind of object a tree entry points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Blob,
    Tree,
    Commit,
}

impl ObjectType {
    pub fn as_wire_str(self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
        }
    }

    pub fn from_wire_str(s: &str) -> Option<Self> {
        match s {
            "blob" => Some(Self::Blob),
            "tree" => Some(Self::Tree),
            "commit" => Some(Self::Commit),
            _ => None,
        }
    }

    /// The object type implied by a filemode.
    pub fn from_entry_mode(mode: EntryMode) -> Self {
        match mode {
            EntryMode::Subdirectory => Self::Tree,
            EntryMode::Submodule => Self::Commit,
            _ => Self::Blob,
        }
    }
}

// ---------------------------------------------------------------------------
// TreeEntry / TreeChange
// ---------------------------------------------------------------------------

/// One entry of a tree snapshot.
///
/// `path` uniquely identifies the entry within a snapshot. Listings are
/// sorted by path so rebuilt trees come out deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Slash-separated path from the tree root.
    pub path: String,
    pub mode: EntryMode,
    pub object_type: ObjectType,
    pub oid: Oid,
    /// Blob size in bytes, when the store reports it.
    pub size: Option<u64>,
}

impl TreeEntry {
    pub fn blob(path: impl Into<String>, oid: Oid, mode: EntryMode) -> Self {
        Self {
            path: path.into(),
            mode,
            object_type: ObjectType::from_entry_mode(mode),
            oid,
            size: None,
        }
    }
}

/// A single structural edit applied on top of a base tree.
///
/// `oid: None` removes the path; `Some` adds or replaces it.
#[derive(Debug, Clone)]
pub struct TreeChange {
    pub path: String,
    pub mode: EntryMode,
    pub oid: Option<Oid>,
}

impl TreeChange {
    pub fn put(path: impl Into<String>, oid: Oid, mode: EntryMode) -> Self {
        Self {
            path: path.into(),
            mode,
            oid: Some(oid),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: EntryMode::File,
            oid: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Signature / CommitMeta
// ---------------------------------------------------------------------------

/// Author/committer identity.
#[derive(Debug, Clone)]
pub struct Signature {
    pub name: String,
    pub email: String,
}

impl Default for Signature {
    fn default() -> Self {
        Self {
            name: "gitcdn".into(),
            email: "gitcdn@localhost".into(),
        }
    }
}

/// An immutable commit record as read back from the store.
#[derive(Debug, Clone)]
pub struct CommitMeta {
    pub oid: Oid,
    pub tree: Oid,
    pub parents: Vec<Oid>,
    pub message: String,
}

// ---------------------------------------------------------------------------
// RefUpdate
// ---------------------------------------------------------------------------

/// Outcome of a compare-and-set branch update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefUpdate {
    /// The branch now points at the new commit.
    Updated,
    /// The branch head no longer matched the expected value. Contains the
    /// head that was actually found.
    Conflict { actual: Oid },
}

// ---------------------------------------------------------------------------
// RepoConfig
// ---------------------------------------------------------------------------

/// Explicit configuration for one target repository.
///
/// Passed in at construction; the library never reads the environment.
#[derive(Debug, Clone)]
pub struct RepoConfig {
    pub owner: String,
    pub repo: String,
    /// Branch to operate on. Defaults to `"main"`.
    pub branch: String,
    /// API token, if the repository needs one.
    pub token: Option<String>,
    /// Identity recorded on created commits.
    pub signature: Signature,
}

impl RepoConfig {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
            branch: "main".into(),
            token: None,
            signature: Signature::default(),
        }
    }

    /// Build a config from a repository URL, e.g.
    /// `https://github.com/{owner}/{repo}` or the ssh form. Returns
    /// `None` when no owner/repo pair can be found in the URL.
    pub fn from_url(url: &str) -> Option<Self> {
        let (owner, repo) = crate::urls::parse_repo_url(url)?;
        Some(Self::new(owner, repo))
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn signature(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.signature = Signature {
            name: name.into(),
            email: email.into(),
        };
        self
    }
}

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

/// How committer operations respond to retryable failures.
///
/// A ref-update conflict restarts the operation from a fresh read of the
/// branch head; a transient storage failure sleeps for `backoff` first.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per operation, including the first.
    pub max_attempts: u32,
    /// Sleep between attempts after a transient failure.
    pub backoff: std::time::Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: std::time::Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Fail on the first conflict or transient error instead of retrying.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            backoff: std::time::Duration::ZERO,
        }
    }
}

// ---------------------------------------------------------------------------
// Receipts
// ---------------------------------------------------------------------------

/// Result of a single-commit mutation.
#[derive(Debug, Clone)]
pub struct CommitReceipt {
    /// The commit the branch now points at.
    pub commit: Oid,
    /// The path that was added, replaced, or removed.
    pub path: String,
    /// Externally addressable location of the file, when one exists.
    pub url: Option<String>,
}

/// Result of a completed rename (two commits).
#[derive(Debug, Clone)]
pub struct RenameReceipt {
    /// The commit the branch points at after both phases.
    pub commit: Oid,
    pub old_path: String,
    pub new_path: String,
    /// Externally addressable location of the renamed file.
    pub url: Option<String>,
}

// ---------------------------------------------------------------------------
// Listing / repository metadata
// ---------------------------------------------------------------------------

/// One file in a listing, with its public download location.
#[derive(Debug, Clone, Serialize)]
pub struct FileInfo {
    /// Basename of the file.
    pub name: String,
    /// Full slash-separated path.
    pub path: String,
    /// Blob size in bytes, when the store reports it.
    pub size: Option<u64>,
    pub oid: Oid,
    pub download_url: String,
}

/// Repository metadata, for status views.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoInfo {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub default_branch: String,
    /// Repository size in kilobytes, as reported by the provider.
    pub size: u64,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub html_url: Option<String>,
}
