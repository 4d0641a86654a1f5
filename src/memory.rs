//! In-process content-addressed store.
//!
//! [`MemoryRepo`] implements the same collaborator traits as the REST
//! client, backed by hash maps and SHA-1 content addressing (blob
//! addresses match git's; tree and commit addresses use a simpler flat
//! encoding). It is the test double for the committer and doubles as a
//! scratch store.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use sha1::{Digest, Sha1};

use crate::client::{BlobStore, CommitStore, RefStore, TreeStore};
use crate::error::{Error, Result};
use crate::types::{
    CommitMeta, EntryMode, ObjectType, Oid, RefUpdate, Signature, TreeChange, TreeEntry,
};

/// Flat tree snapshot: full path → (mode, oid). Files only; directories
/// are implied by path prefixes.
type TreeMap = BTreeMap<String, (EntryMode, Oid)>;

#[derive(Default)]
struct State {
    blobs: HashMap<Oid, Vec<u8>>,
    trees: HashMap<Oid, TreeMap>,
    commits: HashMap<Oid, CommitMeta>,
    refs: HashMap<String, Oid>,
}

/// An in-memory repository. Cheap to clone (`Arc` internally); clones
/// share state, so one instance can back several committers in a test.
#[derive(Clone, Default)]
pub struct MemoryRepo {
    inner: Arc<Mutex<State>>,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.inner
            .lock()
            .map_err(|e| Error::api(format!("state lock poisoned: {}", e)))
    }

    /// Create `branch` pointing at a fresh root commit with an empty tree.
    pub fn init_branch(&self, branch: &str) -> Result<Oid> {
        let tree_oid = {
            let mut state = self.lock()?;
            let empty = TreeMap::new();
            let oid = hash_tree(&empty);
            state.trees.insert(oid.clone(), empty);
            oid
        };
        let commit = self.create_commit(
            &tree_oid,
            &[],
            &format!("Initialize {}", branch),
            &Signature::default(),
        )?;
        self.lock()?.refs.insert(branch.to_string(), commit.clone());
        Ok(commit)
    }

    /// Walk the first-parent chain from the branch head back to the root.
    pub fn history(&self, branch: &str) -> Result<Vec<Oid>> {
        let state = self.lock()?;
        let mut current = state
            .refs
            .get(branch)
            .cloned()
            .ok_or_else(|| Error::branch_not_found(branch))?;
        let mut chain = Vec::new();
        loop {
            chain.push(current.clone());
            let meta = state
                .commits
                .get(&current)
                .ok_or_else(|| Error::not_found(format!("commit {}", current)))?;
            match meta.parents.first() {
                Some(parent) => current = parent.clone(),
                None => return Ok(chain),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Content addressing
// ---------------------------------------------------------------------------

fn hash_object(kind: &str, body: &[u8]) -> Oid {
    let mut hasher = Sha1::new();
    hasher.update(kind.as_bytes());
    hasher.update(b" ");
    hasher.update(body.len().to_string().as_bytes());
    hasher.update(b"\0");
    hasher.update(body);
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(40);
    for byte in digest {
        hex.push_str(&format!("{:02x}", byte));
    }
    Oid::new(hex)
}

fn hash_tree(entries: &TreeMap) -> Oid {
    let mut body = Vec::new();
    for (path, (mode, oid)) in entries {
        body.extend_from_slice(mode.as_wire_str().as_bytes());
        body.push(b' ');
        body.extend_from_slice(path.as_bytes());
        body.push(0);
        body.extend_from_slice(oid.as_str().as_bytes());
    }
    hash_object("tree", &body)
}

fn hash_commit(tree: &Oid, parents: &[Oid], message: &str, author: &Signature) -> Oid {
    let mut body = format!("tree {}\n", tree);
    for parent in parents {
        body.push_str(&format!("parent {}\n", parent));
    }
    body.push_str(&format!("author {} <{}>\n\n{}", author.name, author.email, message));
    hash_object("commit", body.as_bytes())
}

/// Deterministic address for an implied subdirectory: the hash of the
/// entries under it, relative to the prefix. Unchanged subtrees keep the
/// same address across snapshots.
fn hash_subtree(entries: &TreeMap, prefix: &str) -> Oid {
    let lead = format!("{}/", prefix);
    let mut scoped = TreeMap::new();
    for (path, entry) in entries {
        if let Some(rest) = path.strip_prefix(&lead) {
            scoped.insert(rest.to_string(), entry.clone());
        }
    }
    hash_tree(&scoped)
}

// ---------------------------------------------------------------------------
// Trait implementations
// ---------------------------------------------------------------------------

impl BlobStore for MemoryRepo {
    fn create_blob(&self, data: &[u8]) -> Result<Oid> {
        let oid = hash_object("blob", data);
        self.lock()?.blobs.insert(oid.clone(), data.to_vec());
        Ok(oid)
    }

    fn read_blob(&self, oid: &Oid) -> Result<Vec<u8>> {
        self.lock()?
            .blobs
            .get(oid)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("blob {}", oid)))
    }
}

impl TreeStore for MemoryRepo {
    fn create_tree(&self, base: Option<&Oid>, changes: &[TreeChange]) -> Result<Oid> {
        let mut state = self.lock()?;

        let mut entries = match base {
            Some(oid) => state
                .trees
                .get(oid)
                .cloned()
                .ok_or_else(|| Error::not_found(format!("tree {}", oid)))?,
            None => TreeMap::new(),
        };

        for change in changes {
            match &change.oid {
                Some(oid) => {
                    // The real provider refuses a tree whose paths nest a
                    // blob; keep the double as strict.
                    for (idx, _) in change.path.match_indices('/') {
                        if entries.contains_key(&change.path[..idx]) {
                            return Err(Error::api(format!(
                                "path conflict in tree: {} is a blob",
                                &change.path[..idx]
                            )));
                        }
                    }
                    let lead = format!("{}/", change.path);
                    if entries.keys().any(|k| k.starts_with(&lead)) {
                        return Err(Error::api(format!(
                            "path conflict in tree: {} has entries beneath it",
                            change.path
                        )));
                    }
                    entries.insert(change.path.clone(), (change.mode, oid.clone()));
                }
                None => {
                    entries.remove(&change.path);
                }
            }
        }

        let oid = hash_tree(&entries);
        state.trees.insert(oid.clone(), entries);
        Ok(oid)
    }

    fn read_tree(&self, oid: &Oid, recursive: bool) -> Result<Vec<TreeEntry>> {
        let state = self.lock()?;
        let entries = state
            .trees
            .get(oid)
            .ok_or_else(|| Error::not_found(format!("tree {}", oid)))?;

        let mut out: Vec<TreeEntry> = Vec::new();
        let mut dirs: BTreeSet<String> = BTreeSet::new();

        for (path, (mode, entry_oid)) in entries {
            // Collect the directory prefixes implied by this path.
            if let Some((dir_part, _)) = path.rsplit_once('/') {
                let mut prefix = String::new();
                for seg in dir_part.split('/') {
                    if !prefix.is_empty() {
                        prefix.push('/');
                    }
                    prefix.push_str(seg);
                    dirs.insert(prefix.clone());
                }
            }

            if !recursive && path.contains('/') {
                continue;
            }
            let size = state.blobs.get(entry_oid).map(|b| b.len() as u64);
            out.push(TreeEntry {
                path: path.clone(),
                mode: *mode,
                object_type: ObjectType::from_entry_mode(*mode),
                oid: entry_oid.clone(),
                size,
            });
        }

        for dir in dirs {
            if !recursive && dir.contains('/') {
                continue;
            }
            out.push(TreeEntry {
                oid: hash_subtree(entries, &dir),
                path: dir,
                mode: EntryMode::Subdirectory,
                object_type: ObjectType::Tree,
                size: None,
            });
        }

        out.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(out)
    }
}

impl CommitStore for MemoryRepo {
    fn create_commit(
        &self,
        tree: &Oid,
        parents: &[Oid],
        message: &str,
        author: &Signature,
    ) -> Result<Oid> {
        let mut state = self.lock()?;
        if !state.trees.contains_key(tree) {
            return Err(Error::not_found(format!("tree {}", tree)));
        }
        let oid = hash_commit(tree, parents, message, author);
        state.commits.insert(
            oid.clone(),
            CommitMeta {
                oid: oid.clone(),
                tree: tree.clone(),
                parents: parents.to_vec(),
                message: message.to_string(),
            },
        );
        Ok(oid)
    }

    fn read_commit(&self, oid: &Oid) -> Result<CommitMeta> {
        self.lock()?
            .commits
            .get(oid)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("commit {}", oid)))
    }
}

impl RefStore for MemoryRepo {
    fn read_ref(&self, branch: &str) -> Result<Oid> {
        self.lock()?
            .refs
            .get(branch)
            .cloned()
            .ok_or_else(|| Error::branch_not_found(branch))
    }

    fn update_ref(&self, branch: &str, expected: &Oid, new: &Oid) -> Result<RefUpdate> {
        let mut state = self.lock()?;
        if !state.commits.contains_key(new) {
            return Err(Error::not_found(format!("commit {}", new)));
        }
        let current = state
            .refs
            .get(branch)
            .cloned()
            .ok_or_else(|| Error::branch_not_found(branch))?;
        if &current != expected {
            return Ok(RefUpdate::Conflict { actual: current });
        }
        state.refs.insert(branch.to_string(), new.clone());
        Ok(RefUpdate::Updated)
    }
}
