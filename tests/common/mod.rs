use std::cell::{Cell, RefCell};

use gitcdn::*;

pub fn config() -> RepoConfig {
    RepoConfig::new("octo", "assets")
}

pub fn new_repo() -> MemoryRepo {
    let repo = MemoryRepo::new();
    repo.init_branch("main").unwrap();
    repo
}

#[allow(dead_code)]
pub fn store(repo: &MemoryRepo) -> CdnStore<MemoryRepo> {
    CdnStore::new(repo.clone(), config()).unwrap()
}

#[allow(dead_code)]
pub fn store_with_files(repo: &MemoryRepo) -> CdnStore<MemoryRepo> {
    let store = store(repo);
    store.upload("hello.txt", b"hello").unwrap();
    store.upload("dir/a.txt", b"aaa").unwrap();
    store.upload("dir/b.txt", b"bbb").unwrap();
    store
}

/// Wraps a [`MemoryRepo`] with programmable failures, for driving the
/// committer into its retry and compensation paths.
///
/// `skip_updates` ref updates pass through first, then `fail_updates` of
/// them return `StorageUnavailable`. `race_once` runs just before the
/// next ref update, letting a test commit a competing change and lose
/// the victim's compare-and-set.
pub struct FaultClient {
    inner: MemoryRepo,
    skip_updates: Cell<u32>,
    fail_updates: Cell<u32>,
    lose_next_ack: Cell<bool>,
    update_calls: Cell<u32>,
    race_once: RefCell<Option<Box<dyn FnOnce()>>>,
}

#[allow(dead_code)]
impl FaultClient {
    pub fn new(inner: MemoryRepo) -> Self {
        Self {
            inner,
            skip_updates: Cell::new(0),
            fail_updates: Cell::new(0),
            lose_next_ack: Cell::new(false),
            update_calls: Cell::new(0),
            race_once: RefCell::new(None),
        }
    }

    /// Let `skip` ref updates succeed, then fail the next `fail` of them.
    pub fn fail_updates_after(&self, skip: u32, fail: u32) {
        self.skip_updates.set(skip);
        self.fail_updates.set(fail);
    }

    /// Apply the next ref update but report a transient failure, as if
    /// the response was lost in transit.
    pub fn lose_next_ack(&self) {
        self.lose_next_ack.set(true);
    }

    /// Run `f` immediately before the next ref update.
    pub fn race_once(&self, f: impl FnOnce() + 'static) {
        *self.race_once.borrow_mut() = Some(Box::new(f));
    }

    /// Total ref updates attempted through this client.
    pub fn update_calls(&self) -> u32 {
        self.update_calls.get()
    }
}

impl BlobStore for FaultClient {
    fn create_blob(&self, data: &[u8]) -> Result<Oid> {
        self.inner.create_blob(data)
    }

    fn read_blob(&self, oid: &Oid) -> Result<Vec<u8>> {
        self.inner.read_blob(oid)
    }
}

impl TreeStore for FaultClient {
    fn create_tree(&self, base: Option<&Oid>, changes: &[TreeChange]) -> Result<Oid> {
        self.inner.create_tree(base, changes)
    }

    fn read_tree(&self, oid: &Oid, recursive: bool) -> Result<Vec<TreeEntry>> {
        self.inner.read_tree(oid, recursive)
    }
}

impl CommitStore for FaultClient {
    fn create_commit(
        &self,
        tree: &Oid,
        parents: &[Oid],
        message: &str,
        author: &Signature,
    ) -> Result<Oid> {
        self.inner.create_commit(tree, parents, message, author)
    }

    fn read_commit(&self, oid: &Oid) -> Result<CommitMeta> {
        self.inner.read_commit(oid)
    }
}

impl RefStore for FaultClient {
    fn read_ref(&self, branch: &str) -> Result<Oid> {
        self.inner.read_ref(branch)
    }

    fn update_ref(&self, branch: &str, expected: &Oid, new: &Oid) -> Result<RefUpdate> {
        if let Some(hook) = self.race_once.borrow_mut().take() {
            hook();
        }
        self.update_calls.set(self.update_calls.get() + 1);
        if self.lose_next_ack.get() {
            self.lose_next_ack.set(false);
            self.inner.update_ref(branch, expected, new)?;
            return Err(Error::unavailable("response lost"));
        }
        if self.skip_updates.get() > 0 {
            self.skip_updates.set(self.skip_updates.get() - 1);
        } else if self.fail_updates.get() > 0 {
            self.fail_updates.set(self.fail_updates.get() - 1);
            return Err(Error::unavailable("injected outage"));
        }
        self.inner.update_ref(branch, expected, new)
    }
}

/// The (path, oid) pairs of every file on the branch.
#[allow(dead_code)]
pub fn file_set(repo: &MemoryRepo, branch: &str) -> Vec<(String, Oid)> {
    let committer =
        TreeMutationCommitter::new(repo.clone(), config().branch(branch)).unwrap();
    committer
        .snapshot()
        .unwrap()
        .into_iter()
        .filter(|e| e.mode.is_file())
        .map(|e| (e.path, e.oid))
        .collect()
}
