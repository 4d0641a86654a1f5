//! The tree-mutation commit protocol.
//!
//! [`TreeMutationCommitter`] builds a new commit on a branch by applying a
//! single structural change (add, remove, or rename one entry) to the
//! existing tree and advancing the branch head with a guarded
//! compare-and-set. Every operation either fully succeeds or leaves the
//! branch exactly as it was; the composite [`rename`] is the one exception
//! and reports its partial-failure state explicitly.
//!
//! [`rename`]: TreeMutationCommitter::rename

use log::{debug, warn};

use crate::client::RepoClient;
use crate::error::{Error, Result};
use crate::paths;
use crate::types::{
    CommitMeta, CommitReceipt, EntryMode, Oid, RefUpdate, RenameReceipt, RepoConfig,
    RetryPolicy, TreeChange, TreeEntry,
};
use crate::urls;

// ---------------------------------------------------------------------------
// Option structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct AddOptions {
    /// Replace an existing entry at the path instead of failing with
    /// [`Error::PathCollision`]. Off by default: overwriting silently would
    /// lose data.
    pub overwrite: bool,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RemoveOptions {
    pub message: Option<String>,
}

// ---------------------------------------------------------------------------
// Rename state machine
// ---------------------------------------------------------------------------

/// States of the two-phase rename protocol.
///
/// `Start → PhaseA → PhaseB → done`, with `Compensate` entered only when
/// phase B fails after phase A committed. The ordering (create the new
/// path before deleting the old) means a failure can leave a duplicate
/// behind, never a void.
enum RenameState {
    Start,
    /// Create the new path, reusing the old entry's content address.
    PhaseA { entry: TreeEntry },
    /// Phase A committed; delete the old path.
    PhaseB,
    /// Phase B failed; try to undo phase A by removing the new path.
    Compensate { cause: Error },
}

// ---------------------------------------------------------------------------
// TreeMutationCommitter
// ---------------------------------------------------------------------------

/// Commits single-entry tree mutations to one branch of one repository.
///
/// Generic over the hosting provider via [`RepoClient`]. The committer
/// holds no mutable state of its own; the only shared mutable resource is
/// the remote branch ref, which is only ever advanced by compare-and-set.
pub struct TreeMutationCommitter<C> {
    client: C,
    config: RepoConfig,
    retry: RetryPolicy,
}

impl<C: RepoClient> TreeMutationCommitter<C> {
    pub fn new(client: C, config: RepoConfig) -> Result<Self> {
        paths::validate_branch_name(&config.branch)?;
        Ok(Self {
            client,
            config,
            retry: RetryPolicy::default(),
        })
    }

    /// Replace the default retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    /// The branch's current head commit.
    pub fn head(&self) -> Result<CommitMeta> {
        let head = self.client.read_ref(&self.config.branch)?;
        self.client.read_commit(&head)
    }

    /// The branch's current tree, listed recursively.
    pub fn snapshot(&self) -> Result<Vec<TreeEntry>> {
        let head = self.head()?;
        self.client.read_tree(&head.tree, true)
    }

    // -- Single-step operations ---------------------------------------------

    /// Add an entry at `path` pointing at already-stored content.
    ///
    /// Fails with [`Error::PathCollision`] if the path exists, unless
    /// `opts.overwrite` is set.
    pub fn add_or_replace(
        &self,
        path: &str,
        oid: &Oid,
        mode: EntryMode,
        opts: AddOptions,
    ) -> Result<CommitReceipt> {
        let path = paths::normalize_path(path)?;
        let message = paths::format_commit_message(
            format!("Upload {}", path),
            opts.message.as_deref(),
        );
        let oid = oid.clone();

        let commit = self.mutate(&message, |entries| {
            plan_add(entries, &path, oid.clone(), mode, opts.overwrite)
        })?;

        Ok(CommitReceipt {
            commit,
            url: Some(self.download_url(&path)),
            path,
        })
    }

    /// Remove the entry at `path`.
    ///
    /// All other entries keep their content address; nothing is re-hashed.
    pub fn remove(&self, path: &str, opts: RemoveOptions) -> Result<CommitReceipt> {
        let path = paths::normalize_path(path)?;
        let message = paths::format_commit_message(
            format!("Delete {}", path),
            opts.message.as_deref(),
        );

        let commit = self.mutate(&message, |entries| plan_remove(entries, &path))?;

        Ok(CommitReceipt {
            commit,
            path,
            url: None,
        })
    }

    // -- Rename -------------------------------------------------------------

    /// Rename `old_path` to `new_path`, reusing the existing content
    /// address — the content itself never makes a round trip.
    ///
    /// Not atomic at the provider level: phase A commits the new path,
    /// phase B deletes the old one, so success costs two commits. If phase
    /// B fails the committer attempts a compensating removal of the new
    /// path; see [`Error::RenameRolledBack`] and [`Error::PartialRename`]
    /// for the two outcomes.
    pub fn rename(&self, old_path: &str, new_path: &str) -> Result<RenameReceipt> {
        let old_path = paths::normalize_path(old_path)?;
        let new_path = paths::normalize_path(new_path)?;
        if old_path == new_path {
            return Err(Error::invalid_path(
                "source and destination are the same path",
            ));
        }

        let message = format!("Rename {} -> {}", old_path, new_path);
        let mut state = RenameState::Start;

        loop {
            state = match state {
                RenameState::Start => {
                    let entries = self.snapshot()?;
                    let entry = entries
                        .iter()
                        .find(|e| e.path == old_path)
                        .ok_or_else(|| Error::not_found(&old_path))?;
                    if entry.mode == EntryMode::Subdirectory {
                        return Err(Error::invalid_path(format!(
                            "{} is a directory",
                            old_path
                        )));
                    }
                    if entries.iter().any(|e| e.path == new_path) {
                        return Err(Error::path_collision(&new_path));
                    }
                    RenameState::PhaseA {
                        entry: entry.clone(),
                    }
                }

                RenameState::PhaseA { entry } => {
                    // A failure here aborts cleanly: nothing was committed.
                    self.add_or_replace(
                        &new_path,
                        &entry.oid,
                        entry.mode,
                        AddOptions {
                            overwrite: false,
                            message: Some(message.clone()),
                        },
                    )?;
                    RenameState::PhaseB
                }

                RenameState::PhaseB => {
                    match self.remove(
                        &old_path,
                        RemoveOptions {
                            message: Some(message.clone()),
                        },
                    ) {
                        Ok(receipt) => {
                            return Ok(RenameReceipt {
                                commit: receipt.commit,
                                url: Some(self.download_url(&new_path)),
                                old_path,
                                new_path,
                            });
                        }
                        Err(cause) => RenameState::Compensate { cause },
                    }
                }

                RenameState::Compensate { cause } => {
                    debug!(
                        "rename {} -> {}: phase B failed ({}), removing {}",
                        old_path, new_path, cause, new_path
                    );
                    match self.remove(
                        &new_path,
                        RemoveOptions {
                            message: Some(format!("Revert rename of {}", old_path)),
                        },
                    ) {
                        Ok(_) => return Err(Error::rolled_back(cause)),
                        Err(comp_err) => {
                            warn!(
                                "rename {} -> {}: compensation also failed ({}); \
                                 both paths remain",
                                old_path, new_path, comp_err
                            );
                            return Err(Error::partial_rename(old_path, new_path));
                        }
                    }
                }
            };
        }
    }

    // -- Internal -----------------------------------------------------------

    fn download_url(&self, path: &str) -> String {
        urls::raw_url(&self.config.owner, &self.config.repo, &self.config.branch, path)
    }

    /// Run one read-plan-commit-swap cycle, retrying per the policy.
    ///
    /// `plan` inspects the current tree and produces the single change to
    /// apply, or fails (collision, not found). A lost compare-and-set
    /// restarts the whole cycle from a fresh read so the delta is replayed
    /// on top of the winner, never merged blindly. Tree and commit objects
    /// created by a losing attempt are unreachable orphans and need no
    /// cleanup.
    fn mutate<F>(&self, message: &str, plan: F) -> Result<Oid>
    where
        F: Fn(&[TreeEntry]) -> Result<TreeChange>,
    {
        let branch = &self.config.branch;
        let mut attempt = 1;

        loop {
            match self.mutate_once(branch, message, &plan) {
                Ok(Attempt::Committed(commit)) => return Ok(commit),
                Ok(Attempt::Conflict { expected, actual }) => {
                    if attempt >= self.retry.max_attempts {
                        return Err(Error::ref_conflict(branch.clone(), expected, actual));
                    }
                    debug!(
                        "ref update conflict on '{}' (attempt {}): head moved to {}",
                        branch, attempt, actual
                    );
                }
                Err(Error::StorageUnavailable(msg)) => {
                    if attempt >= self.retry.max_attempts {
                        return Err(Error::unavailable(msg));
                    }
                    debug!(
                        "storage unavailable on '{}' (attempt {}): {}",
                        branch, attempt, msg
                    );
                    std::thread::sleep(self.retry.backoff);
                }
                Err(err) => return Err(err),
            }
            attempt += 1;
        }
    }

    fn mutate_once<F>(&self, branch: &str, message: &str, plan: &F) -> Result<Attempt>
    where
        F: Fn(&[TreeEntry]) -> Result<TreeChange>,
    {
        let head_oid = self.client.read_ref(branch)?;
        let head = self.client.read_commit(&head_oid)?;
        let entries = self.client.read_tree(&head.tree, true)?;

        let change = plan(&entries)?;

        let new_tree = self.client.create_tree(Some(&head.tree), &[change])?;
        let new_commit = self.client.create_commit(
            &new_tree,
            std::slice::from_ref(&head.oid),
            message,
            &self.config.signature,
        )?;

        match self.client.update_ref(branch, &head.oid, &new_commit) {
            Ok(RefUpdate::Updated) => Ok(Attempt::Committed(new_commit)),
            Ok(RefUpdate::Conflict { actual }) => Ok(Attempt::Conflict {
                expected: head.oid,
                actual,
            }),
            Err(Error::StorageUnavailable(msg)) => {
                // The update may have landed with only the response lost.
                // Replanning would then see our own commit and misreport a
                // collision, so check the head before surfacing the outage.
                if let Ok(head_now) = self.client.read_ref(branch) {
                    if head_now == new_commit {
                        debug!(
                            "ref update on '{}' landed despite lost response",
                            branch
                        );
                        return Ok(Attempt::Committed(new_commit));
                    }
                }
                Err(Error::unavailable(msg))
            }
            Err(err) => Err(err),
        }
    }
}

/// Outcome of a single read-plan-commit-swap cycle.
enum Attempt {
    Committed(Oid),
    Conflict { expected: Oid, actual: Oid },
}

// ---------------------------------------------------------------------------
// Change planners
// ---------------------------------------------------------------------------

fn plan_add(
    entries: &[TreeEntry],
    path: &str,
    oid: Oid,
    mode: EntryMode,
    overwrite: bool,
) -> Result<TreeChange> {
    if let Some(existing) = entries.iter().find(|e| e.path == path) {
        if existing.mode == EntryMode::Subdirectory {
            return Err(Error::path_collision(format!(
                "{} exists as a directory",
                path
            )));
        }
        if !overwrite {
            return Err(Error::path_collision(path));
        }
    }
    // An ancestor that exists as a file would leave two entries with the
    // same name in the snapshot, one blob and one implied directory.
    for (idx, _) in path.match_indices('/') {
        let ancestor = &path[..idx];
        if entries
            .iter()
            .any(|e| e.path == ancestor && e.mode != EntryMode::Subdirectory)
        {
            return Err(Error::path_collision(format!(
                "{} exists as a file",
                ancestor
            )));
        }
    }
    Ok(TreeChange::put(path, oid, mode))
}

fn plan_remove(entries: &[TreeEntry], path: &str) -> Result<TreeChange> {
    let entry = entries
        .iter()
        .find(|e| e.path == path)
        .ok_or_else(|| Error::not_found(path))?;
    if entry.mode == EntryMode::Subdirectory {
        return Err(Error::invalid_path(format!("{} is a directory", path)));
    }
    Ok(TreeChange::delete(path))
}
