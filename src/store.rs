//! User-facing facade over one repository-as-CDN.
//!
//! [`CdnStore`] pairs a [`TreeMutationCommitter`] with the read side
//! (listing, download) and public-URL derivation. Dashboard and command
//! palette callers consume this surface.

use crate::client::RepoClient;
use crate::committer::{AddOptions, RemoveOptions, TreeMutationCommitter};
use crate::error::{Error, Result};
use crate::paths;
use crate::types::{
    CommitReceipt, EntryMode, FileInfo, RenameReceipt, RepoConfig, RetryPolicy,
};
use crate::urls::{self, CdnUrl};

#[derive(Debug, Clone)]
pub struct UploadOptions {
    /// Replace an existing file instead of failing. Off by default.
    pub overwrite: bool,
    pub message: Option<String>,
    pub mode: EntryMode,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            overwrite: false,
            message: None,
            mode: EntryMode::File,
        }
    }
}

/// A repository used as a content-delivery store.
pub struct CdnStore<C> {
    committer: TreeMutationCommitter<C>,
}

impl<C: RepoClient> CdnStore<C> {
    pub fn new(client: C, config: RepoConfig) -> Result<Self> {
        Ok(Self {
            committer: TreeMutationCommitter::new(client, config)?,
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.committer = self.committer.with_retry(retry);
        self
    }

    /// The underlying committer, for callers that need raw tree access.
    pub fn committer(&self) -> &TreeMutationCommitter<C> {
        &self.committer
    }

    pub fn config(&self) -> &RepoConfig {
        self.committer.config()
    }

    // -- Read ---------------------------------------------------------------

    /// List every file on the branch, sorted by path.
    pub fn list_files(&self) -> Result<Vec<FileInfo>> {
        let config = self.config();
        let entries = self.committer.snapshot()?;
        Ok(entries
            .into_iter()
            .filter(|e| e.mode.is_file())
            .map(|e| FileInfo {
                name: paths::basename(&e.path).to_string(),
                download_url: urls::raw_url(&config.owner, &config.repo, &config.branch, &e.path),
                path: e.path,
                size: e.size,
                oid: e.oid,
            })
            .collect())
    }

    /// Read the bytes of the file at `path`.
    pub fn download(&self, path: &str) -> Result<Vec<u8>> {
        let path = paths::normalize_path(path)?;
        let entries = self.committer.snapshot()?;
        let entry = entries
            .iter()
            .find(|e| e.path == path)
            .ok_or_else(|| Error::not_found(&path))?;
        if entry.mode == EntryMode::Subdirectory {
            return Err(Error::invalid_path(format!("{} is a directory", path)));
        }
        self.committer.client().read_blob(&entry.oid)
    }

    // -- Write --------------------------------------------------------------

    /// Upload `data` as a new file at `path`.
    ///
    /// Fails with [`Error::PathCollision`] if the path is already taken.
    pub fn upload(&self, path: &str, data: &[u8]) -> Result<CommitReceipt> {
        self.upload_with(path, data, UploadOptions::default())
    }

    pub fn upload_with(
        &self,
        path: &str,
        data: &[u8],
        opts: UploadOptions,
    ) -> Result<CommitReceipt> {
        let path = paths::normalize_path(path)?;
        let blob = self.committer.client().create_blob(data)?;
        self.committer.add_or_replace(
            &path,
            &blob,
            opts.mode,
            AddOptions {
                overwrite: opts.overwrite,
                message: opts.message,
            },
        )
    }

    /// Delete the file at `path`.
    pub fn delete(&self, path: &str) -> Result<CommitReceipt> {
        self.committer.remove(path, RemoveOptions::default())
    }

    /// Rename a file, preserving its content address. See
    /// [`TreeMutationCommitter::rename`] for the failure contract.
    pub fn rename(&self, old_path: &str, new_path: &str) -> Result<RenameReceipt> {
        self.committer.rename(old_path, new_path)
    }

    // -- URLs ---------------------------------------------------------------

    /// The raw download URL for `path`.
    pub fn file_url(&self, path: &str) -> String {
        let config = self.config();
        urls::raw_url(&config.owner, &config.repo, &config.branch, path)
    }

    /// Every public URL we can derive for `path`.
    pub fn file_urls(&self, path: &str) -> Vec<CdnUrl> {
        let config = self.config();
        urls::all_urls(&config.owner, &config.repo, &config.branch, path)
    }
}
