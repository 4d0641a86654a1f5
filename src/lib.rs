//! A hosted git repository as a content-delivery store.
//!
//! `gitcdn` lists, uploads, renames, and deletes files in a repository by
//! manipulating tree and commit objects through the provider's git-data
//! REST API. Every write is one commit; the branch head only ever moves
//! by compare-and-set, so a concurrent writer is detected rather than
//! overwritten.
//!
//! # Key types
//!
//! - [`CdnStore`] — the user-facing surface: list, upload, download,
//!   delete, rename, and public-URL derivation.
//! - [`TreeMutationCommitter`] — the tree-mutation commit protocol: one
//!   structural change per commit, guarded ref update, conflict retry,
//!   and the two-phase rename with compensation.
//! - [`GithubClient`] — blocking REST client for the GitHub git-data API.
//! - [`MemoryRepo`] — in-process store implementing the same traits.
//!
//! # Quick example
//!
//! ```rust,no_run
//! use gitcdn::{CdnStore, GithubClient, RepoConfig};
//!
//! let config = RepoConfig::new("octo", "assets").token("ghp_...");
//! let client = GithubClient::new(config.clone()).unwrap();
//! let store = CdnStore::new(client, config).unwrap();
//!
//! let receipt = store.upload("img/logo.png", &[0x89, 0x50]).unwrap();
//! println!("served at {}", receipt.url.unwrap());
//!
//! store.rename("img/logo.png", "img/logo-v2.png").unwrap();
//! ```

pub mod client;
pub mod committer;
pub mod error;
pub mod github;
pub mod memory;
pub mod paths;
pub mod store;
pub mod types;
pub mod urls;

// Re-export primary public types at crate root.
pub use client::{BlobStore, CommitStore, RefStore, RepoClient, TreeStore};
pub use committer::{AddOptions, RemoveOptions, TreeMutationCommitter};
pub use error::{Error, Result};
pub use github::GithubClient;
pub use memory::MemoryRepo;
pub use store::{CdnStore, UploadOptions};
pub use types::*;
pub use urls::CdnUrl;
