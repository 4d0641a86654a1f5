//! Blocking client for the GitHub git-data REST API.
//!
//! Implements the collaborator traits over `api.github.com`. Every method
//! is one REST call; the committer sequences them. Transient transport
//! failures, rate limiting, and 5xx responses map to
//! [`Error::StorageUnavailable`] so callers can retry with backoff.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::client::{BlobStore, CommitStore, RefStore, TreeStore};
use crate::error::{Error, Result};
use crate::types::{
    CommitMeta, EntryMode, ObjectType, Oid, RefUpdate, RepoConfig, RepoInfo, Signature,
    TreeChange, TreeEntry,
};

const DEFAULT_API_BASE: &str = "https://api.github.com";
const ACCEPT: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!("gitcdn/", env!("CARGO_PKG_VERSION"));

/// A GitHub repository reached through the git-data API.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Clone)]
pub struct GithubClient {
    http: reqwest::blocking::Client,
    config: RepoConfig,
    api_base: String,
}

impl GithubClient {
    pub fn new(config: RepoConfig) -> Result<Self> {
        Self::with_api_base(config, DEFAULT_API_BASE)
    }

    /// Point the client at a different API host (GitHub Enterprise, or a
    /// local stub in tests).
    pub fn with_api_base(config: RepoConfig, api_base: impl Into<String>) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .build()
            .map_err(|e| Error::api(format!("failed to build http client: {}", e)))?;
        Ok(Self {
            http,
            config,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    /// Repository metadata, for status views.
    pub fn repo_info(&self) -> Result<RepoInfo> {
        let url = format!(
            "{}/repos/{}/{}",
            self.api_base, self.config.owner, self.config.repo
        );
        let resp = self.send(self.http.get(&url))?;
        self.expect_ok(resp, "get repository")?
            .json()
            .map_err(|e| Error::api(format!("malformed repository payload: {}", e)))
    }

    /// Whether the configured repository can be reached with the
    /// configured credentials.
    pub fn is_accessible(&self) -> bool {
        self.repo_info().is_ok()
    }

    // -- Internal -----------------------------------------------------------

    fn repo_url(&self, tail: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base, self.config.owner, self.config.repo, tail
        )
    }

    fn send(
        &self,
        req: reqwest::blocking::RequestBuilder,
    ) -> Result<reqwest::blocking::Response> {
        let mut req = req
            .header("Accept", ACCEPT)
            .header("User-Agent", USER_AGENT);
        if let Some(token) = &self.config.token {
            req = req.header("Authorization", format!("token {}", token));
        }
        req.send().map_err(|e| {
            if e.is_timeout() || e.is_connect() {
                Error::unavailable(e.to_string())
            } else {
                Error::api(e.to_string())
            }
        })
    }

    /// Check a response status, mapping retryable provider failures to
    /// `StorageUnavailable` and everything else to `Api`.
    fn expect_ok(
        &self,
        resp: reqwest::blocking::Response,
        what: &str,
    ) -> Result<reqwest::blocking::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().unwrap_or_default();
        if status.is_server_error() || status.as_u16() == 429 {
            return Err(Error::unavailable(format!(
                "{}: {} {}",
                what, status, body
            )));
        }
        Err(Error::api(format!("{}: {} {}", what, status, body)))
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ShaResponse {
    sha: String,
}

#[derive(Serialize)]
struct CreateBlobRequest<'a> {
    content: &'a str,
    encoding: &'a str,
}

#[derive(Deserialize)]
struct BlobResponse {
    content: String,
    encoding: String,
}

#[derive(Serialize)]
struct CreateTreeRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    base_tree: Option<&'a str>,
    tree: Vec<TreeChangeWire<'a>>,
}

/// One tree edit on the wire. `sha: None` serializes as an explicit JSON
/// null, which is how the API expresses a deletion.
#[derive(Serialize)]
struct TreeChangeWire<'a> {
    path: &'a str,
    mode: &'a str,
    #[serde(rename = "type")]
    object_type: &'a str,
    sha: Option<&'a str>,
}

#[derive(Deserialize)]
struct TreeResponse {
    tree: Vec<TreeEntryWire>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct TreeEntryWire {
    path: String,
    mode: String,
    #[serde(rename = "type")]
    object_type: String,
    sha: String,
    #[serde(default)]
    size: Option<u64>,
}

#[derive(Serialize)]
struct CreateCommitRequest<'a> {
    message: &'a str,
    tree: &'a str,
    parents: Vec<&'a str>,
    author: AuthorWire<'a>,
}

#[derive(Serialize)]
struct AuthorWire<'a> {
    name: &'a str,
    email: &'a str,
}

#[derive(Deserialize)]
struct CommitResponse {
    sha: String,
    tree: ShaResponse,
    #[serde(default)]
    parents: Vec<ShaResponse>,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct RefResponse {
    object: ShaResponse,
}

#[derive(Serialize)]
struct UpdateRefRequest<'a> {
    sha: &'a str,
    force: bool,
}

// ---------------------------------------------------------------------------
// Trait implementations
// ---------------------------------------------------------------------------

impl BlobStore for GithubClient {
    fn create_blob(&self, data: &[u8]) -> Result<Oid> {
        let content = BASE64.encode(data);
        let resp = self.send(self.http.post(self.repo_url("git/blobs")).json(
            &CreateBlobRequest {
                content: &content,
                encoding: "base64",
            },
        ))?;
        let body: ShaResponse = self
            .expect_ok(resp, "create blob")?
            .json()
            .map_err(|e| Error::api(format!("malformed blob response: {}", e)))?;
        Ok(Oid::new(body.sha))
    }

    fn read_blob(&self, oid: &Oid) -> Result<Vec<u8>> {
        let resp = self.send(
            self.http
                .get(self.repo_url(&format!("git/blobs/{}", oid))),
        )?;
        let status = resp.status();
        if status.as_u16() == 404 {
            return Err(Error::not_found(format!("blob {}", oid)));
        }
        let body: BlobResponse = self
            .expect_ok(resp, "get blob")?
            .json()
            .map_err(|e| Error::api(format!("malformed blob payload: {}", e)))?;
        match body.encoding.as_str() {
            "base64" => {
                // The API wraps base64 content in newlines.
                let packed: String =
                    body.content.chars().filter(|c| !c.is_whitespace()).collect();
                BASE64
                    .decode(packed)
                    .map_err(|e| Error::api(format!("invalid base64 in blob {}: {}", oid, e)))
            }
            "utf-8" => Ok(body.content.into_bytes()),
            other => Err(Error::api(format!(
                "unsupported blob encoding '{}' for {}",
                other, oid
            ))),
        }
    }
}

impl TreeStore for GithubClient {
    fn create_tree(&self, base: Option<&Oid>, changes: &[TreeChange]) -> Result<Oid> {
        let tree: Vec<TreeChangeWire<'_>> = changes
            .iter()
            .map(|c| TreeChangeWire {
                path: &c.path,
                mode: c.mode.as_wire_str(),
                object_type: ObjectType::from_entry_mode(c.mode).as_wire_str(),
                sha: c.oid.as_ref().map(|o| o.as_str()),
            })
            .collect();
        let req = CreateTreeRequest {
            base_tree: base.map(|o| o.as_str()),
            tree,
        };
        let resp = self.send(self.http.post(self.repo_url("git/trees")).json(&req))?;
        let body: ShaResponse = self
            .expect_ok(resp, "create tree")?
            .json()
            .map_err(|e| Error::api(format!("malformed tree response: {}", e)))?;
        Ok(Oid::new(body.sha))
    }

    fn read_tree(&self, oid: &Oid, recursive: bool) -> Result<Vec<TreeEntry>> {
        let mut url = self.repo_url(&format!("git/trees/{}", oid));
        if recursive {
            url.push_str("?recursive=1");
        }
        let resp = self.send(self.http.get(&url))?;
        if resp.status().as_u16() == 404 {
            return Err(Error::not_found(format!("tree {}", oid)));
        }
        let body: TreeResponse = self
            .expect_ok(resp, "get tree")?
            .json()
            .map_err(|e| Error::api(format!("malformed tree payload: {}", e)))?;
        if body.truncated {
            // The API silently drops entries past its limit; a partial
            // snapshot must never feed a rebuild.
            warn!("tree {} listing truncated by provider", oid);
            return Err(Error::api(format!("tree {} listing truncated", oid)));
        }

        let mut entries = Vec::with_capacity(body.tree.len());
        for wire in body.tree {
            let mode = EntryMode::from_wire_str(&wire.mode).ok_or_else(|| {
                Error::api(format!("unknown mode '{}' for {}", wire.mode, wire.path))
            })?;
            let object_type = ObjectType::from_wire_str(&wire.object_type)
                .unwrap_or(ObjectType::from_entry_mode(mode));
            entries.push(TreeEntry {
                path: wire.path,
                mode,
                object_type,
                oid: Oid::new(wire.sha),
                size: wire.size,
            });
        }
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }
}

impl CommitStore for GithubClient {
    fn create_commit(
        &self,
        tree: &Oid,
        parents: &[Oid],
        message: &str,
        author: &Signature,
    ) -> Result<Oid> {
        let req = CreateCommitRequest {
            message,
            tree: tree.as_str(),
            parents: parents.iter().map(|p| p.as_str()).collect(),
            author: AuthorWire {
                name: &author.name,
                email: &author.email,
            },
        };
        let resp = self.send(self.http.post(self.repo_url("git/commits")).json(&req))?;
        let body: ShaResponse = self
            .expect_ok(resp, "create commit")?
            .json()
            .map_err(|e| Error::api(format!("malformed commit response: {}", e)))?;
        Ok(Oid::new(body.sha))
    }

    fn read_commit(&self, oid: &Oid) -> Result<CommitMeta> {
        let resp = self.send(
            self.http
                .get(self.repo_url(&format!("git/commits/{}", oid))),
        )?;
        if resp.status().as_u16() == 404 {
            return Err(Error::not_found(format!("commit {}", oid)));
        }
        let body: CommitResponse = self
            .expect_ok(resp, "get commit")?
            .json()
            .map_err(|e| Error::api(format!("malformed commit payload: {}", e)))?;
        Ok(CommitMeta {
            oid: Oid::new(body.sha),
            tree: Oid::new(body.tree.sha),
            parents: body.parents.into_iter().map(|p| Oid::new(p.sha)).collect(),
            message: body.message,
        })
    }
}

impl RefStore for GithubClient {
    fn read_ref(&self, branch: &str) -> Result<Oid> {
        let resp = self.send(
            self.http
                .get(self.repo_url(&format!("git/ref/heads/{}", branch))),
        )?;
        if resp.status().as_u16() == 404 {
            return Err(Error::branch_not_found(branch));
        }
        let body: RefResponse = self
            .expect_ok(resp, "get ref")?
            .json()
            .map_err(|e| Error::api(format!("malformed ref payload: {}", e)))?;
        Ok(Oid::new(body.object.sha))
    }

    fn update_ref(&self, branch: &str, expected: &Oid, new: &Oid) -> Result<RefUpdate> {
        // The API has no explicit expected-value parameter. A non-forced
        // update only accepts fast-forwards, and our new commit's sole
        // parent is `expected` — so if the head has moved past `expected`
        // the update is no longer a fast-forward and is refused with 422,
        // which is exactly the conflict signal we need.
        let resp = self.send(
            self.http
                .patch(self.repo_url(&format!("git/refs/heads/{}", branch)))
                .json(&UpdateRefRequest {
                    sha: new.as_str(),
                    force: false,
                }),
        )?;
        let status = resp.status();
        if status.as_u16() == 404 {
            return Err(Error::branch_not_found(branch));
        }
        if status.as_u16() == 422 || status.as_u16() == 409 {
            let actual = self.read_ref(branch)?;
            if &actual == expected {
                // Refused for some other reason while the head still
                // matches; surface the payload instead of a fake conflict.
                let body = resp.text().unwrap_or_default();
                return Err(Error::api(format!("update ref: {} {}", status, body)));
            }
            return Ok(RefUpdate::Conflict { actual });
        }
        self.expect_ok(resp, "update ref")?;
        Ok(RefUpdate::Updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_delete_serializes_explicit_null_sha() {
        let wire = TreeChangeWire {
            path: "old.txt",
            mode: "100644",
            object_type: "blob",
            sha: None,
        };
        let json = serde_json::to_value(&wire).unwrap();
        // Omitting `sha` would be a no-op edit; null is what deletes.
        assert_eq!(json["sha"], serde_json::Value::Null);
    }

    #[test]
    fn tree_request_omits_absent_base() {
        let req = CreateTreeRequest {
            base_tree: None,
            tree: vec![],
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("base_tree").is_none());
    }

    #[test]
    fn api_base_trailing_slash_is_trimmed() {
        let client = GithubClient::with_api_base(
            RepoConfig::new("octo", "assets"),
            "https://ghe.example.com/api/v3/",
        )
        .unwrap();
        assert_eq!(
            client.repo_url("git/blobs"),
            "https://ghe.example.com/api/v3/repos/octo/assets/git/blobs"
        );
    }
}
