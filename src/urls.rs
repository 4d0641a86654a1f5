//! Public download-URL derivation.
//!
//! Pure string templates over {owner, repo, branch, path} — no network
//! calls. Exposed so UI callers can render copyable links next to each
//! file.

/// A named public URL for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdnUrl {
    pub name: &'static str,
    pub url: String,
}

/// Direct raw-content URL on the hosting provider.
pub fn raw_url(owner: &str, repo: &str, branch: &str, path: &str) -> String {
    format!(
        "https://raw.githubusercontent.com/{}/{}/{}/{}",
        owner, repo, branch, path
    )
}

/// jsDelivr mirror URL.
pub fn jsdelivr_url(owner: &str, repo: &str, branch: &str, path: &str) -> String {
    format!(
        "https://cdn.jsdelivr.net/gh/{}/{}@{}/{}",
        owner, repo, branch, path
    )
}

/// Extract `(owner, repo)` from a repository URL.
///
/// Accepts the https and ssh forms; a trailing `.git` on the repo name
/// is dropped. Returns `None` when no owner/repo pair can be found.
pub fn parse_repo_url(url: &str) -> Option<(String, String)> {
    let (_, rest) = url.split_once("github.com")?;
    let mut segments = rest.trim_start_matches([':', '/']).split('/');
    let owner = segments.next().filter(|s| !s.is_empty())?;
    let repo = segments
        .next()
        .map(|s| s.trim_end_matches(".git"))
        .filter(|s| !s.is_empty())?;
    Some((owner.to_string(), repo.to_string()))
}

/// Every public URL we can derive for a file.
pub fn all_urls(owner: &str, repo: &str, branch: &str, path: &str) -> Vec<CdnUrl> {
    vec![
        CdnUrl {
            name: "GitHub Raw",
            url: raw_url(owner, repo, branch, path),
        },
        CdnUrl {
            name: "jsDelivr",
            url: jsdelivr_url(owner, repo, branch, path),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_url_template() {
        assert_eq!(
            raw_url("octo", "assets", "main", "img/logo.png"),
            "https://raw.githubusercontent.com/octo/assets/main/img/logo.png"
        );
    }

    #[test]
    fn jsdelivr_url_template() {
        assert_eq!(
            jsdelivr_url("octo", "assets", "main", "img/logo.png"),
            "https://cdn.jsdelivr.net/gh/octo/assets@main/img/logo.png"
        );
    }

    #[test]
    fn parse_repo_url_accepts_common_forms() {
        for url in [
            "https://github.com/octo/assets",
            "https://github.com/octo/assets.git",
            "https://github.com/octo/assets/tree/main",
            "git@github.com:octo/assets.git",
            "github.com/octo/assets",
        ] {
            assert_eq!(
                parse_repo_url(url),
                Some(("octo".to_string(), "assets".to_string())),
                "url {:?}",
                url
            );
        }
    }

    #[test]
    fn parse_repo_url_rejects_non_repo_urls() {
        assert_eq!(parse_repo_url("https://github.com/octo"), None);
        assert_eq!(parse_repo_url("https://example.com/octo/assets"), None);
        assert_eq!(parse_repo_url(""), None);
    }

    #[test]
    fn all_urls_names_both_hosts() {
        let urls = all_urls("octo", "assets", "main", "a.txt");
        let names: Vec<&str> = urls.iter().map(|u| u.name).collect();
        assert_eq!(names, ["GitHub Raw", "jsDelivr"]);
    }
}
