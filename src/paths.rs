use crate::error::{Error, Result};

/// Normalize a store path: strip leading/trailing slashes, reject `.`/`..`
/// segments, and collapse repeated slashes.
///
/// Unlike a filesystem path, an empty result is an error here — every
/// committer operation targets exactly one named entry.
///
/// # Errors
/// Returns [`Error::InvalidPath`] if the path is empty or contains `.` or
/// `..` segments.
pub fn normalize_path(path: &str) -> Result<String> {
    let mut segments: Vec<&str> = Vec::new();
    for seg in path.split('/') {
        if seg.is_empty() {
            // skip empty segments (from leading/trailing/double slashes)
            continue;
        }
        if seg == "." || seg == ".." {
            return Err(Error::invalid_path(format!(
                "path segment '{}' is not allowed",
                seg,
            )));
        }
        segments.push(seg);
    }

    if segments.is_empty() {
        return Err(Error::invalid_path("path must not be empty"));
    }

    Ok(segments.join("/"))
}

/// Validate a branch name per git's `check-ref-format` rules.
///
/// Rejects spaces, tabs, control characters, `..`, `@{`, trailing `.`,
/// and `.lock` suffix.
///
/// # Errors
/// Returns [`Error::InvalidBranchName`] if the name violates any rule.
pub fn validate_branch_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_branch_name("branch name must not be empty"));
    }

    for ch in name.chars() {
        match ch {
            ':' | ' ' | '\t' | '\n' | '\r' | '\\' | '^' | '~' | '?' | '*' | '[' => {
                return Err(Error::invalid_branch_name(format!(
                    "branch name contains invalid character: {:?}",
                    ch,
                )));
            }
            _ => {}
        }
    }

    if name.contains("..") {
        return Err(Error::invalid_branch_name(
            "branch name must not contain '..'",
        ));
    }

    if name.contains("@{") {
        return Err(Error::invalid_branch_name(
            "branch name must not contain '@{'",
        ));
    }

    if name.ends_with('.') {
        return Err(Error::invalid_branch_name(
            "branch name must not end with '.'",
        ));
    }

    if name.ends_with(".lock") {
        return Err(Error::invalid_branch_name(
            "branch name must not end with '.lock'",
        ));
    }

    Ok(())
}

/// The basename of a slash-separated path.
pub fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Format a commit message from an operation and optional user message.
///
/// If `message` is `Some`, it is used directly; otherwise the default for
/// the operation is used.
pub fn format_commit_message(default: String, message: Option<&str>) -> String {
    match message {
        Some(msg) => msg.to_string(),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_slashes() {
        assert_eq!(normalize_path("/a/b/c/").unwrap(), "a/b/c");
    }

    #[test]
    fn normalize_collapses_double_slashes() {
        assert_eq!(normalize_path("a//b///c").unwrap(), "a/b/c");
    }

    #[test]
    fn normalize_rejects_empty() {
        assert!(normalize_path("").is_err());
        assert!(normalize_path("///").is_err());
    }

    #[test]
    fn normalize_rejects_dot_segments() {
        assert!(normalize_path("a/./b").is_err());
        assert!(normalize_path("a/../b").is_err());
        assert!(normalize_path(".").is_err());
    }

    #[test]
    fn validate_branch_ok() {
        assert!(validate_branch_name("main").is_ok());
        assert!(validate_branch_name("release/2026-08").is_ok());
    }

    #[test]
    fn validate_branch_rejects_space() {
        assert!(validate_branch_name("my branch").is_err());
    }

    #[test]
    fn validate_branch_rejects_dotdot() {
        assert!(validate_branch_name("a..b").is_err());
    }

    #[test]
    fn validate_branch_rejects_at_brace() {
        assert!(validate_branch_name("a@{0}").is_err());
    }

    #[test]
    fn validate_branch_rejects_trailing_dot() {
        assert!(validate_branch_name("a.").is_err());
    }

    #[test]
    fn validate_branch_rejects_dot_lock() {
        assert!(validate_branch_name("a.lock").is_err());
    }

    #[test]
    fn validate_branch_rejects_empty() {
        assert!(validate_branch_name("").is_err());
    }

    #[test]
    fn basename_of_nested_path() {
        assert_eq!(basename("dir/sub/file.txt"), "file.txt");
        assert_eq!(basename("file.txt"), "file.txt");
    }
}
