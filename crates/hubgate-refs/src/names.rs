//! Branch names.
//!
//! Validation follows `git check-ref-format --branch` closely enough that
//! the upstream never rejects a name we accepted:
//! - Must be non-empty and must not be `@`
//! - Must not contain control characters, space, `~`, `^`, `:`, `?`, `*`, `[`, `\`
//! - Must not contain `..` or `@{`
//! - Must not start with `-` or `/`, and must not end with `/` or `.`
//! - Slash-separated components must be non-empty, must not start with `.`,
//!   and must not end with `.lock`

use crate::error::{RefError, Result};

const FORBIDDEN_CHARS: &[char] = &[' ', '~', '^', ':', '?', '*', '[', '\\'];

const HEADS_PREFIX: &str = "refs/heads/";

fn invalid(name: &str, reason: impl Into<String>) -> RefError {
    RefError::InvalidBranchName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Validate a branch name, returning `Ok(())` if valid.
///
/// ```
/// use hubgate_refs::names::validate_branch_name;
///
/// assert!(validate_branch_name("main").is_ok());
/// assert!(validate_branch_name("feature/login").is_ok());
/// assert!(validate_branch_name("").is_err());
/// assert!(validate_branch_name("bad..name").is_err());
/// ```
pub fn validate_branch_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(invalid(name, "branch name must not be empty"));
    }
    if name == "@" {
        return Err(invalid(name, "'@' alone is reserved"));
    }
    if let Some(ch) = name.chars().find(|c| c.is_control() || FORBIDDEN_CHARS.contains(c)) {
        return Err(invalid(name, format!("contains forbidden character: {ch:?}")));
    }
    if name.contains("..") {
        return Err(invalid(name, "must not contain '..'"));
    }
    if name.contains("@{") {
        return Err(invalid(name, "must not contain '@{'"));
    }
    if name.starts_with('-') {
        return Err(invalid(name, "must not start with '-'"));
    }
    if name.starts_with('/') || name.ends_with('/') {
        return Err(invalid(name, "must not start or end with '/'"));
    }
    if name.ends_with('.') {
        return Err(invalid(name, "must not end with '.'"));
    }

    for component in name.split('/') {
        if component.is_empty() {
            return Err(invalid(name, "path components must not be empty"));
        }
        if component.starts_with('.') {
            return Err(invalid(name, format!("component must not start with '.': {component:?}")));
        }
        if component.ends_with(".lock") {
            return Err(invalid(name, format!("component must not end with '.lock': {component:?}")));
        }
    }

    Ok(())
}

/// Short branch name of a `refs/heads/...` ref, or `None` for anything else
/// (tags, bare names, the empty string).
pub fn branch_from_ref(reference: &str) -> Option<&str> {
    reference
        .strip_prefix(HEADS_PREFIX)
        .filter(|branch| !branch.is_empty())
}

/// Strip a leading `refs/heads/` if present.
pub fn strip_heads_prefix(reference: &str) -> &str {
    reference.strip_prefix(HEADS_PREFIX).unwrap_or(reference)
}
