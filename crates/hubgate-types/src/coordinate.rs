use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Identifies a repository on the upstream host.
///
/// Both fields are non-empty; the constructors enforce it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryCoordinate {
    pub owner: String,
    pub name: String,
}

impl RepositoryCoordinate {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self, TypeError> {
        let owner = owner.into();
        let name = name.into();
        if owner.is_empty() {
            return Err(TypeError::EmptyCoordinate { field: "owner" });
        }
        if name.is_empty() {
            return Err(TypeError::EmptyCoordinate { field: "name" });
        }
        Ok(Self { owner, name })
    }

    /// Take `owner`/`name` from a request, falling back to `defaults` for
    /// each one that is absent or empty.
    pub fn or_defaults(owner: Option<&str>, name: Option<&str>, defaults: &Self) -> Self {
        let pick = |value: Option<&str>, fallback: &str| match value {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => fallback.to_string(),
        };
        Self {
            owner: pick(owner, &defaults.owner),
            name: pick(name, &defaults.name),
        }
    }
}

impl fmt::Display for RepositoryCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}
