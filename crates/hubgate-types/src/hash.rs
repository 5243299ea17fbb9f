use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Number of hex characters in an object hash.
pub const HASH_HEX_LEN: usize = 40;

/// Returns `true` if `s` is exactly 40 hex characters (either case).
pub fn is_object_hash(s: &str) -> bool {
    s.len() == HASH_HEX_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Hex identifier of an object on the upstream host.
///
/// The original spelling is kept: a hash parsed from user input with
/// upper-case digits is handed back exactly as given, so equality is
/// textual.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectHash(String);

/// A hash naming a commit object.
pub type CommitHash = ObjectHash;

/// A hash naming a tree object. Every commit has exactly one root tree.
pub type TreeHash = ObjectHash;

impl ObjectHash {
    /// Parse a 40-hex string.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        if is_object_hash(s) {
            Ok(Self(s.to_string()))
        } else {
            Err(TypeError::InvalidHash(s.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short hex representation (first 7 characters).
    pub fn short(&self) -> &str {
        &self.0[..7]
    }
}

impl fmt::Debug for ObjectHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectHash({})", self.short())
    }
}

impl fmt::Display for ObjectHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ObjectHash {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if is_object_hash(&s) {
            Ok(Self(s))
        } else {
            Err(TypeError::InvalidHash(s))
        }
    }
}

impl From<ObjectHash> for String {
    fn from(hash: ObjectHash) -> Self {
        hash.0
    }
}

impl AsRef<str> for ObjectHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
