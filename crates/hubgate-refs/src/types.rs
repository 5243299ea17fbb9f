//! Shapes decoded from upstream git-data payloads.
//!
//! Ref and annotated-tag payloads both carry an `object` field of the form
//! `{"type": "...", "sha": "..."}`; the `type` discriminant is decoded into
//! [`ObjectKind`] rather than inspected as a loose string.

use std::fmt;

use hubgate_types::{ObjectHash, TreeHash};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of object a ref or tag points at.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ObjectKind {
    Commit,
    /// An annotated tag object, which needs one more dereference.
    Tag,
    /// Trees, blobs, and anything the upstream may add later.
    Other(String),
}

impl ObjectKind {
    pub fn as_str(&self) -> &str {
        match self {
            ObjectKind::Commit => "commit",
            ObjectKind::Tag => "tag",
            ObjectKind::Other(kind) => kind,
        }
    }
}

impl From<String> for ObjectKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "commit" => ObjectKind::Commit,
            "tag" => ObjectKind::Tag,
            _ => ObjectKind::Other(kind),
        }
    }
}

impl From<ObjectKind> for String {
    fn from(kind: ObjectKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `object` field of a ref or annotated-tag payload.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ObjectPointer {
    #[serde(rename = "type")]
    pub kind: ObjectKind,
    pub sha: ObjectHash,
}

#[derive(Deserialize)]
struct WithObject {
    object: ObjectPointer,
}

impl ObjectPointer {
    /// Decode `payload.object`. Returns `None` when the field is missing or
    /// its hash is not 40 hex characters.
    pub fn from_payload(payload: &Value) -> Option<Self> {
        WithObject::deserialize(payload).ok().map(|w| w.object)
    }
}

#[derive(Deserialize)]
struct CommitPayload {
    tree: TreeField,
}

#[derive(Deserialize)]
struct TreeField {
    sha: TreeHash,
}

/// Read `tree.sha` from a commit payload.
pub fn tree_of_commit(payload: &Value) -> Option<TreeHash> {
    CommitPayload::deserialize(payload).ok().map(|c| c.tree.sha)
}
