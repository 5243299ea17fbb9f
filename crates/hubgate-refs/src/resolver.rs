//! The ref-resolution cascade.

use std::sync::Arc;

use hubgate_types::{ApiPath, CommitHash, ObjectHash, RepositoryCoordinate, TreeHash};
use hubgate_upstream::UpstreamClient;
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{RefError, Result};
use crate::types::{tree_of_commit, ObjectKind, ObjectPointer};

/// Resolves user-supplied references to commit and tree hashes.
///
/// Holds no per-call state: one instance can serve any number of concurrent
/// resolutions. Lookups within one resolution run strictly one after
/// another, since the first hit ends the cascade.
#[derive(Clone)]
pub struct RefResolver {
    upstream: Arc<dyn UpstreamClient>,
    default_branch: String,
}

impl RefResolver {
    pub fn new(upstream: Arc<dyn UpstreamClient>, default_branch: impl Into<String>) -> Self {
        Self {
            upstream,
            default_branch: default_branch.into(),
        }
    }

    /// Branch used when the caller passes an empty reference.
    pub fn default_branch(&self) -> &str {
        &self.default_branch
    }

    /// Resolve `reference` to the commit it currently names.
    ///
    /// Issues between zero and four upstream reads, plus one per annotated
    /// tag dereference.
    pub async fn resolve_commit(
        &self,
        reference: &str,
        coordinate: &RepositoryCoordinate,
    ) -> Result<CommitHash> {
        let reference = if reference.is_empty() {
            self.default_branch.as_str()
        } else {
            reference
        };

        if let Ok(hash) = ObjectHash::parse(reference) {
            trace!(reference, "reference is already a commit hash");
            return Ok(hash);
        }

        for path in candidate_paths(reference, coordinate) {
            debug!(reference, %path, "trying ref candidate");
            let Some(pointer) = self.lookup_ref(reference, &path).await? else {
                continue;
            };
            if let Some(commit) = self.peel(reference, pointer, coordinate).await? {
                return Ok(commit);
            }
        }

        debug!(reference, "no ref candidate matched, reading as branch head");
        self.branch_head(reference, coordinate).await
    }

    /// Resolve `reference` to the root tree of the commit it names.
    pub async fn resolve_tree(
        &self,
        reference: &str,
        coordinate: &RepositoryCoordinate,
    ) -> Result<TreeHash> {
        let commit = self.resolve_commit(reference, coordinate).await?;
        let path = ApiPath::repo(coordinate)
            .nested("git/commits")
            .segment(commit.as_str());
        let payload = self.upstream.get(&path, &[]).await?;

        tree_of_commit(&payload).ok_or_else(|| RefError::MalformedUpstreamObject {
            reference: reference.to_string(),
            object: commit.to_string(),
            detail: "commit has no tree hash".into(),
        })
    }

    /// Current head commit of `branch`, without any fallback.
    pub async fn branch_head(
        &self,
        branch: &str,
        coordinate: &RepositoryCoordinate,
    ) -> Result<CommitHash> {
        let path = ApiPath::repo(coordinate).nested("git/ref/heads").nested(branch);
        let pointer = self
            .lookup_ref(branch, &path)
            .await?
            .ok_or_else(|| RefError::NotFound {
                reference: branch.to_string(),
            })?;
        Ok(pointer.sha)
    }

    /// One ref lookup. `Ok(None)` means the upstream has no such ref; every
    /// other failure is returned as an error.
    async fn lookup_ref(&self, reference: &str, path: &ApiPath) -> Result<Option<ObjectPointer>> {
        let payload = match self.upstream.get(path, &[]).await {
            Ok(payload) => payload,
            Err(e) if e.is_not_found() => {
                trace!(%path, "ref not found");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        // The single-ref endpoint answers 404 for a miss. A list would be the
        // plural endpoint's prefix match; treat it as a miss too, in case an
        // upstream or proxy ever answers that way.
        if let Value::Array(_) = payload {
            trace!(%path, "ref matched by prefix only");
            return Ok(None);
        }

        ObjectPointer::from_payload(&payload)
            .map(Some)
            .ok_or_else(|| RefError::MalformedUpstreamObject {
                reference: reference.to_string(),
                object: path.to_string(),
                detail: "ref has no object pointer".into(),
            })
    }

    /// Follow `pointer` to a commit. `Ok(None)` when an annotated tag's
    /// object has vanished upstream, so the cascade can move on.
    async fn peel(
        &self,
        reference: &str,
        pointer: ObjectPointer,
        coordinate: &RepositoryCoordinate,
    ) -> Result<Option<CommitHash>> {
        match pointer.kind {
            ObjectKind::Commit => Ok(Some(pointer.sha)),
            ObjectKind::Tag => {
                let path = ApiPath::repo(coordinate)
                    .nested("git/tags")
                    .segment(pointer.sha.as_str());
                debug!(reference, tag = %pointer.sha, "dereferencing annotated tag");
                let Some(target) = self.lookup_ref(reference, &path).await? else {
                    return Ok(None);
                };
                match target.kind {
                    ObjectKind::Commit => Ok(Some(target.sha)),
                    other => Err(unsupported(reference, &other)),
                }
            }
            other => Err(unsupported(reference, &other)),
        }
    }
}

fn unsupported(reference: &str, kind: &ObjectKind) -> RefError {
    RefError::UnsupportedReferenceKind {
        reference: reference.to_string(),
        kind: kind.to_string(),
    }
}

/// Lookups to try, in order, before the last-resort branch head read.
fn candidate_paths(reference: &str, coordinate: &RepositoryCoordinate) -> Vec<ApiPath> {
    let refs = ApiPath::repo(coordinate).nested("git/ref");
    match reference.strip_prefix("refs/") {
        Some(qualified) => vec![refs.nested(qualified)],
        None => vec![
            refs.clone().nested(reference),
            refs.clone().segment("heads").nested(reference),
            refs.segment("tags").nested(reference),
        ],
    }
}
