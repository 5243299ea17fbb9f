//! Reference resolution for hubgate.
//!
//! Callers hand over whatever the user typed as a "ref" (a commit hash, a
//! fully qualified `refs/...` path, a bare branch name or a bare tag name)
//! and get back the commit it currently names, or that commit's root tree.
//!
//! # Resolution order
//!
//! 1. A 40-hex string is already a commit hash and is returned as given.
//! 2. A `refs/...` path is looked up exactly once.
//! 3. A bare name is tried literally, then as `heads/<name>`, then as
//!    `tags/<name>`. Branches therefore shadow tags of the same name.
//! 4. Annotated tags are dereferenced to the commit they point at.
//! 5. When nothing matched, the name is read as a branch head one last time.
//!
//! Only "not found" moves the cascade forward. Any other upstream failure
//! ends the resolution with that failure.
//!
//! # Modules
//!
//! - [`error`] — [`RefError`]
//! - [`types`] — [`ObjectKind`] and [`ObjectPointer`] decoded from upstream payloads
//! - [`resolver`] — [`RefResolver`]
//! - [`names`] — branch name validation and `refs/heads/` handling
//! - [`cache`] — [`TreeCache`], a bounded TTL cache kept apart from the resolver

pub mod cache;
pub mod error;
pub mod names;
pub mod resolver;
pub mod types;

pub use cache::TreeCache;
pub use error::{RefError, Result};
pub use names::{branch_from_ref, strip_heads_prefix, validate_branch_name};
pub use resolver::RefResolver;
pub use types::{tree_of_commit, ObjectKind, ObjectPointer};
