//! Foundation types for hubgate.
//!
//! This crate provides the small value types shared by every other hubgate
//! crate. Nothing here performs I/O.
//!
//! # Key Types
//!
//! - [`RepositoryCoordinate`] — `owner/name` pair identifying a hosted repository
//! - [`ObjectHash`] — 40-hex object identifier ([`CommitHash`], [`TreeHash`])
//! - [`ApiPath`] — upstream API path built from unencoded segments

pub mod coordinate;
pub mod error;
pub mod hash;
pub mod path;

pub use coordinate::RepositoryCoordinate;
pub use error::TypeError;
pub use hash::{is_object_hash, CommitHash, ObjectHash, TreeHash, HASH_HEX_LEN};
pub use path::ApiPath;
