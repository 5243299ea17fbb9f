//! Upstream source-control API capability.
//!
//! hubgate never talks to the hosting API directly from its resolver or
//! handlers; it goes through the [`UpstreamClient`] trait. Two
//! implementations ship here:
//!
//! - [`GithubClient`] — reqwest-backed client for the GitHub REST API
//! - [`ScriptedUpstream`] — in-memory double with canned replies and a call log

pub mod error;
pub mod github;
pub mod memory;
pub mod traits;

pub use error::{UpstreamError, UpstreamResult};
pub use github::{GithubClient, GithubClientConfig, DEFAULT_API_URL};
pub use memory::{Method, RecordedCall, ScriptedUpstream};
pub use traits::UpstreamClient;
