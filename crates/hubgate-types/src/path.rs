//! Upstream API paths.
//!
//! An [`ApiPath`] holds raw, unencoded segments. Percent-encoding happens
//! once, when the path is joined onto the upstream base URL, so a branch
//! named `feature/login` pushed as a single segment travels as
//! `feature%2Flogin` while one pushed with [`ApiPath::nested`] keeps its
//! slash.

use std::fmt;

use url::Url;

use crate::coordinate::RepositoryCoordinate;
use crate::error::TypeError;

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ApiPath {
    segments: Vec<String>,
}

impl ApiPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// `/repos/{owner}/{name}`
    pub fn repo(coordinate: &RepositoryCoordinate) -> Self {
        Self::new()
            .segment("repos")
            .segment(&coordinate.owner)
            .segment(&coordinate.name)
    }

    /// Append one segment verbatim. Slashes inside it are encoded on the wire.
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    /// Append a slash-separated path, one segment per component.
    /// Empty components (leading, trailing or doubled slashes) are dropped.
    pub fn nested(mut self, path: &str) -> Self {
        self.segments.extend(
            path.split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        );
        self
    }

    /// Join onto `base`, keeping any path prefix it already carries
    /// (e.g. `https://ghe.example.com/api/v3`).
    pub fn to_url(&self, base: &Url) -> Result<Url, TypeError> {
        let mut url = base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| TypeError::InvalidBaseUrl(base.to_string()))?;
            segments.pop_if_empty();
            segments.extend(&self.segments);
        }
        Ok(url)
    }
}

impl fmt::Display for ApiPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}
