use serde::Deserialize;
use std::fmt;

/// A repository URL paired with a branch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct RepoBranch {
    pub url: String,
    pub branch: String,
}

impl RepoBranch {
    pub fn new(url: impl Into<String>, branch: impl Into<String>) -> Self {
        Self { url: url.into(), branch: branch.into() }
    }
}

impl fmt::Display for RepoBranch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.url, self.branch)
    }
}

/// The (upstream, downstream) pair being compared
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct DiffTarget {
    pub upstream: RepoBranch,
    pub downstream: RepoBranch,
}

impl fmt::Display for DiffTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.upstream, self.downstream)
    }
}

/// A diff target reduced to the stable ids of its two sides
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct MappedDiffTarget {
    pub upstream_id: i64,
    pub downstream_id: i64,
}

impl MappedDiffTarget {
    pub fn new(upstream_id: i64, downstream_id: i64) -> Self {
        Self { upstream_id, downstream_id }
    }
}

impl fmt::Display for MappedDiffTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.upstream_id, self.downstream_id)
    }
}
