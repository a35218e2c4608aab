//! Rows produced by the diff script and their classified form
//!
//! Raw rows carry no opinion about whether a project is shared
//! infrastructure; [`Analyzed`] pairs a raw row with its [`Classification`].

use std::fmt;
use std::str::FromStr;
use time::Date;

/// Per-project outcome of comparing the two trees
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DiffStatus {
    DownstreamOnly,
    UpstreamOnly,
    Intact,
    Modified,
    Forked,
}

impl DiffStatus {
    pub const ALL: [DiffStatus; 5] = [
        DiffStatus::DownstreamOnly,
        DiffStatus::UpstreamOnly,
        DiffStatus::Intact,
        DiffStatus::Modified,
        DiffStatus::Forked,
    ];

    /// The label the diff script writes into its report
    pub fn display_name(self) -> &'static str {
        match self {
            DiffStatus::DownstreamOnly => "Downstream Only Projects",
            DiffStatus::UpstreamOnly => "Upstream Only Projects",
            DiffStatus::Intact => "Intact Projects",
            DiffStatus::Modified => "Modified Projects",
            DiffStatus::Forked => "Forked Projects",
        }
    }

    pub fn code(self) -> i64 {
        match self {
            DiffStatus::DownstreamOnly => 1,
            DiffStatus::UpstreamOnly => 2,
            DiffStatus::Intact => 3,
            DiffStatus::Modified => 4,
            DiffStatus::Forked => 5,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.code() == code)
    }
}

impl FromStr for DiffStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.display_name() == s)
            .ok_or_else(|| format!("unknown diff status {:?}", s))
    }
}

impl fmt::Display for DiffStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Whether a project is shared infrastructure or specific to one side
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Classification {
    #[default]
    Empty,
    DifferentialSpecific,
    Global,
}

impl Classification {
    pub fn code(self) -> i64 {
        match self {
            Classification::Empty => 0,
            Classification::DifferentialSpecific => 1,
            Classification::Global => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Classification::Empty),
            1 => Some(Classification::DifferentialSpecific),
            2 => Some(Classification::Global),
            _ => None,
        }
    }
}

/// One changed project from the project report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffRow {
    pub date: Date,
    pub downstream_project: String,
    pub upstream_project: String,
    pub status: DiffStatus,
    pub files_changed: i64,
    pub line_insertions: i64,
    pub line_deletions: i64,
    pub line_changes: i64,
    pub commits_not_upstreamed: i64,
}

/// One commit not yet upstreamed, from the commit report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRow {
    pub date: Date,
    pub commit: String,
    pub downstream_project: String,
    pub author: String,
    pub subject: String,
}

/// Rows that can be looked up in a classifier by project name
pub trait ProjectRow {
    fn project_name(&self) -> &str;
}

impl ProjectRow for DiffRow {
    /// Upstream-only projects have no downstream name
    fn project_name(&self) -> &str {
        if self.downstream_project.is_empty() {
            &self.upstream_project
        } else {
            &self.downstream_project
        }
    }
}

impl ProjectRow for CommitRow {
    fn project_name(&self) -> &str {
        &self.downstream_project
    }
}

/// A raw row tagged with its classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analyzed<R> {
    pub row: R,
    pub classification: Classification,
}

impl<R> Analyzed<R> {
    pub fn new(row: R, classification: Classification) -> Self {
        Self { row, classification }
    }
}

pub type AnalyzedDiffRow = Analyzed<DiffRow>;
pub type AnalyzedCommitRow = Analyzed<CommitRow>;
