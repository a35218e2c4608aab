//! Aggregate records for the dashboard views
//!
//! Pure reductions over one snapshot; persistence lives in
//! `repository::views`.

use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use time::Date;

use super::row::{AnalyzedCommitRow, AnalyzedDiffRow, Classification, DiffStatus};

/// Totals for one report date and classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangesOverTime {
    pub date: Date,
    pub classification: Classification,
    pub modified_projects: i64,
    pub files_changed: i64,
    pub line_changes: i64,
    pub commits_not_upstreamed: i64,
}

/// Commit count for one author in the latest commit snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopCommitter {
    pub rank: i64,
    pub author: String,
    pub commits: i64,
    /// Commits landing in projects that only exist on one side
    pub differential_commits: i64,
}

/// Group diff rows by (date, classification) and sum their changes
pub fn changes_over_time(rows: &[AnalyzedDiffRow]) -> Vec<ChangesOverTime> {
    let mut groups: BTreeMap<(Date, Classification), ChangesOverTime> = BTreeMap::new();

    for analyzed in rows {
        let row = &analyzed.row;
        let entry = groups
            .entry((row.date, analyzed.classification))
            .or_insert_with(|| ChangesOverTime {
                date: row.date,
                classification: analyzed.classification,
                modified_projects: 0,
                files_changed: 0,
                line_changes: 0,
                commits_not_upstreamed: 0,
            });

        if matches!(row.status, DiffStatus::Modified | DiffStatus::Forked) {
            entry.modified_projects += 1;
        }
        entry.files_changed += row.files_changed;
        entry.line_changes += row.line_changes;
        entry.commits_not_upstreamed += row.commits_not_upstreamed;
    }

    groups.into_values().collect()
}

/// Rank authors by commit count, ties broken by author name
pub fn top_committers(rows: &[AnalyzedCommitRow], limit: usize) -> Vec<TopCommitter> {
    let mut counts: FxHashMap<&str, (i64, i64)> = FxHashMap::default();
    for analyzed in rows {
        let entry = counts.entry(analyzed.row.author.as_str()).or_default();
        entry.0 += 1;
        if analyzed.classification == Classification::DifferentialSpecific {
            entry.1 += 1;
        }
    }

    let mut ranked: Vec<_> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.0.cmp(&a.1.0).then_with(|| a.0.cmp(b.0)));

    ranked
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, (author, (commits, differential_commits)))| TopCommitter {
            rank: i as i64 + 1,
            author: author.to_string(),
            commits,
            differential_commits,
        })
        .collect()
}
