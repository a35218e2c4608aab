// Shared benchmark helpers
// Functions here are used across different benchmark files
#![allow(dead_code)]

use repodiff::model::{
    Analyzed, AnalyzedCommitRow, AnalyzedDiffRow, Classification, CommitRow, DiffRow, DiffStatus,
};
use repodiff::repository::Database;
use time::macros::date;

/// Generate N classified project rows
pub fn generate_diff_rows(num_rows: usize) -> Vec<AnalyzedDiffRow> {
    (0..num_rows)
        .map(|i| {
            Analyzed::new(
                DiffRow {
                    date: date!(2024 - 01 - 15),
                    downstream_project: format!("platform/project_{}", i),
                    upstream_project: format!("platform/project_{}", i),
                    status: DiffStatus::ALL[i % DiffStatus::ALL.len()],
                    files_changed: (i % 50) as i64,
                    line_insertions: (i * 7) as i64,
                    line_deletions: (i * 3) as i64,
                    line_changes: (i * 10) as i64,
                    commits_not_upstreamed: (i % 9) as i64,
                },
                if i % 4 == 0 { Classification::DifferentialSpecific } else { Classification::Global },
            )
        })
        .collect()
}

/// Generate N classified commit rows over a small author pool
pub fn generate_commit_rows(num_rows: usize) -> Vec<AnalyzedCommitRow> {
    (0..num_rows)
        .map(|i| {
            Analyzed::new(
                CommitRow {
                    date: date!(2024 - 01 - 15),
                    commit: format!("{:040x}", i),
                    downstream_project: format!("platform/project_{}", i % 200),
                    author: format!("dev{}@example.com", i % 25),
                    subject: format!("Change number {}", i),
                },
                Classification::Global,
            )
        })
        .collect()
}

/// Generate N manifest-style project names, `offset` shifting the range
pub fn generate_names(num_names: usize, offset: usize) -> Vec<String> {
    (offset..offset + num_names)
        .map(|i| format!("platform/project_{}", i))
        .collect()
}

/// Create a benchmark database with schema initialized
pub async fn setup_bench_db() -> Database {
    let db = Database::new(":memory:").await.unwrap();
    db.init_schema().await.unwrap();
    db
}
