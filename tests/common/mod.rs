// Shared test fixtures for integration tests
// Functions here are used across different test files
#![allow(dead_code)]

use repodiff::config::{ManifestPaths, TargetConfig};
use repodiff::model::{
    Analyzed, AnalyzedCommitRow, AnalyzedDiffRow, Classification, CommitRow, DiffRow, DiffStatus,
    RepoBranch,
};
use repodiff::repository::Database;
use std::path::Path;
use tempfile::TempDir;
use time::macros::date;

/// Create an in-memory test database
pub async fn create_test_db() -> Database {
    Database::new(":memory:").await.unwrap()
}

/// Create a file-backed database with a multi-connection pool
///
/// Needed wherever a test relies on real concurrent connections.
pub async fn create_file_db(connections: u32) -> (TempDir, Database) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("repodiff.db");
    let db = Database::with_max_connections(path.to_str().unwrap(), connections)
        .await
        .unwrap();
    db.init_schema().await.unwrap();
    (dir, db)
}

pub fn diff_row(project: &str, status: DiffStatus, files: i64, lines: i64, commits: i64) -> DiffRow {
    DiffRow {
        date: date!(2024 - 01 - 15),
        downstream_project: project.to_string(),
        upstream_project: project.to_string(),
        status,
        files_changed: files,
        line_insertions: lines / 2,
        line_deletions: lines - lines / 2,
        line_changes: lines,
        commits_not_upstreamed: commits,
    }
}

pub fn commit_row(hash: &str, project: &str, author: &str) -> CommitRow {
    CommitRow {
        date: date!(2024 - 01 - 15),
        commit: hash.to_string(),
        downstream_project: project.to_string(),
        author: author.to_string(),
        subject: format!("Change {}", hash),
    }
}

/// N analyzed project rows with distinct names
pub fn generate_diff_rows(count: usize) -> Vec<AnalyzedDiffRow> {
    (0..count)
        .map(|i| {
            let status = DiffStatus::ALL[i % DiffStatus::ALL.len()];
            let classification = if i % 3 == 0 {
                Classification::DifferentialSpecific
            } else {
                Classification::Global
            };
            Analyzed::new(
                diff_row(&format!("platform/project_{}", i), status, i as i64, (i * 10) as i64, 1),
                classification,
            )
        })
        .collect()
}

/// N analyzed commit rows spread over a few authors
pub fn generate_commit_rows(count: usize) -> Vec<AnalyzedCommitRow> {
    let authors = ["alice", "bob", "carol"];
    (0..count)
        .map(|i| {
            Analyzed::new(
                commit_row(&format!("{:040x}", i), &format!("platform/project_{}", i % 7), authors[i % 3]),
                Classification::Global,
            )
        })
        .collect()
}

pub const PROJECT_REPORT: &str = "\
Date,Downstream Project,Upstream Project,Diff Status,Files Changed,Line Insertions,Line Deletions,Line Changes,Commits Not Upstreamed
2024/01/15,platform/build,platform/build,Modified Projects,3,10,2,12,4
2024/01/15,vendor/acme/hal,,Downstream Only Projects,40,900,0,900,12
2024/01/15,,platform/legacy,Upstream Only Projects,0,0,0,0,0
2024/01/15,platform/art,platform/art,Intact Projects,0,0,0,0,0
";

pub const COMMIT_REPORT: &str = "\
Date,Commit,Downstream Project,Author,Subject
2024/01/15,aaaa1111,platform/build,alice@example.com,Fix build flags
2024/01/15,bbbb2222,vendor/acme/hal,bob@example.com,\"Add HAL, first drop\"
2024/01/15,cccc3333,vendor/acme/hal,bob@example.com,Tune HAL
";

pub const COMMON_MANIFEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<manifest>
  <project name="platform/build" path="build" />
  <project name="platform/art" path="art" />
</manifest>
"#;

pub const UPSTREAM_MANIFEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<manifest>
  <project name="platform/build" path="build" />
  <project name="platform/art" path="art" />
  <project name="platform/legacy" path="legacy" />
</manifest>
"#;

pub const DOWNSTREAM_MANIFEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<manifest>
  <project name="platform/build" path="build" />
  <project name="platform/art" path="art" />
  <project name="vendor/acme/hal" path="vendor/hal" />
  <project name="vendor/acme/tools" path="vendor/tools" groups="notdefault" />
</manifest>
"#;

/// Write the sample reports and manifests into `dir` and describe them
pub fn write_target_fixture(dir: &Path) -> TargetConfig {
    let write = |name: &str, body: &str| {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    };

    TargetConfig {
        upstream: RepoBranch::new("https://android.googlesource.com/platform/manifest", "main"),
        downstream: RepoBranch::new("ssh://git.acme.example/platform/manifest", "acme-main"),
        project_report: write("project.csv", PROJECT_REPORT),
        commit_report: write("commit.csv", COMMIT_REPORT),
        manifests: ManifestPaths {
            common: write("common.xml", COMMON_MANIFEST),
            upstream: write("upstream.xml", UPSTREAM_MANIFEST),
            downstream: write("downstream.xml", DOWNSTREAM_MANIFEST),
        },
    }
}
