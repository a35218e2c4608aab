//! Versioned snapshots of analyzed rows
//!
//! Every row written by one call shares a `(timestamp, batch_id)` key and
//! is committed in one transaction together with a ledger row in `batches`.
//! Readers pick the newest ledger entry for a target and select exactly the
//! rows carrying that key, so they never see a partial or mixed batch.

use sqlx::{sqlite::SqliteRow, QueryBuilder, Row, Sqlite, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::SnapshotError;
use crate::model::{
    Analyzed, AnalyzedCommitRow, AnalyzedDiffRow, Classification, CommitRow, DiffRow, DiffStatus,
    MappedDiffTarget,
};
use crate::util::{format_date, parse_stored_date, unix_now};

use super::Database;

/// Rows per multi-row INSERT; keeps bound parameters well under SQLite's limit
const BATCH_SIZE: usize = 1000;

/// Which report a batch holds
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BatchKind {
    Project,
    Commit,
}

impl BatchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BatchKind::Project => "project",
            BatchKind::Commit => "commit",
        }
    }
}

/// Identifies one atomic write for a target
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BatchKey {
    pub timestamp: i64,
    pub batch_id: String,
}

impl BatchKey {
    /// Fresh key with a random batch id
    pub fn generate(timestamp: i64) -> Self {
        Self {
            timestamp,
            batch_id: Uuid::new_v4().to_string(),
        }
    }
}

/// Atomic batch writes and latest-batch reads
#[derive(Clone)]
pub struct SnapshotRepository {
    db: Database,
}

impl SnapshotRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Write a project batch stamped with the current time
    pub async fn write_diff_batch(
        &self,
        target: &MappedDiffTarget,
        rows: &[AnalyzedDiffRow],
    ) -> Result<BatchKey, SnapshotError> {
        self.write_diff_batch_at(target, rows, unix_now()).await
    }

    pub async fn write_diff_batch_at(
        &self,
        target: &MappedDiffTarget,
        rows: &[AnalyzedDiffRow],
        timestamp: i64,
    ) -> Result<BatchKey, SnapshotError> {
        self.write_diff_batch_with_callback(target, rows, timestamp, |_| {}).await
    }

    /// Write a project batch, reporting inserted rows per chunk
    pub async fn write_diff_batch_with_callback<F>(
        &self,
        target: &MappedDiffTarget,
        rows: &[AnalyzedDiffRow],
        timestamp: i64,
        mut on_progress: F,
    ) -> Result<BatchKey, SnapshotError>
    where
        F: FnMut(usize),
    {
        let key = BatchKey::generate(timestamp);

        let result: Result<(), sqlx::Error> = async {
            let mut tx = self.db.pool().begin().await?;
            record_batch_in_tx(&mut tx, target, BatchKind::Project, &key, rows.len()).await?;
            save_diff_rows_in_tx(&mut tx, target, &key, rows, &mut on_progress).await?;
            tx.commit().await?;
            Ok::<(), sqlx::Error>(())
        }
        .await;

        result.map_err(|source| SnapshotError::Write {
            kind: BatchKind::Project.as_str(),
            target: target.to_string(),
            rows: rows.len(),
            source,
        })?;

        info!(%target, batch_id = %key.batch_id, rows = rows.len(), "wrote project batch");
        Ok(key)
    }

    /// Write a commit batch stamped with the current time
    pub async fn write_commit_batch(
        &self,
        target: &MappedDiffTarget,
        rows: &[AnalyzedCommitRow],
    ) -> Result<BatchKey, SnapshotError> {
        self.write_commit_batch_at(target, rows, unix_now()).await
    }

    pub async fn write_commit_batch_at(
        &self,
        target: &MappedDiffTarget,
        rows: &[AnalyzedCommitRow],
        timestamp: i64,
    ) -> Result<BatchKey, SnapshotError> {
        self.write_commit_batch_with_callback(target, rows, timestamp, |_| {}).await
    }

    /// Write a commit batch, reporting inserted rows per chunk
    pub async fn write_commit_batch_with_callback<F>(
        &self,
        target: &MappedDiffTarget,
        rows: &[AnalyzedCommitRow],
        timestamp: i64,
        mut on_progress: F,
    ) -> Result<BatchKey, SnapshotError>
    where
        F: FnMut(usize),
    {
        let key = BatchKey::generate(timestamp);

        let result: Result<(), sqlx::Error> = async {
            let mut tx = self.db.pool().begin().await?;
            record_batch_in_tx(&mut tx, target, BatchKind::Commit, &key, rows.len()).await?;
            save_commit_rows_in_tx(&mut tx, target, &key, rows, &mut on_progress).await?;
            tx.commit().await?;
            Ok::<(), sqlx::Error>(())
        }
        .await;

        result.map_err(|source| SnapshotError::Write {
            kind: BatchKind::Commit.as_str(),
            target: target.to_string(),
            rows: rows.len(),
            source,
        })?;

        info!(%target, batch_id = %key.batch_id, rows = rows.len(), "wrote commit batch");
        Ok(key)
    }

    /// Key of the most recent committed batch of `kind` for a target
    ///
    /// Batches sharing a timestamp are ordered by commit order.
    pub async fn latest_batch_key(
        &self,
        target: &MappedDiffTarget,
        kind: BatchKind,
    ) -> Result<Option<BatchKey>, SnapshotError> {
        let row = sqlx::query(
            "SELECT timestamp, batch_id FROM batches
                WHERE upstream_id = ? AND downstream_id = ? AND kind = ?
                ORDER BY timestamp DESC, seq DESC
                LIMIT 1"
        )
        .bind(target.upstream_id)
        .bind(target.downstream_id)
        .bind(kind.as_str())
        .fetch_optional(self.db.pool())
        .await
        .map_err(|source| read_error(kind, target, source))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let timestamp: i64 = row
            .try_get("timestamp")
            .map_err(|source| read_error(kind, target, source))?;
        let batch_id: String = row
            .try_get("batch_id")
            .map_err(|source| read_error(kind, target, source))?;

        Ok(Some(BatchKey { timestamp, batch_id }))
    }

    /// All rows of the latest project batch, in write order
    ///
    /// Empty when nothing has been written for the target yet.
    pub async fn latest_diff_batch(
        &self,
        target: &MappedDiffTarget,
    ) -> Result<Vec<AnalyzedDiffRow>, SnapshotError> {
        let Some(key) = self.latest_batch_key(target, BatchKind::Project).await? else {
            debug!(%target, "no project batch yet");
            return Ok(Vec::new());
        };

        let rows = sqlx::query(
            "SELECT date, downstream_project, upstream_project, status, files_changed,
                    line_insertions, line_deletions, line_changes, commits_not_upstreamed,
                    project_type
                FROM project_differentials
                WHERE upstream_id = ? AND downstream_id = ? AND timestamp = ? AND batch_id = ?
                ORDER BY row_index"
        )
        .bind(target.upstream_id)
        .bind(target.downstream_id)
        .bind(key.timestamp)
        .bind(&key.batch_id)
        .fetch_all(self.db.pool())
        .await
        .map_err(|source| read_error(BatchKind::Project, target, source))?;

        rows.iter()
            .map(decode_diff_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| read_error(BatchKind::Project, target, source))
    }

    /// All rows of the latest commit batch, in write order
    pub async fn latest_commit_batch(
        &self,
        target: &MappedDiffTarget,
    ) -> Result<Vec<AnalyzedCommitRow>, SnapshotError> {
        let Some(key) = self.latest_batch_key(target, BatchKind::Commit).await? else {
            debug!(%target, "no commit batch yet");
            return Ok(Vec::new());
        };

        let rows = sqlx::query(
            "SELECT date, commit_hash, downstream_project, author, subject, project_type
                FROM commits
                WHERE upstream_id = ? AND downstream_id = ? AND timestamp = ? AND batch_id = ?
                ORDER BY row_index"
        )
        .bind(target.upstream_id)
        .bind(target.downstream_id)
        .bind(key.timestamp)
        .bind(&key.batch_id)
        .fetch_all(self.db.pool())
        .await
        .map_err(|source| read_error(BatchKind::Commit, target, source))?;

        rows.iter()
            .map(decode_commit_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| read_error(BatchKind::Commit, target, source))
    }

    /// Number of committed batches of `kind` for a target
    pub async fn batch_count(
        &self,
        target: &MappedDiffTarget,
        kind: BatchKind,
    ) -> Result<i64, SnapshotError> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM batches WHERE upstream_id = ? AND downstream_id = ? AND kind = ?"
        )
        .bind(target.upstream_id)
        .bind(target.downstream_id)
        .bind(kind.as_str())
        .fetch_one(self.db.pool())
        .await
        .map_err(|source| read_error(kind, target, source))
    }
}

fn read_error(kind: BatchKind, target: &MappedDiffTarget, source: sqlx::Error) -> SnapshotError {
    SnapshotError::Read {
        kind: kind.as_str(),
        target: target.to_string(),
        source,
    }
}

async fn record_batch_in_tx(
    tx: &mut Transaction<'_, Sqlite>,
    target: &MappedDiffTarget,
    kind: BatchKind,
    key: &BatchKey,
    row_count: usize,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO batches (upstream_id, downstream_id, kind, timestamp, batch_id, row_count)
            VALUES (?, ?, ?, ?, ?, ?)"
    )
    .bind(target.upstream_id)
    .bind(target.downstream_id)
    .bind(kind.as_str())
    .bind(key.timestamp)
    .bind(&key.batch_id)
    .bind(row_count as i64)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn save_diff_rows_in_tx<F>(
    tx: &mut Transaction<'_, Sqlite>,
    target: &MappedDiffTarget,
    key: &BatchKey,
    rows: &[AnalyzedDiffRow],
    on_progress: &mut F,
) -> Result<(), sqlx::Error>
where
    F: FnMut(usize),
{
    for (chunk_no, chunk) in rows.chunks(BATCH_SIZE).enumerate() {
        let offset = chunk_no * BATCH_SIZE;

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO project_differentials (upstream_id, downstream_id, timestamp, batch_id, \
                row_index, date, downstream_project, upstream_project, status, files_changed, \
                line_insertions, line_deletions, line_changes, commits_not_upstreamed, project_type) "
        );
        qb.push_values(chunk.iter().enumerate(), |mut b, (i, analyzed)| {
            let row = &analyzed.row;
            b.push_bind(target.upstream_id)
                .push_bind(target.downstream_id)
                .push_bind(key.timestamp)
                .push_bind(key.batch_id.as_str())
                .push_bind((offset + i) as i64)
                .push_bind(format_date(row.date))
                .push_bind(row.downstream_project.as_str())
                .push_bind(row.upstream_project.as_str())
                .push_bind(row.status.code())
                .push_bind(row.files_changed)
                .push_bind(row.line_insertions)
                .push_bind(row.line_deletions)
                .push_bind(row.line_changes)
                .push_bind(row.commits_not_upstreamed)
                .push_bind(analyzed.classification.code());
        });
        qb.build().execute(&mut **tx).await?;

        on_progress(chunk.len());
    }

    Ok(())
}

async fn save_commit_rows_in_tx<F>(
    tx: &mut Transaction<'_, Sqlite>,
    target: &MappedDiffTarget,
    key: &BatchKey,
    rows: &[AnalyzedCommitRow],
    on_progress: &mut F,
) -> Result<(), sqlx::Error>
where
    F: FnMut(usize),
{
    for (chunk_no, chunk) in rows.chunks(BATCH_SIZE).enumerate() {
        let offset = chunk_no * BATCH_SIZE;

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO commits (upstream_id, downstream_id, timestamp, batch_id, row_index, \
                date, commit_hash, downstream_project, author, subject, project_type) "
        );
        qb.push_values(chunk.iter().enumerate(), |mut b, (i, analyzed)| {
            let row = &analyzed.row;
            b.push_bind(target.upstream_id)
                .push_bind(target.downstream_id)
                .push_bind(key.timestamp)
                .push_bind(key.batch_id.as_str())
                .push_bind((offset + i) as i64)
                .push_bind(format_date(row.date))
                .push_bind(row.commit.as_str())
                .push_bind(row.downstream_project.as_str())
                .push_bind(row.author.as_str())
                .push_bind(row.subject.as_str())
                .push_bind(analyzed.classification.code());
        });
        qb.build().execute(&mut **tx).await?;

        on_progress(chunk.len());
    }

    Ok(())
}

fn decode_error(message: String) -> sqlx::Error {
    sqlx::Error::Decode(message.into())
}

fn decode_date(row: &SqliteRow) -> Result<time::Date, sqlx::Error> {
    let raw: String = row.try_get("date")?;
    parse_stored_date(&raw).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

fn decode_classification(row: &SqliteRow) -> Result<Classification, sqlx::Error> {
    let code: i64 = row.try_get("project_type")?;
    Classification::from_code(code)
        .ok_or_else(|| decode_error(format!("unknown project type code {}", code)))
}

/// Decode a project row; shared with the recent-projects view
pub(super) fn decode_diff_row(row: &SqliteRow) -> Result<AnalyzedDiffRow, sqlx::Error> {
    let status_code: i64 = row.try_get("status")?;
    let status = DiffStatus::from_code(status_code)
        .ok_or_else(|| decode_error(format!("unknown diff status code {}", status_code)))?;

    Ok(Analyzed::new(
        DiffRow {
            date: decode_date(row)?,
            downstream_project: row.try_get("downstream_project")?,
            upstream_project: row.try_get("upstream_project")?,
            status,
            files_changed: row.try_get("files_changed")?,
            line_insertions: row.try_get("line_insertions")?,
            line_deletions: row.try_get("line_deletions")?,
            line_changes: row.try_get("line_changes")?,
            commits_not_upstreamed: row.try_get("commits_not_upstreamed")?,
        },
        decode_classification(row)?,
    ))
}

/// Decode a commit row; shared with the recent-commits view
pub(super) fn decode_commit_row(row: &SqliteRow) -> Result<AnalyzedCommitRow, sqlx::Error> {
    Ok(Analyzed::new(
        CommitRow {
            date: decode_date(row)?,
            commit: row.try_get("commit_hash")?,
            downstream_project: row.try_get("downstream_project")?,
            author: row.try_get("author")?,
            subject: row.try_get("subject")?,
        },
        decode_classification(row)?,
    ))
}
