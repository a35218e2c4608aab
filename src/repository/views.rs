//! Denormalized dashboard views
//!
//! Each write replaces (or upserts) one view for one target inside a
//! single transaction, so dashboards never read a half-rewritten view.

use anyhow::{anyhow, Result};
use sqlx::{QueryBuilder, Row, Sqlite, Transaction};

use crate::model::{
    AnalyzedCommitRow, AnalyzedDiffRow, ChangesOverTime, Classification, MappedDiffTarget,
    TopCommitter,
};
use crate::util::{format_date, parse_stored_date};

use super::snapshot::{decode_commit_row, decode_diff_row};
use super::Database;

const BATCH_SIZE: usize = 1000;

/// Persistence for the aggregate views
#[derive(Clone)]
pub struct ViewRepository {
    db: Database,
}

impl ViewRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Replace the recent-projects view with the given rows
    pub async fn replace_recent_projects(
        &self,
        target: &MappedDiffTarget,
        rows: &[AnalyzedDiffRow],
    ) -> Result<()> {
        let mut tx = self.db.pool().begin().await?;
        clear_in_tx(&mut tx, "view_recent_projects", target).await?;

        for (chunk_no, chunk) in rows.chunks(BATCH_SIZE).enumerate() {
            let offset = chunk_no * BATCH_SIZE;
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO view_recent_projects (upstream_id, downstream_id, row_index, date, \
                    downstream_project, upstream_project, status, files_changed, line_insertions, \
                    line_deletions, line_changes, commits_not_upstreamed, project_type) "
            );
            qb.push_values(chunk.iter().enumerate(), |mut b, (i, analyzed)| {
                let row = &analyzed.row;
                b.push_bind(target.upstream_id)
                    .push_bind(target.downstream_id)
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
            qb.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Replace the recent-commits view with the given rows
    pub async fn replace_recent_commits(
        &self,
        target: &MappedDiffTarget,
        rows: &[AnalyzedCommitRow],
    ) -> Result<()> {
        let mut tx = self.db.pool().begin().await?;
        clear_in_tx(&mut tx, "view_recent_commits", target).await?;

        for (chunk_no, chunk) in rows.chunks(BATCH_SIZE).enumerate() {
            let offset = chunk_no * BATCH_SIZE;
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO view_recent_commits (upstream_id, downstream_id, row_index, date, \
                    commit_hash, downstream_project, author, subject, project_type) "
            );
            qb.push_values(chunk.iter().enumerate(), |mut b, (i, analyzed)| {
                let row = &analyzed.row;
                b.push_bind(target.upstream_id)
                    .push_bind(target.downstream_id)
                    .push_bind((offset + i) as i64)
                    .push_bind(format_date(row.date))
                    .push_bind(row.commit.as_str())
                    .push_bind(row.downstream_project.as_str())
                    .push_bind(row.author.as_str())
                    .push_bind(row.subject.as_str())
                    .push_bind(analyzed.classification.code());
            });
            qb.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Upsert per-date totals; earlier dates are kept
    pub async fn upsert_changes_over_time(
        &self,
        target: &MappedDiffTarget,
        changes: &[ChangesOverTime],
    ) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }

        let mut tx = self.db.pool().begin().await?;
        for chunk in changes.chunks(BATCH_SIZE) {
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO view_changes_over_time (upstream_id, downstream_id, date, project_type, \
                    modified_projects, files_changed, line_changes, commits_not_upstreamed) "
            );
            qb.push_values(chunk, |mut b, change| {
                b.push_bind(target.upstream_id)
                    .push_bind(target.downstream_id)
                    .push_bind(format_date(change.date))
                    .push_bind(change.classification.code())
                    .push_bind(change.modified_projects)
                    .push_bind(change.files_changed)
                    .push_bind(change.line_changes)
                    .push_bind(change.commits_not_upstreamed);
            });
            qb.push(
                " ON CONFLICT (upstream_id, downstream_id, date, project_type) DO UPDATE SET \
                    modified_projects = excluded.modified_projects, \
                    files_changed = excluded.files_changed, \
                    line_changes = excluded.line_changes, \
                    commits_not_upstreamed = excluded.commits_not_upstreamed"
            );
            qb.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Replace the top-committers view
    pub async fn replace_top_committers(
        &self,
        target: &MappedDiffTarget,
        committers: &[TopCommitter],
    ) -> Result<()> {
        let mut tx = self.db.pool().begin().await?;
        clear_in_tx(&mut tx, "view_top_committers", target).await?;

        if !committers.is_empty() {
            let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO view_top_committers (upstream_id, downstream_id, rank, author, \
                    commits, differential_commits) "
            );
            qb.push_values(committers, |mut b, committer| {
                b.push_bind(target.upstream_id)
                    .push_bind(target.downstream_id)
                    .push_bind(committer.rank)
                    .push_bind(committer.author.as_str())
                    .push_bind(committer.commits)
                    .push_bind(committer.differential_commits);
            });
            qb.build().execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn recent_projects(&self, target: &MappedDiffTarget) -> Result<Vec<AnalyzedDiffRow>> {
        let rows = sqlx::query(
            "SELECT date, downstream_project, upstream_project, status, files_changed,
                    line_insertions, line_deletions, line_changes, commits_not_upstreamed,
                    project_type
                FROM view_recent_projects
                WHERE upstream_id = ? AND downstream_id = ?
                ORDER BY row_index"
        )
        .bind(target.upstream_id)
        .bind(target.downstream_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(decode_diff_row).collect::<Result<Vec<_>, _>>()?)
    }

    pub async fn recent_commits(&self, target: &MappedDiffTarget) -> Result<Vec<AnalyzedCommitRow>> {
        let rows = sqlx::query(
            "SELECT date, commit_hash, downstream_project, author, subject, project_type
                FROM view_recent_commits
                WHERE upstream_id = ? AND downstream_id = ?
                ORDER BY row_index"
        )
        .bind(target.upstream_id)
        .bind(target.downstream_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(decode_commit_row).collect::<Result<Vec<_>, _>>()?)
    }

    /// Per-date totals ordered by date, then classification
    pub async fn changes_over_time(&self, target: &MappedDiffTarget) -> Result<Vec<ChangesOverTime>> {
        let rows = sqlx::query(
            "SELECT date, project_type, modified_projects, files_changed, line_changes,
                    commits_not_upstreamed
                FROM view_changes_over_time
                WHERE upstream_id = ? AND downstream_id = ?
                ORDER BY date, project_type"
        )
        .bind(target.upstream_id)
        .bind(target.downstream_id)
        .fetch_all(self.db.pool())
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let date: String = row.try_get("date")?;
            let code: i64 = row.try_get("project_type")?;
            out.push(ChangesOverTime {
                date: parse_stored_date(&date)?,
                classification: Classification::from_code(code)
                    .ok_or_else(|| anyhow!("unknown project type code {} in changes over time", code))?,
                modified_projects: row.try_get("modified_projects")?,
                files_changed: row.try_get("files_changed")?,
                line_changes: row.try_get("line_changes")?,
                commits_not_upstreamed: row.try_get("commits_not_upstreamed")?,
            });
        }
        Ok(out)
    }

    pub async fn top_committers(&self, target: &MappedDiffTarget) -> Result<Vec<TopCommitter>> {
        let rows = sqlx::query(
            "SELECT rank, author, commits, differential_commits
                FROM view_top_committers
                WHERE upstream_id = ? AND downstream_id = ?
                ORDER BY rank"
        )
        .bind(target.upstream_id)
        .bind(target.downstream_id)
        .fetch_all(self.db.pool())
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(TopCommitter {
                rank: row.try_get("rank")?,
                author: row.try_get("author")?,
                commits: row.try_get("commits")?,
                differential_commits: row.try_get("differential_commits")?,
            });
        }
        Ok(out)
    }
}

async fn clear_in_tx(
    tx: &mut Transaction<'_, Sqlite>,
    table: &'static str,
    target: &MappedDiffTarget,
) -> Result<()> {
    sqlx::query(&format!(
        "DELETE FROM {} WHERE upstream_id = ? AND downstream_id = ?",
        table
    ))
    .bind(target.upstream_id)
    .bind(target.downstream_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
