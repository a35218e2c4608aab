//! Rebuild the dashboard views from the latest snapshots
//!
//! Each job reads back the latest committed batch for one target and
//! rewrites one view. Jobs are independent and fan out through
//! [`TaskRunner`]; one failing job does not roll back the others.

use anyhow::{Context, Result};
use tracing::info;

use crate::model::{changes_over_time, top_committers, MappedDiffTarget};
use crate::repository::{Database, SnapshotRepository, ViewRepository};

use super::task_runner::TaskRunner;

pub const DEFAULT_TOP_COMMITTERS: usize = 10;

#[derive(Clone)]
pub struct Denormalizer {
    snapshots: SnapshotRepository,
    views: ViewRepository,
    top_committers: usize,
}

impl Denormalizer {
    pub fn new(db: Database) -> Self {
        Self {
            snapshots: SnapshotRepository::new(db.clone()),
            views: ViewRepository::new(db),
            top_committers: DEFAULT_TOP_COMMITTERS,
        }
    }

    pub fn with_top_committers(mut self, limit: usize) -> Self {
        self.top_committers = limit;
        self
    }

    pub async fn recent_projects(&self, target: &MappedDiffTarget) -> Result<()> {
        let rows = self.snapshots.latest_diff_batch(target).await?;
        self.views.replace_recent_projects(target, &rows).await?;
        info!(%target, rows = rows.len(), "refreshed recent projects view");
        Ok(())
    }

    pub async fn recent_commits(&self, target: &MappedDiffTarget) -> Result<()> {
        let rows = self.snapshots.latest_commit_batch(target).await?;
        self.views.replace_recent_commits(target, &rows).await?;
        info!(%target, rows = rows.len(), "refreshed recent commits view");
        Ok(())
    }

    pub async fn changes_over_time(&self, target: &MappedDiffTarget) -> Result<()> {
        let rows = self.snapshots.latest_diff_batch(target).await?;
        let changes = changes_over_time(&rows);
        self.views.upsert_changes_over_time(target, &changes).await?;
        info!(%target, groups = changes.len(), "refreshed changes over time view");
        Ok(())
    }

    pub async fn top_committers(&self, target: &MappedDiffTarget) -> Result<()> {
        let rows = self.snapshots.latest_commit_batch(target).await?;
        let ranked = top_committers(&rows, self.top_committers);
        self.views.replace_top_committers(target, &ranked).await?;
        info!(%target, authors = ranked.len(), "refreshed top committers view");
        Ok(())
    }

    /// Fan out every view job for one target
    pub async fn run(&self, target: MappedDiffTarget) -> Result<()> {
        let mut runner = TaskRunner::new();

        let this = self.clone();
        runner.push("recent_projects", move || async move {
            this.recent_projects(&target)
                .await
                .with_context(|| format!("recent projects view for {}", target))
        });

        let this = self.clone();
        runner.push("recent_commits", move || async move {
            this.recent_commits(&target)
                .await
                .with_context(|| format!("recent commits view for {}", target))
        });

        let this = self.clone();
        runner.push("changes_over_time", move || async move {
            this.changes_over_time(&target)
                .await
                .with_context(|| format!("changes over time view for {}", target))
        });

        let this = self.clone();
        runner.push("top_committers", move || async move {
            this.top_committers(&target)
                .await
                .with_context(|| format!("top committers view for {}", target))
        });

        runner.run().await
    }
}
