//! End-to-end run: reports in, snapshots and views out
//!
//! One target goes through ingest, classification, id mapping, two batch
//! writes and the view rebuild. Targets are independent, so `run_all`
//! fans them out through [`TaskRunner`].

mod denormalize;
mod progress;
mod task_runner;

pub use denormalize::{Denormalizer, DEFAULT_TOP_COMMITTERS};
pub use progress::{reporter, IndicatifProgress, NoopProgress, ProgressHandle, ProgressReporter};
pub use task_runner::TaskRunner;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

use crate::analysis::ProjectClassifier;
use crate::config::{Config, TargetConfig};
use crate::ingest::{read_commit_rows, read_diff_rows, Manifest};
use crate::model::{DiffTarget, MappedDiffTarget};
use crate::repository::{BatchKey, Database, IdentifierCache, SnapshotRepository};
use crate::util::{format_timestamp, unix_now};

/// What one target run produced
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub target: MappedDiffTarget,
    pub project_batch: BatchKey,
    pub commit_batch: BatchKey,
    pub project_rows: usize,
    pub commit_rows: usize,
}

#[derive(Clone)]
pub struct Pipeline {
    identifiers: Arc<IdentifierCache>,
    snapshots: SnapshotRepository,
    denormalizer: Denormalizer,
    progress: Arc<dyn ProgressReporter>,
}

impl Pipeline {
    pub fn new(db: Database, progress: Arc<dyn ProgressReporter>) -> Self {
        Self {
            identifiers: Arc::new(IdentifierCache::new(db.clone())),
            snapshots: SnapshotRepository::new(db.clone()),
            denormalizer: Denormalizer::new(db),
            progress,
        }
    }

    /// Pipeline sized by the config's cache and ranking limits
    pub fn from_config(db: Database, config: &Config, progress: Arc<dyn ProgressReporter>) -> Self {
        Self {
            identifiers: Arc::new(IdentifierCache::with_capacity(db.clone(), config.cache_capacity)),
            snapshots: SnapshotRepository::new(db.clone()),
            denormalizer: Denormalizer::new(db).with_top_committers(config.top_committers),
            progress,
        }
    }

    pub fn identifiers(&self) -> &IdentifierCache {
        &self.identifiers
    }

    #[instrument(skip_all, fields(target = %config.diff_target()))]
    pub async fn run_target(&self, config: &TargetConfig) -> Result<RunSummary> {
        let start = Instant::now();

        let common = load_manifest("common", &config.manifests.common)?;
        let upstream = load_manifest("upstream", &config.manifests.upstream)?;
        let downstream = load_manifest("downstream", &config.manifests.downstream)?;
        let classifier = ProjectClassifier::from_manifests(&common, &upstream, &downstream);

        let diff_rows = classifier.analyze(
            read_diff_rows(&config.project_report).context("Could not ingest project report")?,
        );
        let commit_rows = classifier.analyze(
            read_commit_rows(&config.commit_report).context("Could not ingest commit report")?,
        );

        let target: DiffTarget = config.diff_target();
        let mapped = self
            .identifiers
            .resolve_target(&target)
            .await
            .with_context(|| format!("Could not map {}", target))?;

        // Both batches share one timestamp so they read as the same run
        let timestamp = unix_now();

        let handle = self.progress.start(&format!("{} projects", mapped), diff_rows.len() as u64);
        let project_batch = self
            .snapshots
            .write_diff_batch_with_callback(&mapped, &diff_rows, timestamp, |n| handle.inc(n as u64))
            .await?;
        handle.finish();

        let handle = self.progress.start(&format!("{} commits", mapped), commit_rows.len() as u64);
        let commit_batch = self
            .snapshots
            .write_commit_batch_with_callback(&mapped, &commit_rows, timestamp, |n| handle.inc(n as u64))
            .await?;
        handle.finish();

        self.denormalizer.run(mapped).await?;

        info!(
            %mapped,
            snapshot = %format_timestamp(timestamp),
            projects = diff_rows.len(),
            commits = commit_rows.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "target complete"
        );

        Ok(RunSummary {
            target: mapped,
            project_batch,
            commit_batch,
            project_rows: diff_rows.len(),
            commit_rows: commit_rows.len(),
        })
    }

    /// Run every target concurrently; the first failure is returned
    pub async fn run_all(&self, targets: Vec<TargetConfig>) -> Result<()> {
        let mut runner = TaskRunner::new();
        for target in targets {
            let this = self.clone();
            let name = target.diff_target().to_string();
            runner.push(name, move || async move {
                this.run_target(&target)
                    .await
                    .with_context(|| format!("target {} failed", target.diff_target()))
                    .map(|_| ())
            });
        }
        runner.run().await
    }
}

fn load_manifest(role: &str, path: &Path) -> Result<Manifest> {
    Manifest::load(path).with_context(|| format!("Could not load {} manifest", role))
}
