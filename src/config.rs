//! Run configuration
//!
//! A JSON file lists the targets to compare. Relative paths inside it are
//! resolved against the directory holding the file.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::model::{DiffTarget, RepoBranch};
use crate::pipeline::DEFAULT_TOP_COMMITTERS;
use crate::repository::DEFAULT_CACHE_CAPACITY;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// SQLite database file; defaults to the user data directory
    #[serde(default)]
    pub database: Option<PathBuf>,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
    #[serde(default = "default_top_committers")]
    pub top_committers: usize,
    pub targets: Vec<TargetConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    pub upstream: RepoBranch,
    pub downstream: RepoBranch,
    /// Project-level CSV written by the diff script
    pub project_report: PathBuf,
    /// Commit-level CSV written by the diff script
    pub commit_report: PathBuf,
    pub manifests: ManifestPaths,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestPaths {
    pub common: PathBuf,
    pub upstream: PathBuf,
    pub downstream: PathBuf,
}

fn default_cache_capacity() -> u64 {
    DEFAULT_CACHE_CAPACITY
}

fn default_top_committers() -> usize {
    DEFAULT_TOP_COMMITTERS
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config {}", path.display()))?;
        let mut config = Self::from_json(&raw)
            .with_context(|| format!("Invalid config {}", path.display()))?;

        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.targets.is_empty() {
            bail!("config lists no targets");
        }
        if self.cache_capacity == 0 {
            bail!("cache_capacity must be positive");
        }
        for target in &self.targets {
            for side in [&target.upstream, &target.downstream] {
                if side.url.trim().is_empty() || side.branch.trim().is_empty() {
                    bail!("target {} has an empty url or branch", target.diff_target());
                }
            }
        }
        Ok(())
    }

    fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };

        if let Some(db) = self.database.as_mut() {
            resolve(db);
        }
        for target in &mut self.targets {
            resolve(&mut target.project_report);
            resolve(&mut target.commit_report);
            resolve(&mut target.manifests.common);
            resolve(&mut target.manifests.upstream);
            resolve(&mut target.manifests.downstream);
        }
    }

    /// Database location, falling back to `<data dir>/repodiff/repodiff.db`
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database {
            Some(path) => Ok(path.clone()),
            None => Ok(dirs::data_dir()
                .context("Could not determine data directory")?
                .join("repodiff")
                .join("repodiff.db")),
        }
    }
}

impl TargetConfig {
    pub fn diff_target(&self) -> DiffTarget {
        DiffTarget {
            upstream: self.upstream.clone(),
            downstream: self.downstream.clone(),
        }
    }
}
