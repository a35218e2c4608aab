//! Get-or-create mapping from (URL, branch) to small stable integer ids
//!
//! Lookups go through a bounded in-memory LRU first, then the
//! `repositories` table. A miss runs read -> insert -> re-read: the insert
//! is an `ON CONFLICT DO NOTHING` upsert, so two callers racing on the same
//! key both end up reading the single row that won.

use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use tracing::debug;

use crate::error::MappingError;
use crate::model::{DiffTarget, MappedDiffTarget, RepoBranch};

use super::Database;

pub const DEFAULT_CACHE_CAPACITY: u64 = 1024;

/// Cache key: URL with its scheme stripped, plus branch
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RepoKey {
    url: String,
    branch: String,
}

/// Strip everything up to and including the first `//`
///
/// `https://host/path` and `ssh://host/path` map to the same key.
pub fn normalize_url(url: &str) -> &str {
    match url.split_once("//") {
        Some((_, rest)) => rest,
        None => url,
    }
}

/// Shared, thread-safe identifier cache backed by the database
pub struct IdentifierCache {
    db: Database,
    forward: Cache<RepoKey, i64>,
    reverse: Cache<i64, RepoBranch>,
}

impl IdentifierCache {
    pub fn new(db: Database) -> Self {
        Self::with_capacity(db, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(db: Database, capacity: u64) -> Self {
        let forward = Cache::builder()
            .max_capacity(capacity)
            .eviction_policy(EvictionPolicy::lru())
            .build();
        let reverse = Cache::builder()
            .max_capacity(capacity)
            .eviction_policy(EvictionPolicy::lru())
            .build();

        Self { db, forward, reverse }
    }

    /// Resolve a (url, branch) pair to its id, creating it on first sight
    pub async fn resolve(&self, url: &str, branch: &str) -> Result<i64, MappingError> {
        let key = RepoKey {
            url: normalize_url(url).to_string(),
            branch: branch.to_string(),
        };

        if let Some(id) = self.forward.get(&key) {
            return Ok(id);
        }

        let unavailable = |source| MappingError::Unavailable {
            url: key.url.clone(),
            branch: key.branch.clone(),
            source,
        };

        let id = match self.db.find_repository_id(&key.url, &key.branch).await.map_err(unavailable)? {
            Some(id) => id,
            None => {
                self.db.insert_repository(&key.url, &key.branch).await.map_err(unavailable)?;
                // Whichever insert won decides the id every caller sees
                let id = self
                    .db
                    .find_repository_id(&key.url, &key.branch)
                    .await
                    .map_err(unavailable)?
                    .ok_or_else(|| MappingError::Vanished {
                        url: key.url.clone(),
                        branch: key.branch.clone(),
                    })?;
                debug!(url = %key.url, branch = %key.branch, id, "registered repository");
                id
            }
        };

        self.reverse.insert(id, RepoBranch::new(key.url.clone(), key.branch.clone()));
        self.forward.insert(key, id);
        Ok(id)
    }

    /// Resolve both sides of a diff target
    pub async fn resolve_target(&self, target: &DiffTarget) -> Result<MappedDiffTarget, MappingError> {
        let upstream_id = self.resolve(&target.upstream.url, &target.upstream.branch).await?;
        let downstream_id = self.resolve(&target.downstream.url, &target.downstream.branch).await?;
        Ok(MappedDiffTarget::new(upstream_id, downstream_id))
    }

    /// Reverse lookup; `Ok(None)` when no row carries this id
    ///
    /// The returned URL is the normalized (scheme-less) form.
    pub async fn lookup(&self, id: i64) -> Result<Option<RepoBranch>, MappingError> {
        if let Some(repo) = self.reverse.get(&id) {
            return Ok(Some(repo));
        }

        let found = self
            .db
            .find_repository(id)
            .await
            .map_err(|source| MappingError::LookupUnavailable { id, source })?;

        if let Some(repo) = &found {
            self.forward.insert(
                RepoKey { url: repo.url.clone(), branch: repo.branch.clone() },
                id,
            );
            self.reverse.insert(id, repo.clone());
        }
        Ok(found)
    }

    /// Forget every cached entry; the table is untouched
    pub fn clear(&self) {
        self.forward.invalidate_all();
        self.reverse.invalidate_all();
    }
}
