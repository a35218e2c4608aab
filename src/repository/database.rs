use anyhow::{Context, Result};
use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions}, Pool, Row, Sqlite};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

use crate::model::RepoBranch;

use super::SCHEMA_VERSION;

const IN_MEMORY: &str = ":memory:";
const SCHEMA_VERSION_KEY: &str = "schema_version";

/// Tables owned by the current schema, dropped on a version change
const TABLES: &[&str] = &[
    "repositories",
    "batches",
    "project_differentials",
    "commits",
    "view_recent_projects",
    "view_recent_commits",
    "view_changes_over_time",
    "view_top_committers",
];

/// Database abstraction for SQLite operations
///
/// Cloning is cheap: clones share the same connection pool.
#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Create a new database connection, pool sized to the available cores
    pub async fn new(db_path: &str) -> Result<Self> {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get() as u32)
            .unwrap_or(4);
        Self::with_max_connections(db_path, cores).await
    }

    /// Create a new database connection with an explicit pool size
    ///
    /// An in-memory database is private to its connection, so it always
    /// gets a single-connection pool.
    pub async fn with_max_connections(db_path: &str, max_connections: u32) -> Result<Self> {
        let max_connections = if db_path == IN_MEMORY { 1 } else { max_connections.max(1) };

        // Configure connection options with PRAGMAs applied to every connection
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", db_path))?
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(30))
            .pragma("temp_store", "MEMORY")
            .pragma("cache_size", "-64000"); // 64MB cache

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to connect to database {}", db_path))?;

        debug!(db_path, max_connections, "connected to database");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Initialize database schema, returns true if schema was rebuilt
    pub async fn init_schema(&self) -> Result<bool> {
        // Create metadata table first (needed to check version)
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS metadata (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )"
        ).execute(&self.pool).await?;

        let stored_version = self.get_metadata(SCHEMA_VERSION_KEY).await?;

        let needs_rebuild = stored_version.as_deref() != Some(SCHEMA_VERSION);

        if needs_rebuild {
            if let Some(old) = &stored_version {
                warn!(old = %old, new = SCHEMA_VERSION, "schema version changed, rebuilding tables");
            }
            for table in TABLES {
                sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
                    .execute(&self.pool)
                    .await?;
            }
            sqlx::query("DELETE FROM metadata").execute(&self.pool).await?;
        }

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS repositories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL,
                branch TEXT NOT NULL,
                UNIQUE (url, branch)
            )"
        ).execute(&self.pool).await?;

        // One ledger row per committed batch; seq orders batches that share a second
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS batches (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                upstream_id INTEGER NOT NULL,
                downstream_id INTEGER NOT NULL,
                kind TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                batch_id TEXT NOT NULL UNIQUE,
                row_count INTEGER NOT NULL
            )"
        ).execute(&self.pool).await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS batches_latest
                ON batches (upstream_id, downstream_id, kind, timestamp)"
        ).execute(&self.pool).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS project_differentials (
                upstream_id INTEGER NOT NULL,
                downstream_id INTEGER NOT NULL,
                timestamp INTEGER NOT NULL,
                batch_id TEXT NOT NULL,
                row_index INTEGER NOT NULL,
                date TEXT NOT NULL,
                downstream_project TEXT NOT NULL,
                upstream_project TEXT NOT NULL,
                status INTEGER NOT NULL,
                files_changed INTEGER NOT NULL,
                line_insertions INTEGER NOT NULL,
                line_deletions INTEGER NOT NULL,
                line_changes INTEGER NOT NULL,
                commits_not_upstreamed INTEGER NOT NULL,
                project_type INTEGER NOT NULL,
                PRIMARY KEY (upstream_id, downstream_id, timestamp, batch_id, row_index)
            )"
        ).execute(&self.pool).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS commits (
                upstream_id INTEGER NOT NULL,
                downstream_id INTEGER NOT NULL,
                timestamp INTEGER NOT NULL,
                batch_id TEXT NOT NULL,
                row_index INTEGER NOT NULL,
                date TEXT NOT NULL,
                commit_hash TEXT NOT NULL,
                downstream_project TEXT NOT NULL,
                author TEXT NOT NULL,
                subject TEXT NOT NULL,
                project_type INTEGER NOT NULL,
                PRIMARY KEY (upstream_id, downstream_id, timestamp, batch_id, row_index)
            )"
        ).execute(&self.pool).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS view_recent_projects (
                upstream_id INTEGER NOT NULL,
                downstream_id INTEGER NOT NULL,
                row_index INTEGER NOT NULL,
                date TEXT NOT NULL,
                downstream_project TEXT NOT NULL,
                upstream_project TEXT NOT NULL,
                status INTEGER NOT NULL,
                files_changed INTEGER NOT NULL,
                line_insertions INTEGER NOT NULL,
                line_deletions INTEGER NOT NULL,
                line_changes INTEGER NOT NULL,
                commits_not_upstreamed INTEGER NOT NULL,
                project_type INTEGER NOT NULL,
                PRIMARY KEY (upstream_id, downstream_id, row_index)
            )"
        ).execute(&self.pool).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS view_recent_commits (
                upstream_id INTEGER NOT NULL,
                downstream_id INTEGER NOT NULL,
                row_index INTEGER NOT NULL,
                date TEXT NOT NULL,
                commit_hash TEXT NOT NULL,
                downstream_project TEXT NOT NULL,
                author TEXT NOT NULL,
                subject TEXT NOT NULL,
                project_type INTEGER NOT NULL,
                PRIMARY KEY (upstream_id, downstream_id, row_index)
            )"
        ).execute(&self.pool).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS view_changes_over_time (
                upstream_id INTEGER NOT NULL,
                downstream_id INTEGER NOT NULL,
                date TEXT NOT NULL,
                project_type INTEGER NOT NULL,
                modified_projects INTEGER NOT NULL,
                files_changed INTEGER NOT NULL,
                line_changes INTEGER NOT NULL,
                commits_not_upstreamed INTEGER NOT NULL,
                PRIMARY KEY (upstream_id, downstream_id, date, project_type)
            )"
        ).execute(&self.pool).await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS view_top_committers (
                upstream_id INTEGER NOT NULL,
                downstream_id INTEGER NOT NULL,
                rank INTEGER NOT NULL,
                author TEXT NOT NULL,
                commits INTEGER NOT NULL,
                differential_commits INTEGER NOT NULL,
                PRIMARY KEY (upstream_id, downstream_id, rank)
            )"
        ).execute(&self.pool).await?;

        // Store current schema version
        if needs_rebuild {
            self.set_metadata(SCHEMA_VERSION_KEY, SCHEMA_VERSION).await?;
        }

        Ok(needs_rebuild)
    }

    /// Get metadata value by key
    pub async fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let value = sqlx::query_scalar("SELECT value FROM metadata WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    /// Set metadata value
    pub async fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO metadata (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Id of an already-registered (url, branch) pair
    ///
    /// `Ok(None)` means the row is absent; `Err` means the store failed.
    pub async fn find_repository_id(&self, url: &str, branch: &str) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar("SELECT id FROM repositories WHERE url = ? AND branch = ?")
            .bind(url)
            .bind(branch)
            .fetch_optional(&self.pool)
            .await
    }

    /// Register a (url, branch) pair; a row inserted concurrently by another
    /// caller is kept as-is
    pub async fn insert_repository(&self, url: &str, branch: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO repositories (url, branch) VALUES (?, ?)
                ON CONFLICT (url, branch) DO NOTHING"
        )
        .bind(url)
        .bind(branch)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Reverse lookup of a repository id
    pub async fn find_repository(&self, id: i64) -> Result<Option<RepoBranch>, sqlx::Error> {
        let row = sqlx::query("SELECT url, branch FROM repositories WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let url: String = row.try_get("url")?;
                let branch: String = row.try_get("branch")?;
                Ok(Some(RepoBranch::new(url, branch)))
            }
            None => Ok(None),
        }
    }

    /// Number of registered (url, branch) pairs
    pub async fn repository_count(&self) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM repositories")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
