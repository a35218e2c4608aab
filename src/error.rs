//! Typed errors for the library layers
//!
//! The orchestration layer and the binary wrap these in `anyhow` with
//! context naming the failing stage.

use std::path::PathBuf;

/// A report or manifest could not be read or failed validation
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed csv in {report} report")]
    Csv {
        report: &'static str,
        #[source]
        source: csv::Error,
    },

    #[error("{report} report line {line}: expected {expected} columns, found {found}")]
    ColumnCount {
        report: &'static str,
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("{report} report line {line}: invalid {field} {value:?}: {message}")]
    InvalidField {
        report: &'static str,
        line: u64,
        field: &'static str,
        value: String,
        message: String,
    },

    #[error("malformed manifest xml in {}", path.display())]
    Manifest {
        path: PathBuf,
        #[source]
        source: quick_xml::Error,
    },
}

/// Identifier resolution failed
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    /// The database could not be reached; safe to retry
    #[error("identifier store unavailable while resolving {url}@{branch}")]
    Unavailable {
        url: String,
        branch: String,
        #[source]
        source: sqlx::Error,
    },

    /// The row was inserted (or already existed) but cannot be read back
    #[error("identifier row for {url}@{branch} vanished after insert")]
    Vanished { url: String, branch: String },

    #[error("identifier store unavailable while looking up id {id}")]
    LookupUnavailable {
        id: i64,
        #[source]
        source: sqlx::Error,
    },
}

impl MappingError {
    /// Whether retrying the same call may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, MappingError::Unavailable { .. } | MappingError::LookupUnavailable { .. })
    }
}

/// A snapshot could not be written or read back
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// The batch transaction was rolled back; nothing from it is visible
    #[error("write of {kind} batch ({rows} rows) for target {target} failed")]
    Write {
        kind: &'static str,
        target: String,
        rows: usize,
        #[source]
        source: sqlx::Error,
    },

    #[error("read of latest {kind} batch for target {target} failed")]
    Read {
        kind: &'static str,
        target: String,
        #[source]
        source: sqlx::Error,
    },
}
