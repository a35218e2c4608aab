mod database;
mod identifier;
mod snapshot;
mod views;

pub use database::Database;
pub use identifier::{normalize_url, IdentifierCache, DEFAULT_CACHE_CAPACITY};
pub use snapshot::{BatchKey, BatchKind, SnapshotRepository};
pub use views::ViewRepository;

// Re-export the schema version for callers who need it
pub const SCHEMA_VERSION: &str = "1";
