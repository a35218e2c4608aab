// Database integration tests
// Tests SQLite operations in isolation using in-memory database

mod common;

use repodiff::repository::{Database, SCHEMA_VERSION};

/// Helper to create test database with initialized schema
async fn setup_db() -> Database {
    let db = common::create_test_db().await;
    db.init_schema().await.unwrap();
    db
}

#[tokio::test]
async fn test_schema_init() {
    let db = common::create_test_db().await;

    // First init should return true (schema was rebuilt/created)
    let rebuilt = db.init_schema().await.unwrap();
    assert!(rebuilt, "First init_schema should return true");

    // Second init should return false (schema exists and version matches)
    let rebuilt = db.init_schema().await.unwrap();
    assert!(!rebuilt, "Second init_schema should return false");

    let version = db.get_metadata("schema_version").await.unwrap();
    assert_eq!(version.as_deref(), Some(SCHEMA_VERSION));
}

#[tokio::test]
async fn test_metadata_roundtrip() {
    let db = setup_db().await;

    db.set_metadata("test_key", "test_value").await.unwrap();
    let value = db.get_metadata("test_key").await.unwrap();
    assert_eq!(value.as_deref(), Some("test_value"));

    db.set_metadata("test_key", "updated_value").await.unwrap();
    let value = db.get_metadata("test_key").await.unwrap();
    assert_eq!(value.as_deref(), Some("updated_value"));

    assert!(db.get_metadata("nonexistent").await.unwrap().is_none());
}

#[tokio::test]
async fn test_metadata_read_failure_is_an_error() {
    let db = setup_db().await;
    sqlx::query("DROP TABLE metadata").execute(db.pool()).await.unwrap();

    // A broken store must not look like a missing key
    assert!(db.get_metadata("schema_version").await.is_err());
}

#[tokio::test]
async fn test_version_change_rebuilds_tables() {
    let db = setup_db().await;
    db.insert_repository("host/repo", "main").await.unwrap();
    assert_eq!(db.repository_count().await.unwrap(), 1);

    // Simulate a database written by an older schema
    db.set_metadata("schema_version", "0").await.unwrap();

    let rebuilt = db.init_schema().await.unwrap();
    assert!(rebuilt);
    assert_eq!(db.repository_count().await.unwrap(), 0);
    assert_eq!(db.get_metadata("schema_version").await.unwrap().as_deref(), Some(SCHEMA_VERSION));
}

#[tokio::test]
async fn test_insert_repository_is_idempotent() {
    let db = setup_db().await;

    db.insert_repository("host/repo", "main").await.unwrap();
    db.insert_repository("host/repo", "main").await.unwrap();
    db.insert_repository("host/repo", "dev").await.unwrap();

    assert_eq!(db.repository_count().await.unwrap(), 2);

    let id = db.find_repository_id("host/repo", "main").await.unwrap().unwrap();
    let repo = db.find_repository(id).await.unwrap().unwrap();
    assert_eq!(repo.url, "host/repo");
    assert_eq!(repo.branch, "main");
}

#[tokio::test]
async fn test_missing_repository_is_none() {
    let db = setup_db().await;

    assert!(db.find_repository_id("host/none", "main").await.unwrap().is_none());
    assert!(db.find_repository(42).await.unwrap().is_none());
}

#[tokio::test]
async fn test_file_database_reopens_with_data() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("repodiff.db");
    let path = path.to_str().unwrap();

    {
        let db = Database::new(path).await.unwrap();
        db.init_schema().await.unwrap();
        db.insert_repository("host/repo", "main").await.unwrap();
    }

    let db = Database::new(path).await.unwrap();
    assert!(!db.init_schema().await.unwrap(), "Existing schema should be reused");
    assert_eq!(db.repository_count().await.unwrap(), 1);
}
