//! Document storage with pluggable backends.
//!
//! The task collection is kept as schemaless JSON documents keyed by an opaque
//! UUID string, so that records written by older versions (or by hand) can still
//! be read and repaired at read time.
//!
//! Supports:
//! - `memory://`: In-memory storage (non-persistent, for testing)
//! - `file://<path>`: JSON snapshot file
//! - `sqlite://<path>`: SQLite table of JSON documents

mod file;
mod memory;
mod sqlite;

pub use file::FileDocumentStore;
pub use memory::InMemoryDocumentStore;
pub use sqlite::SqliteDocumentStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// A stored JSON object. Only top-level fields are addressed by the store.
pub type Document = serde_json::Map<String, Value>;

/// Errors raised by the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid store URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid document id: {0}")]
    InvalidId(String),

    #[error("Invalid status '{0}'")]
    InvalidStatus(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Backend(String),
}

/// Result of a partial field update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOutcome {
    /// A document with the id existed
    pub matched: bool,
    /// At least one field value actually changed
    pub modified: bool,
}

/// A document together with its id, in storage order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    pub document: Document,
}

/// Document store trait - implemented by all storage backends.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Whether this store persists data across restarts.
    fn is_persistent(&self) -> bool;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Insert a new document and return its generated id.
    async fn insert(&self, document: Document) -> Result<String, StoreError>;

    /// All documents in natural (insertion) order.
    async fn find_all(&self) -> Result<Vec<StoredDocument>, StoreError>;

    /// Get a single document by id.
    async fn find(&self, id: &str) -> Result<Option<Document>, StoreError>;

    /// Overwrite the given top-level fields of one document.
    async fn set_fields(&self, id: &str, fields: Document) -> Result<SetOutcome, StoreError>;

    /// Delete a document. Returns whether one was removed.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;

    /// Release the underlying connection. Later operations fail with
    /// `StoreError::Unavailable`.
    async fn close(&self) -> Result<(), StoreError>;
}

/// Generate a fresh document id.
pub fn new_document_id() -> String {
    Uuid::new_v4().to_string()
}

/// Parse an id supplied by a caller into its canonical string form.
pub fn canonical_id(id: &str) -> Result<String, StoreError> {
    Uuid::parse_str(id.trim())
        .map(|uuid| uuid.to_string())
        .map_err(|_| StoreError::InvalidId(id.to_string()))
}

/// Apply `$set`-style field updates. Returns whether anything changed.
pub fn apply_fields(document: &mut Document, fields: Document) -> bool {
    let mut modified = false;
    for (key, value) in fields {
        if document.get(&key) != Some(&value) {
            document.insert(key, value);
            modified = true;
        }
    }
    modified
}

/// Where a store lives, parsed from a connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    Memory,
    File(PathBuf),
    Sqlite(PathBuf),
}

impl StoreLocation {
    /// Parse a connection string.
    ///
    /// Accepts `memory://`, `file://<path>`, `sqlite://<path>`, and bare paths
    /// ending in `.json` (file) or `.db`/`.sqlite`/`.sqlite3` (sqlite).
    pub fn parse(url: &str) -> Result<Self, StoreError> {
        let url = url.trim();
        if url == "memory" || url.starts_with("memory://") {
            return Ok(Self::Memory);
        }
        if let Some(path) = url.strip_prefix("file://") {
            return non_empty_path(url, path).map(Self::File);
        }
        if let Some(path) = url.strip_prefix("sqlite://") {
            return non_empty_path(url, path).map(Self::Sqlite);
        }
        if url.contains("://") {
            return Err(StoreError::InvalidUrl(url.to_string()));
        }

        let lower = url.to_lowercase();
        if lower.ends_with(".json") {
            Ok(Self::File(PathBuf::from(url)))
        } else if [".db", ".sqlite", ".sqlite3"]
            .iter()
            .any(|ext| lower.ends_with(ext))
        {
            Ok(Self::Sqlite(PathBuf::from(url)))
        } else {
            Err(StoreError::InvalidUrl(url.to_string()))
        }
    }
}

fn non_empty_path(url: &str, path: &str) -> Result<PathBuf, StoreError> {
    if path.trim().is_empty() {
        Err(StoreError::InvalidUrl(url.to_string()))
    } else {
        Ok(PathBuf::from(path))
    }
}

/// Open a document store from a connection string and verify it responds.
pub async fn open_store(url: &str) -> Result<Arc<dyn DocumentStore>, StoreError> {
    let store: Arc<dyn DocumentStore> = match StoreLocation::parse(url)? {
        StoreLocation::Memory => Arc::new(InMemoryDocumentStore::new()),
        StoreLocation::File(path) => Arc::new(FileDocumentStore::open(path).await?),
        StoreLocation::Sqlite(path) => Arc::new(SqliteDocumentStore::open(path).await?),
    };
    store.ping().await?;
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_parse_store_locations() {
        assert_eq!(StoreLocation::parse("memory://").unwrap(), StoreLocation::Memory);
        assert_eq!(
            StoreLocation::parse("sqlite://./data/tasks.db").unwrap(),
            StoreLocation::Sqlite(PathBuf::from("./data/tasks.db"))
        );
        assert_eq!(
            StoreLocation::parse("file:///var/lib/tasks.json").unwrap(),
            StoreLocation::File(PathBuf::from("/var/lib/tasks.json"))
        );
        assert_eq!(
            StoreLocation::parse("tasks.sqlite3").unwrap(),
            StoreLocation::Sqlite(PathBuf::from("tasks.sqlite3"))
        );
        assert_eq!(
            StoreLocation::parse("tasks.json").unwrap(),
            StoreLocation::File(PathBuf::from("tasks.json"))
        );
    }

    #[test]
    fn test_parse_rejects_unknown_schemes() {
        assert!(matches!(
            StoreLocation::parse("mongodb://localhost:27017/"),
            Err(StoreError::InvalidUrl(_))
        ));
        assert!(matches!(
            StoreLocation::parse("sqlite://"),
            Err(StoreError::InvalidUrl(_))
        ));
        assert!(matches!(
            StoreLocation::parse("tasks"),
            Err(StoreError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_canonical_id() {
        let id = new_document_id();
        assert_eq!(canonical_id(&id.to_uppercase()).unwrap(), id);
        assert!(matches!(
            canonical_id("60c7b41b1d7d8f9c7b4c3e21"),
            Err(StoreError::InvalidId(_))
        ));
    }

    #[test]
    fn test_apply_fields_reports_changes_only() {
        let mut document = doc(json!({"description": "a", "status": "pending"}));

        let unchanged = apply_fields(&mut document, doc(json!({"status": "pending"})));
        assert!(!unchanged);

        let changed = apply_fields(
            &mut document,
            doc(json!({"status": "completed", "start_date": "2025-07-03"})),
        );
        assert!(changed);
        assert_eq!(document["status"], "completed");
        assert_eq!(document["start_date"], "2025-07-03");
        assert_eq!(document["description"], "a");
    }

    #[tokio::test]
    async fn test_open_memory_store() {
        let store = open_store("memory://").await.expect("memory store opens");
        assert!(!store.is_persistent());
        let id = store.insert(doc(json!({"description": "x"}))).await.unwrap();
        assert!(store.find(&id).await.unwrap().is_some());
    }
}
