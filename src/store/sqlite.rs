//! SQLite-based document store.
//!
//! Each document is one row holding its JSON text; natural order is rowid order.

use super::{
    apply_fields, canonical_id, new_document_id, Document, DocumentStore, SetOutcome, StoreError,
    StoredDocument,
};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

const SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY NOT NULL,
    document TEXT NOT NULL
);
"#;

pub struct SqliteDocumentStore {
    conn: Arc<Mutex<Option<Connection>>>,
    path: PathBuf,
}

fn backend_error(e: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn encode(document: &Document) -> Result<String, StoreError> {
    serde_json::to_string(document).map_err(backend_error)
}

fn decode(id: &str, text: &str) -> Result<Document, StoreError> {
    serde_json::from_str(text)
        .map_err(|e| StoreError::Backend(format!("Corrupt document {}: {}", id, e)))
}

impl SqliteDocumentStore {
    pub async fn open(path: PathBuf) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StoreError::Unavailable(format!("Failed to create store dir: {}", e))
            })?;
        }

        // Open database in blocking task
        let db_path = path.clone();
        let conn = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path).map_err(|e| {
                StoreError::Unavailable(format!("Failed to open SQLite database: {}", e))
            })?;

            conn.execute_batch(SCHEMA)
                .map_err(|e| StoreError::Unavailable(format!("Failed to run schema: {}", e)))?;

            Ok::<_, StoreError>(conn)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("Task join error: {}", e)))??;

        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            path,
        })
    }

    /// Run `f` against the open connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.blocking_lock();
            let conn = guard
                .as_ref()
                .ok_or_else(|| StoreError::Unavailable("sqlite store is closed".to_string()))?;
            f(conn)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("Task join error: {}", e)))?
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn insert(&self, document: Document) -> Result<String, StoreError> {
        let id = new_document_id();
        let text = encode(&document)?;
        let row_id = id.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO tasks (id, document) VALUES (?1, ?2)",
                params![row_id, text],
            )
            .map_err(backend_error)?;
            Ok(())
        })
        .await?;
        Ok(id)
    }

    async fn find_all(&self) -> Result<Vec<StoredDocument>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare("SELECT id, document FROM tasks ORDER BY rowid")
                .map_err(backend_error)?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
                .map_err(backend_error)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(backend_error)?;

            let mut documents = Vec::with_capacity(rows.len());
            for (id, text) in rows {
                match decode(&id, &text) {
                    Ok(document) => documents.push(StoredDocument { id, document }),
                    Err(e) => tracing::warn!("Skipping unreadable row: {}", e),
                }
            }
            Ok(documents)
        })
        .await
    }

    async fn find(&self, id: &str) -> Result<Option<Document>, StoreError> {
        let id = canonical_id(id)?;
        self.with_conn(move |conn| {
            let text: Option<String> = conn
                .query_row(
                    "SELECT document FROM tasks WHERE id = ?1",
                    params![&id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(backend_error)?;
            text.map(|text| decode(&id, &text)).transpose()
        })
        .await
    }

    async fn set_fields(&self, id: &str, fields: Document) -> Result<SetOutcome, StoreError> {
        let id = canonical_id(id)?;
        self.with_conn(move |conn| {
            let text: Option<String> = conn
                .query_row(
                    "SELECT document FROM tasks WHERE id = ?1",
                    params![&id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(backend_error)?;

            let Some(text) = text else {
                return Ok(SetOutcome::default());
            };

            let mut document = decode(&id, &text)?;
            if !apply_fields(&mut document, fields) {
                return Ok(SetOutcome {
                    matched: true,
                    modified: false,
                });
            }

            conn.execute(
                "UPDATE tasks SET document = ?1 WHERE id = ?2",
                params![encode(&document)?, &id],
            )
            .map_err(backend_error)?;

            Ok(SetOutcome {
                matched: true,
                modified: true,
            })
        })
        .await
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let id = canonical_id(id)?;
        self.with_conn(move |conn| {
            let deleted = conn
                .execute("DELETE FROM tasks WHERE id = ?1", params![&id])
                .map_err(backend_error)?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn close(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().await.take();
        if let Some(conn) = conn {
            conn.close()
                .map_err(|(_, e)| StoreError::Backend(format!("Failed to close database: {}", e)))?;
            tracing::debug!("Closed SQLite database {}", self.path.display());
        }
        Ok(())
    }
}
