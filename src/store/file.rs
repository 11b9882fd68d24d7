//! JSON file-based document store.
//!
//! The whole collection is held in memory and rewritten atomically (temp file +
//! rename) after every mutation.

use super::{
    apply_fields, canonical_id, new_document_id, Document, DocumentStore, SetOutcome, StoreError,
    StoredDocument,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;

#[derive(Debug, Serialize, Deserialize, Default)]
struct CollectionSnapshot {
    #[serde(default)]
    documents: Vec<StoredDocument>,
}

/// Mutations are staged on a copy of the collection and only become visible
/// once the copy has been written to disk.
#[derive(Clone)]
pub struct FileDocumentStore {
    path: PathBuf,
    documents: Arc<RwLock<Vec<StoredDocument>>>,
    closed: Arc<AtomicBool>,
}

impl FileDocumentStore {
    pub async fn open(path: PathBuf) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| {
                StoreError::Unavailable(format!("Failed to create store dir: {}", e))
            })?;
        }

        let snapshot = match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<CollectionSnapshot>(&bytes).map_err(|e| {
                StoreError::Unavailable(format!("Failed to parse {}: {}", path.display(), e))
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => CollectionSnapshot::default(),
            Err(err) => {
                return Err(StoreError::Unavailable(format!(
                    "Failed to read {}: {}",
                    path.display(),
                    err
                )))
            }
        };

        tracing::debug!(
            "Loaded {} documents from {}",
            snapshot.documents.len(),
            path.display()
        );

        Ok(Self {
            path,
            documents: Arc::new(RwLock::new(snapshot.documents)),
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable(format!(
                "file store {} is closed",
                self.path.display()
            )))
        } else {
            Ok(())
        }
    }

    /// Write `documents` to disk. Callers hold the write lock so writes are serialized.
    async fn persist(&self, documents: &[StoredDocument]) -> Result<(), StoreError> {
        let snapshot = CollectionSnapshot {
            documents: documents.to_vec(),
        };
        let data = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| StoreError::Backend(format!("Failed to serialize store: {}", e)))?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, data)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to write store: {}", e)))?;
        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to finalize store: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    fn is_persistent(&self) -> bool {
        true
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.ensure_open()
    }

    async fn insert(&self, document: Document) -> Result<String, StoreError> {
        self.ensure_open()?;
        let id = new_document_id();
        let mut documents = self.documents.write().await;
        let mut staged = documents.clone();
        staged.push(StoredDocument {
            id: id.clone(),
            document,
        });
        self.persist(&staged).await?;
        *documents = staged;
        Ok(id)
    }

    async fn find_all(&self) -> Result<Vec<StoredDocument>, StoreError> {
        self.ensure_open()?;
        Ok(self.documents.read().await.clone())
    }

    async fn find(&self, id: &str) -> Result<Option<Document>, StoreError> {
        self.ensure_open()?;
        let id = canonical_id(id)?;
        Ok(self
            .documents
            .read()
            .await
            .iter()
            .find(|stored| stored.id == id)
            .map(|stored| stored.document.clone()))
    }

    async fn set_fields(&self, id: &str, fields: Document) -> Result<SetOutcome, StoreError> {
        self.ensure_open()?;
        let id = canonical_id(id)?;
        let mut documents = self.documents.write().await;
        let mut staged = documents.clone();
        let outcome = match staged.iter_mut().find(|stored| stored.id == id) {
            Some(stored) => SetOutcome {
                matched: true,
                modified: apply_fields(&mut stored.document, fields),
            },
            None => SetOutcome::default(),
        };
        if outcome.modified {
            self.persist(&staged).await?;
            *documents = staged;
        }
        Ok(outcome)
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.ensure_open()?;
        let id = canonical_id(id)?;
        let mut documents = self.documents.write().await;
        let mut staged = documents.clone();
        staged.retain(|stored| stored.id != id);
        if staged.len() == documents.len() {
            return Ok(false);
        }
        self.persist(&staged).await?;
        *documents = staged;
        Ok(true)
    }

    async fn close(&self) -> Result<(), StoreError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let documents = self.documents.read().await;
        self.persist(&documents).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(description: &str, status: &str) -> Document {
        let mut document = Document::new();
        document.insert("description".to_string(), json!(description));
        document.insert("status".to_string(), json!(status));
        document
    }

    #[tokio::test]
    async fn test_documents_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tasks.json");

        let store = FileDocumentStore::open(path.clone()).await.unwrap();
        let kept = store.insert(doc("keep", "pending")).await.unwrap();
        let dropped = store.insert(doc("drop", "pending")).await.unwrap();
        store
            .set_fields(&kept, doc("keep", "completed"))
            .await
            .unwrap();
        assert!(store.delete(&dropped).await.unwrap());
        store.close().await.unwrap();

        let reopened = FileDocumentStore::open(path).await.unwrap();
        let all = reopened.find_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, kept);
        assert_eq!(all[0].document["status"], "completed");
    }

    #[tokio::test]
    async fn test_corrupt_file_is_reported_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();

        let result = FileDocumentStore::open(path).await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_unchanged_update_reports_not_modified() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileDocumentStore::open(dir.path().join("tasks.json"))
            .await
            .unwrap();
        let id = store.insert(doc("same", "pending")).await.unwrap();

        let outcome = store.set_fields(&id, doc("same", "pending")).await.unwrap();
        assert!(outcome.matched);
        assert!(!outcome.modified);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_collection_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        let store = FileDocumentStore::open(sub.join("tasks.json")).await.unwrap();
        let id = store.insert(doc("kept", "pending")).await.unwrap();

        tokio::fs::remove_dir_all(&sub).await.unwrap();

        assert!(matches!(
            store.insert(doc("lost", "pending")).await,
            Err(StoreError::Backend(_))
        ));
        assert!(store.set_fields(&id, doc("kept", "completed")).await.is_err());
        assert!(store.delete(&id).await.is_err());

        let all = store.find_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, id);
        assert_eq!(all[0].document["status"], "pending");
    }
}
