//! In-memory document store (non-persistent).

use super::{
    apply_fields, canonical_id, new_document_id, Document, DocumentStore, SetOutcome, StoreError,
    StoredDocument,
};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct InMemoryDocumentStore {
    documents: Arc<RwLock<Vec<StoredDocument>>>,
    closed: Arc<AtomicBool>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            documents: Arc::new(RwLock::new(Vec::new())),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.closed.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store is closed".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    fn is_persistent(&self) -> bool {
        false
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.ensure_open()
    }

    async fn insert(&self, document: Document) -> Result<String, StoreError> {
        self.ensure_open()?;
        let id = new_document_id();
        self.documents.write().await.push(StoredDocument {
            id: id.clone(),
            document,
        });
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
        match documents.iter_mut().find(|stored| stored.id == id) {
            Some(stored) => Ok(SetOutcome {
                matched: true,
                modified: apply_fields(&mut stored.document, fields),
            }),
            None => Ok(SetOutcome::default()),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.ensure_open()?;
        let id = canonical_id(id)?;
        let mut documents = self.documents.write().await;
        let before = documents.len();
        documents.retain(|stored| stored.id != id);
        Ok(documents.len() < before)
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
