//! Task-level operations over the document store.
//!
//! The store handle is created once at startup. If the backend could not be
//! opened the handle is `Unavailable` and every operation fails fast with
//! `StoreError::Unavailable` instead of the process refusing to start.

use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::task::{now_string, Task, TaskStatus, MAX_DESCRIPTION_CHARS};
use crate::store::{open_store, Document, DocumentStore, StoreError};

#[derive(Clone)]
enum StoreHandle {
    Connected(Arc<dyn DocumentStore>),
    Unavailable { reason: String },
}

/// Fields to change on an existing task. Blank strings count as absent.
///
/// `status` is kept as the raw string so that an invalid value can be rejected
/// as a whole instead of being dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub description: Option<String>,
    pub start_date: Option<String>,
    pub status: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn validate_description(description: &str) -> Result<&str, StoreError> {
    let description = description.trim();
    if description.is_empty() {
        return Err(StoreError::Validation(
            "description must not be empty".to_string(),
        ));
    }
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(StoreError::Validation(format!(
            "description exceeds {} characters",
            MAX_DESCRIPTION_CHARS
        )));
    }
    Ok(description)
}

impl TaskPatch {
    /// Whether the patch carries no field to apply.
    pub fn is_empty(&self) -> bool {
        non_blank(&self.description).is_none()
            && non_blank(&self.start_date).is_none()
            && non_blank(&self.status).is_none()
    }

    /// Validate every field and build the `$set` document.
    ///
    /// Any invalid field rejects the whole patch.
    fn into_fields(self) -> Result<Document, StoreError> {
        let mut fields = Document::new();
        if let Some(status) = non_blank(&self.status) {
            let status = TaskStatus::parse(status)
                .ok_or_else(|| StoreError::InvalidStatus(status.to_string()))?;
            fields.insert("status".to_string(), Value::from(status.as_str()));
        }
        if let Some(description) = non_blank(&self.description) {
            let description = validate_description(description)?;
            fields.insert("description".to_string(), Value::from(description));
        }
        if let Some(start_date) = non_blank(&self.start_date) {
            fields.insert("start_date".to_string(), Value::from(start_date));
        }
        Ok(fields)
    }
}

/// Task store with an explicit availability state.
///
/// Clones share the handle; closing any clone makes all of them unavailable.
#[derive(Clone)]
pub struct TaskStore {
    handle: StoreHandle,
    closed: Arc<AtomicBool>,
}

impl TaskStore {
    /// Wrap an already opened document store.
    pub fn connected(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            handle: StoreHandle::Connected(store),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A store that rejects every operation.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            handle: StoreHandle::Unavailable {
                reason: reason.into(),
            },
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Open the store at `url`, degrading to `unavailable` on failure.
    pub async fn connect(url: &str) -> Self {
        match open_store(url).await {
            Ok(store) => {
                tracing::info!(
                    "Task store connected ({}, persistent: {})",
                    url,
                    store.is_persistent()
                );
                Self::connected(store)
            }
            Err(e) => {
                tracing::error!(
                    "Could not connect to task store {}: {}. Task operations will be unavailable.",
                    url,
                    e
                );
                Self::unavailable(e.to_string())
            }
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self.handle, StoreHandle::Connected(_)) && !self.closed.load(Ordering::SeqCst)
    }

    fn backend(&self) -> Result<&Arc<dyn DocumentStore>, StoreError> {
        match &self.handle {
            StoreHandle::Connected(_) if self.closed.load(Ordering::SeqCst) => {
                tracing::error!("Task store operation attempted after close");
                Err(StoreError::Unavailable("task store is closed".to_string()))
            }
            StoreHandle::Connected(store) => Ok(store),
            StoreHandle::Unavailable { reason } => {
                tracing::error!("Task store operation attempted without a connection");
                Err(StoreError::Unavailable(reason.clone()))
            }
        }
    }

    /// Create a task and return its id.
    pub async fn create(
        &self,
        description: &str,
        start_date: Option<&str>,
        status: Option<TaskStatus>,
    ) -> Result<String, StoreError> {
        let store = self.backend()?;
        let description = validate_description(description)?;

        let mut document = Document::new();
        document.insert("description".to_string(), Value::from(description));
        document.insert("created_at".to_string(), Value::from(now_string()));
        document.insert(
            "status".to_string(),
            Value::from(status.unwrap_or_default().as_str()),
        );
        if let Some(start_date) = start_date.map(str::trim).filter(|d| !d.is_empty()) {
            document.insert("start_date".to_string(), Value::from(start_date));
        }

        store.insert(document).await.map_err(|e| {
            tracing::error!("Failed to add task: {}", e);
            e
        })
    }

    /// All tasks in storage order, with invalid statuses reported as pending.
    pub async fn list(&self) -> Result<Vec<Task>, StoreError> {
        let store = self.backend()?;
        let documents = store.find_all().await.map_err(|e| {
            tracing::error!("Failed to list tasks: {}", e);
            e
        })?;
        Ok(documents
            .iter()
            .filter_map(|stored| Task::from_document(&stored.id, &stored.document))
            .collect())
    }

    /// Apply a partial update.
    ///
    /// Returns `Ok(true)` only if the task exists and at least one field changed.
    pub async fn update(&self, id: &str, patch: TaskPatch) -> Result<bool, StoreError> {
        let store = self.backend()?;
        let fields = patch.into_fields().map_err(|e| {
            tracing::warn!("Rejected update of task {}: {}", id, e);
            e
        })?;
        if fields.is_empty() {
            return Ok(false);
        }

        match store.set_fields(id, fields).await {
            Ok(outcome) => Ok(outcome.matched && outcome.modified),
            Err(e) => {
                tracing::error!("Failed to update task {}: {}", id, e);
                Err(e)
            }
        }
    }

    /// Delete a task. Returns `Ok(true)` only if it existed.
    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let store = self.backend()?;
        store.delete(id).await.map_err(|e| {
            tracing::error!("Failed to delete task {}: {}", id, e);
            e
        })
    }

    /// Close the underlying connection. The handle is unavailable afterwards.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let StoreHandle::Connected(store) = &self.handle {
            match store.close().await {
                Ok(()) => tracing::info!("Task store connection closed"),
                Err(e) => tracing::warn!("Failed to close task store: {}", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryDocumentStore;

    fn memory_store() -> (Arc<InMemoryDocumentStore>, TaskStore) {
        let backend = Arc::new(InMemoryDocumentStore::new());
        let store = TaskStore::connected(backend.clone());
        (backend, store)
    }

    fn patch(
        description: Option<&str>,
        start_date: Option<&str>,
        status: Option<&str>,
    ) -> TaskPatch {
        TaskPatch {
            description: description.map(str::to_string),
            start_date: start_date.map(str::to_string),
            status: status.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_create_defaults_to_pending() {
        let (_, store) = memory_store();
        let id = store.create("comprar pan", None, None).await.unwrap();

        let tasks = store.list().await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, id);
        assert_eq!(tasks[0].description, "comprar pan");
        assert_eq!(tasks[0].status, TaskStatus::Pending);
        assert_eq!(tasks[0].start_date, None);
        assert!(tasks[0].created_at.is_some());
    }

    #[tokio::test]
    async fn test_create_validates_description() {
        let (_, store) = memory_store();
        assert!(matches!(
            store.create("   ", None, None).await,
            Err(StoreError::Validation(_))
        ));
        let long = "x".repeat(MAX_DESCRIPTION_CHARS + 1);
        assert!(matches!(
            store.create(&long, None, None).await,
            Err(StoreError::Validation(_))
        ));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_status_rejects_whole_update() {
        let (backend, store) = memory_store();
        let id = store.create("original", None, None).await.unwrap();

        let result = store
            .update(&id, patch(Some("changed"), None, Some("done")))
            .await;
        assert!(matches!(result, Err(StoreError::InvalidStatus(ref s)) if s == "done"));

        let document = backend.find(&id).await.unwrap().unwrap();
        assert_eq!(document["description"], "original");
        assert_eq!(document["status"], "pending");
    }

    #[tokio::test]
    async fn test_update_applies_only_supplied_fields() {
        let (_, store) = memory_store();
        let id = store
            .create("informe", Some("2025-07-03"), Some(TaskStatus::InProgress))
            .await
            .unwrap();

        let changed = store
            .update(&id, patch(Some("Terminar informe"), Some("  "), None))
            .await
            .unwrap();
        assert!(changed);

        let task = store.list().await.unwrap().remove(0);
        assert_eq!(task.description, "Terminar informe");
        assert_eq!(task.start_date.as_deref(), Some("2025-07-03"));
        assert_eq!(task.status, TaskStatus::InProgress);
    }

    #[tokio::test]
    async fn test_update_without_change_or_match_is_false() {
        let (_, store) = memory_store();
        let id = store.create("same", None, None).await.unwrap();

        assert!(!store
            .update(&id, patch(None, None, Some("pending")))
            .await
            .unwrap());
        assert!(!store.update(&id, TaskPatch::default()).await.unwrap());

        let missing = crate::store::new_document_id();
        assert!(!store
            .update(&missing, patch(None, None, Some("completed")))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_list_repairs_without_mutating_storage() {
        let (backend, store) = memory_store();
        let mut document = Document::new();
        document.insert("description".to_string(), Value::from("legacy"));
        document.insert("status".to_string(), Value::from("pendiente"));
        document.insert("created_at".to_string(), Value::from("2024-01-02T03:04:05"));
        let id = backend.insert(document).await.unwrap();

        let first = store.list().await.unwrap();
        let second = store.list().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].status, TaskStatus::Pending);
        assert_eq!(
            first[0].created_at.as_deref(),
            Some("2024-01-02T03:04:05+00:00")
        );

        let stored = backend.find(&id).await.unwrap().unwrap();
        assert_eq!(stored["status"], "pendiente");
        assert_eq!(stored["created_at"], "2024-01-02T03:04:05");
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let (_, store) = memory_store();
        let id = store.create("borrar", None, None).await.unwrap();
        assert!(store.delete(&id).await.unwrap());
        assert!(!store.delete(&id).await.unwrap());
        assert!(matches!(
            store.delete("60c7b41b1d7d8f9c7b4c3e21").await,
            Err(StoreError::InvalidId(_))
        ));
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_every_operation() {
        let store = TaskStore::unavailable("connection refused");
        assert!(!store.is_available());
        assert!(matches!(
            store.create("x", None, None).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(matches!(store.list().await, Err(StoreError::Unavailable(_))));
        assert!(matches!(
            store.update("x", TaskPatch::default()).await,
            Err(StoreError::Unavailable(_))
        ));
        assert!(matches!(
            store.delete("x").await,
            Err(StoreError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_connect_degrades_on_bad_url() {
        let store = TaskStore::connect("mongodb://localhost:27017/").await;
        assert!(!store.is_available());

        let store = TaskStore::connect("memory://").await;
        assert!(store.is_available());
    }

    #[tokio::test]
    async fn test_close_makes_backend_unavailable() {
        let (_, store) = memory_store();
        let shared = store.clone();
        assert!(shared.is_available());

        store.close().await;
        assert!(!store.is_available());
        assert!(!shared.is_available());
        assert!(matches!(shared.list().await, Err(StoreError::Unavailable(_))));

        // closing twice is harmless
        shared.close().await;
    }
}
