//! Applies an interpreted `Command` to the task store.
//!
//! Each action checks its required fields before touching the store, and every
//! outcome (including store failures) becomes an `ActionResult` for the user.

use serde::{Deserialize, Serialize};

use crate::interpreter::{Action, Command};
use crate::store::StoreError;
use crate::task::{TaskPatch, TaskStore};

/// Outcome category shown to the user.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Success,
    Error,
    Info,
}

/// Result of applying one command.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionResult {
    pub status: ResultStatus,
    pub message: String,
    /// Id of the task created by a successful `create`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

impl ActionResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Success,
            message: message.into(),
            task_id: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Error,
            message: message.into(),
            task_id: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Info,
            message: message.into(),
            task_id: None,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Apply `command` to `store`.
pub async fn dispatch(command: &Command, store: &TaskStore) -> ActionResult {
    if !store.is_available() {
        return ActionResult::error("Database error: connection not established.");
    }

    match command.action {
        Action::Create => create(command, store).await,
        Action::Read => ActionResult::success("Listing all tasks."),
        Action::Update => update(command, store).await,
        Action::Delete => delete(command, store).await,
        Action::Unknown => ActionResult::info(
            non_blank(&command.message)
                .unwrap_or("I could not understand your command. Please be more specific."),
        ),
    }
}

async fn create(command: &Command, store: &TaskStore) -> ActionResult {
    let Some(description) = non_blank(&command.description) else {
        return ActionResult::error("To create a task I need a description.");
    };

    match store
        .create(description, command.start_date.as_deref(), command.status)
        .await
    {
        Ok(id) => ActionResult {
            task_id: Some(id.clone()),
            ..ActionResult::success(format!("Task '{}' created with ID: {}", description, id))
        },
        Err(e) => ActionResult::error(format!("Could not create task '{}': {}", description, e)),
    }
}

async fn update(command: &Command, store: &TaskStore) -> ActionResult {
    let Some(task_id) = non_blank(&command.task_id) else {
        return ActionResult::error("To update a task I need the task ID.");
    };

    let patch = TaskPatch {
        description: command.description.clone(),
        start_date: command.start_date.clone(),
        status: command.status.map(|status| status.as_str().to_string()),
    };
    if patch.is_empty() {
        return ActionResult::error(
            "To update a task I need at least a description, a date or a status.",
        );
    }

    match store.update(task_id, patch).await {
        Ok(true) => ActionResult::success(format!("Task {} updated successfully.", task_id)),
        Ok(false) | Err(StoreError::InvalidId(_)) | Err(StoreError::InvalidStatus(_)) => {
            ActionResult::error(format!("Could not update task {}. Is the ID correct?", task_id))
        }
        Err(e) => ActionResult::error(format!("Could not update task {}: {}", task_id, e)),
    }
}

async fn delete(command: &Command, store: &TaskStore) -> ActionResult {
    let Some(task_id) = non_blank(&command.task_id) else {
        return ActionResult::error("To delete a task I need the task ID.");
    };

    match store.delete(task_id).await {
        Ok(true) => ActionResult::success(format!("Task {} deleted successfully.", task_id)),
        Ok(false) | Err(StoreError::InvalidId(_)) => ActionResult::error(format!(
            "Could not delete task {}. Is the ID correct?",
            task_id
        )),
        Err(e) => ActionResult::error(format!("Could not delete task {}: {}", task_id, e)),
    }
}
