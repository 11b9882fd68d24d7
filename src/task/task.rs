//! Task record and status types.
//!
//! # Invariants
//! - A `Task` handed to callers always carries one of the four `TaskStatus` values,
//!   even when the stored document holds something else.
//! - `created_at` is rendered as RFC 3339 in UTC whenever the stored value can be parsed.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::store::Document;

/// Maximum number of characters in a task description.
pub const MAX_DESCRIPTION_CHARS: usize = 200;

/// Task status enumeration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Not started yet
    #[default]
    Pending,
    /// Done
    Completed,
    /// Being worked on
    InProgress,
    /// Abandoned
    Cancelled,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Pending,
        TaskStatus::Completed,
        TaskStatus::InProgress,
        TaskStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// Parse the exact wire form. Anything else is `None`.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task as returned by `GET /tasks`. The id goes on the wire as `_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Task {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub start_date: Option<String>,
    pub status: TaskStatus,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Current timestamp in the canonical stored form.
pub fn now_string() -> String {
    Utc::now().to_rfc3339()
}

impl Task {
    /// Build a read-time view of a stored document.
    ///
    /// Repairs the status and timestamp without touching the document itself.
    /// Returns `None` when the document has no usable description.
    pub fn from_document(id: &str, document: &Document) -> Option<Task> {
        let description = match document.get("description") {
            Some(Value::String(description)) => description.clone(),
            other => {
                tracing::warn!(
                    "Task {} has no usable description ({:?}); skipping",
                    id,
                    other
                );
                return None;
            }
        };

        let status = match document.get("status") {
            Some(Value::String(raw)) => TaskStatus::parse(raw),
            _ => None,
        }
        .unwrap_or_else(|| {
            tracing::warn!(
                "Task {} has invalid status {:?}; reporting it as 'pending'",
                id,
                document.get("status")
            );
            TaskStatus::Pending
        });

        let start_date = match document.get("start_date") {
            Some(Value::String(date)) if !date.trim().is_empty() => Some(date.clone()),
            _ => None,
        };

        Some(Task {
            id: id.to_string(),
            description,
            start_date,
            status,
            created_at: document.get("created_at").and_then(normalize_timestamp),
        })
    }
}

/// Normalize a stored timestamp to RFC 3339 (UTC).
///
/// Accepts RFC 3339 strings, naive ISO strings (taken as UTC), and integer epoch
/// values in seconds or milliseconds. Unparsable strings are passed through.
pub fn normalize_timestamp(value: &Value) -> Option<String> {
    match value {
        Value::String(raw) => {
            let raw = raw.trim();
            if raw.is_empty() {
                return None;
            }
            if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
                return Some(parsed.with_timezone(&Utc).to_rfc3339());
            }
            for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
                if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                    return Some(naive.and_utc().to_rfc3339());
                }
            }
            tracing::warn!("Unrecognized timestamp format '{}'", raw);
            Some(raw.to_string())
        }
        Value::Number(number) => {
            let epoch = number.as_i64()?;
            // Anything past year 5138 in seconds is assumed to be milliseconds.
            let parsed = if epoch.abs() >= 100_000_000_000 {
                DateTime::from_timestamp_millis(epoch)
            } else {
                DateTime::from_timestamp(epoch, 0)
            };
            parsed.map(|dt| dt.to_rfc3339())
        }
        _ => None,
    }
}
