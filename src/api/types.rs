//! API request and response types.

use serde::{Deserialize, Serialize};

use crate::dispatch::ActionResult;
use crate::interpreter::Command;

/// Body of `POST /command`.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandRequest {
    /// Free-text instruction from the user
    pub command: String,
}

/// Response of `POST /command`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResponse {
    /// What the language model understood
    pub llm_interpretation: Command,

    /// What happened when the command was applied
    pub action_result: ActionResult,
}

/// Error body returned with 4xx/5xx statuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WelcomeResponse {
    pub message: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// `connected` or `unavailable`
    pub store: String,
}
