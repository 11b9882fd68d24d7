//! Natural-language command interpretation.
//!
//! `CommandInterpreter::interpret` never fails: every problem on the way from
//! user text to a typed `Command` (missing API key, transport failure, malformed
//! model output, schema violation) becomes an `unknown` command whose message
//! tells the user what went wrong.

mod command;
mod parse;
mod prompt;

pub use command::{Action, Command};
pub use parse::{extract_json_payload, parse_command, sanitize_key};
pub use prompt::{build_prompt, response_schema};

use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::llm::{truncate_for_log, LlmClient, LlmError, LlmErrorKind};

/// Why an interpretation failed.
#[derive(Debug, Error)]
pub enum InterpretError {
    #[error("LLM request failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Invalid JSON from model: {0}")]
    InvalidJson(String),

    #[error("Model output has no action")]
    MissingAction,

    #[error("Invalid action '{0}'")]
    InvalidAction(String),

    #[error("Command does not match schema: {0}")]
    Schema(String),
}

impl InterpretError {
    /// Message shown to the user in the `unknown` command.
    pub fn user_message(&self) -> String {
        match self {
            InterpretError::Llm(err) => match (err.kind, err.status_code) {
                (LlmErrorKind::NotConfigured, _) => {
                    "Configuration error: API key not found.".to_string()
                }
                (LlmErrorKind::EmptyResponse, _) => {
                    "I could not interpret your command. Please try again.".to_string()
                }
                (_, Some(code)) => {
                    format!("Server error while processing your command: {}.", code)
                }
                (LlmErrorKind::Timeout, None) => {
                    "The language model did not respond in time. Please try again.".to_string()
                }
                (LlmErrorKind::NetworkError, None) => {
                    "Could not reach the language model service. Please try again.".to_string()
                }
                _ => "An unexpected error occurred while processing your command.".to_string(),
            },
            InterpretError::InvalidJson(_) => {
                "The language model returned invalid JSON. Please try again.".to_string()
            }
            InterpretError::MissingAction => {
                "I could not determine the action. Please be more specific.".to_string()
            }
            InterpretError::InvalidAction(value) => {
                format!("The action '{}' is not valid. Please be more specific.", value)
            }
            InterpretError::Schema(_) => {
                "The language model returned a command in an unexpected format. Please try again."
                    .to_string()
            }
        }
    }
}

/// Turns free text into a `Command` using the LLM endpoint.
pub struct CommandInterpreter {
    client: Arc<dyn LlmClient>,
    schema: Value,
}

impl CommandInterpreter {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            schema: response_schema(),
        }
    }

    /// Interpret `user_text`, falling back to an `unknown` command on any failure.
    pub async fn interpret(&self, user_text: &str) -> Command {
        match self.try_interpret(user_text).await {
            Ok(command) => {
                tracing::info!("Interpreted command as '{}'", command.action);
                command
            }
            Err(e) => {
                match &e {
                    InterpretError::Llm(err) if err.kind.is_transport() => {
                        tracing::error!("Error calling the LLM: {}", err)
                    }
                    _ => tracing::warn!("Falling back to 'unknown': {}", e),
                }
                Command::unknown(e.user_message())
            }
        }
    }

    /// The interpretation pipeline without the fallback.
    pub async fn try_interpret(&self, user_text: &str) -> Result<Command, InterpretError> {
        let prompt = build_prompt(user_text);
        tracing::debug!("Interpretation prompt ends with: {:?}", user_text);

        let raw = self.client.generate_json(&prompt, &self.schema).await?;
        tracing::debug!("Model output: {}", truncate_for_log(&raw, 2000));

        parse_command(&raw)
    }
}
