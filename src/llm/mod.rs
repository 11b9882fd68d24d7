//! LLM client module.
//!
//! A single hosted endpoint (Gemini `generateContent`) is used to turn a prompt
//! into JSON constrained by a response schema. The trait exists so the command
//! interpreter can be exercised without the network.

mod error;
mod gemini;

pub use error::{classify_http_status, LlmError, LlmErrorKind};
pub use gemini::GeminiClient;

use async_trait::async_trait;

/// Trait for LLM clients.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send one user prompt and return the generated text of the first candidate.
    ///
    /// `response_schema` constrains the model to JSON output of that shape; the
    /// returned text must still be treated as untrusted.
    async fn generate_json(
        &self,
        prompt: &str,
        response_schema: &serde_json::Value,
    ) -> Result<String, LlmError>;
}

/// Shorten text for log output without splitting a character.
pub(crate) fn truncate_for_log(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
