//! Gemini `generateContent` client with JSON response constraints.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::LlmError;
use super::{truncate_for_log, LlmClient};
use crate::config::LlmConfig;

/// Gemini API client. One instance is shared by all requests.
pub struct GeminiClient {
    client: Client,
    config: LlmConfig,
}

impl GeminiClient {
    /// Create a client whose requests time out after `config.timeout`.
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::network_error(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, api_key: &str) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.config.api_base, self.config.model, api_key
        )
    }

    fn request_error(e: reqwest::Error) -> LlmError {
        // The URL carries the API key.
        let e = e.without_url();
        if e.is_timeout() {
            LlmError::timeout(format!("Request timeout: {}", e))
        } else if e.is_connect() {
            LlmError::network_error(format!("Connection failed: {}", e))
        } else {
            LlmError::network_error(format!("Request failed: {}", e))
        }
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn generate_json(
        &self,
        prompt: &str,
        response_schema: &Value,
    ) -> Result<String, LlmError> {
        let api_key = self
            .config
            .require_api_key()
            .map_err(|e| LlmError::not_configured(e.to_string()))?;

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: response_schema.clone(),
            },
        };

        tracing::debug!("Sending request to Gemini: model={}", self.config.model);

        let response = self
            .client
            .post(self.endpoint(api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(Self::request_error)?;

        let status = response.status();
        let body = response.text().await.map_err(Self::request_error)?;

        if !status.is_success() {
            tracing::error!(
                "Gemini returned HTTP {}: {}",
                status.as_u16(),
                truncate_for_log(&body, 500)
            );
            return Err(LlmError::from_status(status.as_u16(), body));
        }

        tracing::debug!("Gemini raw response: {}", truncate_for_log(&body, 2000));

        let parsed: GeminiResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::parse_error(format!("Failed to parse response: {}, body: {}", e, body))
        })?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.text)
            .ok_or_else(|| {
                LlmError::empty_response(format!("No candidate text in response: {}", body))
            })
    }
}

/// Gemini API request format.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    response_mime_type: String,
    response_schema: Value,
}

/// Gemini API response envelope. Every level is optional; a missing level
/// means there is no text to interpret.
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPartResponse>,
}

#[derive(Debug, Deserialize)]
struct GeminiPartResponse {
    #[serde(default)]
    text: Option<String>,
}
