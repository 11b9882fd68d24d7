//! LLM error types.
//!
//! Every failure of the interpretation call is classified so the interpreter can
//! pick a user-facing message. Nothing here is retried.

/// Error from LLM API calls.
#[derive(Debug)]
pub struct LlmError {
    /// The kind of error
    pub kind: LlmErrorKind,
    /// HTTP status code, if applicable
    pub status_code: Option<u16>,
    /// Error message
    pub message: String,
}

impl LlmError {
    /// Create an error for a client that cannot make requests (no API key).
    pub fn not_configured(message: String) -> Self {
        Self {
            kind: LlmErrorKind::NotConfigured,
            status_code: None,
            message,
        }
    }

    /// Create an error from a non-success HTTP status.
    pub fn from_status(status_code: u16, message: String) -> Self {
        Self {
            kind: classify_http_status(status_code),
            status_code: Some(status_code),
            message,
        }
    }

    /// Create a network error.
    pub fn network_error(message: String) -> Self {
        Self {
            kind: LlmErrorKind::NetworkError,
            status_code: None,
            message,
        }
    }

    /// Create a timeout error.
    pub fn timeout(message: String) -> Self {
        Self {
            kind: LlmErrorKind::Timeout,
            status_code: None,
            message,
        }
    }

    /// Create a parse error.
    pub fn parse_error(message: String) -> Self {
        Self {
            kind: LlmErrorKind::ParseError,
            status_code: None,
            message,
        }
    }

    /// Create an error for a response envelope without generated text.
    pub fn empty_response(message: String) -> Self {
        Self {
            kind: LlmErrorKind::EmptyResponse,
            status_code: None,
            message,
        }
    }
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "{} (HTTP {}): {}", self.kind, code, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for LlmError {}

/// Classification of LLM errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// No API key configured; no request was sent
    NotConfigured,
    /// Rate limited (429)
    RateLimited,
    /// Server error (5xx)
    ServerError,
    /// Client error (400, 401, 403, 404)
    ClientError,
    /// Connection failed
    NetworkError,
    /// Request did not complete within the configured timeout
    Timeout,
    /// Response body was not the expected envelope
    ParseError,
    /// Envelope had no candidate text
    EmptyResponse,
}

impl LlmErrorKind {
    /// Whether the failure happened at the transport level (status, connection, timeout).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            LlmErrorKind::RateLimited
                | LlmErrorKind::ServerError
                | LlmErrorKind::ClientError
                | LlmErrorKind::NetworkError
                | LlmErrorKind::Timeout
        )
    }
}

impl std::fmt::Display for LlmErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmErrorKind::NotConfigured => write!(f, "Not configured"),
            LlmErrorKind::RateLimited => write!(f, "Rate limited"),
            LlmErrorKind::ServerError => write!(f, "Server error"),
            LlmErrorKind::ClientError => write!(f, "Client error"),
            LlmErrorKind::NetworkError => write!(f, "Network error"),
            LlmErrorKind::Timeout => write!(f, "Timeout"),
            LlmErrorKind::ParseError => write!(f, "Parse error"),
            LlmErrorKind::EmptyResponse => write!(f, "Empty response"),
        }
    }
}

/// Parse HTTP status code into error kind.
pub fn classify_http_status(status: u16) -> LlmErrorKind {
    match status {
        429 => LlmErrorKind::RateLimited,
        400..=499 => LlmErrorKind::ClientError,
        _ => LlmErrorKind::ServerError,
    }
}
