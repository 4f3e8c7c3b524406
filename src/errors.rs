use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Request parameter that failed validation before a request was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationKind {
    Temperature,
    TopP,
    PresencePenalty,
    FrequencyPenalty,
    TooManyStopSequences,
    InvalidModel,
}

impl ValidationKind {
    fn describe(&self, value: &str) -> String {
        match self {
            ValidationKind::Temperature => {
                format!("Temperature must be between 0 and 2, got {}", value)
            }
            ValidationKind::TopP => format!("Top P must be between 0 and 1, got {}", value),
            ValidationKind::PresencePenalty => {
                format!("Presence penalty must be between -2 and 2, got {}", value)
            }
            ValidationKind::FrequencyPenalty => {
                format!("Frequency penalty must be between -2 and 2, got {}", value)
            }
            ValidationKind::TooManyStopSequences => {
                format!("Maximum 4 stop sequences allowed, got {}", value)
            }
            ValidationKind::InvalidModel => format!("Invalid model name: {}", value),
        }
    }
}

impl fmt::Display for ValidationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValidationKind::Temperature => "temperature",
            ValidationKind::TopP => "top_p",
            ValidationKind::PresencePenalty => "presence_penalty",
            ValidationKind::FrequencyPenalty => "frequency_penalty",
            ValidationKind::TooManyStopSequences => "stop",
            ValidationKind::InvalidModel => "model",
        };
        f.write_str(name)
    }
}

/// Every failure the client reports.
///
/// Values are built once, where the failure is first observed, and are handed
/// to the caller unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Model is overloaded: {0}")]
    ModelOverloaded(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Context length exceeded: {0}")]
    ContextLengthExceeded(String),

    #[error("Maximum tokens exceeded: {0}")]
    MaxTokensExceeded(String),

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Unexpected error: {0}")]
    Unexpected(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Stream was cancelled")]
    StreamCancelled,

    #[error("Stream connection lost: {0}")]
    StreamConnectionLost(String),

    #[error("Invalid stream data: {0}")]
    StreamInvalidData(String),

    #[error("Stream ended unexpectedly: {0}")]
    StreamUnexpectedEnd(String),

    #[error("{}", .kind.describe(.value))]
    InvalidValidation { kind: ValidationKind, value: String },
}

impl ClientError {
    /// Maps an HTTP status code and the server's message onto the error taxonomy.
    ///
    /// Total over any integer: codes that are not recognised become
    /// [`ClientError::Unexpected`].
    pub fn from_status(status: i64, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => ClientError::AuthenticationFailed(message),
            429 => ClientError::RateLimitExceeded(message),
            400 => {
                if message.contains("context length") {
                    ClientError::ContextLengthExceeded(message)
                } else if message.contains("maximum tokens") {
                    ClientError::MaxTokensExceeded(message)
                } else {
                    ClientError::InvalidRequest(message)
                }
            }
            404 => ClientError::ModelNotFound(message),
            500..=599 => ClientError::Server {
                status: status as u16,
                message,
            },
            _ => ClientError::Unexpected(format!(
                "Unexpected status code: {}. {}",
                status, message
            )),
        }
    }

    pub fn validation(kind: ValidationKind, value: impl ToString) -> Self {
        ClientError::InvalidValidation {
            kind,
            value: value.to_string(),
        }
    }

    /// HTTP status the error was classified from, when known.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::AuthenticationFailed(_) => Some(401),
            ClientError::RateLimitExceeded(_) => Some(429),
            ClientError::InvalidRequest(_)
            | ClientError::ContextLengthExceeded(_)
            | ClientError::MaxTokensExceeded(_) => Some(400),
            ClientError::ModelNotFound(_) => Some(404),
            ClientError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_stream_error(&self) -> bool {
        matches!(
            self,
            ClientError::StreamCancelled
                | ClientError::StreamConnectionLost(_)
                | ClientError::StreamInvalidData(_)
                | ClientError::StreamUnexpectedEnd(_)
        )
    }

    pub fn is_validation_error(&self) -> bool {
        matches!(self, ClientError::InvalidValidation { .. })
    }
}

/// Flattens a reqwest error and its source chain into one message.
fn describe_reqwest_error(err: &reqwest::Error) -> String {
    let error_kind = if err.is_timeout() {
        "timeout"
    } else if err.is_connect() {
        "connect"
    } else if err.is_request() {
        "request"
    } else if err.is_body() {
        "body"
    } else if err.is_decode() {
        "decode"
    } else {
        "unknown"
    };

    let mut message = match err.url() {
        Some(url) => format!("URL: {} | Error kind: {} | {}", url, error_kind, err),
        None => format!("Error kind: {} | {}", error_kind, err),
    };

    let mut source = err.source();
    while let Some(e) = source {
        message.push_str(&format!(" | Caused by: {}", e));
        source = e.source();
    }
    message
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            ClientError::InvalidUrl(describe_reqwest_error(&err))
        } else {
            ClientError::Network(describe_reqwest_error(&err))
        }
    }
}
