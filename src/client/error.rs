//! Error types for Power BI client operations

use compact_str::CompactString;
use thiserror::Error;

use crate::shape::ShapeError;

/// Structured error types for Power BI client operations
#[derive(Debug, Error)]
pub enum ClientError {
    /// No credential could be resolved, or the token exchange was rejected
    #[error("Authentication failed: {message}")]
    Authentication { message: CompactString },

    /// The request was rejected locally and never sent
    #[error("Invalid {entity}: {source}")]
    Validation {
        entity: &'static str,
        #[source]
        source: ShapeError,
    },

    /// Connection failure or timeout, after retries were exhausted
    #[error("{operation}: request failed: {source}")]
    Transport {
        operation: CompactString,
        #[source]
        source: reqwest::Error,
    },

    /// Power BI API returned a non-success status
    #[error("{operation}: HTTP {status}: {message}")]
    Api {
        operation: CompactString,
        status: u16,
        message: CompactString,
    },

    /// JSON parsing error with endpoint context
    #[error("Failed to parse JSON response from {endpoint}: {message}")]
    JsonParse {
        endpoint: String,
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration field validation failed
    #[error("Invalid {field}: {message}")]
    ConfigValidation { field: String, message: String },

    /// The blocking client could not start its runtime
    #[error("Failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),
}

impl ClientError {
    /// Create an authentication error
    pub fn authentication(message: impl Into<CompactString>) -> Self {
        Self::Authentication { message: message.into() }
    }

    /// Create a validation error for a payload that failed shaping
    pub fn validation(entity: &'static str, source: ShapeError) -> Self {
        Self::Validation { entity, source }
    }

    /// Create a transport error attributed to an operation
    pub fn transport(operation: impl Into<CompactString>, source: reqwest::Error) -> Self {
        Self::Transport { operation: operation.into(), source }
    }

    /// Create a Power BI API error
    pub fn api(
        operation: impl Into<CompactString>,
        status: u16,
        message: impl Into<CompactString>,
    ) -> Self {
        Self::Api {
            operation: operation.into(),
            status,
            message: message.into(),
        }
    }

    /// Create a JSON parsing error with endpoint context
    pub fn json_parse(endpoint: impl Into<String>, source: serde_json::Error) -> Self {
        Self::JsonParse {
            endpoint: endpoint.into(),
            message: source.to_string(),
            source,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a configuration field validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation { field: field.into(), message: message.into() }
    }

    /// HTTP status of an API error
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if the addressed resource does not exist
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Transport { source, .. } => {
                source.is_timeout() || source.is_connect() || source.is_request()
            },
            ClientError::Api { status, .. } => *status == 429,
            _ => false,
        }
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
