//! Error types for the Graph adapters.

use thiserror::Error;

use rejoin_connector::error::ConnectorError;

/// Result type alias using `GraphError`.
pub type GraphResult<T> = Result<T, GraphError>;

/// Errors that can occur when talking to Microsoft Graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// Configuration validation error.
    #[error("configuration error: {0}")]
    Config(String),

    /// `OAuth2` token acquisition error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Graph API error response.
    #[error("Graph API error: {code} - {message}")]
    Api { code: String, message: String },

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Retry budget exhausted while being throttled.
    #[error("maximum retries ({attempts}) exceeded")]
    MaxRetriesExceeded { attempts: u32 },
}

impl From<GraphError> for ConnectorError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::Config(message) => ConnectorError::invalid_configuration(message),
            GraphError::Auth(_) => ConnectorError::AuthenticationFailed,
            GraphError::Api { code, message } => {
                if code.contains("NotFound") {
                    ConnectorError::ObjectNotFound {
                        identifier: message,
                    }
                } else if code.contains("Authorization") {
                    ConnectorError::AuthorizationFailed { operation: message }
                } else {
                    ConnectorError::operation_failed(format!("{code}: {message}"))
                }
            }
            GraphError::Http(e) => {
                if e.is_timeout() {
                    ConnectorError::ConnectionTimeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    ConnectorError::connection_failed_with_source("Graph request failed", e)
                } else {
                    ConnectorError::operation_failed_with_source("Graph request failed", e)
                }
            }
            GraphError::Json(e) => ConnectorError::Serialization {
                message: e.to_string(),
            },
            GraphError::MaxRetriesExceeded { attempts } => ConnectorError::operation_failed(
                format!("Graph retry budget exhausted after {attempts} attempts"),
            ),
        }
    }
}
