//! Source adapter error types
//!
//! Error definitions with transient/permanent classification. Transient
//! failures are not retried within a pass; the next scheduled run retries
//! naturally.

use thiserror::Error;

/// Error that can occur during source adapter operations.
#[derive(Debug, Error)]
pub enum ConnectorError {
    // Connection errors (usually transient)
    /// Failed to establish connection to the source system.
    #[error("connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Connection timed out.
    #[error("connection timeout after {timeout_secs} seconds")]
    ConnectionTimeout { timeout_secs: u64 },

    // Authentication errors (permanent)
    /// Invalid credentials provided.
    #[error("authentication failed: invalid credentials")]
    AuthenticationFailed,

    /// Insufficient permissions for the operation.
    #[error("authorization failed: insufficient permissions for {operation}")]
    AuthorizationFailed { operation: String },

    // Configuration errors (permanent)
    /// Adapter configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    // Data errors
    /// A payload from the source could not be mapped into a domain record.
    ///
    /// Adapters drop individual unmappable records with a warning; this
    /// variant surfaces only when an entire payload is malformed.
    #[error("mapping failed: {message}")]
    MappingFailed { message: String },

    /// Serialization or deserialization failed.
    #[error("serialization error: {message}")]
    Serialization { message: String },

    // Operation errors
    /// A fetch or delete operation failed in the source system.
    #[error("operation failed: {message}")]
    OperationFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Object not found in the source system.
    #[error("object not found: {identifier}")]
    ObjectNotFound { identifier: String },
}

impl ConnectorError {
    /// Check if this error is transient and the next pass may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ConnectorError::ConnectionFailed { .. } | ConnectorError::ConnectionTimeout { .. }
        )
    }

    /// Check if this error is permanent and retry won't help.
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            ConnectorError::ConnectionFailed { .. } => "CONNECTION_FAILED",
            ConnectorError::ConnectionTimeout { .. } => "CONNECTION_TIMEOUT",
            ConnectorError::AuthenticationFailed => "AUTH_FAILED",
            ConnectorError::AuthorizationFailed { .. } => "AUTHORIZATION_FAILED",
            ConnectorError::InvalidConfiguration { .. } => "INVALID_CONFIG",
            ConnectorError::MappingFailed { .. } => "MAPPING_FAILED",
            ConnectorError::Serialization { .. } => "SERIALIZATION_ERROR",
            ConnectorError::OperationFailed { .. } => "OPERATION_FAILED",
            ConnectorError::ObjectNotFound { .. } => "OBJECT_NOT_FOUND",
        }
    }

    // Convenience constructors

    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        ConnectorError::ConnectionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection failed error with source.
    pub fn connection_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::ConnectionFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an operation failed error.
    pub fn operation_failed(message: impl Into<String>) -> Self {
        ConnectorError::OperationFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create an operation failed error with source.
    pub fn operation_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::OperationFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        ConnectorError::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create a mapping failed error.
    pub fn mapping_failed(message: impl Into<String>) -> Self {
        ConnectorError::MappingFailed {
            message: message.into(),
        }
    }
}

/// Result type for source adapter operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;
