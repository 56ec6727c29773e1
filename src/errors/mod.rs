//! # Error Types
//!
//! Error types for the taskplane backend using `thiserror`.
//!
//! Expected outcomes (bad credentials, stale refresh tokens, policy denials) are
//! ordinary error values, never panics; panics are reserved for programmer error.

/// Custom result type for taskplane operations
pub type Result<T> = std::result::Result<T, TaskplaneError>;

/// Main error type for the taskplane backend
#[derive(thiserror::Error, Debug)]
pub enum TaskplaneError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Database and storage errors
    #[error("Database error: {context}")]
    Database {
        #[source]
        source: sqlx::Error,
        context: String,
    },

    /// I/O errors with additional context
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {context}")]
    Serialization {
        #[source]
        source: serde_json::Error,
        context: String,
    },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String, field: Option<String> },

    /// Authentication failures: bad credentials, unknown/expired/revoked tokens.
    /// Deliberately coarse so callers cannot distinguish why a token failed.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    /// Refresh-token reuse detected; every session in the family has been revoked.
    /// Distinct from [`TaskplaneError::Unauthorized`] so the client knows to force a
    /// full re-login rather than retry.
    #[error("Session invalidated: {message}")]
    SessionInvalidated { message: String },

    /// Access-policy denials
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    /// Resource not found errors
    #[error("Resource not found: {resource_type} with ID '{id}'")]
    NotFound { resource_type: String, id: String },

    /// Resource conflict errors (e.g., email already registered)
    #[error("Resource conflict: {message}")]
    Conflict { message: String, resource_type: String },

    /// Internal server errors
    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl TaskplaneError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into() }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    /// Create a validation error with field information
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    /// Create an authentication failure
    pub fn unauthorized<S: Into<String>>(message: S) -> Self {
        Self::Unauthorized { message: message.into() }
    }

    /// Create a session-invalidated (reuse detected) failure
    pub fn session_invalidated<S: Into<String>>(message: S) -> Self {
        Self::SessionInvalidated { message: message.into() }
    }

    /// Create an access-policy denial
    pub fn forbidden<S: Into<String>>(message: S) -> Self {
        Self::Forbidden { message: message.into() }
    }

    /// Create a not found error
    pub fn not_found<R: Into<String>, I: Into<String>>(resource_type: R, id: I) -> Self {
        Self::NotFound { resource_type: resource_type.into(), id: id.into() }
    }

    /// Create a conflict error
    pub fn conflict<M: Into<String>, R: Into<String>>(message: M, resource_type: R) -> Self {
        Self::Conflict { message: message.into(), resource_type: resource_type.into() }
    }

    /// Create an internal server error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Get the HTTP status code that should be returned for this error
    pub fn status_code(&self) -> u16 {
        match self {
            TaskplaneError::Config { .. } => 500,
            TaskplaneError::Database { .. } => 500,
            TaskplaneError::Io { .. } => 500,
            TaskplaneError::Serialization { .. } => 400,
            TaskplaneError::Validation { .. } => 400,
            TaskplaneError::Unauthorized { .. } => 401,
            TaskplaneError::SessionInvalidated { .. } => 403,
            TaskplaneError::Forbidden { .. } => 403,
            TaskplaneError::NotFound { .. } => 404,
            TaskplaneError::Conflict { .. } => 409,
            TaskplaneError::Internal { .. } => 500,
        }
    }
}

// Error conversions for common external error types
impl From<sqlx::Error> for TaskplaneError {
    fn from(error: sqlx::Error) -> Self {
        Self::Database { source: error, context: "Database operation failed".to_string() }
    }
}

impl From<std::io::Error> for TaskplaneError {
    fn from(error: std::io::Error) -> Self {
        Self::Io { source: error, context: "I/O operation failed".to_string() }
    }
}

impl From<serde_json::Error> for TaskplaneError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization { source: error, context: "JSON serialization failed".to_string() }
    }
}

impl From<validator::ValidationErrors> for TaskplaneError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string())
                    })
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::validation(format!("Validation failed: {}", message))
    }
}
