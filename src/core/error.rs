use thiserror::Error;

/// Errors surfaced by queue operations and the layers around them.
///
/// Lock-loss situations (completing, abandoning or renewing a message whose
/// lock is gone) are not errors; those calls succeed without doing anything.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Required configuration or connection parameters are missing or invalid.
    #[error("[{correlation_id}] {code}: {message}")]
    Config {
        correlation_id: String,
        code: &'static str,
        message: String,
    },

    /// The queue is not in a state that allows the operation.
    #[error("[{correlation_id}] {code}: {message}")]
    InvalidState {
        correlation_id: String,
        code: &'static str,
        message: String,
    },

    /// The queue implementation does not offer this operation.
    #[error("[{correlation_id}] operation {operation} is not supported")]
    NotSupported {
        correlation_id: String,
        operation: &'static str,
    },

    /// A payload could not be encoded to or decoded from JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl QueueError {
    pub fn config(
        correlation_id: impl Into<String>,
        code: &'static str,
        message: impl Into<String>,
    ) -> Self {
        QueueError::Config {
            correlation_id: correlation_id.into(),
            code,
            message: message.into(),
        }
    }

    pub fn invalid_state(
        correlation_id: impl Into<String>,
        code: &'static str,
        message: impl Into<String>,
    ) -> Self {
        QueueError::InvalidState {
            correlation_id: correlation_id.into(),
            code,
            message: message.into(),
        }
    }

    pub fn not_supported(correlation_id: impl Into<String>, operation: &'static str) -> Self {
        QueueError::NotSupported {
            correlation_id: correlation_id.into(),
            operation,
        }
    }

    /// Stable machine-readable code for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            QueueError::Config { code, .. } => code,
            QueueError::InvalidState { code, .. } => code,
            QueueError::NotSupported { .. } => "NOT_SUPPORTED",
            QueueError::Serialization(_) => "SERIALIZATION",
        }
    }
}
