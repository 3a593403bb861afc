//! Notification error types.

use thiserror::Error;

/// Reasons an envelope could not be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvelopeError {
    /// No event kind was set on the builder.
    #[error("Event kind is required")]
    MissingKind,

    /// No subject snapshot was set on the builder.
    #[error("Event subject is required")]
    MissingSubject,
}

/// Errors a handler may return from [`crate::EventHandler::handle`].
///
/// The dispatcher logs and counts these; they never reach the code that
/// published the event.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The handler could not complete its work.
    #[error("Handler failed: {0}")]
    Failed(String),

    /// Failed to serialize or deserialize event data.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl HandlerError {
    pub fn failed(reason: impl Into<String>) -> Self {
        HandlerError::Failed(reason.into())
    }
}

/// Result type for handler operations.
pub type Result<T> = std::result::Result<T, HandlerError>;
