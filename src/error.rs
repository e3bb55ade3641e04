// Error types module

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Coarse error category, reported per record and used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    MalformedMessage,
    ObjectNotFound,
    AccessDenied,
    TransientStoreError,
    DecodeError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MalformedMessage => "MalformedMessage",
            ErrorKind::ObjectNotFound => "ObjectNotFound",
            ErrorKind::AccessDenied => "AccessDenied",
            ErrorKind::TransientStoreError => "TransientStoreError",
            ErrorKind::DecodeError => "DecodeError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Centralized error type for the pipeline
///
/// Every variant propagates to the invocation framework. Renderer faults that
/// are not corruption never reach this type; they degrade to a passthrough.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// Queue body is not parsable, or its records do not have the notification shape
    #[error("Malformed queue message: {0}")]
    MalformedMessage(String),

    /// Store has no object under this key
    #[error("Object not found: {bucket}/{key}")]
    ObjectNotFound { bucket: String, key: String },

    /// Store rejected a read or write
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Network failure or 5xx from the store; the framework may redeliver
    #[error("Transient store error: {0}")]
    TransientStore(String),

    /// Image bytes are corrupt
    #[error("Image decode failed: {0}")]
    Decode(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::MalformedMessage(_) => ErrorKind::MalformedMessage,
            PipelineError::ObjectNotFound { .. } => ErrorKind::ObjectNotFound,
            PipelineError::AccessDenied(_) => ErrorKind::AccessDenied,
            PipelineError::TransientStore(_) => ErrorKind::TransientStoreError,
            PipelineError::Decode(_) => ErrorKind::DecodeError,
        }
    }

    /// Whether redelivery has a chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PipelineError::TransientStore(_))
    }
}
