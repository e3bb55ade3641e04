//! Object store abstraction.
//!
//! The pipeline talks to storage only through [`ObjectStore`]. Production
//! uses [`S3ObjectStore`]; tests and local replays use [`InMemoryObjectStore`].

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::error::PipelineError;
use crate::types::{ImageBuffer, ObjectReference};

pub mod memory;
pub mod s3;

pub use memory::InMemoryObjectStore;
pub use s3::S3ObjectStore;

/// Errors returned by store backends
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("No such object: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Store unavailable: {0}")]
    Transient(String),
}

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { bucket, key } => PipelineError::ObjectNotFound { bucket, key },
            StoreError::AccessDenied(msg) => PipelineError::AccessDenied(msg),
            StoreError::Transient(msg) => PipelineError::TransientStore(msg),
        }
    }
}

/// A single object write: one atomic put, replacing whatever was there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectWrite {
    pub bucket: String,
    pub key: String,
    pub body: Bytes,
    pub content_type: String,
    pub metadata: BTreeMap<String, String>,
}

/// Key-addressed blob storage
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read the entire object into memory.
    async fn get_object(&self, object: &ObjectReference) -> Result<ImageBuffer, StoreError>;

    /// Write an object, overwriting any existing object under the same key.
    async fn put_object(&self, write: ObjectWrite) -> Result<(), StoreError>;
}

/// Classify a store failure from its S3 error code and HTTP status.
///
/// The code wins when both are present. Unknown failures are treated as
/// transient so the invocation framework gets a chance to redeliver.
pub fn classify_s3_error(
    object: &ObjectReference,
    code: Option<&str>,
    status: Option<u16>,
    message: impl Into<String>,
) -> StoreError {
    let message = message.into();

    if let Some(code) = code {
        match code {
            "NoSuchKey" | "NoSuchBucket" | "NoSuchVersion" | "NotFound" => {
                return StoreError::NotFound {
                    bucket: object.bucket.clone(),
                    key: object.key.clone(),
                }
            }
            "AccessDenied"
            | "InvalidAccessKeyId"
            | "SignatureDoesNotMatch"
            | "AccountProblem"
            | "InvalidSecurity"
            | "AllAccessDisabled"
            | "Forbidden" => return StoreError::AccessDenied(message),
            "SlowDown" | "ServiceUnavailable" | "InternalError" | "RequestTimeout" => {
                return StoreError::Transient(message)
            }
            _ => {}
        }
    }

    match status {
        Some(404) => StoreError::NotFound {
            bucket: object.bucket.clone(),
            key: object.key.clone(),
        },
        Some(401) | Some(403) => StoreError::AccessDenied(message),
        _ => StoreError::Transient(message),
    }
}
