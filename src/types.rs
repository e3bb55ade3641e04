//! Types shared across pipeline stages.
//!
//! Every value here lives for one record's processing and is never shared
//! between records.

use bytes::Bytes;
use serde::Serialize;
use std::fmt;

use crate::error::ErrorKind;

/// A resolved `(bucket, key)` pair with the key already URL-decoded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ObjectReference {
    pub bucket: String,
    pub key: String,
}

impl ObjectReference {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ObjectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// Raw object bytes plus the content type the store declared for them.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    pub data: Bytes,
    pub content_type: Option<String>,
}

impl ImageBuffer {
    pub fn new(data: impl Into<Bytes>, content_type: Option<String>) -> Self {
        Self {
            data: data.into(),
            content_type,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for ImageBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageBuffer")
            .field("bytes", &self.data.len())
            .field("content_type", &self.content_type)
            .finish()
    }
}

/// Why an event was dropped before any store call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SkipReason {
    /// Event name does not start with `ObjectCreated`
    NotObjectCreated(String),
    /// Notification came from a bucket other than the source bucket
    ForeignBucket(String),
    /// Key extension is not in the image allow-list
    NotAnImage(String),
    /// Key already lives under the destination prefix of a shared bucket
    AlreadyWatermarked(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotObjectCreated(name) => write!(f, "event '{}' is not ObjectCreated", name),
            SkipReason::ForeignBucket(bucket) => write!(f, "bucket '{}' is not the source", bucket),
            SkipReason::NotAnImage(key) => write!(f, "'{}' is not an image file", key),
            SkipReason::AlreadyWatermarked(key) => write!(f, "'{}' is already watermarked", key),
        }
    }
}

/// Why the renderer handed back the original bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PassthroughReason {
    /// Recognized format that this build cannot decode
    UnsupportedFormat(String),
    /// Pixel count exceeds the configured limit
    TooLarge { width: u32, height: u32 },
    /// Image is too small for any of the mark to land on it
    TooSmall { width: u32, height: u32 },
    /// Anything else that went wrong after decoding started
    RenderFailed(String),
}

impl PassthroughReason {
    /// Short label for object metadata.
    pub fn as_label(&self) -> &'static str {
        match self {
            PassthroughReason::UnsupportedFormat(_) => "unsupported-format",
            PassthroughReason::TooLarge { .. } => "too-large",
            PassthroughReason::TooSmall { .. } => "too-small",
            PassthroughReason::RenderFailed(_) => "render-failed",
        }
    }
}

impl fmt::Display for PassthroughReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassthroughReason::UnsupportedFormat(format) => {
                write!(f, "unsupported image format: {}", format)
            }
            PassthroughReason::TooLarge { width, height } => {
                write!(f, "image {}x{} exceeds pixel limit", width, height)
            }
            PassthroughReason::TooSmall { width, height } => {
                write!(f, "image {}x{} is too small for the watermark", width, height)
            }
            PassthroughReason::RenderFailed(msg) => write!(f, "render failed: {}", msg),
        }
    }
}

/// Whether the published object carries the mark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum WatermarkStatus {
    Applied,
    Skipped(PassthroughReason),
}

impl WatermarkStatus {
    /// Value for the `watermark-status` metadata entry.
    pub fn metadata_value(&self) -> String {
        match self {
            WatermarkStatus::Applied => "applied".to_string(),
            WatermarkStatus::Skipped(reason) => format!("skipped:{}", reason.as_label()),
        }
    }
}

/// What happened to one storage change event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Disposition {
    Published {
        destination_key: String,
        watermark: WatermarkStatus,
    },
    Skipped(SkipReason),
    Failed(ErrorKind),
}

/// Result of processing one storage change event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessingOutcome {
    /// Decoded source reference, when the event got far enough to have one
    pub source: Option<ObjectReference>,
    pub disposition: Disposition,
}

impl ProcessingOutcome {
    pub fn published(
        source: ObjectReference,
        destination_key: String,
        watermark: WatermarkStatus,
    ) -> Self {
        Self {
            source: Some(source),
            disposition: Disposition::Published {
                destination_key,
                watermark,
            },
        }
    }

    pub fn skipped(source: Option<ObjectReference>, reason: SkipReason) -> Self {
        Self {
            source,
            disposition: Disposition::Skipped(reason),
        }
    }

    pub fn failed(source: Option<ObjectReference>, kind: ErrorKind) -> Self {
        Self {
            source,
            disposition: Disposition::Failed(kind),
        }
    }

    /// Skips count as success: nothing needed doing.
    pub fn success(&self) -> bool {
        !matches!(self.disposition, Disposition::Failed(_))
    }

    pub fn destination_key(&self) -> Option<&str> {
        match &self.disposition {
            Disposition::Published {
                destination_key, ..
            } => Some(destination_key),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<ErrorKind> {
        match self.disposition {
            Disposition::Failed(kind) => Some(kind),
            _ => None,
        }
    }
}
