// Object publisher: writes render results to the destination bucket

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeMap;

use crate::config::Config;
use crate::constants::{
    DESTINATION_PREFIX, FALLBACK_CONTENT_TYPE, META_ORIGINAL_KEY, META_STATUS, META_TIMESTAMP,
    META_WATERMARKED_BY, WATERMARK_LABEL,
};
use crate::store::{ObjectStore, ObjectWrite, StoreError};
use crate::types::{ObjectReference, WatermarkStatus};
use crate::watermark::RenderOutcome;

/// Destination key for a source key. Deterministic, so reprocessing overwrites.
pub fn destination_key(source_key: &str) -> String {
    format!("{}{}", DESTINATION_PREFIX, source_key)
}

/// MIME type implied by a key's extension, for the formats the filter admits.
pub fn content_type_for_key(key: &str) -> Option<&'static str> {
    let (_, ext) = key.rsplit_once('.')?;
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "webp" => Some("image/webp"),
        "tiff" | "tif" => Some("image/tiff"),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct ObjectPublisher {
    destination_bucket: String,
}

impl ObjectPublisher {
    pub fn new(destination_bucket: impl Into<String>) -> Self {
        Self {
            destination_bucket: destination_bucket.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.destination_bucket.clone())
    }

    pub fn destination_bucket(&self) -> &str {
        &self.destination_bucket
    }

    /// Build the write for a render result without touching the store.
    pub fn build_write(
        &self,
        source: &ObjectReference,
        outcome: &RenderOutcome,
        now: DateTime<Utc>,
    ) -> ObjectWrite {
        let status = outcome.status();
        let buffer = outcome.buffer();

        // Transformed buffers always carry the output type
        let content_type = buffer
            .content_type
            .as_deref()
            .filter(|ct| !ct.trim().is_empty())
            .or_else(|| content_type_for_key(&source.key))
            .unwrap_or(FALLBACK_CONTENT_TYPE)
            .to_string();

        ObjectWrite {
            bucket: self.destination_bucket.clone(),
            key: destination_key(&source.key),
            body: Bytes::clone(&buffer.data),
            content_type,
            metadata: metadata(source, &status, now),
        }
    }

    /// Publish a render result. Returns the destination key.
    pub async fn publish(
        &self,
        store: &dyn ObjectStore,
        source: &ObjectReference,
        outcome: &RenderOutcome,
    ) -> Result<String, StoreError> {
        let write = self.build_write(source, outcome, Utc::now());
        let key = write.key.clone();

        tracing::debug!(
            bucket = %write.bucket,
            key = %key,
            content_type = %write.content_type,
            bytes = write.body.len(),
            "Publishing object"
        );

        store.put_object(write).await?;
        Ok(key)
    }
}

/// S3 user metadata is US-ASCII only, so the original key is percent-encoded.
fn metadata(
    source: &ObjectReference,
    status: &WatermarkStatus,
    now: DateTime<Utc>,
) -> BTreeMap<String, String> {
    BTreeMap::from([
        (META_WATERMARKED_BY.to_string(), WATERMARK_LABEL.to_string()),
        (
            META_ORIGINAL_KEY.to_string(),
            urlencoding::encode(&source.key).into_owned(),
        ),
        (
            META_TIMESTAMP.to_string(),
            now.to_rfc3339_opts(SecondsFormat::Millis, true),
        ),
        (META_STATUS.to_string(), status.metadata_value()),
    ])
}
