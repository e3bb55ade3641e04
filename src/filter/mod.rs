// Source filter: decides which storage change events the pipeline acts on

use crate::config::Config;
use crate::constants::{DESTINATION_PREFIX, IMAGE_EXTENSIONS};
use crate::error::PipelineError;
use crate::event::StorageChangeEvent;
use crate::types::{ObjectReference, SkipReason};

/// Result of running an event through the filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDecision {
    Admit(ObjectReference),
    Skip(SkipReason),
}

#[derive(Debug, Clone)]
pub struct SourceFilter {
    source_bucket: String,
    /// Set when source and destination share a bucket
    loop_guard_prefix: Option<String>,
}

impl SourceFilter {
    pub fn new(source_bucket: impl Into<String>) -> Self {
        Self {
            source_bucket: source_bucket.into(),
            loop_guard_prefix: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let filter = Self::new(config.source_bucket.clone());
        if config.shares_bucket() {
            filter.with_loop_guard(DESTINATION_PREFIX)
        } else {
            filter
        }
    }

    /// Skip keys under `prefix`, so our own output never re-enters the pipeline.
    pub fn with_loop_guard(mut self, prefix: impl Into<String>) -> Self {
        self.loop_guard_prefix = Some(prefix.into());
        self
    }

    /// Apply the rules in order: event name, bucket, extension, loop guard.
    ///
    /// # Errors
    ///
    /// `MalformedMessage` when a source-bucket key does not decode to UTF-8.
    pub fn admit(&self, event: &StorageChangeEvent) -> Result<FilterDecision, PipelineError> {
        if !event.is_object_created() {
            return Ok(FilterDecision::Skip(SkipReason::NotObjectCreated(
                event.event_name.clone(),
            )));
        }

        let bucket = event.container_name();
        if bucket != self.source_bucket {
            return Ok(FilterDecision::Skip(SkipReason::ForeignBucket(
                bucket.to_string(),
            )));
        }

        let key = decode_object_key(event.raw_key())?;
        if !has_image_extension(&key) {
            return Ok(FilterDecision::Skip(SkipReason::NotAnImage(key)));
        }

        if let Some(prefix) = &self.loop_guard_prefix {
            if key.starts_with(prefix.as_str()) {
                return Ok(FilterDecision::Skip(SkipReason::AlreadyWatermarked(key)));
            }
        }

        Ok(FilterDecision::Admit(ObjectReference::new(bucket, key)))
    }
}

/// Decode an S3 notification key: `+` means space, then percent-decoding.
///
/// S3 keys are always UTF-8, so escapes that decode to anything else mean
/// the notification itself is broken.
pub fn decode_object_key(raw: &str) -> Result<String, PipelineError> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|key| key.into_owned())
        .map_err(|e| {
            PipelineError::MalformedMessage(format!(
                "object key '{}' does not decode to UTF-8: {}",
                raw, e
            ))
        })
}

/// Whether the key ends in one of the allow-listed image extensions.
pub fn has_image_extension(key: &str) -> bool {
    let file_name = key.rsplit('/').next().unwrap_or(key);
    match file_name.rfind('.') {
        Some(idx) => {
            let ext = file_name[idx..].to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        }
        None => false,
    }
}
