//! Queue message unwrapping.
//!
//! A queue body carries S3 notifications in one of two shapes:
//!
//! ```json
//! {"Records": [{"eventName": "ObjectCreated:Put", "s3": {...}}]}
//! {"Type": "Notification", "Message": "{\"Records\": [...]}"}
//! ```
//!
//! The second is an SNS envelope whose `Message` field is itself a JSON
//! string. [`NotificationEnvelope::classify`] parses a body once and decides
//! which shape it is; [`normalize`] turns either into the same list of
//! [`StorageChangeEvent`]s. Bodies that parse but match neither shape (S3 test
//! events, unrelated traffic on a shared queue) normalize to an empty list.

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::constants::OBJECT_CREATED_PREFIX;
use crate::error::PipelineError;

/// One invocation's worth of queue messages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvocationPayload {
    #[serde(rename = "Records", alias = "records", default)]
    pub records: Vec<QueueMessage>,
}

impl InvocationPayload {
    /// Load a saved invocation payload, e.g. one captured from a real queue.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read event file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("{} is not an invocation payload", path.display()))
    }
}

/// A single queue message. Only the body is interpreted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueueMessage {
    #[serde(rename = "messageId", alias = "message_id", default)]
    pub message_id: String,
    #[serde(default)]
    pub body: String,
}

impl QueueMessage {
    pub fn new(message_id: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            body: body.into(),
        }
    }
}

/// S3 storage change notification record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageChangeEvent {
    #[serde(rename = "eventName", default)]
    pub event_name: String,
    #[serde(rename = "s3")]
    pub object_ref: ObjectRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    pub bucket: BucketRef,
    pub object: ObjectKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketRef {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectKey {
    /// URL-encoded key, `+` standing for space
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl StorageChangeEvent {
    pub fn new(
        event_name: impl Into<String>,
        bucket: impl Into<String>,
        encoded_key: impl Into<String>,
    ) -> Self {
        Self {
            event_name: event_name.into(),
            object_ref: ObjectRef {
                bucket: BucketRef {
                    name: bucket.into(),
                },
                object: ObjectKey {
                    key: encoded_key.into(),
                    size: None,
                },
            },
        }
    }

    pub fn container_name(&self) -> &str {
        &self.object_ref.bucket.name
    }

    /// Key exactly as it appears on the wire (still URL-encoded).
    pub fn raw_key(&self) -> &str {
        &self.object_ref.object.key
    }

    pub fn is_object_created(&self) -> bool {
        self.event_name.starts_with(OBJECT_CREATED_PREFIX)
    }
}

/// The two notification shapes a queue body may carry, plus "neither".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEnvelope {
    /// S3 notification delivered straight to the queue
    Direct(Vec<StorageChangeEvent>),
    /// S3 notification fanned out through SNS
    Wrapped {
        topic_arn: Option<String>,
        records: Vec<StorageChangeEvent>,
    },
    /// Parsable, but not a storage notification
    Unrelated,
}

impl NotificationEnvelope {
    /// Parse a queue body and classify its shape.
    ///
    /// # Errors
    ///
    /// `MalformedMessage` when the body (or a wrapped `Message`) is not JSON,
    /// or when a `Records` array holds entries without the notification shape.
    pub fn classify(body: &str) -> Result<Self, PipelineError> {
        let value: Value = serde_json::from_str(body).map_err(|e| {
            PipelineError::MalformedMessage(format!("queue body is not valid JSON: {}", e))
        })?;

        if let Some(records) = records_field(&value) {
            return Ok(NotificationEnvelope::Direct(parse_records(records)?));
        }

        if let Some(message) = message_field(&value) {
            let inner = match message {
                Value::String(text) => serde_json::from_str::<Value>(text).map_err(|e| {
                    PipelineError::MalformedMessage(format!(
                        "wrapped Message is not valid JSON: {}",
                        e
                    ))
                })?,
                other => other.clone(),
            };
            let records = match records_field(&inner) {
                Some(records) => parse_records(records)?,
                None => Vec::new(),
            };
            let topic_arn = value
                .get("TopicArn")
                .and_then(Value::as_str)
                .map(str::to_string);
            return Ok(NotificationEnvelope::Wrapped { topic_arn, records });
        }

        Ok(NotificationEnvelope::Unrelated)
    }

    pub fn into_records(self) -> Vec<StorageChangeEvent> {
        match self {
            NotificationEnvelope::Direct(records) => records,
            NotificationEnvelope::Wrapped { records, .. } => records,
            NotificationEnvelope::Unrelated => Vec::new(),
        }
    }

    pub fn shape(&self) -> &'static str {
        match self {
            NotificationEnvelope::Direct(_) => "direct",
            NotificationEnvelope::Wrapped { .. } => "wrapped",
            NotificationEnvelope::Unrelated => "unrelated",
        }
    }
}

/// Turn one queue message into its storage change events.
pub fn normalize(message: &QueueMessage) -> Result<Vec<StorageChangeEvent>, PipelineError> {
    let envelope = NotificationEnvelope::classify(&message.body)?;
    tracing::debug!(
        message_id = %message.message_id,
        shape = envelope.shape(),
        "Classified queue message"
    );
    Ok(envelope.into_records())
}

fn records_field(value: &Value) -> Option<&Value> {
    value.get("Records").or_else(|| value.get("records"))
}

fn message_field(value: &Value) -> Option<&Value> {
    value.get("Message").or_else(|| value.get("message"))
}

/// Parse a `Records` array, looking at `eventName` before the `s3` entity.
///
/// Only `ObjectCreated` records must have the S3 shape. Other records are
/// kept when they have it (the filter reports them as skipped) and dropped
/// when they do not, so foreign traffic such as DynamoDB stream records on a
/// shared queue never fails the message.
fn parse_records(records: &Value) -> Result<Vec<StorageChangeEvent>, PipelineError> {
    let entries = records.as_array().ok_or_else(|| {
        PipelineError::MalformedMessage("Records is not an array".to_string())
    })?;

    let mut events = Vec::with_capacity(entries.len());
    for entry in entries {
        if !entry.is_object() {
            return Err(PipelineError::MalformedMessage(format!(
                "Records entry is not an object: {}",
                entry
            )));
        }

        let event_name = entry.get("eventName").and_then(Value::as_str);
        let actionable = event_name.is_some_and(|name| name.starts_with(OBJECT_CREATED_PREFIX));

        match StorageChangeEvent::deserialize(entry) {
            Ok(event) => events.push(event),
            Err(e) if actionable => {
                return Err(PipelineError::MalformedMessage(format!(
                    "Records do not have the S3 event shape: {}",
                    e
                )))
            }
            Err(_) => {
                tracing::debug!(
                    event_name = event_name.unwrap_or(""),
                    event_source = entry.get("eventSource").and_then(serde_json::Value::as_str).unwrap_or(""),
                    "Dropping record without the S3 event shape"
                );
            }
        }
    }
    Ok(events)
}
