//! Invocation handler and batch error isolation.
//!
//! Queue messages run one at a time, strictly in delivery order, and each
//! ends `Done` or `Failed`. What a failure means for the rest of the batch
//! depends on [`BatchFailureMode`]:
//!
//! - `FailFast`: the first failure aborts the invocation with that error.
//!   Remaining messages stay pending and the framework redelivers the batch.
//! - `Isolate`: the failure is recorded against its message, later messages
//!   still run, and the response lists failed message ids in
//!   `batchItemFailures` so only those are redelivered.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::Instrument;

use crate::config::{BatchFailureMode, Config};
use crate::constants::SUCCESS_MESSAGE;
use crate::error::{ErrorKind, PipelineError};
use crate::event::{normalize, InvocationPayload, QueueMessage, StorageChangeEvent};
use crate::filter::decode_object_key;
use crate::pipeline::Pipeline;
use crate::store::ObjectStore;
use crate::types::{ObjectReference, ProcessingOutcome};

/// Final state of one queue message within an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecordState {
    Done,
    Failed(ErrorKind),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItemFailure {
    #[serde(rename = "itemIdentifier")]
    pub item_identifier: String,
}

/// What the invocation returns to the framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    /// JSON-encoded `{"message": ...}`
    pub body: String,
    #[serde(
        rename = "batchItemFailures",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub batch_item_failures: Vec<BatchItemFailure>,
}

impl InvocationResponse {
    pub fn success(batch_item_failures: Vec<BatchItemFailure>) -> Self {
        Self {
            status_code: 200,
            body: serde_json::json!({ "message": SUCCESS_MESSAGE }).to_string(),
            batch_item_failures,
        }
    }
}

/// Per-message result of a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct MessageReport {
    pub message_id: String,
    pub state: RecordState,
    pub outcomes: Vec<ProcessingOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub messages: Vec<MessageReport>,
}

impl BatchReport {
    pub fn failed_message_ids(&self) -> Vec<&str> {
        self.messages
            .iter()
            .filter(|m| matches!(m.state, RecordState::Failed(_)))
            .map(|m| m.message_id.as_str())
            .collect()
    }

    pub fn outcomes(&self) -> impl Iterator<Item = &ProcessingOutcome> {
        self.messages.iter().flat_map(|m| m.outcomes.iter())
    }

    pub fn into_response(self) -> InvocationResponse {
        InvocationResponse::success(
            self.failed_message_ids()
                .into_iter()
                .map(|id| BatchItemFailure {
                    item_identifier: id.to_string(),
                })
                .collect(),
        )
    }
}

#[derive(Clone)]
pub struct Handler {
    pipeline: Pipeline,
    mode: BatchFailureMode,
}

impl Handler {
    pub fn new(config: &Config, store: Arc<dyn ObjectStore>) -> Self {
        Self::with_pipeline(Pipeline::new(config, store), config.batch_failure_mode)
    }

    pub fn with_pipeline(pipeline: Pipeline, mode: BatchFailureMode) -> Self {
        Self { pipeline, mode }
    }

    /// Handle one invocation.
    ///
    /// # Errors
    ///
    /// In fail-fast mode, the first message failure. Never in isolate mode.
    pub async fn handle(
        &self,
        payload: InvocationPayload,
    ) -> Result<InvocationResponse, PipelineError> {
        Ok(self.run(&payload).await?.into_response())
    }

    /// Run every message in delivery order and report what happened to each.
    pub async fn run(&self, payload: &InvocationPayload) -> Result<BatchReport, PipelineError> {
        let span = tracing::info_span!("invocation", records = payload.records.len());
        self.run_messages(payload).instrument(span).await
    }

    async fn run_messages(&self, payload: &InvocationPayload) -> Result<BatchReport, PipelineError> {
        tracing::debug!(
            payload = %serde_json::to_string(payload).unwrap_or_default(),
            "Received invocation"
        );

        let total = payload.records.len();
        let mut messages = Vec::with_capacity(total);

        for (index, message) in payload.records.iter().enumerate() {
            let span = tracing::info_span!("message", message_id = %message.message_id);
            let mut outcomes = Vec::new();
            let result = self
                .process_message(message, &mut outcomes)
                .instrument(span)
                .await;

            let state = match result {
                Ok(()) => RecordState::Done,
                Err(err) => {
                    tracing::error!(
                        message_id = %message.message_id,
                        error_kind = %err.kind(),
                        error = %err,
                        retryable = err.is_retryable(),
                        "Message failed"
                    );

                    if self.mode == BatchFailureMode::FailFast {
                        tracing::warn!(unprocessed = total - index - 1, "Aborting invocation");
                        return Err(err);
                    }
                    RecordState::Failed(err.kind())
                }
            };

            messages.push(MessageReport {
                message_id: message.message_id.clone(),
                state,
                outcomes,
            });
        }

        let report = BatchReport { messages };
        tracing::info!(
            messages = report.messages.len(),
            events = report.outcomes().count(),
            failed = report.failed_message_ids().len(),
            "Invocation complete"
        );
        Ok(report)
    }

    /// Normalize one message and run its events in order. Stops at the
    /// first failing event; outcomes so far are kept in `outcomes`.
    async fn process_message(
        &self,
        message: &QueueMessage,
        outcomes: &mut Vec<ProcessingOutcome>,
    ) -> Result<(), PipelineError> {
        let events = normalize(message)?;
        if events.is_empty() {
            tracing::info!("Message carries no storage events");
        }

        for event in &events {
            match self.pipeline.process_event(event).await {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => {
                    outcomes.push(ProcessingOutcome::failed(
                        Some(source_of(event)),
                        err.kind(),
                    ));
                    return Err(err);
                }
            }
        }
        Ok(())
    }
}

fn source_of(event: &StorageChangeEvent) -> ObjectReference {
    let key = decode_object_key(event.raw_key()).unwrap_or_else(|_| event.raw_key().to_string());
    ObjectReference::new(event.container_name(), key)
}
