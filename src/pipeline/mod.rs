// Per-record unit of work: filter -> fetch -> render -> publish
//
// One storage change event flows through here at a time. Nothing is shared
// between events except the immutable stage configuration.

use std::sync::Arc;

use crate::config::Config;
use crate::error::PipelineError;
use crate::event::StorageChangeEvent;
use crate::filter::{FilterDecision, SourceFilter};
use crate::publisher::ObjectPublisher;
use crate::store::ObjectStore;
use crate::types::{ImageBuffer, ObjectReference, PassthroughReason, ProcessingOutcome};
use crate::watermark::{RenderOutcome, WatermarkRenderer};

#[derive(Clone)]
pub struct Pipeline {
    filter: SourceFilter,
    store: Arc<dyn ObjectStore>,
    renderer: Arc<WatermarkRenderer>,
    publisher: ObjectPublisher,
}

impl Pipeline {
    pub fn new(config: &Config, store: Arc<dyn ObjectStore>) -> Self {
        Self::from_parts(
            SourceFilter::from_config(config),
            store,
            WatermarkRenderer::from_config(config),
            ObjectPublisher::from_config(config),
        )
    }

    pub fn from_parts(
        filter: SourceFilter,
        store: Arc<dyn ObjectStore>,
        renderer: WatermarkRenderer,
        publisher: ObjectPublisher,
    ) -> Self {
        Self {
            filter,
            store,
            renderer: Arc::new(renderer),
            publisher,
        }
    }

    /// Run one event through the stages.
    ///
    /// Skips are successful outcomes. Undecodable keys, store failures and
    /// corrupt images are errors; the caller decides what they mean for the batch.
    pub async fn process_event(
        &self,
        event: &StorageChangeEvent,
    ) -> Result<ProcessingOutcome, PipelineError> {
        let source = match self.filter.admit(event)? {
            FilterDecision::Admit(source) => source,
            FilterDecision::Skip(reason) => {
                tracing::info!(
                    event_name = %event.event_name,
                    bucket = %event.container_name(),
                    key = %event.raw_key(),
                    reason = %reason,
                    "Skipping event"
                );
                return Ok(ProcessingOutcome::skipped(None, reason));
            }
        };

        tracing::info!(bucket = %source.bucket, key = %source.key, "Processing image");

        let buffer = self.store.get_object(&source).await?;
        tracing::debug!(
            bytes = buffer.len(),
            content_type = buffer.content_type.as_deref().unwrap_or("none"),
            "Fetched source object"
        );

        let rendered = self.render(&source, buffer).await?;
        let status = rendered.status();

        let destination_key = self
            .publisher
            .publish(self.store.as_ref(), &source, &rendered)
            .await?;

        tracing::info!(
            bucket = %self.publisher.destination_bucket(),
            destination_key = %destination_key,
            watermark = %status.metadata_value(),
            "Published image"
        );

        Ok(ProcessingOutcome::published(source, destination_key, status))
    }

    /// Render off the async runtime. A panicking render degrades to a passthrough.
    async fn render(
        &self,
        source: &ObjectReference,
        buffer: ImageBuffer,
    ) -> Result<RenderOutcome, PipelineError> {
        let renderer = Arc::clone(&self.renderer);
        let original = buffer.clone();

        let outcome = match tokio::task::spawn_blocking(move || renderer.render(buffer)).await {
            Ok(result) => result.map_err(|err| {
                tracing::error!(
                    bucket = %source.bucket,
                    key = %source.key,
                    error = %err,
                    "Source object is not a readable image"
                );
                PipelineError::from(err)
            })?,
            Err(join_err) => RenderOutcome::Passthrough {
                original,
                reason: PassthroughReason::RenderFailed(format!("render task failed: {}", join_err)),
            },
        };

        if let RenderOutcome::Passthrough { reason, .. } = &outcome {
            tracing::warn!(
                bucket = %source.bucket,
                key = %source.key,
                reason = %reason,
                "Publishing original without watermark"
            );
        }

        Ok(outcome)
    }
}
