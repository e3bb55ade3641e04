//! S3 backend

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use bytes::BytesMut;
use std::collections::HashMap;

use super::{classify_s3_error, ObjectStore, ObjectWrite, StoreError};
use crate::config::Config;
use crate::types::{ImageBuffer, ObjectReference};

#[derive(Clone)]
pub struct S3ObjectStore {
    client: S3Client,
}

impl S3ObjectStore {
    pub fn new(client: S3Client) -> Self {
        Self { client }
    }

    /// Build a client from the default AWS provider chain plus our overrides.
    pub async fn from_config(config: &Config) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = loader.load().await;

        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(config.force_path_style)
            .build();

        tracing::debug!(
            region = %config.region,
            endpoint = config.endpoint_url.as_deref().unwrap_or("default"),
            force_path_style = config.force_path_style,
            "Built S3 client"
        );

        Self::new(S3Client::from_conf(s3_config))
    }
}

fn map_sdk_error<E>(object: &ObjectReference, err: &SdkError<E, HttpResponse>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let status = err.raw_response().map(|response| response.status().as_u16());
    let message = format!("{}: {}", object, DisplayErrorContext(err));
    classify_s3_error(object, err.code(), status, message)
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_object(&self, object: &ObjectReference) -> Result<ImageBuffer, StoreError> {
        let response = self
            .client
            .get_object()
            .bucket(&object.bucket)
            .key(&object.key)
            .send()
            .await
            .map_err(|e| map_sdk_error(object, &e))?;

        let content_type = response.content_type().map(str::to_string);
        // Only a sizing hint; the stream decides where the object ends.
        let capacity = response
            .content_length()
            .and_then(|len| usize::try_from(len).ok())
            .unwrap_or(0);
        let mut body = response.body;

        let mut buffer = BytesMut::with_capacity(capacity);
        let mut chunks = 0usize;
        while let Some(chunk) = body.try_next().await.map_err(|e| {
            StoreError::Transient(format!("{}: failed to read object body: {}", object, e))
        })? {
            buffer.extend_from_slice(&chunk);
            chunks += 1;
        }

        tracing::debug!(
            bucket = %object.bucket,
            key = %object.key,
            bytes = buffer.len(),
            chunks = chunks,
            "Fetched object"
        );

        Ok(ImageBuffer::new(buffer.freeze(), content_type))
    }

    async fn put_object(&self, write: ObjectWrite) -> Result<(), StoreError> {
        let target = ObjectReference::new(write.bucket.clone(), write.key.clone());
        let bytes = write.body.len();
        let metadata: HashMap<String, String> = write.metadata.into_iter().collect();

        self.client
            .put_object()
            .bucket(write.bucket)
            .key(write.key)
            .content_type(write.content_type)
            .set_metadata(Some(metadata))
            .body(ByteStream::from(write.body))
            .send()
            .await
            .map_err(|e| map_sdk_error(&target, &e))?;

        tracing::debug!(
            bucket = %target.bucket,
            key = %target.key,
            bytes = bytes,
            "Stored object"
        );

        Ok(())
    }
}
