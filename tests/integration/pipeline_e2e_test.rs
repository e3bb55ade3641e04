// End-to-end tests: queue payload in, published objects out
// Runs the full handler against the in-memory store, no Docker needed

use briefly_watermarker::config::{BatchFailureMode, Config};
use briefly_watermarker::error::ErrorKind;
use briefly_watermarker::event::{InvocationPayload, QueueMessage};
use briefly_watermarker::handler::{BatchItemFailure, Handler, RecordState};
use briefly_watermarker::store::InMemoryObjectStore;
use briefly_watermarker::types::{Disposition, SkipReason};
use image::{DynamicImage, GenericImageView, ImageOutputFormat, Rgb, RgbImage};
use serde_json::json;
use std::io::Cursor;
use std::sync::Arc;

const SOURCE: &str = "uploader-briefly";
const DESTINATION: &str = "uploader-downloads-briefly";

fn gray_png(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([128, 128, 128])));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageOutputFormat::Png)
        .unwrap();
    bytes
}

/// Minimal 2x2 24-bit BMP. Recognized, but this build does not decode BMP.
fn tiny_bmp() -> Vec<u8> {
    let mut bmp = Vec::new();
    bmp.extend_from_slice(b"BM");
    bmp.extend_from_slice(&70u32.to_le_bytes());
    bmp.extend_from_slice(&0u32.to_le_bytes());
    bmp.extend_from_slice(&54u32.to_le_bytes());
    bmp.extend_from_slice(&40u32.to_le_bytes());
    bmp.extend_from_slice(&2i32.to_le_bytes());
    bmp.extend_from_slice(&2i32.to_le_bytes());
    bmp.extend_from_slice(&1u16.to_le_bytes());
    bmp.extend_from_slice(&24u16.to_le_bytes());
    bmp.extend_from_slice(&[0u8; 24]);
    bmp.extend_from_slice(&[0xFF; 16]);
    bmp
}

fn s3_record(event_name: &str, bucket: &str, key: &str) -> serde_json::Value {
    json!({
        "eventVersion": "2.1",
        "eventSource": "aws:s3",
        "eventName": event_name,
        "s3": {
            "bucket": {"name": bucket},
            "object": {"key": key}
        }
    })
}

fn direct_body(records: Vec<serde_json::Value>) -> String {
    json!({ "Records": records }).to_string()
}

fn wrapped_body(records: Vec<serde_json::Value>) -> String {
    json!({
        "Type": "Notification",
        "TopicArn": "arn:aws:sns:us-east-1:123456789012:uploads",
        "Message": direct_body(records)
    })
    .to_string()
}

fn payload(messages: Vec<(&str, String)>) -> InvocationPayload {
    InvocationPayload {
        records: messages
            .into_iter()
            .map(|(id, body)| QueueMessage::new(id, body))
            .collect(),
    }
}

fn handler(store: &InMemoryObjectStore, mode: BatchFailureMode) -> Handler {
    let config = Config {
        batch_failure_mode: mode,
        ..Config::default()
    };
    Handler::new(&config, Arc::new(store.clone()))
}

#[tokio::test]
async fn test_upload_is_watermarked_and_published() {
    let store = InMemoryObjectStore::new();
    store.insert(SOURCE, "cat photo.png", gray_png(800, 600), Some("image/png"));

    let handler = handler(&store, BatchFailureMode::FailFast);
    let response = handler
        .handle(payload(vec![(
            "m-1",
            direct_body(vec![s3_record("ObjectCreated:Put", SOURCE, "cat%20photo.png")]),
        )]))
        .await
        .unwrap();

    assert_eq!(response.status_code, 200);
    assert!(response.batch_item_failures.is_empty());
    let body: serde_json::Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(body["message"], "Processing completed successfully");

    let published = store.object(DESTINATION, "watermarked/cat photo.png").unwrap();
    assert_eq!(published.content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(published.metadata["watermarked-by"], "briefly.dev");
    assert_eq!(published.metadata["original-key"], "cat%20photo.png");
    assert_eq!(published.metadata["watermark-status"], "applied");
    assert!(published.metadata["watermark-timestamp"].ends_with('Z'));

    // Everything that changed sits in the bottom-right quadrant
    let output = image::load_from_memory(&published.body).unwrap();
    assert_eq!(output.dimensions(), (800, 600));
    let luma = output.to_luma8();
    let mut changed = 0;
    for (x, y, pixel) in luma.enumerate_pixels() {
        if (pixel[0] as i32 - 128).abs() > 40 {
            assert!(x >= 400 && y >= 300, "pixel ({}, {}) changed outside the corner", x, y);
            changed += 1;
        }
    }
    assert!(changed > 100);

    // Source untouched
    assert_eq!(
        store.object(SOURCE, "cat photo.png").unwrap().body,
        gray_png(800, 600)
    );
}

#[tokio::test]
async fn test_foreign_bucket_makes_no_store_calls() {
    let store = InMemoryObjectStore::new();
    store.insert("other-bucket", "cat.png", gray_png(100, 100), Some("image/png"));

    let handler = handler(&store, BatchFailureMode::FailFast);
    let report = handler
        .run(&payload(vec![(
            "m-1",
            direct_body(vec![s3_record("ObjectCreated:Put", "other-bucket", "cat.png")]),
        )]))
        .await
        .unwrap();

    assert_eq!(store.get_count(), 0);
    assert_eq!(store.put_count(), 0);
    assert_eq!(report.messages[0].state, RecordState::Done);
    assert_eq!(
        report.messages[0].outcomes[0].disposition,
        Disposition::Skipped(SkipReason::ForeignBucket("other-bucket".to_string()))
    );
    assert!(report.into_response().batch_item_failures.is_empty());
}

#[tokio::test]
async fn test_wrapped_and_direct_messages_publish_the_same_objects() {
    let records = || {
        vec![
            s3_record("ObjectCreated:Put", SOURCE, "a.png"),
            s3_record("ObjectRemoved:Delete", SOURCE, "b.png"),
            s3_record("ObjectCreated:Post", SOURCE, "notes.txt"),
            s3_record("ObjectCreated:Put", SOURCE, "dir/c+d.png"),
        ]
    };

    let mut published = Vec::new();
    for body in [direct_body(records()), wrapped_body(records())] {
        let store = InMemoryObjectStore::new();
        store.insert(SOURCE, "a.png", gray_png(320, 240), Some("image/png"));
        store.insert(SOURCE, "dir/c d.png", gray_png(320, 240), Some("image/png"));

        let report = handler(&store, BatchFailureMode::FailFast)
            .run(&payload(vec![("m-1", body)]))
            .await
            .unwrap();

        let dispositions: Vec<_> = report
            .outcomes()
            .map(|outcome| outcome.disposition.clone())
            .collect();
        assert_eq!(dispositions.len(), 4);
        published.push((dispositions, store.keys(DESTINATION), store.get_count()));
    }

    assert_eq!(published[0], published[1]);
    assert_eq!(
        published[0].1,
        vec!["watermarked/a.png".to_string(), "watermarked/dir/c d.png".to_string()]
    );
    assert_eq!(published[0].2, 2);
}

#[tokio::test]
async fn test_foreign_records_beside_an_upload_do_not_fail_the_batch() {
    let store = InMemoryObjectStore::new();
    store.insert(SOURCE, "cat.png", gray_png(320, 240), Some("image/png"));

    let body = json!({
        "Records": [
            {"eventName": "INSERT", "eventSource": "aws:dynamodb", "dynamodb": {}},
            s3_record("ObjectCreated:Put", SOURCE, "cat.png")
        ]
    })
    .to_string();

    let handler = handler(&store, BatchFailureMode::FailFast);
    let response = handler
        .handle(payload(vec![("m-1", body)]))
        .await
        .unwrap();

    assert_eq!(response.status_code, 200);
    assert!(response.batch_item_failures.is_empty());
    assert_eq!(store.keys(DESTINATION), vec!["watermarked/cat.png".to_string()]);
}

#[tokio::test]
async fn test_only_foreign_records_succeed_without_store_calls() {
    let store = InMemoryObjectStore::new();
    let body = r#"{"Records":[{"eventName":"INSERT","eventSource":"aws:dynamodb","dynamodb":{}}]}"#;

    let response = handler(&store, BatchFailureMode::FailFast)
        .handle(payload(vec![("m-1", body.to_string())]))
        .await
        .unwrap();

    assert_eq!(response.status_code, 200);
    assert_eq!(store.get_count(), 0);
    assert_eq!(store.put_count(), 0);
}

#[tokio::test]
async fn test_reprocessing_overwrites_destination() {
    let store = InMemoryObjectStore::new();
    store.insert(SOURCE, "cat.png", gray_png(320, 240), Some("image/png"));
    let handler = handler(&store, BatchFailureMode::FailFast);
    let message = || {
        payload(vec![(
            "m-1",
            direct_body(vec![s3_record("ObjectCreated:Put", SOURCE, "cat.png")]),
        )])
    };

    handler.handle(message()).await.unwrap();
    let first = store.object(DESTINATION, "watermarked/cat.png").unwrap();
    let objects_after_first = store.object_count();

    // New upload under the same key
    store.insert(SOURCE, "cat.png", gray_png(640, 480), Some("image/png"));
    handler.handle(message()).await.unwrap();
    let second = store.object(DESTINATION, "watermarked/cat.png").unwrap();

    assert_eq!(store.object_count(), objects_after_first);
    assert_eq!(store.put_count(), 2);
    assert_ne!(first.body, second.body);
    let output = image::load_from_memory(&second.body).unwrap();
    assert_eq!(output.dimensions(), (640, 480));
}

#[tokio::test]
async fn test_unsupported_format_is_published_as_is() {
    let store = InMemoryObjectStore::new();
    let bmp = tiny_bmp();
    store.insert(SOURCE, "scan.bmp", bmp.clone(), Some("image/x-ms-bmp"));

    let handler = handler(&store, BatchFailureMode::FailFast);
    handler
        .handle(payload(vec![(
            "m-1",
            direct_body(vec![s3_record("ObjectCreated:Put", SOURCE, "scan.bmp")]),
        )]))
        .await
        .unwrap();

    let published = store.object(DESTINATION, "watermarked/scan.bmp").unwrap();
    assert_eq!(&published.body[..], &bmp[..]);
    assert_eq!(published.content_type.as_deref(), Some("image/x-ms-bmp"));
    assert_eq!(
        published.metadata["watermark-status"],
        "skipped:unsupported-format"
    );
}

#[tokio::test]
async fn test_image_smaller_than_padding_is_published_as_is() {
    let store = InMemoryObjectStore::new();
    let icon = gray_png(19, 19);
    store.insert(SOURCE, "icon.png", icon.clone(), Some("image/png"));

    handler(&store, BatchFailureMode::FailFast)
        .handle(payload(vec![(
            "m-1",
            direct_body(vec![s3_record("ObjectCreated:Put", SOURCE, "icon.png")]),
        )]))
        .await
        .unwrap();

    let published = store.object(DESTINATION, "watermarked/icon.png").unwrap();
    assert_eq!(&published.body[..], &icon[..]);
    assert_eq!(published.content_type.as_deref(), Some("image/png"));
    assert_eq!(published.metadata["watermark-status"], "skipped:too-small");
}

fn mixed_batch() -> InvocationPayload {
    payload(vec![
        (
            "m-1",
            direct_body(vec![s3_record("ObjectCreated:Put", SOURCE, "first.png")]),
        ),
        (
            "m-2",
            direct_body(vec![s3_record("ObjectCreated:Put", SOURCE, "missing.png")]),
        ),
        ("m-3", "not json".to_string()),
        (
            "m-4",
            wrapped_body(vec![s3_record("ObjectCreated:Put", SOURCE, "last.png")]),
        ),
    ])
}

fn seeded_store() -> InMemoryObjectStore {
    let store = InMemoryObjectStore::new();
    store.insert(SOURCE, "first.png", gray_png(200, 200), Some("image/png"));
    store.insert(SOURCE, "last.png", gray_png(200, 200), Some("image/png"));
    store
}

#[tokio::test]
async fn test_fail_fast_aborts_at_first_failure() {
    let store = seeded_store();
    let handler = handler(&store, BatchFailureMode::FailFast);

    let err = handler.handle(mixed_batch()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ObjectNotFound);
    assert!(!err.is_retryable());

    // m-1 completed before the failure, m-4 never ran
    assert_eq!(store.keys(DESTINATION), vec!["watermarked/first.png".to_string()]);
}

#[tokio::test]
async fn test_isolate_reports_each_failed_message() {
    let store = seeded_store();
    let handler = handler(&store, BatchFailureMode::Isolate);

    let report = handler.run(&mixed_batch()).await.unwrap();
    let states: Vec<_> = report.messages.iter().map(|m| m.state).collect();
    assert_eq!(
        states,
        vec![
            RecordState::Done,
            RecordState::Failed(ErrorKind::ObjectNotFound),
            RecordState::Failed(ErrorKind::MalformedMessage),
            RecordState::Done,
        ]
    );

    assert_eq!(
        store.keys(DESTINATION),
        vec![
            "watermarked/first.png".to_string(),
            "watermarked/last.png".to_string()
        ]
    );

    let response = report.into_response();
    assert_eq!(response.status_code, 200);
    assert_eq!(
        response.batch_item_failures,
        vec![
            BatchItemFailure {
                item_identifier: "m-2".to_string()
            },
            BatchItemFailure {
                item_identifier: "m-3".to_string()
            },
        ]
    );

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["batchItemFailures"][1]["itemIdentifier"], "m-3");
}
