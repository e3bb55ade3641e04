// Source filter tests
//
// Every combination of event name, bucket, and extension is checked against
// the admission rules.

use briefly_watermarker::config::Config;
use briefly_watermarker::event::StorageChangeEvent;
use briefly_watermarker::filter::{FilterDecision, SourceFilter};
use briefly_watermarker::types::{ObjectReference, SkipReason};

#[test]
fn test_admission_matrix() {
    let filter = SourceFilter::from_config(&Config::default());

    let names = ["ObjectCreated:Put", "ObjectCreated:Post", "ObjectRemoved:Delete", "s3:TestEvent", ""];
    let buckets = ["uploader-briefly", "other-bucket", "uploader-downloads-briefly"];
    let keys = ["cat.png", "CAT.JPEG", "notes.txt", "archive.tar.gz", "noext", "pic.tiff"];

    for name in names {
        for bucket in buckets {
            for key in keys {
                let event = StorageChangeEvent::new(name, bucket, key);
                let decision = filter.admit(&event).unwrap();

                let ext_ok = [".png", ".jpeg", ".tiff"]
                    .iter()
                    .any(|ext| key.to_ascii_lowercase().ends_with(ext));
                let expected_admit =
                    name.starts_with("ObjectCreated") && bucket == "uploader-briefly" && ext_ok;

                assert_eq!(
                    matches!(decision, FilterDecision::Admit(_)),
                    expected_admit,
                    "{} {} {}",
                    name,
                    bucket,
                    key
                );
            }
        }
    }
}

#[test]
fn test_admitted_key_is_decoded() {
    let filter = SourceFilter::new("uploader-briefly");
    let cases = [
        ("cat%20photo.png", "cat photo.png"),
        ("cat+photo.png", "cat photo.png"),
        (
            "2b1e7d3a-4f5c-4e8b-9a0d-1c2e3f4a5b6c-%E5%A4%8F+%E3%81%AE%E6%B5%B7.jpg",
            "2b1e7d3a-4f5c-4e8b-9a0d-1c2e3f4a5b6c-夏 の海.jpg",
        ),
        ("100%25+real.gif", "100% real.gif"),
    ];

    for (raw, decoded) in cases {
        let event = StorageChangeEvent::new("ObjectCreated:Put", "uploader-briefly", raw);
        assert_eq!(
            filter.admit(&event).unwrap(),
            FilterDecision::Admit(ObjectReference::new("uploader-briefly", decoded))
        );
    }
}

#[test]
fn test_extension_is_checked_after_decoding() {
    let filter = SourceFilter::new("b");
    // %2E is '.', so this key really ends in ".png"
    let event = StorageChangeEvent::new("ObjectCreated:Put", "b", "photo%2Epng");
    assert!(matches!(filter.admit(&event).unwrap(), FilterDecision::Admit(_)));

    // and this one really ends in ".png.exe"
    let event = StorageChangeEvent::new("ObjectCreated:Put", "b", "photo.png%2Eexe");
    assert_eq!(
        filter.admit(&event).unwrap(),
        FilterDecision::Skip(SkipReason::NotAnImage("photo.png.exe".to_string()))
    );
}

#[test]
fn test_loop_guard_with_shared_bucket() {
    let config = Config {
        source_bucket: "shared".to_string(),
        destination_bucket: "shared".to_string(),
        ..Config::default()
    };
    let filter = SourceFilter::from_config(&config);

    let event = StorageChangeEvent::new("ObjectCreated:Put", "shared", "watermarked/cat+photo.png");
    assert_eq!(
        filter.admit(&event).unwrap(),
        FilterDecision::Skip(SkipReason::AlreadyWatermarked(
            "watermarked/cat photo.png".to_string()
        ))
    );
}
