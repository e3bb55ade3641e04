// Constants module - centralized default values for configuration
//
// This module defines all default values used throughout the codebase.
// Using constants instead of magic numbers improves maintainability
// and makes it easier to understand and modify defaults.

// =============================================================================
// Storage defaults
// =============================================================================

/// Default source bucket (where the uploader writes originals)
pub const DEFAULT_SOURCE_BUCKET: &str = "uploader-briefly";

/// Default destination bucket (where the listing API reads from)
pub const DEFAULT_DESTINATION_BUCKET: &str = "uploader-downloads-briefly";

/// Default AWS region
pub const DEFAULT_REGION: &str = "us-east-1";

/// Key prefix for every published object
pub const DESTINATION_PREFIX: &str = "watermarked/";

/// Content type used when neither the store nor the key extension tells us one
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

// =============================================================================
// Source filter
// =============================================================================

/// Event name prefix for actionable notifications
pub const OBJECT_CREATED_PREFIX: &str = "ObjectCreated";

/// Lower-cased extensions admitted by the source filter
pub const IMAGE_EXTENSIONS: [&str; 7] = [".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp", ".tiff"];

// =============================================================================
// Watermark defaults
// =============================================================================

/// Label rendered onto every image
pub const WATERMARK_LABEL: &str = "briefly.dev";

/// Mark size as a share of image width, in percent
pub const MARK_SIZE_PERCENT: u64 = 8;

/// Smallest mark size in pixels
pub const MIN_MARK_SIZE_PX: u32 = 16;

/// Largest mark size in pixels
pub const MAX_MARK_SIZE_PX: u32 = 120;

/// Distance from the right and bottom edges in pixels
pub const MARK_PADDING_PX: u32 = 20;

/// Default JPEG quality for re-encoded output
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Default maximum source pixels (width * height) before we refuse to decode
pub const DEFAULT_MAX_SOURCE_PIXELS: u64 = 100_000_000; // 100 megapixels

/// Content type of every transformed image
pub const OUTPUT_CONTENT_TYPE: &str = "image/jpeg";

// =============================================================================
// Publication metadata
// =============================================================================

/// Metadata key: provenance tag
pub const META_WATERMARKED_BY: &str = "watermarked-by";

/// Metadata key: source object key (percent-encoded)
pub const META_ORIGINAL_KEY: &str = "original-key";

/// Metadata key: processing time (RFC 3339, UTC)
pub const META_TIMESTAMP: &str = "watermark-timestamp";

/// Metadata key: whether the mark was applied or skipped
pub const META_STATUS: &str = "watermark-status";

// =============================================================================
// Invocation response
// =============================================================================

/// Message returned in the body of a successful invocation
pub const SUCCESS_MESSAGE: &str = "Processing completed successfully";
