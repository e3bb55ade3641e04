//! Watermark renderer: decode, stamp, re-encode.
//!
//! Rendering is best-effort. The only failure that escapes is a
//! [`WatermarkError::DecodeError`] for bytes that are not a readable image.
//! Every other problem hands the original buffer back as
//! [`RenderOutcome::Passthrough`] with the reason attached, so the source
//! content is still published.

use image::io::Reader as ImageReader;
use image::{DynamicImage, ImageError, ImageFormat};
use std::io::Cursor;

use super::compositor::Compositor;
use super::encoder::{EncoderQuality, JpegEncoder};
use super::mark::WatermarkSpec;
use super::position::ImageDimensions;
use super::WatermarkError;
use crate::config::Config;
use crate::constants::{DEFAULT_MAX_SOURCE_PIXELS, OUTPUT_CONTENT_TYPE};
use crate::types::{ImageBuffer, PassthroughReason, WatermarkStatus};

/// What the renderer produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Watermarked and re-encoded
    Transformed(ImageBuffer),
    /// The input, byte for byte
    Passthrough {
        original: ImageBuffer,
        reason: PassthroughReason,
    },
}

impl RenderOutcome {
    pub fn status(&self) -> WatermarkStatus {
        match self {
            RenderOutcome::Transformed(_) => WatermarkStatus::Applied,
            RenderOutcome::Passthrough { reason, .. } => WatermarkStatus::Skipped(reason.clone()),
        }
    }

    pub fn buffer(&self) -> &ImageBuffer {
        match self {
            RenderOutcome::Transformed(buffer) => buffer,
            RenderOutcome::Passthrough { original, .. } => original,
        }
    }

    pub fn into_buffer(self) -> ImageBuffer {
        match self {
            RenderOutcome::Transformed(buffer) => buffer,
            RenderOutcome::Passthrough { original, .. } => original,
        }
    }

    pub fn is_transformed(&self) -> bool {
        matches!(self, RenderOutcome::Transformed(_))
    }
}

/// Internal result of one attempt, before falling back to the original.
enum Attempt {
    Marked(Vec<u8>),
    Skipped(PassthroughReason),
}

#[derive(Debug, Clone)]
pub struct WatermarkRenderer {
    encoder: JpegEncoder,
    max_source_pixels: u64,
}

impl Default for WatermarkRenderer {
    fn default() -> Self {
        Self::new(EncoderQuality::default(), DEFAULT_MAX_SOURCE_PIXELS)
    }
}

impl WatermarkRenderer {
    pub fn new(quality: EncoderQuality, max_source_pixels: u64) -> Self {
        Self {
            encoder: JpegEncoder::new(quality),
            max_source_pixels,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            EncoderQuality::with_quality(config.jpeg_quality),
            config.max_source_pixels,
        )
    }

    /// Watermark `input`, or return it unchanged when that is not possible.
    ///
    /// # Errors
    ///
    /// `WatermarkError::DecodeError` when the bytes are not a readable image.
    pub fn render(&self, input: ImageBuffer) -> Result<RenderOutcome, WatermarkError> {
        match self.attempt(&input.data) {
            Ok(Attempt::Marked(bytes)) => Ok(RenderOutcome::Transformed(ImageBuffer::new(
                bytes,
                Some(OUTPUT_CONTENT_TYPE.to_string()),
            ))),
            Ok(Attempt::Skipped(reason)) => Ok(RenderOutcome::Passthrough {
                original: input,
                reason,
            }),
            Err(err) if err.is_corruption() => Err(err),
            Err(err) => Ok(RenderOutcome::Passthrough {
                original: input,
                reason: PassthroughReason::RenderFailed(err.to_string()),
            }),
        }
    }

    fn attempt(&self, data: &[u8]) -> Result<Attempt, WatermarkError> {
        let format = sniff_format(data)?;
        if !format.reading_enabled() {
            return Ok(Attempt::Skipped(PassthroughReason::UnsupportedFormat(
                format_name(format),
            )));
        }

        // Header only: refuse image bombs before allocating pixels
        let (width, height) = match ImageReader::with_format(Cursor::new(data), format)
            .into_dimensions()
        {
            Ok(dims) => dims,
            Err(err) => return classify_image_error(format, err).map(Attempt::Skipped),
        };
        let dims = ImageDimensions::new(width, height);
        if dims.pixel_count() > self.max_source_pixels {
            return Ok(Attempt::Skipped(PassthroughReason::TooLarge { width, height }));
        }

        let decoded: DynamicImage = match ImageReader::with_format(Cursor::new(data), format).decode()
        {
            Ok(image) => image,
            Err(err) => return classify_image_error(format, err).map(Attempt::Skipped),
        };

        let spec = WatermarkSpec::compute(&dims)?;
        let mut canvas = decoded.to_rgba8();
        let touched = Compositor::with_layers(spec.layers()?).apply(&mut canvas);

        tracing::debug!(
            format = ?format,
            width = width,
            height = height,
            mark_size = spec.size_px,
            x = spec.position.x,
            y = spec.position.y,
            pixels_touched = touched,
            "Stamped watermark"
        );

        // Mark landed entirely off-canvas; re-encoding would only lose quality
        if touched == 0 {
            return Ok(Attempt::Skipped(PassthroughReason::TooSmall { width, height }));
        }

        self.encoder.encode(&canvas).map(Attempt::Marked)
    }
}

/// Identify the container format from the leading bytes.
fn sniff_format(data: &[u8]) -> Result<ImageFormat, WatermarkError> {
    if data.is_empty() {
        return Err(WatermarkError::DecodeError("object is empty".to_string()));
    }
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| WatermarkError::DecodeError(e.to_string()))?
        .format()
        .ok_or_else(|| WatermarkError::DecodeError("unrecognized image signature".to_string()))
}

/// Corrupt data is an error; anything the codec merely cannot handle is a passthrough.
fn classify_image_error(
    format: ImageFormat,
    err: ImageError,
) -> Result<PassthroughReason, WatermarkError> {
    match err {
        ImageError::Decoding(e) => Err(WatermarkError::DecodeError(format!(
            "{}: {}",
            format_name(format),
            e
        ))),
        ImageError::IoError(e) => Err(WatermarkError::DecodeError(format!(
            "{}: {}",
            format_name(format),
            e
        ))),
        ImageError::Unsupported(e) => Ok(PassthroughReason::UnsupportedFormat(format!(
            "{}: {}",
            format_name(format),
            e
        ))),
        other => Ok(PassthroughReason::RenderFailed(other.to_string())),
    }
}

fn format_name(format: ImageFormat) -> String {
    format!("{:?}", format)
}
