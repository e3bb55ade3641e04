//! Watermark error types.

use std::fmt;

use crate::error::PipelineError;

/// Errors that can occur while watermarking an image.
///
/// Only `DecodeError` leaves the renderer. Everything else degrades to
/// publishing the original bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatermarkError {
    /// Image bytes are corrupt or not an image at all
    DecodeError(String),

    /// Failed to render the label text
    RenderError(String),

    /// Failed to re-encode the watermarked image
    EncodeError(String),
}

impl WatermarkError {
    /// Whether this error means the input is corrupt (as opposed to our fault).
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::DecodeError(_))
    }
}

impl fmt::Display for WatermarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DecodeError(msg) => write!(f, "Failed to decode image: {}", msg),
            Self::RenderError(msg) => write!(f, "Failed to render watermark text: {}", msg),
            Self::EncodeError(msg) => write!(f, "Failed to encode watermarked image: {}", msg),
        }
    }
}

impl std::error::Error for WatermarkError {}

impl From<WatermarkError> for PipelineError {
    fn from(err: WatermarkError) -> Self {
        match err {
            WatermarkError::DecodeError(msg) => PipelineError::Decode(msg),
            // Never produced by the renderer's public API; mapped for completeness
            other => PipelineError::Decode(other.to_string()),
        }
    }
}
