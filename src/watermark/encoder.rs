//! Output encoding
//!
//! Every watermarked image leaves as baseline JPEG, whatever its input
//! format. JPEG has no alpha channel, so alpha is dropped.

use image::codecs::jpeg::JpegEncoder as ImageJpegEncoder;
use image::{ColorType, ImageEncoder as _, RgbaImage};

use super::WatermarkError;
use crate::constants::DEFAULT_JPEG_QUALITY;

/// Quality settings for JPEG encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderQuality {
    /// Quality value (1-100, where 100 is best quality)
    pub quality: u8,
}

impl Default for EncoderQuality {
    fn default() -> Self {
        Self::with_quality(DEFAULT_JPEG_QUALITY)
    }
}

impl EncoderQuality {
    pub fn with_quality(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }
}

/// JPEG encoder using the image crate
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegEncoder {
    quality: EncoderQuality,
}

impl JpegEncoder {
    pub fn new(quality: EncoderQuality) -> Self {
        Self { quality }
    }

    pub fn quality(&self) -> EncoderQuality {
        self.quality
    }

    pub fn encode(&self, image: &RgbaImage) -> Result<Vec<u8>, WatermarkError> {
        let rgb = rgba_to_rgb(image.as_raw());
        let mut output = Vec::with_capacity(rgb.len() / 8);

        ImageJpegEncoder::new_with_quality(&mut output, self.quality.quality)
            .write_image(&rgb, image.width(), image.height(), ColorType::Rgb8)
            .map_err(|e| WatermarkError::EncodeError(e.to_string()))?;

        Ok(output)
    }
}

/// Convert RGBA to RGB by discarding the alpha channel
fn rgba_to_rgb(rgba: &[u8]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(rgba.len() / 4 * 3);
    for px in rgba.chunks_exact(4) {
        rgb.extend_from_slice(&px[..3]);
    }
    rgb
}
