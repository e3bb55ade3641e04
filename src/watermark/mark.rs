//! Mark geometry and outline layering.

use image::RgbaImage;

use super::compositor::WatermarkLayer;
use super::position::{bottom_right, ImageDimensions, PlacementPosition, WatermarkDimensions};
use super::text_renderer::{measure_text, render_text, Color, TextStyle};
use super::WatermarkError;
use crate::constants::{
    MARK_PADDING_PX, MARK_SIZE_PERCENT, MAX_MARK_SIZE_PX, MIN_MARK_SIZE_PX, WATERMARK_LABEL,
};

/// Outline offsets, drawn in order beneath the label.
const OUTLINE_OFFSETS: [(i32, i32); 2] = [(2, 2), (1, 1)];

/// Mark size for an image `width` pixels wide: 8% of the width, floored,
/// then clamped to 16..=120.
pub fn mark_size_px(width: u32) -> u32 {
    let size = (width as u64 * MARK_SIZE_PERCENT / 100)
        .clamp(MIN_MARK_SIZE_PX as u64, MAX_MARK_SIZE_PX as u64);
    size as u32
}

/// Everything needed to stamp one image: derived per image, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatermarkSpec {
    pub text: String,
    pub size_px: u32,
    pub position: PlacementPosition,
    /// Footprint of the label at `size_px`
    pub footprint: WatermarkDimensions,
}

impl WatermarkSpec {
    /// Placement and size of the fixed label on an image of these dimensions.
    pub fn compute(image: &ImageDimensions) -> Result<Self, WatermarkError> {
        Self::for_label(WATERMARK_LABEL, image)
    }

    pub fn for_label(text: &str, image: &ImageDimensions) -> Result<Self, WatermarkError> {
        let size_px = mark_size_px(image.width);
        let extent = measure_text(text, size_px as f32)?;
        let footprint = WatermarkDimensions {
            width: extent.width,
            height: extent.height,
        };

        Ok(Self {
            text: text.to_string(),
            size_px,
            position: bottom_right(image, &footprint, MARK_PADDING_PX),
            footprint,
        })
    }

    /// Outline layers first (dark, offset), then the label itself (light).
    pub fn layers(&self) -> Result<Vec<WatermarkLayer>, WatermarkError> {
        let size = self.size_px as f32;
        let shadow: RgbaImage = render_text(&self.text, &TextStyle::new(size, Color::black()))?;
        let label: RgbaImage = render_text(&self.text, &TextStyle::new(size, Color::white()))?;

        let mut layers: Vec<WatermarkLayer> = OUTLINE_OFFSETS
            .iter()
            .map(|&(dx, dy)| WatermarkLayer {
                image: shadow.clone(),
                position: self.position.offset(dx, dy),
                opacity: 1.0,
            })
            .collect();
        layers.push(WatermarkLayer {
            image: label,
            position: self.position,
            opacity: 1.0,
        });

        Ok(layers)
    }
}
