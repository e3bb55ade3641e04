//! Position calculation for watermark placement.
//!
//! The mark sits in the bottom-right corner, `padding` pixels from the right
//! and bottom edges:
//!
//! ```text
//! x = width  - mark_width  - padding
//! y = height - mark_height - padding
//! ```
//!
//! On images too small for that, each coordinate clamps independently to
//! `padding`, so the mark starts inside the image and clips at the far edge
//! instead of hanging off the top or left.

/// Dimensions of the target image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Dimensions of the watermark to be placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatermarkDimensions {
    pub width: u32,
    pub height: u32,
}

/// Top-left corner of a placed watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementPosition {
    pub x: i32,
    pub y: i32,
}

impl PlacementPosition {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }
}

fn far_edge(extent: u32, mark: u32, padding: u32) -> i32 {
    let raw = extent as i64 - mark as i64 - padding as i64;
    raw.max(padding as i64).min(i32::MAX as i64) as i32
}

/// Bottom-right placement, clamped to at least `(padding, padding)`.
pub fn bottom_right(
    image: &ImageDimensions,
    watermark: &WatermarkDimensions,
    padding: u32,
) -> PlacementPosition {
    PlacementPosition::new(
        far_edge(image.width, watermark.width, padding),
        far_edge(image.height, watermark.height, padding),
    )
}

/// Whether the whole watermark lies inside the image.
pub fn fits_within(
    position: &PlacementPosition,
    image: &ImageDimensions,
    watermark: &WatermarkDimensions,
) -> bool {
    position.x >= 0
        && position.y >= 0
        && position.x as i64 + watermark.width as i64 <= image.width as i64
        && position.y as i64 + watermark.height as i64 <= image.height as i64
}
