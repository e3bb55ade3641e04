//! Text rendering for the watermark label.
//!
//! Glyphs are rasterized with `ab_glyph` from an embedded DejaVu Sans Mono
//! onto a transparent RGBA canvas sized by [`measure_text`]. The canvas is then
//! composited onto the target image.

use super::WatermarkError;
use ab_glyph::{Font, FontRef, GlyphId, PxScale, PxScaleFont, ScaleFont};
use image::{Rgba, RgbaImage};
use std::sync::OnceLock;

/// Monospace, so label width is predictable across sizes.
const EMBEDDED_FONT_DATA: &[u8] = include_bytes!("fonts/DejaVuSansMono.ttf");

/// Extra pixels added to each measured dimension so anti-aliased edges fit.
const CANVAS_SLACK_PX: u32 = 2;

fn label_font() -> Result<&'static FontRef<'static>, WatermarkError> {
    static FONT: OnceLock<Option<FontRef<'static>>> = OnceLock::new();
    FONT.get_or_init(|| FontRef::try_from_slice(EMBEDDED_FONT_DATA).ok())
        .as_ref()
        .ok_or_else(|| WatermarkError::RenderError("embedded font failed to parse".to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255)
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0)
    }
}

/// How to draw a piece of text.
#[derive(Debug, Clone, Copy)]
pub struct TextStyle {
    /// Font size in pixels
    pub size_px: f32,
    pub color: Color,
    /// 0.0 to 1.0
    pub opacity: f32,
}

impl TextStyle {
    pub fn new(size_px: f32, color: Color) -> Self {
        Self {
            size_px,
            color,
            opacity: 1.0,
        }
    }
}

/// Rendered footprint of a piece of text, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextExtent {
    pub width: u32,
    pub height: u32,
}

/// Walk the text's glyphs, calling `f` with each glyph id and its pen x.
/// Returns the total advance.
fn layout<F>(scaled: &PxScaleFont<&FontRef<'static>>, text: &str, mut f: F) -> f32
where
    F: FnMut(GlyphId, f32),
{
    let mut cursor_x = 0.0f32;
    let mut prev: Option<GlyphId> = None;

    for c in text.chars() {
        let id = scaled.glyph_id(c);
        if let Some(prev) = prev {
            cursor_x += scaled.kern(prev, id);
        }
        f(id, cursor_x);
        cursor_x += scaled.h_advance(id);
        prev = Some(id);
    }

    cursor_x
}

/// Measure the footprint of `text` at `size_px`.
pub fn measure_text(text: &str, size_px: f32) -> Result<TextExtent, WatermarkError> {
    let font = label_font()?;
    let scaled = font.as_scaled(PxScale::from(size_px));
    let advance = layout(&scaled, text, |_, _| {});

    Ok(TextExtent {
        width: advance.ceil() as u32 + CANVAS_SLACK_PX,
        height: scaled.height().ceil() as u32 + CANVAS_SLACK_PX,
    })
}

/// Rasterize `text` onto a transparent canvas exactly [`measure_text`] big.
pub fn render_text(text: &str, style: &TextStyle) -> Result<RgbaImage, WatermarkError> {
    if text.is_empty() {
        return Err(WatermarkError::RenderError(
            "Cannot render empty text".to_string(),
        ));
    }
    if !(style.size_px.is_finite() && style.size_px > 0.0) {
        return Err(WatermarkError::RenderError(format!(
            "Invalid font size: {}",
            style.size_px
        )));
    }

    let font = label_font()?;
    let scale = PxScale::from(style.size_px);
    let scaled = font.as_scaled(scale);
    let extent = measure_text(text, style.size_px)?;

    let mut canvas = RgbaImage::new(extent.width.max(1), extent.height.max(1));
    let (canvas_w, canvas_h) = (canvas.width() as i32, canvas.height() as i32);
    let alpha = style.opacity.clamp(0.0, 1.0) * 255.0;
    let baseline = scaled.ascent();

    layout(&scaled, text, |id, pen_x| {
        let glyph = id.with_scale_and_position(scale, ab_glyph::point(pen_x, baseline));
        let Some(outlined) = font.outline_glyph(glyph) else {
            return; // whitespace
        };
        let bounds = outlined.px_bounds();

        outlined.draw(|px, py, coverage| {
            let x = px as i32 + bounds.min.x as i32;
            let y = py as i32 + bounds.min.y as i32;
            if x < 0 || y < 0 || x >= canvas_w || y >= canvas_h {
                return;
            }

            let a = (coverage.clamp(0.0, 1.0) * alpha) as u8;
            let pixel = canvas.get_pixel_mut(x as u32, y as u32);
            // Neighbouring glyph edges may touch the same pixel; keep the stronger one.
            if a > pixel[3] {
                *pixel = Rgba([style.color.r, style.color.g, style.color.b, a]);
            }
        });
    });

    Ok(canvas)
}
