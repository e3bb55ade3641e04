//! Watermark compositor for blending layers onto images.
//!
//! Layers are blended in insertion order with the Porter-Duff "over"
//! operator. Anything falling outside the target is clipped.

use super::position::PlacementPosition;
use image::{Rgba, RgbaImage};

/// A rendered layer to be composited onto an image.
#[derive(Clone)]
pub struct WatermarkLayer {
    /// The layer image (RGBA)
    pub image: RgbaImage,
    /// Top-left corner on the target
    pub position: PlacementPosition,
    /// Applied on top of the layer's own alpha channel (0.0 to 1.0)
    pub opacity: f32,
}

impl std::fmt::Debug for WatermarkLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatermarkLayer")
            .field("dimensions", &(self.image.width(), self.image.height()))
            .field("position", &self.position)
            .field("opacity", &self.opacity)
            .finish()
    }
}

#[derive(Debug, Default)]
pub struct Compositor {
    layers: Vec<WatermarkLayer>,
}

impl Compositor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layers(layers: Vec<WatermarkLayer>) -> Self {
        Self { layers }
    }

    pub fn add_layer(&mut self, layer: WatermarkLayer) {
        self.layers.push(layer);
    }

    /// Blend every layer onto `target`. Returns the number of pixels touched.
    pub fn apply(&self, target: &mut RgbaImage) -> usize {
        self.layers
            .iter()
            .map(|layer| blend_layer(target, layer))
            .sum()
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }
}

fn blend_layer(target: &mut RgbaImage, layer: &WatermarkLayer) -> usize {
    let target_w = target.width() as i64;
    let target_h = target.height() as i64;
    let pos_x = layer.position.x as i64;
    let pos_y = layer.position.y as i64;

    let x_start = pos_x.max(0);
    let y_start = pos_y.max(0);
    let x_end = (pos_x + layer.image.width() as i64).min(target_w);
    let y_end = (pos_y + layer.image.height() as i64).min(target_h);

    let mut touched = 0;
    for ty in y_start..y_end {
        for tx in x_start..x_end {
            let src = *layer
                .image
                .get_pixel((tx - pos_x) as u32, (ty - pos_y) as u32);
            if src[3] == 0 {
                continue;
            }
            let dst = target.get_pixel_mut(tx as u32, ty as u32);
            *dst = blend_pixels(*dst, src, layer.opacity);
            touched += 1;
        }
    }
    touched
}

/// Porter-Duff "over": result = foreground + background * (1 - foreground.alpha)
fn blend_pixels(background: Rgba<u8>, foreground: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let fg_alpha = (foreground[3] as f32 / 255.0) * opacity.clamp(0.0, 1.0);
    let bg_alpha = background[3] as f32 / 255.0;
    let out_alpha = fg_alpha + bg_alpha * (1.0 - fg_alpha);

    if out_alpha < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let channel = |fg: u8, bg: u8| -> u8 {
        let fg = fg as f32 / 255.0;
        let bg = bg as f32 / 255.0;
        let result = (fg * fg_alpha + bg * bg_alpha * (1.0 - fg_alpha)) / out_alpha;
        (result * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        channel(foreground[0], background[0]),
        channel(foreground[1], background[1]),
        channel(foreground[2], background[2]),
        (out_alpha * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}
