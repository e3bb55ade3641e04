//! Watermark rendering.
//!
//! Stamps the `briefly.dev` label into the bottom-right corner of an image
//! and re-encodes the result as JPEG.
//!
//! # Pipeline
//!
//! 1. Sniff the format from the leading bytes; formats this build cannot
//!    decode pass through untouched.
//! 2. Read dimensions from the header and refuse anything above the pixel limit.
//! 3. Decode, size the mark at 8% of the width (16..=120 px), and place it
//!    20 px from the right and bottom edges.
//! 4. Composite a dark outline offset by (2, 2) and (1, 1), then the white label.
//! 5. Encode as JPEG.
//!
//! Only corrupt input is an error. See [`renderer::RenderOutcome`].

pub mod compositor;
pub mod encoder;
pub mod error;
pub mod mark;
pub mod position;
pub mod renderer;
pub mod text_renderer;

pub use compositor::{Compositor, WatermarkLayer};
pub use encoder::{EncoderQuality, JpegEncoder};
pub use error::WatermarkError;
pub use mark::{mark_size_px, WatermarkSpec};
pub use position::{bottom_right, ImageDimensions, PlacementPosition, WatermarkDimensions};
pub use renderer::{RenderOutcome, WatermarkRenderer};
pub use text_renderer::{measure_text, render_text, Color, TextExtent, TextStyle};
