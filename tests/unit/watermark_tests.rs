// Watermark rendering tests
// Geometry across common image sizes, plus end-to-end render of real encoded images

use briefly_watermarker::types::{ImageBuffer, PassthroughReason};
use briefly_watermarker::watermark::position::fits_within;
use briefly_watermarker::watermark::*;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageOutputFormat, Rgb, RgbImage};
use std::io::Cursor;

fn encoded(width: u32, height: u32, format: ImageOutputFormat) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([128, 128, 128])));
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), format).unwrap();
    bytes
}

#[test]
fn test_mark_fits_common_sizes() {
    let sizes = [
        (300, 200),
        (640, 480),
        (1024, 768),
        (1080, 1920),
        (1920, 1080),
        (4000, 3000),
    ];

    for (width, height) in sizes {
        let image = ImageDimensions::new(width, height);
        let spec = WatermarkSpec::compute(&image).unwrap();

        assert_eq!(spec.size_px, mark_size_px(width));
        assert!(
            fits_within(&spec.position, &image, &spec.footprint),
            "{}x{}: mark at {:?} does not fit",
            width,
            height,
            spec.position
        );
        // Anchored 20px from the right and bottom edges
        assert_eq!(spec.position.x as u32 + spec.footprint.width + 20, width);
        assert_eq!(spec.position.y as u32 + spec.footprint.height + 20, height);
    }
}

#[test]
fn test_mark_size_bounds() {
    assert_eq!(mark_size_px(1), 16);
    assert_eq!(mark_size_px(200), 16);
    assert_eq!(mark_size_px(212), 16);
    assert_eq!(mark_size_px(213), 17);
    assert_eq!(mark_size_px(1000), 80);
    assert_eq!(mark_size_px(1500), 120);
    assert_eq!(mark_size_px(u32::MAX), 120);
}

#[test]
fn test_tiny_image_clamps_to_padding() {
    let image = ImageDimensions::new(40, 30);
    let spec = WatermarkSpec::compute(&image).unwrap();
    assert_eq!(spec.position, PlacementPosition::new(20, 20));
}

#[test]
fn test_rendered_png_is_jpeg_of_same_size() {
    let renderer = WatermarkRenderer::default();
    let input = ImageBuffer::new(
        encoded(640, 480, ImageOutputFormat::Png),
        Some("image/png".to_string()),
    );

    let outcome = renderer.render(input).unwrap();
    assert!(outcome.is_transformed());

    let buffer = outcome.into_buffer();
    assert_eq!(buffer.content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(image::guess_format(&buffer.data).unwrap(), ImageFormat::Jpeg);

    let output = image::load_from_memory(&buffer.data).unwrap();
    assert_eq!(output.dimensions(), (640, 480));

    let luma = output.to_luma8();
    // Label is white, background mid-gray
    let bright_in_corner = (320..640)
        .flat_map(|x| (400..480).map(move |y| (x, y)))
        .any(|(x, y)| luma.get_pixel(x, y)[0] > 220);
    assert!(bright_in_corner);

    for (x, y) in [(0, 0), (100, 100), (300, 50), (50, 300)] {
        let value = luma.get_pixel(x, y)[0] as i32;
        assert!((value - 128).abs() < 10, "({}, {}) changed to {}", x, y, value);
    }
}

#[test]
fn test_rendered_jpeg_input() {
    let renderer = WatermarkRenderer::new(EncoderQuality::with_quality(75), 1_000_000);
    let input = ImageBuffer::new(encoded(500, 500, ImageOutputFormat::Jpeg(85)), None);

    let outcome = renderer.render(input).unwrap();
    assert!(outcome.is_transformed());
    let output = image::load_from_memory(&outcome.buffer().data).unwrap();
    assert_eq!(output.dimensions(), (500, 500));
}

#[test]
fn test_pixel_limit_passes_through_untouched() {
    let renderer = WatermarkRenderer::new(EncoderQuality::default(), 640 * 480 - 1);
    let bytes = encoded(640, 480, ImageOutputFormat::Png);
    let input = ImageBuffer::new(bytes.clone(), Some("image/png".to_string()));

    match renderer.render(input).unwrap() {
        RenderOutcome::Passthrough { original, reason } => {
            assert_eq!(&original.data[..], &bytes[..]);
            assert_eq!(original.content_type.as_deref(), Some("image/png"));
            assert_eq!(
                reason,
                PassthroughReason::TooLarge {
                    width: 640,
                    height: 480
                }
            );
        }
        other => panic!("expected passthrough, got {:?}", other),
    }
}

#[test]
fn test_text_extent_grows_with_size() {
    let small = measure_text("briefly.dev", 16.0).unwrap();
    let large = measure_text("briefly.dev", 120.0).unwrap();
    assert!(large.width > small.width * 5);
    assert!(large.height > small.height * 5);
}
