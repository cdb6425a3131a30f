//! Blur/letterbox post-processing.

use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, RgbImage};
use tracing::debug;

use crate::config::BlurConfig;

use super::{ImageError, ImagePostProcessor};

/// Resizes the raw background to the frame size, centers it on a taller
/// canvas and fills the letterbox strips above and below with blurred
/// stretches of the frame's own edges, so the bars read as a soft
/// continuation of the picture instead of black.
pub struct BlurLetterbox {
    config: BlurConfig,
}

impl BlurLetterbox {
    pub fn new(config: BlurConfig) -> Self {
        Self { config }
    }

    /// Creates a processor with default geometry.
    pub fn with_defaults() -> Self {
        Self::new(BlurConfig::default())
    }
}

impl ImagePostProcessor for BlurLetterbox {
    fn name(&self) -> &str {
        "blur_letterbox"
    }

    fn process(&self, raw: &[u8]) -> Result<Vec<u8>, ImageError> {
        let frame_w = self.config.frame_width;
        let frame_h = self.config.frame_height;
        let canvas_h = self.config.canvas_height;
        let margin = self.config.margin_pixels;

        let frame = image::load_from_memory(raw)
            .map_err(|e| ImageError::Decode(e.to_string()))?
            .resize_exact(frame_w, frame_h, FilterType::Triangle)
            .to_rgb8();

        let frame_start = canvas_h / 2 - frame_h / 2;
        let frame_end = frame_start + frame_h;
        let strip_top = frame_start;
        let strip_bottom = canvas_h - frame_end;

        let mut canvas = RgbImage::new(frame_w, canvas_h);
        imageops::overlay(&mut canvas, &frame, 0, frame_start as i64);

        if strip_top > 0 {
            let edge = imageops::crop_imm(&frame, 0, 0, frame_w, margin).to_image();
            let stretched = imageops::resize(&edge, frame_w, strip_top, FilterType::Triangle);
            let blurred = imageops::blur(&stretched, self.config.sigma);
            imageops::overlay(&mut canvas, &blurred, 0, 0);
        }

        if strip_bottom > 0 {
            let edge =
                imageops::crop_imm(&frame, 0, frame_h - margin, frame_w, margin).to_image();
            let stretched = imageops::resize(&edge, frame_w, strip_bottom, FilterType::Triangle);
            let blurred = imageops::blur(&stretched, self.config.sigma);
            imageops::overlay(&mut canvas, &blurred, 0, frame_end as i64);
        }

        let mut out = Vec::new();
        DynamicImage::ImageRgb8(canvas)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .map_err(|e| ImageError::Encode(e.to_string()))?;

        debug!(
            width = frame_w,
            height = canvas_h,
            bytes = out.len(),
            "processed background"
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    fn tiny_config() -> BlurConfig {
        BlurConfig {
            frame_width: 36,
            frame_height: 64,
            canvas_height: 80,
            margin_pixels: 4,
            sigma: 2.0,
        }
    }

    fn sample_png(w: u32, h: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(w, h, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn test_output_has_canvas_dimensions() {
        let processor = BlurLetterbox::new(tiny_config());
        let out = processor.process(&sample_png(20, 40)).unwrap();
        let decoded = image::load_from_memory(&out).unwrap();
        assert_eq!(decoded.dimensions(), (36, 80));
    }

    #[test]
    fn test_accepts_any_input_size() {
        // The frame is resized, so the source aspect ratio does not matter.
        let processor = BlurLetterbox::new(tiny_config());
        assert!(processor.process(&sample_png(100, 10)).is_ok());
    }

    #[test]
    fn test_garbage_input_is_a_decode_error() {
        let processor = BlurLetterbox::new(tiny_config());
        let err = processor.process(b"definitely not an image").unwrap_err();
        assert!(matches!(err, ImageError::Decode(_)));
        assert!(!err.is_retryable());
    }
}
