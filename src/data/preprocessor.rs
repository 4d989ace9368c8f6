// ============================================================
// Layer 4 — Image Preprocessor
// ============================================================
// Turns a decoded image (plus an optional face box) into the
// fixed-size, normalised tensor the classifier consumes.
// Training and serving both call `transform`, so both see
// identically distributed inputs.
//
// Steps (applied in order):
//   1. Crop to the face box, or keep the full image
//   2. Resize to INPUT_SIZE x INPUT_SIZE (bilinear)
//   3. Convert to 8-bit RGB
//   4. Scale to [0, 1], then (x - MEAN[c]) / STD[c]
//
// Output layout is channel-major: [3, INPUT_SIZE, INPUT_SIZE].
// The transform is pure; identical input bytes give bit-identical
// output.

use std::path::Path;

use image::{imageops::FilterType, DynamicImage};

use crate::domain::bbox::BoundingBox;
use crate::error::{EmotionError, Result};

/// Side length of the square model input.
pub const INPUT_SIZE: usize = 56;

/// RGB input channels.
pub const CHANNELS: usize = 3;

/// Per-channel ImageNet statistics.
pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// One preprocessed image, [CHANNELS, INPUT_SIZE, INPUT_SIZE], channel-major.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceTensor {
    data: Vec<f32>,
}

impl FaceTensor {
    pub const LEN: usize = CHANNELS * INPUT_SIZE * INPUT_SIZE;

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Decode uploaded bytes. Malformed data is an input error.
    pub fn decode(&self, bytes: &[u8]) -> Result<DynamicImage> {
        if bytes.is_empty() {
            return Err(EmotionError::input("image is empty"));
        }
        image::load_from_memory(bytes)
            .map_err(|e| EmotionError::input(format!("cannot decode image: {e}")))
    }

    /// Open and decode an image file.
    pub fn open(&self, path: &Path) -> Result<DynamicImage> {
        image::open(path)
            .map_err(|e| EmotionError::input(format!("cannot decode '{}': {e}", path.display())))
    }

    pub fn transform(&self, image: &DynamicImage, face: Option<BoundingBox>) -> FaceTensor {
        // ── Step 1: Crop ──────────────────────────────────────────────────────
        let region = face.and_then(|b| b.clip(image.width(), image.height()));
        let cropped = match region {
            Some(b) => image.crop_imm(b.x as u32, b.y as u32, b.width, b.height),
            None => {
                if face.is_some() {
                    tracing::debug!("Face box {:?} lies outside the image, using full frame", face);
                }
                image.clone()
            }
        };

        // ── Step 2: Resize (Triangle = bilinear) ──────────────────────────────
        let resized = cropped.resize_exact(INPUT_SIZE as u32, INPUT_SIZE as u32, FilterType::Triangle);

        // ── Step 3: RGB ───────────────────────────────────────────────────────
        let rgb = resized.to_rgb8();

        // ── Step 4: Scale and normalise into CHW ──────────────────────────────
        let plane = INPUT_SIZE * INPUT_SIZE;
        let mut data = vec![0.0f32; FaceTensor::LEN];
        for (i, pixel) in rgb.pixels().enumerate() {
            for c in 0..CHANNELS {
                let x = pixel[c] as f32 / 255.0;
                data[c * plane + i] = (x - MEAN[c]) / STD[c];
            }
        }

        FaceTensor { data }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn gradient(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |x, y| {
            Rgb([(x * 3 % 256) as u8, (y * 5 % 256) as u8, ((x + y) % 256) as u8])
        }))
    }

    fn png_bytes(img: &DynamicImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn output_has_fixed_shape() {
        let t = Preprocessor::new().transform(&gradient(120, 80), None);
        assert_eq!(t.as_slice().len(), FaceTensor::LEN);
    }

    #[test]
    fn transform_is_deterministic() {
        let p     = Preprocessor::new();
        let bytes = png_bytes(&gradient(97, 61));
        let face  = Some(BoundingBox::new(10, 5, 40, 40));

        let a = p.transform(&p.decode(&bytes).unwrap(), face);
        let b = p.transform(&p.decode(&bytes).unwrap(), face);
        let bits_a: Vec<u32> = a.as_slice().iter().map(|v| v.to_bits()).collect();
        let bits_b: Vec<u32> = b.as_slice().iter().map(|v| v.to_bits()).collect();
        assert_eq!(bits_a, bits_b);
    }

    #[test]
    fn white_pixels_normalise_per_channel() {
        let white = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([255, 255, 255])));
        let t     = Preprocessor::new().transform(&white, None);
        let plane = INPUT_SIZE * INPUT_SIZE;
        for c in 0..CHANNELS {
            let expected = (1.0 - MEAN[c]) / STD[c];
            assert!((t.as_slice()[c * plane] - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn crop_changes_output() {
        let p   = Preprocessor::new();
        let img = gradient(100, 100);
        let full    = p.transform(&img, None);
        let cropped = p.transform(&img, Some(BoundingBox::new(50, 50, 30, 30)));
        assert_ne!(full, cropped);
    }

    #[test]
    fn box_outside_image_uses_full_frame() {
        let p   = Preprocessor::new();
        let img = gradient(50, 50);
        let outside = p.transform(&img, Some(BoundingBox::new(500, 500, 10, 10)));
        assert_eq!(outside, p.transform(&img, None));
    }

    #[test]
    fn malformed_bytes_are_input_errors() {
        let p = Preprocessor::new();
        assert!(matches!(p.decode(b"definitely not a png"), Err(EmotionError::Input(_))));
        assert!(matches!(p.decode(&[]), Err(EmotionError::Input(_))));
    }
}
