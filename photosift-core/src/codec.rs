//! Decode and score collaborators
//!
//! The engine never looks at pixels itself. It calls an [`ImageCodec`] to turn
//! a file into a [`Payload`] and to compute a quality score from a payload.

use crate::error::Result;
use crate::item::Payload;
use image::DynamicImage;
use std::path::Path;
use std::sync::Arc;

/// Opaque decode/score operations
///
/// Shared between the interactive thread (inline fallback) and the background
/// worker, hence `Send + Sync`.
pub trait ImageCodec: Send + Sync {
    /// Decode the file at `path` into a pixel buffer
    fn decode(&self, path: &Path) -> Result<Payload>;

    /// Compute a quality score (higher = better) from a decoded buffer
    fn score(&self, image: &DynamicImage) -> f64;
}

/// Default codec: `image` crate decoding, focus measured as the variance of
/// the Laplacian of the luma channel
#[derive(Debug, Default, Clone, Copy)]
pub struct SharpnessCodec;

impl ImageCodec for SharpnessCodec {
    fn decode(&self, path: &Path) -> Result<Payload> {
        let image = image::open(path)?;
        Ok(Arc::new(image))
    }

    fn score(&self, image: &DynamicImage) -> f64 {
        laplacian_variance(image)
    }
}

/// Variance of the 4-neighbour Laplacian over the interior pixels
///
/// Images smaller than 3x3 have no interior and score 0.
pub fn laplacian_variance(image: &DynamicImage) -> f64 {
    let luma = image.to_luma8();
    let (width, height) = luma.dimensions();
    if width < 3 || height < 3 {
        return 0.0;
    }

    let px = |x: u32, y: u32| f64::from(luma.get_pixel(x, y).0[0]);

    let mut count = 0u64;
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let lap = px(x - 1, y) + px(x + 1, y) + px(x, y - 1) + px(x, y + 1) - 4.0 * px(x, y);
            sum += lap;
            sum_sq += lap * lap;
            count += 1;
        }
    }

    let n = count as f64;
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn checkerboard(size: u32) -> DynamicImage {
        let img = GrayImage::from_fn(size, size, |x, y| {
            if (x + y) % 2 == 0 {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        });
        DynamicImage::ImageLuma8(img)
    }

    fn flat(size: u32) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(size, size, Luma([128u8])))
    }

    #[test]
    fn test_flat_image_scores_zero() {
        assert_eq!(laplacian_variance(&flat(16)), 0.0);
    }

    #[test]
    fn test_sharp_image_beats_blurred() {
        let sharp = checkerboard(16);
        let blurred = sharp.blur(2.0);
        assert!(laplacian_variance(&sharp) > laplacian_variance(&blurred));
    }

    #[test]
    fn test_tiny_image_scores_zero() {
        assert_eq!(laplacian_variance(&checkerboard(2)), 0.0);
    }

    #[test]
    fn test_decode_missing_file_is_decode_error() {
        let err = SharpnessCodec
            .decode(Path::new("/nonexistent/photo.jpg"))
            .unwrap_err();
        assert!(matches!(err, crate::Error::Decode(_)));
    }
}
