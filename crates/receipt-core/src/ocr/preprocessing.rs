//! Image preprocessing for OCR.

use image::{DynamicImage, GenericImageView, GrayImage, Luma};
use tracing::debug;

use crate::error::OcrError;

/// Sigma matching a 5x5 Gaussian kernel: 0.3 * ((5 - 1) * 0.5 - 1) + 0.8.
const DEFAULT_BLUR_SIGMA: f32 = 1.1;

/// Image preprocessor producing a black/white image for character recognition.
pub struct ImagePreprocessor {
    /// Gaussian blur sigma; zero disables blurring.
    blur_sigma: f32,
}

impl ImagePreprocessor {
    /// Create a new preprocessor with default settings.
    pub fn new() -> Self {
        Self {
            blur_sigma: DEFAULT_BLUR_SIGMA,
        }
    }

    /// Set the blur sigma.
    pub fn with_blur_sigma(mut self, sigma: f32) -> Self {
        self.blur_sigma = sigma;
        self
    }

    /// Grayscale, blur, then binarize with Otsu's global threshold.
    pub fn prepare(&self, image: &DynamicImage) -> Result<GrayImage, OcrError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(OcrError::Preprocessing(format!(
                "image has no pixels ({}x{})",
                width, height
            )));
        }

        let gray = image.to_luma8();
        let blurred = if self.blur_sigma > 0.0 {
            image::imageops::blur(&gray, self.blur_sigma)
        } else {
            gray
        };

        let level = otsu_level(&blurred);
        debug!("Binarizing {}x{} image at level {}", width, height, level);

        Ok(threshold(&blurred, level))
    }
}

impl Default for ImagePreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Otsu's threshold: the level maximizing between-class variance of the histogram.
pub fn otsu_level(image: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in image.pixels() {
        histogram[pixel[0] as usize] += 1;
    }

    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return 0;
    }

    let weighted_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(level, &count)| level as f64 * count as f64)
        .sum();

    let mut background_weight = 0u64;
    let mut background_sum = 0f64;
    let mut best_level = 0u8;
    let mut best_variance = -1f64;

    for (level, &count) in histogram.iter().enumerate() {
        background_weight += count;
        if background_weight == 0 {
            continue;
        }
        let foreground_weight = total - background_weight;
        if foreground_weight == 0 {
            break;
        }

        background_sum += level as f64 * count as f64;
        let background_mean = background_sum / background_weight as f64;
        let foreground_mean = (weighted_total - background_sum) / foreground_weight as f64;

        let diff = background_mean - foreground_mean;
        let variance = background_weight as f64 * foreground_weight as f64 * diff * diff;
        if variance > best_variance {
            best_variance = variance;
            best_level = level as u8;
        }
    }

    best_level
}

/// Pixels above `level` become white, the rest black.
pub fn threshold(image: &GrayImage, level: u8) -> GrayImage {
    let (width, height) = image.dimensions();
    let mut result = GrayImage::new(width, height);

    for (x, y, pixel) in image.enumerate_pixels() {
        let output = if pixel[0] > level { 255 } else { 0 };
        result.put_pixel(x, y, Luma([output]));
    }

    result
}
