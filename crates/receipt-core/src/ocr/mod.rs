//! Image pipeline: load, binarize, and run OCR on receipt images.

mod engine;
mod pipeline;
mod preprocessing;

pub use engine::{OcrEngine, PageSegMode, TesseractEngine};
pub use pipeline::{load_image, ImagePipeline};
pub use preprocessing::{otsu_level, threshold, ImagePreprocessor};
