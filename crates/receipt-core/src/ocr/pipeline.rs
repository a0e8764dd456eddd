//! Image file to raw OCR text.

use std::path::Path;
use std::time::Instant;

use image::{DynamicImage, GenericImageView};
use tracing::debug;

use crate::error::OcrError;
use crate::models::config::OcrConfig;

use super::engine::{OcrEngine, PageSegMode, TesseractEngine};
use super::preprocessing::ImagePreprocessor;

/// Loads an image, binarizes it and hands it to the OCR engine.
pub struct ImagePipeline<E: OcrEngine> {
    engine: E,
    preprocessor: ImagePreprocessor,
    language: String,
    mode: PageSegMode,
}

impl ImagePipeline<TesseractEngine> {
    /// Pipeline backed by the Tesseract binary named in `config`.
    pub fn from_config(config: &OcrConfig) -> Self {
        Self::new(TesseractEngine::new(config.binary.clone()))
            .with_language(config.language.clone())
            .with_page_segmentation(config.page_segmentation)
    }
}

impl<E: OcrEngine> ImagePipeline<E> {
    /// Create a pipeline with the Japanese language hint and single-block segmentation.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            preprocessor: ImagePreprocessor::new(),
            language: "jpn".to_string(),
            mode: PageSegMode::SingleBlock,
        }
    }

    /// Set the language hint passed to the engine.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Set the page segmentation mode.
    pub fn with_page_segmentation(mut self, mode: PageSegMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the preprocessor.
    pub fn with_preprocessor(mut self, preprocessor: ImagePreprocessor) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Extract text from the image at `path`.
    ///
    /// The engine's output is returned untouched; cleanup is the parser's job.
    pub fn extract_text(&self, path: &Path) -> Result<String, OcrError> {
        let image = load_image(path)?;
        self.extract_text_from_image(&image)
    }

    /// Extract text from an already decoded image.
    pub fn extract_text_from_image(&self, image: &DynamicImage) -> Result<String, OcrError> {
        let start = Instant::now();
        let (width, height) = image.dimensions();

        let processed = self.preprocessor.prepare(image)?;
        let text = self.engine.recognize(&processed, &self.language, self.mode)?;

        debug!(
            "OCR on {}x{} image produced {} chars in {}ms",
            width,
            height,
            text.chars().count(),
            start.elapsed().as_millis()
        );

        Ok(text)
    }
}

/// Decode an image file, distinguishing unreadable files from engine errors.
pub fn load_image(path: &Path) -> Result<DynamicImage, OcrError> {
    image::open(path).map_err(|e| OcrError::UnreadableImage {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}
