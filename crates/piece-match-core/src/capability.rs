//! Injected vision capabilities.
//!
//! The matching pipelines never touch a concrete vision backend; they call
//! through these traits. Implementations must be usable from several threads
//! at once (reference extraction may run while a frame is in flight).

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::geometry::{Contour, NormRect};
use crate::image::{RgbaImage, RgbaImageView};

/// Failure of a single capability call.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CapabilityError {
    #[error("image too small ({width}x{height}, need at least {min}x{min})")]
    ImageTooSmall {
        width: usize,
        height: usize,
        min: usize,
    },
    #[error("region is empty after clamping to the image")]
    DegenerateRegion,
    #[error("backend failure: {0}")]
    Backend(String),
}

/// Finds region outlines in an image.
pub trait ContourExtractor: Send + Sync {
    /// Return at most `max_count` contours ordered by area, largest first.
    ///
    /// Must not fail on near-uniform images; an empty list is the expected
    /// answer there.
    fn detect(
        &self,
        image: &RgbaImageView<'_>,
        contrast_adjustment: f32,
        max_count: usize,
    ) -> Result<Vec<Contour>, CapabilityError>;
}

/// Opaque visual-similarity feature vector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisualEmbedding(Vec<f32>);

impl VisualEmbedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    #[inline]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Produces embeddings and compares them.
pub trait VisualEmbedder: Send + Sync {
    /// Fails on images below the backend's minimum size (around 20x20 px).
    fn extract(&self, image: &RgbaImageView<'_>) -> Result<VisualEmbedding, CapabilityError>;

    /// Raw distance, typically in `[0, 70]`.
    fn distance(&self, a: &VisualEmbedding, b: &VisualEmbedding) -> Result<f32, CapabilityError>;
}

/// What to put outside the contour when masking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskBackground {
    /// Alpha 0 outside the contour.
    Transparent,
    /// Opaque solid color outside the contour.
    Solid([u8; 3]),
}

/// Basic raster operations.
pub trait ImageTransform: Send + Sync {
    /// Crop to `rect` clamped to the image; fails if nothing is left.
    fn crop(&self, image: &RgbaImageView<'_>, rect: NormRect) -> Result<RgbaImage, CapabilityError>;

    /// Scale down so the longer side is at most `max_dimension`. Never upscales.
    fn downsample(&self, image: &RgbaImageView<'_>, max_dimension: usize) -> RgbaImage;

    /// Rotate clockwise by `degrees`, expanding the canvas to fit.
    fn rotate(&self, image: &RgbaImageView<'_>, degrees: f32) -> RgbaImage;

    /// Keep the pixels inside `contour` (image-normalized coordinates).
    fn mask(
        &self,
        image: &RgbaImageView<'_>,
        contour: &Contour,
        background: MaskBackground,
    ) -> Result<RgbaImage, CapabilityError>;
}

/// One line or word found by text recognition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecognizedText {
    pub text: String,
    pub bbox: NormRect,
}

/// Optical character recognition.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &RgbaImageView<'_>) -> Result<Vec<RecognizedText>, CapabilityError>;
}

/// Bundle of capabilities shared by both pipelines.
#[derive(Clone)]
pub struct VisionBackend {
    pub contours: Arc<dyn ContourExtractor>,
    pub embedder: Arc<dyn VisualEmbedder>,
    pub transform: Arc<dyn ImageTransform>,
    /// Only used by reference extraction's label-grid strategy.
    pub text: Option<Arc<dyn TextRecognizer>>,
}

impl VisionBackend {
    pub fn new(
        contours: Arc<dyn ContourExtractor>,
        embedder: Arc<dyn VisualEmbedder>,
        transform: Arc<dyn ImageTransform>,
    ) -> Self {
        Self {
            contours,
            embedder,
            transform,
            text: None,
        }
    }

    pub fn with_text_recognizer(mut self, text: Arc<dyn TextRecognizer>) -> Self {
        self.text = Some(text);
        self
    }
}

impl std::fmt::Debug for VisionBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisionBackend")
            .field("text", &self.text.is_some())
            .finish_non_exhaustive()
    }
}
