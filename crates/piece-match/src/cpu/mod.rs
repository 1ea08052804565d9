//! Pure-CPU vision backend built on the `image` crate.
//!
//! Covers contour extraction, raster transforms and a small gradient
//! embedding. Text recognition is not provided; attach a
//! [`piece_match_core::TextRecognizer`] (or [`FixedLabels`]) to enable the
//! label-grid extraction strategy.

mod contours;
mod embed;
mod transform;

use std::sync::Arc;

use piece_match_core::{
    CapabilityError, RecognizedText, RgbaImage, RgbaImageView, TextRecognizer, VisionBackend,
};
use serde::{Deserialize, Serialize};

pub use contours::{ContourParams, ThresholdContours};
pub use embed::{EmbedParams, GradientEmbedder};
pub use transform::RasterTransform;

/// Settings of the CPU backend.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuBackendParams {
    pub contours: ContourParams,
    pub embedding: EmbedParams,
}

/// Build a [`VisionBackend`] from the CPU capabilities.
pub fn cpu_backend(params: &CpuBackendParams) -> VisionBackend {
    VisionBackend::new(
        Arc::new(ThresholdContours::new(params.contours.clone())),
        Arc::new(GradientEmbedder::new(params.embedding.clone())),
        Arc::new(RasterTransform),
    )
}

/// Text recognizer that reports a fixed set of labels, e.g. loaded from JSON.
#[derive(Clone, Debug, Default)]
pub struct FixedLabels {
    labels: Vec<RecognizedText>,
}

impl FixedLabels {
    pub fn new(labels: Vec<RecognizedText>) -> Self {
        Self { labels }
    }
}

impl TextRecognizer for FixedLabels {
    fn recognize(
        &self,
        _image: &RgbaImageView<'_>,
    ) -> Result<Vec<RecognizedText>, CapabilityError> {
        Ok(self.labels.clone())
    }
}

pub(crate) fn to_image_crate(view: &RgbaImageView<'_>) -> Option<::image::RgbaImage> {
    let len = view.width * view.height * 4;
    let data = view.data.get(..len)?.to_vec();
    ::image::RgbaImage::from_raw(view.width as u32, view.height as u32, data)
}

pub(crate) fn from_image_crate(img: ::image::RgbaImage) -> RgbaImage {
    let (w, h) = (img.width() as usize, img.height() as usize);
    RgbaImage::from_raw(w, h, img.into_raw()).unwrap_or_default()
}
