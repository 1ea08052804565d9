//! Histogram-of-gradients embedding.

use ::image::imageops::{self, FilterType};
use piece_match_core::{CapabilityError, RgbaImageView, VisualEmbedder, VisualEmbedding};
use serde::{Deserialize, Serialize};

use super::to_image_crate;

/// Largest L2 distance between two unit vectors with non-negative entries.
const MAX_UNIT_DISTANCE: f32 = std::f32::consts::SQRT_2;
/// Upper end of the reported distance range.
const DISTANCE_SCALE: f32 = 70.0;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedParams {
    /// Images smaller than this on either side are rejected.
    pub min_size: usize,
    /// Side of the square thumbnail the gradients are computed on.
    pub thumbnail: usize,
    /// Cells per side.
    pub grid: usize,
    /// Unsigned orientation bins per cell.
    pub bins: usize,
}

impl Default for EmbedParams {
    fn default() -> Self {
        Self {
            min_size: 20,
            thumbnail: 32,
            grid: 4,
            bins: 8,
        }
    }
}

/// Per-cell gradient orientation histograms over a fixed-size thumbnail,
/// L2-normalized. Distances fall in `[0, 70]`.
#[derive(Clone, Debug, Default)]
pub struct GradientEmbedder {
    params: EmbedParams,
}

impl GradientEmbedder {
    pub fn new(params: EmbedParams) -> Self {
        Self { params }
    }

    fn luma_thumbnail(&self, image: &RgbaImageView<'_>) -> Result<Vec<f32>, CapabilityError> {
        let side = self.params.thumbnail.max(self.params.grid.max(1) * 2) as u32;
        let src = to_image_crate(image).ok_or_else(|| {
            CapabilityError::Backend("RGBA buffer does not match the image size".into())
        })?;
        let thumb = imageops::resize(&src, side, side, FilterType::Triangle);
        Ok(thumb
            .pixels()
            .map(|p| {
                // Premultiplied: transparent pixels read as black.
                (0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32) / 255.0
            })
            .collect())
    }
}

impl VisualEmbedder for GradientEmbedder {
    fn extract(&self, image: &RgbaImageView<'_>) -> Result<VisualEmbedding, CapabilityError> {
        let min = self.params.min_size;
        if image.width < min || image.height < min {
            return Err(CapabilityError::ImageTooSmall {
                width: image.width,
                height: image.height,
                min,
            });
        }
        let luma = self.luma_thumbnail(image)?;
        let side = (luma.len() as f64).sqrt() as usize;
        let grid = self.params.grid.max(1);
        let bins = self.params.bins.max(1);
        let cell = side / grid;
        let mut hist = vec![0f32; grid * grid * bins];

        let at = |x: usize, y: usize| luma[y * side + x];
        for y in 1..side.saturating_sub(1) {
            for x in 1..side.saturating_sub(1) {
                let gx = at(x + 1, y) - at(x - 1, y);
                let gy = at(x, y + 1) - at(x, y - 1);
                let mag = (gx * gx + gy * gy).sqrt();
                if mag <= f32::EPSILON {
                    continue;
                }
                let angle = gy.atan2(gx).rem_euclid(std::f32::consts::PI);
                let bin = ((angle / std::f32::consts::PI) * bins as f32) as usize % bins;
                let cx = (x / cell.max(1)).min(grid - 1);
                let cy = (y / cell.max(1)).min(grid - 1);
                hist[(cy * grid + cx) * bins + bin] += mag;
            }
        }

        let norm = hist.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut hist {
                *v /= norm;
            }
        }
        Ok(VisualEmbedding::new(hist))
    }

    fn distance(&self, a: &VisualEmbedding, b: &VisualEmbedding) -> Result<f32, CapabilityError> {
        if a.len() != b.len() {
            return Err(CapabilityError::Backend(format!(
                "embedding length mismatch: {} vs {}",
                a.len(),
                b.len()
            )));
        }
        let l2 = a
            .as_slice()
            .iter()
            .zip(b.as_slice())
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt();
        Ok((l2 / MAX_UNIT_DISTANCE * DISTANCE_SCALE).min(DISTANCE_SCALE))
    }
}
