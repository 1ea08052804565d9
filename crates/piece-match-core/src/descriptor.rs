use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::capability::VisualEmbedding;
use crate::color::ColorSample;
use crate::geometry::{NormRect, ShapeSignature};
use crate::image::RgbaImage;

static NEXT_REFERENCE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a reference piece.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceId(pub u64);

impl ReferenceId {
    /// Allocate a fresh id.
    pub fn next() -> Self {
        Self(NEXT_REFERENCE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ref-{}", self.0)
    }
}

/// Matching identity of one physical piece.
///
/// Built once by reference extraction and never mutated afterwards; share it
/// through `Arc` snapshots rather than cloning into the frame loop.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReferenceDescriptor {
    id: ReferenceId,
    shape: ShapeSignature,
    color: ColorSample,
    embeddings: Vec<VisualEmbedding>,
    /// Bounding rect of the piece in the (oriented) capture photo.
    source_region: NormRect,
    #[serde(skip)]
    preview: RgbaImage,
    #[serde(default)]
    display_color: Option<[u8; 3]>,
}

impl ReferenceDescriptor {
    /// Returns `None` when `embeddings` is empty.
    pub fn new(
        shape: ShapeSignature,
        color: ColorSample,
        embeddings: Vec<VisualEmbedding>,
        source_region: NormRect,
        preview: RgbaImage,
    ) -> Option<Self> {
        if embeddings.is_empty() {
            return None;
        }
        Some(Self {
            id: ReferenceId::next(),
            shape,
            color,
            embeddings,
            source_region,
            preview,
            display_color: None,
        })
    }

    /// Attach the UI color used to tell references apart in overlays.
    pub fn with_display_color(mut self, rgb: [u8; 3]) -> Self {
        self.display_color = Some(rgb);
        self
    }

    #[inline]
    pub fn id(&self) -> ReferenceId {
        self.id
    }

    #[inline]
    pub fn shape(&self) -> &ShapeSignature {
        &self.shape
    }

    #[inline]
    pub fn color(&self) -> &ColorSample {
        &self.color
    }

    /// One embedding per tested rotation (0, 90, 180, 270 degrees), never empty.
    #[inline]
    pub fn embeddings(&self) -> &[VisualEmbedding] {
        &self.embeddings
    }

    #[inline]
    pub fn source_region(&self) -> NormRect {
        self.source_region
    }

    #[inline]
    pub fn preview(&self) -> &RgbaImage {
        &self.preview
    }

    #[inline]
    pub fn display_color(&self) -> Option<[u8; 3]> {
        self.display_color
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(embeddings: Vec<VisualEmbedding>) -> Option<ReferenceDescriptor> {
        ReferenceDescriptor::new(
            ShapeSignature::DEGENERATE,
            ColorSample::neutral_grey(),
            embeddings,
            NormRect::UNIT,
            RgbaImage::new(2, 2),
        )
    }

    #[test]
    fn requires_at_least_one_embedding() {
        assert!(sample(Vec::new()).is_none());
        assert!(sample(vec![VisualEmbedding::new(vec![1.0])]).is_some());
    }

    #[test]
    fn ids_are_unique() {
        let a = sample(vec![VisualEmbedding::new(vec![0.0])]).expect("descriptor");
        let b = sample(vec![VisualEmbedding::new(vec![0.0])]).expect("descriptor");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn serde_skips_preview() {
        let d = sample(vec![VisualEmbedding::new(vec![0.5, 0.25])])
            .expect("descriptor")
            .with_display_color([10, 20, 30]);
        let json = serde_json::to_string(&d).expect("serialize");
        let back: ReferenceDescriptor = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.id(), d.id());
        assert_eq!(back.display_color(), Some([10, 20, 30]));
        assert!(back.preview().is_empty());
        assert_eq!(back.embeddings(), d.embeddings());
    }
}
