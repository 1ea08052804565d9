use piece_match_core::{
    compactness_similarity, compute_shape_signature, moment_distance, moment_similarity,
    sample_opaque_region, sample_region, ColorSample, Contour, MaskBackground, NormRect,
    ReferenceDescriptor, RgbaImage, RgbaImageView, VisionBackend, VisualEmbedding,
};
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::candidate::{PieceCandidate, SignalScores};
use crate::flight::FlightGuard;
use crate::params::MatchParams;
use crate::score::{classify_match, color_similarity, combined_score, embedding_similarity};
use crate::MatchParamsError;

/// Result of offering a frame to [`FrameMatcher::process_frame`].
#[derive(Clone, Debug, PartialEq)]
pub enum FrameOutcome {
    /// Another frame was in flight, or there was nothing to match against.
    Skipped,
    /// At most one candidate per matched region.
    Matched(Vec<PieceCandidate>),
}

/// Matches the regions of camera frames against reference descriptors.
#[derive(Clone, Debug)]
pub struct FrameMatcher {
    backend: VisionBackend,
    params: MatchParams,
    flight: FlightGuard,
}

impl FrameMatcher {
    pub fn new(backend: VisionBackend, params: MatchParams) -> Result<Self, MatchParamsError> {
        params.validate()?;
        Ok(Self {
            backend,
            params,
            flight: FlightGuard::new(),
        })
    }

    #[inline]
    pub fn params(&self) -> &MatchParams {
        &self.params
    }

    /// Guard shared by [`Self::process_frame`] and any worker built on this matcher.
    #[inline]
    pub fn flight(&self) -> &FlightGuard {
        &self.flight
    }

    /// Match a frame unless one is already in flight.
    ///
    /// Returns [`FrameOutcome::Skipped`] immediately, without blocking, when
    /// another frame holds the flight or `references` is empty.
    pub fn process_frame(
        &self,
        frame: &RgbaImageView<'_>,
        references: &[ReferenceDescriptor],
    ) -> FrameOutcome {
        if references.is_empty() {
            return FrameOutcome::Skipped;
        }
        let Some(_token) = self.flight.try_begin() else {
            log::trace!("frame skipped: another frame in flight");
            return FrameOutcome::Skipped;
        };
        FrameOutcome::Matched(self.match_frame(frame, references))
    }

    /// Match a frame without the single-flight guard.
    ///
    /// Deterministic for identical inputs and backend.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self, frame, references),
            fields(width = frame.width, height = frame.height, references = references.len())
        )
    )]
    pub fn match_frame(
        &self,
        frame: &RgbaImageView<'_>,
        references: &[ReferenceDescriptor],
    ) -> Vec<PieceCandidate> {
        if references.is_empty() || frame.is_empty() {
            return Vec::new();
        }
        let image = self
            .backend
            .transform
            .downsample(frame, self.params.max_frame_dimension);
        let view = image.view();

        let contours = match self.backend.contours.detect(
            &view,
            self.params.contrast_adjustment,
            self.params.max_contours,
        ) {
            Ok(contours) => contours,
            Err(err) => {
                log::warn!("contour extraction failed on frame: {err}");
                return Vec::new();
            }
        };

        let candidates: Vec<PieceCandidate> = contours
            .iter()
            .filter(|c| {
                let area = c.bounding_rect().area();
                area >= self.params.min_region_area && area <= self.params.max_region_area
            })
            .filter_map(|c| self.match_region(&view, c, references))
            .collect();
        log::debug!(
            "{} contours, {} candidates against {} references",
            contours.len(),
            candidates.len(),
            references.len()
        );
        candidates
    }

    fn crop_region(&self, view: &RgbaImageView<'_>, region: NormRect) -> Option<RgbaImage> {
        match self.backend.transform.crop(view, region) {
            Ok(crop) => Some(crop),
            Err(err) => {
                log::debug!("cropping frame region {region:?} failed: {err}");
                None
            }
        }
    }

    /// Mean color of the pixels inside `contour`, sampled the same way as
    /// reference colors. Falls back to the central part of the bounding box.
    fn region_color(
        &self,
        view: &RgbaImageView<'_>,
        crop: Option<&RgbaImage>,
        contour: &Contour,
        region: NormRect,
    ) -> ColorSample {
        let masked = crop.zip(contour.to_subrect(&region)).and_then(|(crop, local)| {
            self.backend
                .transform
                .mask(&crop.view(), &local, MaskBackground::Transparent)
                .map_err(|err| log::debug!("masking frame region failed: {err}"))
                .ok()
        });
        masked
            .and_then(|m| sample_opaque_region(&m.view()))
            .unwrap_or_else(|| {
                sample_region(view, region.central(self.params.central_color_fraction))
            })
    }

    fn region_embedding(&self, crop: &RgbaImage) -> Option<VisualEmbedding> {
        match self.backend.embedder.extract(&crop.view()) {
            Ok(embedding) => Some(embedding),
            Err(err) => {
                log::debug!("frame region embedding unavailable: {err}");
                None
            }
        }
    }

    /// Best-scoring reference for one contour; ties keep the earlier reference.
    fn match_region(
        &self,
        view: &RgbaImageView<'_>,
        contour: &Contour,
        references: &[ReferenceDescriptor],
    ) -> Option<PieceCandidate> {
        let p = &self.params;
        let region = contour
            .bounding_rect()
            .pixel_bounds(view.width, view.height)?
            .to_norm_rect(view.width, view.height);

        let crop = self.crop_region(view, region);
        let color = self.region_color(view, crop.as_ref(), contour, region);
        let survivors: Vec<(&ReferenceDescriptor, f32)> = references
            .iter()
            .map(|r| (r, color.distance(r.color())))
            .filter(|(_, de)| *de <= p.prefilter_color_distance)
            .collect();
        if survivors.is_empty() {
            return None;
        }

        let pixel_contour = contour.scaled(view.width as f32, view.height as f32);
        let shape = compute_shape_signature(&pixel_contour);
        let embedding = crop.as_ref().and_then(|c| self.region_embedding(c));

        let mut best: Option<PieceCandidate> = None;
        for (reference, de) in survivors {
            let moment = moment_similarity(moment_distance(&shape, reference.shape())) as f32;
            if moment < p.min_moment_similarity {
                continue;
            }
            let compactness =
                compactness_similarity(shape.compactness, reference.shape().compactness) as f32;
            if compactness < p.min_compactness_similarity {
                continue;
            }
            let embedding_sim = embedding.as_ref().and_then(|e| {
                embedding_similarity(
                    self.backend.embedder.as_ref(),
                    e,
                    reference.embeddings(),
                    p.embedding_distance_cutoff,
                )
            });
            let signals = SignalScores {
                moment,
                compactness,
                embedding: embedding_sim.unwrap_or(p.neutral_embedding_similarity),
                color: color_similarity(de, p.prefilter_color_distance),
                embedding_available: embedding_sim.is_some(),
            };
            let score = combined_score(&signals, &p.weights);
            if score < p.min_score {
                continue;
            }
            if best.as_ref().is_some_and(|b| score <= b.score) {
                continue;
            }
            best = Some(PieceCandidate {
                region,
                contour: contour.clone(),
                reference_id: reference.id(),
                match_type: classify_match(de, p.color_match_distance),
                score,
                color_distance: de,
                signals,
            });
        }
        best
    }
}
