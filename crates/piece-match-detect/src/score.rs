//! Signal similarities and their combination.

use piece_match_core::{VisualEmbedder, VisualEmbedding};

use crate::candidate::{MatchType, SignalScores};
use crate::params::ScoreWeights;

/// Map a raw embedding distance into `[0, 1]` (0 = identical).
#[inline]
pub fn normalize_embedding_distance(distance: f32, cutoff: f32) -> f32 {
    if !distance.is_finite() || cutoff <= 0.0 {
        return 1.0;
    }
    (distance / cutoff).clamp(0.0, 1.0)
}

/// `1 - min normalized distance` between `embedding` and any stored rotation.
///
/// `None` when no distance could be computed.
pub fn embedding_similarity(
    embedder: &dyn VisualEmbedder,
    embedding: &VisualEmbedding,
    rotations: &[VisualEmbedding],
    cutoff: f32,
) -> Option<f32> {
    rotations
        .iter()
        .filter_map(|r| match embedder.distance(embedding, r) {
            Ok(d) => Some(normalize_embedding_distance(d, cutoff)),
            Err(err) => {
                log::debug!("embedding distance unavailable: {err}");
                None
            }
        })
        .min_by(f32::total_cmp)
        .map(|d| 1.0 - d)
}

/// Linear similarity from a ΔE within the prefilter radius.
#[inline]
pub fn color_similarity(color_distance: f32, prefilter_distance: f32) -> f32 {
    if prefilter_distance <= 0.0 {
        return 0.0;
    }
    (1.0 - color_distance / prefilter_distance).clamp(0.0, 1.0)
}

/// Weighted sum of the signals.
#[inline]
pub fn combined_score(signals: &SignalScores, weights: &ScoreWeights) -> f32 {
    weights.moment * signals.moment
        + weights.compactness * signals.compactness
        + weights.embedding * signals.embedding
        + weights.color * signals.color
}

#[inline]
pub fn classify_match(color_distance: f32, color_match_distance: f32) -> MatchType {
    if color_distance <= color_match_distance {
        MatchType::ShapeAndColor
    } else {
        MatchType::ShapeOnly
    }
}
