use serde::{Deserialize, Serialize};

use crate::MatchParamsError;

/// Tolerance on `sum(weights) == 1`.
const WEIGHT_SUM_TOLERANCE: f32 = 1e-3;

/// Contribution of each signal to the combined score.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub moment: f32,
    pub compactness: f32,
    pub embedding: f32,
    pub color: f32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            moment: 0.25,
            compactness: 0.15,
            embedding: 0.25,
            color: 0.35,
        }
    }
}

impl ScoreWeights {
    #[inline]
    pub fn sum(&self) -> f32 {
        self.moment + self.compactness + self.embedding + self.color
    }
}

/// Configuration of [`crate::FrameMatcher`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchParams {
    /// Longest side of the frame after downsampling.
    pub max_frame_dimension: usize,
    /// Contrast hint forwarded to contour extraction.
    pub contrast_adjustment: f32,
    /// Contours requested per frame.
    pub max_contours: usize,
    /// Smallest contour bbox considered, as a fraction of the frame.
    pub min_region_area: f32,
    /// Largest contour bbox considered, as a fraction of the frame.
    pub max_region_area: f32,
    /// Fraction of the contour bbox sampled for its dominant color when the
    /// contour mask yields no opaque pixel.
    pub central_color_fraction: f32,
    /// References farther than this (ΔE) from the region color are not scored.
    pub prefilter_color_distance: f32,
    /// A match within this ΔE counts as shape-and-color.
    pub color_match_distance: f32,
    pub min_moment_similarity: f32,
    pub min_compactness_similarity: f32,
    /// Minimum combined score for a candidate.
    pub min_score: f32,
    /// Raw embedding distance that maps to zero similarity.
    pub embedding_distance_cutoff: f32,
    /// Embedding similarity assumed when no embedding could be computed.
    pub neutral_embedding_similarity: f32,
    pub weights: ScoreWeights,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            max_frame_dimension: 512,
            contrast_adjustment: 1.0,
            max_contours: 16,
            min_region_area: 0.001,
            max_region_area: 0.6,
            central_color_fraction: 0.6,
            prefilter_color_distance: 40.0,
            color_match_distance: 15.0,
            min_moment_similarity: 0.25,
            min_compactness_similarity: 0.6,
            min_score: 0.55,
            embedding_distance_cutoff: 70.0,
            neutral_embedding_similarity: 0.5,
            weights: ScoreWeights::default(),
        }
    }
}

impl MatchParams {
    /// Reject configurations the matcher cannot run with.
    pub fn validate(&self) -> Result<(), MatchParamsError> {
        let w = &self.weights;
        for (name, value) in [
            ("moment", w.moment),
            ("compactness", w.compactness),
            ("embedding", w.embedding),
            ("color", w.color),
        ] {
            if value < 0.0 {
                return Err(MatchParamsError::NegativeWeight { name });
            }
        }
        let sum = w.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(MatchParamsError::WeightsDoNotSumToOne { sum });
        }
        if self.min_region_area > self.max_region_area {
            return Err(MatchParamsError::RegionAreaOutOfOrder {
                min: self.min_region_area,
                max: self.max_region_area,
            });
        }
        if self.color_match_distance > self.prefilter_color_distance {
            return Err(MatchParamsError::ColorThresholdsOutOfOrder {
                matched: self.color_match_distance,
                prefilter: self.prefilter_color_distance,
            });
        }
        for (name, ok) in [
            ("max_frame_dimension", self.max_frame_dimension > 0),
            ("max_contours", self.max_contours > 0),
            ("prefilter_color_distance", self.prefilter_color_distance > 0.0),
            ("embedding_distance_cutoff", self.embedding_distance_cutoff > 0.0),
        ] {
            if !ok {
                return Err(MatchParamsError::NotPositive { name });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert_eq!(MatchParams::default().validate(), Ok(()));
        assert!((ScoreWeights::default().sum() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn weights_must_sum_to_one() {
        let params = MatchParams {
            weights: ScoreWeights {
                color: 0.5,
                ..ScoreWeights::default()
            },
            ..MatchParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(MatchParamsError::WeightsDoNotSumToOne { .. })
        ));
    }

    #[test]
    fn thresholds_must_be_ordered() {
        let params = MatchParams {
            color_match_distance: 50.0,
            ..MatchParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(MatchParamsError::ColorThresholdsOutOfOrder { .. })
        ));

        let params = MatchParams {
            min_region_area: 0.7,
            ..MatchParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(MatchParamsError::RegionAreaOutOfOrder { .. })
        ));
    }

    #[test]
    fn json_overrides_nested_weights() {
        let params: MatchParams =
            serde_json::from_str(r#"{ "min_score": 0.7, "weights": { "moment": 0.4, "color": 0.2 } }"#)
                .expect("parse");
        assert_eq!(params.min_score, 0.7);
        assert_eq!(params.weights.compactness, 0.15);
        assert_eq!(params.validate(), Ok(()));
    }
}
