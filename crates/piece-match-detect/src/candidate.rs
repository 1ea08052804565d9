use piece_match_core::{Contour, NormRect, ReferenceId};
use serde::{Deserialize, Serialize};

/// Whether a candidate agrees with its reference in color as well as shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    ShapeOnly,
    ShapeAndColor,
}

/// Per-signal similarities behind a candidate's score, each in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignalScores {
    pub moment: f32,
    pub compactness: f32,
    /// Neutral value when `embedding_available` is false.
    pub embedding: f32,
    pub color: f32,
    pub embedding_available: bool,
}

/// A frame region matched to one reference.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PieceCandidate {
    /// Bounding rect of the region, normalized to the frame.
    pub region: NormRect,
    /// Outline of the region, normalized to the frame.
    pub contour: Contour,
    pub reference_id: ReferenceId,
    pub match_type: MatchType,
    /// Combined weighted score in `[0, 1]`.
    pub score: f32,
    /// ΔE between the region color and the reference color.
    pub color_distance: f32,
    pub signals: SignalScores,
}
