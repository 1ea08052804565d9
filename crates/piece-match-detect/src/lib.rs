//! Live-frame matching against reference piece descriptors.
//!
//! [`FrameMatcher`] downsamples a frame, extracts contours and scores each
//! region against the references with four signals: Hu moments,
//! compactness, visual embeddings and Lab color. A color pre-filter keeps
//! the per-region work proportional to the plausible references only.
//!
//! Frames are admitted one at a time. [`FrameMatcher::process_frame`] skips
//! a frame when another is in flight; [`FrameWorker`] runs the same rule on
//! a background thread and reports results tagged with the
//! [`ReferenceSet`] generation they were computed against.

mod candidate;
mod error;
mod flight;
mod params;
mod pipeline;
mod reference_set;
mod score;
mod worker;

pub use candidate::{MatchType, PieceCandidate, SignalScores};
pub use error::MatchParamsError;
pub use flight::{FlightGuard, FlightToken};
pub use params::{MatchParams, ScoreWeights};
pub use pipeline::{FrameMatcher, FrameOutcome};
pub use reference_set::{ReferenceSet, ReferenceSnapshot};
pub use score::{
    classify_match, color_similarity, combined_score, embedding_similarity,
    normalize_embedding_distance,
};
pub use worker::{FrameReport, FrameWorker, Submission};
