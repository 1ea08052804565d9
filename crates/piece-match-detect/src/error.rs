/// Configuration problems found by [`crate::MatchParams::validate`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum MatchParamsError {
    #[error("score weights must sum to 1 (got {sum})")]
    WeightsDoNotSumToOne { sum: f32 },
    #[error("score weight `{name}` is negative")]
    NegativeWeight { name: &'static str },
    #[error("region area bounds out of order: min {min}, max {max}")]
    RegionAreaOutOfOrder { min: f32, max: f32 },
    #[error("color match distance {matched} exceeds prefilter distance {prefilter}")]
    ColorThresholdsOutOfOrder { matched: f32, prefilter: f32 },
    #[error("`{name}` must be positive")]
    NotPositive { name: &'static str },
}
