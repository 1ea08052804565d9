/// Errors returned by reference extraction.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("no reference piece found in the photo")]
    NoReferenceFound,
    #[error("invalid extraction parameters: {0}")]
    InvalidParams(String),
}
