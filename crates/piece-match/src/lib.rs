//! High-level facade crate for the `piece-match-*` workspace.
//!
//! This crate provides:
//! - stable re-exports of the core types and both pipelines
//! - (feature-gated) a pure-CPU vision backend on top of the `image` crate
//!   and end-to-end helpers that run it on `image::RgbaImage`
//! - JSON configuration, reference libraries and match reports
//!
//! ## Quickstart
//!
//! ```no_run
//! use piece_match::detect;
//! use piece_match::matcher::MatchParams;
//! use piece_match::reference::{ExtractParams, Orientation};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manual = image::open("manual_page.png")?.to_rgba8();
//! let extracted =
//!     detect::extract_references(&manual, Orientation::Up, Vec::new(), ExtractParams::default())?;
//!
//! let frame = image::open("frame.png")?.to_rgba8();
//! let candidates = detect::match_frame(&frame, &extracted.descriptors, MatchParams::default())?;
//! println!("matched regions: {}", candidates.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `piece_match::core`: shape signatures, Lab color, capability traits.
//! - `piece_match::reference`: parts-list photo to reference descriptors.
//! - `piece_match::matcher`: frame matching, reference sets, background worker.
//! - `piece_match::cpu` (feature `image`): contour, transform and embedding backend.
//! - `piece_match::detect` (feature `image`): end-to-end helpers from `image::RgbaImage`.
//! - `piece_match::io`: JSON config and report files.

pub use piece_match_core as core;
pub use piece_match_detect as matcher;
pub use piece_match_reference as reference;

pub use piece_match_core::{ReferenceDescriptor, ReferenceId, VisionBackend};
pub use piece_match_detect::{FrameMatcher, MatchParams, PieceCandidate};
pub use piece_match_reference::{ExtractParams, ReferenceExtractor};

#[cfg(feature = "image")]
pub mod cpu;
#[cfg(feature = "image")]
pub mod detect;
pub mod io;
