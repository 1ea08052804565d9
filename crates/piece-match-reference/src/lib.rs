//! Reference extraction: from a photographed parts list to per-piece
//! descriptors.
//!
//! The photo is turned upright, downsampled and split into search cells by
//! the first strategy that finds anything:
//! - a label grid built from recognized quantity labels (`"2x"`),
//! - bordered boxes found among the photo's own contours,
//! - the whole photo as one cell.
//!
//! Each cell contributes at most one outline. Outlines nested inside larger
//! ones are suppressed, and every survivor becomes a
//! [`piece_match_core::ReferenceDescriptor`] with a shape signature, a
//! dominant color and one embedding per configured rotation.

mod cell;
mod descriptor;
mod error;
mod labels;
mod params;
mod photo;
mod pipeline;
mod structural;
mod suppress;

pub use cell::select_cell_contour;
pub use descriptor::build_descriptor;
pub use error::ExtractError;
pub use labels::{label_grid_cells, parse_quantity_label, quantity_labels, QuantityLabel};
pub use params::{CellSelectParams, ExtractParams, LabelGridParams, StructuralParams};
pub use photo::{Orientation, ReferencePhoto};
pub use pipeline::{ExtractionResult, ReferenceExtractor, SegmentationStrategy};
pub use structural::structural_cells;
pub use suppress::suppress_contained;
