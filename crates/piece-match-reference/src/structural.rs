//! Bordered-box segmentation.
//!
//! Parts lists without readable labels usually frame each piece in a
//! rectangle. Those rectangles show up as large contours whose polygon fills
//! almost all of their bounding box.

use piece_match_core::{Contour, NormRect};

use crate::params::StructuralParams;

/// Fraction of a smaller box that must lie inside a larger one for the
/// larger box to count as a frame around it.
const NESTED_BOX_CONTAINMENT: f32 = 0.9;

fn fill_ratio(contour: &Contour, bbox: &NormRect) -> f32 {
    let bbox_area = bbox.area();
    if bbox_area <= 0.0 {
        return 0.0;
    }
    (contour.area() as f32 / bbox_area).min(1.0)
}

/// Boxes among `contours` (photo-normalized), inset, innermost only.
///
/// A box that frames another box (a page border around a grid of cells, say)
/// is dropped in favour of the boxes inside it.
pub fn structural_cells(contours: &[Contour], params: &StructuralParams) -> Vec<NormRect> {
    let boxes: Vec<NormRect> = contours
        .iter()
        .filter_map(|c| {
            let bbox = c.bounding_rect();
            let area = bbox.area();
            (area >= params.box_min_area
                && area <= params.box_max_area
                && fill_ratio(c, &bbox) >= params.box_min_fill)
                .then_some(bbox)
        })
        .collect();

    boxes
        .iter()
        .enumerate()
        .filter(|(i, outer)| {
            !boxes.iter().enumerate().any(|(j, inner)| {
                *i != j
                    && inner.area() < outer.area()
                    && inner.containment_in(outer) >= NESTED_BOX_CONTAINMENT
            })
        })
        .map(|(_, b)| b.inset(params.box_inset).clamp_unit())
        .filter(|b| !b.is_empty())
        .collect()
}
