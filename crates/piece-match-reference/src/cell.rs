//! Choosing the piece outline inside one search cell.

use piece_match_core::{sample_region, Contour, NormRect, RgbaImageView, VisionBackend};

use crate::params::CellSelectParams;

/// Mean lightness of the four border strips of `image`.
fn border_lightness(image: &RgbaImageView<'_>, strip: f32) -> f32 {
    let s = strip.clamp(0.0, 0.5);
    let strips = [
        NormRect::new(0.0, 0.0, 1.0, s),
        NormRect::new(0.0, 1.0 - s, 1.0, s),
        NormRect::new(0.0, 0.0, s, 1.0),
        NormRect::new(1.0 - s, 0.0, s, 1.0),
    ];
    strips
        .iter()
        .map(|r| sample_region(image, *r).l)
        .sum::<f32>()
        / strips.len() as f32
}

/// Pick the piece outline inside `cell` (photo-normalized).
///
/// Returns the contour in photo coordinates, or `None` when the cell holds
/// nothing usable. Contours that do not touch the cell border are preferred;
/// otherwise the largest touching one is taken.
pub fn select_cell_contour(
    backend: &VisionBackend,
    photo: &RgbaImageView<'_>,
    cell: NormRect,
    params: &CellSelectParams,
) -> Option<Contour> {
    // Snap to whole pixels so cell-local coordinates map back exactly.
    let cell = cell
        .pixel_bounds(photo.width, photo.height)?
        .to_norm_rect(photo.width, photo.height);
    let crop = match backend.transform.crop(photo, cell) {
        Ok(crop) => crop,
        Err(err) => {
            log::debug!("cropping cell {cell:?} failed: {err}");
            return None;
        }
    };
    let view = crop.view();
    let contours = match backend
        .contours
        .detect(&view, params.contrast_adjustment, params.max_contours)
    {
        Ok(contours) => contours,
        Err(err) => {
            log::warn!("contour extraction failed in cell {cell:?}: {err}");
            return None;
        }
    };

    let background_l = border_lightness(&view, params.background_strip);
    let mut touching: Option<&Contour> = None;
    for contour in &contours {
        let bbox = contour.bounding_rect();
        if bbox.area() < params.min_cell_fill {
            continue;
        }
        let l = sample_region(&view, bbox.central(0.6)).l;
        if (l - background_l).abs() < params.background_lightness_tolerance {
            continue;
        }
        if !bbox.touches_edges_of(&NormRect::UNIT, params.edge_margin) {
            return Some(contour.from_subrect(&cell));
        }
        if touching.is_none() {
            touching = Some(contour);
        }
    }
    touching.map(|c| c.from_subrect(&cell))
}
