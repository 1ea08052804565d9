//! Building one reference descriptor from a chosen outline.

use piece_match_core::{
    compute_shape_signature, sample_opaque_region, sample_region, Contour, MaskBackground,
    NormRect, ReferenceDescriptor, RgbaImageView, VisionBackend,
};

use crate::params::ExtractParams;

/// Build the descriptor of the piece outlined by `contour` (photo-normalized).
///
/// Returns `None` when the piece is too small to embed or no rotation
/// produced an embedding.
pub fn build_descriptor(
    backend: &VisionBackend,
    photo: &RgbaImageView<'_>,
    contour: &Contour,
    params: &ExtractParams,
) -> Option<ReferenceDescriptor> {
    let bounds = contour
        .bounding_rect()
        .pixel_bounds(photo.width, photo.height)?;
    if bounds.width() < params.min_embedding_dimension
        || bounds.height() < params.min_embedding_dimension
    {
        log::debug!(
            "skipping {}x{} px region below embedding size",
            bounds.width(),
            bounds.height()
        );
        return None;
    }
    let region = bounds.to_norm_rect(photo.width, photo.height);
    let crop = match backend.transform.crop(photo, region) {
        Ok(crop) => crop,
        Err(err) => {
            log::debug!("cropping reference region {region:?} failed: {err}");
            return None;
        }
    };
    let view = crop.view();

    let pixel_contour = contour.scaled(photo.width as f32, photo.height as f32);
    let shape = compute_shape_signature(&pixel_contour);

    let embeddings: Vec<_> = params
        .rotations
        .iter()
        .filter_map(|&degrees| {
            let rotated = backend.transform.rotate(&view, degrees);
            backend
                .embedder
                .extract(&rotated.view())
                .map_err(|err| log::debug!("embedding at {degrees} deg unavailable: {err}"))
                .ok()
        })
        .collect();
    if embeddings.is_empty() {
        return None;
    }

    let masked_color = contour
        .to_subrect(&region)
        .and_then(|local| {
            backend
                .transform
                .mask(&view, &local, MaskBackground::Transparent)
                .map_err(|err| log::debug!("masking reference region failed: {err}"))
                .ok()
        })
        .and_then(|masked| sample_opaque_region(&masked.view()));
    let color = masked_color.unwrap_or_else(|| {
        sample_region(&view, NormRect::UNIT.central(params.central_color_fraction))
    });

    ReferenceDescriptor::new(shape, color, embeddings, region, crop)
}
