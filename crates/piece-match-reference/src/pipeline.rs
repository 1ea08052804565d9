use piece_match_core::{
    Contour, NormRect, ReferenceDescriptor, RgbaImage, RgbaImageView, VisionBackend,
};
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::cell::select_cell_contour;
use crate::descriptor::build_descriptor;
use crate::labels::{label_grid_cells, quantity_labels};
use crate::params::ExtractParams;
use crate::photo::ReferencePhoto;
use crate::structural::structural_cells;
use crate::suppress::suppress_contained;
use crate::ExtractError;

/// How the photo was split into search cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentationStrategy {
    /// One cell above each recognized quantity label.
    LabelGrid,
    /// Bordered boxes found among the photo's contours.
    Structural,
    /// The whole photo as a single cell.
    WholeImage,
}

impl SegmentationStrategy {
    /// Strategies in the order they are attempted.
    pub const CASCADE: [SegmentationStrategy; 3] = [
        SegmentationStrategy::LabelGrid,
        SegmentationStrategy::Structural,
        SegmentationStrategy::WholeImage,
    ];
}

/// Descriptors plus the intermediate geometry that produced them.
///
/// `cells` and `contours` are normalized to the upright, downsampled photo.
#[derive(Clone, Debug)]
pub struct ExtractionResult {
    pub descriptors: Vec<ReferenceDescriptor>,
    pub strategy: SegmentationStrategy,
    pub cells: Vec<NormRect>,
    /// Outlines that survived containment suppression, largest first.
    pub contours: Vec<Contour>,
}

/// Turns a parts-list photo into reference descriptors.
///
/// Stateless between calls; one extractor may serve several threads.
#[derive(Clone, Debug)]
pub struct ReferenceExtractor {
    backend: VisionBackend,
    params: ExtractParams,
}

impl ReferenceExtractor {
    pub fn new(backend: VisionBackend, params: ExtractParams) -> Result<Self, ExtractError> {
        params.validate().map_err(ExtractError::InvalidParams)?;
        Ok(Self { backend, params })
    }

    #[inline]
    pub fn params(&self) -> &ExtractParams {
        &self.params
    }

    #[inline]
    pub fn backend(&self) -> &VisionBackend {
        &self.backend
    }

    /// Extract one descriptor per piece found in `photo`.
    ///
    /// Fails with [`ExtractError::NoReferenceFound`] only when no descriptor
    /// at all could be built.
    pub fn extract(
        &self,
        photo: &ReferencePhoto<'_>,
    ) -> Result<Vec<ReferenceDescriptor>, ExtractError> {
        self.extract_detailed(photo).map(|r| r.descriptors)
    }

    /// Like [`Self::extract`], also reporting the strategy and geometry used.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self, photo),
            fields(width = photo.image.width, height = photo.image.height)
        )
    )]
    pub fn extract_detailed(
        &self,
        photo: &ReferencePhoto<'_>,
    ) -> Result<ExtractionResult, ExtractError> {
        let image = self.prepare(photo);
        let view = image.view();

        for strategy in SegmentationStrategy::CASCADE {
            let cells = self.cells_for(strategy, &view);
            if cells.is_empty() {
                log::debug!("{strategy:?}: no cells");
                continue;
            }
            let contours: Vec<Contour> = cells
                .iter()
                .filter_map(|cell| {
                    select_cell_contour(&self.backend, &view, *cell, &self.params.cell)
                })
                .collect();
            if contours.is_empty() {
                log::debug!("{strategy:?}: {} cells, no piece outline", cells.len());
                continue;
            }
            let contours = suppress_contained(contours, self.params.containment_threshold);
            let descriptors = self.build_descriptors(&view, &contours);
            if descriptors.is_empty() {
                log::debug!(
                    "{strategy:?}: {} outlines, none could be described",
                    contours.len()
                );
                continue;
            }
            log::info!(
                "extracted {} references from {} cells ({strategy:?})",
                descriptors.len(),
                cells.len()
            );
            return Ok(ExtractionResult {
                descriptors,
                strategy,
                cells,
                contours,
            });
        }
        Err(ExtractError::NoReferenceFound)
    }

    /// Upright and downsampled copy of the photo.
    fn prepare(&self, photo: &ReferencePhoto<'_>) -> RgbaImage {
        let transform = &self.backend.transform;
        let degrees = photo.orientation.correction_degrees();
        if degrees == 0.0 {
            transform.downsample(&photo.image, self.params.max_dimension)
        } else {
            let upright = transform.rotate(&photo.image, degrees);
            transform.downsample(&upright.view(), self.params.max_dimension)
        }
    }

    fn cells_for(
        &self,
        strategy: SegmentationStrategy,
        view: &RgbaImageView<'_>,
    ) -> Vec<NormRect> {
        match strategy {
            SegmentationStrategy::LabelGrid => {
                let Some(text) = &self.backend.text else {
                    return Vec::new();
                };
                match text.recognize(view) {
                    Ok(items) => {
                        let labels = quantity_labels(&items, &self.params.labels);
                        log::debug!(
                            "{} of {} text items are quantity labels",
                            labels.len(),
                            items.len()
                        );
                        label_grid_cells(&labels, &self.params.labels)
                    }
                    Err(err) => {
                        log::warn!("text recognition failed: {err}");
                        Vec::new()
                    }
                }
            }
            SegmentationStrategy::Structural => {
                let structural = &self.params.structural;
                match self.backend.contours.detect(
                    view,
                    self.params.cell.contrast_adjustment,
                    structural.max_contours,
                ) {
                    Ok(contours) => structural_cells(&contours, structural),
                    Err(err) => {
                        log::warn!("contour extraction failed on the photo: {err}");
                        Vec::new()
                    }
                }
            }
            SegmentationStrategy::WholeImage => vec![NormRect::UNIT],
        }
    }

    fn build_descriptors(
        &self,
        view: &RgbaImageView<'_>,
        contours: &[Contour],
    ) -> Vec<ReferenceDescriptor> {
        let build = |c: &Contour| build_descriptor(&self.backend, view, c, &self.params);

        #[cfg(feature = "rayon")]
        let built: Vec<ReferenceDescriptor> = contours.par_iter().filter_map(build).collect();
        #[cfg(not(feature = "rayon"))]
        let built: Vec<ReferenceDescriptor> = contours.iter().filter_map(build).collect();

        built
    }
}
