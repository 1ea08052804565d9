use serde::{Deserialize, Serialize};

/// Label-grid segmentation settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelGridParams {
    /// Horizontal gap between label centers (normalized) that starts a new column.
    pub column_gap: f32,
    /// Largest quantity accepted in a label like `"12x"`.
    pub max_quantity: u32,
}

impl Default for LabelGridParams {
    fn default() -> Self {
        Self {
            column_gap: 0.08,
            max_quantity: 999,
        }
    }
}

/// Bordered-box (structural) segmentation settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StructuralParams {
    /// Minimum bbox area of a box, as a fraction of the photo.
    pub box_min_area: f32,
    /// Maximum bbox area of a box, as a fraction of the photo.
    pub box_max_area: f32,
    /// Minimum `polygon area / bbox area` for a contour to count as a box.
    pub box_min_fill: f32,
    /// Inset applied to a box before searching inside it (normalized, photo units).
    pub box_inset: f32,
    /// Contours requested from the backend for box search.
    pub max_contours: usize,
}

impl Default for StructuralParams {
    fn default() -> Self {
        Self {
            box_min_area: 0.02,
            box_max_area: 0.95,
            box_min_fill: 0.85,
            box_inset: 0.01,
            max_contours: 16,
        }
    }
}

/// Per-cell contour selection settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CellSelectParams {
    /// Contours requested from the backend per cell.
    pub max_contours: usize,
    /// Contrast hint forwarded to contour extraction.
    pub contrast_adjustment: f32,
    /// Minimum bbox area of a contour as a fraction of its cell.
    pub min_cell_fill: f32,
    /// Contours whose lightness is within this many L units of the cell
    /// background are rejected.
    pub background_lightness_tolerance: f32,
    /// Width of the cell border strips used to estimate the background.
    pub background_strip: f32,
    /// Distance (cell-normalized) under which a contour counts as touching
    /// the cell edge.
    pub edge_margin: f32,
}

impl Default for CellSelectParams {
    fn default() -> Self {
        Self {
            max_contours: 8,
            contrast_adjustment: 1.0,
            min_cell_fill: 0.01,
            background_lightness_tolerance: 8.0,
            background_strip: 0.05,
            edge_margin: 0.01,
        }
    }
}

/// Configuration of [`crate::ReferenceExtractor`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractParams {
    /// Longest side of the photo after downsampling.
    pub max_dimension: usize,
    /// Crops smaller than this on either side are skipped.
    pub min_embedding_dimension: usize,
    /// Rotations (degrees) for which an embedding is stored.
    pub rotations: Vec<f32>,
    /// Fraction of the crop sampled for color when no mask is available.
    pub central_color_fraction: f32,
    /// A contour whose bbox lies at least this much inside a larger kept box
    /// is dropped.
    pub containment_threshold: f32,
    pub labels: LabelGridParams,
    pub structural: StructuralParams,
    pub cell: CellSelectParams,
}

impl Default for ExtractParams {
    fn default() -> Self {
        Self {
            max_dimension: 1024,
            min_embedding_dimension: 20,
            rotations: vec![0.0, 90.0, 180.0, 270.0],
            central_color_fraction: 0.6,
            containment_threshold: 0.5,
            labels: LabelGridParams::default(),
            structural: StructuralParams::default(),
            cell: CellSelectParams::default(),
        }
    }
}

impl ExtractParams {
    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_dimension == 0 {
            return Err("max_dimension must be positive".into());
        }
        if self.rotations.is_empty() {
            return Err("at least one rotation is required".into());
        }
        if !(self.central_color_fraction > 0.0 && self.central_color_fraction <= 1.0) {
            return Err("central_color_fraction must be in (0, 1]".into());
        }
        if !(0.0..=1.0).contains(&self.containment_threshold) {
            return Err("containment_threshold must be in [0, 1]".into());
        }
        if self.structural.box_min_area > self.structural.box_max_area {
            return Err("structural box_min_area exceeds box_max_area".into());
        }
        Ok(())
    }
}
