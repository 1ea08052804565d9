//! Quantity-label parsing and label-grid segmentation.
//!
//! Parts lists print a small quantity label (`"2x"`) under each piece. The
//! labels are clustered into columns by horizontal position; within a column
//! each label owns the region between the label above it and its own top.

use piece_match_core::{NormRect, RecognizedText};
use serde::{Deserialize, Serialize};

use crate::params::LabelGridParams;

/// A recognized quantity label.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuantityLabel {
    pub quantity: u32,
    pub bbox: NormRect,
}

/// Parse `"2x"`, `"x2"`, `"2×"`, `"×12"` (case-insensitive, spaces allowed).
pub fn parse_quantity_label(text: &str, max_quantity: u32) -> Option<u32> {
    let t = text.trim().to_lowercase();
    let digits = t
        .strip_suffix('x')
        .or_else(|| t.strip_suffix('×'))
        .or_else(|| t.strip_prefix('x'))
        .or_else(|| t.strip_prefix('×'))?
        .trim();
    if digits.is_empty() || digits.len() > 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n: u32 = digits.parse().ok()?;
    (1..=max_quantity).contains(&n).then_some(n)
}

/// Keep the recognized items that read as quantity labels.
pub fn quantity_labels(texts: &[RecognizedText], params: &LabelGridParams) -> Vec<QuantityLabel> {
    texts
        .iter()
        .filter(|t| !t.bbox.is_empty())
        .filter_map(|t| {
            parse_quantity_label(&t.text, params.max_quantity).map(|quantity| QuantityLabel {
                quantity,
                bbox: t.bbox,
            })
        })
        .collect()
}

struct Column {
    labels: Vec<QuantityLabel>,
    min_x: f32,
    max_x: f32,
}

fn group_columns(labels: &[QuantityLabel], column_gap: f32) -> Vec<Column> {
    let mut sorted = labels.to_vec();
    sorted.sort_by(|a, b| a.bbox.center().x.total_cmp(&b.bbox.center().x));

    let mut columns: Vec<Column> = Vec::new();
    let mut last_x = f32::NEG_INFINITY;
    for label in sorted {
        let cx = label.bbox.center().x;
        match columns.last_mut() {
            Some(col) if cx - last_x <= column_gap => {
                col.min_x = col.min_x.min(label.bbox.min_x());
                col.max_x = col.max_x.max(label.bbox.max_x());
                col.labels.push(label);
            }
            _ => columns.push(Column {
                labels: vec![label],
                min_x: label.bbox.min_x(),
                max_x: label.bbox.max_x(),
            }),
        }
        last_x = cx;
    }
    for col in &mut columns {
        col.labels
            .sort_by(|a, b| a.bbox.center().y.total_cmp(&b.bbox.center().y));
    }
    columns
}

/// One search cell per label, in column-major order (left to right, top to bottom).
pub fn label_grid_cells(labels: &[QuantityLabel], params: &LabelGridParams) -> Vec<NormRect> {
    let columns = group_columns(labels, params.column_gap);
    let mut cells = Vec::with_capacity(labels.len());
    for (ci, col) in columns.iter().enumerate() {
        let left = match ci.checked_sub(1).map(|p| &columns[p]) {
            Some(prev) => 0.5 * (prev.max_x + col.min_x),
            None => 0.0,
        };
        let right = match columns.get(ci + 1) {
            Some(next) => 0.5 * (col.max_x + next.min_x),
            None => 1.0,
        };
        let mut top = 0.0f32;
        for label in &col.labels {
            let bottom = label.bbox.min_y();
            if bottom > top && right > left {
                cells.push(NormRect::from_corners(left, top, right, bottom).clamp_unit());
            }
            top = label.bbox.max_y();
        }
    }
    cells.retain(|c| !c.is_empty());
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(x: f32, y: f32) -> QuantityLabel {
        QuantityLabel {
            quantity: 1,
            bbox: NormRect::new(x, y, 0.06, 0.04),
        }
    }

    #[test]
    fn parses_common_label_forms() {
        assert_eq!(parse_quantity_label("2x", 999), Some(2));
        assert_eq!(parse_quantity_label(" 12X ", 999), Some(12));
        assert_eq!(parse_quantity_label("x3", 999), Some(3));
        assert_eq!(parse_quantity_label("4×", 999), Some(4));
        assert_eq!(parse_quantity_label("2 x", 999), Some(2));
    }

    #[test]
    fn rejects_non_labels() {
        for text in ["x", "2", "ax", "1234x", "0x", "2xx", "", "page 4"] {
            assert_eq!(parse_quantity_label(text, 999), None, "{text:?}");
        }
        assert_eq!(parse_quantity_label("20x", 10), None);
    }

    #[test]
    fn filters_recognized_text() {
        let texts = vec![
            RecognizedText {
                text: "3x".into(),
                bbox: NormRect::new(0.1, 0.5, 0.05, 0.03),
            },
            RecognizedText {
                text: "Step 12".into(),
                bbox: NormRect::new(0.4, 0.1, 0.1, 0.03),
            },
        ];
        let labels = quantity_labels(&texts, &LabelGridParams::default());
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].quantity, 3);
    }

    #[test]
    fn two_by_two_grid_gives_cells_above_labels() {
        let labels = [
            label(0.10, 0.40),
            label(0.60, 0.40),
            label(0.11, 0.90),
            label(0.61, 0.90),
        ];
        let cells = label_grid_cells(&labels, &LabelGridParams::default());
        assert_eq!(cells.len(), 4);

        let boundary = 0.5 * (0.17 + 0.60);
        let c = cells[0];
        assert_eq!((c.min_x(), c.min_y()), (0.0, 0.0));
        assert!((c.max_x() - boundary).abs() < 1e-4);
        assert!((c.max_y() - 0.40).abs() < 1e-6);

        // Second row of the first column starts below the first label.
        let c = cells[1];
        assert!((c.min_y() - 0.44).abs() < 1e-6);
        assert!((c.max_y() - 0.90).abs() < 1e-6);

        let c = cells[3];
        assert!((c.max_x() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn label_at_top_edge_yields_no_cell() {
        let labels = [QuantityLabel {
            quantity: 2,
            bbox: NormRect::new(0.2, 0.0, 0.05, 0.03),
        }];
        assert!(label_grid_cells(&labels, &LabelGridParams::default()).is_empty());
    }
}
