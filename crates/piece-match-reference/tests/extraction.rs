use std::sync::Arc;

use piece_match_core::testing::{
    fake_backend, rect_contour, regular_polygon, render_shapes, ScriptedText,
};
use piece_match_core::{Contour, NormRect, RecognizedText, RgbaImage, VisionBackend};
use piece_match_reference::{
    ExtractError, ExtractParams, Orientation, ReferenceExtractor, ReferencePhoto,
    SegmentationStrategy,
};

const WHITE: [u8; 3] = [255, 255, 255];
const RED: [u8; 3] = [200, 30, 30];
const GREEN: [u8; 3] = [30, 150, 30];
const BLUE: [u8; 3] = [30, 30, 200];

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn extractor(backend: VisionBackend) -> ReferenceExtractor {
    ReferenceExtractor::new(backend, ExtractParams::default()).expect("valid params")
}

fn label_under(cx: f32, text: &str) -> RecognizedText {
    RecognizedText {
        text: text.to_string(),
        bbox: NormRect::new(cx - 0.03, 0.55, 0.06, 0.06),
    }
}

/// Three pieces in a row with a quantity label under each.
fn labeled_row(pieces: &[(Contour, [u8; 3])]) -> (RgbaImage, VisionBackend) {
    let img = render_shapes(300, 200, WHITE, pieces);
    let labels = vec![
        label_under(1.0 / 6.0, "2x"),
        label_under(0.5, "1x"),
        label_under(5.0 / 6.0, "x4"),
    ];
    let backend = fake_backend().with_text_recognizer(Arc::new(ScriptedText::new(labels)));
    (img, backend)
}

fn row_pieces() -> Vec<(Contour, [u8; 3])> {
    vec![
        (regular_polygon((1.0 / 6.0, 0.35), 0.09, 3, 0.0), RED),
        (regular_polygon((0.5, 0.35), 0.09, 4, 0.4), GREEN),
        (regular_polygon((5.0 / 6.0, 0.35), 0.09, 6, 0.0), BLUE),
    ]
}

#[test]
fn label_grid_yields_one_descriptor_per_labeled_cell() {
    init_logging();
    let (img, backend) = labeled_row(&row_pieces());
    let result = extractor(backend)
        .extract_detailed(&ReferencePhoto::upright(img.view()))
        .expect("extraction");

    assert_eq!(result.strategy, SegmentationStrategy::LabelGrid);
    assert_eq!(result.cells.len(), 3);
    assert_eq!(result.descriptors.len(), 3);
    for d in &result.descriptors {
        assert!(!d.embeddings().is_empty());
        assert_eq!(d.embeddings().len(), 4);
        assert_eq!(d.shape().moments.len(), 7);
        assert!(!d.shape().is_degenerate());
        assert!(d.display_color().is_none());
    }

    let mut ids: Vec<_> = result.descriptors.iter().map(|d| d.id()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3);

    // Every source region sits above the label row, inside its own column.
    for d in &result.descriptors {
        let r = d.source_region();
        assert!(r.max_y() < 0.55, "{r:?}");
        let column = (r.center().x * 3.0).floor();
        assert!(result
            .cells
            .iter()
            .any(|c| (c.center().x * 3.0).floor() == column));
    }
}

#[test]
fn empty_labeled_cell_is_skipped() {
    let mut pieces = row_pieces();
    pieces.remove(1);
    let (img, backend) = labeled_row(&pieces);
    let result = extractor(backend)
        .extract_detailed(&ReferencePhoto::upright(img.view()))
        .expect("extraction");
    assert_eq!(result.strategy, SegmentationStrategy::LabelGrid);
    assert_eq!(result.descriptors.len(), 2);
}

/// Thin black frame: a black rect with a slightly smaller white one on top.
fn frame(rect: NormRect, thickness: f32) -> [(Contour, [u8; 3]); 2] {
    [
        (rect_contour(rect), [0, 0, 0]),
        (rect_contour(rect.inset(thickness)), WHITE),
    ]
}

#[test]
fn bordered_boxes_are_used_without_labels() {
    init_logging();
    let mut shapes = Vec::new();
    shapes.extend(frame(NormRect::new(0.05, 0.1, 0.4, 0.8), 0.006));
    shapes.extend(frame(NormRect::new(0.55, 0.1, 0.4, 0.8), 0.006));
    shapes.push((regular_polygon((0.25, 0.5), 0.1, 3, 0.0), RED));
    shapes.push((regular_polygon((0.75, 0.5), 0.1, 5, 0.0), BLUE));
    let img = render_shapes(300, 200, WHITE, &shapes);

    let result = extractor(fake_backend())
        .extract_detailed(&ReferencePhoto::upright(img.view()))
        .expect("extraction");
    assert_eq!(result.strategy, SegmentationStrategy::Structural);
    assert_eq!(result.cells.len(), 2);
    assert_eq!(result.descriptors.len(), 2);
    let mut xs: Vec<f32> = result
        .descriptors
        .iter()
        .map(|d| d.source_region().center().x)
        .collect();
    xs.sort_by(f32::total_cmp);
    assert!((xs[0] - 0.25).abs() < 0.05, "{xs:?}");
    assert!((xs[1] - 0.75).abs() < 0.05, "{xs:?}");
}

#[test]
fn single_piece_falls_back_to_whole_image() {
    let img = render_shapes(
        200,
        200,
        WHITE,
        &[(regular_polygon((0.5, 0.5), 0.2, 6, 0.0), BLUE)],
    );
    let result = extractor(fake_backend())
        .extract_detailed(&ReferencePhoto::upright(img.view()))
        .expect("extraction");
    assert_eq!(result.strategy, SegmentationStrategy::WholeImage);
    assert_eq!(result.cells, vec![NormRect::UNIT]);
    assert_eq!(result.descriptors.len(), 1);
}

#[test]
fn labels_without_pieces_fall_through_to_the_next_strategy() {
    let img = render_shapes(
        300,
        200,
        WHITE,
        &[(regular_polygon((0.5, 0.8), 0.08, 6, 0.0), GREEN)],
    );
    // The only label sits below the piece, so its cell above is empty.
    let labels = vec![RecognizedText {
        text: "3x".into(),
        bbox: NormRect::new(0.45, 0.3, 0.1, 0.05),
    }];
    let backend = fake_backend().with_text_recognizer(Arc::new(ScriptedText::new(labels)));
    let result = extractor(backend)
        .extract_detailed(&ReferencePhoto::upright(img.view()))
        .expect("extraction");
    assert_eq!(result.strategy, SegmentationStrategy::WholeImage);
    assert_eq!(result.descriptors.len(), 1);
}

#[test]
fn blank_photo_has_no_reference() {
    let img = render_shapes(120, 80, WHITE, &[]);
    let err = extractor(fake_backend())
        .extract(&ReferencePhoto::upright(img.view()))
        .expect_err("nothing to find");
    assert_eq!(err, ExtractError::NoReferenceFound);
}

#[test]
fn orientation_is_applied_before_segmentation() {
    // Captured sideways: the piece at the left edge appears at the top once
    // the photo is turned a quarter clockwise.
    let img = render_shapes(
        200,
        100,
        WHITE,
        &[(regular_polygon((0.25, 0.5), 0.15, 6, 0.0), RED)],
    );
    let photo = ReferencePhoto {
        image: img.view(),
        orientation: Orientation::Right,
    };
    let result = extractor(fake_backend())
        .extract_detailed(&photo)
        .expect("extraction");
    assert_eq!(result.descriptors.len(), 1);
    let c = result.descriptors[0].source_region().center();
    assert!((c.x - 0.5).abs() < 0.05, "{c:?}");
    assert!((c.y - 0.25).abs() < 0.05, "{c:?}");
}

#[test]
fn invalid_params_are_rejected() {
    let params = ExtractParams {
        rotations: Vec::new(),
        ..ExtractParams::default()
    };
    let err = ReferenceExtractor::new(fake_backend(), params).expect_err("invalid");
    assert!(matches!(err, ExtractError::InvalidParams(_)));
}
