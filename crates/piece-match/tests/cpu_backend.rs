#![cfg(feature = "image")]

use std::f32::consts::FRAC_PI_4;

use approx::assert_relative_eq;
use nalgebra::Point2;
use piece_match::core::testing::{regular_polygon, render_shapes};
use piece_match::core::{Contour, NormRect, RecognizedText};
use piece_match::detect;
use piece_match::matcher::{MatchParams, MatchType};
use piece_match::reference::{ExtractParams, Orientation, SegmentationStrategy};

const WHITE: [u8; 3] = [255, 255, 255];
const RED: [u8; 3] = [200, 30, 30];
const BLUE: [u8; 3] = [30, 30, 200];

fn to_rgba(page: piece_match::core::RgbaImage) -> image::RgbaImage {
    let (w, h) = (page.width as u32, page.height as u32);
    image::RgbaImage::from_raw(w, h, page.data).expect("page buffer")
}

fn single_shape(contour: Contour, rgb: [u8; 3]) -> image::RgbaImage {
    to_rgba(render_shapes(400, 400, WHITE, &[(contour, rgb)]))
}

/// L-shaped bracket scaled by `scale` about the image centre.
fn l_bracket(scale: f32) -> Contour {
    let corners: [(f32, f32); 6] = [
        (0.3, 0.2),
        (0.4, 0.2),
        (0.4, 0.7),
        (0.75, 0.7),
        (0.75, 0.8),
        (0.3, 0.8),
    ];
    Contour::new(
        corners
            .iter()
            .map(|&(x, y)| Point2::new(0.5 + scale * (x - 0.5), 0.5 + scale * (y - 0.5)))
            .collect(),
    )
}

/// A 400x400 parts list: red hexagon on the left, blue square on the right.
fn manual_page() -> image::RgbaImage {
    let page = render_shapes(
        400,
        400,
        WHITE,
        &[
            (regular_polygon((0.25, 0.35), 0.12, 6, 0.0), RED),
            (regular_polygon((0.75, 0.35), 0.12, 4, FRAC_PI_4), BLUE),
        ],
    );
    to_rgba(page)
}

fn labels() -> Vec<RecognizedText> {
    vec![
        RecognizedText {
            text: "2x".into(),
            bbox: NormRect::new(0.2, 0.6, 0.1, 0.05),
        },
        RecognizedText {
            text: "1x".into(),
            bbox: NormRect::new(0.7, 0.6, 0.1, 0.05),
        },
    ]
}

#[test]
fn labelled_page_yields_one_reference_per_piece() {
    let result = detect::extract_references(
        &manual_page(),
        Orientation::Up,
        labels(),
        ExtractParams::default(),
    )
    .expect("references");

    assert_eq!(result.strategy, SegmentationStrategy::LabelGrid);
    assert_eq!(result.descriptors.len(), 2);
    assert_eq!(result.cells.len(), 2);
    for d in &result.descriptors {
        assert!(!d.embeddings().is_empty());
        assert!(d.display_color().is_some());
        assert!(!d.preview().is_empty());
    }
    let left = result.descriptors[0].source_region().center();
    assert_relative_eq!(left.x, 0.25, epsilon = 0.02);
    assert_relative_eq!(left.y, 0.35, epsilon = 0.02);
}

#[test]
fn unlabelled_page_falls_back_to_the_whole_image() {
    let result = detect::extract_references(
        &manual_page(),
        Orientation::Up,
        Vec::new(),
        ExtractParams::default(),
    )
    .expect("references");
    assert_eq!(result.strategy, SegmentationStrategy::WholeImage);
    assert_eq!(result.descriptors.len(), 1);
}

#[test]
fn page_matches_its_own_references() {
    let page = manual_page();
    let references = detect::extract_references(
        &page,
        Orientation::Up,
        labels(),
        ExtractParams::default(),
    )
    .expect("references")
    .descriptors;

    let mut candidates =
        detect::match_frame(&page, &references, MatchParams::default()).expect("match");
    candidates.sort_by(|a, b| a.region.center().x.total_cmp(&b.region.center().x));

    assert_eq!(candidates.len(), 2);
    for (candidate, reference) in candidates.iter().zip(&references) {
        assert_eq!(candidate.reference_id, reference.id());
        assert_eq!(candidate.match_type, MatchType::ShapeAndColor);
        assert!(candidate.score >= MatchParams::default().min_score);
        assert!(candidate.signals.moment > 0.9, "{:?}", candidate.signals);
    }
}

#[test]
fn empty_frame_matches_nothing() {
    let references = detect::extract_references(
        &manual_page(),
        Orientation::Up,
        labels(),
        ExtractParams::default(),
    )
    .expect("references")
    .descriptors;
    let blank = image::RgbaImage::from_pixel(320, 240, image::Rgba([255, 255, 255, 255]));
    let candidates =
        detect::match_frame(&blank, &references, MatchParams::default()).expect("match");
    assert!(candidates.is_empty());
}

#[test]
fn polygon_matches_at_twice_the_size_and_rotated_45_degrees() {
    for sides in [3usize, 4, 5, 6] {
        let page = single_shape(regular_polygon((0.5, 0.5), 0.1, sides, 0.0), RED);
        let references = detect::extract_references(
            &page,
            Orientation::Up,
            Vec::new(),
            ExtractParams::default(),
        )
        .expect("references")
        .descriptors;
        assert_eq!(references.len(), 1, "sides = {sides}");

        let frame = single_shape(regular_polygon((0.5, 0.5), 0.2, sides, FRAC_PI_4), RED);
        let candidates =
            detect::match_frame(&frame, &references, MatchParams::default()).expect("match");
        assert_eq!(candidates.len(), 1, "sides = {sides}");
        let c = &candidates[0];
        assert_eq!(c.reference_id, references[0].id());
        assert!(c.signals.moment > 0.6, "sides = {sides}: {:?}", c.signals);
        assert!(c.signals.compactness > 0.9, "sides = {sides}: {:?}", c.signals);
        assert_eq!(c.match_type, MatchType::ShapeAndColor, "sides = {sides}");
    }
}

#[test]
fn non_convex_piece_keeps_its_color() {
    let page = single_shape(l_bracket(1.0), RED);
    let references = detect::extract_references(
        &page,
        Orientation::Up,
        Vec::new(),
        ExtractParams::default(),
    )
    .expect("references")
    .descriptors;
    assert_eq!(references.len(), 1);

    let frame = single_shape(l_bracket(0.75), RED);
    let candidates =
        detect::match_frame(&frame, &references, MatchParams::default()).expect("match");
    assert_eq!(candidates.len(), 1);
    let c = &candidates[0];
    assert!(c.color_distance < 5.0, "{c:?}");
    assert_eq!(c.match_type, MatchType::ShapeAndColor);
}
