#![allow(dead_code)]

use std::sync::Arc;

use piece_match_core::testing::{fake_backend, render_shapes, ScriptedContours};
use piece_match_core::{Contour, ReferenceDescriptor, RgbaImage, VisionBackend};
use piece_match_reference::{build_descriptor, ExtractParams};

pub const WHITE: [u8; 3] = [255, 255, 255];
pub const SIZE: usize = 200;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Square frame with one filled shape on white.
pub fn scene(contour: &Contour, rgb: [u8; 3]) -> RgbaImage {
    render_shapes(SIZE, SIZE, WHITE, &[(contour.clone(), rgb)])
}

/// Descriptor of `contour` rendered in `rgb`, built the way capture does.
pub fn reference(contour: &Contour, rgb: [u8; 3]) -> ReferenceDescriptor {
    let img = scene(contour, rgb);
    build_descriptor(&fake_backend(), &img.view(), contour, &ExtractParams::default())
        .expect("reference descriptor")
}

/// Fake backend whose contour extractor always returns `contours`.
pub fn scripted_backend(contours: Vec<Contour>) -> VisionBackend {
    let base = fake_backend();
    VisionBackend::new(
        Arc::new(ScriptedContours::new(contours)),
        base.embedder,
        base.transform,
    )
}
