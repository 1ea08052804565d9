//! Core types for matching manual-page pieces against camera frames.
//!
//! This crate is purely computational: invariant shape descriptors, Lab
//! color math, region color sampling, reference descriptors, and the
//! capability traits through which the pipelines reach a vision backend.
//! It does not depend on any concrete image library.

mod capability;
mod color;
mod descriptor;
mod geometry;
mod image;
mod logger;

#[cfg(feature = "testing")]
pub mod testing;

pub use capability::{
    CapabilityError, ContourExtractor, ImageTransform, MaskBackground, RecognizedText,
    TextRecognizer, VisionBackend, VisualEmbedder, VisualEmbedding,
};
pub use color::{color_distance, to_perceptual_color, ColorSample, Rgb};
pub use descriptor::{ReferenceDescriptor, ReferenceId};
pub use geometry::{
    compactness_similarity, compute_compactness, compute_shape_signature, moment_distance,
    moment_similarity, Contour, NormRect, PixelBounds, ShapeSignature, MOMENT_COUNT,
    MOMENT_ZERO_FLOOR,
};
pub use image::{sample_opaque_region, sample_region, RgbaImage, RgbaImageView};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, LOG_ENV};
