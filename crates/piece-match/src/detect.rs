use crate::cpu::{cpu_backend, CpuBackendParams, FixedLabels};
use crate::{core, matcher, reference};
use std::sync::Arc;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors produced by the high-level facade helpers.
#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error("invalid RGBA image buffer length (expected {expected} bytes, got {got})")]
    InvalidRgbaBuffer { expected: usize, got: usize },

    #[error("invalid RGBA image dimensions (width={width}, height={height})")]
    InvalidRgbaDimensions { width: u32, height: u32 },

    #[error(transparent)]
    Extract(#[from] reference::ExtractError),

    #[error(transparent)]
    Params(#[from] matcher::MatchParamsError),
}

/// Overlay colors handed out to references in extraction order.
pub const DISPLAY_PALETTE: [[u8; 3]; 8] = [
    [230, 25, 75],
    [60, 180, 75],
    [0, 130, 200],
    [245, 130, 48],
    [145, 30, 180],
    [70, 240, 240],
    [240, 50, 230],
    [210, 245, 60],
];

/// Give each descriptor the next [`DISPLAY_PALETTE`] color, wrapping around.
pub fn assign_display_colors(
    descriptors: Vec<core::ReferenceDescriptor>,
) -> Vec<core::ReferenceDescriptor> {
    descriptors
        .into_iter()
        .enumerate()
        .map(|(i, d)| d.with_display_color(DISPLAY_PALETTE[i % DISPLAY_PALETTE.len()]))
        .collect()
}

/// Convert an `image::RgbaImage` into the lightweight `piece-match-core` view type.
pub fn rgba_view(img: &::image::RgbaImage) -> core::RgbaImageView<'_> {
    core::RgbaImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// View a raw row-major RGBA8 buffer, checking its length.
pub fn rgba_view_from_raw(
    width: u32,
    height: u32,
    data: &[u8],
) -> Result<core::RgbaImageView<'_>, DetectError> {
    if width == 0 || height == 0 {
        return Err(DetectError::InvalidRgbaDimensions { width, height });
    }
    let expected = width as usize * height as usize * 4;
    if data.len() != expected {
        return Err(DetectError::InvalidRgbaBuffer {
            expected,
            got: data.len(),
        });
    }
    Ok(core::RgbaImageView {
        width: width as usize,
        height: height as usize,
        data,
    })
}

/// CPU backend with default settings.
pub fn default_backend() -> core::VisionBackend {
    cpu_backend(&CpuBackendParams::default())
}

/// CPU backend that reports `labels` as recognized text when non-empty.
pub fn backend_with_labels(
    params: &CpuBackendParams,
    labels: Vec<core::RecognizedText>,
) -> core::VisionBackend {
    let backend = cpu_backend(params);
    if labels.is_empty() {
        backend
    } else {
        backend.with_text_recognizer(Arc::new(FixedLabels::new(labels)))
    }
}

/// Extract reference descriptors from a parts-list photo.
///
/// Descriptors come back with display colors from [`DISPLAY_PALETTE`].
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "info",
        skip(backend, img, params),
        fields(width = img.width(), height = img.height())
    )
)]
pub fn extract_references_with(
    backend: core::VisionBackend,
    img: &::image::RgbaImage,
    orientation: reference::Orientation,
    params: reference::ExtractParams,
) -> Result<reference::ExtractionResult, DetectError> {
    let extractor = reference::ReferenceExtractor::new(backend, params)?;
    let photo = reference::ReferencePhoto {
        image: rgba_view(img),
        orientation,
    };
    let mut result = extractor.extract_detailed(&photo)?;
    result.descriptors = assign_display_colors(result.descriptors);
    Ok(result)
}

/// Extract reference descriptors with the default CPU backend.
///
/// `labels` stand in for text recognition; pass an empty list to skip the
/// label-grid strategy.
pub fn extract_references(
    img: &::image::RgbaImage,
    orientation: reference::Orientation,
    labels: Vec<core::RecognizedText>,
    params: reference::ExtractParams,
) -> Result<reference::ExtractionResult, DetectError> {
    let backend = backend_with_labels(&CpuBackendParams::default(), labels);
    extract_references_with(backend, img, orientation, params)
}

/// Match one frame against `references`.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "info",
        skip(backend, img, references, params),
        fields(width = img.width(), height = img.height())
    )
)]
pub fn match_frame_with(
    backend: core::VisionBackend,
    img: &::image::RgbaImage,
    references: &[core::ReferenceDescriptor],
    params: matcher::MatchParams,
) -> Result<Vec<matcher::PieceCandidate>, DetectError> {
    let frame_matcher = matcher::FrameMatcher::new(backend, params)?;
    Ok(frame_matcher.match_frame(&rgba_view(img), references))
}

/// Match one frame with the default CPU backend.
pub fn match_frame(
    img: &::image::RgbaImage,
    references: &[core::ReferenceDescriptor],
    params: matcher::MatchParams,
) -> Result<Vec<matcher::PieceCandidate>, DetectError> {
    match_frame_with(default_backend(), img, references, params)
}
