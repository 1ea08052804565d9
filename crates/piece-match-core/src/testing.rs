//! Pure-computation capability fakes and synthetic scenes for tests.
//!
//! Everything here is deterministic and dependency-free so pipeline tests do
//! not need a real vision backend.

use std::sync::Arc;

use nalgebra::Point2;

use crate::capability::{
    CapabilityError, ContourExtractor, ImageTransform, MaskBackground, RecognizedText,
    TextRecognizer, VisionBackend, VisualEmbedder, VisualEmbedding,
};
use crate::geometry::{Contour, NormRect};
use crate::image::{RgbaImage, RgbaImageView};

/// Regular polygon in normalized coordinates.
pub fn regular_polygon(center: (f32, f32), radius: f32, sides: usize, rotation: f32) -> Contour {
    Contour::new(
        (0..sides)
            .map(|i| {
                let t = rotation + std::f32::consts::TAU * i as f32 / sides as f32;
                Point2::new(center.0 + radius * t.cos(), center.1 + radius * t.sin())
            })
            .collect(),
    )
}

/// Axis-aligned rectangle contour.
pub fn rect_contour(rect: NormRect) -> Contour {
    Contour::new(vec![
        Point2::new(rect.min_x(), rect.min_y()),
        Point2::new(rect.max_x(), rect.min_y()),
        Point2::new(rect.max_x(), rect.max_y()),
        Point2::new(rect.min_x(), rect.max_y()),
    ])
}

/// Render filled shapes (normalized contours) over an opaque background.
///
/// A pixel takes the color of the last shape containing its center.
pub fn render_shapes(
    width: usize,
    height: usize,
    background: [u8; 3],
    shapes: &[(Contour, [u8; 3])],
) -> RgbaImage {
    let [r, g, b] = background;
    let mut img = RgbaImage::filled(width, height, [r, g, b, 255]);
    for (contour, [r, g, b]) in shapes {
        let bounds = contour.bounding_rect().pixel_bounds(width, height);
        let Some(bounds) = bounds else { continue };
        for y in bounds.y0..bounds.y1 {
            for x in bounds.x0..bounds.x1 {
                let p = Point2::new(
                    (x as f32 + 0.5) / width as f32,
                    (y as f32 + 0.5) / height as f32,
                );
                if contour.contains(p) {
                    img.put_pixel(x, y, [*r, *g, *b, 255]);
                }
            }
        }
    }
    img
}

/// Returns the same contours on every call.
#[derive(Clone, Debug, Default)]
pub struct ScriptedContours {
    contours: Vec<Contour>,
    fail: bool,
}

impl ScriptedContours {
    pub fn new(contours: Vec<Contour>) -> Self {
        Self {
            contours,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            contours: Vec::new(),
            fail: true,
        }
    }
}

impl ContourExtractor for ScriptedContours {
    fn detect(
        &self,
        _image: &RgbaImageView<'_>,
        _contrast_adjustment: f32,
        max_count: usize,
    ) -> Result<Vec<Contour>, CapabilityError> {
        if self.fail {
            return Err(CapabilityError::Backend("scripted failure".into()));
        }
        Ok(self.contours.iter().take(max_count).cloned().collect())
    }
}

/// Convex hulls of connected regions that differ from the top-left pixel.
///
/// `contrast_adjustment` is ignored.
#[derive(Clone, Debug)]
pub struct BlobContours {
    /// Sum of absolute RGB differences above which a pixel is foreground.
    pub tolerance: u32,
    pub min_pixels: usize,
}

impl Default for BlobContours {
    fn default() -> Self {
        Self {
            tolerance: 60,
            min_pixels: 4,
        }
    }
}

impl ContourExtractor for BlobContours {
    fn detect(
        &self,
        image: &RgbaImageView<'_>,
        _contrast_adjustment: f32,
        max_count: usize,
    ) -> Result<Vec<Contour>, CapabilityError> {
        if image.is_empty() {
            return Ok(Vec::new());
        }
        let (w, h) = (image.width, image.height);
        let bg = image.pixel(0, 0);
        let differs = |x: usize, y: usize| {
            let p = image.pixel(x, y);
            let d: u32 = (0..3).map(|c| (p[c] as i32 - bg[c] as i32).unsigned_abs()).sum();
            d > self.tolerance
        };

        let mut label = vec![usize::MAX; w * h];
        let mut blobs: Vec<(usize, Vec<Point2<f32>>)> = Vec::new();
        let mut stack = Vec::new();
        for sy in 0..h {
            for sx in 0..w {
                if label[sy * w + sx] != usize::MAX || !differs(sx, sy) {
                    continue;
                }
                let id = blobs.len();
                // Per-row horizontal extent of the component.
                let mut rows: Vec<Option<(usize, usize)>> = vec![None; h];
                let mut count = 0usize;
                label[sy * w + sx] = id;
                stack.push((sx, sy));
                while let Some((x, y)) = stack.pop() {
                    count += 1;
                    let e = rows[y].get_or_insert((x, x));
                    e.0 = e.0.min(x);
                    e.1 = e.1.max(x);
                    let mut visit = |nx: usize, ny: usize| {
                        let i = ny * w + nx;
                        if label[i] == usize::MAX && differs(nx, ny) {
                            label[i] = id;
                            stack.push((nx, ny));
                        }
                    };
                    if x > 0 {
                        visit(x - 1, y);
                    }
                    if x + 1 < w {
                        visit(x + 1, y);
                    }
                    if y > 0 {
                        visit(x, y - 1);
                    }
                    if y + 1 < h {
                        visit(x, y + 1);
                    }
                }
                let mut corners = Vec::new();
                for (y, extent) in rows.iter().enumerate() {
                    if let Some((x0, x1)) = extent {
                        for (px, py) in [(*x0, y), (*x0, y + 1), (x1 + 1, y), (x1 + 1, y + 1)] {
                            corners.push(Point2::new(px as f32 / w as f32, py as f32 / h as f32));
                        }
                    }
                }
                blobs.push((count, convex_hull(corners)));
            }
        }

        blobs.retain(|(count, hull)| *count >= self.min_pixels && hull.len() >= 3);
        blobs.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(blobs
            .into_iter()
            .take(max_count)
            .map(|(_, hull)| Contour::new(hull))
            .collect())
    }
}

/// Andrew's monotone chain; counter-clockwise in y-up terms.
fn convex_hull(mut pts: Vec<Point2<f32>>) -> Vec<Point2<f32>> {
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }
    let cross = |o: Point2<f32>, a: Point2<f32>, b: Point2<f32>| {
        (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
    };
    let mut hull: Vec<Point2<f32>> = Vec::with_capacity(pts.len() * 2);
    for &p in &pts {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }
    let lower_len = hull.len() + 1;
    for &p in pts.iter().rev().skip(1) {
        while hull.len() >= lower_len && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0
        {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();
    hull
}

/// 4x4 grid of mean luma; distance is L2 scaled into `[0, 70]`.
#[derive(Clone, Debug)]
pub struct FakeEmbedder {
    pub min_size: usize,
    pub fail: bool,
}

impl Default for FakeEmbedder {
    fn default() -> Self {
        Self {
            min_size: 20,
            fail: false,
        }
    }
}

impl FakeEmbedder {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

const FAKE_GRID: usize = 4;

impl VisualEmbedder for FakeEmbedder {
    fn extract(&self, image: &RgbaImageView<'_>) -> Result<VisualEmbedding, CapabilityError> {
        if self.fail {
            return Err(CapabilityError::Backend("scripted failure".into()));
        }
        if image.width < self.min_size || image.height < self.min_size {
            return Err(CapabilityError::ImageTooSmall {
                width: image.width,
                height: image.height,
                min: self.min_size,
            });
        }
        let mut values = Vec::with_capacity(FAKE_GRID * FAKE_GRID);
        for gy in 0..FAKE_GRID {
            for gx in 0..FAKE_GRID {
                let x0 = gx * image.width / FAKE_GRID;
                let x1 = (gx + 1) * image.width / FAKE_GRID;
                let y0 = gy * image.height / FAKE_GRID;
                let y1 = (gy + 1) * image.height / FAKE_GRID;
                let mut sum = 0.0f32;
                for y in y0..y1 {
                    for x in x0..x1 {
                        let p = image.pixel(x, y);
                        sum += 0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32;
                    }
                }
                let n = ((x1 - x0) * (y1 - y0)).max(1) as f32;
                values.push(sum / (n * 255.0));
            }
        }
        Ok(VisualEmbedding::new(values))
    }

    fn distance(&self, a: &VisualEmbedding, b: &VisualEmbedding) -> Result<f32, CapabilityError> {
        if a.len() != b.len() {
            return Err(CapabilityError::Backend("embedding length mismatch".into()));
        }
        let l2: f32 = a
            .as_slice()
            .iter()
            .zip(b.as_slice())
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt();
        Ok(l2 * 70.0 / FAKE_GRID as f32)
    }
}

/// Nearest-neighbour raster operations on [`RgbaImage`].
#[derive(Clone, Copy, Debug, Default)]
pub struct FakeTransform;

impl ImageTransform for FakeTransform {
    fn crop(
        &self,
        image: &RgbaImageView<'_>,
        rect: NormRect,
    ) -> Result<RgbaImage, CapabilityError> {
        let b = rect
            .pixel_bounds(image.width, image.height)
            .ok_or(CapabilityError::DegenerateRegion)?;
        let mut out = RgbaImage::new(b.width(), b.height());
        for y in b.y0..b.y1 {
            for x in b.x0..b.x1 {
                out.put_pixel(x - b.x0, y - b.y0, image.pixel(x, y));
            }
        }
        Ok(out)
    }

    fn downsample(&self, image: &RgbaImageView<'_>, max_dimension: usize) -> RgbaImage {
        let longest = image.width.max(image.height);
        if longest <= max_dimension || max_dimension == 0 {
            return image.to_image();
        }
        let nw = (image.width * max_dimension / longest).max(1);
        let nh = (image.height * max_dimension / longest).max(1);
        let mut out = RgbaImage::new(nw, nh);
        for y in 0..nh {
            for x in 0..nw {
                let sx = (x * image.width + image.width / 2) / nw;
                let sy = (y * image.height + image.height / 2) / nh;
                out.put_pixel(x, y, image.pixel(sx.min(image.width - 1), sy.min(image.height - 1)));
            }
        }
        out
    }

    fn rotate(&self, image: &RgbaImageView<'_>, degrees: f32) -> RgbaImage {
        let (w, h) = (image.width, image.height);
        let deg = degrees.rem_euclid(360.0);
        let quarter = (deg / 90.0).round();
        if (deg - quarter * 90.0).abs() < 1e-3 {
            return match quarter as u32 % 4 {
                0 => image.to_image(),
                1 => {
                    let mut out = RgbaImage::new(h, w);
                    for y in 0..w {
                        for x in 0..h {
                            out.put_pixel(x, y, image.pixel(y, h - 1 - x));
                        }
                    }
                    out
                }
                2 => {
                    let mut out = RgbaImage::new(w, h);
                    for y in 0..h {
                        for x in 0..w {
                            out.put_pixel(x, y, image.pixel(w - 1 - x, h - 1 - y));
                        }
                    }
                    out
                }
                _ => {
                    let mut out = RgbaImage::new(h, w);
                    for y in 0..w {
                        for x in 0..h {
                            out.put_pixel(x, y, image.pixel(w - 1 - y, x));
                        }
                    }
                    out
                }
            };
        }

        let (s, c) = deg.to_radians().sin_cos();
        let nw = (w as f32 * c.abs() + h as f32 * s.abs()).ceil() as usize;
        let nh = (w as f32 * s.abs() + h as f32 * c.abs()).ceil() as usize;
        let mut out = RgbaImage::new(nw, nh);
        let (scx, scy) = (w as f32 / 2.0, h as f32 / 2.0);
        let (dcx, dcy) = (nw as f32 / 2.0, nh as f32 / 2.0);
        for y in 0..nh {
            for x in 0..nw {
                let dx = x as f32 + 0.5 - dcx;
                let dy = y as f32 + 0.5 - dcy;
                let sx = c * dx + s * dy + scx;
                let sy = -s * dx + c * dy + scy;
                if sx >= 0.0 && sy >= 0.0 && (sx as usize) < w && (sy as usize) < h {
                    out.put_pixel(x, y, image.pixel(sx as usize, sy as usize));
                }
            }
        }
        out
    }

    fn mask(
        &self,
        image: &RgbaImageView<'_>,
        contour: &Contour,
        background: MaskBackground,
    ) -> Result<RgbaImage, CapabilityError> {
        if contour.len() < 3 || image.is_empty() {
            return Err(CapabilityError::DegenerateRegion);
        }
        let outside = match background {
            MaskBackground::Transparent => [0, 0, 0, 0],
            MaskBackground::Solid([r, g, b]) => [r, g, b, 255],
        };
        let mut out = image.to_image();
        for y in 0..image.height {
            for x in 0..image.width {
                let p = Point2::new(
                    (x as f32 + 0.5) / image.width as f32,
                    (y as f32 + 0.5) / image.height as f32,
                );
                if !contour.contains(p) {
                    out.put_pixel(x, y, outside);
                }
            }
        }
        Ok(out)
    }
}

/// Returns the same recognized text on every call.
#[derive(Clone, Debug, Default)]
pub struct ScriptedText {
    pub items: Vec<RecognizedText>,
}

impl ScriptedText {
    pub fn new(items: Vec<RecognizedText>) -> Self {
        Self { items }
    }
}

impl TextRecognizer for ScriptedText {
    fn recognize(
        &self,
        _image: &RgbaImageView<'_>,
    ) -> Result<Vec<RecognizedText>, CapabilityError> {
        Ok(self.items.clone())
    }
}

/// Blob contours, grid embedder and nearest-neighbour transforms.
pub fn fake_backend() -> VisionBackend {
    VisionBackend::new(
        Arc::new(BlobContours::default()),
        Arc::new(FakeEmbedder::default()),
        Arc::new(FakeTransform),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_contours_find_separate_shapes_largest_first() {
        let small = rect_contour(NormRect::new(0.1, 0.1, 0.1, 0.1));
        let large = regular_polygon((0.6, 0.6), 0.25, 6, 0.0);
        let img = render_shapes(
            100,
            100,
            [255, 255, 255],
            &[(small, [200, 0, 0]), (large, [0, 0, 200])],
        );
        let contours = BlobContours::default()
            .detect(&img.view(), 1.0, 10)
            .expect("detect");
        assert_eq!(contours.len(), 2);
        assert!(contours[0].area() > contours[1].area());
        let r = contours[1].bounding_rect();
        assert!((r.x - 0.1).abs() < 0.02 && (r.width - 0.1).abs() < 0.02);
    }

    #[test]
    fn blob_contours_on_uniform_image_is_empty() {
        let img = RgbaImage::filled(32, 32, [90, 90, 90, 255]);
        let contours = BlobContours::default().detect(&img.view(), 1.0, 10).expect("detect");
        assert!(contours.is_empty());
    }

    #[test]
    fn quarter_rotations_compose_to_identity() {
        let img = render_shapes(
            30,
            20,
            [0, 0, 0],
            &[(rect_contour(NormRect::new(0.0, 0.0, 0.3, 0.5)), [255, 0, 0])],
        );
        let t = FakeTransform;
        let r90 = t.rotate(&img.view(), 90.0);
        assert_eq!((r90.width, r90.height), (20, 30));
        // The red block sits top-left; after a clockwise quarter turn it is top-right.
        assert_eq!(r90.pixel(19, 0), [255, 0, 0, 255]);
        let back = t.rotate(&t.rotate(&r90.view(), 180.0).view(), 90.0);
        assert_eq!(back, img);
    }

    #[test]
    fn crop_rejects_degenerate_rects() {
        let img = RgbaImage::filled(10, 10, [1, 2, 3, 255]);
        assert_eq!(
            FakeTransform.crop(&img.view(), NormRect::new(0.5, 0.5, 0.0, 0.2)),
            Err(CapabilityError::DegenerateRegion)
        );
        let c = FakeTransform
            .crop(&img.view(), NormRect::new(0.5, 0.5, 1.0, 1.0))
            .expect("clamped crop");
        assert_eq!((c.width, c.height), (5, 5));
    }

    #[test]
    fn embedder_enforces_minimum_size() {
        let img = RgbaImage::filled(10, 40, [1, 2, 3, 255]);
        assert!(matches!(
            FakeEmbedder::default().extract(&img.view()),
            Err(CapabilityError::ImageTooSmall { .. })
        ));
    }
}
