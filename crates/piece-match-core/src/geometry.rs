//! Normalized rects, contours and invariant shape descriptors.
//!
//! All contour coordinates live in a normalized `0..1` space with the origin
//! at the top-left corner and `y` pointing down. Shape descriptors should be
//! computed on pixel-space contours (see [`Contour::scaled`]) so that the
//! aspect ratio of the source image does not distort the shape.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Number of moment invariants in a [`ShapeSignature`].
pub const MOMENT_COUNT: usize = 7;

/// Magnitudes below this floor are treated as zero by [`moment_distance`].
///
/// Invariants that vanish analytically (e.g. odd orders of a symmetric
/// polygon) come out of a rasterized, simplified outline at up to a few
/// `1e-3`. The log scale is measured from the floor so it stays continuous.
pub const MOMENT_ZERO_FLOOR: f64 = 1e-2;

/// Two-point Gauss-Legendre nodes on `[0, 1]`; exact for cubics.
const GAUSS_NODES: [f64; 2] = [
    0.5 - 0.288_675_134_594_812_9,
    0.5 + 0.288_675_134_594_812_9,
];

/// Axis-aligned rectangle in normalized image coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NormRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Half-open pixel bounds `[x0, x1) x [y0, y1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelBounds {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

impl PixelBounds {
    #[inline]
    pub fn width(&self) -> usize {
        self.x1 - self.x0
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.y1 - self.y0
    }

    #[inline]
    pub fn area(&self) -> usize {
        self.width() * self.height()
    }

    /// The exact normalized rect covered by these pixels.
    pub fn to_norm_rect(&self, width: usize, height: usize) -> NormRect {
        let (w, h) = (width as f32, height as f32);
        NormRect::from_corners(
            self.x0 as f32 / w,
            self.y0 as f32 / h,
            self.x1 as f32 / w,
            self.y1 as f32 / h,
        )
    }
}

impl NormRect {
    /// The full image.
    pub const UNIT: NormRect = NormRect {
        x: 0.0,
        y: 0.0,
        width: 1.0,
        height: 1.0,
    };

    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a rect from two corners given in any order.
    pub fn from_corners(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        let (min_x, max_x) = if x0 <= x1 { (x0, x1) } else { (x1, x0) };
        let (min_y, max_y) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
        Self::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    #[inline]
    pub fn min_x(&self) -> f32 {
        self.x
    }

    #[inline]
    pub fn min_y(&self) -> f32 {
        self.y
    }

    #[inline]
    pub fn max_x(&self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn max_y(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Point2<f32> {
        Point2::new(self.x + 0.5 * self.width, self.y + 0.5 * self.height)
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }

    pub fn intersection(&self, other: &NormRect) -> Option<NormRect> {
        let x0 = self.min_x().max(other.min_x());
        let y0 = self.min_y().max(other.min_y());
        let x1 = self.max_x().min(other.max_x());
        let y1 = self.max_y().min(other.max_y());
        if x1 > x0 && y1 > y0 {
            Some(NormRect::from_corners(x0, y0, x1, y1))
        } else {
            None
        }
    }

    /// Fraction of `self`'s area that lies inside `outer`, in `[0, 1]`.
    pub fn containment_in(&self, outer: &NormRect) -> f32 {
        let area = self.area();
        if area <= 0.0 {
            return 0.0;
        }
        self.intersection(outer)
            .map(|r| (r.area() / area).min(1.0))
            .unwrap_or(0.0)
    }

    /// Clamp to the unit square.
    pub fn clamp_unit(&self) -> NormRect {
        let x0 = self.min_x().clamp(0.0, 1.0);
        let y0 = self.min_y().clamp(0.0, 1.0);
        let x1 = self.max_x().clamp(0.0, 1.0);
        let y1 = self.max_y().clamp(0.0, 1.0);
        NormRect::from_corners(x0, y0, x1, y1)
    }

    /// Centered sub-rect covering `fraction` of the width and height.
    pub fn central(&self, fraction: f32) -> NormRect {
        let f = fraction.clamp(0.0, 1.0);
        let w = self.width * f;
        let h = self.height * f;
        let c = self.center();
        NormRect::new(c.x - 0.5 * w, c.y - 0.5 * h, w, h)
    }

    /// Shrink by `margin` on every side (normalized units of the parent).
    pub fn inset(&self, margin: f32) -> NormRect {
        let w = (self.width - 2.0 * margin).max(0.0);
        let h = (self.height - 2.0 * margin).max(0.0);
        NormRect::new(self.x + margin, self.y + margin, w, h)
    }

    /// Map a rect expressed in `parent`-local coordinates into the parent's space.
    pub fn from_subrect(&self, parent: &NormRect) -> NormRect {
        NormRect::new(
            parent.x + self.x * parent.width,
            parent.y + self.y * parent.height,
            self.width * parent.width,
            self.height * parent.height,
        )
    }

    /// Whether `self` comes within `margin` of any edge of `container`.
    pub fn touches_edges_of(&self, container: &NormRect, margin: f32) -> bool {
        self.min_x() - container.min_x() <= margin
            || self.min_y() - container.min_y() <= margin
            || container.max_x() - self.max_x() <= margin
            || container.max_y() - self.max_y() <= margin
    }

    /// Pixel bounds of this rect in a `width x height` image, clamped.
    ///
    /// Returns `None` when the clamped region holds no pixel.
    pub fn pixel_bounds(&self, width: usize, height: usize) -> Option<PixelBounds> {
        if width == 0 || height == 0 {
            return None;
        }
        let r = self.clamp_unit();
        let x0 = (r.min_x() * width as f32).floor().max(0.0) as usize;
        let y0 = (r.min_y() * height as f32).floor().max(0.0) as usize;
        let x1 = ((r.max_x() * width as f32).ceil() as usize).min(width);
        let y1 = ((r.max_y() * height as f32).ceil() as usize).min(height);
        if x1 > x0 && y1 > y0 {
            Some(PixelBounds { x0, y0, x1, y1 })
        } else {
            None
        }
    }
}

/// Closed polygon outline of one connected region, normalized coordinates.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Contour {
    points: Vec<Point2<f32>>,
}

impl Contour {
    pub fn new(points: Vec<Point2<f32>>) -> Self {
        Self { points }
    }

    #[inline]
    pub fn points(&self) -> &[Point2<f32>] {
        &self.points
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn bounding_rect(&self) -> NormRect {
        let mut it = self.points.iter();
        let Some(first) = it.next() else {
            return NormRect::default();
        };
        let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
        for p in it {
            x0 = x0.min(p.x);
            y0 = y0.min(p.y);
            x1 = x1.max(p.x);
            y1 = y1.max(p.y);
        }
        NormRect::from_corners(x0, y0, x1, y1)
    }

    /// Scale each axis independently, e.g. by the image size to get pixels.
    pub fn scaled(&self, sx: f32, sy: f32) -> Contour {
        Contour::new(
            self.points
                .iter()
                .map(|p| Point2::new(p.x * sx, p.y * sy))
                .collect(),
        )
    }

    /// Map a contour expressed in `parent`-local coordinates into the parent's space.
    pub fn from_subrect(&self, parent: &NormRect) -> Contour {
        Contour::new(
            self.points
                .iter()
                .map(|p| Point2::new(parent.x + p.x * parent.width, parent.y + p.y * parent.height))
                .collect(),
        )
    }

    /// Express this contour in the local coordinates of `sub`.
    ///
    /// Returns `None` if `sub` is empty.
    pub fn to_subrect(&self, sub: &NormRect) -> Option<Contour> {
        if sub.is_empty() {
            return None;
        }
        Some(Contour::new(
            self.points
                .iter()
                .map(|p| Point2::new((p.x - sub.x) / sub.width, (p.y - sub.y) / sub.height))
                .collect(),
        ))
    }

    /// Closed perimeter (last point wraps to the first).
    pub fn perimeter(&self) -> f64 {
        let n = self.points.len();
        if n < 2 {
            return 0.0;
        }
        (0..n)
            .map(|i| {
                let a = self.points[i];
                let b = self.points[(i + 1) % n];
                let dx = (b.x - a.x) as f64;
                let dy = (b.y - a.y) as f64;
                (dx * dx + dy * dy).sqrt()
            })
            .sum()
    }

    /// Unsigned polygon area (shoelace).
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let twice: f64 = (0..n)
            .map(|i| {
                let a = self.points[i];
                let b = self.points[(i + 1) % n];
                a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64
            })
            .sum();
        twice.abs() * 0.5
    }

    /// Even-odd point-in-polygon test.
    pub fn contains(&self, p: Point2<f32>) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[j];
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < x_cross {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }
}

/// Rotation/scale/translation invariant description of a contour.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShapeSignature {
    pub moments: [f64; MOMENT_COUNT],
    /// Isoperimetric ratio, `>= 1.0`.
    pub compactness: f64,
}

impl ShapeSignature {
    /// Signature used for contours that carry no usable shape.
    pub const DEGENERATE: ShapeSignature = ShapeSignature {
        moments: [0.0; MOMENT_COUNT],
        compactness: 1.0,
    };

    pub fn is_degenerate(&self) -> bool {
        self.moments.iter().all(|&m| m == 0.0)
    }
}

/// Compute moment invariants and compactness of `contour`.
pub fn compute_shape_signature(contour: &Contour) -> ShapeSignature {
    match hu_moments(contour) {
        Some(moments) => ShapeSignature {
            moments,
            compactness: compute_compactness(contour),
        },
        None => ShapeSignature::DEGENERATE,
    }
}

/// Seven Hu invariants of the contour outline.
///
/// Mass is spread uniformly along the closed outline, so extra collinear
/// vertices and the vertex order do not change the result. Per-edge integrals
/// are exact (two-point Gauss-Legendre on cubic monomials). Central moments
/// are divided by the perimeter and scale-normalized by the fourth root of the
/// second-order determinant `mu20*mu02 - mu11^2`, which is itself rotation
/// invariant. Returns `None` for fewer than 3 points or collinear outlines.
fn hu_moments(contour: &Contour) -> Option<[f64; MOMENT_COUNT]> {
    let pts = contour.points();
    if pts.len() < 3 {
        return None;
    }
    let edges: Vec<([f64; 2], [f64; 2], f64)> = (0..pts.len())
        .map(|i| {
            let a = pts[i];
            let b = pts[(i + 1) % pts.len()];
            let (ax, ay) = (a.x as f64, a.y as f64);
            let (dx, dy) = (b.x as f64 - ax, b.y as f64 - ay);
            ([ax, ay], [dx, dy], (dx * dx + dy * dy).sqrt())
        })
        .collect();
    let perimeter: f64 = edges.iter().map(|e| e.2).sum();
    if !(perimeter > 0.0) {
        return None;
    }
    let cx = edges.iter().map(|(a, d, l)| l * (a[0] + 0.5 * d[0])).sum::<f64>() / perimeter;
    let cy = edges.iter().map(|(a, d, l)| l * (a[1] + 0.5 * d[1])).sum::<f64>() / perimeter;

    let (mut m20, mut m02, mut m11) = (0.0f64, 0.0f64, 0.0f64);
    let (mut m30, mut m03, mut m21, mut m12) = (0.0f64, 0.0f64, 0.0f64, 0.0f64);
    for (a, d, len) in &edges {
        let w = 0.5 * len;
        for t in GAUSS_NODES {
            let dx = a[0] + t * d[0] - cx;
            let dy = a[1] + t * d[1] - cy;
            m20 += w * dx * dx;
            m02 += w * dy * dy;
            m11 += w * dx * dy;
            m30 += w * dx * dx * dx;
            m03 += w * dy * dy * dy;
            m21 += w * dx * dx * dy;
            m12 += w * dx * dy * dy;
        }
    }
    let [m20, m02, m11, m30, m03, m21, m12] =
        [m20, m02, m11, m30, m03, m21, m12].map(|m| m / perimeter);

    let trace = m20 + m02;
    let det = m20 * m02 - m11 * m11;
    if !(trace > 0.0) || det <= 1e-12 * trace * trace {
        return None;
    }
    let r = det.sqrt().sqrt();
    let r2 = r * r;
    let r3 = r2 * r;

    let (n20, n02, n11) = (m20 / r2, m02 / r2, m11 / r2);
    let (n30, n03, n21, n12) = (m30 / r3, m03 / r3, m21 / r3, m12 / r3);

    let a = n30 + n12;
    let b = n21 + n03;
    let c = n30 - 3.0 * n12;
    let d = 3.0 * n21 - n03;

    Some([
        n20 + n02,
        (n20 - n02).powi(2) + 4.0 * n11 * n11,
        c * c + d * d,
        a * a + b * b,
        c * a * (a * a - 3.0 * b * b) + d * b * (3.0 * a * a - b * b),
        (n20 - n02) * (a * a - b * b) + 4.0 * n11 * a * b,
        d * a * (a * a - 3.0 * b * b) - c * b * (3.0 * a * a - b * b),
    ])
}

/// Isoperimetric ratio `perimeter^2 / (4*pi*area)`.
///
/// Zero-area contours report `1.0`; the result never drops below `1.0`.
pub fn compute_compactness(contour: &Contour) -> f64 {
    let area = contour.area();
    if !(area > 0.0) {
        return 1.0;
    }
    let perimeter = contour.perimeter();
    (perimeter * perimeter / (4.0 * PI * area)).max(1.0)
}

/// Sign-preserving `log10(|h| / floor)`; magnitudes under the floor map to 0.
#[inline]
fn signed_log10(h: f64) -> f64 {
    if !h.is_finite() || h.abs() < MOMENT_ZERO_FLOOR {
        0.0
    } else {
        h.signum() * (h.abs() / MOMENT_ZERO_FLOOR).log10()
    }
}

/// Log-scale city-block distance between the moment vectors.
///
/// For two same-sign invariants above [`MOMENT_ZERO_FLOOR`] each term is the
/// plain `|log10(a / b)|`.
pub fn moment_distance(a: &ShapeSignature, b: &ShapeSignature) -> f64 {
    a.moments
        .iter()
        .zip(b.moments.iter())
        .map(|(&x, &y)| (signed_log10(x) - signed_log10(y)).abs())
        .sum()
}

/// `exp(-0.5 * distance)`; `1.0` at zero distance.
pub fn moment_similarity(distance: f64) -> f64 {
    if distance.is_nan() {
        return 0.0;
    }
    (-0.5 * distance.max(0.0)).exp().clamp(0.0, 1.0)
}

/// Ratio of the smaller to the larger compactness.
pub fn compactness_similarity(a: f64, b: f64) -> f64 {
    let hi = a.max(b);
    if !(hi > 0.0) {
        return 1.0;
    }
    (a.min(b) / hi).clamp(0.0, 1.0)
}
