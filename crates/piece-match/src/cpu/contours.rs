//! Background-distance thresholding, boundary tracing and polygon
//! simplification.

use nalgebra::Point2;
use piece_match_core::{CapabilityError, Contour, ContourExtractor, RgbaImageView};
use serde::{Deserialize, Serialize};

/// Clockwise 8-neighbourhood (y down), starting west.
const RING: [(i32, i32); 8] = [
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
];

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ContourParams {
    /// Components with fewer pixels are ignored.
    pub min_area_px: usize,
    /// Douglas-Peucker tolerance in pixels.
    pub simplify_epsilon_px: f32,
    /// Lower bound on the foreground threshold (sum of absolute RGB
    /// differences from the background).
    pub min_threshold: f32,
    /// Width of the border (pixels) used to estimate the background color.
    pub border_px: usize,
}

impl Default for ContourParams {
    fn default() -> Self {
        Self {
            min_area_px: 24,
            simplify_epsilon_px: 1.5,
            min_threshold: 45.0,
            border_px: 2,
        }
    }
}

/// Outer contours of regions that stand out from the image background.
///
/// The background color is the mean of the image border. Every pixel gets a
/// distance to it; an Otsu split of those distances (never below
/// `min_threshold`) separates foreground. `contrast_adjustment` scales the
/// distances before thresholding, so values above 1 pick up fainter regions.
#[derive(Clone, Debug, Default)]
pub struct ThresholdContours {
    params: ContourParams,
}

impl ThresholdContours {
    pub fn new(params: ContourParams) -> Self {
        Self { params }
    }
}

fn border_mean(image: &RgbaImageView<'_>, border: usize) -> [f32; 3] {
    let (w, h) = (image.width, image.height);
    let b = border.max(1).min(w.min(h) / 2).max(1);
    let mut sum = [0f64; 3];
    let mut n = 0usize;
    for y in 0..h {
        for x in 0..w {
            if x >= b && x + b < w && y >= b && y + b < h {
                continue;
            }
            let p = image.pixel(x, y);
            for c in 0..3 {
                sum[c] += p[c] as f64;
            }
            n += 1;
        }
    }
    let n = n.max(1) as f64;
    [
        (sum[0] / n) as f32,
        (sum[1] / n) as f32,
        (sum[2] / n) as f32,
    ]
}

/// Otsu threshold over values in `[0, max]`.
fn otsu(values: &[f32], max: f32) -> f32 {
    const BINS: usize = 256;
    if values.is_empty() || max <= 0.0 {
        return 0.0;
    }
    let mut hist = [0usize; BINS];
    for &v in values {
        let bin = ((v / max) * (BINS - 1) as f32).round().clamp(0.0, (BINS - 1) as f32) as usize;
        hist[bin] += 1;
    }
    let total = values.len() as f64;
    let sum_all: f64 = hist.iter().enumerate().map(|(i, &c)| i as f64 * c as f64).sum();
    let (mut w0, mut sum0) = (0f64, 0f64);
    let (mut best_t, mut best_var) = (0usize, -1f64);
    for (t, &count) in hist.iter().enumerate() {
        w0 += count as f64;
        if w0 == 0.0 {
            continue;
        }
        let w1 = total - w0;
        if w1 == 0.0 {
            break;
        }
        sum0 += t as f64 * count as f64;
        let m0 = sum0 / w0;
        let m1 = (sum_all - sum0) / w1;
        let var = w0 * w1 * (m0 - m1) * (m0 - m1);
        if var > best_var {
            best_var = var;
            best_t = t;
        }
    }
    (best_t as f32 + 0.5) / (BINS - 1) as f32 * max
}

/// 4-connected component labels (0 = background) and per-label sizes.
fn label_components(mask: &[bool], w: usize, h: usize) -> (Vec<u32>, Vec<usize>) {
    let mut labels = vec![0u32; w * h];
    let mut sizes = vec![0usize];
    let mut stack = Vec::new();
    for start in 0..w * h {
        if !mask[start] || labels[start] != 0 {
            continue;
        }
        let label = sizes.len() as u32;
        let mut size = 0usize;
        labels[start] = label;
        stack.push(start);
        while let Some(i) = stack.pop() {
            size += 1;
            let (x, y) = (i % w, i / w);
            let mut visit = |j: usize| {
                if mask[j] && labels[j] == 0 {
                    labels[j] = label;
                    stack.push(j);
                }
            };
            if x > 0 {
                visit(i - 1);
            }
            if x + 1 < w {
                visit(i + 1);
            }
            if y > 0 {
                visit(i - w);
            }
            if y + 1 < h {
                visit(i + w);
            }
        }
        sizes.push(size);
    }
    (labels, sizes)
}

/// Moore-neighbour trace of the outer boundary starting at `start`, the
/// first pixel of the component in raster order.
fn trace_boundary(labels: &[u32], w: usize, h: usize, start: usize) -> Vec<(i32, i32)> {
    let label = labels[start];
    let inside = |x: i32, y: i32| {
        x >= 0
            && y >= 0
            && (x as usize) < w
            && (y as usize) < h
            && labels[y as usize * w + x as usize] == label
    };
    let s = ((start % w) as i32, (start / w) as i32);
    let mut boundary = vec![s];
    let mut cur = s;
    // Direction (index into RING) from `cur` to the last background pixel seen.
    let mut back = 0usize;
    let mut second: Option<(i32, i32)> = None;

    for _ in 0..4 * w * h + 8 {
        let mut next = None;
        for k in 1..=8 {
            let d = (back + k) % 8;
            let p = (cur.0 + RING[d].0, cur.1 + RING[d].1);
            if inside(p.0, p.1) {
                next = Some((d, p));
                break;
            }
        }
        let Some((d, p)) = next else {
            break;
        };
        if cur == s {
            match second {
                None => second = Some(p),
                Some(first_step) if first_step == p => break,
                Some(_) => {}
            }
        }
        let prev = (d + 7) % 8;
        let q = (cur.0 + RING[prev].0, cur.1 + RING[prev].1);
        let rel = (q.0 - p.0, q.1 - p.1);
        back = RING.iter().position(|&r| r == rel).unwrap_or(0);
        cur = p;
        boundary.push(cur);
    }
    if boundary.len() > 1 && boundary.last() == Some(&s) {
        boundary.pop();
    }
    boundary
}

fn point_line_distance(p: Point2<f32>, a: Point2<f32>, b: Point2<f32>) -> f32 {
    let ab = b - a;
    let len = ab.norm();
    if len <= f32::EPSILON {
        return (p - a).norm();
    }
    (ab.x * (p.y - a.y) - ab.y * (p.x - a.x)).abs() / len
}

/// Douglas-Peucker on the open chain `points[first..=last]`; marks kept points.
fn douglas_peucker(points: &[Point2<f32>], first: usize, last: usize, eps: f32, keep: &mut [bool]) {
    let mut stack = vec![(first, last)];
    while let Some((a, b)) = stack.pop() {
        if b <= a + 1 {
            continue;
        }
        let (mut idx, mut dmax) = (a, 0.0f32);
        for i in a + 1..b {
            let d = point_line_distance(points[i], points[a], points[b]);
            if d > dmax {
                dmax = d;
                idx = i;
            }
        }
        if dmax > eps {
            keep[idx] = true;
            stack.push((a, idx));
            stack.push((idx, b));
        }
    }
}

/// Simplify a closed polygon, anchoring on the point farthest from the first.
pub(crate) fn simplify_closed(points: &[Point2<f32>], eps: f32) -> Vec<Point2<f32>> {
    let n = points.len();
    if n < 4 {
        return points.to_vec();
    }
    let far = (1..n)
        .max_by(|&i, &j| {
            (points[i] - points[0])
                .norm_squared()
                .total_cmp(&(points[j] - points[0]).norm_squared())
        })
        .unwrap_or(n / 2);
    let mut chain = points.to_vec();
    chain.push(points[0]);
    let mut keep = vec![false; n + 1];
    keep[0] = true;
    keep[far] = true;
    douglas_peucker(&chain, 0, far, eps, &mut keep);
    douglas_peucker(&chain, far, n, eps, &mut keep);
    chain
        .into_iter()
        .zip(keep)
        .take(n)
        .filter_map(|(p, k)| k.then_some(p))
        .collect()
}

impl ContourExtractor for ThresholdContours {
    fn detect(
        &self,
        image: &RgbaImageView<'_>,
        contrast_adjustment: f32,
        max_count: usize,
    ) -> Result<Vec<Contour>, CapabilityError> {
        let (w, h) = (image.width, image.height);
        if w < 3 || h < 3 {
            return Err(CapabilityError::ImageTooSmall {
                width: w,
                height: h,
                min: 3,
            });
        }
        let bg = border_mean(image, self.params.border_px);
        let gain = if contrast_adjustment > 0.0 {
            contrast_adjustment
        } else {
            1.0
        };
        let distances: Vec<f32> = (0..w * h)
            .map(|i| {
                let p = image.pixel(i % w, i / w);
                let d = (p[0] as f32 - bg[0]).abs()
                    + (p[1] as f32 - bg[1]).abs()
                    + (p[2] as f32 - bg[2]).abs();
                d * gain
            })
            .collect();
        let max = distances.iter().copied().fold(0.0f32, f32::max);
        if max < self.params.min_threshold {
            return Ok(Vec::new());
        }
        let threshold = otsu(&distances, max).max(self.params.min_threshold);
        let mask: Vec<bool> = distances.iter().map(|&d| d > threshold).collect();

        let (labels, sizes) = label_components(&mask, w, h);
        let mut seen = vec![false; sizes.len()];
        let mut contours: Vec<(f64, Contour)> = Vec::new();
        for (i, &label) in labels.iter().enumerate() {
            let l = label as usize;
            if l == 0 || seen[l] {
                continue;
            }
            seen[l] = true;
            if sizes[l] < self.params.min_area_px {
                continue;
            }
            let boundary: Vec<Point2<f32>> = trace_boundary(&labels, w, h, i)
                .into_iter()
                .map(|(x, y)| Point2::new(x as f32 + 0.5, y as f32 + 0.5))
                .collect();
            let simplified = simplify_closed(&boundary, self.params.simplify_epsilon_px);
            if simplified.len() < 3 {
                continue;
            }
            let contour = Contour::new(simplified).scaled(1.0 / w as f32, 1.0 / h as f32);
            contours.push((sizes[l] as f64, contour));
        }
        contours.sort_by(|a, b| b.0.total_cmp(&a.0));
        Ok(contours
            .into_iter()
            .take(max_count)
            .map(|(_, c)| c)
            .collect())
    }
}
