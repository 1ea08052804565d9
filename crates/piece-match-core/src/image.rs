use serde::{Deserialize, Serialize};

use crate::color::{to_perceptual_color, ColorSample, Rgb};
use crate::geometry::NormRect;

/// Borrowed RGBA8 image.
///
/// Images produced by masking carry premultiplied alpha; fully opaque
/// images are unaffected by the distinction.
#[derive(Clone, Copy, Debug)]
pub struct RgbaImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major RGBA, len = w*h*4
}

/// Owned RGBA8 image.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RgbaImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl RgbaImage {
    /// Fully transparent image.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height * 4],
        }
    }

    pub fn filled(width: usize, height: usize, rgba: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity(width * height * 4);
        for _ in 0..width * height {
            data.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Wrap a raw buffer; `None` if its length does not match the dimensions.
    pub fn from_raw(width: usize, height: usize, data: Vec<u8>) -> Option<Self> {
        (data.len() == width * height * 4).then_some(Self {
            width,
            height,
            data,
        })
    }

    #[inline]
    pub fn view(&self) -> RgbaImageView<'_> {
        RgbaImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        self.view().pixel(x, y)
    }

    #[inline]
    pub fn put_pixel(&mut self, x: usize, y: usize, rgba: [u8; 4]) {
        let i = (y * self.width + x) * 4;
        self.data[i..i + 4].copy_from_slice(&rgba);
    }
}

impl RgbaImageView<'_> {
    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let i = (y * self.width + x) * 4;
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn to_image(&self) -> RgbaImage {
        RgbaImage {
            width: self.width,
            height: self.height,
            data: self.data[..self.width * self.height * 4].to_vec(),
        }
    }
}

/// Mean color of the pixels inside `rect`, converted to Lab.
///
/// Alpha is ignored. A rect that covers no pixel yields
/// [`ColorSample::neutral_grey`].
pub fn sample_region(image: &RgbaImageView<'_>, rect: NormRect) -> ColorSample {
    let Some(b) = rect.pixel_bounds(image.width, image.height) else {
        return ColorSample::neutral_grey();
    };
    let mut sum = [0u64; 3];
    for y in b.y0..b.y1 {
        for x in b.x0..b.x1 {
            let p = image.pixel(x, y);
            sum[0] += p[0] as u64;
            sum[1] += p[1] as u64;
            sum[2] += p[2] as u64;
        }
    }
    let n = (b.area() as f64) * 255.0;
    to_perceptual_color(Rgb::new(
        (sum[0] as f64 / n) as f32,
        (sum[1] as f64 / n) as f32,
        (sum[2] as f64 / n) as f32,
    ))
}

/// Mean color of the non-transparent pixels of a premultiplied image.
///
/// Returns `None` when every pixel is fully transparent.
pub fn sample_opaque_region(image: &RgbaImageView<'_>) -> Option<ColorSample> {
    let mut sum = [0f64; 3];
    let mut count = 0usize;
    for px in image.data.chunks_exact(4).take(image.width * image.height) {
        let a = px[3];
        if a == 0 {
            continue;
        }
        let alpha = a as f64;
        for c in 0..3 {
            sum[c] += (px[c] as f64 / alpha).min(1.0);
        }
        count += 1;
    }
    if count == 0 {
        return None;
    }
    let n = count as f64;
    Some(to_perceptual_color(Rgb::new(
        (sum[0] / n) as f32,
        (sum[1] / n) as f32,
        (sum[2] / n) as f32,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::color_distance;
    use approx::assert_abs_diff_eq;

    fn two_tone() -> RgbaImage {
        // Left half red, right half blue.
        let mut img = RgbaImage::filled(10, 4, [0, 0, 255, 255]);
        for y in 0..4 {
            for x in 0..5 {
                img.put_pixel(x, y, [255, 0, 0, 255]);
            }
        }
        img
    }

    #[test]
    fn region_mean_matches_uniform_patch() {
        let img = two_tone();
        let red = sample_region(&img.view(), NormRect::new(0.0, 0.0, 0.5, 1.0));
        let expected = to_perceptual_color(Rgb::from_u8(255, 0, 0));
        assert!(color_distance(&red, &expected) < 1e-3);
    }

    #[test]
    fn region_mean_averages_mixed_pixels() {
        let img = two_tone();
        let mixed = sample_region(&img.view(), NormRect::UNIT);
        let expected = to_perceptual_color(Rgb::new(0.5, 0.0, 0.5));
        assert!(color_distance(&mixed, &expected) < 1e-3);
    }

    #[test]
    fn empty_region_falls_back_to_grey() {
        let img = two_tone();
        let c = sample_region(&img.view(), NormRect::new(2.0, 2.0, 0.5, 0.5));
        assert_eq!(c, ColorSample::neutral_grey());
    }

    #[test]
    fn opaque_sampling_skips_transparent_pixels() {
        let mut img = RgbaImage::new(4, 4);
        img.put_pixel(1, 1, [0, 128, 0, 128]); // premultiplied pure green at 50%
        img.put_pixel(2, 2, [0, 255, 0, 255]);
        let c = sample_opaque_region(&img.view()).expect("has opaque pixels");
        let green = to_perceptual_color(Rgb::new(0.0, 1.0, 0.0));
        assert_abs_diff_eq!(c.l, green.l, epsilon = 0.01);
    }

    #[test]
    fn opaque_sampling_of_transparent_image_is_none() {
        let img = RgbaImage::new(8, 8);
        assert!(sample_opaque_region(&img.view()).is_none());
    }

    #[test]
    fn from_raw_checks_length() {
        assert!(RgbaImage::from_raw(2, 2, vec![0; 16]).is_some());
        assert!(RgbaImage::from_raw(2, 2, vec![0; 15]).is_none());
    }
}
