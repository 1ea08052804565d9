//! sRGB to CIE Lab conversion and perceptual distances.

use palette::{white_point::D65, FromColor, Lab, Srgb};
use serde::{Deserialize, Serialize};

/// sRGB color with channels in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn from_u8(r: u8, g: u8, b: u8) -> Self {
        Self::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }
}

/// Color in CIE Lab (D65). `l` is in `[0, 100]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColorSample {
    pub l: f32,
    pub a: f32,
    pub b: f32,
}

impl ColorSample {
    /// Lab value of mid grey (sRGB 0.5), used when a region holds no pixels.
    pub fn neutral_grey() -> Self {
        to_perceptual_color(Rgb::new(0.5, 0.5, 0.5))
    }

    #[inline]
    pub fn distance(&self, other: &ColorSample) -> f32 {
        color_distance(self, other)
    }
}

impl From<Lab<D65, f32>> for ColorSample {
    fn from(lab: Lab<D65, f32>) -> Self {
        Self {
            l: lab.l.clamp(0.0, 100.0),
            a: lab.a,
            b: lab.b,
        }
    }
}

impl From<ColorSample> for Lab<D65, f32> {
    fn from(c: ColorSample) -> Self {
        Lab::new(c.l, c.a, c.b)
    }
}

/// Convert an sRGB color to CIE Lab. Channels are clamped to `[0, 1]` first.
pub fn to_perceptual_color(rgb: Rgb) -> ColorSample {
    let srgb = Srgb::new(
        rgb.r.clamp(0.0, 1.0),
        rgb.g.clamp(0.0, 1.0),
        rgb.b.clamp(0.0, 1.0),
    );
    Lab::<D65, f32>::from_color(srgb.into_linear()).into()
}

/// Euclidean distance in Lab (CIE76 delta E).
pub fn color_distance(a: &ColorSample, b: &ColorSample) -> f32 {
    let dl = a.l - b.l;
    let da = a.a - b.a;
    let db = a.b - b.b;
    (dl * dl + da * da + db * db).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn reference_colors_convert() {
        let white = to_perceptual_color(Rgb::new(1.0, 1.0, 1.0));
        assert_abs_diff_eq!(white.l, 100.0, epsilon = 0.01);
        assert_abs_diff_eq!(white.a, 0.0, epsilon = 0.05);
        assert_abs_diff_eq!(white.b, 0.0, epsilon = 0.05);

        let black = to_perceptual_color(Rgb::new(0.0, 0.0, 0.0));
        assert_abs_diff_eq!(black.l, 0.0, epsilon = 1e-4);

        let red = to_perceptual_color(Rgb::from_u8(255, 0, 0));
        assert_abs_diff_eq!(red.l, 53.24, epsilon = 0.1);
        assert_abs_diff_eq!(red.a, 80.09, epsilon = 0.3);
        assert_abs_diff_eq!(red.b, 67.20, epsilon = 0.3);

        let grey = ColorSample::neutral_grey();
        assert_abs_diff_eq!(grey.l, 53.39, epsilon = 0.1);
    }

    #[test]
    fn distance_is_symmetric_and_zero_on_self() {
        let c = to_perceptual_color(Rgb::from_u8(12, 140, 200));
        let d = to_perceptual_color(Rgb::from_u8(220, 40, 20));
        assert_eq!(color_distance(&c, &to_perceptual_color(Rgb::from_u8(12, 140, 200))), 0.0);
        assert_eq!(color_distance(&c, &d), color_distance(&d, &c));
        assert!(c.distance(&d) > 50.0);
    }

    #[test]
    fn lightness_stays_in_range_for_out_of_gamut_input() {
        let c = to_perceptual_color(Rgb::new(2.0, -1.0, 0.5));
        assert!((0.0..=100.0).contains(&c.l));
    }

    #[test]
    fn converts_to_and_from_palette_lab() {
        let c = to_perceptual_color(Rgb::from_u8(40, 90, 160));
        let lab: Lab<D65, f32> = c.into();
        assert_eq!(ColorSample::from(lab), c);
    }
}
