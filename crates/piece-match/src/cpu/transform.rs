use ::image::imageops::{self, FilterType};
use nalgebra::Point2;
use piece_match_core::{
    CapabilityError, Contour, ImageTransform, MaskBackground, NormRect, RgbaImage, RgbaImageView,
};

use super::{from_image_crate, to_image_crate};

/// Raster operations backed by `image::imageops`.
#[derive(Clone, Copy, Debug, Default)]
pub struct RasterTransform;

fn buffer_error() -> CapabilityError {
    CapabilityError::Backend("RGBA buffer does not match the image size".into())
}

fn bilinear(image: &RgbaImageView<'_>, x: f32, y: f32) -> [u8; 4] {
    let (w, h) = (image.width as i64, image.height as i64);
    let (x0, y0) = (x.floor(), y.floor());
    let (fx, fy) = (x - x0, y - y0);
    let fetch = |xi: i64, yi: i64| -> [f32; 4] {
        if xi < 0 || yi < 0 || xi >= w || yi >= h {
            return [0.0; 4];
        }
        let p = image.pixel(xi as usize, yi as usize);
        [p[0] as f32, p[1] as f32, p[2] as f32, p[3] as f32]
    };
    let (xi, yi) = (x0 as i64, y0 as i64);
    let p00 = fetch(xi, yi);
    let p10 = fetch(xi + 1, yi);
    let p01 = fetch(xi, yi + 1);
    let p11 = fetch(xi + 1, yi + 1);
    let mut out = [0u8; 4];
    for c in 0..4 {
        let top = p00[c] * (1.0 - fx) + p10[c] * fx;
        let bottom = p01[c] * (1.0 - fx) + p11[c] * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    out
}

impl ImageTransform for RasterTransform {
    fn crop(
        &self,
        image: &RgbaImageView<'_>,
        rect: NormRect,
    ) -> Result<RgbaImage, CapabilityError> {
        let b = rect
            .pixel_bounds(image.width, image.height)
            .ok_or(CapabilityError::DegenerateRegion)?;
        let src = to_image_crate(image).ok_or_else(buffer_error)?;
        let cropped = imageops::crop_imm(
            &src,
            b.x0 as u32,
            b.y0 as u32,
            b.width() as u32,
            b.height() as u32,
        )
        .to_image();
        Ok(from_image_crate(cropped))
    }

    fn downsample(&self, image: &RgbaImageView<'_>, max_dimension: usize) -> RgbaImage {
        let longest = image.width.max(image.height);
        if max_dimension == 0 || longest <= max_dimension {
            return image.to_image();
        }
        let Some(src) = to_image_crate(image) else {
            log::warn!("downsample: malformed RGBA buffer, keeping the original");
            return image.to_image();
        };
        let scale = max_dimension as f32 / longest as f32;
        let nw = ((image.width as f32 * scale).round() as u32).max(1);
        let nh = ((image.height as f32 * scale).round() as u32).max(1);
        from_image_crate(imageops::resize(&src, nw, nh, FilterType::Triangle))
    }

    fn rotate(&self, image: &RgbaImageView<'_>, degrees: f32) -> RgbaImage {
        let deg = degrees.rem_euclid(360.0);
        let quarter = (deg / 90.0).round();
        if (deg - quarter * 90.0).abs() < 1e-3 {
            let Some(src) = to_image_crate(image) else {
                return image.to_image();
            };
            let rotated = match quarter as u32 % 4 {
                0 => src,
                1 => imageops::rotate90(&src),
                2 => imageops::rotate180(&src),
                _ => imageops::rotate270(&src),
            };
            return from_image_crate(rotated);
        }

        let (w, h) = (image.width as f32, image.height as f32);
        let (s, c) = deg.to_radians().sin_cos();
        let nw = (w * c.abs() + h * s.abs()).ceil() as usize;
        let nh = (w * s.abs() + h * c.abs()).ceil() as usize;
        let mut out = RgbaImage::new(nw, nh);
        let (scx, scy) = (w / 2.0, h / 2.0);
        let (dcx, dcy) = (nw as f32 / 2.0, nh as f32 / 2.0);
        for y in 0..nh {
            for x in 0..nw {
                let dx = x as f32 + 0.5 - dcx;
                let dy = y as f32 + 0.5 - dcy;
                // Inverse of a clockwise rotation in y-down coordinates.
                let sx = c * dx + s * dy + scx - 0.5;
                let sy = -s * dx + c * dy + scy - 0.5;
                if sx > -1.0 && sy > -1.0 && sx < w && sy < h {
                    out.put_pixel(x, y, bilinear(image, sx, sy));
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
        let (w, h) = (image.width as f32, image.height as f32);
        let bbox = contour
            .bounding_rect()
            .pixel_bounds(image.width, image.height);
        for y in 0..image.height {
            for x in 0..image.width {
                let in_bbox = bbox
                    .map(|b| x >= b.x0 && x < b.x1 && y >= b.y0 && y < b.y1)
                    .unwrap_or(false);
                let p = Point2::new((x as f32 + 0.5) / w, (y as f32 + 0.5) / h);
                if !in_bbox || !contour.contains(p) {
                    out.put_pixel(x, y, outside);
                }
            }
        }
        Ok(out)
    }
}
