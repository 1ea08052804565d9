use piece_match_core::RgbaImageView;
use serde::{Deserialize, Serialize};

/// How the captured pixels must be turned to appear upright.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Up,
    /// Rotate a quarter turn clockwise to display upright.
    Right,
    Down,
    /// Rotate a quarter turn counter-clockwise to display upright.
    Left,
}

impl Orientation {
    /// Clockwise rotation that makes the photo upright.
    pub fn correction_degrees(self) -> f32 {
        match self {
            Orientation::Up => 0.0,
            Orientation::Right => 90.0,
            Orientation::Down => 180.0,
            Orientation::Left => 270.0,
        }
    }
}

/// A captured manual page.
#[derive(Clone, Copy, Debug)]
pub struct ReferencePhoto<'a> {
    pub image: RgbaImageView<'a>,
    pub orientation: Orientation,
}

impl<'a> ReferencePhoto<'a> {
    pub fn upright(image: RgbaImageView<'a>) -> Self {
        Self {
            image,
            orientation: Orientation::Up,
        }
    }
}
