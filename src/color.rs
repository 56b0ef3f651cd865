//! The named colour table and RGB helpers.

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::error::NotFound;

/// 24-bit RGB color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const WHITE: Self = Self::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Look up a color in the named color table.
    pub fn from_name(name: &str) -> Result<Self, NotFound> {
        name.trim()
            .parse::<NamedColor>()
            .map(NamedColor::rgb)
            .map_err(|_| NotFound::new("color", name))
    }

    /// Return the named color that is exactly this color, if there is one.
    pub fn name(&self) -> Option<NamedColor> {
        NamedColor::iter().find(|n| n.rgb() == *self)
    }

    pub fn is_black(&self) -> bool {
        *self == Self::BLACK
    }

    /// The complement of this color.
    pub fn invert(&self) -> Self {
        Self::new(self.r ^ 0xFF, self.g ^ 0xFF, self.b ^ 0xFF)
    }

    /// Scale every component by a 0-255 brightness.
    pub fn scaled(&self, brightness: u8) -> Self {
        Self::new(
            scale(self.r, brightness),
            scale(self.g, brightness),
            scale(self.b, brightness),
        )
    }

    /// The color as an array of three DMX values.
    pub fn rgb(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

/// Scale a color component by a brightness.
///
/// Both are treated as percentages: (value / 100) * (brightness / 2.55).
/// Rounded rather than truncated so that full scale stays at 255.
pub fn scale(value: u8, brightness: u8) -> u8 {
    let scaled = (value as f64 / 100.) * (brightness as f64 / 2.55);
    scaled.round().clamp(0., 255.) as u8
}

/// The authoritative named color table.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(ascii_case_insensitive)]
pub enum NamedColor {
    Red,
    Orange,
    Yellow,
    Green,
    Cyan,
    Blue,
    Purple,
    Pink,
    White,
    Black,
}

impl NamedColor {
    pub fn rgb(self) -> Color {
        match self {
            Self::Red => Color::new(255, 0, 0),
            Self::Orange => Color::new(255, 111, 0),
            Self::Yellow => Color::new(255, 255, 0),
            Self::Green => Color::new(0, 255, 0),
            Self::Cyan => Color::new(0, 255, 255),
            Self::Blue => Color::new(0, 0, 255),
            Self::Purple => Color::new(100, 0, 255),
            Self::Pink => Color::new(255, 0, 255),
            Self::White => Color::WHITE,
            Self::Black => Color::BLACK,
        }
    }

    /// Look up a named color by its position in the table.
    pub fn by_index(index: usize) -> Option<Self> {
        Self::iter().nth(index)
    }
}

/// The color a fixture was last driven to.
///
/// The "empty" sentinel (the fixture is dark) is represented by None wherever
/// one of these is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LastColor {
    pub rgb: Color,
    /// Index of the colour-wheel entry, for scanners.
    pub scanner_color: Option<usize>,
}

impl LastColor {
    pub fn rgb(rgb: Color) -> Self {
        Self {
            rgb,
            scanner_color: None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_scale_full_range() {
        assert_eq!(255, scale(255, 255));
        assert_eq!(0, scale(255, 0));
        assert_eq!(0, scale(0, 255));
        assert_eq!(128, scale(255, 128));
        assert_eq!(50, scale(100, 128));
    }

    #[test]
    fn test_name_lookup() {
        assert_eq!(Color::new(255, 0, 0), Color::from_name("Red").unwrap());
        assert_eq!(Color::new(0, 0, 255), Color::from_name("blue").unwrap());
        assert_eq!(
            Err(NotFound::new("color", "Mauve")),
            Color::from_name("Mauve")
        );
        assert_eq!(Some(NamedColor::Cyan), Color::new(0, 255, 255).name());
        assert_eq!(None, Color::new(1, 2, 3).name());
    }

    #[test]
    fn test_invert() {
        assert_eq!(NamedColor::Cyan.rgb(), NamedColor::Red.rgb().invert());
        assert_eq!(Color::WHITE, Color::BLACK.invert());
    }

    #[test]
    fn test_by_index() {
        assert_eq!(Some(NamedColor::Red), NamedColor::by_index(0));
        assert_eq!(Some(NamedColor::Black), NamedColor::by_index(9));
        assert_eq!(None, NamedColor::by_index(10));
    }
}
