//! Built-in pattern templates.
use std::f64::consts::TAU;

use log::debug;
use rand::{Rng, SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use super::fade::MAX_SIZE;
use crate::{
    color::{Color, NamedColor},
    error::NotFound,
};

/// Number of positions in a scanner shape.
pub const SCANNER_STEPS: usize = 36;

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum PatternName {
    #[default]
    Standard,
    RgbChase,
    Pairs,
    Inward,
    Colors,
    Flash,
    Random,
    Circle,
    LeftRight,
    UpDown,
    ZigZag,
}

impl PatternName {
    pub fn lookup(name: &str) -> Result<Self, NotFound> {
        name.trim()
            .parse()
            .map_err(|_| NotFound::new("pattern", name))
    }

    /// True for shapes that move pan and tilt.
    pub fn is_scanner(self) -> bool {
        matches!(
            self,
            Self::Circle | Self::LeftRight | Self::UpDown | Self::ZigZag
        )
    }

    /// The patterns available to a sequence type.
    pub fn for_scanners(scanner: bool) -> impl Iterator<Item = Self> {
        Self::iter().filter(move |p| p.is_scanner() == scanner)
    }
}

/// One fixture at one step of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub color: Color,
    pub enabled: bool,
    pub pan: u8,
    pub tilt: u8,
}

impl Cell {
    pub const DARK: Self = Self {
        color: Color::BLACK,
        enabled: false,
        pan: 128,
        tilt: 128,
    };

    pub fn lit(color: Color) -> Self {
        Self {
            color,
            enabled: true,
            ..Self::DARK
        }
    }

    fn at(pan: f64, tilt: f64) -> Self {
        Self {
            pan: pan.round().clamp(0., 255.) as u8,
            tilt: tilt.round().clamp(0., 255.) as u8,
            ..Self::lit(Color::WHITE)
        }
    }
}

/// Per-step, per-fixture cells. Rows may be shorter than the fixture count;
/// missing fixtures are dark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub steps: Vec<Vec<Cell>>,
}

impl Template {
    pub fn build(pattern: PatternName, fixtures: usize, size: usize) -> Self {
        let n = fixtures.max(1);
        let white = Color::WHITE;
        let steps = match pattern {
            PatternName::Standard => (0..n).map(|s| single(n, s, white)).collect(),
            PatternName::RgbChase => [NamedColor::Red, NamedColor::Green, NamedColor::Blue]
                .into_iter()
                .flat_map(|c| (0..n).map(move |s| single(n, s, c.rgb())))
                .collect(),
            PatternName::Pairs => (0..2)
                .map(|s| {
                    (0..n)
                        .map(|f| if f % 2 == s { Cell::lit(white) } else { Cell::DARK })
                        .collect()
                })
                .collect(),
            PatternName::Inward => (0..n.div_ceil(2))
                .map(|s| {
                    (0..n)
                        .map(|f| {
                            if f == s || f == n - 1 - s {
                                Cell::lit(white)
                            } else {
                                Cell::DARK
                            }
                        })
                        .collect()
                })
                .collect(),
            PatternName::Colors => rainbow()
                .map(|c| vec![Cell::lit(c); n])
                .collect(),
            PatternName::Flash => vec![vec![Cell::lit(white); n], vec![Cell::DARK; n]],
            PatternName::Random => {
                let palette: Vec<_> = rainbow().collect();
                let mut rng = SmallRng::seed_from_u64(n as u64);
                (0..n)
                    .map(|_| {
                        (0..n)
                            .map(|_| Cell::lit(palette[rng.random_range(0..palette.len())]))
                            .collect()
                    })
                    .collect()
            }
            PatternName::Circle => {
                scanner_shape(n, size, |p| ((TAU * p).cos(), (TAU * p).sin()))
            }
            PatternName::LeftRight => scanner_shape(n, size, |p| (triangle(p), 0.)),
            PatternName::UpDown => scanner_shape(n, size, |p| (0., triangle(p))),
            PatternName::ZigZag => scanner_shape(n, size, |p| {
                let zig = if (p * 8.).floor() as usize % 2 == 0 {
                    1.
                } else {
                    -1.
                };
                (triangle(p), zig)
            }),
        };
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The cell for a fixture at a step; fixtures beyond the row are dark.
    pub fn cell(&self, step: usize, fixture: usize) -> Cell {
        self.steps
            .get(step)
            .and_then(|row| row.get(fixture))
            .copied()
            .unwrap_or(Cell::DARK)
    }

    /// Distinct colours of lit cells, in order of first appearance.
    pub fn palette(&self) -> Vec<Color> {
        let mut palette = vec![];
        for cell in self.steps.iter().flatten().filter(|c| c.enabled) {
            if !palette.contains(&cell.color) {
                palette.push(cell.color);
            }
        }
        palette
    }

    /// Substitute the template's palette with the provided colours.
    ///
    /// Returns how many of the provided colours had no slot and were dropped.
    pub fn recolor(&mut self, colors: &[Color]) -> usize {
        let palette = self.palette();
        if colors.is_empty() {
            return 0;
        }
        for cell in self.steps.iter_mut().flatten().filter(|c| c.enabled) {
            if let Some(i) = palette.iter().position(|p| *p == cell.color) {
                if let Some(c) = colors.get(i) {
                    cell.color = *c;
                }
            }
        }
        let dropped = colors.len().saturating_sub(palette.len());
        if dropped > 0 {
            debug!(
                "Pattern has {} colour slot(s); ignoring {dropped} extra colour(s).",
                palette.len()
            );
        }
        dropped
    }
}

/// Only fixture `lit` is on.
fn single(n: usize, lit: usize, color: Color) -> Vec<Cell> {
    (0..n)
        .map(|f| if f == lit { Cell::lit(color) } else { Cell::DARK })
        .collect()
}

/// Every named colour except white and black.
fn rainbow() -> impl Iterator<Item = Color> {
    NamedColor::iter()
        .filter(|c| !matches!(c, NamedColor::White | NamedColor::Black))
        .map(NamedColor::rgb)
}

/// Triangle wave over one cycle, in phase with cos: 1 at 0, -1 at 0.5.
fn triangle(phase: f64) -> f64 {
    4. * (phase - 0.5).abs() - 1.
}

/// Sample a unit shape (indexed by phase in 0..1) around the centre of
/// travel; size sets the amplitude.
fn scanner_shape(n: usize, size: usize, shape: impl Fn(f64) -> (f64, f64)) -> Vec<Vec<Cell>> {
    let amplitude = 127.5 * size.min(MAX_SIZE) as f64 / MAX_SIZE as f64;
    (0..SCANNER_STEPS)
        .map(|s| {
            let (x, y) = shape(s as f64 / SCANNER_STEPS as f64);
            vec![Cell::at(127.5 + amplitude * x, 127.5 + amplitude * y); n]
        })
        .collect()
}
