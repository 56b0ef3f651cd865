//! Expand a pattern template into the steps a sequence plays.
use super::{
    fade::FadeProfile,
    template::{Cell, PatternName, Template},
};
use crate::color::Color;

/// What one fixture does at one sub-step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub color: Color,
    pub brightness: u8,
    pub enabled: bool,
    pub pan: u8,
    pub tilt: u8,
}

impl Position {
    pub const DARK: Self = Self {
        color: Color::BLACK,
        brightness: 0,
        enabled: false,
        pan: 128,
        tilt: 128,
    };
}

/// A generated pattern: every sub-step, for every fixture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Steps {
    pub steps: Vec<Vec<Position>>,
    /// Sub-steps per base step.
    pub width: usize,
}

impl Steps {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The step at an index, wrapping around.
    pub fn get(&self, index: usize) -> Option<&[Position]> {
        if self.steps.is_empty() {
            return None;
        }
        Some(&self.steps[index % self.steps.len()])
    }
}

#[derive(Debug, Clone)]
pub struct GeneratorParams<'a> {
    pub pattern: PatternName,
    pub fixtures: usize,
    pub colors: &'a [Color],
    /// Phase offset between fixtures, in base steps.
    pub shift: usize,
    /// Scanner shape amplitude.
    pub size: usize,
    pub bounce: bool,
    pub invert: bool,
    pub fade: &'a FadeProfile,
}

/// Build and expand the named pattern.
pub fn generate(params: &GeneratorParams) -> Steps {
    let mut template = Template::build(params.pattern, params.fixtures, params.size);
    template.recolor(params.colors);
    expand(&template, params)
}

/// Steps of a "standard" chase used to drive scanner masters only.
pub fn chaser_steps(fixtures: usize, shift: usize, fade: &FadeProfile) -> Steps {
    generate(&GeneratorParams {
        pattern: PatternName::Standard,
        fixtures,
        colors: &[],
        shift,
        size: 0,
        bounce: false,
        invert: false,
        fade,
    })
}

/// Apply shift, bounce and invert to a template, then expand each step into
/// its fade envelope. Scanner shapes are not enveloped.
pub fn expand(template: &Template, params: &GeneratorParams) -> Steps {
    let n = params.fixtures;
    let base = template.len();
    if base == 0 || n == 0 {
        return Steps::default();
    }
    let mut rows: Vec<Vec<Cell>> = (0..base)
        .map(|s| {
            (0..n)
                .map(|f| template.cell((s + f * params.shift) % base, f))
                .collect()
        })
        .collect();
    if params.bounce && rows.len() > 2 {
        let back: Vec<_> = rows[1..rows.len() - 1].iter().rev().cloned().collect();
        rows.extend(back);
    }
    if params.invert {
        for cell in rows.iter_mut().flatten() {
            let source = if cell.enabled { cell.color } else { Color::BLACK };
            cell.color = source.invert();
            cell.enabled = !cell.color.is_black();
        }
    }

    if params.pattern.is_scanner() {
        return Steps {
            steps: rows
                .iter()
                .map(|row| row.iter().map(|c| lit_position(c, 255)).collect())
                .collect(),
            width: 1,
        };
    }

    let width = params.fade.width();
    let envelope = params.fade.envelope();
    let total = rows.len() * width;
    let mut steps = vec![vec![Position::DARK; n]; total];
    for f in 0..n {
        for (s, row) in rows.iter().enumerate() {
            let cell = row[f];
            if !cell.enabled {
                continue;
            }
            for (k, level) in envelope.iter().enumerate() {
                let slot = &mut steps[(s * width + k) % total][f];
                if *level >= slot.brightness {
                    *slot = lit_position(&cell, *level);
                }
            }
        }
    }
    Steps { steps, width }
}

fn lit_position(cell: &Cell, brightness: u8) -> Position {
    let enabled = cell.enabled && brightness > 0;
    Position {
        color: cell.color,
        brightness: if enabled { brightness } else { 0 },
        enabled,
        pan: cell.pan,
        tilt: cell.tilt,
    }
}
