use crate::fixture::{ActionFade, ActionSize};

/// Largest sequence fade and size ordinals.
pub const MAX_FADE: usize = 10;
pub const MAX_SIZE: usize = 10;

/// The intensity envelope one lit step is expanded into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FadeProfile {
    /// Rising ramp, ending at full.
    pub slope_on: Vec<u8>,
    /// Number of full-intensity samples between the ramps.
    pub plateau: usize,
    /// Falling ramp, starting at full.
    pub slope_off: Vec<u8>,
}

impl Default for FadeProfile {
    fn default() -> Self {
        Self::from_sequence(0, 0)
    }
}

impl FadeProfile {
    /// Build a profile from sequence fade and size ordinals (0..=10).
    ///
    /// Fade 0 is a hard cut: a single full-on sample with no off ramp.
    pub fn from_sequence(fade: usize, size: usize) -> Self {
        let fade = fade.min(MAX_FADE);
        if fade == 0 {
            return Self::hard(size.min(MAX_SIZE));
        }
        Self::ramped(fade, size.min(MAX_SIZE))
    }

    /// Build a profile for a switch chase action.
    pub fn from_action(fade: ActionFade, size: ActionSize) -> Self {
        let plateau = match size {
            ActionSize::Off => 0,
            ActionSize::Short => 1,
            ActionSize::Medium => 3,
            ActionSize::Long => 6,
        };
        match fade {
            ActionFade::Off => Self::hard(plateau),
            ActionFade::Sharp => Self::ramped(1, plateau),
            ActionFade::Normal => Self::ramped(5, plateau),
            ActionFade::Soft => Self::ramped(10, plateau),
        }
    }

    fn hard(plateau: usize) -> Self {
        Self {
            slope_on: vec![255],
            plateau,
            slope_off: vec![],
        }
    }

    /// Ramps of `steps + 1` samples between 0 and 255.
    fn ramped(steps: usize, plateau: usize) -> Self {
        let slope_on: Vec<u8> = (0..=steps)
            .map(|i| ((i as f64 / steps as f64) * 255.).round() as u8)
            .collect();
        let slope_off = slope_on.iter().rev().copied().collect();
        Self {
            slope_on,
            plateau,
            slope_off,
        }
    }

    /// Number of sub-steps each base step is divided into.
    pub fn width(&self) -> usize {
        self.slope_on.len().max(1)
    }

    /// The whole envelope of one lit step.
    pub fn envelope(&self) -> Vec<u8> {
        self.slope_on
            .iter()
            .copied()
            .chain(std::iter::repeat_n(255, self.plateau))
            .chain(self.slope_off.iter().copied())
            .collect()
    }
}
