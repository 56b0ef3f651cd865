use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::{
    color::{Color, NamedColor},
    pattern::PatternName,
};

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum SequenceKind {
    #[default]
    Rgb,
    Scanner,
    Switch,
}

/// One fixture's colour while its sequence is in static mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticColor {
    pub color: Color,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub flash: bool,
}

impl Default for StaticColor {
    fn default() -> Self {
        Self {
            color: NamedColor::White.rgb(),
            enabled: true,
            flash: false,
        }
    }
}

/// Everything a sequence scheduler knows, as saved to presets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceState {
    /// Sequence number, from 1; matches the fixture group.
    pub number: usize,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: SequenceKind,
    pub running: bool,
    pub pattern: PatternName,
    pub colors: Vec<Color>,
    /// Speed ordinal.
    pub speed: usize,
    pub size: usize,
    pub shift: usize,
    pub fade: usize,
    /// Static fade speed.
    pub rgb_fade: usize,
    pub master: u8,
    pub strobe: bool,
    pub strobe_speed: u8,
    pub music_trigger: bool,
    pub flood: bool,
    #[serde(rename = "static")]
    pub static_mode: bool,
    pub static_colors: Vec<StaticColor>,
    pub bounce: bool,
    pub invert: bool,
    pub chaser: bool,
    pub blackout: bool,
    pub hidden: bool,
    /// Scanner gobo setting number.
    pub gobo: usize,
    /// Scanner colour-wheel index; None picks by colour name.
    pub scanner_color: Option<usize>,
    /// Current position of each switch, by slot.
    pub switch_positions: Vec<usize>,
}

impl Default for SequenceState {
    fn default() -> Self {
        Self {
            number: 1,
            label: String::new(),
            kind: SequenceKind::Rgb,
            running: false,
            pattern: PatternName::Standard,
            colors: Vec::new(),
            speed: 8,
            size: 3,
            shift: 0,
            fade: 0,
            rgb_fade: 1,
            master: 255,
            strobe: false,
            strobe_speed: 0,
            music_trigger: false,
            flood: false,
            static_mode: false,
            static_colors: Vec::new(),
            bounce: false,
            invert: false,
            chaser: false,
            blackout: false,
            hidden: false,
            gobo: 1,
            scanner_color: None,
            switch_positions: Vec::new(),
        }
    }
}

impl SequenceState {
    /// Index of this sequence, from 0.
    pub fn index(&self) -> usize {
        self.number.saturating_sub(1)
    }

    /// A display name for logging.
    pub fn name(&self) -> String {
        if self.label.is_empty() {
            format!("sequence {}", self.number)
        } else {
            self.label.clone()
        }
    }

    /// Take the user-facing parameters of a loaded state, keeping this
    /// sequence's identity.
    pub fn load(&mut self, loaded: SequenceState) {
        let (number, kind) = (self.number, self.kind);
        *self = loaded;
        self.number = number;
        self.kind = kind;
    }
}
