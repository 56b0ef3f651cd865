use crossbeam_channel::Sender;

use super::{SequenceState, StaticColor};
use crate::{color::Color, pattern::PatternName, switch::Override};

/// Everything a sequence scheduler can be told.
#[derive(Debug, Clone)]
pub enum SequenceCommand {
    Start,
    Stop,
    UpdateSpeed(usize),
    UpdateColors(Vec<Color>),
    UpdatePattern(PatternName),
    UpdateSize(usize),
    UpdateShift(usize),
    IncreaseFade,
    DecreaseFade,
    UpdateRgbFade(usize),
    UpdateStatic(bool),
    UpdateStaticColor { slot: usize, color: StaticColor },
    UpdateMaster(u8),
    UpdateStrobe { on: bool, speed: u8 },
    Blackout,
    Normal,
    MusicTrigger(bool),
    Flood(bool),
    Hide,
    Unhide,
    /// Reply with a snapshot of the current state.
    ReadConfig(Sender<SequenceState>),
    LoadConfig(Box<SequenceState>),
    UpdateFunctions { bounce: bool, invert: bool, chaser: bool },
    UpdateGobo(usize),
    UpdateScannerColor(Option<usize>),
    /// The fixture catalogue changed; recount fixtures and regenerate.
    UpdateFixturesConfig,
    UpdateSwitch { slot: usize, position: usize },
    OverrideSwitch { slot: usize, overrides: Override },
    ClearSwitchOverride { slot: usize },
    ResetAllSwitchPositions,
    /// Stop every fixture worker and exit.
    Quit,
}

/// State pushed out to the control surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceUpdate {
    /// The sequence's state changed.
    State(Box<SequenceState>),
    /// The sequence advanced to a step.
    Step { sequence: usize, step: usize },
    /// A beat arrived for a music-triggered sequence.
    Beat { sequence: usize },
    /// A switch moved to a position.
    Switch {
        sequence: usize,
        slot: usize,
        position: usize,
    },
}
