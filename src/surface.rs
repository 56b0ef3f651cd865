//! The button grid: input events mapped onto show commands, and lamp messages
//! fanned out to whatever is drawing the grid.
use log::debug;
use strum::IntoEnumIterator;

use crate::{
    color::{Color, NamedColor},
    fixture::Catalogue,
    pattern::{MAX_SIZE, PatternName},
    sequence::{MAX_SPEED, SequenceCommand, SequenceKind, SequenceState, SequenceUpdate},
    show::ShowCommand,
};

/// Added to the column of a press held long enough to count as a long press.
pub const LONG_PRESS: usize = 100;

pub const GRID_WIDTH: usize = 9;

const SELECT_ROW: usize = 0;
const TRANSPORT_ROW: usize = 1;
const COLOR_ROW: usize = 2;
const PATTERN_ROW: usize = 3;
const MODE_ROW: usize = 4;
const SWITCH_ROW: usize = 5;
const FIRST_PRESET_ROW: usize = 6;
const PRESET_ROWS: usize = 3;

/// One press or release on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    /// Column; a long press arrives with `LONG_PRESS` added.
    pub x: usize,
    pub y: usize,
    pub pressed: bool,
}

impl ButtonEvent {
    pub fn press(x: usize, y: usize) -> Self {
        Self {
            x,
            y,
            pressed: true,
        }
    }

    pub fn long_press(x: usize, y: usize) -> Self {
        Self::press(x + LONG_PRESS, y)
    }

    pub fn is_long(&self) -> bool {
        self.x >= LONG_PRESS
    }

    pub fn column(&self) -> usize {
        self.x % LONG_PRESS
    }
}

/// A lamp change on the grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonMessage {
    Light { x: usize, y: usize, color: Color },
    Flash { x: usize, y: usize, color: Color },
    ClearAll,
}

impl ButtonMessage {
    fn light(x: usize, y: usize, on: bool) -> Self {
        Self::Light {
            x,
            y,
            color: if on { Color::WHITE } else { Color::BLACK },
        }
    }
}

/// Something that draws the grid.
pub trait ButtonRenderer: Send {
    fn render(&mut self, msg: &ButtonMessage);
}

/// Renderer used when no grid hardware is attached.
pub struct LogRenderer;

impl ButtonRenderer for LogRenderer {
    fn render(&mut self, msg: &ButtonMessage) {
        debug!("Grid: {msg:?}.");
    }
}

/// Every registered renderer gets every message.
#[derive(Default)]
pub struct GridOutput {
    renderers: Vec<Box<dyn ButtonRenderer>>,
}

impl GridOutput {
    pub fn register(&mut self, renderer: Box<dyn ButtonRenderer>) {
        self.renderers.push(renderer);
    }

    pub fn send(&mut self, msg: &ButtonMessage) {
        for renderer in &mut self.renderers {
            renderer.render(msg);
        }
    }
}

/// Maps grid presses onto commands for the selected sequence.
///
/// Tracks the last state pushed by each sequence so toggles know which way
/// to go.
pub struct GridLayout {
    selected: usize,
    sequences: Vec<SequenceState>,
    /// Position counts of each sequence's switches, by slot.
    switch_positions: Vec<Vec<usize>>,
}

impl GridLayout {
    pub fn new(sequences: Vec<SequenceState>, catalogue: &Catalogue) -> Self {
        let mut layout = Self {
            selected: 0,
            sequences,
            switch_positions: Vec::new(),
        };
        layout.update_catalogue(catalogue);
        layout
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Pick up switch position counts after the catalogue changed.
    pub fn update_catalogue(&mut self, catalogue: &Catalogue) {
        self.switch_positions = (0..self.sequences.len())
            .map(|seq| {
                catalogue
                    .switches(seq)
                    .iter()
                    .map(|s| s.states.len())
                    .collect()
            })
            .collect();
    }

    /// Translate a grid event into show commands.
    pub fn handle(&mut self, event: ButtonEvent) -> Vec<ShowCommand> {
        if !event.pressed {
            return Vec::new();
        }
        let (x, y, long) = (event.column(), event.y, event.is_long());
        if y >= FIRST_PRESET_ROW && y < FIRST_PRESET_ROW + PRESET_ROWS {
            let y = y - FIRST_PRESET_ROW;
            return vec![if long {
                ShowCommand::SavePreset { x, y }
            } else {
                ShowCommand::LoadPreset { x, y }
            }];
        }
        if y == SELECT_ROW {
            return self.select(x, long);
        }
        let Some(state) = self.sequences.get(self.selected) else {
            return Vec::new();
        };
        let cmd = match y {
            TRANSPORT_ROW => transport(state, x),
            COLOR_ROW => NamedColor::by_index(x).map(|named| {
                let mut colors = if long {
                    state.colors.clone()
                } else {
                    Vec::new()
                };
                colors.push(named.rgb());
                SequenceCommand::UpdateColors(colors)
            }),
            PATTERN_ROW => PatternName::iter()
                .nth(x)
                .map(SequenceCommand::UpdatePattern),
            MODE_ROW => return self.mode(x),
            SWITCH_ROW => self.switch(x, long),
            _ => None,
        };
        cmd.map(|cmd| ShowCommand::Sequence {
            sequence: self.selected,
            cmd,
        })
        .into_iter()
        .collect()
    }

    fn select(&mut self, x: usize, long: bool) -> Vec<ShowCommand> {
        let Some(state) = self.sequences.get(x) else {
            return Vec::new();
        };
        if long {
            let cmd = if state.hidden {
                SequenceCommand::Unhide
            } else {
                SequenceCommand::Hide
            };
            return vec![ShowCommand::Sequence { sequence: x, cmd }];
        }
        self.selected = x;
        Vec::new()
    }

    fn mode(&self, x: usize) -> Vec<ShowCommand> {
        let state = &self.sequences[self.selected];
        let functions = |bounce, invert, chaser| SequenceCommand::UpdateFunctions {
            bounce,
            invert,
            chaser,
        };
        let cmd = match x {
            0 => SequenceCommand::UpdateStatic(!state.static_mode),
            1 => SequenceCommand::Flood(!state.flood),
            2 => SequenceCommand::MusicTrigger(!state.music_trigger),
            3 => functions(!state.bounce, state.invert, state.chaser),
            4 => functions(state.bounce, !state.invert, state.chaser),
            5 => functions(state.bounce, state.invert, !state.chaser),
            6 => return vec![ShowCommand::All(SequenceCommand::Blackout)],
            7 => return vec![ShowCommand::All(SequenceCommand::Normal)],
            8 => SequenceCommand::UpdateStrobe {
                on: !state.strobe,
                speed: if state.strobe_speed == 0 {
                    128
                } else {
                    state.strobe_speed
                },
            },
            _ => return Vec::new(),
        };
        vec![ShowCommand::Sequence {
            sequence: self.selected,
            cmd,
        }]
    }

    /// Short press steps a switch to its next position, long press turns it off.
    fn switch(&self, slot: usize, long: bool) -> Option<SequenceCommand> {
        let state = &self.sequences[self.selected];
        if state.kind != SequenceKind::Switch {
            return None;
        }
        let count = *self.switch_positions.get(self.selected)?.get(slot)?;
        if count == 0 {
            return None;
        }
        let current = state.switch_positions.get(slot).copied().unwrap_or_default();
        let position = if long { 0 } else { (current + 1) % count };
        Some(SequenceCommand::UpdateSwitch { slot, position })
    }

    /// Fold a sequence update into the layout and return the lamps to change.
    pub fn observe(&mut self, update: &SequenceUpdate) -> Vec<ButtonMessage> {
        match update {
            SequenceUpdate::State(state) => {
                let index = state.index();
                let Some(slot) = self.sequences.get_mut(index) else {
                    return Vec::new();
                };
                *slot = (**state).clone();
                if index == self.selected {
                    self.lamps()
                } else {
                    Vec::new()
                }
            }
            SequenceUpdate::Beat { sequence } => vec![ButtonMessage::Flash {
                x: *sequence,
                y: SELECT_ROW,
                color: Color::WHITE,
            }],
            SequenceUpdate::Switch {
                sequence,
                slot,
                position,
            } => {
                if let Some(state) = self.sequences.get_mut(*sequence) {
                    if state.switch_positions.len() <= *slot {
                        state.switch_positions.resize(slot + 1, 0);
                    }
                    state.switch_positions[*slot] = *position;
                }
                if *sequence != self.selected {
                    return Vec::new();
                }
                vec![ButtonMessage::Light {
                    x: *slot,
                    y: SWITCH_ROW,
                    color: switch_color(*position),
                }]
            }
            SequenceUpdate::Step { .. } => Vec::new(),
        }
    }

    /// Every lamp for the selected sequence.
    pub fn lamps(&self) -> Vec<ButtonMessage> {
        let mut lamps = vec![ButtonMessage::ClearAll];
        for (x, state) in self.sequences.iter().enumerate() {
            lamps.push(ButtonMessage::Light {
                x,
                y: SELECT_ROW,
                color: match (x == self.selected, state.hidden) {
                    (true, _) => Color::WHITE,
                    (false, true) => Color::BLACK,
                    (false, false) => NamedColor::Blue.rgb(),
                },
            });
        }
        let Some(state) = self.sequences.get(self.selected) else {
            return lamps;
        };
        lamps.push(ButtonMessage::light(0, TRANSPORT_ROW, state.running));
        for (x, on) in [
            state.static_mode,
            state.flood,
            state.music_trigger,
            state.bounce,
            state.invert,
            state.chaser,
            state.blackout,
            !state.blackout,
            state.strobe,
        ]
        .into_iter()
        .enumerate()
        {
            lamps.push(ButtonMessage::light(x, MODE_ROW, on));
        }
        for (x, named) in NamedColor::iter().take(GRID_WIDTH).enumerate() {
            if state.colors.contains(&named.rgb()) {
                lamps.push(ButtonMessage::Light {
                    x,
                    y: COLOR_ROW,
                    color: named.rgb(),
                });
            }
        }
        if let Some(x) = PatternName::iter().position(|p| p == state.pattern) {
            lamps.push(ButtonMessage::light(x, PATTERN_ROW, true));
        }
        for (slot, position) in state.switch_positions.iter().enumerate() {
            lamps.push(ButtonMessage::Light {
                x: slot,
                y: SWITCH_ROW,
                color: switch_color(*position),
            });
        }
        lamps
    }
}

fn transport(state: &SequenceState, x: usize) -> Option<SequenceCommand> {
    Some(match x {
        0 if state.running => SequenceCommand::Stop,
        0 => SequenceCommand::Start,
        1 => SequenceCommand::UpdateSpeed(state.speed.saturating_sub(1)),
        2 => SequenceCommand::UpdateSpeed((state.speed + 1).min(MAX_SPEED)),
        3 => SequenceCommand::UpdateSize(state.size.saturating_sub(1)),
        4 => SequenceCommand::UpdateSize((state.size + 1).min(MAX_SIZE)),
        5 => SequenceCommand::UpdateShift(state.shift.saturating_sub(1)),
        6 => SequenceCommand::UpdateShift(state.shift + 1),
        7 => SequenceCommand::DecreaseFade,
        8 => SequenceCommand::IncreaseFade,
        _ => return None,
    })
}

/// Position 0 is off; the rest cycle through the named colours.
fn switch_color(position: usize) -> Color {
    if position == 0 {
        return Color::BLACK;
    }
    NamedColor::by_index((position - 1) % 8).map_or(Color::WHITE, NamedColor::rgb)
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    const SWITCHES: &str = "
fixtures:
  - group: 2
    number: 1
    name: Projector
    type: switch
    address: 1
    channels:
      - { number: 1, name: Master }
    states:
      - { name: Off, number: 1 }
      - { name: Dim, number: 2 }
      - { name: Full, number: 3 }
";

    fn layout() -> GridLayout {
        let catalogue = Catalogue::from_yaml(SWITCHES, true).unwrap();
        GridLayout::new(
            vec![
                SequenceState::default(),
                SequenceState {
                    number: 2,
                    kind: SequenceKind::Switch,
                    ..Default::default()
                },
            ],
            &catalogue,
        )
    }

    fn sequence_cmd(cmds: Vec<ShowCommand>) -> (usize, SequenceCommand) {
        match cmds.as_slice() {
            [ShowCommand::Sequence { sequence, cmd }] => (*sequence, cmd.clone()),
            other => panic!("expected one sequence command, got {other:?}"),
        }
    }

    #[test]
    fn test_releases_are_ignored() {
        let mut layout = layout();
        let event = ButtonEvent {
            pressed: false,
            ..ButtonEvent::press(0, TRANSPORT_ROW)
        };
        assert!(layout.handle(event).is_empty());
    }

    #[test]
    fn test_start_toggles_on_observed_state() {
        let mut layout = layout();
        let (seq, cmd) = sequence_cmd(layout.handle(ButtonEvent::press(0, TRANSPORT_ROW)));
        assert_eq!(0, seq);
        assert!(matches!(cmd, SequenceCommand::Start));

        layout.observe(&SequenceUpdate::State(Box::new(SequenceState {
            running: true,
            ..Default::default()
        })));
        let (_, cmd) = sequence_cmd(layout.handle(ButtonEvent::press(0, TRANSPORT_ROW)));
        assert!(matches!(cmd, SequenceCommand::Stop));
    }

    #[test]
    fn test_long_press() {
        let mut layout = layout();
        let event = ButtonEvent::long_press(3, FIRST_PRESET_ROW + 1);
        assert!(event.is_long());
        assert_eq!(3, event.column());
        assert!(matches!(
            layout.handle(event).as_slice(),
            [ShowCommand::SavePreset { x: 3, y: 1 }]
        ));
        assert!(matches!(
            layout.handle(ButtonEvent::press(3, FIRST_PRESET_ROW + 1)).as_slice(),
            [ShowCommand::LoadPreset { x: 3, y: 1 }]
        ));

        // Long press on a colour adds to the palette.
        layout.observe(&SequenceUpdate::State(Box::new(SequenceState {
            colors: vec![NamedColor::Red.rgb()],
            ..Default::default()
        })));
        let (_, cmd) = sequence_cmd(layout.handle(ButtonEvent::long_press(5, COLOR_ROW)));
        let SequenceCommand::UpdateColors(colors) = cmd else {
            panic!("expected colours");
        };
        assert_eq!(vec![NamedColor::Red.rgb(), NamedColor::Blue.rgb()], colors);
    }

    #[test]
    fn test_switch_cycles_positions() {
        let mut layout = layout();
        assert!(layout.handle(ButtonEvent::press(1, SELECT_ROW)).is_empty());
        assert_eq!(1, layout.selected());

        let (seq, cmd) = sequence_cmd(layout.handle(ButtonEvent::press(0, SWITCH_ROW)));
        assert_eq!(1, seq);
        assert!(matches!(
            cmd,
            SequenceCommand::UpdateSwitch {
                slot: 0,
                position: 1
            }
        ));
        let lamps = layout.observe(&SequenceUpdate::Switch {
            sequence: 1,
            slot: 0,
            position: 2,
        });
        assert_eq!(
            vec![ButtonMessage::Light {
                x: 0,
                y: SWITCH_ROW,
                color: NamedColor::Orange.rgb()
            }],
            lamps
        );
        // Wraps back to off.
        let (_, cmd) = sequence_cmd(layout.handle(ButtonEvent::press(0, SWITCH_ROW)));
        assert!(matches!(
            cmd,
            SequenceCommand::UpdateSwitch {
                slot: 0,
                position: 0
            }
        ));
        // No such switch.
        assert!(layout.handle(ButtonEvent::press(4, SWITCH_ROW)).is_empty());
    }

    struct Capture(Arc<Mutex<Vec<ButtonMessage>>>);

    impl ButtonRenderer for Capture {
        fn render(&mut self, msg: &ButtonMessage) {
            self.0.lock().push(msg.clone());
        }
    }

    #[test]
    fn test_output_fans_out() {
        let (a, b) = (Arc::default(), Arc::default());
        let mut output = GridOutput::default();
        output.register(Box::new(Capture(Arc::clone(&a))));
        output.register(Box::new(Capture(Arc::clone(&b))));
        output.register(Box::new(LogRenderer));
        output.send(&ButtonMessage::ClearAll);
        assert_eq!(vec![ButtonMessage::ClearAll], *a.lock());
        assert_eq!(vec![ButtonMessage::ClearAll], *b.lock());
    }
}
