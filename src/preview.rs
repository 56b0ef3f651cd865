//! A terminal preview of what the fixtures are showing.
//!
//! Mostly for running without a DMX interface: every sequence gets a line
//! with a block per fixture colour and one for its master, redrawn in place
//! each frame.

use std::{
    cell::{Cell, RefCell},
    fmt::Display,
    io::{Stdout, StdoutLock, Write, stdout},
};

use itertools::Itertools;
use owo_colors::OwoColorize;

use crate::{
    color::Color,
    dmx::DmxBuffer,
    fixture::{Capabilities, Catalogue, ChannelRole, FixtureDescriptor},
    mapper::owns_channel,
};

/// Manage state for preview via terminal/ANSI escape codes.
pub struct TerminalPreview {
    lines_written: Cell<usize>,
    stdout: Stdout,
}

impl Default for TerminalPreview {
    fn default() -> Self {
        Self {
            lines_written: Default::default(),
            stdout: stdout(),
        }
    }
}

impl TerminalPreview {
    fn line<'a>(&'a self, leader: &'a dyn Display) -> TerminalLine<'a> {
        TerminalLine {
            preview: self,
            written: Default::default(),
            leader,
            w: RefCell::new(self.stdout.lock()),
        }
    }

    fn add_line(&self) {
        self.lines_written.set(self.lines_written.get() + 1);
    }

    fn start_frame(&self) {
        let mut w = self.stdout.lock();
        for _ in 0..self.lines_written.take() {
            let _ = write!(
                w,
                "{}{}",
                termion::scroll::Up(1),
                termion::clear::CurrentLine
            );
        }
    }
}

/// One line of the preview.
///
/// Assumes that whatever we're writing into is infallible - ignores all errors.
struct TerminalLine<'a> {
    preview: &'a TerminalPreview,
    /// True once we've written something.
    written: Cell<bool>,
    /// Written before the first block.
    leader: &'a dyn Display,
    w: RefCell<StdoutLock<'static>>,
}

impl TerminalLine<'_> {
    fn write(&self, d: impl Display) {
        let mut w = self.w.borrow_mut();
        if !self.written.replace(true) {
            let _ = write!(w, "{}", self.leader);
        }
        let _ = write!(w, "{d}");
    }

    fn color(&self, Color { r, g, b }: Color) {
        self.write("▮".truecolor(r, g, b).on_truecolor(r, g, b));
    }

    fn intensity(&self, i: u8) {
        self.write("▮".truecolor(i, i, i).on_truecolor(i, i, i));
    }
}

impl Drop for TerminalLine<'_> {
    fn drop(&mut self) {
        if self.written.get() {
            self.preview.add_line();
            let _ = writeln!(self.w.borrow_mut());
        }
    }
}

#[derive(Default)]
pub enum Previewer {
    #[default]
    Off,
    Terminal(TerminalPreview),
}

impl Previewer {
    pub fn terminal() -> Self {
        Self::Terminal(TerminalPreview::default())
    }

    /// Redraw every non-switch fixture from a rendered frame.
    pub fn frame(&self, catalogue: &Catalogue, frame: &DmxBuffer) {
        let Self::Terminal(preview) = self else {
            return;
        };
        preview.start_frame();
        let groups = catalogue
            .iter()
            .map(|(_, f)| f)
            .filter(|f| !f.is_switch())
            .sorted_by_key(|f| (f.group, f.number))
            .chunk_by(|f| f.group);
        for (group, fixtures) in &groups {
            let leader = format!("{group:>3} ");
            let line = preview.line(&leader);
            for fixture in fixtures {
                for sub in 0..fixture.sub_fixtures() {
                    line.color(color_at(fixture, sub, frame));
                }
                if let Some(master) = master_at(fixture, frame) {
                    line.intensity(master);
                }
            }
        }
    }
}

fn level(frame: &DmxBuffer, addr: usize) -> u8 {
    addr.checked_sub(1)
        .and_then(|i| frame.get(i))
        .copied()
        .unwrap_or_default()
}

/// The colour a (sub-)fixture is showing. Fixtures without RGB channels show
/// white at their master level.
fn color_at(fixture: &FixtureDescriptor, sub: usize, frame: &DmxBuffer) -> Color {
    if !fixture.capabilities().contains(Capabilities::RGB) {
        let m = master_at(fixture, frame).unwrap_or_default();
        return Color::new(m, m, m);
    }
    let mut color = Color::BLACK;
    for channel in fixture
        .channels
        .iter()
        .filter(|c| owns_channel(fixture, sub, c))
    {
        let value = level(frame, fixture.channel_address(channel));
        match channel.role() {
            ChannelRole::Red(_) => color.r = value,
            ChannelRole::Green(_) => color.g = value,
            ChannelRole::Blue(_) => color.b = value,
            _ => (),
        }
    }
    color
}

fn master_at(fixture: &FixtureDescriptor, frame: &DmxBuffer) -> Option<u8> {
    fixture.channels.iter().find_map(|c| match c.role() {
        ChannelRole::Master { reverse } => {
            let value = level(frame, fixture.channel_address(c));
            Some(if reverse { 255 - value } else { value })
        }
        _ => None,
    })
}
