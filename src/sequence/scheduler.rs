//! The per-sequence worker: owns the sequence state and its fixture workers,
//! and pumps pattern steps out to them on the speed timer or on beats.
use std::{
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, Sender, bounded, never, select};
use log::{debug, info, warn};

use super::{
    MAX_SPEED, SequenceCommand, SequenceKind, SequenceState, SequenceUpdate, StaticColor,
    speed_period,
};
use crate::{
    color::scale,
    pattern::{FadeProfile, GeneratorParams, MAX_FADE, Position, Steps, chaser_steps, generate},
    receiver::{
        Context, FixtureCommand, PlayParams, ReceiverHandle, SEND_TIMEOUT, StaticParams,
    },
};

/// Handle to a running sequence.
pub struct SequenceHandle {
    tx: Sender<SequenceCommand>,
    worker: Option<JoinHandle<()>>,
}

impl SequenceHandle {
    pub fn spawn(state: SequenceState, ctx: Context, updates: Sender<SequenceUpdate>) -> Self {
        let (tx, inbox) = bounded(64);
        let worker = thread::spawn(move || Scheduler::new(state, ctx, inbox, updates).run());
        Self {
            tx,
            worker: Some(worker),
        }
    }

    /// Post a command; dropped if the scheduler doesn't take it in time.
    pub fn send(&self, cmd: SequenceCommand) {
        if let Err(err) = self.tx.send_timeout(cmd, SEND_TIMEOUT) {
            warn!("Sequence did not accept command: {err}.");
        }
    }

    /// Ask the scheduler for a snapshot of its state.
    pub fn read_config(&self) -> Option<SequenceState> {
        let (tx, rx) = bounded(1);
        self.send(SequenceCommand::ReadConfig(tx));
        rx.recv_timeout(Duration::from_secs(1)).ok()
    }

    /// Stop the sequence and all of its fixture workers.
    pub fn quit(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        if self.tx.send(SequenceCommand::Quit).is_err() {
            debug!("Sequence worker already gone.");
        }
        if worker.join().is_err() {
            warn!("Sequence worker panicked.");
        }
    }
}

impl Drop for SequenceHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Scheduler {
    state: SequenceState,
    ctx: Context,
    inbox: Receiver<SequenceCommand>,
    updates: Sender<SequenceUpdate>,
    fixtures: Vec<ReceiverHandle>,
    steps: Steps,
    /// Master levels for scanners slaved to a chase.
    chaser: Option<Steps>,
    step: usize,
    /// Fade sub-steps still to play for the last beat.
    beat_remaining: usize,
    beats: Receiver<()>,
    timer: Receiver<Instant>,
}

impl Scheduler {
    fn new(
        state: SequenceState,
        ctx: Context,
        inbox: Receiver<SequenceCommand>,
        updates: Sender<SequenceUpdate>,
    ) -> Self {
        let beats = ctx.sound.register(&subscriber(&state));
        ctx.sound.enable(&subscriber(&state), state.music_trigger);
        let mut scheduler = Self {
            state,
            ctx,
            inbox,
            updates,
            fixtures: Vec::new(),
            steps: Steps::default(),
            chaser: None,
            step: 0,
            beat_remaining: 0,
            beats,
            timer: never(),
        };
        scheduler.spawn_fixtures();
        scheduler.regenerate();
        scheduler
    }

    fn run(mut self) {
        info!(
            "Starting {} ({}, {} fixtures).",
            self.state.name(),
            self.state.kind,
            self.fixtures.len()
        );
        self.resume();
        let inbox = self.inbox.clone();
        let beats = self.beats.clone();
        loop {
            let timer = self.timer.clone();
            select! {
                recv(inbox) -> cmd => {
                    let Ok(cmd) = cmd else {
                        break;
                    };
                    if !self.handle(cmd) {
                        break;
                    }
                }
                recv(beats) -> _ => self.on_beat(),
                recv(timer) -> _ => self.on_timer(),
            }
        }
        self.shutdown();
    }

    /// Fold a command into the sequence; false if the scheduler should exit.
    fn handle(&mut self, cmd: SequenceCommand) -> bool {
        debug!("{}: {cmd:?}.", self.state.name());
        match cmd {
            SequenceCommand::Quit => return false,
            SequenceCommand::ReadConfig(reply) => {
                let _ = reply.send_timeout(self.state.clone(), SEND_TIMEOUT);
                return true;
            }
            SequenceCommand::Start => {
                self.state.running = true;
                self.step = 0;
                self.resume();
            }
            SequenceCommand::Stop => {
                self.state.running = false;
                self.clear();
            }
            SequenceCommand::UpdateSpeed(speed) => {
                let speed = speed.min(MAX_SPEED);
                if speed != self.state.speed {
                    self.state.speed = speed;
                    self.arm();
                }
            }
            SequenceCommand::UpdateColors(colors) => {
                self.state.colors = colors;
                self.regenerate();
            }
            SequenceCommand::UpdatePattern(pattern) => {
                self.state.pattern = pattern;
                self.regenerate();
            }
            SequenceCommand::UpdateSize(size) => {
                self.state.size = size;
                self.regenerate();
            }
            SequenceCommand::UpdateShift(shift) => {
                self.state.shift = shift;
                self.regenerate();
            }
            SequenceCommand::IncreaseFade => {
                self.state.fade = (self.state.fade + 1).min(MAX_FADE);
                self.regenerate();
                self.arm();
            }
            SequenceCommand::DecreaseFade => {
                self.state.fade = self.state.fade.saturating_sub(1);
                self.regenerate();
                self.arm();
            }
            SequenceCommand::UpdateRgbFade(fade) => self.state.rgb_fade = fade,
            SequenceCommand::UpdateStatic(on) => {
                self.state.static_mode = on;
                if on {
                    self.apply_static();
                } else {
                    self.static_off();
                    self.resume();
                }
                self.arm();
            }
            SequenceCommand::UpdateStaticColor { slot, color } => {
                if self.state.static_colors.len() <= slot {
                    self.state.static_colors.resize(slot + 1, unlit());
                }
                self.state.static_colors[slot] = color;
                if self.state.static_mode && !self.state.flood {
                    self.static_fade(slot);
                }
            }
            SequenceCommand::UpdateMaster(master) => {
                self.state.master = master;
                self.refresh();
            }
            SequenceCommand::UpdateStrobe { on, speed } => {
                self.state.strobe = on;
                self.state.strobe_speed = speed;
                self.refresh();
            }
            SequenceCommand::Blackout => {
                self.state.blackout = true;
                self.ctx.set_blackout(true);
                self.broadcast(|| FixtureCommand::Blackout);
            }
            SequenceCommand::Normal => {
                self.state.blackout = false;
                self.ctx.set_blackout(false);
                self.resume();
            }
            SequenceCommand::MusicTrigger(on) => {
                self.state.music_trigger = on;
                self.ctx.sound.enable(&subscriber(&self.state), on);
                self.arm();
            }
            SequenceCommand::Flood(on) => {
                self.state.flood = on;
                if on {
                    let master = self.state.master;
                    self.broadcast(|| FixtureCommand::StartFlood { master });
                } else {
                    self.broadcast(|| FixtureCommand::StopFlood);
                    self.resume();
                }
                self.arm();
            }
            SequenceCommand::Hide => self.state.hidden = true,
            SequenceCommand::Unhide => self.state.hidden = false,
            SequenceCommand::LoadConfig(loaded) => {
                self.clear();
                self.state.load(*loaded);
                self.ctx
                    .sound
                    .enable(&subscriber(&self.state), self.state.music_trigger);
                self.step = 0;
                self.regenerate();
                self.resume();
            }
            SequenceCommand::UpdateFunctions {
                bounce,
                invert,
                chaser,
            } => {
                self.state.bounce = bounce;
                self.state.invert = invert;
                self.state.chaser = chaser;
                self.regenerate();
            }
            SequenceCommand::UpdateGobo(gobo) => self.state.gobo = gobo,
            SequenceCommand::UpdateScannerColor(color) => self.state.scanner_color = color,
            SequenceCommand::UpdateFixturesConfig => {
                self.spawn_fixtures();
                self.regenerate();
                self.resume();
            }
            SequenceCommand::UpdateSwitch { slot, position } => self.move_switch(slot, position),
            SequenceCommand::OverrideSwitch { slot, overrides } => {
                self.send_to(slot, FixtureCommand::Override(overrides));
            }
            SequenceCommand::ClearSwitchOverride { slot } => {
                self.send_to(slot, FixtureCommand::ClearOverride);
            }
            SequenceCommand::ResetAllSwitchPositions => {
                for slot in 0..self.fixtures.len() {
                    self.move_switch(slot, 0);
                }
            }
        }
        let _ = self
            .updates
            .try_send(SequenceUpdate::State(Box::new(self.state.clone())));
        true
    }

    fn on_beat(&mut self) {
        let _ = self.updates.try_send(SequenceUpdate::Beat {
            sequence: self.state.index(),
        });
        if !self.state.music_trigger || !self.is_ticking() {
            return;
        }
        // A beat is one whole pattern step; cut short whatever is left of
        // the last one and fade through the next on the timer.
        let width = self.steps.width.max(1);
        self.step = (self.step / width + 1) * width % self.steps.len();
        self.beat_remaining = width - 1;
        self.play();
        self.arm();
    }

    fn on_timer(&mut self) {
        if self.state.music_trigger {
            if self.beat_remaining == 0 {
                self.arm();
                return;
            }
            self.beat_remaining -= 1;
        }
        self.advance();
        self.arm();
    }

    /// Start one worker per fixture slot, replacing any existing ones.
    fn spawn_fixtures(&mut self) {
        for fixture in self.fixtures.drain(..) {
            fixture.stop();
        }
        let sequence = self.state.index();
        let count = self.ctx.catalogue.load().slot_count(sequence);
        self.fixtures = (0..count)
            .map(|slot| ReceiverHandle::spawn(sequence, slot, self.ctx.clone()))
            .collect();
    }

    fn fade_profile(&self) -> FadeProfile {
        FadeProfile::from_sequence(self.state.fade, self.state.size)
    }

    /// Rebuild the pattern after anything it depends on changed.
    fn regenerate(&mut self) {
        if self.state.kind == SequenceKind::Switch {
            return;
        }
        let fade = self.fade_profile();
        let fixtures = self.fixtures.len();
        self.steps = generate(&GeneratorParams {
            pattern: self.state.pattern,
            fixtures,
            colors: &self.state.colors,
            shift: self.state.shift,
            size: self.state.size,
            bounce: self.state.bounce,
            invert: self.state.invert,
            fade: &fade,
        });
        self.chaser = (self.state.kind == SequenceKind::Scanner && self.state.chaser)
            .then(|| chaser_steps(fixtures, self.state.shift, &fade));
        self.step = if self.steps.is_empty() {
            0
        } else {
            self.step % self.steps.len()
        };
        self.beat_remaining = 0;
    }

    fn is_ticking(&self) -> bool {
        self.state.running
            && !self.state.static_mode
            && !self.state.flood
            && self.state.kind != SequenceKind::Switch
            && !self.steps.is_empty()
    }

    /// Time between sub-steps: the speed period spread over the fade envelope.
    fn period(&self) -> Duration {
        speed_period(self.state.speed) / self.steps.width.max(1) as u32
    }

    /// Restart the step timer, or park it if the sequence isn't timed.
    ///
    /// Under the music trigger the timer only runs out the fade of a beat.
    fn arm(&mut self) {
        let timed = !self.state.music_trigger || self.beat_remaining > 0;
        self.timer = if self.is_ticking() && timed {
            self.ctx.clock.after(self.period())
        } else {
            never()
        };
    }

    fn advance(&mut self) {
        if self.steps.is_empty() {
            return;
        }
        self.step = (self.step + 1) % self.steps.len();
        self.play();
    }

    /// Send the current step to every fixture.
    fn play(&self) {
        let Some(positions) = self.steps.get(self.step) else {
            return;
        };
        for (slot, fixture) in self.fixtures.iter().enumerate() {
            let position = positions.get(slot).copied().unwrap_or(Position::DARK);
            let mut params = PlayParams {
                position,
                master: self.state.master,
                strobe: self.state.strobe,
                strobe_speed: self.state.strobe_speed,
                scanner_color: None,
                gobo: 1,
                shutter: 255,
            };
            let cmd = match self.state.kind {
                SequenceKind::Scanner => {
                    // Scanners carry their intensity on the master channel.
                    let level = match &self.chaser {
                        Some(chaser) => chaser
                            .get(self.step)
                            .and_then(|c| c.get(slot))
                            .map_or(0, |p| p.brightness),
                        None if position.enabled => position.brightness,
                        None => 0,
                    };
                    params.master = scale(self.state.master, level);
                    params.position.enabled = true;
                    params.position.brightness = 255;
                    params.scanner_color = self.state.scanner_color;
                    params.gobo = self.state.gobo;
                    FixtureCommand::ScannerPlay(params)
                }
                _ => FixtureCommand::RgbPlay(params),
            };
            fixture.send(cmd);
        }
        let _ = self.updates.try_send(SequenceUpdate::Step {
            sequence: self.state.index(),
            step: self.step,
        });
    }

    /// Put the fixtures back to whatever the state says they should show.
    fn resume(&mut self) {
        match self.state.kind {
            SequenceKind::Switch => {
                for (slot, position) in self.state.switch_positions.clone().into_iter().enumerate() {
                    self.send_to(slot, FixtureCommand::Switch(position));
                }
            }
            _ if self.state.flood => {
                let master = self.state.master;
                self.broadcast(|| FixtureCommand::StartFlood { master });
            }
            _ if self.state.static_mode => self.apply_static(),
            _ if self.state.running => self.play(),
            _ => (),
        }
        self.arm();
    }

    /// Re-render anything held statically after a master or strobe change.
    fn refresh(&mut self) {
        if self.state.flood {
            let master = self.state.master;
            self.broadcast(|| FixtureCommand::StartFlood { master });
        } else if self.state.static_mode {
            for slot in 0..self.fixtures.len() {
                let params = self.static_params(slot);
                if params.enabled {
                    self.send_to(slot, FixtureCommand::StaticOn(params));
                }
            }
        }
    }

    /// Stop everything and go dark.
    fn clear(&mut self) {
        self.timer = never();
        self.broadcast(|| FixtureCommand::Clear);
    }

    fn static_params(&self, slot: usize) -> StaticParams {
        let color = self
            .state
            .static_colors
            .get(slot)
            .copied()
            .unwrap_or_else(unlit);
        StaticParams {
            color: color.color,
            enabled: color.enabled,
            flash: color.flash,
            master: self.state.master,
            strobe: self.state.strobe,
            strobe_speed: self.state.strobe_speed,
            rgb_fade: self.state.rgb_fade,
            fade: self.fade_profile(),
        }
    }

    fn apply_static(&self) {
        for slot in 0..self.fixtures.len() {
            self.static_fade(slot);
        }
    }

    fn static_fade(&self, slot: usize) {
        let params = self.static_params(slot);
        let cmd = if params.enabled {
            FixtureCommand::StaticFadeUp(params)
        } else {
            FixtureCommand::StaticOff(params)
        };
        self.send_to(slot, cmd);
    }

    fn static_off(&self) {
        for slot in 0..self.fixtures.len() {
            self.send_to(slot, FixtureCommand::StaticOff(self.static_params(slot)));
        }
    }

    fn move_switch(&mut self, slot: usize, position: usize) {
        if self.state.switch_positions.len() <= slot {
            self.state.switch_positions.resize(slot + 1, 0);
        }
        self.state.switch_positions[slot] = position;
        self.send_to(slot, FixtureCommand::Switch(position));
        let _ = self.updates.try_send(SequenceUpdate::Switch {
            sequence: self.state.index(),
            slot,
            position,
        });
    }

    fn send_to(&self, slot: usize, cmd: FixtureCommand) {
        match self.fixtures.get(slot) {
            Some(fixture) => fixture.send(cmd),
            None => warn!("{} has no fixture in slot {}.", self.state.name(), slot + 1),
        }
    }

    fn broadcast(&self, cmd: impl Fn() -> FixtureCommand) {
        for fixture in &self.fixtures {
            fixture.send(cmd());
        }
    }

    fn shutdown(&mut self) {
        self.ctx.sound.deregister(&subscriber(&self.state));
        for fixture in self.fixtures.drain(..) {
            fixture.stop();
        }
        info!("{} stopped.", self.state.name());
    }
}

fn subscriber(state: &SequenceState) -> String {
    format!("sequence-{}", state.index())
}

fn unlit() -> StaticColor {
    StaticColor {
        enabled: false,
        ..Default::default()
    }
}
