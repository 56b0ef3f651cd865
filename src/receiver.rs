//! One worker per fixture slot.
//!
//! A receiver owns everything that happens to its fixture: step plays,
//! static colours and their fades, flood, and switch positions. Commands are
//! handled strictly in arrival order. Fades run on a helper thread so the
//! receiver can keep taking commands; starting anything new cancels the fade
//! in flight and waits for it to finish before rendering.
use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{Receiver, Sender, bounded, select};
use log::{debug, warn};
use parking_lot::Mutex;

use crate::{
    clock::SharedClock,
    color::{Color, LastColor},
    dmx::ChannelSink,
    fixture::SharedCatalogue,
    mapper::{FixtureUpdate, map_fixture},
    pattern::{FadeProfile, Position},
    sequence::static_fade_sample,
    sound::SoundBus,
    switch::{Override, SwitchController},
};

/// How long a sender waits for room in an inbox before dropping the message.
pub const SEND_TIMEOUT: Duration = Duration::from_millis(100);

/// How long each half of a static flash lasts.
pub const FLASH_PERIOD: Duration = Duration::from_millis(500);

/// Shared services every fixture worker renders through.
#[derive(Clone)]
pub struct Context {
    pub catalogue: SharedCatalogue,
    pub sink: Arc<dyn ChannelSink>,
    pub blackout: Arc<AtomicBool>,
    pub clock: SharedClock,
    pub sound: SoundBus,
}

impl Context {
    pub fn new(
        catalogue: SharedCatalogue,
        sink: Arc<dyn ChannelSink>,
        clock: SharedClock,
        sound: SoundBus,
    ) -> Self {
        Self {
            catalogue,
            sink,
            blackout: Arc::new(AtomicBool::new(false)),
            clock,
            sound,
        }
    }

    pub fn is_blackout(&self) -> bool {
        self.blackout.load(Ordering::Relaxed)
    }

    pub fn set_blackout(&self, blackout: bool) {
        self.blackout.store(blackout, Ordering::Relaxed);
    }
}

/// A static colour for one fixture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticParams {
    pub color: Color,
    pub enabled: bool,
    pub flash: bool,
    pub master: u8,
    pub strobe: bool,
    pub strobe_speed: u8,
    /// Sequence RGB fade speed; sets the interval between fade samples.
    pub rgb_fade: usize,
    /// The ramps a fade follows.
    pub fade: FadeProfile,
}

/// One step of a running pattern, for one fixture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayParams {
    pub position: Position,
    pub master: u8,
    pub strobe: bool,
    pub strobe_speed: u8,
    pub scanner_color: Option<usize>,
    pub gobo: usize,
    pub shutter: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixtureCommand {
    /// Terminate the worker.
    Stop,
    Override(Override),
    ClearOverride,
    /// Remember the colour the fixture was left at.
    LastColor(Option<LastColor>),
    /// Move a switch fixture to a position (indexed from 0).
    Switch(usize),
    /// Cancel any fade and go dark.
    Clear,
    StartFlood { master: u8 },
    StopFlood,
    StaticOn(StaticParams),
    StaticFadeUp(StaticParams),
    StaticOff(StaticParams),
    RgbPlay(PlayParams),
    ScannerPlay(PlayParams),
    /// Re-render under the shared blackout flag.
    Blackout,
}

/// Handle to a running fixture worker.
pub struct ReceiverHandle {
    tx: Sender<FixtureCommand>,
    worker: Option<JoinHandle<()>>,
}

impl ReceiverHandle {
    /// Start the worker for a sequence slot (both indexed from 0).
    pub fn spawn(sequence: usize, slot: usize, ctx: Context) -> Self {
        let (tx, inbox) = bounded(32);
        let worker = FixtureWorker {
            sequence,
            slot,
            ctx,
            inbox,
            tx: tx.clone(),
            last_color: None,
            level: u8::MAX,
            fade: None,
            switch: None,
        };
        let worker = thread::spawn(move || worker.run());
        Self {
            tx,
            worker: Some(worker),
        }
    }

    /// Post a command; dropped if the worker doesn't take it in time.
    pub fn send(&self, cmd: FixtureCommand) {
        if let Err(err) = self.tx.send_timeout(cmd, SEND_TIMEOUT) {
            debug!("Fixture worker did not accept command: {err}.");
        }
    }

    /// Stop the worker and wait for it to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        // Blocks until there's room; the worker drains its inbox in order.
        if self.tx.send(FixtureCommand::Stop).is_err() {
            debug!("Fixture worker already gone.");
        }
        if worker.join().is_err() {
            warn!("Fixture worker panicked.");
        }
    }
}

impl Drop for ReceiverHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// The colour and brightness a ramp last rendered, if it got that far.
type Shown = Arc<Mutex<Option<(Color, u8)>>>;

/// A fade running on its helper thread.
struct Fade {
    stop_fade_up: Sender<()>,
    stop_fade_down: Sender<()>,
    shown: Shown,
    worker: JoinHandle<()>,
}

impl Fade {
    /// Signal both halves of the fade to stop and wait for the thread.
    /// Returns where a ramp left the fixture.
    fn cancel(self) -> Option<(Color, u8)> {
        let _ = self.stop_fade_up.try_send(());
        let _ = self.stop_fade_down.try_send(());
        if self.worker.join().is_err() {
            warn!("Fade worker panicked.");
        }
        *self.shown.lock()
    }
}

enum FadeJob {
    Ramp {
        /// Colour and levels to fade down through first.
        down: Option<(Color, Vec<u8>)>,
        /// Colour and levels to fade up through afterwards.
        up: Option<(Color, Vec<u8>)>,
        sample: Duration,
        update: FixtureUpdate,
        /// Posted back to the receiver once the fade completes.
        then: Option<LastColor>,
    },
    Flash {
        update: FixtureUpdate,
    },
}

struct FixtureWorker {
    sequence: usize,
    slot: usize,
    ctx: Context,
    inbox: Receiver<FixtureCommand>,
    /// Our own inbox, for fades reporting completion.
    tx: Sender<FixtureCommand>,
    last_color: Option<LastColor>,
    /// Brightness `last_color` is showing at; below full after a cut-short fade.
    level: u8,
    fade: Option<Fade>,
    switch: Option<SwitchController>,
}

impl FixtureWorker {
    fn run(mut self) {
        debug!("Fixture {}.{} worker started.", self.sequence + 1, self.slot + 1);
        // The worker holds a sender to itself, so the inbox never disconnects;
        // Stop is the only way out.
        while let Ok(cmd) = self.inbox.recv() {
            if !self.handle(cmd) {
                break;
            }
        }
        self.cancel_fade();
        if let Some(mut switch) = self.switch.take() {
            switch.stop();
        }
        debug!("Fixture {}.{} worker stopped.", self.sequence + 1, self.slot + 1);
    }

    /// Handle one command; false if the worker should exit.
    fn handle(&mut self, cmd: FixtureCommand) -> bool {
        match cmd {
            FixtureCommand::Stop => return false,
            FixtureCommand::Override(overrides) => {
                let ctx = self.ctx.clone();
                if let Some(last) = self.switch().apply_override(&ctx, overrides) {
                    self.set_last(Some(last));
                }
            }
            FixtureCommand::ClearOverride => {
                let ctx = self.ctx.clone();
                if let Some(last) = self.switch().clear_override(&ctx) {
                    self.set_last(Some(last));
                }
            }
            FixtureCommand::LastColor(last) => {
                match self.fade.as_ref().map(|fade| fade.worker.is_finished()) {
                    // A ramp reporting in; what it rendered is authoritative.
                    Some(true) => self.cancel_fade(),
                    // From a fade that has since been replaced.
                    Some(false) => (),
                    None => self.set_last(last),
                }
            }
            FixtureCommand::Switch(position) => {
                let ctx = self.ctx.clone();
                if let Some(last) = self.switch().activate(&ctx, position) {
                    self.set_last(Some(last));
                }
            }
            FixtureCommand::Clear => {
                self.cancel_fade();
                if let Some(switch) = &mut self.switch {
                    switch.stop();
                }
                self.render(&self.update().dark());
                self.set_last(None);
            }
            FixtureCommand::StartFlood { master } => {
                self.cancel_fade();
                let last = self.render(&FixtureUpdate {
                    color: Color::WHITE,
                    master,
                    ..self.update()
                });
                self.set_last(last);
            }
            FixtureCommand::StopFlood => {
                self.cancel_fade();
                self.render(&self.update().dark());
                self.set_last(None);
            }
            FixtureCommand::StaticOn(params) => {
                self.cancel_fade();
                self.static_on(&params);
            }
            FixtureCommand::StaticFadeUp(params) => {
                self.cancel_fade();
                self.static_fade_up(params);
            }
            FixtureCommand::StaticOff(params) => {
                self.cancel_fade();
                self.static_off(params);
            }
            FixtureCommand::RgbPlay(params) | FixtureCommand::ScannerPlay(params) => {
                self.cancel_fade();
                let last = self.render(&self.play_update(&params));
                self.set_last(last);
            }
            FixtureCommand::Blackout => {
                if self.ctx.is_blackout() {
                    self.render(&self.update().dark());
                }
            }
        }
        true
    }

    /// Record a colour rendered at full brightness.
    fn set_last(&mut self, last: Option<LastColor>) {
        self.last_color = last;
        self.level = u8::MAX;
    }

    /// The colour currently lit, if any, with its brightness.
    fn lit(&self) -> Option<(LastColor, u8)> {
        self.last_color
            .filter(|last| !last.rgb.is_black() && self.level > 0)
            .map(|last| (last, self.level))
    }

    fn switch(&mut self) -> &mut SwitchController {
        let (sequence, slot) = (self.sequence, self.slot);
        self.switch
            .get_or_insert_with(|| SwitchController::new(sequence, slot))
    }

    /// A default update addressed to this slot.
    fn update(&self) -> FixtureUpdate {
        FixtureUpdate {
            sequence: self.sequence,
            slot: self.slot,
            ..Default::default()
        }
    }

    fn render(&self, update: &FixtureUpdate) -> Option<LastColor> {
        render(&self.ctx, update)
    }

    fn static_update(&self, params: &StaticParams) -> FixtureUpdate {
        FixtureUpdate {
            color: params.color,
            master: params.master,
            strobe: params.strobe,
            strobe_speed: params.strobe_speed,
            ..self.update()
        }
    }

    fn play_update(&self, params: &PlayParams) -> FixtureUpdate {
        let position = &params.position;
        FixtureUpdate {
            color: if position.enabled {
                position.color
            } else {
                Color::BLACK
            },
            brightness: if position.enabled {
                position.brightness
            } else {
                0
            },
            pan: position.pan,
            tilt: position.tilt,
            master: params.master,
            strobe: params.strobe,
            strobe_speed: params.strobe_speed,
            scanner_color: params.scanner_color,
            gobo: params.gobo,
            shutter: params.shutter,
            ..self.update()
        }
    }

    fn static_on(&mut self, params: &StaticParams) {
        let update = self.static_update(params);
        if params.flash && params.enabled {
            self.start_fade(FadeJob::Flash { update });
            self.set_last(Some(LastColor::rgb(params.color)));
            return;
        }
        let last = if params.enabled {
            self.render(&update)
        } else {
            self.render(&update.dark());
            None
        };
        self.set_last(last);
    }

    /// Fade from whatever the fixture is showing to the new static colour.
    ///
    /// A fade that was cut short carries on from the level it reached.
    fn static_fade_up(&mut self, params: StaticParams) {
        if params.flash {
            self.static_on(&params);
            return;
        }
        let target = params.enabled.then(|| LastColor::rgb(params.color));
        let lit = self.lit();
        let (down, up_from) = match lit {
            Some((last, level)) if Some(last) == target => {
                if level == u8::MAX {
                    // Already showing it; just refresh master and strobe.
                    self.render(&self.static_update(&params));
                    return;
                }
                (None, level)
            }
            Some((last, level)) => (Some((last.rgb, ramp_down_from(&params.fade, level))), 0),
            None if target.is_none() => {
                self.set_last(None);
                return;
            }
            None => (None, 0),
        };
        let up = params
            .enabled
            .then(|| (params.color, ramp_up_from(&params.fade, up_from)));
        self.start_fade(FadeJob::Ramp {
            down,
            up,
            sample: static_fade_sample(params.rgb_fade),
            update: self.static_update(&params),
            then: target,
        });
    }

    fn static_off(&mut self, params: StaticParams) {
        match self.lit() {
            Some((last, level)) => {
                self.start_fade(FadeJob::Ramp {
                    down: Some((last.rgb, ramp_down_from(&params.fade, level))),
                    up: None,
                    sample: static_fade_sample(params.rgb_fade),
                    update: self.static_update(&params),
                    then: None,
                });
            }
            None => self.set_last(None),
        }
    }

    fn start_fade(&mut self, job: FadeJob) {
        let (stop_fade_up, up_rx) = bounded(1);
        let (stop_fade_down, down_rx) = bounded(1);
        let shown = Shown::default();
        let ctx = self.ctx.clone();
        let tx = self.tx.clone();
        let progress = shown.clone();
        let worker =
            thread::spawn(move || run_fade(job, &ctx, &up_rx, &down_rx, &progress, &tx));
        self.fade = Some(Fade {
            stop_fade_up,
            stop_fade_down,
            shown,
            worker,
        });
    }

    /// Stop any fade in flight and pick up where it left the fixture.
    fn cancel_fade(&mut self) {
        let Some(fade) = self.fade.take() else {
            return;
        };
        if let Some((color, level)) = fade.cancel() {
            self.last_color = (level > 0 && !color.is_black()).then(|| LastColor::rgb(color));
            self.level = level;
        }
    }
}

/// Render an update, honouring the shared blackout flag.
fn render(ctx: &Context, update: &FixtureUpdate) -> Option<LastColor> {
    let update = if ctx.is_blackout() && !update.blackout {
        update.dark()
    } else {
        update.clone()
    };
    match map_fixture(&ctx.catalogue.load(), ctx.sink.as_ref(), &update) {
        Ok(last) => last,
        Err(err) => {
            debug!("Nothing to render: {err}.");
            None
        }
    }
}

/// The ramp used to fade a colour out from a level. A hard profile has no
/// off ramp, so it cuts straight to dark.
fn ramp_down_from(fade: &FadeProfile, level: u8) -> Vec<u8> {
    if fade.slope_off.is_empty() {
        return vec![0];
    }
    fade.slope_off
        .iter()
        .copied()
        .filter(|l| *l <= level)
        .collect()
}

/// The on ramp, skipping the part below a level already reached.
fn ramp_up_from(fade: &FadeProfile, level: u8) -> Vec<u8> {
    let ramp: Vec<u8> = fade
        .slope_on
        .iter()
        .copied()
        .filter(|l| *l >= level)
        .collect();
    if ramp.is_empty() { vec![u8::MAX] } else { ramp }
}

fn run_fade(
    job: FadeJob,
    ctx: &Context,
    stop_fade_up: &Receiver<()>,
    stop_fade_down: &Receiver<()>,
    shown: &Mutex<Option<(Color, u8)>>,
    tx: &Sender<FixtureCommand>,
) {
    match job {
        FadeJob::Ramp {
            down,
            up,
            sample,
            update,
            then,
        } => {
            let mut first = true;
            let phases = [(down, stop_fade_down), (up, stop_fade_up)];
            for (phase, stop) in phases {
                let Some((color, levels)) = phase else {
                    continue;
                };
                for level in levels {
                    if !first && !wait(ctx, stop, sample) {
                        return;
                    }
                    first = false;
                    *shown.lock() = Some((color, level));
                    render(
                        ctx,
                        &FixtureUpdate {
                            color,
                            brightness: level,
                            ..update.clone()
                        },
                    );
                }
            }
            if tx
                .send_timeout(FixtureCommand::LastColor(then), SEND_TIMEOUT)
                .is_err()
            {
                debug!("Fixture worker did not take the fade result.");
            }
        }
        FadeJob::Flash { update } => {
            let mut on = true;
            loop {
                if on {
                    render(ctx, &update);
                } else {
                    render(ctx, &update.dark());
                }
                if !wait(ctx, stop_fade_up, FLASH_PERIOD) {
                    return;
                }
                on = !on;
            }
        }
    }
}

/// Wait one sample period; false if the fade was told to stop.
fn wait(ctx: &Context, stop: &Receiver<()>, period: Duration) -> bool {
    let timer = ctx.clock.after(period);
    select! {
        recv(stop) -> _ => false,
        recv(timer) -> _ => true,
    }
}

#[cfg(test)]
pub fn test_context(
    sink: Arc<crate::dmx::mock::RecordingSink>,
    clock: Arc<crate::clock::mock::ManualClock>,
) -> Context {
    test_context_with(
        crate::fixture::shared(crate::fixture::Catalogue::new(Vec::new())),
        sink,
        clock,
    )
}

#[cfg(test)]
pub fn test_context_with(
    catalogue: SharedCatalogue,
    sink: Arc<crate::dmx::mock::RecordingSink>,
    clock: Arc<crate::clock::mock::ManualClock>,
) -> Context {
    Context::new(catalogue, sink, clock, SoundBus::new())
}

#[cfg(test)]
mod test {
    use std::time::Instant;

    use super::*;
    use crate::{
        clock::mock::ManualClock,
        dmx::mock::RecordingSink,
        fixture::{Catalogue, shared},
    };

    const PAR: &str = "
fixtures:
  - group: 1
    number: 1
    name: Par
    label: par
    type: rgb
    address: 1
    channels:
      - { number: 1, name: Red1 }
      - { number: 2, name: Green1 }
      - { number: 3, name: Blue1 }
";

    const RED: Color = Color::new(255, 0, 0);

    struct Rig {
        ctx: Context,
        sink: Arc<RecordingSink>,
        clock: Arc<ManualClock>,
        fixture: ReceiverHandle,
    }

    fn rig() -> Rig {
        let catalogue = shared(Catalogue::from_yaml(PAR, true).unwrap());
        let sink = Arc::new(RecordingSink::default());
        let clock = ManualClock::new();
        let ctx = test_context_with(catalogue, sink.clone(), clock.clone());
        let fixture = ReceiverHandle::spawn(0, 0, ctx.clone());
        Rig {
            ctx,
            sink,
            clock,
            fixture,
        }
    }

    fn red(rgb_fade: usize) -> StaticParams {
        StaticParams {
            color: RED,
            enabled: true,
            flash: false,
            master: 255,
            strobe: false,
            strobe_speed: 0,
            rgb_fade,
            fade: FadeProfile::from_sequence(4, 0),
        }
    }

    fn eventually(f: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if f() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        false
    }

    fn writes_at(sink: &RecordingSink, addr: usize) -> Vec<u8> {
        sink.writes
            .lock()
            .iter()
            .filter(|(a, _)| *a == addr)
            .map(|(_, v)| *v)
            .collect()
    }

    #[test]
    fn test_static_on() {
        let rig = rig();
        rig.fixture.send(FixtureCommand::StaticOn(red(3)));
        assert!(eventually(|| rig.sink.last(1) == Some(255)));
        assert_eq!(Some(0), rig.sink.last(2));
        assert_eq!(Some(0), rig.sink.last(3));
    }

    #[test]
    fn test_static_off_fades_down() {
        let rig = rig();
        rig.fixture.send(FixtureCommand::StaticOn(red(3)));
        assert!(eventually(|| rig.sink.last(1) == Some(255)));
        rig.sink.take();

        rig.fixture.send(FixtureCommand::StaticOff(red(3)));
        for _ in 0..4 {
            assert!(rig.clock.wait_pending(1));
            rig.clock.advance(Duration::from_millis(15));
        }
        assert!(eventually(|| rig.sink.last(1) == Some(0)));
        assert_eq!(vec![255, 191, 128, 64, 0], writes_at(&rig.sink, 1));
        assert!(writes_at(&rig.sink, 2).iter().all(|v| *v == 0));
        assert!(writes_at(&rig.sink, 3).iter().all(|v| *v == 0));
    }

    #[test]
    fn test_blackout_mid_fade() {
        let rig = rig();
        rig.fixture.send(FixtureCommand::StaticOn(red(3)));
        assert!(eventually(|| rig.sink.last(1) == Some(255)));
        rig.fixture.send(FixtureCommand::StaticOff(red(3)));
        assert!(rig.clock.wait_pending(1));

        rig.ctx.set_blackout(true);
        rig.fixture.send(FixtureCommand::Blackout);
        assert!(eventually(|| rig.sink.last(1) == Some(0)));
        rig.sink.take();
        // The fade keeps going, but only ever writes zeros.
        for _ in 0..4 {
            assert!(rig.clock.wait_pending(1));
            rig.clock.advance(Duration::from_millis(15));
        }
        rig.fixture.send(FixtureCommand::Clear);
        assert!(eventually(|| !writes_at(&rig.sink, 3).is_empty()));
        assert!(rig.sink.take().iter().all(|(_, v)| *v == 0));
    }

    #[test]
    fn test_stop_cancels_fade() {
        let rig = rig();
        let mut params = red(3);
        params.fade = FadeProfile::from_sequence(10, 0);
        rig.fixture.send(FixtureCommand::StaticFadeUp(params));
        assert!(rig.clock.wait_pending(1));
        rig.clock.advance(Duration::from_millis(15));
        assert!(rig.clock.wait_pending(1));

        rig.fixture.stop();
        let writes = rig.sink.take();
        assert_eq!(2, writes.iter().filter(|(a, _)| *a == 1).count());
        rig.clock.advance(Duration::from_secs(1));
        thread::sleep(Duration::from_millis(20));
        assert!(rig.sink.take().is_empty());
    }

    #[test]
    fn test_fade_up_from_another_color() {
        let rig = rig();
        rig.fixture.send(FixtureCommand::StaticOn(red(1)));
        assert!(eventually(|| rig.sink.last(1) == Some(255)));
        rig.sink.take();

        let mut blue = red(1);
        blue.color = Color::new(0, 0, 255);
        rig.fixture.send(FixtureCommand::StaticFadeUp(blue));
        // Five samples down, five up.
        for _ in 0..9 {
            assert!(rig.clock.wait_pending(1));
            rig.clock.advance(Duration::from_millis(5));
        }
        assert!(eventually(|| rig.sink.last(3) == Some(255)));
        assert_eq!(vec![255, 191, 128, 64, 0, 0, 0, 0, 0, 0], writes_at(&rig.sink, 1));
        assert_eq!(vec![0, 0, 0, 0, 0, 0, 64, 128, 191, 255], writes_at(&rig.sink, 3));
    }

    /// Fade red up with a soft profile and stop four samples in, at 102.
    fn part_way_up(rig: &Rig) -> StaticParams {
        let mut params = red(3);
        params.fade = FadeProfile::from_sequence(10, 0);
        rig.fixture.send(FixtureCommand::StaticFadeUp(params.clone()));
        for _ in 0..4 {
            assert!(rig.clock.wait_pending(1));
            rig.clock.advance(Duration::from_millis(15));
        }
        assert!(rig.clock.wait_pending(1));
        assert_eq!(vec![0, 26, 51, 77, 102], writes_at(&rig.sink, 1));
        params
    }

    #[test]
    fn test_static_off_during_fade_up() {
        let rig = rig();
        let params = part_way_up(&rig);

        rig.fixture.send(FixtureCommand::StaticOff(params));
        assert!(eventually(|| writes_at(&rig.sink, 1).len() == 6));
        for _ in 0..4 {
            assert!(rig.clock.wait_pending(1));
            rig.clock.advance(Duration::from_millis(15));
        }
        assert!(eventually(|| rig.sink.last(1) == Some(0)));
        assert_eq!(
            vec![0, 26, 51, 77, 102, 102, 77, 51, 26, 0],
            writes_at(&rig.sink, 1)
        );
    }

    #[test]
    fn test_same_color_resumes_fade_up() {
        let rig = rig();
        let params = part_way_up(&rig);

        rig.fixture.send(FixtureCommand::StaticFadeUp(params));
        assert!(eventually(|| writes_at(&rig.sink, 1).len() == 6));
        for _ in 0..6 {
            assert!(rig.clock.wait_pending(1));
            rig.clock.advance(Duration::from_millis(15));
        }
        assert!(eventually(|| rig.sink.last(1) == Some(255)));
        assert_eq!(
            vec![0, 26, 51, 77, 102, 102, 128, 153, 179, 204, 230, 255],
            writes_at(&rig.sink, 1)
        );
    }

    #[test]
    fn test_new_color_during_fade_up() {
        let rig = rig();
        let mut blue = part_way_up(&rig);
        blue.color = Color::new(0, 0, 255);

        rig.fixture.send(FixtureCommand::StaticFadeUp(blue));
        assert!(eventually(|| writes_at(&rig.sink, 1).len() == 6));
        // Four more samples down, eleven up.
        for _ in 0..15 {
            assert!(rig.clock.wait_pending(1));
            rig.clock.advance(Duration::from_millis(15));
        }
        assert!(eventually(|| rig.sink.last(3) == Some(255)));
        let reds = writes_at(&rig.sink, 1);
        assert_eq!(vec![102, 77, 51, 26, 0], reds[5..10]);
        assert!(reds[10..].iter().all(|v| *v == 0));
        assert_eq!(0, rig.sink.last(1).unwrap());
    }

    #[test]
    fn test_stop_with_full_inbox() {
        let Rig { sink, fixture, .. } = rig();
        // Hold up rendering so the inbox backs up behind it.
        let writes = sink.writes.lock();
        for _ in 0..2 {
            while fixture.tx.try_send(FixtureCommand::StaticOn(red(1))).is_ok() {}
            thread::sleep(Duration::from_millis(20));
        }
        let stopping = thread::spawn(move || fixture.stop());
        thread::sleep(SEND_TIMEOUT + Duration::from_millis(50));
        drop(writes);
        assert!(eventually(|| stopping.is_finished()));
    }

    #[test]
    fn test_flood_and_clear() {
        let rig = rig();
        rig.fixture.send(FixtureCommand::StartFlood { master: 128 });
        assert!(eventually(|| rig.sink.last(2) == Some(128)));
        assert_eq!(Some(128), rig.sink.last(1));
        rig.fixture.send(FixtureCommand::StopFlood);
        assert!(eventually(|| rig.sink.last(2) == Some(0)));
    }

    #[test]
    fn test_play_disabled_position_is_dark() {
        let rig = rig();
        let params = PlayParams {
            position: Position {
                color: RED,
                brightness: 255,
                enabled: false,
                pan: 128,
                tilt: 128,
            },
            master: 255,
            strobe: false,
            strobe_speed: 0,
            scanner_color: None,
            gobo: 1,
            shutter: 255,
        };
        rig.fixture.send(FixtureCommand::RgbPlay(params.clone()));
        assert!(eventually(|| rig.sink.writes.lock().len() == 3));
        assert_eq!(Some(0), rig.sink.last(1));
        rig.fixture.send(FixtureCommand::RgbPlay(PlayParams {
            position: Position {
                enabled: true,
                ..params.position
            },
            ..params
        }));
        assert!(eventually(|| rig.sink.last(1) == Some(255)));
    }
}
