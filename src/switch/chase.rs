//! The mini-sequencer behind a switch position's Chase action, and the
//! rotation worker that steers its rotate channel.
use std::{
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, Sender, bounded, select};
use log::{debug, warn};

use super::{Override, setter::rotate_value};
use crate::{
    color::{Color, NamedColor, scale},
    fixture::{
        Action, Capabilities, Channel, ChannelRole, FixtureDescriptor, Rotate, RotateSpeed, Toggle,
    },
    mapper::{FixtureUpdate, map_descriptor},
    pattern::FadeProfile,
    receiver::Context,
    sequence::{MAX_FADE_TIME, MAX_SPEED, fade_time, speed_period},
};

/// How often the rotation worker retargets the rotate channel.
pub const RETARGET: Duration = Duration::from_millis(1500);

/// How long a command may wait for room in a worker's inbox.
const SEND_TIMEOUT: Duration = Duration::from_millis(100);

/// Live changes to a running chase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChaseCommand {
    Stop,
    /// Speed ordinal.
    UpdateSpeed(usize),
    UpdateShift(usize),
    /// Plateau length, in samples.
    UpdateSize(usize),
    /// Fade-time ordinal.
    UpdateFade(usize),
    UpdateRotateSpeed(usize),
    /// Index into the named colour table.
    UpdateColors(usize),
    /// Gobo setting number.
    UpdateGobo(usize),
    /// Drop every override and go back to the action's own parameters.
    Reset,
}

impl ChaseCommand {
    /// Take every set field of an override as a chase command.
    pub fn take_override(overrides: &mut Override) -> Vec<Self> {
        [
            overrides.speed.take().map(Self::UpdateSpeed),
            overrides.shift.take().map(Self::UpdateShift),
            overrides.size.take().map(Self::UpdateSize),
            overrides.fade.take().map(Self::UpdateFade),
            overrides.rotate_speed.take().map(Self::UpdateRotateSpeed),
            overrides.color.take().map(Self::UpdateColors),
            overrides.gobo.take().map(Self::UpdateGobo),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Everything a chase needs to know about the switch it runs for.
#[derive(Debug, Clone)]
pub struct Chase {
    /// Sequence index, from 0.
    pub sequence: usize,
    /// Switch number within the sequence.
    pub switch: usize,
    /// The descriptor the chase renders onto.
    pub target: FixtureDescriptor,
    pub action: Action,
    /// The switch position's master level.
    pub master: u8,
}

impl Chase {
    fn beat_subscriber(&self) -> String {
        format!("switch-{}-{}", self.sequence, self.switch)
    }

    fn rotatable(&self) -> bool {
        self.action.rotate != Rotate::Off
            && self.target.capabilities().contains(Capabilities::ROTATE)
    }
}

/// A running chase worker.
pub struct ChaseHandle {
    tx: Sender<ChaseCommand>,
    worker: Option<JoinHandle<()>>,
}

impl ChaseHandle {
    /// Start a chase. Any pending override fields are taken and applied
    /// before the first step.
    pub fn spawn(chase: Chase, ctx: Context, overrides: &mut Override) -> Self {
        let (tx, inbox) = bounded(16);
        for cmd in ChaseCommand::take_override(overrides) {
            let _ = tx.try_send(cmd);
        }
        debug!(
            "Starting chase {} on {}.",
            chase.action.name,
            chase.target.display_name()
        );
        let worker = thread::spawn(move || Worker::new(chase, ctx, inbox).run());
        Self {
            tx,
            worker: Some(worker),
        }
    }

    /// Post a command to the chase; dropped if the chase doesn't take it in time.
    pub fn send(&self, cmd: ChaseCommand) {
        if self.tx.send_timeout(cmd, SEND_TIMEOUT).is_err() {
            warn!("Chase did not accept {cmd:?}, dropping it.");
        }
    }

    /// Stop the chase and wait for it to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        let _ = self.tx.send(ChaseCommand::Stop);
        if worker.join().is_err() {
            warn!("Chase worker panicked.");
        }
    }
}

impl Drop for ChaseHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// The chase was told to stop.
struct Stopped;

/// Parameters of a chase that overrides can change.
struct Live {
    colors: Vec<Color>,
    /// None follows the music.
    speed: Option<usize>,
    shift: usize,
    fade: usize,
    profile: FadeProfile,
    rotate_speed: RotateSpeed,
    gobo: usize,
}

impl Live {
    fn from_action(action: &Action, target: &FixtureDescriptor) -> Self {
        let gobo = action
            .gobo
            .as_deref()
            .and_then(|name| target.gobo_by_name(name).ok())
            .map(|s| s.number)
            .unwrap_or(1);
        Self {
            colors: action.rgb_colors(),
            speed: action.speed.speed_ordinal(),
            shift: 0,
            fade: action.fade.fade_time_ordinal(),
            profile: FadeProfile::from_action(action.fade, action.size),
            rotate_speed: action.rotate_speed,
            gobo,
        }
    }

    /// Interval between envelope samples: the fade time spread over the
    /// rising ramp.
    fn sample_period(&self) -> Duration {
        fade_time(self.fade) / self.profile.slope_on.len().max(1) as u32
    }
}

struct Worker {
    chase: Chase,
    ctx: Context,
    inbox: Receiver<ChaseCommand>,
    live: Live,
    strobe: (bool, u8),
    rotator: Option<RotatorHandle>,
    beats: Option<Receiver<()>>,
}

impl Worker {
    fn new(chase: Chase, ctx: Context, inbox: Receiver<ChaseCommand>) -> Self {
        let live = Live::from_action(&chase.action, &chase.target);
        let strobe = strobe(&chase.action);
        let rotator = chase
            .rotatable()
            .then(|| RotatorHandle::for_chase(&chase, &ctx, live.rotate_speed));
        let mut worker = Self {
            chase,
            ctx,
            inbox,
            live,
            strobe,
            rotator,
            beats: None,
        };
        worker.sync_beats();
        worker
    }

    fn run(mut self) {
        let mut step = 0;
        while self.play_step(step).is_ok() {
            step = step.wrapping_add(1);
        }
        self.finish();
    }

    /// Play one colour step: the fade envelope, then rest until the next
    /// step is due.
    fn play_step(&mut self, step: usize) -> Result<(), Stopped> {
        let start = self.ctx.clock.now();
        self.revive_rotator();
        if let Some(rotator) = &self.rotator {
            rotator.send(RotatorMsg::KeepAlive);
        }
        self.advance_gobo(step);
        for level in self.live.profile.envelope() {
            self.render(step, level);
            let timer = self.ctx.clock.after(self.live.sample_period());
            self.wait(&timer)?;
        }
        self.rest(start)
    }

    fn render(&self, step: usize, level: u8) {
        let target = &self.chase.target;
        let colors = &self.live.colors;
        for sub in 0..target.sub_fixtures() {
            let color = colors[(step + sub * self.live.shift) % colors.len()];
            let mut update = FixtureUpdate {
                sequence: self.chase.sequence,
                color,
                rotate: if self.rotator.is_some() { None } else { Some(0) },
                gobo: self.live.gobo,
                strobe: self.strobe.0,
                strobe_speed: self.strobe.1,
                blackout: self.ctx.is_blackout(),
                ..Default::default()
            };
            if self.chase.action.map == Toggle::On {
                update.master = scale(self.chase.master, level);
            } else {
                update.master = self.chase.master;
                update.brightness = level;
                update.master_only = true;
            }
            map_descriptor(target, sub, self.ctx.sink.as_ref(), &update);
        }
    }

    /// Wait for a timer, applying commands that arrive meanwhile.
    fn wait(&mut self, timer: &Receiver<Instant>) -> Result<(), Stopped> {
        let inbox = self.inbox.clone();
        loop {
            select! {
                recv(inbox) -> cmd => self.handle(cmd.unwrap_or(ChaseCommand::Stop))?,
                recv(timer) -> _ => return Ok(()),
            }
        }
    }

    /// Wait out the rest of the step period, or for a beat.
    ///
    /// The remaining time is recomputed after every command so a speed
    /// change takes effect within the current step.
    fn rest(&mut self, start: Instant) -> Result<(), Stopped> {
        let inbox = self.inbox.clone();
        loop {
            let Some(speed) = self.live.speed else {
                let Some(beats) = self.beats.clone() else {
                    return Ok(());
                };
                select! {
                    recv(inbox) -> cmd => self.handle(cmd.unwrap_or(ChaseCommand::Stop))?,
                    recv(beats) -> _ => return Ok(()),
                }
                continue;
            };
            let elapsed = self.ctx.clock.now().saturating_duration_since(start);
            let remaining = speed_period(speed).saturating_sub(elapsed);
            if remaining.is_zero() {
                while let Ok(cmd) = inbox.try_recv() {
                    self.handle(cmd)?;
                }
                return Ok(());
            }
            let timer = self.ctx.clock.after(remaining);
            select! {
                recv(inbox) -> cmd => self.handle(cmd.unwrap_or(ChaseCommand::Stop))?,
                recv(timer) -> _ => return Ok(()),
            }
        }
    }

    fn handle(&mut self, cmd: ChaseCommand) -> Result<(), Stopped> {
        debug!("Chase {}: {cmd:?}.", self.chase.action.name);
        match cmd {
            ChaseCommand::Stop => return Err(Stopped),
            ChaseCommand::UpdateSpeed(speed) => self.live.speed = Some(speed.min(MAX_SPEED)),
            ChaseCommand::UpdateShift(shift) => self.live.shift = shift,
            ChaseCommand::UpdateSize(size) => self.live.profile.plateau = size,
            ChaseCommand::UpdateFade(fade) => self.live.fade = fade.min(MAX_FADE_TIME),
            ChaseCommand::UpdateRotateSpeed(index) => {
                self.live.rotate_speed = RotateSpeed::from_index(index);
                self.update_rotator();
            }
            ChaseCommand::UpdateColors(index) => match NamedColor::by_index(index) {
                Some(color) => self.live.colors = vec![color.rgb()],
                None => warn!("No colour at index {index}, keeping the chase colours."),
            },
            ChaseCommand::UpdateGobo(number) => self.live.gobo = number,
            ChaseCommand::Reset => {
                self.live = Live::from_action(&self.chase.action, &self.chase.target);
                self.update_rotator();
            }
        }
        self.sync_beats();
        Ok(())
    }

    /// Start the rotator again if it gave up while the chase was waiting
    /// on the music.
    fn revive_rotator(&mut self) {
        if !self.rotator.as_ref().is_some_and(RotatorHandle::is_finished) {
            return;
        }
        if let Some(rotator) = self.rotator.take() {
            rotator.stop();
        }
        debug!("Restarting rotator for chase {}.", self.chase.action.name);
        self.rotator = Some(RotatorHandle::for_chase(
            &self.chase,
            &self.ctx,
            self.live.rotate_speed,
        ));
    }

    fn update_rotator(&self) {
        if let Some(rotator) = &self.rotator {
            rotator.send(RotatorMsg::Speed(self.live.rotate_speed));
        }
    }

    /// Subscribe to the sound bus while the chase follows the music.
    fn sync_beats(&mut self) {
        let name = self.chase.beat_subscriber();
        match (self.live.speed, self.beats.is_some()) {
            (None, false) => self.beats = Some(self.ctx.sound.register(&name)),
            (Some(_), true) => {
                self.ctx.sound.deregister(&name);
                self.beats = None;
            }
            _ => (),
        }
    }

    /// Move to the next gobo every few steps, if the action cycles gobos.
    fn advance_gobo(&mut self, step: usize) {
        let Some(speed) = self.chase.action.gobo_speed else {
            return;
        };
        if step == 0 || step % speed.steps_per_change() != 0 {
            return;
        }
        let Ok(channel) = self.chase.target.channel_with_role(ChannelRole::Gobo) else {
            return;
        };
        let numbers: Vec<_> = channel.settings.iter().map(|s| s.number).collect();
        if numbers.is_empty() {
            return;
        }
        let next = numbers
            .iter()
            .position(|n| *n == self.live.gobo)
            .map_or(0, |i| (i + 1) % numbers.len());
        self.live.gobo = numbers[next];
    }

    fn finish(mut self) {
        if let Some(rotator) = self.rotator.take() {
            rotator.stop();
        }
        if self.beats.take().is_some() {
            self.ctx.sound.deregister(&self.chase.beat_subscriber());
        }
        for sub in 0..self.chase.target.sub_fixtures() {
            map_descriptor(
                &self.chase.target,
                sub,
                self.ctx.sink.as_ref(),
                &FixtureUpdate {
                    blackout: true,
                    ..Default::default()
                },
            );
        }
        debug!("Chase {} stopped.", self.chase.action.name);
    }
}

/// Strobe on/off and speed from an action's strobe field: "On", "Off" or a
/// strobe speed.
fn strobe(action: &Action) -> (bool, u8) {
    let Some(value) = action.strobe.as_deref() else {
        return (false, 0);
    };
    if let Ok(speed) = value.trim().parse::<u8>() {
        return (speed > 0, speed);
    }
    match value.parse::<Toggle>() {
        Ok(Toggle::On) => (true, 255),
        Ok(Toggle::Off) => (false, 0),
        Err(_) => {
            warn!("Action {}: unknown strobe setting \"{value}\".", action.name);
            (false, 0)
        }
    }
}

/// Messages to the rotation worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotatorMsg {
    KeepAlive,
    Speed(RotateSpeed),
    Stop,
}

/// Steers a rotate channel between its direction bands and rest.
pub struct Rotator {
    /// The rotate channel and its address.
    rotate: Option<(Channel, usize)>,
    /// Master channel addresses, and whether each one is reversed.
    masters: Vec<(usize, bool)>,
    cycle: &'static [Rotate],
    ctx: Context,
}

impl Rotator {
    /// A rotator for the descriptor's rotate channel. Without one it only
    /// keeps time and zeroes the masters when it stops.
    pub fn new(target: &FixtureDescriptor, direction: Rotate, ctx: Context) -> Self {
        let rotate = target
            .channel_with_role(ChannelRole::Rotate)
            .ok()
            .map(|c| (c.clone(), target.channel_address(c)));
        let masters = target
            .channels
            .iter()
            .filter_map(|c| match c.role() {
                ChannelRole::Master { reverse } => Some((target.channel_address(c), reverse)),
                _ => None,
            })
            .collect();
        let cycle: &'static [Rotate] = match direction {
            Rotate::Off => &[Rotate::Off],
            Rotate::Forward => &[Rotate::Forward, Rotate::Off],
            Rotate::Reverse => &[Rotate::Reverse, Rotate::Off],
            Rotate::Auto => &[Rotate::Forward, Rotate::Off, Rotate::Reverse, Rotate::Off],
        };
        Self {
            rotate,
            masters,
            cycle,
            ctx,
        }
    }

    /// Run until stopped, or until two retarget periods pass without a
    /// keepalive. Leaves rotate and master at zero.
    pub fn run(self, inbox: Receiver<RotatorMsg>, mut speed: RotateSpeed) {
        let mut phase = 0;
        let mut alive = false;
        let mut missed = 0;
        self.write(phase, speed);
        let mut timer = self.ctx.clock.after(RETARGET);
        loop {
            select! {
                recv(inbox) -> msg => match msg {
                    Ok(RotatorMsg::KeepAlive) => alive = true,
                    Ok(RotatorMsg::Speed(s)) => {
                        speed = s;
                        self.write(phase, speed);
                    }
                    Ok(RotatorMsg::Stop) | Err(_) => break,
                },
                recv(timer) -> _ => {
                    if alive {
                        missed = 0;
                    } else {
                        missed += 1;
                        if missed >= 2 {
                            debug!("Rotator missed two keepalives, stopping.");
                            break;
                        }
                    }
                    alive = false;
                    phase = (phase + 1) % self.cycle.len();
                    self.write(phase, speed);
                    timer = self.ctx.clock.after(RETARGET);
                }
            }
        }
        self.zero();
    }

    fn write(&self, phase: usize, speed: RotateSpeed) {
        let Some((channel, addr)) = &self.rotate else {
            return;
        };
        let direction = self.cycle[phase];
        let value = rotate_value(channel, direction, speed).unwrap_or_else(|| {
            warn!(
                "Rotate channel {} has no setting for {direction} {speed}.",
                channel.name
            );
            0
        });
        let value = if self.ctx.is_blackout() { 0 } else { value };
        self.ctx.sink.set_channel(*addr, value);
    }

    fn zero(&self) {
        if let Some((_, addr)) = &self.rotate {
            self.ctx.sink.set_channel(*addr, 0);
        }
        for (addr, reverse) in &self.masters {
            self.ctx.sink.set_channel(*addr, if *reverse { 255 } else { 0 });
        }
    }
}

struct RotatorHandle {
    tx: Sender<RotatorMsg>,
    worker: JoinHandle<()>,
}

impl RotatorHandle {
    fn spawn(rotator: Rotator, speed: RotateSpeed) -> Self {
        let (tx, inbox) = bounded(4);
        let worker = thread::spawn(move || rotator.run(inbox, speed));
        Self { tx, worker }
    }

    fn for_chase(chase: &Chase, ctx: &Context, speed: RotateSpeed) -> Self {
        Self::spawn(
            Rotator::new(&chase.target, chase.action.rotate, ctx.clone()),
            speed,
        )
    }

    fn is_finished(&self) -> bool {
        self.worker.is_finished()
    }

    fn send(&self, msg: RotatorMsg) {
        let _ = self.tx.try_send(msg);
    }

    fn stop(self) {
        let _ = self.tx.send(RotatorMsg::Stop);
        if self.worker.join().is_err() {
            warn!("Rotator worker panicked.");
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::*;
    use crate::{
        clock::mock::ManualClock,
        dmx::{ChannelSink, mock::RecordingSink},
        fixture::{ActionFade, ActionMode, ActionSize, ActionSpeed},
        receiver::test_context,
    };

    const ROTATE: usize = 10;
    const MASTER: usize = 11;
    const RED: usize = 12;
    const BLUE: usize = 14;

    fn flower() -> FixtureDescriptor {
        serde_yaml::from_str(
            "
group: 1
number: 1
name: Flower
type: switch
address: 10
channels:
  - number: 1
    name: Rotate
    settings:
      - { name: Forward Slow, value: 64 }
      - { name: Reverse Slow, value: 192 }
  - { number: 2, name: Master }
  - { number: 3, name: Red }
  - { number: 4, name: Green }
  - { number: 5, name: Blue }
",
        )
        .unwrap()
    }

    fn action() -> Action {
        Action {
            number: 1,
            name: "chase".to_string(),
            mode: ActionMode::Chase,
            colors: vec!["Red".to_string(), "Blue".to_string()],
            map: Toggle::On,
            fade: ActionFade::Off,
            size: ActionSize::Off,
            speed: ActionSpeed::Medium,
            rotate: Rotate::Forward,
            rotate_speed: RotateSpeed::Slow,
            program: None,
            program_speed: None,
            strobe: None,
            gobo: None,
            gobo_speed: None,
        }
    }

    fn chase() -> Chase {
        Chase {
            sequence: 0,
            switch: 1,
            target: flower(),
            action: action(),
            master: 255,
        }
    }

    /// Poll until the condition holds, in real time.
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

    #[test]
    fn test_chase_cycles_colors_and_rotates() {
        let clock = ManualClock::new();
        let sink = Arc::new(RecordingSink::default());
        let ctx = test_context(sink.clone(), clock.clone());
        let handle = ChaseHandle::spawn(chase(), ctx, &mut Override::default());

        // Rotator timer plus the first sample timer.
        assert!(clock.wait_pending(2));
        assert_eq!(Some(255), sink.last(RED));
        assert_eq!(Some(0), sink.last(BLUE));
        assert_eq!(Some(255), sink.last(MASTER));
        assert!(eventually(|| sink.last(ROTATE) == Some(64)));

        // One 25 ms sample, then the rest of the 500 ms step.
        clock.advance(Duration::from_millis(25));
        assert!(clock.wait_pending(2));
        clock.advance(Duration::from_millis(475));
        assert!(clock.wait_pending(2));
        assert_eq!(Some(0), sink.last(RED));
        assert_eq!(Some(255), sink.last(BLUE));

        for _ in 0..2 {
            clock.advance(Duration::from_millis(25));
            assert!(clock.wait_pending(2));
            clock.advance(Duration::from_millis(475));
            assert!(clock.wait_pending(2));
        }
        // 1.5 s in: the fourth step is blue and the rotator is resting.
        assert_eq!(Some(255), sink.last(BLUE));
        assert!(eventually(|| sink.last(ROTATE) == Some(0)));

        handle.stop();
        assert_eq!(Some(0), sink.last(ROTATE));
        assert_eq!(Some(0), sink.last(MASTER));
        assert_eq!(Some(0), sink.last(RED));
    }

    #[test]
    fn test_speed_override_takes_effect_within_step() {
        let clock = ManualClock::new();
        let sink = Arc::new(RecordingSink::default());
        let ctx = test_context(sink.clone(), clock.clone());
        let mut c = chase();
        c.action.rotate = Rotate::Off;
        let handle = ChaseHandle::spawn(c, ctx, &mut Override::default());

        assert!(clock.wait_pending(1));
        clock.advance(Duration::from_millis(25));
        assert!(clock.wait_pending(1));
        assert_eq!(Some(255), sink.last(RED));

        // 3 ms is already over: the next colour plays without the clock moving.
        handle.send(ChaseCommand::UpdateSpeed(20));
        assert!(eventually(|| sink.last(BLUE) == Some(255)));

        // Back to the action's 500 ms.
        handle.send(ChaseCommand::Reset);
        assert!(clock.wait_pending(1));
        clock.advance(Duration::from_millis(25));
        assert!(clock.wait_pending(1));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(Some(255), sink.last(BLUE));
        clock.advance(Duration::from_millis(475));
        assert!(eventually(|| sink.last(RED) == Some(255)));
        handle.stop();
    }

    #[test]
    fn test_rotator_stops_after_two_missed_keepalives() {
        let clock = ManualClock::new();
        let sink = Arc::new(RecordingSink::default());
        let ctx = test_context(sink.clone(), clock.clone());
        let rotator = Rotator::new(&flower(), Rotate::Reverse, ctx);
        let (_tx, inbox) = bounded(4);
        let worker = thread::spawn(move || rotator.run(inbox, RotateSpeed::Slow));

        assert!(clock.wait_pending(1));
        assert_eq!(Some(192), sink.last(ROTATE));
        clock.advance(RETARGET);
        assert!(clock.wait_pending(1));
        assert_eq!(Some(0), sink.last(ROTATE));
        sink.set_channel(ROTATE, 99);
        clock.advance(RETARGET);
        worker.join().unwrap();
        assert_eq!(Some(0), sink.last(ROTATE));
        assert_eq!(Some(0), sink.last(MASTER));
    }

    #[test]
    fn test_rotator_restarts_on_next_beat() {
        let clock = ManualClock::new();
        let sink = Arc::new(RecordingSink::default());
        let ctx = test_context(sink.clone(), clock.clone());
        let mut c = chase();
        c.action.speed = ActionSpeed::Music;
        let handle = ChaseHandle::spawn(c, ctx.clone(), &mut Override::default());

        assert!(clock.wait_pending(2));
        clock.advance(Duration::from_millis(25));
        // Waiting on a beat that doesn't come: the rotator gives up.
        for _ in 0..3 {
            assert!(clock.wait_pending(1));
            clock.advance(RETARGET);
        }
        assert!(eventually(|| sink.last(MASTER) == Some(0)));
        assert_eq!(Some(0), sink.last(ROTATE));

        ctx.sound.beat();
        assert!(eventually(|| sink.last(ROTATE) == Some(64)));
        assert!(eventually(|| sink.last(MASTER) == Some(255)));
        handle.stop();
    }

    #[test]
    fn test_take_override() {
        let mut o = Override {
            speed: Some(20),
            color: Some(5),
            ..Default::default()
        };
        assert_eq!(
            vec![ChaseCommand::UpdateSpeed(20), ChaseCommand::UpdateColors(5)],
            ChaseCommand::take_override(&mut o)
        );
        assert!(o.is_empty());
    }

    #[test]
    fn test_strobe_field() {
        let mut a = action();
        assert_eq!((false, 0), strobe(&a));
        a.strobe = Some("on".to_string());
        assert_eq!((true, 255), strobe(&a));
        a.strobe = Some("120".to_string());
        assert_eq!((true, 120), strobe(&a));
    }
}
