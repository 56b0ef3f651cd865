//! Switch fixtures: positions made of direct settings plus Off, Static,
//! Chase and Control actions.
use log::{debug, warn};

use crate::{
    color::{Color, LastColor, NamedColor},
    fixture::{Action, ActionMode, ChannelRole, FixtureDescriptor, State},
    mapper::{FixtureUpdate, map_descriptor},
    receiver::Context,
    sequence::MAX_SPEED,
};

mod chase;
mod overrides;
mod setter;

use chase::{Chase, ChaseCommand, ChaseHandle};
pub use overrides::Override;
use setter::apply_settings;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SwitchMode {
    #[default]
    Inactive,
    Static,
    Chasing,
    Controlling,
}

struct RunningChase {
    position: usize,
    action: usize,
    handle: ChaseHandle,
}

/// Drives one switch fixture through its positions.
pub struct SwitchController {
    sequence: usize,
    slot: usize,
    position: Option<usize>,
    mode: SwitchMode,
    chase: Option<RunningChase>,
    overrides: Override,
    #[cfg(test)]
    chases_started: usize,
}

impl SwitchController {
    /// A controller for the switch in a sequence slot (both from 0).
    pub fn new(sequence: usize, slot: usize) -> Self {
        Self {
            sequence,
            slot,
            position: None,
            mode: SwitchMode::Inactive,
            chase: None,
            overrides: Override::default(),
            #[cfg(test)]
            chases_started: 0,
        }
    }

    pub fn mode(&self) -> SwitchMode {
        self.mode
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }

    /// Move the switch to a position (indexed from 0).
    ///
    /// Returns the colour to remember for the fixture, if the position set one.
    pub fn activate(&mut self, ctx: &Context, position: usize) -> Option<LastColor> {
        let catalogue = ctx.catalogue.load();
        let resolved = catalogue.by_slot(self.sequence, self.slot).and_then(|(switch, _)| {
            let target = catalogue.switch_target(switch)?;
            Ok((switch, target))
        });
        let (switch, target) = match resolved {
            Ok(found) => found,
            Err(err) => {
                warn!("Switch {}.{}: {err}.", self.sequence + 1, self.slot + 1);
                return None;
            }
        };
        let Some(state) = switch.states.get(position) else {
            warn!(
                "{} has no position {}, ignoring.",
                switch.display_name(),
                position + 1
            );
            return None;
        };
        debug!("{} to position {}.", switch.display_name(), state.name);
        self.position = Some(position);

        apply_settings(target, state, &mut self.overrides, ctx.sink.as_ref(), ctx.is_blackout());

        if state.actions.is_empty() {
            self.stop_chase();
            self.mode = SwitchMode::Inactive;
        }
        let mut last = None;
        for action in &state.actions {
            match action.mode {
                ActionMode::None | ActionMode::Off => {
                    self.stop_chase();
                    self.mode = SwitchMode::Inactive;
                }
                ActionMode::Static => {
                    self.stop_chase();
                    self.show_static(ctx, target, state, action);
                    self.mode = SwitchMode::Static;
                    last = Some(LastColor::rgb(Color::BLACK));
                }
                ActionMode::Chase => {
                    self.start_chase(ctx, switch.number, target, state, action, position);
                    self.mode = SwitchMode::Chasing;
                }
                ActionMode::Control => {
                    self.stop_chase();
                    self.control(ctx, target, action);
                    self.mode = SwitchMode::Controlling;
                }
            }
        }
        last
    }

    /// Apply live parameter changes to the current position.
    ///
    /// A running chase takes them as commands; Static and Control positions
    /// are re-rendered. While inactive they wait for the next activation.
    pub fn apply_override(&mut self, ctx: &Context, overrides: Override) -> Option<LastColor> {
        self.overrides.merge(overrides);
        match self.mode {
            SwitchMode::Chasing => {
                if let Some(running) = &self.chase {
                    for cmd in ChaseCommand::take_override(&mut self.overrides) {
                        running.handle.send(cmd);
                    }
                }
                None
            }
            SwitchMode::Static | SwitchMode::Controlling => self.reactivate(ctx),
            SwitchMode::Inactive => None,
        }
    }

    /// Drop all overrides, putting the current position back to its own
    /// parameters.
    pub fn clear_override(&mut self, ctx: &Context) -> Option<LastColor> {
        self.overrides = Override::default();
        match self.mode {
            SwitchMode::Chasing => {
                if let Some(running) = &self.chase {
                    running.handle.send(ChaseCommand::Reset);
                }
                None
            }
            SwitchMode::Static | SwitchMode::Controlling => self.reactivate(ctx),
            SwitchMode::Inactive => None,
        }
    }

    /// Stop any chase and go inactive.
    pub fn stop(&mut self) {
        self.stop_chase();
        self.mode = SwitchMode::Inactive;
    }

    fn reactivate(&mut self, ctx: &Context) -> Option<LastColor> {
        let position = self.position?;
        self.activate(ctx, position)
    }

    fn stop_chase(&mut self) {
        if let Some(running) = self.chase.take() {
            running.handle.stop();
        }
    }

    fn start_chase(
        &mut self,
        ctx: &Context,
        switch: usize,
        target: &FixtureDescriptor,
        state: &State,
        action: &Action,
        position: usize,
    ) {
        if let Some(running) = &self.chase {
            if running.position == position && running.action == action.number {
                for cmd in ChaseCommand::take_override(&mut self.overrides) {
                    running.handle.send(cmd);
                }
                return;
            }
        }
        self.stop_chase();
        let chase = Chase {
            sequence: self.sequence,
            switch,
            target: target.clone(),
            action: action.clone(),
            master: state.master,
        };
        self.chase = Some(RunningChase {
            position,
            action: action.number,
            handle: ChaseHandle::spawn(chase, ctx.clone(), &mut self.overrides),
        });
        #[cfg(test)]
        {
            self.chases_started += 1;
        }
    }

    /// Render the action's first colour once, under the position's master.
    fn show_static(
        &mut self,
        ctx: &Context,
        target: &FixtureDescriptor,
        state: &State,
        action: &Action,
    ) {
        let color = match self.overrides.color.take().map(NamedColor::by_index) {
            Some(Some(named)) => named.rgb(),
            _ => action.rgb_colors()[0],
        };
        let gobo = self
            .overrides
            .gobo
            .take()
            .or_else(|| {
                let name = action.gobo.as_deref()?;
                target.gobo_by_name(name).ok().map(|s| s.number)
            })
            .unwrap_or(1);
        let update = FixtureUpdate {
            sequence: self.sequence,
            slot: self.slot,
            color,
            gobo,
            master: state.master,
            blackout: ctx.is_blackout(),
            ..Default::default()
        };
        for sub in 0..target.sub_fixtures() {
            map_descriptor(target, sub, ctx.sink.as_ref(), &update);
        }
    }

    /// Write the action's program and program speed.
    fn control(&mut self, ctx: &Context, target: &FixtureDescriptor, action: &Action) {
        let blackout = ctx.is_blackout();
        let speed_override = self
            .overrides
            .speed
            .take()
            .map(|s| (s.min(MAX_SPEED) * 255 / MAX_SPEED) as u8);
        let writes = [
            (ChannelRole::Program, action.program.as_deref(), None),
            (
                ChannelRole::ProgramSpeed,
                action.program_speed.as_deref(),
                speed_override,
            ),
        ];
        for (role, value, preempt) in writes {
            let Ok(channel) = target.channel_with_role(role) else {
                continue;
            };
            let value = match (preempt, value) {
                (Some(v), _) => v,
                (None, Some(name)) => match name.trim().parse::<u8>() {
                    Ok(v) => v,
                    Err(_) => match channel.setting(name).map(|s| s.value.low()) {
                        Ok(Some(v)) => v,
                        _ => {
                            warn!(
                                "{}: no setting {name} on {}.",
                                target.display_name(),
                                channel.name
                            );
                            continue;
                        }
                    },
                },
                (None, None) => continue,
            };
            ctx.sink.set_channel(
                target.channel_address(channel),
                if blackout { 0 } else { value },
            );
        }
    }
}

impl Drop for SwitchController {
    fn drop(&mut self) {
        self.stop_chase();
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::*;
    use crate::{
        clock::mock::ManualClock,
        dmx::mock::RecordingSink,
        fixture::{Catalogue, shared},
        receiver::test_context_with,
    };

    const SWITCHES: &str = "
fixtures:
  - group: 1
    number: 1
    name: Projector
    type: switch
    address: 1
    channels:
      - { number: 1, name: Master }
      - { number: 2, name: Red }
      - { number: 3, name: Green }
      - { number: 4, name: Blue }
      - number: 5
        name: Program
        settings:
          - { name: Swirl, value: 40 }
      - { number: 6, name: ProgramSpeed }
      - { number: 7, name: Strobe }
    states:
      - number: 1
        name: Off
        actions:
          - { mode: Off }
        settings:
          - { name: master, channel: Master, value: 0 }
      - number: 2
        name: Red
        master: 128
        actions:
          - { mode: Static, colors: [Red] }
      - number: 3
        name: Chase
        actions:
          - { number: 1, mode: Chase, colors: [Red, Blue], map: On }
      - number: 4
        name: Swirl
        actions:
          - { mode: Control, program: Swirl, program_speed: \"200\" }
";

    fn context() -> (Context, Arc<RecordingSink>) {
        let catalogue = Catalogue::from_yaml(SWITCHES, true).unwrap();
        let sink = Arc::new(RecordingSink::default());
        let ctx = test_context_with(shared(catalogue), sink.clone(), ManualClock::new());
        (ctx, sink)
    }

    #[test]
    fn test_static_position() {
        let (ctx, sink) = context();
        let mut switch = SwitchController::new(0, 0);
        let last = switch.activate(&ctx, 1);
        assert_eq!(Some(LastColor::rgb(Color::BLACK)), last);
        assert_eq!(SwitchMode::Static, switch.mode());
        // No master channel scaling: the master channel carries it.
        assert_eq!(Some(128), sink.last(1));
        assert_eq!(Some(255), sink.last(2));
        assert_eq!(Some(0), sink.last(4));
    }

    #[test]
    fn test_static_color_override() {
        let (ctx, sink) = context();
        let mut switch = SwitchController::new(0, 0);
        switch.activate(&ctx, 1);
        switch.apply_override(
            &ctx,
            Override {
                color: Some(5),
                ..Default::default()
            },
        );
        // Blue.
        assert_eq!(Some(0), sink.last(2));
        assert_eq!(Some(255), sink.last(4));
        switch.clear_override(&ctx);
        assert_eq!(Some(255), sink.last(2));
    }

    #[test]
    fn test_chase_reentry_is_idempotent() {
        let (ctx, _sink) = context();
        let mut switch = SwitchController::new(0, 0);
        switch.activate(&ctx, 2);
        switch.activate(&ctx, 2);
        assert_eq!(SwitchMode::Chasing, switch.mode());
        assert_eq!(1, switch.chases_started);

        switch.activate(&ctx, 0);
        assert_eq!(SwitchMode::Inactive, switch.mode());
        assert!(switch.chase.is_none());

        switch.activate(&ctx, 2);
        assert_eq!(2, switch.chases_started);
        switch.stop();
        assert_eq!(SwitchMode::Inactive, switch.mode());
    }

    #[test]
    fn test_off_runs_settings_only() {
        let (ctx, sink) = context();
        let mut switch = SwitchController::new(0, 0);
        assert_eq!(None, switch.activate(&ctx, 0));
        assert_eq!(vec![(1, 0)], sink.take());
    }

    #[test]
    fn test_control() {
        let (ctx, sink) = context();
        let mut switch = SwitchController::new(0, 0);
        switch.activate(&ctx, 3);
        assert_eq!(SwitchMode::Controlling, switch.mode());
        assert_eq!(Some(40), sink.last(5));
        assert_eq!(Some(200), sink.last(6));

        switch.apply_override(
            &ctx,
            Override {
                speed: Some(MAX_SPEED),
                ..Default::default()
            },
        );
        assert_eq!(Some(255), sink.last(6));
    }

    #[test]
    fn test_unknown_position() {
        let (ctx, sink) = context();
        let mut switch = SwitchController::new(0, 0);
        assert_eq!(None, switch.activate(&ctx, 9));
        assert_eq!(None, switch.position());
        assert!(sink.take().is_empty());
    }
}
