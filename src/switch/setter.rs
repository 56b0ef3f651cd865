//! Direct channel writes for a switch position's settings.
use log::warn;

use super::Override;
use crate::{
    color::scale,
    dmx::ChannelSink,
    error::NotFound,
    fixture::{Channel, ChannelRole, FixtureDescriptor, Rotate, RotateSpeed, Setting, SettingValue, State},
    sequence::MAX_SPEED,
};

/// Write every setting of a switch position onto its target fixture.
///
/// Overrides that apply to a setting's channel are used instead of the
/// setting's own value, and cleared.
pub fn apply_settings(
    target: &FixtureDescriptor,
    state: &State,
    overrides: &mut Override,
    sink: &dyn ChannelSink,
    blackout: bool,
) {
    for setting in &state.settings {
        let resolved = target_channel(target, setting).and_then(|channel| {
            let value = match override_value(channel, overrides) {
                Some(v) => v,
                None => setting_value(channel, setting, state.master)?,
            };
            Ok((channel, value))
        });
        match resolved {
            Ok((channel, value)) => sink.set_channel(
                target.channel_address(channel),
                if blackout { 0 } else { value },
            ),
            Err(err) => warn!(
                "{} state {}: {err}; skipping setting.",
                target.display_name(),
                state.name
            ),
        }
    }
}

/// The channel a setting writes: by number if numeric, else by name.
fn target_channel<'a>(
    target: &'a FixtureDescriptor,
    setting: &Setting,
) -> Result<&'a Channel, NotFound> {
    let key = setting.channel.as_deref().unwrap_or(&setting.name);
    match key.trim().parse::<usize>() {
        Ok(number) => target.channel_by_number(number),
        Err(_) => target.channel(key),
    }
}

fn setting_value(channel: &Channel, setting: &Setting, master: u8) -> Result<u8, NotFound> {
    let raw = match &setting.value {
        SettingValue::Named(name) => channel
            .setting(name)?
            .value
            .low()
            .ok_or_else(|| NotFound::new("setting value", name))?,
        other => other
            .low()
            .ok_or_else(|| NotFound::new("setting value", other))?,
    };
    Ok(match channel.role() {
        ChannelRole::Master { reverse: false } => scale(raw, master),
        ChannelRole::Master { reverse: true } => 255 - scale(raw, master),
        _ => raw,
    })
}

/// Take an override that applies to this channel, resolved to DMX.
fn override_value(channel: &Channel, overrides: &mut Override) -> Option<u8> {
    match channel.role() {
        ChannelRole::Speed | ChannelRole::ProgramSpeed => {
            let speed = overrides.speed.take()?;
            Some((speed.min(MAX_SPEED) * 255 / MAX_SPEED) as u8)
        }
        ChannelRole::Rotate => {
            let speed = RotateSpeed::from_index(overrides.rotate_speed.take()?);
            rotate_value(channel, Rotate::Forward, speed)
        }
        ChannelRole::Color => channel
            .settings
            .get(overrides.color.take()?)
            .and_then(|s| s.value.low()),
        ChannelRole::Gobo => channel
            .setting_by_number(overrides.gobo.take()?)
            .ok()
            .and_then(|s| s.value.low()),
        _ => None,
    }
}

/// Look up the DMX value for rotating in a direction at a speed, from
/// settings named like "Forward Slow" or "Reverse Fast".
pub fn rotate_value(channel: &Channel, direction: Rotate, speed: RotateSpeed) -> Option<u8> {
    let direction = match direction {
        Rotate::Off => return Some(0),
        Rotate::Forward | Rotate::Auto => "Forward",
        Rotate::Reverse => "Reverse",
    };
    channel
        .setting(&format!("{direction} {speed}"))
        .ok()
        .and_then(|s| s.value.low())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dmx::mock::RecordingSink;

    fn fixture() -> FixtureDescriptor {
        serde_yaml::from_str(
            "
group: 1
number: 1
name: Flower
type: switch
address: 100
channels:
  - number: 1
    name: Rotate
    settings:
      - { name: Forward Slow, value: 64 }
      - { name: Forward Medium, value: 80 }
      - { name: Reverse Slow, value: 192 }
  - { number: 2, name: Master }
  - { number: 3, name: Dimmer Invert }
  - number: 4
    name: Program
    settings:
      - { name: Chase, value: 30 }
  - { number: 5, name: Speed }
  - number: 6
    name: Gobo
    settings:
      - { number: 1, name: Open, value: 0 }
      - { number: 2, name: Dots, value: 40 }
states:
  - number: 1
    name: Spin
    master: 128
    settings:
      - { name: spin, channel: Rotate, value: Forward Slow }
      - { name: level, channel: \"2\", value: 255 }
      - { name: inverse, channel: Dimmer Invert, value: 255 }
      - { name: program, channel: Program, value: Chase }
      - { name: speed, channel: Speed, value: 12 }
      - { name: gobo, channel: Gobo, value: 0 }
      - { name: missing, channel: Laser, value: 1 }
",
        )
        .unwrap()
    }

    #[test]
    fn test_settings() {
        let f = fixture();
        let sink = RecordingSink::default();
        let mut overrides = Override::default();
        apply_settings(&f, &f.states[0], &mut overrides, &sink, false);
        assert_eq!(Some(64), sink.last(100));
        assert_eq!(Some(128), sink.last(101));
        assert_eq!(Some(127), sink.last(102));
        assert_eq!(Some(30), sink.last(103));
        assert_eq!(Some(12), sink.last(104));
        assert_eq!(Some(0), sink.last(105));
        assert_eq!(6, sink.take().len());
    }

    #[test]
    fn test_overrides_preempt_and_clear() {
        let f = fixture();
        let sink = RecordingSink::default();
        let mut overrides = Override {
            speed: Some(20),
            rotate_speed: Some(1),
            gobo: Some(2),
            shift: Some(3),
            ..Default::default()
        };
        apply_settings(&f, &f.states[0], &mut overrides, &sink, false);
        assert_eq!(Some(80), sink.last(100));
        assert_eq!(Some(255), sink.last(104));
        assert_eq!(Some(40), sink.last(105));
        // Shift has no channel here; it stays for a chase to pick up.
        assert_eq!(
            Override {
                shift: Some(3),
                ..Default::default()
            },
            overrides
        );

        apply_settings(&f, &f.states[0], &mut overrides, &sink, false);
        assert_eq!(Some(64), sink.last(100));
        assert_eq!(Some(12), sink.last(104));
    }

    #[test]
    fn test_blackout() {
        let f = fixture();
        let sink = RecordingSink::default();
        apply_settings(&f, &f.states[0], &mut Override::default(), &sink, true);
        assert!(sink.take().iter().all(|(_, v)| *v == 0));
    }

    #[test]
    fn test_rotate_value() {
        let f = fixture();
        let rotate = &f.channels[0];
        assert_eq!(Some(64), rotate_value(rotate, Rotate::Auto, RotateSpeed::Slow));
        assert_eq!(Some(192), rotate_value(rotate, Rotate::Reverse, RotateSpeed::Slow));
        assert_eq!(None, rotate_value(rotate, Rotate::Reverse, RotateSpeed::Fast));
        assert_eq!(Some(0), rotate_value(rotate, Rotate::Off, RotateSpeed::Fast));
    }
}
