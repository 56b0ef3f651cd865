//! Translate one logical fixture update into DMX channel writes.
use std::{collections::HashSet, sync::LazyLock};

use log::warn;
use parking_lot::Mutex;

use crate::{
    color::{Color, LastColor, scale},
    dmx::ChannelSink,
    error::NotFound,
    fixture::{Capabilities, Catalogue, Channel, ChannelRole, FixtureDescriptor},
};

/// Everything a fixture can be told to do in one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureUpdate {
    /// Sequence index, from 0.
    pub sequence: usize,
    /// Slot within the sequence, from 0.
    pub slot: usize,
    pub color: Color,
    pub pan: u8,
    pub tilt: u8,
    pub shutter: u8,
    /// None leaves the rotate channel to a rotation worker.
    pub rotate: Option<u8>,
    pub music: u8,
    pub program: u8,
    pub program_speed: u8,
    /// Gobo setting number.
    pub gobo: usize,
    /// Colour-wheel setting index, overriding lookup by colour name.
    pub scanner_color: Option<usize>,
    pub master: u8,
    pub brightness: u8,
    pub strobe: bool,
    pub strobe_speed: u8,
    pub blackout: bool,
    /// Only write master channels, scaled by brightness.
    pub master_only: bool,
}

impl Default for FixtureUpdate {
    fn default() -> Self {
        Self {
            sequence: 0,
            slot: 0,
            color: Color::BLACK,
            pan: 128,
            tilt: 128,
            shutter: 255,
            rotate: Some(0),
            music: 0,
            program: 0,
            program_speed: 0,
            gobo: 1,
            scanner_color: None,
            master: 255,
            brightness: 255,
            strobe: false,
            strobe_speed: 0,
            blackout: false,
            master_only: false,
        }
    }
}

impl FixtureUpdate {
    /// The same fixture, rendered dark.
    pub fn dark(&self) -> Self {
        Self {
            blackout: true,
            ..self.clone()
        }
    }
}

/// Resolve the descriptor for the update's slot and render it.
pub fn map_fixture(
    catalogue: &Catalogue,
    sink: &dyn ChannelSink,
    update: &FixtureUpdate,
) -> Result<Option<LastColor>, NotFound> {
    let (fixture, sub) = catalogue.by_slot(update.sequence, update.slot)?;
    Ok(map_descriptor(fixture, sub, sink, update))
}

/// Render an update onto one (sub-)fixture of a descriptor.
///
/// Returns the colour rendered, or None if the fixture is dark.
pub fn map_descriptor(
    fixture: &FixtureDescriptor,
    sub: usize,
    sink: &dyn ChannelSink,
    update: &FixtureUpdate,
) -> Option<LastColor> {
    let channels = fixture
        .channels
        .iter()
        .filter(|c| owns_channel(fixture, sub, c));

    if update.blackout {
        for channel in channels {
            sink.set_channel(fixture.channel_address(channel), 0);
        }
        return None;
    }

    if update.master_only {
        let level = scale(update.master, update.brightness);
        for channel in channels {
            if let ChannelRole::Master { reverse } = channel.role() {
                sink.set_channel(fixture.channel_address(channel), reversed(level, reverse));
            }
        }
        return (level > 0).then(|| LastColor::rgb(update.color));
    }

    let caps = fixture.capabilities();
    // Without a master channel the master scales the colour itself.
    let brightness = if caps.contains(Capabilities::MASTER) {
        update.brightness
    } else {
        scale(update.brightness, update.master)
    };
    let rgb = update.color.scaled(brightness);
    let mut scanner_color = None;

    for channel in channels {
        let addr = fixture.channel_address(channel);
        let value = match channel.role() {
            ChannelRole::Pan => Some(limit_dmx(channel.max_degrees, offset(update.pan, channel))),
            ChannelRole::Tilt => {
                Some(limit_dmx(channel.max_degrees, offset(update.tilt, channel)))
            }
            ChannelRole::Shutter => Some(shutter(fixture, channel, update)),
            ChannelRole::Rotate => update.rotate,
            ChannelRole::Music => Some(update.music),
            ChannelRole::Program => Some(update.program),
            ChannelRole::ProgramSpeed => Some(update.program_speed),
            ChannelRole::Gobo => gobo(fixture, channel, update.gobo),
            ChannelRole::Color if !caps.contains(Capabilities::RGB) => {
                color_wheel(fixture, channel, update).map(|(index, value)| {
                    scanner_color = Some(index);
                    value
                })
            }
            ChannelRole::Strobe => Some(if update.strobe { update.strobe_speed } else { 0 }),
            ChannelRole::Master { reverse } => Some(reversed(update.master, reverse)),
            ChannelRole::Static => channel.value,
            ChannelRole::Red(_) => Some(rgb.r),
            ChannelRole::Green(_) => Some(rgb.g),
            ChannelRole::Blue(_) => Some(rgb.b),
            ChannelRole::Color | ChannelRole::Speed | ChannelRole::Other => None,
        };
        if let Some(value) = value {
            sink.set_channel(addr, value);
        }
    }

    if update.master == 0 || update.brightness == 0 {
        return None;
    }
    if caps.contains(Capabilities::RGB) {
        return (!update.color.is_black()).then(|| LastColor::rgb(update.color));
    }
    Some(LastColor {
        rgb: update.color,
        scanner_color,
    })
}

/// Channels shared by every sub-fixture are owned by all of them; the RGB
/// channels of a multi-fixture belong to one sub-fixture each.
pub(crate) fn owns_channel(fixture: &FixtureDescriptor, sub: usize, channel: &Channel) -> bool {
    if !fixture.multi_fixture {
        return true;
    }
    match channel.role() {
        ChannelRole::Red(n) | ChannelRole::Green(n) | ChannelRole::Blue(n) => n == sub + 1,
        _ => true,
    }
}

/// Scale a 0-255 value meaning 0-360 degrees onto a channel whose full travel
/// is `max_degrees`, so a full sweep never exceeds the fixture's range.
pub fn limit_dmx(max_degrees: Option<u16>, value: u8) -> u8 {
    match max_degrees {
        Some(max) if max > 0 => {
            let scaled = (value as f64 * 360. / max as f64).round();
            scaled.min(255.) as u8
        }
        _ => value,
    }
}

fn offset(value: u8, channel: &Channel) -> u8 {
    let offset = channel.offset.unwrap_or_default() as i32;
    (value as i32 + offset).clamp(0, 255) as u8
}

fn reversed(value: u8, reverse: bool) -> u8 {
    if reverse { 255 - value } else { value }
}

fn shutter(fixture: &FixtureDescriptor, channel: &Channel, update: &FixtureUpdate) -> u8 {
    if channel.settings.is_empty() {
        return update.shutter;
    }
    let found = if update.strobe {
        channel
            .settings
            .iter()
            .find(|s| s.name.to_ascii_lowercase().starts_with("strobe"))
            .and_then(|s| s.value.dmx(update.strobe_speed))
            .ok_or_else(|| NotFound::new("setting", format!("{}/Strobe", channel.name)))
    } else {
        channel.open_value()
    };
    found.unwrap_or_else(|err| {
        warn_once(fixture, &err);
        update.shutter
    })
}

fn gobo(fixture: &FixtureDescriptor, channel: &Channel, number: usize) -> Option<u8> {
    if channel.settings.is_empty() {
        return u8::try_from(number).ok();
    }
    let setting = channel.setting_by_number(number).unwrap_or_else(|err| {
        warn_once(fixture, &err);
        &channel.settings[0]
    });
    setting.value.low()
}

/// Pick a colour-wheel slot by index, or failing that by colour name.
fn color_wheel(
    fixture: &FixtureDescriptor,
    channel: &Channel,
    update: &FixtureUpdate,
) -> Option<(usize, u8)> {
    if channel.settings.is_empty() {
        return None;
    }
    let index = match update.scanner_color {
        Some(index) if index < channel.settings.len() => Ok(index),
        Some(index) => Err(NotFound::new("colour wheel index", index)),
        None => match update.color.name() {
            Some(name) => channel
                .settings
                .iter()
                .position(|s| s.name.eq_ignore_ascii_case(&name.to_string()))
                .ok_or_else(|| NotFound::new("colour", name)),
            None => Err(NotFound::new("colour", format!("{:?}", update.color.rgb()))),
        },
    };
    let index = index.unwrap_or_else(|err| {
        warn_once(fixture, &err);
        0
    });
    Some((index, channel.settings[index].value.low()?))
}

/// Log a lookup failure the first time it happens for a fixture.
fn warn_once(fixture: &FixtureDescriptor, err: &NotFound) {
    static WARNED: LazyLock<Mutex<HashSet<String>>> = LazyLock::new(Default::default);
    let key = format!("{}: {err}", fixture.display_name());
    if WARNED.lock().insert(key.clone()) {
        warn!("{key}; using a fallback.");
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{color::NamedColor, dmx::mock::RecordingSink};

    fn fixture(yaml: &str) -> FixtureDescriptor {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn par() -> FixtureDescriptor {
        fixture(
            "
group: 1
number: 1
name: Par
type: rgb
address: 1
channels:
  - { number: 1, name: Red1 }
  - { number: 2, name: Green1 }
  - { number: 3, name: Blue1 }
",
        )
    }

    fn scanner() -> FixtureDescriptor {
        fixture(
            "
group: 2
number: 1
name: Scanner
type: scanner
address: 20
channels:
  - { number: 1, name: Pan, max_degrees: 540 }
  - { number: 2, name: Tilt, offset: 10 }
  - number: 3
    name: Shutter
    settings:
      - { name: Closed, value: 0 }
      - { name: Open, value: 250 }
      - { name: Strobe, value: \"10-100\" }
  - number: 4
    name: Gobo
    settings:
      - { number: 1, name: Open, value: 0 }
      - { number: 2, name: Star, value: 16 }
  - number: 5
    name: Color
    settings:
      - { name: White, value: 0 }
      - { name: Red, value: 20 }
      - { name: Blue, value: 40 }
  - { number: 6, name: Dimmer Reverse }
  - { number: 7, name: Static, value: 200 }
  - { number: 8, name: Strobe }
",
        )
    }

    fn red() -> FixtureUpdate {
        FixtureUpdate {
            color: NamedColor::Red.rgb(),
            ..Default::default()
        }
    }

    #[test]
    fn test_static_red() {
        let sink = RecordingSink::default();
        let last = map_descriptor(&par(), 0, &sink, &red());
        assert_eq!(vec![(1, 255), (2, 0), (3, 0)], sink.take());
        assert_eq!(Some(LastColor::rgb(NamedColor::Red.rgb())), last);
    }

    #[test]
    fn test_master_scales_rgb_without_master_channel() {
        let sink = RecordingSink::default();
        map_descriptor(
            &par(),
            0,
            &sink,
            &FixtureUpdate {
                master: 128,
                ..red()
            },
        );
        assert_eq!(Some(128), sink.last(1));
    }

    #[test]
    fn test_blackout_writes_zero_everywhere() {
        let sink = RecordingSink::default();
        let update = FixtureUpdate {
            blackout: true,
            strobe: true,
            strobe_speed: 200,
            ..red()
        };
        assert_eq!(None, map_descriptor(&scanner(), 0, &sink, &update));
        assert_eq!(None, map_descriptor(&par(), 0, &sink, &update));
        let writes = sink.take();
        assert_eq!(11, writes.len());
        assert!(writes.iter().all(|(_, v)| *v == 0));
    }

    #[test]
    fn test_scanner_channels() {
        let sink = RecordingSink::default();
        let last = map_descriptor(
            &scanner(),
            0,
            &sink,
            &FixtureUpdate {
                pan: 255,
                tilt: 100,
                gobo: 2,
                master: 55,
                color: NamedColor::Blue.rgb(),
                ..Default::default()
            },
        );
        assert_eq!(Some(170), sink.last(20));
        // (100 + 10) with no travel limit.
        assert_eq!(Some(110), sink.last(21));
        assert_eq!(Some(250), sink.last(22));
        assert_eq!(Some(16), sink.last(23));
        assert_eq!(Some(40), sink.last(24));
        assert_eq!(Some(200), sink.last(25));
        assert_eq!(Some(200), sink.last(26));
        assert_eq!(Some(0), sink.last(27));
        assert_eq!(Some(2), last.and_then(|l| l.scanner_color));
    }

    #[test]
    fn test_strobe_uses_speed_band() {
        let sink = RecordingSink::default();
        map_descriptor(
            &scanner(),
            0,
            &sink,
            &FixtureUpdate {
                strobe: true,
                strobe_speed: 255,
                scanner_color: Some(1),
                ..Default::default()
            },
        );
        assert_eq!(Some(100), sink.last(22));
        assert_eq!(Some(20), sink.last(24));
        assert_eq!(Some(255), sink.last(27));
    }

    #[test]
    fn test_fallbacks() {
        let sink = RecordingSink::default();
        map_descriptor(
            &scanner(),
            0,
            &sink,
            &FixtureUpdate {
                gobo: 9,
                color: NamedColor::Pink.rgb(),
                ..Default::default()
            },
        );
        assert_eq!(Some(0), sink.last(23));
        assert_eq!(Some(0), sink.last(24));
    }

    #[test]
    fn test_limit_dmx() {
        assert_eq!(255, limit_dmx(Some(360), 255));
        assert_eq!(170, limit_dmx(Some(540), 255));
        assert_eq!(255, limit_dmx(Some(180), 200));
        assert_eq!(100, limit_dmx(Some(180), 50));
        assert_eq!(77, limit_dmx(None, 77));
    }

    #[test]
    fn test_multi_fixture_writes_own_cells() {
        let bar = fixture(
            "
group: 1
number: 1
name: Bar
type: rgb
address: 10
multi_fixture: true
channels:
  - { number: 1, name: Red1 }
  - { number: 2, name: Green1 }
  - { number: 3, name: Blue1 }
  - { number: 4, name: Red2 }
  - { number: 5, name: Green2 }
  - { number: 6, name: Blue2 }
  - { number: 7, name: Master }
",
        );
        let sink = RecordingSink::default();
        map_descriptor(
            &bar,
            1,
            &sink,
            &FixtureUpdate {
                color: NamedColor::Blue.rgb(),
                master: 200,
                brightness: 128,
                ..Default::default()
            },
        );
        assert_eq!(vec![(13, 0), (14, 0), (15, 128), (16, 200)], sink.take());
    }

    #[test]
    fn test_master_only() {
        let sink = RecordingSink::default();
        let last = map_descriptor(
            &scanner(),
            0,
            &sink,
            &FixtureUpdate {
                master_only: true,
                master: 255,
                brightness: 0,
                ..red()
            },
        );
        assert_eq!(vec![(25, 255)], sink.take());
        assert_eq!(None, last);
    }

    #[test]
    fn test_map_fixture_by_slot() -> anyhow::Result<()> {
        let catalogue = Catalogue::new(vec![par()]);
        let sink = RecordingSink::default();
        map_fixture(&catalogue, &sink, &red())?;
        assert_eq!(Some(255), sink.last(1));
        assert!(
            map_fixture(
                &catalogue,
                &sink,
                &FixtureUpdate {
                    slot: 4,
                    ..red()
                }
            )
            .is_err()
        );
        Ok(())
    }
}
