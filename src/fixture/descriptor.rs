//! Fixture descriptors as they appear in the fixture file.
use std::{fmt::Display, str::FromStr};

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum_macros::{Display, EnumIter, EnumString};

use crate::{color::NamedColor, error::NotFound};

/// The broad type of a fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FixtureKind {
    Rgb,
    Scanner,
    Switch,
    Projector,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureDescriptor {
    #[serde(default)]
    pub id: usize,
    /// The sequence this fixture belongs to, indexed from 1.
    pub group: usize,
    /// Position of this fixture within its sequence, indexed from 1.
    pub number: usize,
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: FixtureKind,
    /// Base DMX address, indexed from 1.
    #[serde(default)]
    pub address: usize,
    #[serde(default)]
    pub channels: Vec<Channel>,
    /// Switch positions.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub states: Vec<State>,
    /// For switches: the label of the fixture whose channels this switch drives.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_fixture: Option<String>,
    /// True if this descriptor covers several sub-fixtures (e.g. an 8-cell bar).
    #[serde(default, skip_serializing_if = "is_false")]
    pub multi_fixture: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_fixture_count: Option<usize>,
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl FixtureDescriptor {
    /// A name to show in reports and logs.
    pub fn display_name(&self) -> String {
        if self.name.trim().is_empty() {
            format!("fixture {}.{}", self.group, self.number)
        } else {
            self.name.clone()
        }
    }

    pub fn is_switch(&self) -> bool {
        self.kind == FixtureKind::Switch
    }

    /// One past the last DMX address this fixture occupies.
    pub fn end(&self) -> usize {
        self.address + self.channels.len()
    }

    /// The absolute DMX address of one of this fixture's channels.
    pub fn channel_address(&self, channel: &Channel) -> usize {
        self.address + channel.number.saturating_sub(1)
    }

    /// How many sequence slots this descriptor covers.
    pub fn sub_fixtures(&self) -> usize {
        if !self.multi_fixture {
            return 1;
        }
        self.sub_fixture_count
            .unwrap_or_else(|| {
                self.channels
                    .iter()
                    .filter(|c| matches!(c.role(), ChannelRole::Red(_)))
                    .count()
            })
            .max(1)
    }

    /// Capabilities derived from the channels present.
    pub fn capabilities(&self) -> Capabilities {
        self.channels
            .iter()
            .fold(Capabilities::empty(), |caps, c| caps | c.role().capability())
    }

    /// Find a channel by name, ignoring case.
    pub fn channel(&self, name: &str) -> Result<&Channel, NotFound> {
        self.channels
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| NotFound::new("channel", format!("{}/{name}", self.name)))
    }

    /// Find the first channel with the provided role.
    pub fn channel_with_role(&self, role: ChannelRole) -> Result<&Channel, NotFound> {
        self.channels
            .iter()
            .find(|c| c.role() == role)
            .ok_or_else(|| NotFound::new("channel", format!("{}/{role:?}", self.name)))
    }

    /// Find a channel by number.
    pub fn channel_by_number(&self, number: usize) -> Result<&Channel, NotFound> {
        self.channels
            .iter()
            .find(|c| c.number == number)
            .ok_or_else(|| NotFound::new("channel", format!("{}/{number}", self.name)))
    }

    /// The number of the channel with this name.
    pub fn channel_number(&self, name: &str) -> Result<usize, NotFound> {
        Ok(self.channel(name)?.number)
    }

    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.channels.iter().map(|c| c.name.as_str())
    }

    /// Look up a named setting on a named channel.
    pub fn setting(&self, channel: &str, setting: &str) -> Result<&Setting, NotFound> {
        self.channel(channel)?.setting(setting)
    }

    /// Resolve a named setting on a named channel to a DMX value.
    ///
    /// Range settings are resolved using the provided strobe speed.
    pub fn setting_value(
        &self,
        channel: &str,
        setting: &str,
        strobe_speed: u8,
    ) -> Result<u8, NotFound> {
        let s = self.setting(channel, setting)?;
        s.value
            .dmx(strobe_speed)
            .ok_or_else(|| NotFound::new("setting value", &s.value))
    }

    /// The DMX value that opens this fixture's shutter.
    pub fn shutter_open(&self) -> Result<u8, NotFound> {
        let shutter = self.channel_with_role(ChannelRole::Shutter)?;
        shutter.open_value()
    }

    /// Look up a gobo by name.
    pub fn gobo_by_name(&self, name: &str) -> Result<&Setting, NotFound> {
        self.channel_with_role(ChannelRole::Gobo)?.setting(name)
    }

    /// Look up a gobo by its setting number.
    pub fn gobo_by_number(&self, number: usize) -> Result<&Setting, NotFound> {
        self.channel_with_role(ChannelRole::Gobo)?
            .setting_by_number(number)
    }

    /// Look up a colour-wheel entry by colour name.
    pub fn color_by_name(&self, name: &str) -> Result<&Setting, NotFound> {
        self.channel_with_role(ChannelRole::Color)?.setting(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    /// Offset of this channel within the fixture, indexed from 1.
    pub number: usize,
    pub name: String,
    /// Static default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<u8>,
    /// Full travel of a pan or tilt channel, in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_degrees: Option<u16>,
    /// Fixed offset added to pan or tilt before scaling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<i16>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub settings: Vec<Setting>,
}

impl Channel {
    pub fn role(&self) -> ChannelRole {
        ChannelRole::from_name(&self.name)
    }

    /// Find a setting by name or label, ignoring case.
    pub fn setting(&self, name: &str) -> Result<&Setting, NotFound> {
        let name = name.trim();
        self.settings
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name) || s.label.eq_ignore_ascii_case(name))
            .ok_or_else(|| NotFound::new("setting", format!("{}/{name}", self.name)))
    }

    pub fn setting_by_number(&self, number: usize) -> Result<&Setting, NotFound> {
        self.settings
            .iter()
            .find(|s| s.number == number)
            .ok_or_else(|| NotFound::new("setting", format!("{}/{number}", self.name)))
    }

    /// The "On" or "Open" setting of this channel, if it has one.
    pub fn open_value(&self) -> Result<u8, NotFound> {
        self.settings
            .iter()
            .find(|s| {
                let n = s.name.to_ascii_lowercase();
                n == "on" || n == "open" || n.starts_with("open")
            })
            .and_then(|s| s.value.low())
            .ok_or_else(|| NotFound::new("setting", format!("{}/Open", self.name)))
    }
}

/// What a channel does, derived from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelRole {
    Pan,
    Tilt,
    Shutter,
    Rotate,
    Music,
    Program,
    ProgramSpeed,
    Speed,
    Gobo,
    Color,
    Strobe,
    Master { reverse: bool },
    Static,
    Red(usize),
    Green(usize),
    Blue(usize),
    Other,
}

impl ChannelRole {
    pub fn from_name(name: &str) -> Self {
        let n: String = name
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        for (prefix, ctor) in [
            ("red", Self::Red as fn(usize) -> Self),
            ("green", Self::Green),
            ("blue", Self::Blue),
        ] {
            if let Some(rest) = n.strip_prefix(prefix) {
                if rest.is_empty() {
                    return ctor(1);
                }
                if let Ok(sub) = rest.parse::<usize>() {
                    return ctor(sub);
                }
            }
        }
        let reverse = n.contains("reverse") || n.contains("invert");
        if n.contains("master") || n.contains("dimmer") {
            return Self::Master { reverse };
        }
        if n.starts_with("pan") {
            return Self::Pan;
        }
        if n.starts_with("tilt") {
            return Self::Tilt;
        }
        if n.starts_with("shutter") {
            return Self::Shutter;
        }
        if n.starts_with("rotat") {
            return Self::Rotate;
        }
        if n.starts_with("music") {
            return Self::Music;
        }
        if n.starts_with("programspeed") {
            return Self::ProgramSpeed;
        }
        if n.starts_with("program") {
            return Self::Program;
        }
        if n.starts_with("gobo") {
            return Self::Gobo;
        }
        if n.starts_with("colo") {
            return Self::Color;
        }
        if n.starts_with("strobe") {
            return Self::Strobe;
        }
        if n.starts_with("static") {
            return Self::Static;
        }
        if n.starts_with("speed") {
            return Self::Speed;
        }
        Self::Other
    }

    fn capability(self) -> Capabilities {
        match self {
            Self::Pan => Capabilities::PAN,
            Self::Tilt => Capabilities::TILT,
            Self::Shutter => Capabilities::SHUTTER,
            Self::Rotate => Capabilities::ROTATE,
            Self::Program | Self::ProgramSpeed => Capabilities::PROGRAM,
            Self::Gobo => Capabilities::GOBO,
            Self::Color => Capabilities::COLOR_WHEEL,
            Self::Strobe => Capabilities::STROBE,
            Self::Master { .. } => Capabilities::MASTER,
            Self::Red(_) | Self::Green(_) | Self::Blue(_) => Capabilities::RGB,
            _ => Capabilities::empty(),
        }
    }
}

bitflags! {
    /// Capabilities of a fixture, derived from which channels it has.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Capabilities: u16 {
        const ROTATE = 1;
        const GOBO = 1 << 1;
        const COLOR_WHEEL = 1 << 2;
        const MASTER = 1 << 3;
        const RGB = 1 << 4;
        const PAN = 1 << 5;
        const TILT = 1 << 6;
        const SHUTTER = 1 << 7;
        const PROGRAM = 1 << 8;
        const STROBE = 1 << 9;
    }
}

/// A named discrete value for a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    #[serde(default)]
    pub number: usize,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label: String,
    /// For switch state settings: the channel to write, by name or number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    pub value: SettingValue,
}

/// The value of a setting: a single DMX value, a strobe-speed band, or the
/// name of a setting defined on the target channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    Single(u8),
    Range(u8, u8),
    Named(String),
}

impl SettingValue {
    /// Resolve to a DMX value.
    ///
    /// A range "L-H" is interpreted as L + (strobe_speed/255)*(H-L), rounded.
    pub fn dmx(&self, strobe_speed: u8) -> Option<u8> {
        match self {
            Self::Single(v) => Some(*v),
            Self::Range(low, high) => {
                let span = *high as f64 - *low as f64;
                let v = *low as f64 + (strobe_speed as f64 / 255.) * span;
                Some(v.round().clamp(0., 255.) as u8)
            }
            Self::Named(_) => None,
        }
    }

    /// The bottom of the value, for contexts without a speed.
    pub fn low(&self) -> Option<u8> {
        match self {
            Self::Single(v) | Self::Range(v, _) => Some(*v),
            Self::Named(_) => None,
        }
    }
}

impl FromStr for SettingValue {
    type Err = std::convert::Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(v) = s.parse::<u8>() {
            return Ok(Self::Single(v));
        }
        if let Some((low, high)) = s.split_once('-') {
            if let (Ok(low), Ok(high)) = (low.trim().parse(), high.trim().parse()) {
                return Ok(Self::Range(low, high));
            }
        }
        Ok(Self::Named(s.to_string()))
    }
}

impl Display for SettingValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(v) => write!(f, "{v}"),
            Self::Range(low, high) => write!(f, "{low}-{high}"),
            Self::Named(n) => f.write_str(n),
        }
    }
}

impl Serialize for SettingValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Single(v) => serializer.serialize_u8(*v),
            other => serializer.serialize_str(&other.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for SettingValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(u64),
            Str(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Int(v) => u8::try_from(v)
                .map(Self::Single)
                .map_err(|_| serde::de::Error::custom(format!("DMX value {v} out of range"))),
            Raw::Str(s) => Ok(s.parse().unwrap_or_else(|never| match never {})),
        }
    }
}

/// One position of a switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub number: usize,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub button_color: String,
    #[serde(default = "full")]
    pub master: u8,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Action>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub settings: Vec<Setting>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub flash: bool,
}

const fn full() -> u8 {
    255
}

/// What a switch position does with its fixture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    #[serde(default)]
    pub number: usize,
    #[serde(default)]
    pub name: String,
    pub mode: ActionMode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub colors: Vec<String>,
    /// On: the chase colours are mapped onto the fixture. Off: only the master
    /// channel follows the chase.
    #[serde(default)]
    pub map: Toggle,
    #[serde(default)]
    pub fade: ActionFade,
    #[serde(default)]
    pub size: ActionSize,
    #[serde(default)]
    pub speed: ActionSpeed,
    #[serde(default)]
    pub rotate: Rotate,
    #[serde(default)]
    pub rotate_speed: RotateSpeed,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_speed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strobe: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gobo: Option<String>,
    /// How often a chase advances the gobo. None keeps the gobo fixed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gobo_speed: Option<ActionSpeed>,
}

impl Action {
    /// The action's colours, looked up in the named color table.
    ///
    /// Unknown names are skipped; an empty result falls back to white.
    pub fn rgb_colors(&self) -> Vec<crate::color::Color> {
        let colors: Vec<_> = self
            .colors
            .iter()
            .filter_map(|name| match crate::color::Color::from_name(name) {
                Ok(c) => Some(c),
                Err(err) => {
                    log::warn!("Action {}: {err}, skipping.", self.name);
                    None
                }
            })
            .collect();
        if colors.is_empty() {
            return vec![NamedColor::White.rgb()];
        }
        colors
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum ActionMode {
    #[default]
    None,
    Off,
    Static,
    Chase,
    Control,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum Toggle {
    #[default]
    Off,
    On,
}

impl Toggle {
    pub fn is_on(self) -> bool {
        self == Self::On
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum ActionFade {
    Off,
    Soft,
    #[default]
    Normal,
    Sharp,
}

impl ActionFade {
    /// Index into the fade-time table for this fade.
    pub fn fade_time_ordinal(self) -> usize {
        match self {
            Self::Soft => 2,
            Self::Normal => 6,
            Self::Sharp => 10,
            Self::Off => 12,
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum ActionSize {
    Off,
    Short,
    #[default]
    Medium,
    Long,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum ActionSpeed {
    Slow,
    #[default]
    Medium,
    Fast,
    VeryFast,
    Music,
}

impl ActionSpeed {
    /// Index into the speed table, or None if the chase follows the music.
    pub fn speed_ordinal(self) -> Option<usize> {
        match self {
            Self::Slow => Some(4),
            Self::Medium => Some(7),
            Self::Fast => Some(10),
            Self::VeryFast => Some(13),
            Self::Music => None,
        }
    }

    /// How many chase steps pass between gobo changes.
    pub fn steps_per_change(self) -> usize {
        match self {
            Self::Slow => 8,
            Self::Medium => 4,
            Self::Fast => 2,
            Self::VeryFast | Self::Music => 1,
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum Rotate {
    #[default]
    Off,
    Forward,
    Reverse,
    Auto,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum RotateSpeed {
    #[default]
    Slow,
    Medium,
    Fast,
}

impl RotateSpeed {
    /// Rotate speeds are overridden by index.
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => Self::Slow,
            1 => Self::Medium,
            _ => Self::Fast,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_channel_roles() {
        assert_eq!(ChannelRole::Red(1), ChannelRole::from_name("Red"));
        assert_eq!(ChannelRole::Red(3), ChannelRole::from_name("Red3"));
        assert_eq!(ChannelRole::Blue(12), ChannelRole::from_name("Blue 12"));
        assert_eq!(
            ChannelRole::Master { reverse: false },
            ChannelRole::from_name("Master")
        );
        assert_eq!(
            ChannelRole::Master { reverse: true },
            ChannelRole::from_name("Dimmer Reverse")
        );
        assert_eq!(
            ChannelRole::Master { reverse: true },
            ChannelRole::from_name("InvertMaster")
        );
        assert_eq!(ChannelRole::ProgramSpeed, ChannelRole::from_name("Program Speed"));
        assert_eq!(ChannelRole::Program, ChannelRole::from_name("Program"));
        assert_eq!(ChannelRole::Color, ChannelRole::from_name("Colour"));
        assert_eq!(ChannelRole::Rotate, ChannelRole::from_name("Rotation"));
        assert_eq!(ChannelRole::Other, ChannelRole::from_name("Reddish"));
        assert_eq!(ChannelRole::Other, ChannelRole::from_name("Fan"));
    }

    #[test]
    fn test_setting_values() {
        assert_eq!(SettingValue::Single(64), "64".parse().unwrap());
        assert_eq!(SettingValue::Range(10, 100), "10-100".parse().unwrap());
        assert_eq!(
            SettingValue::Named("Forward Slow".to_string()),
            "Forward Slow".parse().unwrap()
        );
        let band = SettingValue::Range(10, 100);
        assert_eq!(Some(10), band.dmx(0));
        assert_eq!(Some(100), band.dmx(255));
        // 10 + (128/255)*90 = 55.18
        assert_eq!(Some(55), band.dmx(128));
        assert_eq!(None, SettingValue::Named("x".to_string()).dmx(0));
    }

    #[test]
    fn test_setting_value_yaml() {
        let settings: Vec<Setting> = serde_yaml::from_str(
            "
- name: Open
  value: 255
- name: Strobe
  value: \"10-100\"
- name: Spin
  value: Forward Slow
",
        )
        .unwrap();
        assert_eq!(SettingValue::Single(255), settings[0].value);
        assert_eq!(SettingValue::Range(10, 100), settings[1].value);
        assert_eq!(
            SettingValue::Named("Forward Slow".to_string()),
            settings[2].value
        );
        let text = serde_yaml::to_string(&settings).unwrap();
        let back: Vec<Setting> = serde_yaml::from_str(&text).unwrap();
        assert_eq!(settings, back);
        assert!(serde_yaml::from_str::<Setting>("name: x\nvalue: 300").is_err());
    }

    #[test]
    fn test_capabilities_and_lookups() {
        let fixture: FixtureDescriptor = serde_yaml::from_str(
            "
group: 3
number: 1
name: Scanner 1
type: scanner
address: 10
channels:
  - { number: 1, name: Pan, max_degrees: 540 }
  - { number: 2, name: Tilt }
  - number: 3
    name: Shutter
    settings:
      - { number: 1, name: Closed, value: 0 }
      - { number: 2, name: Open, value: 255 }
      - { number: 3, name: Strobe, value: \"10-100\" }
  - number: 4
    name: Gobo
    settings:
      - { number: 1, name: Open, value: 0 }
      - { number: 2, name: Star, value: 16 }
  - number: 5
    name: Color
    settings:
      - { number: 1, name: White, value: 0 }
      - { number: 2, name: Red, value: 20 }
",
        )
        .unwrap();
        let caps = fixture.capabilities();
        assert!(caps.contains(Capabilities::PAN | Capabilities::TILT | Capabilities::GOBO));
        assert!(caps.contains(Capabilities::COLOR_WHEEL | Capabilities::SHUTTER));
        assert!(!caps.contains(Capabilities::RGB));
        assert_eq!(5, fixture.channel_number("color").unwrap());
        assert_eq!(255, fixture.shutter_open().unwrap());
        assert_eq!(16, fixture.gobo_by_name("star").unwrap().value.low().unwrap());
        assert_eq!("Star", fixture.gobo_by_number(2).unwrap().name);
        assert_eq!(20, fixture.setting_value("Color", "Red", 0).unwrap());
        assert_eq!(100, fixture.setting_value("Shutter", "Strobe", 255).unwrap());
        assert_eq!(
            Err(NotFound::new("setting", "Color/Blue")),
            fixture.color_by_name("Blue").map(|_| ())
        );
        assert!(fixture.channel("Rotate").is_err());
        assert_eq!(14, fixture.end() - 1);
        assert_eq!(1, fixture.sub_fixtures());
    }

    #[test]
    fn test_sub_fixture_count() {
        let fixture: FixtureDescriptor = serde_yaml::from_str(
            "
group: 1
number: 1
name: Bar
type: rgb
address: 1
multi_fixture: true
channels:
  - { number: 1, name: Red1 }
  - { number: 2, name: Green1 }
  - { number: 3, name: Blue1 }
  - { number: 4, name: Red2 }
  - { number: 5, name: Green2 }
  - { number: 6, name: Blue2 }
",
        )
        .unwrap();
        assert_eq!(2, fixture.sub_fixtures());
    }
}
