//! A line-oriented control console on stdin.
//!
//! Each line is one command; sequences, slots and grid coordinates are typed
//! from 1.
use std::io::BufRead;

use anyhow::{Context, Result, anyhow, bail, ensure};
use crossbeam_channel::Sender;
use log::{error, info};

use crate::{
    color::{Color, NamedColor},
    pattern::PatternName,
    sequence::{SequenceCommand, StaticColor},
    show::ShowCommand,
    surface::ButtonEvent,
    switch::Override,
};

pub const HELP: &str = "\
commands:
  start|stop <seq>            run or stop a sequence
  speed <seq> <0-20>          step speed
  color <seq> <name>...       pattern colours
  pattern <seq> <name>        pattern
  static <seq> on|off         static mode
  static-color <seq> <slot> <name>|off
  master <seq> <0-255>        sequence master
  flood|music <seq> on|off
  blackout | normal
  switch <seq> <slot> <position>
  override <seq> <slot> <field>=<value>...
  clear <seq> <slot>          drop a switch override
  reset <seq>                 every switch back to its first position
  press|hold <x> <y>          grid button
  save|load <x> <y>           presets
  label <x> <y> <text>        name a preset
  gain <0-9>                  sound trigger sensitivity
  reload                      re-read the fixture file
  quit";

/// Read commands until stdin closes or quit is typed.
pub fn run(input: impl BufRead, commands: Sender<ShowCommand>) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                error!("Console input error: {err}.");
                break;
            }
        };
        match parse(&line) {
            Ok(None) => (),
            Ok(Some(cmd)) => {
                let quit = matches!(cmd, ShowCommand::Quit);
                if commands.send(cmd).is_err() || quit {
                    return;
                }
            }
            Err(err) => {
                error!("{err:#}");
                info!("{HELP}");
            }
        }
    }
    let _ = commands.send(ShowCommand::Quit);
}

/// Parse one console line. Blank lines and comments parse to None.
pub fn parse(line: &str) -> Result<Option<ShowCommand>> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    if verb.starts_with('#') {
        return Ok(None);
    }
    let args: Vec<&str> = words.collect();
    let arg = |i: usize| {
        args.get(i)
            .copied()
            .ok_or_else(|| anyhow!("{verb}: missing argument {}", i + 1))
    };
    let seq = || index(arg(0)?).context("sequence");
    let on = |i| -> Result<bool> {
        match arg(i)?.to_ascii_lowercase().as_str() {
            "on" | "true" | "1" => Ok(true),
            "off" | "false" | "0" => Ok(false),
            other => bail!("{verb}: expected on or off, got \"{other}\""),
        }
    };
    let to = |sequence: usize, cmd: SequenceCommand| ShowCommand::Sequence { sequence, cmd };

    let cmd = match verb.to_ascii_lowercase().as_str() {
        "start" => to(seq()?, SequenceCommand::Start),
        "stop" => to(seq()?, SequenceCommand::Stop),
        "speed" => to(seq()?, SequenceCommand::UpdateSpeed(number(arg(1)?)?)),
        "color" | "colour" => {
            ensure!(args.len() > 1, "{verb}: name at least one colour");
            let colors = args[1..]
                .iter()
                .map(|name| Color::from_name(name))
                .collect::<Result<Vec<_>, _>>()?;
            to(seq()?, SequenceCommand::UpdateColors(colors))
        }
        "pattern" => to(
            seq()?,
            SequenceCommand::UpdatePattern(PatternName::lookup(arg(1)?)?),
        ),
        "static" => to(seq()?, SequenceCommand::UpdateStatic(on(1)?)),
        "static-color" | "static-colour" => {
            let slot = index(arg(1)?).context("slot")?;
            let color = match arg(2)? {
                off if off.eq_ignore_ascii_case("off") => StaticColor {
                    enabled: false,
                    ..Default::default()
                },
                name => StaticColor {
                    color: Color::from_name(name)?,
                    enabled: true,
                    flash: args.get(3).is_some_and(|f| f.eq_ignore_ascii_case("flash")),
                },
            };
            to(seq()?, SequenceCommand::UpdateStaticColor { slot, color })
        }
        "master" => to(seq()?, SequenceCommand::UpdateMaster(byte(arg(1)?)?)),
        "flood" => to(seq()?, SequenceCommand::Flood(on(1)?)),
        "music" => to(seq()?, SequenceCommand::MusicTrigger(on(1)?)),
        "blackout" => ShowCommand::All(SequenceCommand::Blackout),
        "normal" => ShowCommand::All(SequenceCommand::Normal),
        "switch" => to(
            seq()?,
            SequenceCommand::UpdateSwitch {
                slot: index(arg(1)?).context("slot")?,
                position: index(arg(2)?).context("position")?,
            },
        ),
        "override" => {
            ensure!(args.len() > 2, "{verb}: give at least one field=value");
            to(
                seq()?,
                SequenceCommand::OverrideSwitch {
                    slot: index(arg(1)?).context("slot")?,
                    overrides: parse_override(&args[2..])?,
                },
            )
        }
        "clear" => to(
            seq()?,
            SequenceCommand::ClearSwitchOverride {
                slot: index(arg(1)?).context("slot")?,
            },
        ),
        "reset" => to(seq()?, SequenceCommand::ResetAllSwitchPositions),
        "press" | "hold" => {
            let (x, y) = (index(arg(0)?)?, index(arg(1)?)?);
            ShowCommand::Press(if verb.eq_ignore_ascii_case("hold") {
                ButtonEvent::long_press(x, y)
            } else {
                ButtonEvent::press(x, y)
            })
        }
        "save" => ShowCommand::SavePreset {
            x: index(arg(0)?)?,
            y: index(arg(1)?)?,
        },
        "load" => ShowCommand::LoadPreset {
            x: index(arg(0)?)?,
            y: index(arg(1)?)?,
        },
        "label" => {
            ensure!(args.len() > 2, "{verb}: give a preset and a label");
            ShowCommand::LabelPreset {
                x: index(arg(0)?)?,
                y: index(arg(1)?)?,
                label: args[2..].join(" "),
            }
        }
        "gain" => ShowCommand::SetGain(number(arg(0)?)?),
        "reload" => ShowCommand::ReloadFixtures,
        "quit" | "exit" => ShowCommand::Quit,
        "help" => {
            info!("{HELP}");
            return Ok(None);
        }
        other => bail!("unknown command \"{other}\""),
    };
    Ok(Some(cmd))
}

/// Parse `field=value` pairs into a switch override.
fn parse_override(pairs: &[&str]) -> Result<Override> {
    let mut overrides = Override::default();
    for pair in pairs {
        let (field, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("override \"{pair}\" is not field=value"))?;
        let field = field.to_ascii_lowercase();
        if field == "color" || field == "colour" {
            let named: NamedColor = value
                .parse()
                .map_err(|_| anyhow!("unknown colour \"{value}\""))?;
            overrides.color = Some(named as usize);
            continue;
        }
        let value = Some(number(value)?);
        match field.as_str() {
            "speed" => overrides.speed = value,
            "shift" => overrides.shift = value,
            "size" => overrides.size = value,
            "fade" => overrides.fade = value,
            "rotate" => overrides.rotate_speed = value,
            "gobo" => overrides.gobo = value,
            other => bail!("unknown override field \"{other}\""),
        }
    }
    Ok(overrides)
}

fn number(s: &str) -> Result<usize> {
    s.parse()
        .with_context(|| format!("\"{s}\" is not a number"))
}

fn byte(s: &str) -> Result<u8> {
    s.parse()
        .with_context(|| format!("\"{s}\" is not a value from 0 to 255"))
}

/// A number typed from 1, returned as an index from 0.
fn index(s: &str) -> Result<usize> {
    let n = number(s)?;
    ensure!(n > 0, "numbering starts at 1");
    Ok(n - 1)
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use crossbeam_channel::unbounded;

    use super::*;

    fn assert_fail(line: &str, snippet: &str) {
        let Err(err) = parse(line) else {
            panic!("\"{line}\" parsed");
        };
        let msg = format!("{err:#}");
        assert!(
            msg.contains(snippet),
            "error message \"{msg}\" doesn't contain \"{snippet}\""
        );
    }

    fn sequence(line: &str) -> (usize, SequenceCommand) {
        match parse(line).unwrap() {
            Some(ShowCommand::Sequence { sequence, cmd }) => (sequence, cmd),
            other => panic!("{line}: {other:?}"),
        }
    }

    #[test]
    fn test_sequence_commands() {
        assert!(matches!(sequence("start 2"), (1, SequenceCommand::Start)));
        assert!(matches!(
            sequence("speed 1 12"),
            (0, SequenceCommand::UpdateSpeed(12))
        ));
        assert!(matches!(
            sequence("pattern 1 Circle"),
            (0, SequenceCommand::UpdatePattern(PatternName::Circle))
        ));
        let (_, SequenceCommand::UpdateColors(colors)) = sequence("color 1 red blue") else {
            panic!("expected colours");
        };
        assert_eq!(
            vec![NamedColor::Red.rgb(), NamedColor::Blue.rgb()],
            colors
        );
        assert!(matches!(
            sequence("switch 3 2 4"),
            (
                2,
                SequenceCommand::UpdateSwitch {
                    slot: 1,
                    position: 3
                }
            )
        ));
        let (_, SequenceCommand::UpdateStaticColor { slot, color }) =
            sequence("static-color 1 3 green flash")
        else {
            panic!("expected a static colour");
        };
        assert_eq!(2, slot);
        assert!(color.enabled && color.flash);
    }

    #[test]
    fn test_override() {
        let (_, SequenceCommand::OverrideSwitch { slot, overrides }) =
            sequence("override 3 1 speed=20 color=blue")
        else {
            panic!("expected an override");
        };
        assert_eq!(0, slot);
        assert_eq!(Some(20), overrides.speed);
        assert_eq!(Some(5), overrides.color);
        assert_eq!(None, overrides.gobo);
    }

    #[test]
    fn test_show_commands() {
        assert!(parse("").unwrap().is_none());
        assert!(parse("# comment").unwrap().is_none());
        assert!(matches!(
            parse("blackout").unwrap(),
            Some(ShowCommand::All(SequenceCommand::Blackout))
        ));
        assert!(matches!(
            parse("save 2 1").unwrap(),
            Some(ShowCommand::SavePreset { x: 1, y: 0 })
        ));
        let Some(ShowCommand::Press(event)) = parse("hold 1 3").unwrap() else {
            panic!("expected a press");
        };
        assert!(event.is_long());
        assert_eq!((0, 2), (event.column(), event.y));
        let Some(ShowCommand::LabelPreset { x, y, label }) = parse("label 1 1 Big Finish").unwrap()
        else {
            panic!("expected a label");
        };
        assert_eq!((0, 0, "Big Finish"), (x, y, label.as_str()));
    }

    #[test]
    fn test_errors() {
        assert_fail("frobnicate", "unknown command");
        assert_fail("start", "missing argument 1");
        assert_fail("start 0", "numbering starts at 1");
        assert_fail("speed 1 fast", "is not a number");
        assert_fail("static 1 maybe", "expected on or off");
        assert_fail("color 1 mauve", "not found");
        assert_fail("override 1 1 tempo=3", "unknown override field");
        assert_fail("master 1 300", "0 to 255");
    }

    #[test]
    fn test_run_sends_quit_at_end_of_input() {
        let (tx, rx) = unbounded();
        run(Cursor::new("start 1\nbogus\n\nstop 1\n"), tx);
        let cmds: Vec<_> = rx.try_iter().collect();
        assert_eq!(3, cmds.len());
        assert!(matches!(cmds[2], ShowCommand::Quit));
    }
}
