use std::{io::stdin, path::PathBuf, thread};

use anyhow::{Result, anyhow};
use clap::{Args, Parser, Subcommand};
use crossbeam_channel::{bounded, unbounded};
use log::{LevelFilter, error, info, warn};
use rust_dmx::select_port;
use simplelog::{Config as LogConfig, SimpleLogger};
use strum_macros::Display;

use crate::{
    clock::SystemClock,
    config::{check_against, load_sequences},
    dmx::{DmxSink, FrameBuffer, OfflineSink, Renderer},
    error::DmxStatus,
    fixture::{Catalogue, shared},
    preset::PresetStore,
    preview::Previewer,
    receiver::Context,
    show::{Show, ShowCommand, ShowFiles},
    sound::{AudioInput, SoundBus},
    surface::LogRenderer,
};

mod clock;
mod color;
mod config;
mod console;
mod dmx;
mod error;
mod fixture;
mod mapper;
mod pattern;
mod preset;
mod preview;
mod receiver;
mod sequence;
mod show;
mod sound;
mod surface;
mod switch;

#[derive(Parser)]
#[command(about)]
struct Cli {
    /// If true, provide verbose logging.
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Display)]
#[strum(serialize_all = "lowercase")]
enum Command {
    /// Run the controller.
    Run(RunArgs),

    /// Check that the provided fixture file is valid, then quit.
    Check(CheckArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Path to a YAML file describing the fixtures.
    fixture_file: PathBuf,

    /// Path to a YAML file with the initial state of each sequence.
    sequence_file: PathBuf,

    /// Directory for presets, labels and the saved session.
    #[arg(long, default_value = "presets")]
    presets: PathBuf,

    /// Refuse to start if any fixtures overlap, instead of disabling them.
    #[arg(long)]
    strict: bool,

    /// Run without looking for a DMX interface.
    #[arg(long)]
    no_dmx: bool,

    /// Name of the audio input to trigger from; the default input if omitted.
    #[arg(long)]
    audio: Option<String>,

    /// Run without a sound trigger.
    #[arg(long)]
    no_audio: bool,

    /// Sound trigger sensitivity, 0-9.
    #[arg(long, default_value_t = sound::DEFAULT_GAIN)]
    gain: usize,

    /// If true, render fixture preview into the CLI.
    #[arg(long)]
    cli_preview: bool,
}

#[derive(Args)]
struct CheckArgs {
    /// Path to a YAML file describing the fixtures.
    fixture_file: PathBuf,

    /// Also check a sequence file against the fixtures.
    #[arg(long)]
    sequence_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Cli::try_parse()?;

    let log_level = if args.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    SimpleLogger::init(log_level, LogConfig::default())?;

    match args.command {
        Command::Run(args) => run_show(args),
        Command::Check(args) => check_fixtures(args),
    }
}

fn run_show(args: RunArgs) -> Result<()> {
    let catalogue = Catalogue::load(&args.fixture_file, args.strict)?;
    let states = load_sequences(&args.sequence_file)?;
    check_against(&states, &catalogue);

    let sound = SoundBus::new();
    sound.set_gain(args.gain);
    // The stream stops when this drops.
    let _audio = if args.no_audio {
        None
    } else {
        AudioInput::open(args.audio.as_deref(), sound.clone())
            .inspect_err(|err| warn!("Running without a sound trigger: {err:#}."))
            .ok()
    };

    let frame = FrameBuffer::new();
    let ctx = Context::new(shared(catalogue), frame.clone(), SystemClock::shared(), sound);

    let presets = PresetStore::new(&args.presets);
    let mut show = Show::new(
        ctx.clone(),
        states,
        ShowFiles {
            fixtures: Some(args.fixture_file),
            strict: args.strict,
            presets: presets.clone(),
        },
    )?;
    show.register_renderer(Box::new(LogRenderer));
    if let Some(session) = presets.load_session()? {
        info!("Restoring the last session.");
        show.load_states(session);
    }

    let (mut port, status) = open_dmx(args.no_dmx);

    let (commands_tx, commands) = unbounded();
    let signal_tx = commands_tx.clone();
    ctrlc::set_handler(move || {
        info!("Stopping on signal.");
        let _ = signal_tx.send(ShowCommand::Quit);
    })?;
    let console_tx = commands_tx.clone();
    thread::spawn(move || console::run(stdin().lock(), console_tx));

    let (stopped_tx, stopped) = bounded(1);
    let show_thread = thread::spawn(move || {
        let result = show.run_until_quit(&commands);
        let _ = stopped_tx.send(());
        result
    });

    println!("Running show. Type \"help\" for commands.");
    let previewer = if args.cli_preview {
        Previewer::terminal()
    } else {
        Previewer::Off
    };
    let renderer = Renderer::new(frame, status);
    let rendered = renderer.run(port.as_mut(), &stopped, |buffer| {
        previewer.frame(&ctx.catalogue.load(), buffer)
    });
    if rendered.is_err() {
        let _ = commands_tx.send(ShowCommand::Quit);
    }

    let shutdown = show_thread
        .join()
        .map_err(|_| anyhow!("show thread panicked"))?;
    if let Err(err) = &shutdown {
        error!("Saving the session failed: {err:#}");
    }
    // Push out the final dark frame.
    renderer.render_once(port.as_mut())?;
    rendered.and(shutdown)
}

fn open_dmx(no_dmx: bool) -> (Box<dyn DmxSink>, DmxStatus) {
    if no_dmx {
        return (Box::new(OfflineSink), DmxStatus::Absent);
    }
    match select_port(None) {
        Ok(port) => (Box::new(port), DmxStatus::Present),
        Err(err) => {
            warn!("Running without DMX output: {err}.");
            (Box::new(OfflineSink), DmxStatus::Absent)
        }
    }
}

fn check_fixtures(args: CheckArgs) -> Result<()> {
    let catalogue = Catalogue::load(&args.fixture_file, true)?;
    println!("{} fixtures OK.", catalogue.len());
    if let Some(path) = args.sequence_file {
        let states = load_sequences(&path)?;
        check_against(&states, &catalogue);
        println!("{} sequences OK.", states.len());
    }
    Ok(())
}
