use std::{path::PathBuf, sync::Arc};

use anyhow::{Result, anyhow, bail};
use crossbeam_channel::{Receiver, Sender, bounded, select};
use log::{error, info, warn};

use crate::{
    fixture::Catalogue,
    preset::{Labels, PresetStore},
    receiver::Context,
    sequence::{SequenceCommand, SequenceHandle, SequenceState, SequenceUpdate},
    surface::{ButtonEvent, ButtonRenderer, GridLayout, GridOutput},
};

/// Strongly-typed top-level show control messages.
#[derive(Debug, Clone)]
pub enum ShowCommand {
    /// A command for one sequence, by index.
    Sequence {
        sequence: usize,
        cmd: SequenceCommand,
    },
    /// A command for every sequence.
    All(SequenceCommand),
    SavePreset {
        x: usize,
        y: usize,
    },
    LoadPreset {
        x: usize,
        y: usize,
    },
    LabelPreset {
        x: usize,
        y: usize,
        label: String,
    },
    /// Re-read the fixture file and restart every sequence on it.
    ReloadFixtures,
    SetGain(usize),
    Press(ButtonEvent),
    Quit,
}

/// Where the show keeps the files it may reread or write.
pub struct ShowFiles {
    pub fixtures: Option<PathBuf>,
    /// Refuse overlapping fixtures on reload.
    pub strict: bool,
    pub presets: PresetStore,
}

pub struct Show {
    ctx: Context,
    files: ShowFiles,
    sequences: Vec<SequenceHandle>,
    updates_tx: Sender<SequenceUpdate>,
    updates: Receiver<SequenceUpdate>,
    layout: GridLayout,
    output: GridOutput,
    labels: Labels,
}

impl Show {
    pub fn new(ctx: Context, states: Vec<SequenceState>, files: ShowFiles) -> Result<Self> {
        let labels = files.presets.load_labels()?;
        let (updates_tx, updates) = bounded(256);
        let layout = GridLayout::new(states.clone(), &ctx.catalogue.load());
        let sequences = spawn_sequences(states, &ctx, &updates_tx);
        info!("Show started with {} sequences.", sequences.len());
        Ok(Self {
            ctx,
            files,
            sequences,
            updates_tx,
            updates,
            layout,
            output: GridOutput::default(),
            labels,
        })
    }

    /// Handle commands until told to quit or the command channel closes.
    pub fn run(&mut self, commands: &Receiver<ShowCommand>) {
        let updates = self.updates.clone();
        loop {
            select! {
                recv(commands) -> cmd => {
                    let Ok(cmd) = cmd else {
                        break;
                    };
                    match self.handle(cmd) {
                        Ok(true) => (),
                        Ok(false) => break,
                        Err(err) => error!("{err:#}"),
                    }
                }
                recv(updates) -> update => {
                    if let Ok(update) = update {
                        self.observe(&update);
                    }
                }
            }
        }
    }

    /// Run until quit, then save the session and stop everything.
    pub fn run_until_quit(mut self, commands: &Receiver<ShowCommand>) -> Result<()> {
        self.run(commands);
        self.shutdown()
    }

    /// Handle one command; false means quit.
    pub fn handle(&mut self, cmd: ShowCommand) -> Result<bool> {
        match cmd {
            ShowCommand::Sequence { sequence, cmd } => self.send(sequence, cmd)?,
            ShowCommand::All(cmd) => {
                for sequence in &self.sequences {
                    sequence.send(cmd.clone());
                }
            }
            ShowCommand::SavePreset { x, y } => self.save_preset(x, y)?,
            ShowCommand::LoadPreset { x, y } => self.load_preset(x, y)?,
            ShowCommand::LabelPreset { x, y, label } => {
                self.labels.set(format!("preset{x}.{y}"), label);
                self.files.presets.save_labels(&self.labels)?;
            }
            ShowCommand::ReloadFixtures => self.reload_catalogue()?,
            ShowCommand::SetGain(gain) => self.ctx.sound.set_gain(gain),
            ShowCommand::Press(event) => {
                for cmd in self.layout.handle(event) {
                    self.handle(cmd)?;
                }
            }
            ShowCommand::Quit => return Ok(false),
        }
        Ok(true)
    }

    pub fn send(&self, sequence: usize, cmd: SequenceCommand) -> Result<()> {
        let Some(handle) = self.sequences.get(sequence) else {
            bail!("sequence {} does not exist", sequence + 1);
        };
        handle.send(cmd);
        Ok(())
    }

    /// Attach something that draws the grid, and bring it up to date.
    pub fn register_renderer(&mut self, renderer: Box<dyn ButtonRenderer>) {
        self.output.register(renderer);
        for msg in self.layout.lamps() {
            self.output.send(&msg);
        }
    }

    fn observe(&mut self, update: &SequenceUpdate) {
        for msg in self.layout.observe(update) {
            self.output.send(&msg);
        }
    }

    /// The current state of every sequence.
    pub fn snapshot(&self) -> Result<Vec<SequenceState>> {
        self.sequences
            .iter()
            .enumerate()
            .map(|(i, s)| {
                s.read_config()
                    .ok_or_else(|| anyhow!("sequence {} did not report its state", i + 1))
            })
            .collect()
    }

    /// Hand saved states to the sequences they came from.
    pub fn load_states(&self, states: Vec<SequenceState>) {
        for state in states {
            match self.sequences.get(state.index()) {
                Some(handle) => handle.send(SequenceCommand::LoadConfig(Box::new(state))),
                None => warn!("Ignoring saved state for missing {}.", state.name()),
            }
        }
    }

    pub fn save_preset(&self, x: usize, y: usize) -> Result<()> {
        let states = self.snapshot()?;
        self.files.presets.save(x, y, &states)?;
        info!("Preset {} saved.", self.labels.preset(x, y));
        Ok(())
    }

    pub fn load_preset(&self, x: usize, y: usize) -> Result<()> {
        let states = self.files.presets.load(x, y)?;
        self.load_states(states);
        info!("Preset {} loaded.", self.labels.preset(x, y));
        Ok(())
    }

    /// Swap in a freshly loaded fixture file.
    ///
    /// A file that fails to load leaves the running show untouched.
    pub fn reload_catalogue(&mut self) -> Result<()> {
        let Some(path) = self.files.fixtures.as_deref() else {
            bail!("no fixture file to reload");
        };
        let catalogue = Catalogue::load(path, self.files.strict)?;
        let states = self.snapshot()?;
        self.stop_sequences();
        self.ctx.catalogue.store(Arc::new(catalogue));
        self.layout.update_catalogue(&self.ctx.catalogue.load());
        self.sequences = spawn_sequences(states, &self.ctx, &self.updates_tx);
        info!("Fixtures reloaded.");
        Ok(())
    }

    /// Go dark and stop every worker, leaving every output at zero.
    fn stop_sequences(&mut self) {
        for sequence in self.sequences.drain(..) {
            sequence.send(SequenceCommand::Stop);
            sequence.quit();
        }
    }

    /// Save the session and stop everything.
    pub fn shutdown(mut self) -> Result<()> {
        let saved = self
            .snapshot()
            .and_then(|states| self.files.presets.save_session(&states));
        self.stop_sequences();
        info!("Show stopped.");
        saved
    }
}

fn spawn_sequences(
    states: Vec<SequenceState>,
    ctx: &Context,
    updates: &Sender<SequenceUpdate>,
) -> Vec<SequenceHandle> {
    states
        .into_iter()
        .map(|state| SequenceHandle::spawn(state, ctx.clone(), updates.clone()))
        .collect()
}
