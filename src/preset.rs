//! Saved snapshots of every sequence's state.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;
use ordermap::OrderMap;
use serde::{Serialize, de::DeserializeOwned};

use crate::sequence::SequenceState;

const SESSION_FILE: &str = "session.yaml";
const LABELS_FILE: &str = "labels.yaml";

/// Presets live as YAML files in one directory, named by grid coordinate.
#[derive(Debug, Clone)]
pub struct PresetStore {
    dir: PathBuf,
}

impl PresetStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the preset saved from a grid button; coordinates from 0.
    pub fn preset_path(&self, x: usize, y: usize) -> PathBuf {
        self.dir.join(format!("config{x}.{y}.yaml"))
    }

    pub fn exists(&self, x: usize, y: usize) -> bool {
        self.preset_path(x, y).is_file()
    }

    pub fn save(&self, x: usize, y: usize, states: &[SequenceState]) -> Result<()> {
        write_yaml(&self.preset_path(x, y), &states)?;
        info!("Saved preset {x}.{y}.");
        Ok(())
    }

    pub fn load(&self, x: usize, y: usize) -> Result<Vec<SequenceState>> {
        read_yaml(&self.preset_path(x, y)).with_context(|| format!("loading preset {x}.{y}"))
    }

    pub fn save_session(&self, states: &[SequenceState]) -> Result<()> {
        write_yaml(&self.dir.join(SESSION_FILE), &states)
    }

    /// The state saved at the last shutdown, if there was one.
    pub fn load_session(&self) -> Result<Option<Vec<SequenceState>>> {
        let path = self.dir.join(SESSION_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        read_yaml(&path).map(Some).context("restoring the last session")
    }

    pub fn load_labels(&self) -> Result<Labels> {
        let path = self.dir.join(LABELS_FILE);
        if !path.is_file() {
            return Ok(Labels::default());
        }
        read_yaml(&path).map(Labels)
    }

    pub fn save_labels(&self, labels: &Labels) -> Result<()> {
        write_yaml(&self.dir.join(LABELS_FILE), &labels.0)
    }
}

/// User-facing names for buttons and presets, kept in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Labels(OrderMap<String, String>);

impl Labels {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, label: impl Into<String>) {
        self.0.insert(key.into(), label.into());
    }

    /// Label for a preset button, defaulting to its coordinates.
    pub fn preset(&self, x: usize, y: usize) -> String {
        let key = format!("preset{x}.{y}");
        self.get(&key)
            .map_or_else(|| format!("{x}.{y}"), ToString::to_string)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("unable to read \"{}\"", path.to_string_lossy()))?;
    serde_yaml::from_str(&text)
        .with_context(|| format!("unable to parse \"{}\"", path.to_string_lossy()))
}

fn write_yaml<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("unable to create \"{}\"", parent.to_string_lossy()))?;
    }
    let yaml = serde_yaml::to_string(value)?;
    std::fs::write(path, yaml)
        .with_context(|| format!("unable to write \"{}\"", path.to_string_lossy()))
}
