//! The sequence file: the initial state of every sequence in the show.
use std::path::Path;

use anyhow::{Context, Result, ensure};
use log::warn;

use crate::{
    fixture::Catalogue,
    sequence::{SequenceKind, SequenceState},
};

/// Parse a YAML list of sequence states.
///
/// Sequences are numbered by their position in the list; any number in the
/// file is ignored.
pub fn sequences_from_yaml(yaml: &str) -> Result<Vec<SequenceState>> {
    let mut states: Vec<SequenceState> = serde_yaml::from_str(yaml)?;
    ensure!(!states.is_empty(), "no sequences defined");
    for (i, state) in states.iter_mut().enumerate() {
        state.number = i + 1;
    }
    Ok(states)
}

pub fn load_sequences(path: &Path) -> Result<Vec<SequenceState>> {
    let text = std::fs::read_to_string(path).with_context(|| {
        format!(
            "unable to read sequence file \"{}\"",
            path.to_string_lossy()
        )
    })?;
    sequences_from_yaml(&text).with_context(|| format!("loading \"{}\"", path.to_string_lossy()))
}

/// Warn about sequences whose fixtures don't match their kind.
pub fn check_against(states: &[SequenceState], catalogue: &Catalogue) {
    for state in states {
        let seq = state.index();
        let slots = catalogue.slot_count(seq);
        let switches = catalogue.switches(seq).len();
        if slots == 0 {
            warn!("{} has no fixtures.", state.name());
        } else if state.kind == SequenceKind::Switch && switches == 0 {
            warn!("{} is a switch sequence but has no switches.", state.name());
        } else if state.kind != SequenceKind::Switch && switches > 0 {
            warn!(
                "{} has {switches} switch(es) that will never be driven.",
                state.name()
            );
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pattern::PatternName;

    #[test]
    fn test_numbered_by_position() {
        let states = sequences_from_yaml(
            "
- label: Front
  running: true
  colors: [{ r: 255, g: 0, b: 0 }]
- label: Movers
  type: scanner
  pattern: circle
  number: 7
- type: switch
",
        )
        .unwrap();
        assert_eq!(3, states.len());
        assert_eq!(
            vec![1, 2, 3],
            states.iter().map(|s| s.number).collect::<Vec<_>>()
        );
        assert_eq!(SequenceKind::Scanner, states[1].kind);
        assert_eq!(PatternName::Circle, states[1].pattern);
        assert_eq!("sequence 3", states[2].name());
    }

    #[test]
    fn test_empty_is_an_error() {
        let err = sequences_from_yaml("[]").unwrap_err();
        assert!(err.to_string().contains("no sequences defined"));
        assert!(sequences_from_yaml("- speed: fast").is_err());
    }

    #[test]
    fn test_load_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sequences.yaml");
        let err = load_sequences(&path).unwrap_err();
        assert!(err.to_string().contains("sequences.yaml"));

        std::fs::write(&path, "- running: true\n").unwrap();
        assert!(load_sequences(&path).unwrap()[0].running);
    }
}
