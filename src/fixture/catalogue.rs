//! The fixture catalogue: an immutable arena of descriptors.
use std::{collections::HashSet, path::Path, sync::Arc};

use anyhow::{Context, Result, bail};
use arc_swap::ArcSwap;
use itertools::Itertools;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::{descriptor::FixtureDescriptor, validate};
use crate::error::{NotFound, Violation, ViolationReport};

/// Index of a descriptor in the catalogue arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FixtureId(pub usize);

/// The catalogue as shared between workers; reload swaps the whole arena.
pub type SharedCatalogue = Arc<ArcSwap<Catalogue>>;

pub fn shared(catalogue: Catalogue) -> SharedCatalogue {
    Arc::new(ArcSwap::from_pointee(catalogue))
}

/// On-disk layout of the fixture file.
#[derive(Serialize, Deserialize)]
struct CatalogueFile {
    fixtures: Vec<FixtureDescriptor>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalogue {
    fixtures: Vec<FixtureDescriptor>,
    /// Fixtures disabled at load because their addresses collided.
    disabled: HashSet<FixtureId>,
}

impl Catalogue {
    /// Build a catalogue without validating it.
    pub fn new(fixtures: Vec<FixtureDescriptor>) -> Self {
        Self {
            fixtures,
            disabled: HashSet::new(),
        }
    }

    /// Parse and validate a catalogue.
    ///
    /// Invalid entries are always fatal. Overlapping fixtures are fatal in
    /// strict mode; otherwise the later fixture of each pair is disabled.
    pub fn from_yaml(yaml: &str, strict: bool) -> Result<Self> {
        let file: CatalogueFile = serde_yaml::from_str(yaml)?;
        let mut catalogue = Self::new(file.fixtures);

        let (overlaps, invalid): (Vec<_>, Vec<_>) = validate::check(&catalogue.fixtures)
            .into_iter()
            .partition(|v| v.is_overlap());
        if !invalid.is_empty() {
            return Err(ViolationReport(invalid).into());
        }
        if !overlaps.is_empty() {
            if strict {
                return Err(ViolationReport(overlaps).into());
            }
            // Earlier fixtures win; a fixture already disabled can't displace another.
            for (earlier, later) in validate::overlapping_pairs(&catalogue.fixtures) {
                if catalogue.disabled.contains(&FixtureId(earlier)) {
                    continue;
                }
                let (a, b) = (&catalogue.fixtures[earlier], &catalogue.fixtures[later]);
                if catalogue.disabled.insert(FixtureId(later)) {
                    warn!(
                        "{} at {} overlaps with {} at {}; disabling {}.",
                        b.display_name(),
                        b.address,
                        a.display_name(),
                        a.address,
                        b.display_name()
                    );
                }
            }
        }
        Ok(catalogue)
    }

    /// Load a catalogue from a fixture file.
    pub fn load(path: &Path, strict: bool) -> Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| {
            format!(
                "unable to read fixture file \"{}\"",
                path.to_string_lossy()
            )
        })?;
        let catalogue = Self::from_yaml(&text, strict)
            .with_context(|| format!("loading \"{}\"", path.to_string_lossy()))?;
        info!(
            "Loaded {} fixtures ({} disabled) from {}.",
            catalogue.fixtures.len(),
            catalogue.disabled.len(),
            path.to_string_lossy()
        );
        Ok(catalogue)
    }

    /// Render the catalogue as YAML.
    ///
    /// Refused, with the full violation report, while any invariant is violated.
    pub fn to_yaml(&self) -> Result<String> {
        let violations = self.validate();
        if !violations.is_empty() {
            bail!(ViolationReport(violations));
        }
        Ok(serde_yaml::to_string(&CatalogueFile {
            fixtures: self.fixtures.clone(),
        })?)
    }

    /// Save the catalogue to a fixture file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let yaml = self.to_yaml()?;
        std::fs::write(path, yaml)
            .with_context(|| format!("unable to write \"{}\"", path.to_string_lossy()))
    }

    /// Every violated invariant; empty when the catalogue may be saved.
    pub fn validate(&self) -> Vec<Violation> {
        validate::check(&self.fixtures)
    }

    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }

    pub fn is_disabled(&self, id: FixtureId) -> bool {
        self.disabled.contains(&id)
    }

    pub fn get(&self, id: FixtureId) -> Result<&FixtureDescriptor, NotFound> {
        self.fixtures
            .get(id.0)
            .ok_or_else(|| NotFound::new("fixture id", id.0))
    }

    /// Every enabled fixture, with its id.
    pub fn iter(&self) -> impl Iterator<Item = (FixtureId, &FixtureDescriptor)> {
        self.fixtures
            .iter()
            .enumerate()
            .map(|(i, f)| (FixtureId(i), f))
            .filter(|(id, _)| !self.is_disabled(*id))
    }

    /// Look up a non-switch fixture by label.
    pub fn by_label(&self, label: &str) -> Result<(FixtureId, &FixtureDescriptor), NotFound> {
        self.iter()
            .find(|(_, f)| !f.is_switch() && f.label.trim() == label.trim())
            .ok_or_else(|| NotFound::new("fixture label", label))
    }

    /// Look up a fixture by its position in the file (both indexed from 1).
    pub fn by_position(
        &self,
        group: usize,
        number: usize,
    ) -> Result<(FixtureId, &FixtureDescriptor), NotFound> {
        self.iter()
            .find(|(_, f)| f.group == group && f.number == number)
            .ok_or_else(|| NotFound::new("fixture", format!("{group}.{number}")))
    }

    /// Find the descriptor driving a sequence slot (both indexed from 0),
    /// along with the sub-fixture index within that descriptor.
    pub fn by_slot(
        &self,
        sequence: usize,
        slot: usize,
    ) -> Result<(&FixtureDescriptor, usize), NotFound> {
        self.iter()
            .filter(|(_, f)| f.group == sequence + 1)
            .find_map(|(_, f)| {
                let first = f.number.checked_sub(1)?;
                (first..first + f.sub_fixtures())
                    .contains(&slot)
                    .then(|| (f, slot - first))
            })
            .ok_or_else(|| NotFound::new("fixture", format!("{}.{}", sequence + 1, slot + 1)))
    }

    /// How many slots the sequence drives.
    pub fn slot_count(&self, sequence: usize) -> usize {
        self.iter()
            .filter(|(_, f)| f.group == sequence + 1)
            .map(|(_, f)| f.number.saturating_sub(1) + f.sub_fixtures())
            .max()
            .unwrap_or_default()
    }

    /// Labels of all non-switch fixtures, for "use fixture" menus.
    pub fn labels(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, f)| !f.is_switch() && !f.label.trim().is_empty())
            .map(|(_, f)| f.label.as_str())
            .collect()
    }

    /// The switch fixtures of a sequence, ordered by number.
    pub fn switches(&self, sequence: usize) -> Vec<&FixtureDescriptor> {
        self.iter()
            .map(|(_, f)| f)
            .filter(|f| f.group == sequence + 1 && f.is_switch())
            .sorted_by_key(|f| f.number)
            .collect()
    }

    /// The descriptor a switch drives: its "use fixture" target if it names
    /// one, otherwise the switch's own channels.
    pub fn switch_target<'a>(
        &'a self,
        switch: &'a FixtureDescriptor,
    ) -> Result<&'a FixtureDescriptor, NotFound> {
        match &switch.use_fixture {
            Some(label) => Ok(self.by_label(label)?.1),
            None => Ok(switch),
        }
    }
}
