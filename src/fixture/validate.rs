//! Catalogue invariants.
use std::collections::HashSet;

use itertools::Itertools;

use super::descriptor::FixtureDescriptor;
use crate::{dmx::UNIVERSE_SIZE, error::Violation};

/// Return true if two half-open address ranges intersect.
pub fn overlaps(a: (usize, usize), b: (usize, usize)) -> bool {
    !(a.1 <= b.0 || b.1 <= a.0)
}

/// True if this fixture takes part in address collision checks.
fn occupies_addrs(fixture: &FixtureDescriptor) -> bool {
    !fixture.is_switch() && !fixture.channels.is_empty()
}

/// Index pairs (earlier, later) of non-switch fixtures whose address ranges
/// intersect.
pub fn overlapping_pairs(fixtures: &[FixtureDescriptor]) -> Vec<(usize, usize)> {
    fixtures
        .iter()
        .enumerate()
        .filter(|(_, f)| occupies_addrs(f))
        .tuple_combinations()
        .filter(|((_, a), (_, b))| overlaps((a.address, a.end()), (b.address, b.end())))
        .map(|((i, _), (j, _))| (i, j))
        .collect()
}

/// Check every catalogue invariant, returning every violation found.
pub fn check(fixtures: &[FixtureDescriptor]) -> Vec<Violation> {
    let mut violations = vec![];
    for fixture in fixtures {
        check_entry(fixture, fixtures, &mut violations);
    }

    for (a, b) in fixtures.iter().tuple_combinations() {
        if a.group == b.group && a.number == b.number {
            violations.push(Violation::invalid(
                b.display_name(),
                format!(
                    "group {} number {} is already used by {}",
                    b.group,
                    b.number,
                    a.display_name()
                ),
            ));
        }
        if a.is_switch() || b.is_switch() {
            continue;
        }
        if !b.name.trim().is_empty() && a.name.trim() == b.name.trim() {
            violations.push(Violation::invalid(
                b.display_name(),
                "duplicate fixture name",
            ));
        }
        if !b.label.trim().is_empty() && a.label.trim() == b.label.trim() {
            violations.push(Violation::invalid(
                b.display_name(),
                format!("duplicate label \"{}\"", b.label),
            ));
        }
    }

    for (i, j) in overlapping_pairs(fixtures) {
        let (a, b) = (&fixtures[i], &fixtures[j]);
        violations.push(Violation::Overlap {
            fixture: b.display_name(),
            start: b.address,
            end: b.end() - 1,
            other: a.display_name(),
            other_start: a.address,
            other_end: a.end() - 1,
        });
    }
    violations
}

fn check_entry(
    fixture: &FixtureDescriptor,
    all: &[FixtureDescriptor],
    violations: &mut Vec<Violation>,
) {
    let name = fixture.display_name();
    let mut invalid = |msg: String| violations.push(Violation::invalid(&name, msg));

    if fixture.group == 0 {
        invalid("group must be at least 1".to_string());
    }
    if fixture.number == 0 {
        invalid("number must be at least 1".to_string());
    }
    if !fixture.is_switch() && fixture.name.trim().is_empty() {
        invalid("name must not be empty".to_string());
    }
    if !fixture.channels.is_empty() {
        if !(1..=UNIVERSE_SIZE).contains(&fixture.address) {
            invalid(format!("DMX address {} out of range", fixture.address));
        } else if fixture.end() > UNIVERSE_SIZE + 1 {
            invalid(format!(
                "impossible to fit {} channels at start address {}",
                fixture.channels.len(),
                fixture.address
            ));
        }
    }

    let mut seen = HashSet::new();
    for channel in &fixture.channels {
        if channel.number == 0 {
            invalid(format!("channel {} has number 0", channel.name));
        } else if channel.number > fixture.channels.len() {
            invalid(format!(
                "channel {} number {} is outside the fixture's {} channels",
                channel.name,
                channel.number,
                fixture.channels.len()
            ));
        }
        if !seen.insert(channel.number) {
            invalid(format!("channel number {} is used twice", channel.number));
        }
    }

    if let Some(label) = &fixture.use_fixture {
        let target = all
            .iter()
            .find(|f| !f.is_switch() && f.label.trim() == label.trim());
        if target.is_none() {
            invalid(format!("uses unknown fixture label \"{label}\""));
        }
    }
}
