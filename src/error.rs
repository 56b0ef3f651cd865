//! Error types that callers are expected to match on.
//!
//! Everything else travels as `anyhow::Error` with context attached.
use std::fmt::Display;

use itertools::Itertools;
use thiserror::Error;

/// A lookup in the fixture catalogue (or one of the fixed tables) came up empty.
///
/// Callers treat this as "feature absent" and fall back; it is never fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind} \"{key}\" not found")]
pub struct NotFound {
    pub kind: &'static str,
    pub key: String,
}

impl NotFound {
    pub fn new(kind: &'static str, key: impl Display) -> Self {
        Self {
            kind,
            key: key.to_string(),
        }
    }
}

/// A violated catalogue invariant, reported against the offending rows.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Violation {
    #[error(
        "{fixture} at {start}-{end} overlaps with {other} at {other_start}-{other_end}"
    )]
    Overlap {
        fixture: String,
        start: usize,
        end: usize,
        other: String,
        other_start: usize,
        other_end: usize,
    },
    #[error("{fixture}: {msg}")]
    InvalidEntry { fixture: String, msg: String },
}

impl Violation {
    pub fn invalid(fixture: impl Display, msg: impl Display) -> Self {
        Self::InvalidEntry {
            fixture: fixture.to_string(),
            msg: msg.to_string(),
        }
    }

    pub fn is_overlap(&self) -> bool {
        matches!(self, Self::Overlap { .. })
    }
}

/// A set of violations rendered one per line.
#[derive(Debug, Error)]
#[error("{} configuration problem(s):\n{}", .0.len(), .0.iter().join("\n"))]
pub struct ViolationReport(pub Vec<Violation>);

/// Whether a DMX interface was found at start-up.
///
/// An absent interface is a first-class state: the show runs and renders into
/// the frame buffer, nothing reaches the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmxStatus {
    Present,
    Absent,
}
