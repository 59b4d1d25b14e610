//! Bounded history of notable events, for consumers that report on them.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::constants::INCIDENT_HISTORY;
use crate::handle::HandleId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Info,
    Warning,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum IncidentKind {
    CapacityExceeded { capacity: usize },
    DoubleRelease { handle: HandleId },
    InvalidInput,
    NumericDegenerate,
    PressureDrain { drained: usize },
}

impl IncidentKind {
    pub fn level(&self) -> Level {
        match self {
            IncidentKind::PressureDrain { .. } => Level::Info,
            IncidentKind::CapacityExceeded { .. } | IncidentKind::NumericDegenerate => {
                Level::Warning
            }
            IncidentKind::DoubleRelease { .. } | IncidentKind::InvalidInput => Level::Error,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    pub seq: u64,
    pub level: Level,
    pub kind: IncidentKind,
}

#[derive(Debug)]
pub struct IncidentLog {
    entries: VecDeque<Incident>,
    capacity: usize,
    next_seq: u64,
}

impl Default for IncidentLog {
    fn default() -> Self {
        Self::new(INCIDENT_HISTORY)
    }
}

impl IncidentLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            next_seq: 0,
        }
    }

    pub fn record(&mut self, kind: IncidentKind) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.next_seq += 1;
        self.entries.push_back(Incident {
            seq: self.next_seq,
            level: kind.level(),
            kind,
        });
    }

    /// Oldest first.
    pub fn incidents(&self) -> impl Iterator<Item = &Incident> {
        self.entries.iter()
    }

    /// Most recent incident at or above `level`.
    pub fn last_at_least(&self, level: Level) -> Option<&Incident> {
        self.entries.iter().rev().find(|i| i.level >= level)
    }

    /// Incidents ever recorded, including evicted ones.
    pub fn total(&self) -> u64 {
        self.next_seq
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
