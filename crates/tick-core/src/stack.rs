//! The tick stack: a capacity-bounded sequence of reclaim requests kept in
//! non-increasing score order.
//!
//! Equal scores keep admission order, so draining the same admissions always
//! yields the same release order. The stack owns every admitted resource until
//! it is drained, popped, or cancelled; nothing else may release it.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{InvalidInput, Result, TickError};
use crate::handle::{HandleId, HandleRegistry, Reclaim, Ticket};
use crate::score::score;

/// A pending release candidate and the priority it was admitted with.
#[derive(Debug)]
pub struct ReclaimRequest<R> {
    pub resource: R,
    pub handle: HandleId,
    pub weight: f64,
    pub ref_count: u32,
    pub score: f64,
    pub seq: u64,
}

/// What happened to one request during a drain.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum Outcome {
    Released { handle: HandleId, score: f64 },
    /// The handle had already been released elsewhere. The resource was
    /// dropped without calling `release`.
    DoubleReleaseAttempted { handle: HandleId, score: f64 },
}

impl Outcome {
    pub fn handle(&self) -> HandleId {
        match self {
            Outcome::Released { handle, .. } | Outcome::DoubleReleaseAttempted { handle, .. } => {
                *handle
            }
        }
    }

    pub fn is_released(&self) -> bool {
        matches!(self, Outcome::Released { .. })
    }
}

/// Released vs. double-release counts over a batch of outcomes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrainReport {
    pub released: usize,
    pub double_release_attempted: usize,
}

impl From<&[Outcome]> for DrainReport {
    fn from(outcomes: &[Outcome]) -> Self {
        let released = outcomes.iter().filter(|o| o.is_released()).count();
        Self {
            released,
            double_release_attempted: outcomes.len() - released,
        }
    }
}

/// A refused admission. Carries the resource back so the caller can drain
/// and retry, or drop it deliberately.
#[derive(Debug)]
pub struct Rejected<R> {
    pub resource: R,
    pub error: TickError,
}

impl<R> fmt::Display for Rejected<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "admission rejected: {}", self.error)
    }
}

impl<R: fmt::Debug> std::error::Error for Rejected<R> {}

impl<R> From<Rejected<R>> for TickError {
    fn from(r: Rejected<R>) -> Self {
        r.error
    }
}

/// Stamped into every ticket so a ticket only ever matches the stack that
/// issued it; seqs and handle ids both restart per instance.
static NEXT_STACK_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug)]
pub struct TickStack<R> {
    id: u64,
    entries: VecDeque<ReclaimRequest<R>>,
    pending: HashSet<HandleId>,
    capacity: usize,
    next_seq: u64,
}

impl<R: Reclaim> TickStack<R> {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(InvalidInput::ZeroCapacity.into());
        }
        Ok(Self {
            id: NEXT_STACK_ID.fetch_add(1, Ordering::Relaxed),
            entries: VecDeque::with_capacity(capacity),
            pending: HashSet::with_capacity(capacity),
            capacity,
            next_seq: 0,
        })
    }

    /// Score `resource` under `pressure` and insert it behind every request
    /// with an equal or higher score.
    ///
    /// Fails without touching the stack when it is full, when the handle is
    /// already pending, or when the inputs are not finite.
    pub fn admit(
        &mut self,
        resource: R,
        weight: f64,
        ref_count: u32,
        pressure: f64,
    ) -> std::result::Result<Ticket, Rejected<R>> {
        if self.entries.len() >= self.capacity {
            let error = TickError::CapacityExceeded {
                capacity: self.capacity,
            };
            return Err(Rejected { resource, error });
        }
        let handle = resource.handle();
        if self.pending.contains(&handle) {
            let error = InvalidInput::DuplicateHandle(handle).into();
            return Err(Rejected { resource, error });
        }
        let score = match score(weight, ref_count, pressure) {
            Ok(score) => score,
            Err(error) => return Err(Rejected { resource, error }),
        };

        self.next_seq += 1;
        let seq = self.next_seq;
        let at = self.entries.partition_point(|r| r.score >= score);
        self.entries.insert(
            at,
            ReclaimRequest {
                resource,
                handle,
                weight,
                ref_count,
                score,
                seq,
            },
        );
        self.pending.insert(handle);
        Ok(Ticket::new(self.id, handle, seq))
    }

    /// Release every pending request, highest score first.
    ///
    /// Each handle is retired in `registry` before its resource is released;
    /// a handle the registry no longer considers live is reported as
    /// `DoubleReleaseAttempted` and its resource is never released. The
    /// stack is empty afterwards.
    pub fn drain_all(&mut self, registry: &mut HandleRegistry) -> Vec<Outcome> {
        self.pending.clear();
        self.entries
            .drain(..)
            .map(|req| {
                if registry.retire(req.handle) {
                    req.resource.release();
                    Outcome::Released {
                        handle: req.handle,
                        score: req.score,
                    }
                } else {
                    tracing::warn!(handle = %req.handle, "double release attempt skipped");
                    Outcome::DoubleReleaseAttempted {
                        handle: req.handle,
                        score: req.score,
                    }
                }
            })
            .collect()
    }

    /// Remove the request admitted under `ticket` without releasing it.
    /// Returns `None` if it has already been drained or popped, or if the
    /// ticket was issued by another stack.
    pub fn cancel(&mut self, ticket: Ticket) -> Option<R> {
        if ticket.stack() != self.id {
            return None;
        }
        let idx = self
            .entries
            .iter()
            .position(|r| r.seq == ticket.seq() && r.handle == ticket.handle())?;
        let req = self.entries.remove(idx)?;
        self.pending.remove(&req.handle);
        Some(req.resource)
    }

    pub fn peek(&self) -> Option<&ReclaimRequest<R>> {
        self.entries.front()
    }

    /// Take the highest-priority request without releasing it.
    pub fn pop(&mut self) -> Option<ReclaimRequest<R>> {
        let req = self.entries.pop_front()?;
        self.pending.remove(&req.handle);
        Some(req)
    }

    pub fn contains(&self, handle: HandleId) -> bool {
        self.pending.contains(&handle)
    }

    /// Pending requests, head (highest score) first.
    pub fn iter(&self) -> impl Iterator<Item = &ReclaimRequest<R>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Non-increasing score, ties in admission order.
    pub fn is_ordered(&self) -> bool {
        self.entries
            .iter()
            .zip(self.entries.iter().skip(1))
            .all(|(a, b)| a.score > b.score || (a.score == b.score && a.seq < b.seq))
    }
}
