//! Value-based identity for reclaimable resources.
//!
//! A `HandleId` is issued once by a `HandleRegistry` and never reused, so a
//! resource that is released and whose memory is recycled by an allocator
//! cannot alias a fresh one. Liveness is answered by the registry, not by
//! inspecting the resource.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HandleId(u64);

impl HandleId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Issues handle ids and tracks which of them are still live.
#[derive(Debug, Default)]
pub struct HandleRegistry {
    next: u64,
    live: HashSet<HandleId>,
    retired: u64,
}

impl HandleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh, live handle id.
    pub fn issue(&mut self) -> HandleId {
        self.next += 1;
        let id = HandleId(self.next);
        self.live.insert(id);
        id
    }

    pub fn is_live(&self, id: HandleId) -> bool {
        self.live.contains(&id)
    }

    /// Mark a handle released. Returns true exactly once per issued id;
    /// every later call (and any call for an unknown id) returns false.
    pub fn retire(&mut self, id: HandleId) -> bool {
        let was_live = self.live.remove(&id);
        if was_live {
            self.retired += 1;
        }
        was_live
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn retired_count(&self) -> u64 {
        self.retired
    }
}

/// A resource the tick stack can own and eventually release.
///
/// `release` consumes the value, so a single value can be released at most
/// once. The registry guards against two values sharing one handle.
pub trait Reclaim {
    fn handle(&self) -> HandleId;
    fn release(self);
}

/// Wraps any owned value as a reclaimable resource. Releasing drops it.
#[derive(Debug)]
pub struct Tracked<T> {
    handle: HandleId,
    value: T,
}

impl<T> Tracked<T> {
    pub fn new(handle: HandleId, value: T) -> Self {
        Self { handle, value }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> Reclaim for Tracked<T> {
    fn handle(&self) -> HandleId {
        self.handle
    }

    fn release(self) {
        drop(self.value);
    }
}

/// Receipt for an admitted request. Not `Clone`: cancelling consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct Ticket {
    stack: u64,
    handle: HandleId,
    seq: u64,
}

impl Ticket {
    pub(crate) fn new(stack: u64, handle: HandleId, seq: u64) -> Self {
        Self { stack, handle, seq }
    }

    /// Id of the stack that issued this ticket.
    pub(crate) fn stack(&self) -> u64 {
        self.stack
    }

    pub fn handle(&self) -> HandleId {
        self.handle
    }

    /// Admission order, unique per stack.
    pub fn seq(&self) -> u64 {
        self.seq
    }
}
