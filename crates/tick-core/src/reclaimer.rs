//! The reclaimer: one explicit instance owning the tick stack, handle
//! registry, pressure monitor, drain policy, delta topology and incident log.
//!
//! Every admission reads pressure, scores, inserts and re-evaluates the
//! drain policy inside one `&mut self` call, so the pressure snapshot used
//! for scoring can never go stale between read and insertion. `SharedReclaimer`
//! extends the same guarantee across threads with a single mutex.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use crate::config::ReclaimerConfig;
use crate::error::{Result, TickError};
use crate::handle::{HandleId, HandleRegistry, Reclaim, Ticket};
use crate::incident::{IncidentKind, IncidentLog};
use crate::operator::XOperator;
use crate::policy::{DrainMode, DrainPolicy};
use crate::pressure::PressureMonitor;
use crate::stack::{DrainReport, Outcome, Rejected, TickStack};
use crate::topology::{Coords, DeltaRecord, DeltaTopology};

/// Result of a successful admission. `drained` is non-empty when the
/// admission pushed pressure over the threshold and a cascade ran before
/// returning; the admitted request itself is then among the outcomes.
#[derive(Debug)]
pub struct Admission {
    pub ticket: Ticket,
    pub drained: Vec<Outcome>,
}

/// Read-only view for external reporting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub count: usize,
    pub capacity: usize,
    pub pressure: f64,
    pub mode: DrainMode,
    pub live_handles: usize,
    pub released_total: u64,
    pub double_release_total: u64,
    pub cascades: u64,
    pub samples: usize,
}

pub struct Reclaimer<R: Reclaim> {
    stack: TickStack<R>,
    registry: HandleRegistry,
    monitor: PressureMonitor,
    policy: DrainPolicy,
    topology: DeltaTopology,
    incidents: IncidentLog,
    released_total: u64,
    double_release_total: u64,
}

impl<R: Reclaim> Reclaimer<R> {
    pub fn new(config: &ReclaimerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            stack: TickStack::new(config.capacity)?,
            registry: HandleRegistry::new(),
            monitor: PressureMonitor::new(
                config.capacity,
                config.high_pressure_threshold,
                config.pressure_model,
            )?,
            policy: DrainPolicy::new(),
            topology: DeltaTopology::new(
                config.history_capacity,
                config.reference_pair,
                config.harmonic_coupling,
            )?,
            incidents: IncidentLog::default(),
            released_total: 0,
            double_release_total: 0,
        })
    }

    /// Issue a handle for a resource that will later be admitted.
    pub fn register(&mut self) -> HandleId {
        self.registry.issue()
    }

    /// Record that `handle` was released outside the stack. A pending request
    /// for it will be reported as `DoubleReleaseAttempted` when drained.
    pub fn retire(&mut self, handle: HandleId) -> bool {
        self.registry.retire(handle)
    }

    pub fn is_live(&self, handle: HandleId) -> bool {
        self.registry.is_live(handle)
    }

    /// Score and admit `resource`. On rejection the resource is handed back
    /// inside the error.
    pub fn admit_reclaim(
        &mut self,
        resource: R,
        weight: f64,
        ref_count: u32,
    ) -> std::result::Result<Admission, Rejected<R>> {
        let pressure = self.monitor.pressure(self.stack.len());
        let ticket = self
            .stack
            .admit(resource, weight, ref_count, pressure)
            .inspect_err(|rejected| self.note_error(&rejected.error))?;
        tracing::debug!(
            handle = %ticket.handle(),
            weight,
            ref_count,
            pressure,
            pending = self.stack.len(),
            "admitted reclaim request"
        );

        let after = self.monitor.pressure(self.stack.len());
        let drained = if self.policy.on_admission(after, &self.monitor) {
            let outcomes = self.cascade();
            self.policy.finish();
            self.incidents.record(IncidentKind::PressureDrain {
                drained: outcomes.len(),
            });
            outcomes
        } else {
            Vec::new()
        };
        Ok(Admission { ticket, drained })
    }

    /// Withdraw a pending request without releasing it.
    pub fn cancel(&mut self, ticket: Ticket) -> Option<R> {
        self.stack.cancel(ticket)
    }

    /// Drain regardless of pressure. This is the only way to bound reclaim
    /// latency while pressure stays low.
    pub fn drain_now(&mut self) -> Vec<Outcome> {
        self.cascade()
    }

    pub fn current_pressure(&self) -> f64 {
        self.monitor.pressure(self.stack.len())
    }

    /// Append a vector sample; returns its arrival sequence number.
    pub fn admit_vector_sample(&mut self, coords: Coords) -> Result<u64> {
        self.topology.push(coords).inspect_err(|e| self.note_error(e))
    }

    pub fn observe_sample(&mut self, seq: u64) -> bool {
        self.topology.observe(seq)
    }

    /// Derive the current delta record. The history is not modified, so
    /// repeated reads agree; a degenerate read is recorded as an incident.
    pub fn compute_topology(&mut self) -> Result<DeltaRecord> {
        self.topology.compute().inspect_err(|e| self.note_error(e))
    }

    pub fn project(&mut self, op: XOperator) -> Result<Coords> {
        self.topology.project(op).inspect_err(|e| self.note_error(e))
    }

    pub fn status_snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            count: self.stack.len(),
            capacity: self.stack.capacity(),
            pressure: self.current_pressure(),
            mode: self.policy.mode(),
            live_handles: self.registry.live_count(),
            released_total: self.released_total,
            double_release_total: self.double_release_total,
            cascades: self.policy.cascades(),
            samples: self.topology.len(),
        }
    }

    pub fn stack(&self) -> &TickStack<R> {
        &self.stack
    }

    pub fn topology(&self) -> &DeltaTopology {
        &self.topology
    }

    pub fn incidents(&self) -> &IncidentLog {
        &self.incidents
    }

    /// Drain everything still pending and tear down.
    pub fn shutdown(mut self) -> Vec<Outcome> {
        self.cascade()
    }

    fn cascade(&mut self) -> Vec<Outcome> {
        let outcomes = self.stack.drain_all(&mut self.registry);
        for outcome in &outcomes {
            match outcome {
                Outcome::Released { .. } => self.released_total += 1,
                Outcome::DoubleReleaseAttempted { handle, .. } => {
                    self.double_release_total += 1;
                    self.incidents
                        .record(IncidentKind::DoubleRelease { handle: *handle });
                }
            }
        }
        tracing::debug!(drained = outcomes.len(), "cascade complete");
        outcomes
    }

    fn note_error(&mut self, e: &TickError) {
        let kind = match e {
            TickError::CapacityExceeded { capacity } => {
                tracing::warn!(capacity, "reclaim request rejected: stack full");
                IncidentKind::CapacityExceeded {
                    capacity: *capacity,
                }
            }
            TickError::InvalidInput(reason) => {
                tracing::warn!(%reason, "rejected invalid input");
                IncidentKind::InvalidInput
            }
            TickError::NumericDegenerate(reason) => {
                tracing::debug!(%reason, "topology read skipped");
                IncidentKind::NumericDegenerate
            }
            TickError::LockPoisoned => return,
        };
        self.incidents.record(kind);
    }
}

// Each skipped handle is already logged at warn by `TickStack::drain_all`;
// the summary ties them to teardown.
impl<R: Reclaim> Drop for Reclaimer<R> {
    fn drop(&mut self) {
        if self.stack.is_empty() {
            return;
        }
        let outcomes = self.cascade();
        let report = DrainReport::from(outcomes.as_slice());
        if report.double_release_attempted > 0 {
            tracing::warn!(
                released = report.released,
                double_release = report.double_release_attempted,
                "drained pending requests on drop"
            );
        } else {
            tracing::debug!(released = report.released, "drained pending requests on drop");
        }
    }
}

/// A reclaimer behind one mutex, so admission (pressure read through policy
/// evaluation) and drains are each a single critical section.
pub struct SharedReclaimer<R: Reclaim> {
    inner: Arc<Mutex<Reclaimer<R>>>,
}

impl<R: Reclaim> Clone for SharedReclaimer<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Reclaim> SharedReclaimer<R> {
    pub fn new(config: &ReclaimerConfig) -> Result<Self> {
        Ok(Self {
            inner: Arc::new(Mutex::new(Reclaimer::new(config)?)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Reclaimer<R>>> {
        self.inner.lock().map_err(|_| TickError::LockPoisoned)
    }

    /// Run `f` with exclusive access to the reclaimer.
    pub fn with<T>(&self, f: impl FnOnce(&mut Reclaimer<R>) -> T) -> Result<T> {
        Ok(f(&mut *self.lock()?))
    }

    pub fn register(&self) -> Result<HandleId> {
        self.with(|r| r.register())
    }

    pub fn admit_reclaim(
        &self,
        resource: R,
        weight: f64,
        ref_count: u32,
    ) -> std::result::Result<Admission, Rejected<R>> {
        match self.lock() {
            Ok(mut guard) => guard.admit_reclaim(resource, weight, ref_count),
            Err(error) => Err(Rejected { resource, error }),
        }
    }

    pub fn cancel(&self, ticket: Ticket) -> Result<Option<R>> {
        self.with(|r| r.cancel(ticket))
    }

    pub fn drain_now(&self) -> Result<Vec<Outcome>> {
        self.with(|r| r.drain_now())
    }

    pub fn current_pressure(&self) -> Result<f64> {
        self.with(|r| r.current_pressure())
    }

    pub fn admit_vector_sample(&self, coords: Coords) -> Result<u64> {
        self.lock()?.admit_vector_sample(coords)
    }

    pub fn compute_topology(&self) -> Result<DeltaRecord> {
        self.lock()?.compute_topology()
    }

    pub fn status_snapshot(&self) -> Result<StatusSnapshot> {
        self.with(|r| r.status_snapshot())
    }
}
