//! Priority-ordered deferred reclamation.
//!
//! Producers submit release requests; each is scored by a fuzzy AND of its
//! weight, reference count and current buffer pressure, then held in a
//! bounded, score-ordered tick stack. Under low pressure requests accumulate;
//! once pressure reaches the high threshold the whole stack cascades,
//! highest score first. Handles carry value-based identity from a registry,
//! so no handle is ever released twice.
//!
//! A delta topology tracks a bounded history of 11-dimensional samples and
//! derives magnitude, phase and harmonic values that dependent simulations
//! use as multipliers.
//!
//! Zero I/O: callers own formatting, transport and persistence.

pub mod config;
pub mod constants;
pub mod error;
pub mod handle;
pub mod incident;
pub mod linear;
pub mod operator;
pub mod policy;
pub mod pressure;
pub mod reclaimer;
pub mod score;
pub mod stack;
pub mod topology;

pub use config::ReclaimerConfig;
pub use constants::{
    CONFIDENCE_THRESHOLD, DIM, EPSILON, HIGH_PRESSURE_THRESHOLD, HISTORY_CAPACITY, PHI,
    WEIGHT_NORM,
};
pub use error::{Degenerate, InvalidInput, Result, TickError};
pub use handle::{HandleId, HandleRegistry, Reclaim, Ticket, Tracked};
pub use incident::{Incident, IncidentKind, IncidentLog, Level};
pub use linear::{LinearDelta, LinearTopology};
pub use operator::XOperator;
pub use policy::{DrainMode, DrainPolicy};
pub use pressure::{PressureModel, PressureMonitor};
pub use reclaimer::{Admission, Reclaimer, SharedReclaimer, StatusSnapshot};
pub use score::score;
pub use stack::{DrainReport, Outcome, ReclaimRequest, Rejected, TickStack};
pub use topology::{Coords, DeltaRecord, DeltaTopology, ReferencePair, VectorSample};
