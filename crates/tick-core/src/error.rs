use std::fmt;

use crate::handle::HandleId;

/// Inputs rejected at the boundary. Nothing carrying one of these ever
/// enters the ordered sequence or the sample history.
#[derive(Debug, Clone, PartialEq)]
pub enum InvalidInput {
    NonFinite { field: &'static str },
    NegativeWeight(f64),
    PressureOutOfRange(f64),
    DuplicateHandle(HandleId),
    NonFiniteCoordinate { axis: usize },
    ZeroCapacity,
    ThresholdOutOfRange(f64),
}

impl fmt::Display for InvalidInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidInput::NonFinite { field } => write!(f, "{field} is not finite"),
            InvalidInput::NegativeWeight(w) => write!(f, "weight {w} is negative"),
            InvalidInput::PressureOutOfRange(p) => write!(f, "pressure {p} outside [0, 1]"),
            InvalidInput::DuplicateHandle(id) => write!(f, "handle {id} is already pending"),
            InvalidInput::NonFiniteCoordinate { axis } => {
                write!(f, "coordinate on axis {axis} is not finite")
            }
            InvalidInput::ZeroCapacity => write!(f, "capacity must be > 0"),
            InvalidInput::ThresholdOutOfRange(t) => {
                write!(f, "threshold {t} out of range for pressure model")
            }
        }
    }
}

/// Numeric computations that would otherwise yield NaN or infinity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degenerate {
    InsufficientSamples { have: usize },
    ZeroDelta,
    DivideByZero { axis: usize },
    Overflow,
}

impl fmt::Display for Degenerate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Degenerate::InsufficientSamples { have } => {
                write!(f, "need at least 2 samples, have {have}")
            }
            Degenerate::ZeroDelta => write!(f, "delta has zero length"),
            Degenerate::DivideByZero { axis } => write!(f, "division by zero on axis {axis}"),
            Degenerate::Overflow => write!(f, "result is not finite"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickError {
    CapacityExceeded { capacity: usize },
    InvalidInput(InvalidInput),
    NumericDegenerate(Degenerate),
    LockPoisoned,
}

impl fmt::Display for TickError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TickError::CapacityExceeded { capacity } => {
                write!(f, "tick stack full ({capacity} pending)")
            }
            TickError::InvalidInput(e) => write!(f, "invalid input: {e}"),
            TickError::NumericDegenerate(e) => write!(f, "numeric degenerate: {e}"),
            TickError::LockPoisoned => write!(f, "reclaimer lock poisoned"),
        }
    }
}

impl std::error::Error for TickError {}

impl From<InvalidInput> for TickError {
    fn from(e: InvalidInput) -> Self {
        TickError::InvalidInput(e)
    }
}

impl From<Degenerate> for TickError {
    fn from(e: Degenerate) -> Self {
        TickError::NumericDegenerate(e)
    }
}

pub type Result<T> = std::result::Result<T, TickError>;

/// Reject NaN and infinities, naming the offending field.
pub(crate) fn ensure_finite(value: f64, field: &'static str) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(InvalidInput::NonFinite { field }.into())
    }
}
