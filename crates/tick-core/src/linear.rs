//! One-dimensional counterpart of the delta topology, for scalar signals.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::constants::{EPSILON, HISTORY_CAPACITY, PHI, THIRD};
use crate::error::{Degenerate, InvalidInput, Result, ensure_finite};
use crate::topology::ReferencePair;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinearDelta {
    pub delta: f64,
    pub magnitude: f64,
    /// +1.0 or -1.0.
    pub direction: f64,
    /// 0 for a rising delta, π for a falling one.
    pub phase: f64,
    pub harmonic_factor: f64,
}

#[derive(Clone, Debug)]
pub struct LinearTopology {
    history: VecDeque<f64>,
    capacity: usize,
    pair: ReferencePair,
    coupling: f64,
}

impl Default for LinearTopology {
    fn default() -> Self {
        Self {
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
            capacity: HISTORY_CAPACITY,
            pair: ReferencePair::FirstToLast,
            coupling: PHI,
        }
    }
}

impl LinearTopology {
    pub fn new(capacity: usize, pair: ReferencePair, coupling: f64) -> Result<Self> {
        if capacity == 0 {
            return Err(InvalidInput::ZeroCapacity.into());
        }
        Ok(Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
            pair,
            coupling: ensure_finite(coupling, "harmonic_coupling")?,
        })
    }

    pub fn push(&mut self, value: f64) -> Result<()> {
        let value = ensure_finite(value, "value")?;
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(value);
        Ok(())
    }

    pub fn compute(&self) -> Result<LinearDelta> {
        let n = self.history.len();
        if n < 2 {
            return Err(Degenerate::InsufficientSamples { have: n }.into());
        }
        let reference = match self.pair {
            ReferencePair::FirstToLast => self.history[0],
            ReferencePair::Rolling => self.history[n - 2],
        };
        let delta = self.history[n - 1] - reference;
        let magnitude = delta.abs();
        if !magnitude.is_finite() {
            return Err(Degenerate::Overflow.into());
        }
        if magnitude < EPSILON {
            return Err(Degenerate::ZeroDelta.into());
        }
        Ok(LinearDelta {
            delta,
            magnitude,
            direction: delta.signum(),
            phase: if delta > 0.0 { 0.0 } else { std::f64::consts::PI },
            harmonic_factor: self.coupling / (1.0 + magnitude * THIRD),
        })
    }

    /// Successive differences, oldest first.
    pub fn deltas(&self) -> Vec<f64> {
        self.history
            .iter()
            .zip(self.history.iter().skip(1))
            .map(|(a, b)| b - a)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TickError;
    use approx::assert_relative_eq;

    #[test]
    fn test_falling_delta() {
        let mut lin = LinearTopology::default();
        lin.push(5.0).unwrap();
        lin.push(2.0).unwrap();
        let d = lin.compute().unwrap();
        assert_eq!(d.delta, -3.0);
        assert_eq!(d.magnitude, 3.0);
        assert_eq!(d.direction, -1.0);
        assert_relative_eq!(d.phase, std::f64::consts::PI);
        assert_relative_eq!(d.harmonic_factor, PHI / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_cases() {
        let mut lin = LinearTopology::default();
        lin.push(1.0).unwrap();
        assert_eq!(
            lin.compute().unwrap_err(),
            TickError::NumericDegenerate(Degenerate::InsufficientSamples { have: 1 })
        );
        lin.push(1.0).unwrap();
        assert_eq!(
            lin.compute().unwrap_err(),
            TickError::NumericDegenerate(Degenerate::ZeroDelta)
        );
        assert!(lin.push(f64::NAN).is_err());
    }

    #[test]
    fn test_rolling_and_deltas() {
        let mut lin = LinearTopology::new(4, ReferencePair::Rolling, PHI).unwrap();
        for v in [1.0, 2.0, 4.0, 8.0, 16.0] {
            lin.push(v).unwrap();
        }
        assert_eq!(lin.len(), 4);
        assert_eq!(lin.deltas(), vec![2.0, 4.0, 8.0]);
        assert_eq!(lin.compute().unwrap().delta, 8.0);
    }
}
