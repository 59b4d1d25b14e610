//! Delta topology over a bounded history of 11-dimensional samples.
//!
//! A record compares two samples (by default the oldest retained and the
//! most recent) and derives the delta vector, its Euclidean magnitude, the
//! per-axis direction cosines, a phase angle from the first two axes, and a
//! harmonic factor `coupling / (1 + magnitude * THIRD)`.
//!
//! Records are recomputed on demand and never cached, so repeated reads with
//! no new samples return identical values.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::constants::{DIM, EPSILON, HISTORY_CAPACITY, PHI, THIRD};
use crate::error::{Degenerate, InvalidInput, Result, ensure_finite};
use crate::operator::XOperator;

pub type Coords = [f64; DIM];

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VectorSample {
    pub coords: Coords,
    pub observed: bool,
    /// Arrival order, unique for the lifetime of the topology.
    pub seq: u64,
}

/// Which two samples a record compares.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferencePair {
    /// Oldest retained sample against the most recent.
    #[default]
    FirstToLast,
    /// The previous sample against the most recent.
    Rolling,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeltaRecord {
    pub deltas: Coords,
    pub magnitude: f64,
    pub directions: Coords,
    /// Radians in [0, 2π).
    pub phase: f64,
    pub harmonic_factor: f64,
    pub from_seq: u64,
    pub to_seq: u64,
    /// Observed samples in the current window.
    pub observed: usize,
}

impl DeltaRecord {
    /// Energy scaling for a dependent update: `1 + coupling * magnitude`.
    pub fn energy_multiplier(&self, coupling: f64) -> f64 {
        1.0 + coupling * self.magnitude
    }

    /// Mass scaling for a dependent update: `1 + coupling * harmonic_factor`.
    pub fn mass_multiplier(&self, coupling: f64) -> f64 {
        1.0 + coupling * self.harmonic_factor
    }
}

#[derive(Clone, Debug)]
pub struct DeltaTopology {
    history: VecDeque<VectorSample>,
    capacity: usize,
    pair: ReferencePair,
    coupling: f64,
    next_seq: u64,
}

impl Default for DeltaTopology {
    fn default() -> Self {
        Self {
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
            capacity: HISTORY_CAPACITY,
            pair: ReferencePair::FirstToLast,
            coupling: PHI,
            next_seq: 0,
        }
    }
}

impl DeltaTopology {
    pub fn new(capacity: usize, pair: ReferencePair, coupling: f64) -> Result<Self> {
        if capacity == 0 {
            return Err(InvalidInput::ZeroCapacity.into());
        }
        let coupling = ensure_finite(coupling, "harmonic_coupling")?;
        Ok(Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
            pair,
            coupling,
            next_seq: 0,
        })
    }

    /// Append a sample, evicting the oldest once the history is full.
    /// Returns the sample's arrival sequence number.
    pub fn push(&mut self, coords: Coords) -> Result<u64> {
        if let Some(axis) = coords.iter().position(|c| !c.is_finite()) {
            return Err(InvalidInput::NonFiniteCoordinate { axis }.into());
        }
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.next_seq += 1;
        self.history.push_back(VectorSample {
            coords,
            observed: false,
            seq: self.next_seq,
        });
        Ok(self.next_seq)
    }

    /// Flag the sample with arrival number `seq` as observed. Returns false if
    /// it has been evicted or never existed.
    pub fn observe(&mut self, seq: u64) -> bool {
        match self.history.iter_mut().find(|s| s.seq == seq) {
            Some(sample) => {
                sample.observed = true;
                true
            }
            None => false,
        }
    }

    /// The (reference, most recent) pair selected by the configured policy.
    pub fn reference_pair(&self) -> Result<(&VectorSample, &VectorSample)> {
        let n = self.history.len();
        if n < 2 {
            return Err(Degenerate::InsufficientSamples { have: n }.into());
        }
        let reference = match self.pair {
            ReferencePair::FirstToLast => &self.history[0],
            ReferencePair::Rolling => &self.history[n - 2],
        };
        Ok((reference, &self.history[n - 1]))
    }

    pub fn compute(&self) -> Result<DeltaRecord> {
        let (reference, latest) = self.reference_pair()?;

        let mut deltas = [0.0; DIM];
        for (i, d) in deltas.iter_mut().enumerate() {
            *d = latest.coords[i] - reference.coords[i];
        }
        let magnitude = magnitude(&deltas);
        if !magnitude.is_finite() {
            return Err(Degenerate::Overflow.into());
        }
        if magnitude < EPSILON {
            return Err(Degenerate::ZeroDelta.into());
        }

        let directions = deltas.map(|d| d / magnitude);
        let phase = deltas[1].atan2(deltas[0]).rem_euclid(std::f64::consts::TAU);
        let harmonic_factor = self.coupling / (1.0 + magnitude * THIRD);

        Ok(DeltaRecord {
            deltas,
            magnitude,
            directions,
            phase,
            harmonic_factor,
            from_seq: reference.seq,
            to_seq: latest.seq,
            observed: self.history.iter().filter(|s| s.observed).count(),
        })
    }

    /// Magnitude of the delta between each consecutive pair, oldest first.
    pub fn step_magnitudes(&self) -> Vec<f64> {
        self.history
            .iter()
            .zip(self.history.iter().skip(1))
            .map(|(a, b)| {
                let step: Coords = std::array::from_fn(|i| b.coords[i] - a.coords[i]);
                magnitude(&step)
            })
            .collect()
    }

    /// Apply `op` to (most recent, reference).
    pub fn project(&self, op: XOperator) -> Result<Coords> {
        let (reference, latest) = self.reference_pair()?;
        op.apply(&latest.coords, &reference.coords)
    }

    pub fn samples(&self) -> impl Iterator<Item = &VectorSample> {
        self.history.iter()
    }

    pub fn latest(&self) -> Option<&VectorSample> {
        self.history.back()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}

pub fn magnitude(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TickError;
    use approx::assert_relative_eq;

    fn ramp(offset: f64) -> Coords {
        std::array::from_fn(|i| i as f64 + offset)
    }

    #[test]
    fn test_fewer_than_two_samples_is_degenerate() {
        let mut topo = DeltaTopology::default();
        assert_eq!(
            topo.compute().unwrap_err(),
            TickError::NumericDegenerate(Degenerate::InsufficientSamples { have: 0 })
        );
        topo.push(ramp(0.0)).unwrap();
        assert_eq!(
            topo.compute().unwrap_err(),
            TickError::NumericDegenerate(Degenerate::InsufficientSamples { have: 1 })
        );
    }

    #[test]
    fn test_identical_samples_are_degenerate() {
        let mut topo = DeltaTopology::default();
        topo.push(ramp(1.0)).unwrap();
        topo.push(ramp(1.0)).unwrap();
        assert_eq!(
            topo.compute().unwrap_err(),
            TickError::NumericDegenerate(Degenerate::ZeroDelta)
        );
    }

    #[test]
    fn test_uniform_shift_record() {
        let mut topo = DeltaTopology::default();
        topo.push(ramp(0.0)).unwrap();
        topo.push(ramp(1.0)).unwrap();
        let rec = topo.compute().unwrap();

        let expected = (DIM as f64).sqrt();
        assert_relative_eq!(rec.magnitude, expected);
        for d in rec.directions {
            assert_relative_eq!(d, 1.0 / expected);
        }
        assert_relative_eq!(rec.phase, std::f64::consts::FRAC_PI_4, epsilon = 1e-12);
        assert_relative_eq!(rec.harmonic_factor, PHI / (1.0 + expected * THIRD));
        assert_eq!((rec.from_seq, rec.to_seq), (1, 2));
    }

    #[test]
    fn test_direction_cosines_are_unit_length() {
        let mut topo = DeltaTopology::default();
        topo.push([0.0; DIM]).unwrap();
        topo.push(std::array::from_fn(|i| (i as f64 * 0.7).sin())).unwrap();
        let rec = topo.compute().unwrap();
        assert_relative_eq!(magnitude(&rec.directions), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_phase_is_normalized() {
        let mut topo = DeltaTopology::default();
        topo.push([0.0; DIM]).unwrap();
        let mut down = [0.0; DIM];
        down[1] = -1.0;
        topo.push(down).unwrap();
        let rec = topo.compute().unwrap();
        assert_relative_eq!(rec.phase, 3.0 * std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn test_history_evicts_oldest() {
        let mut topo = DeltaTopology::new(3, ReferencePair::FirstToLast, PHI).unwrap();
        for k in 0..5 {
            topo.push(ramp(k as f64)).unwrap();
        }
        assert_eq!(topo.len(), 3);
        let rec = topo.compute().unwrap();
        assert_eq!((rec.from_seq, rec.to_seq), (3, 5));
        assert_relative_eq!(rec.deltas[0], 2.0);
    }

    #[test]
    fn test_rolling_pair_uses_previous_sample() {
        let mut topo = DeltaTopology::new(10, ReferencePair::Rolling, PHI).unwrap();
        topo.push(ramp(0.0)).unwrap();
        topo.push(ramp(5.0)).unwrap();
        topo.push(ramp(6.0)).unwrap();
        let rec = topo.compute().unwrap();
        assert_eq!((rec.from_seq, rec.to_seq), (2, 3));
        assert_relative_eq!(rec.deltas[3], 1.0);
    }

    #[test]
    fn test_non_finite_coordinate_rejected() {
        let mut topo = DeltaTopology::default();
        let mut bad = ramp(0.0);
        bad[7] = f64::NAN;
        assert_eq!(
            topo.push(bad).unwrap_err(),
            TickError::InvalidInput(InvalidInput::NonFiniteCoordinate { axis: 7 })
        );
        assert!(topo.is_empty());
    }

    #[test]
    fn test_observe_counts_in_record() {
        let mut topo = DeltaTopology::default();
        let first = topo.push(ramp(0.0)).unwrap();
        topo.push(ramp(2.0)).unwrap();
        assert!(topo.observe(first));
        assert!(!topo.observe(99));
        assert_eq!(topo.compute().unwrap().observed, 1);
    }

    #[test]
    fn test_step_magnitudes() {
        let mut topo = DeltaTopology::default();
        topo.push([0.0; DIM]).unwrap();
        let mut one = [0.0; DIM];
        one[0] = 3.0;
        one[1] = 4.0;
        topo.push(one).unwrap();
        topo.push(one).unwrap();
        assert_eq!(topo.step_magnitudes(), vec![5.0, 0.0]);
    }

    #[test]
    fn test_project_extrapolates_from_latest() {
        let mut topo = DeltaTopology::default();
        topo.push([1.0; DIM]).unwrap();
        topo.push([2.0; DIM]).unwrap();
        let out = topo.project(XOperator::Extrapolate).unwrap();
        assert_relative_eq!(out[0], 2.0 + PHI);
    }

    #[test]
    fn test_multipliers() {
        let mut topo = DeltaTopology::default();
        let mut v = [0.0; DIM];
        v[0] = 3.0;
        topo.push([0.0; DIM]).unwrap();
        topo.push(v).unwrap();
        let rec = topo.compute().unwrap();
        assert_relative_eq!(rec.energy_multiplier(0.125), 1.375);
        // harmonic = φ / 2
        assert_relative_eq!(rec.mass_multiplier(0.125), 1.0 + 0.125 * PHI / 2.0, epsilon = 1e-12);
    }
}
