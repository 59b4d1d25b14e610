//! Fuzzy priority scoring for reclaim requests.
//!
//! Score = min(weight factor, reference factor, pressure), the fuzzy AND of
//! three memberships. Results under `CONFIDENCE_THRESHOLD` are attenuated by
//! `LOW_CONFIDENCE_PENALTY`, which makes the function discontinuous at the
//! threshold: a score of 0.69 becomes 0.552 while 0.70 stays 0.70.

use crate::constants::{
    CONFIDENCE_THRESHOLD, LOW_CONFIDENCE_PENALTY, SHARED_REF_FACTOR, SINGLE_REF_FACTOR,
    WEIGHT_NORM,
};
use crate::error::{InvalidInput, Result, ensure_finite};

/// Weight membership, saturating at 1.0 once `weight >= WEIGHT_NORM`.
pub fn weight_factor(weight: f64) -> f64 {
    (weight / WEIGHT_NORM).min(1.0)
}

/// Multiply-referenced requests rank above singly-referenced ones.
pub fn ref_factor(ref_count: u32) -> f64 {
    if ref_count > 1 {
        SHARED_REF_FACTOR
    } else {
        SINGLE_REF_FACTOR
    }
}

/// Priority in [0, 1] for a request of `weight` with `ref_count` references
/// observed under `pressure`.
pub fn score(weight: f64, ref_count: u32, pressure: f64) -> Result<f64> {
    let weight = ensure_finite(weight, "weight")?;
    let pressure = ensure_finite(pressure, "pressure")?;
    if weight < 0.0 {
        return Err(InvalidInput::NegativeWeight(weight).into());
    }
    if !(0.0..=1.0).contains(&pressure) {
        return Err(InvalidInput::PressureOutOfRange(pressure).into());
    }

    let raw = weight_factor(weight).min(ref_factor(ref_count)).min(pressure);
    if raw < CONFIDENCE_THRESHOLD {
        Ok(raw * LOW_CONFIDENCE_PENALTY)
    } else {
        Ok(raw)
    }
}
