use serde::{Deserialize, Serialize};

use crate::constants::{HIGH_PRESSURE, HIGH_PRESSURE_THRESHOLD, LOW_PRESSURE};
use crate::error::{InvalidInput, Result, ensure_finite};

/// How occupancy maps to a pressure reading.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum PressureModel {
    /// Two-level signal: `HIGH_PRESSURE` once `count > capacity * threshold`,
    /// `LOW_PRESSURE` otherwise.
    #[default]
    Stepped,
    /// `count / capacity`.
    Continuous,
    /// A constant supplied by an external load signal.
    Fixed(f64),
}

/// Reports load on a bounded buffer as a scalar in [0, 1]. Holds no history;
/// every reading is recomputed from the occupancy passed in.
#[derive(Clone, Debug)]
pub struct PressureMonitor {
    capacity: usize,
    threshold: f64,
    model: PressureModel,
}

impl PressureMonitor {
    pub fn new(capacity: usize, threshold: f64, model: PressureModel) -> Result<Self> {
        if capacity == 0 {
            return Err(InvalidInput::ZeroCapacity.into());
        }
        check_model(threshold, model)?;
        Ok(Self {
            capacity,
            threshold,
            model,
        })
    }

    pub fn pressure(&self, count: usize) -> f64 {
        match self.model {
            PressureModel::Stepped => {
                if count as f64 > self.capacity as f64 * self.threshold {
                    HIGH_PRESSURE
                } else {
                    LOW_PRESSURE
                }
            }
            PressureModel::Continuous => (count as f64 / self.capacity as f64).min(1.0),
            PressureModel::Fixed(p) => p,
        }
    }

    /// Whether a reading warrants an immediate cascade.
    ///
    /// Under `Stepped` the threshold is the occupancy fraction that selects
    /// the level, so the reading itself is compared against `HIGH_PRESSURE`.
    /// The other models compare the reading against the threshold.
    pub fn is_high(&self, pressure: f64) -> bool {
        match self.model {
            PressureModel::Stepped => pressure >= HIGH_PRESSURE,
            PressureModel::Continuous | PressureModel::Fixed(_) => pressure >= self.threshold,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn model(&self) -> PressureModel {
        self.model
    }
}

/// Validate a threshold against the model it drives.
///
/// `Stepped` needs a threshold below 1: `count > capacity * 1.0` can never
/// hold, so the stack would fill without ever cascading.
pub(crate) fn check_model(threshold: f64, model: PressureModel) -> Result<()> {
    let threshold = ensure_finite(threshold, "high_pressure_threshold")?;
    let in_range = match model {
        PressureModel::Stepped => (0.0..1.0).contains(&threshold),
        PressureModel::Continuous | PressureModel::Fixed(_) => (0.0..=1.0).contains(&threshold),
    };
    if !in_range {
        return Err(InvalidInput::ThresholdOutOfRange(threshold).into());
    }
    if let PressureModel::Fixed(p) = model {
        let p = ensure_finite(p, "pressure")?;
        if !(0.0..=1.0).contains(&p) {
            return Err(InvalidInput::PressureOutOfRange(p).into());
        }
    }
    Ok(())
}

impl Default for PressureMonitor {
    fn default() -> Self {
        Self {
            capacity: crate::constants::DEFAULT_CAPACITY,
            threshold: HIGH_PRESSURE_THRESHOLD,
            model: PressureModel::Stepped,
        }
    }
}
