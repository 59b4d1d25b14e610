use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_CAPACITY, HIGH_PRESSURE_THRESHOLD, HISTORY_CAPACITY, PHI};
use crate::error::{InvalidInput, Result, ensure_finite};
use crate::pressure::{PressureModel, check_model};
use crate::topology::ReferencePair;

/// Tunables for a `Reclaimer`. Every field has a default, so a partial
/// config deserializes cleanly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReclaimerConfig {
    /// Maximum pending reclaim requests.
    pub capacity: usize,
    /// Pressure at or above which admissions trigger a cascade.
    pub high_pressure_threshold: f64,
    pub pressure_model: PressureModel,
    /// Vector samples retained by the delta topology.
    pub history_capacity: usize,
    pub reference_pair: ReferencePair,
    pub harmonic_coupling: f64,
}

impl Default for ReclaimerConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            high_pressure_threshold: HIGH_PRESSURE_THRESHOLD,
            pressure_model: PressureModel::Stepped,
            history_capacity: HISTORY_CAPACITY,
            reference_pair: ReferencePair::FirstToLast,
            harmonic_coupling: PHI,
        }
    }
}

impl ReclaimerConfig {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 || self.history_capacity == 0 {
            return Err(InvalidInput::ZeroCapacity.into());
        }
        check_model(self.high_pressure_threshold, self.pressure_model)?;
        ensure_finite(self.harmonic_coupling, "harmonic_coupling")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TickError;

    #[test]
    fn test_defaults_validate() {
        assert!(ReclaimerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg: ReclaimerConfig =
            serde_json::from_str(r#"{"capacity": 8, "reference_pair": "rolling"}"#).unwrap();
        assert_eq!(cfg.capacity, 8);
        assert_eq!(cfg.reference_pair, ReferencePair::Rolling);
        assert_eq!(cfg.history_capacity, HISTORY_CAPACITY);
    }

    #[test]
    fn test_pressure_model_round_trips_through_json() {
        let cfg: ReclaimerConfig = serde_json::from_str(
            r#"{"pressure_model": {"kind": "fixed", "value": 0.5}}"#,
        )
        .unwrap();
        assert_eq!(cfg.pressure_model, PressureModel::Fixed(0.5));
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut cfg = ReclaimerConfig::with_capacity(0);
        assert!(cfg.validate().is_err());
        cfg.capacity = 4;
        cfg.high_pressure_threshold = 2.0;
        assert!(cfg.validate().is_err());
        cfg.high_pressure_threshold = 0.9;
        cfg.harmonic_coupling = f64::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_stepped_threshold_must_stay_below_one() {
        let mut cfg = ReclaimerConfig {
            high_pressure_threshold: 1.0,
            ..ReclaimerConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(TickError::InvalidInput(InvalidInput::ThresholdOutOfRange(_)))
        ));
        cfg.pressure_model = PressureModel::Continuous;
        assert!(cfg.validate().is_ok());
    }
}
