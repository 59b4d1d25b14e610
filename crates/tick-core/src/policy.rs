//! Two-state drain policy.
//!
//! Pressure is re-read after every admission. At or above the high-pressure
//! threshold the policy enters `Draining`, the caller cascades the whole
//! stack, and the policy returns to `Deferring`. Below it, admissions simply
//! accumulate. There is no timer: a caller that never crosses the threshold
//! must call a manual drain to bound reclaim latency.

use serde::{Deserialize, Serialize};

use crate::pressure::PressureMonitor;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainMode {
    #[default]
    Deferring,
    Draining,
}

#[derive(Debug, Default)]
pub struct DrainPolicy {
    mode: DrainMode,
    cascades: u64,
}

impl DrainPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate a post-admission pressure reading. Returns true, leaving the
    /// policy in `Draining`, when a cascade must run before the admission
    /// returns.
    pub fn on_admission(&mut self, pressure: f64, monitor: &PressureMonitor) -> bool {
        if monitor.is_high(pressure) {
            self.mode = DrainMode::Draining;
            self.cascades += 1;
            true
        } else {
            self.mode = DrainMode::Deferring;
            false
        }
    }

    /// Mark the cascade started by `on_admission` as complete.
    pub fn finish(&mut self) {
        self.mode = DrainMode::Deferring;
    }

    pub fn mode(&self) -> DrainMode {
        self.mode
    }

    /// Cascades triggered by pressure, excluding manual drains.
    pub fn cascades(&self) -> u64 {
        self.cascades
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{HIGH_PRESSURE, LOW_PRESSURE};

    #[test]
    fn test_low_pressure_defers() {
        let monitor = PressureMonitor::default();
        let mut policy = DrainPolicy::new();
        assert!(!policy.on_admission(LOW_PRESSURE, &monitor));
        assert_eq!(policy.mode(), DrainMode::Deferring);
        assert_eq!(policy.cascades(), 0);
    }

    #[test]
    fn test_high_pressure_drains_then_defers() {
        let monitor = PressureMonitor::default();
        let mut policy = DrainPolicy::new();
        assert!(policy.on_admission(HIGH_PRESSURE, &monitor));
        assert_eq!(policy.mode(), DrainMode::Draining);
        policy.finish();
        assert_eq!(policy.mode(), DrainMode::Deferring);
        assert_eq!(policy.cascades(), 1);
    }
}
