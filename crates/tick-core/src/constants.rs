/// Golden ratio: (1 + √5) / 2
pub const PHI: f64 = 1.618_033_988_749_895;

/// Damping coefficient applied to delta magnitude in harmonic coupling.
pub const THIRD: f64 = 1.0 / 3.0;

/// Numerical epsilon for near-zero comparisons
pub const EPSILON: f64 = 1e-10;

/// Dimensionality of a vector sample.
pub const DIM: usize = 11;

/// Samples retained by a delta topology before the oldest is evicted.
pub const HISTORY_CAPACITY: usize = 50;

/// Default number of pending reclaim requests a stack may hold.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Weight at which the weight factor saturates to 1.0.
pub const WEIGHT_NORM: f64 = 1024.0;

/// Scores below this are treated as low-confidence and attenuated.
pub const CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Multiplier applied to low-confidence scores.
pub const LOW_CONFIDENCE_PENALTY: f64 = 0.8;

/// Reference-count factor for multiply-referenced requests.
pub const SHARED_REF_FACTOR: f64 = 0.7;

/// Reference-count factor for singly-referenced requests.
pub const SINGLE_REF_FACTOR: f64 = 0.3;

/// Pressure at or above which the drain policy cascades immediately.
pub const HIGH_PRESSURE_THRESHOLD: f64 = 0.9;

/// Stepped pressure reading while occupancy is at or below the threshold.
pub const LOW_PRESSURE: f64 = 0.5;

/// Stepped pressure reading once occupancy exceeds the threshold.
pub const HIGH_PRESSURE: f64 = 0.9;

/// Incidents retained before the oldest is evicted.
pub const INCIDENT_HISTORY: usize = 16;
