//! Element-wise operators over pairs of samples.
//!
//! `Extrapolate` continues the a-b delta by a golden-ratio step past `a`.
//! `Damp` shrinks `a` by `1 / (1 + |a - b| * THIRD)`, so distant pairs are
//! damped harder than near ones.

use serde::{Deserialize, Serialize};

use crate::constants::{EPSILON, PHI, THIRD};
use crate::error::{Degenerate, Result};
use crate::topology::{Coords, magnitude};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Extrapolate,
    Damp,
}

impl XOperator {
    pub const ALL: [XOperator; 6] = [
        XOperator::Add,
        XOperator::Subtract,
        XOperator::Multiply,
        XOperator::Divide,
        XOperator::Extrapolate,
        XOperator::Damp,
    ];

    /// Apply to a pair of vectors. For `Damp` the factor comes from the
    /// Euclidean length of `a - b`.
    pub fn apply(self, a: &Coords, b: &Coords) -> Result<Coords> {
        let out: Coords = match self {
            XOperator::Add => std::array::from_fn(|i| a[i] + b[i]),
            XOperator::Subtract => std::array::from_fn(|i| a[i] - b[i]),
            XOperator::Multiply => std::array::from_fn(|i| a[i] * b[i]),
            XOperator::Divide => {
                if let Some(axis) = b.iter().position(|v| v.abs() < EPSILON) {
                    return Err(Degenerate::DivideByZero { axis }.into());
                }
                std::array::from_fn(|i| a[i] / b[i])
            }
            XOperator::Extrapolate => std::array::from_fn(|i| a[i] + (a[i] - b[i]) * PHI),
            XOperator::Damp => {
                let step: Coords = std::array::from_fn(|i| a[i] - b[i]);
                let f = damping(magnitude(&step));
                a.map(|v| v * f)
            }
        };
        if out.iter().all(|v| v.is_finite()) {
            Ok(out)
        } else {
            Err(Degenerate::Overflow.into())
        }
    }

    pub fn apply_scalar(self, a: f64, b: f64) -> Result<f64> {
        let out = match self {
            XOperator::Add => a + b,
            XOperator::Subtract => a - b,
            XOperator::Multiply => a * b,
            XOperator::Divide => {
                if b.abs() < EPSILON {
                    return Err(Degenerate::DivideByZero { axis: 0 }.into());
                }
                a / b
            }
            XOperator::Extrapolate => a + (a - b) * PHI,
            XOperator::Damp => a * damping((a - b).abs()),
        };
        if out.is_finite() {
            Ok(out)
        } else {
            Err(Degenerate::Overflow.into())
        }
    }
}

fn damping(distance: f64) -> f64 {
    1.0 / (1.0 + distance * THIRD)
}
