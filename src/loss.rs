//! Surrogate losses for the comparator decision.
//!
//! The comparator output is a step function of `z = v_a - v_bias` and has no
//! useful derivative, so every loss here is written in terms of the analog
//! distance `z` instead. Each loss returns `dL/dz`; the chain rule through the
//! divider and amplifier is done by [`crate::Neuron::gradients`].

use serde::{Deserialize, Serialize};

/// Margin the reference circuit trains for, in volts
pub const DEFAULT_MARGIN: f64 = 0.3;

/// Numerically safe logistic function.
///
/// Saturates to exactly 0 or 1 instead of overflowing for large `|x|`.
#[inline]
pub fn logistic(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Derivative of [`logistic`]: `s * (1 - s)`
#[inline]
pub fn logistic_derivative(x: f64) -> f64 {
    let s = logistic(x);
    s * (1.0 - s)
}

/// Loss strategy selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossKind {
    /// `max(0, m - y_sign * z)`, subgradient `-y_sign` while violated
    #[default]
    Hinge,
    /// Squared error of `logistic(z - y_sign * m)`, zero once past the margin
    ShiftedMse,
    /// Squared error of `logistic(z)` with no margin, always active
    Logistic,
}

/// Per-example loss evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossSignal {
    /// `dL/dz`; exactly zero when no update should happen
    pub gradient: f64,
    /// Contribution to the epoch error signal
    pub error: f64,
    /// Whether this example still needs correcting
    pub active: bool,
}

impl LossSignal {
    const SATISFIED: Self = Self {
        gradient: 0.0,
        error: 0.0,
        active: false,
    };
}

impl LossKind {
    /// Evaluate the loss at distance `z` for a binary `target`
    pub fn evaluate(self, z: f64, target: bool, margin: f64) -> LossSignal {
        let y = if target { 1.0 } else { 0.0 };
        let y_sign = if target { 1.0 } else { -1.0 };

        match self {
            LossKind::Hinge => {
                let violation = (margin - y_sign * z).max(0.0);
                if violation > 0.0 {
                    // counted, not summed: the epoch signal is the violation count
                    LossSignal {
                        gradient: -y_sign,
                        error: 1.0,
                        active: true,
                    }
                } else {
                    LossSignal::SATISFIED
                }
            }
            LossKind::ShiftedMse => {
                if y_sign * z > margin {
                    return LossSignal::SATISFIED;
                }
                let shifted = z - y_sign * margin;
                let error = y - logistic(shifted);
                LossSignal {
                    gradient: -2.0 * error * logistic_derivative(shifted),
                    error: error * error,
                    active: true,
                }
            }
            LossKind::Logistic => {
                let error = y - logistic(z);
                LossSignal {
                    gradient: -2.0 * error * logistic_derivative(z),
                    error: error * error,
                    active: true,
                }
            }
        }
    }

    /// Epoch error below which training stops for the squared-error losses
    pub fn default_tolerance(self) -> f64 {
        match self {
            LossKind::Hinge => 0.0,
            LossKind::ShiftedMse => 1e-6,
            LossKind::Logistic => 1e-5,
        }
    }

    /// Whether an accumulated epoch error means training is done
    pub fn is_converged(self, epoch_error: f64, tolerance: f64) -> bool {
        match self {
            LossKind::Hinge => epoch_error == 0.0,
            LossKind::ShiftedMse | LossKind::Logistic => epoch_error < tolerance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_logistic_saturates() {
        assert_eq!(logistic(1e6), 1.0);
        assert_eq!(logistic(-1e6), 0.0);
        assert_eq!(logistic_derivative(1e6), 0.0);
        assert_eq!(logistic_derivative(-1e6), 0.0);
        assert!(logistic(-745.0).is_finite());
        assert_relative_eq!(logistic(0.0), 0.5);
        assert_relative_eq!(logistic_derivative(0.0), 0.25);
    }

    #[test]
    fn test_logistic_symmetry() {
        for x in [0.1, 1.0, 3.7, 20.0] {
            assert_relative_eq!(logistic(x) + logistic(-x), 1.0, epsilon = 1e-12);
            assert_relative_eq!(logistic_derivative(x), logistic_derivative(-x), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_hinge_branches() {
        // target 1, well past margin
        let s = LossKind::Hinge.evaluate(0.5, true, 0.3);
        assert!(!s.active);
        assert_eq!(s.gradient, 0.0);

        // target 1, correct side but inside the margin
        let s = LossKind::Hinge.evaluate(0.1, true, 0.3);
        assert!(s.active);
        assert_eq!(s.gradient, -1.0);

        // target 0, wrong side
        let s = LossKind::Hinge.evaluate(0.4, false, 0.3);
        assert!(s.active);
        assert_eq!(s.gradient, 1.0);

        // exactly on the margin boundary is satisfied
        let s = LossKind::Hinge.evaluate(-0.25, false, 0.25);
        assert!(!s.active);
    }

    #[test]
    fn test_shifted_mse() {
        let s = LossKind::ShiftedMse.evaluate(-0.31, false, 0.3);
        assert_eq!(s, LossSignal::SATISFIED);

        let s = LossKind::ShiftedMse.evaluate(0.3, true, 0.3);
        assert!(s.active);
        // shifted to 0: pred 0.5, error 0.5
        assert_relative_eq!(s.error, 0.25);
        assert_relative_eq!(s.gradient, -2.0 * 0.5 * 0.25);

        // target 0 above threshold pushes z down: positive gradient
        let s = LossKind::ShiftedMse.evaluate(1.0, false, 0.3);
        assert!(s.gradient > 0.0);
    }

    #[test]
    fn test_logistic_loss_always_active() {
        let s = LossKind::Logistic.evaluate(50.0, true, 0.3);
        assert!(s.active);
        assert!(s.error < 1e-12);
        let s = LossKind::Logistic.evaluate(-2.0, true, 0.3);
        assert!(s.gradient < 0.0);
    }

    #[test]
    fn test_convergence_rules() {
        assert!(LossKind::Hinge.is_converged(0.0, 0.0));
        assert!(!LossKind::Hinge.is_converged(1.0, 10.0));
        let tol = LossKind::ShiftedMse.default_tolerance();
        assert!(LossKind::ShiftedMse.is_converged(0.0, tol));
        assert!(!LossKind::ShiftedMse.is_converged(1e-3, tol));
    }
}
