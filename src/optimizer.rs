//! Weight update rules for potentiometer positions

use serde::{Deserialize, Serialize};

/// How a raw gradient turns into a weight change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateRule {
    /// `w -= lr * grad`
    #[default]
    Plain,
    /// Heavy-ball: `vel = mu * vel + lr * grad; w -= vel`
    Momentum,
    /// Heavy-ball plus an L2 pull toward zero: `w -= vel + lr * decay * w`
    MomentumDecay,
}

/// Momentum accumulators for `(w1, w2, w_bias)`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Velocity(pub [f64; 3]);

/// Stateless step function; velocity lives on each neuron
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Optimizer {
    pub rule: UpdateRule,
    /// Learning rate
    pub lr: f64,
    /// Velocity retention for the momentum rules
    pub momentum: f64,
    /// L2 coefficient for [`UpdateRule::MomentumDecay`]
    pub decay: f64,
}

impl Optimizer {
    /// Plain gradient step with the given learning rate
    pub fn new(lr: f64) -> Self {
        Self {
            rule: UpdateRule::Plain,
            lr,
            momentum: 0.9,
            decay: 1e-5,
        }
    }

    pub fn with_rule(mut self, rule: UpdateRule) -> Self {
        self.rule = rule;
        self
    }

    /// Move one weight against its gradient.
    ///
    /// Momentum rules keep moving a weight on its stored velocity even when
    /// `grad` is zero for this example.
    #[inline]
    pub fn step(&self, weight: &mut f64, velocity: &mut f64, grad: f64) {
        match self.rule {
            UpdateRule::Plain => {
                *weight -= self.lr * grad;
            }
            UpdateRule::Momentum => {
                *velocity = self.momentum * *velocity + self.lr * grad;
                *weight -= *velocity;
            }
            UpdateRule::MomentumDecay => {
                *velocity = self.momentum * *velocity + self.lr * grad;
                *weight -= *velocity + self.lr * self.decay * *weight;
            }
        }
    }
}
