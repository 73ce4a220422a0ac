//! Training configuration, loadable from TOML.
//!
//! Every key has a default, so a file only needs the keys it overrides. A
//! partial `[input_domain]` or `[output_domain]` table fills its missing
//! constants from that layer's own preset, not from the other layer.
//!
//! ```
//! use analog_perceptron::{LossKind, Topology, TrainingConfig};
//!
//! let config = TrainingConfig::from_toml_str(
//!     r#"
//!     topology = "two_layer"
//!     loss = "shifted_mse"
//!     update = "momentum_decay"
//!     attempts = 20
//!
//!     [weight_bounds]
//!     min = 0.1
//!     max = 0.9
//!     "#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.topology, Topology::TwoLayer);
//! assert_eq!(config.loss, LossKind::ShiftedMse);
//! assert_eq!(config.attempts, 20);
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::circuit::{VoltageDomain, WeightBounds};
use crate::error::{CircuitError, Result};
use crate::loss::{LossKind, DEFAULT_MARGIN};
use crate::optimizer::{Optimizer, UpdateRule};

/// Which circuit is trained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    /// One comparator fed directly by the two inputs
    SingleNeuron,
    /// Two hidden comparators feeding one output comparator
    #[default]
    TwoLayer,
}

/// All knobs of one training run (every attempt of a multi-start search)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub topology: Topology,
    pub loss: LossKind,
    pub update: UpdateRule,
    /// Learning rate
    pub learning_rate: f64,
    /// Epoch budget per attempt
    pub max_epochs: usize,
    /// Velocity retention for the momentum rules
    pub momentum: f64,
    /// L2 coefficient for `momentum_decay`
    pub decay: f64,
    /// Required separation from the threshold, in volts
    pub margin: f64,
    /// Epoch squared-error below which an attempt stops; `None` uses the
    /// loss default. Ignored by the hinge loss.
    pub tolerance: Option<f64>,
    /// Independent attempts in the multi-start search
    pub attempts: usize,
    /// Minimum margin (volts) that ends the search early on a perfect candidate
    pub acceptable_margin: f64,
    /// Domain of the lone neuron, or of the hidden pair
    #[serde(deserialize_with = "input_domain")]
    pub input_domain: VoltageDomain,
    /// Domain of the output neuron in the two-layer topology
    #[serde(deserialize_with = "output_domain")]
    pub output_domain: VoltageDomain,
    pub weight_bounds: WeightBounds,
    /// Master seed; `None` draws one from the OS
    pub seed: Option<u64>,
    /// Run attempts on the rayon pool
    pub parallel: bool,
}

impl TrainingConfig {
    /// Hinge loss with plain steps on one neuron
    pub fn single_neuron() -> Self {
        Self {
            topology: Topology::SingleNeuron,
            loss: LossKind::Hinge,
            update: UpdateRule::Plain,
            learning_rate: 0.001,
            max_epochs: 500_000,
            ..Self::two_layer()
        }
    }

    /// Hinge loss with momentum on the 2-hidden + 1-output circuit
    pub fn two_layer() -> Self {
        Self {
            topology: Topology::TwoLayer,
            loss: LossKind::Hinge,
            update: UpdateRule::Momentum,
            learning_rate: 0.005,
            max_epochs: 50_000,
            momentum: 0.9,
            decay: 1e-5,
            margin: DEFAULT_MARGIN,
            tolerance: None,
            attempts: 10,
            acceptable_margin: 0.2,
            input_domain: VoltageDomain::input_layer(),
            output_domain: VoltageDomain::output_layer(),
            weight_bounds: WeightBounds::default(),
            seed: None,
            parallel: false,
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(&path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|err| CircuitError::ConfigParse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Epoch error threshold in effect for the configured loss
    pub fn tolerance(&self) -> f64 {
        self.tolerance
            .unwrap_or_else(|| self.loss.default_tolerance())
    }

    pub fn optimizer(&self) -> Optimizer {
        Optimizer {
            rule: self.update,
            lr: self.learning_rate,
            momentum: self.momentum,
            decay: self.decay,
        }
    }

    /// Domains that carry neurons under the configured topology
    fn active_domains(&self) -> Vec<(&'static str, &VoltageDomain)> {
        match self.topology {
            Topology::SingleNeuron => vec![("input_domain", &self.input_domain)],
            Topology::TwoLayer => vec![
                ("input_domain", &self.input_domain),
                ("output_domain", &self.output_domain),
            ],
        }
    }

    /// Check every parameter before any training starts
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(CircuitError::InvalidConfig(msg));

        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return invalid(format!("learning_rate must be positive, got {}", self.learning_rate));
        }
        if self.max_epochs == 0 {
            return invalid("max_epochs must be at least 1".into());
        }
        if self.attempts == 0 {
            return invalid("attempts must be at least 1".into());
        }
        if !(0.0..1.0).contains(&self.momentum) {
            return invalid(format!("momentum must be in [0, 1), got {}", self.momentum));
        }
        if !(self.decay >= 0.0 && self.decay.is_finite()) {
            return invalid(format!("decay must be non-negative, got {}", self.decay));
        }
        if !(self.margin >= 0.0 && self.margin.is_finite()) {
            return invalid(format!("margin must be non-negative, got {}", self.margin));
        }
        if let Some(tol) = self.tolerance {
            if !(tol >= 0.0) {
                return invalid(format!("tolerance must be non-negative, got {}", tol));
            }
        }

        let b = &self.weight_bounds;
        if !(b.min.is_finite() && b.max.is_finite() && b.min >= 0.0 && b.min <= b.max) {
            return invalid(format!(
                "weight bounds must satisfy 0 <= min <= max, got [{}, {}]",
                b.min, b.max
            ));
        }
        if !(b.bias_headroom >= 0.0) {
            return invalid(format!("bias_headroom must be non-negative, got {}", b.bias_headroom));
        }

        for (name, domain) in self.active_domains() {
            if let Some(field) = domain.first_non_positive() {
                return invalid(format!("{}.{} must be positive", name, field));
            }
            let ceiling = b.bias_ceiling(domain);
            if ceiling < b.min {
                return invalid(format!(
                    "{}: bias ceiling {:.3} is below the minimum weight {:.3}",
                    name, ceiling, b.min
                ));
            }
        }

        Ok(())
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self::two_layer()
    }
}

/// A domain table as written in a config file
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct DomainOverrides {
    v_signal: Option<f64>,
    v_supply: Option<f64>,
    v_ref: Option<f64>,
    v_sat: Option<f64>,
    gain: Option<f64>,
}

impl DomainOverrides {
    fn apply(self, base: VoltageDomain) -> VoltageDomain {
        VoltageDomain {
            v_signal: self.v_signal.unwrap_or(base.v_signal),
            v_supply: self.v_supply.unwrap_or(base.v_supply),
            v_ref: self.v_ref.unwrap_or(base.v_ref),
            v_sat: self.v_sat.unwrap_or(base.v_sat),
            gain: self.gain.unwrap_or(base.gain),
        }
    }
}

fn input_domain<'de, D>(deserializer: D) -> std::result::Result<VoltageDomain, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(DomainOverrides::deserialize(deserializer)?.apply(VoltageDomain::input_layer()))
}

fn output_domain<'de, D>(deserializer: D) -> std::result::Result<VoltageDomain, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(DomainOverrides::deserialize(deserializer)?.apply(VoltageDomain::output_layer()))
}
