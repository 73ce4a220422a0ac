//! Analog Neuron Circuit
//!
//! Forward model of one potentiometer-weighted comparator stage:
//!
//! - Two input potentiometers tap `w * v_signal` onto a resistive divider that
//!   always includes the virtual-ground reference `v_ref`
//! - An op-amp amplifies the divider output around `v_ref` and saturates at
//!   `0..=v_sat`
//! - A bias potentiometer sets the comparator threshold `w_bias * v_supply`,
//!   also limited to `v_sat`
//! - The comparator emits 1 when the amplified voltage exceeds the threshold

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::optimizer::{Optimizer, Velocity};

/// Default op-amp gain used by every stage of the reference circuit
pub const DEFAULT_GAIN: f64 = 3.2;

/// Electrical constants shared by every neuron in one layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoltageDomain {
    /// Voltage applied to an input potentiometer when its switch closes
    pub v_signal: f64,
    /// Supply across the bias potentiometer
    pub v_supply: f64,
    /// Virtual ground the amplifier swings around
    pub v_ref: f64,
    /// Maximum amplifier output
    pub v_sat: f64,
    /// Amplifier gain
    pub gain: f64,
}

impl VoltageDomain {
    pub fn new(v_signal: f64, v_supply: f64, v_ref: f64, v_sat: f64, gain: f64) -> Self {
        Self {
            v_signal,
            v_supply,
            v_ref,
            v_sat,
            gain,
        }
    }

    /// First layer (or the lone neuron): 9V signal and supply, 7.5V saturation
    pub fn input_layer() -> Self {
        Self::new(9.0, 9.0, 4.5, 7.5, DEFAULT_GAIN)
    }

    /// Output layer driven by first-layer outputs: 7.5V signal, 6V saturation
    pub fn output_layer() -> Self {
        Self::new(7.5, 7.5, 3.75, 6.0, DEFAULT_GAIN)
    }

    /// Voltage tapped from an input potentiometer at fraction `w`
    #[inline]
    pub fn weight_voltage(&self, w: f64) -> f64 {
        w * self.v_signal
    }

    /// Voltage tapped from the bias potentiometer at fraction `w`
    #[inline]
    pub fn bias_voltage(&self, w: f64) -> f64 {
        w * self.v_supply
    }

    /// Returns the name of the first non-positive constant, if any
    pub(crate) fn first_non_positive(&self) -> Option<&'static str> {
        [
            ("v_signal", self.v_signal),
            ("v_supply", self.v_supply),
            ("v_ref", self.v_ref),
            ("v_sat", self.v_sat),
            ("gain", self.gain),
        ]
        .into_iter()
        .find(|&(_, v)| !(v > 0.0 && v.is_finite()))
        .map(|(name, _)| name)
    }
}

impl Default for VoltageDomain {
    fn default() -> Self {
        Self::input_layer()
    }
}

/// Allowed potentiometer positions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightBounds {
    pub min: f64,
    pub max: f64,
    /// Volts kept free between the highest bias threshold and `v_sat`
    pub bias_headroom: f64,
}

impl WeightBounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            bias_headroom: 0.0,
        }
    }

    /// Highest bias fraction for a domain.
    ///
    /// The threshold must stay reachable by the amplifier, otherwise the
    /// comparator could never flip to 1.
    pub fn bias_ceiling(&self, domain: &VoltageDomain) -> f64 {
        self.max
            .min((domain.v_sat - self.bias_headroom) / domain.v_supply)
    }

    #[inline]
    fn clip(&self, w: f64, hi: f64) -> f64 {
        w.max(self.min).min(hi)
    }
}

impl Default for WeightBounds {
    fn default() -> Self {
        Self::new(0.0, 1.0)
    }
}

/// Intermediate voltages of one forward pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForwardState {
    /// Divider output before amplification
    pub v_in: f64,
    /// Saturated amplifier output
    pub v_a: f64,
    /// Comparator threshold
    pub v_bias: f64,
    /// Number of resistors in the divider (reference plus closed inputs)
    pub n: f64,
    /// Comparator output
    pub output: bool,
}

impl ForwardState {
    /// Signed distance to the threshold, `v_a - v_bias`
    #[inline]
    pub fn distance(&self) -> f64 {
        self.v_a - self.v_bias
    }

    /// Unsigned decision margin
    #[inline]
    pub fn margin(&self) -> f64 {
        self.distance().abs()
    }
}

impl Default for ForwardState {
    fn default() -> Self {
        Self {
            v_in: 0.0,
            v_a: 0.0,
            v_bias: 0.0,
            n: 1.0,
            output: false,
        }
    }
}

/// One comparator stage with trainable potentiometer positions
#[derive(Debug, Clone)]
pub struct Neuron {
    /// Input 1 potentiometer fraction
    pub w1: f64,
    /// Input 2 potentiometer fraction
    pub w2: f64,
    /// Bias potentiometer fraction
    pub w_bias: f64,
    pub(crate) velocity: Velocity,
    domain: VoltageDomain,
    last: ForwardState,
}

impl Neuron {
    /// Create a neuron with explicit weights and zero velocity
    pub fn new(domain: VoltageDomain, w1: f64, w2: f64, w_bias: f64) -> Self {
        Self {
            w1,
            w2,
            w_bias,
            velocity: Velocity::default(),
            domain,
            last: ForwardState::default(),
        }
    }

    /// Create a neuron with weights drawn uniformly from `bounds`
    pub fn new_random<R: Rng>(
        domain: VoltageDomain,
        bounds: &WeightBounds,
        rng: &mut R,
    ) -> Self {
        let mut sample = || {
            if bounds.max > bounds.min {
                rng.random_range(bounds.min..=bounds.max)
            } else {
                bounds.min
            }
        };
        let (w1, w2, w_bias) = (sample(), sample(), sample());
        let mut neuron = Self::new(domain, w1, w2, w_bias);
        neuron.clip(bounds);
        neuron
    }

    pub fn domain(&self) -> &VoltageDomain {
        &self.domain
    }

    /// State cached by the most recent [`Neuron::forward`] call
    pub fn last(&self) -> &ForwardState {
        &self.last
    }

    /// Compute the forward pass without touching the cache
    pub fn evaluate(&self, x1: bool, x2: bool) -> ForwardState {
        let d = &self.domain;

        let mut sum = d.v_ref;
        let mut n = 1.0;
        if x1 {
            sum += d.weight_voltage(self.w1);
            n += 1.0;
        }
        if x2 {
            sum += d.weight_voltage(self.w2);
            n += 1.0;
        }
        let v_in = sum / n;

        let v_a_raw = d.v_ref + d.gain * (v_in - d.v_ref);
        let v_a = v_a_raw.clamp(0.0, d.v_sat);
        let v_bias = d.bias_voltage(self.w_bias).clamp(0.0, d.v_sat);

        ForwardState {
            v_in,
            v_a,
            v_bias,
            n,
            output: v_a > v_bias,
        }
    }

    /// Run the forward pass and overwrite the cached state
    pub fn forward(&mut self, x1: bool, x2: bool) -> bool {
        self.last = self.evaluate(x1, x2);
        self.last.output
    }

    /// Partial derivatives of the loss w.r.t. `(w1, w2, w_bias)` given
    /// `delta = dL/dz` at the cached forward state.
    ///
    /// An open input switch removes its potentiometer from the divider, so its
    /// gradient is zero.
    pub fn gradients(&self, delta: f64, x1: bool, x2: bool) -> [f64; 3] {
        let d = &self.domain;
        let input_grad = delta * (d.gain / self.last.n) * d.v_signal;
        [
            if x1 { input_grad } else { 0.0 },
            if x2 { input_grad } else { 0.0 },
            delta * -1.0 * d.v_supply,
        ]
    }

    /// Apply one optimizer step per weight, then clip to the physical range
    pub fn apply_gradients(&mut self, grads: [f64; 3], optimizer: &Optimizer, bounds: &WeightBounds) {
        let weights = [&mut self.w1, &mut self.w2, &mut self.w_bias];
        for ((w, vel), grad) in weights
            .into_iter()
            .zip(self.velocity.0.iter_mut())
            .zip(grads)
        {
            optimizer.step(w, vel, grad);
        }
        self.clip(bounds);
    }

    /// Force all weights into `bounds`, including the bias ceiling
    pub fn clip(&mut self, bounds: &WeightBounds) {
        self.w1 = bounds.clip(self.w1, bounds.max);
        self.w2 = bounds.clip(self.w2, bounds.max);
        self.w_bias = bounds.clip(self.w_bias, bounds.bias_ceiling(&self.domain));
    }

    /// Weights expressed as tapped voltages `(v1, v2, v_bias)`
    pub fn weight_voltages(&self) -> [f64; 3] {
        [
            self.domain.weight_voltage(self.w1),
            self.domain.weight_voltage(self.w2),
            self.domain.bias_voltage(self.w_bias),
        ]
    }

    /// Wiper-to-ground resistance of each potentiometer, in the unit of
    /// `full_scale` (10 kOhm parts in the reference build)
    pub fn resistances(&self, full_scale: f64) -> [f64; 3] {
        [self.w1, self.w2, self.w_bias].map(|w| w * full_scale)
    }
}
