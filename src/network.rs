//! Circuit topologies and their per-example training step.
//!
//! The two-layer circuit passes the hidden comparators' *binary* outputs to the
//! output neuron, so there is no true gradient path back to the hidden layer.
//! Backpropagation substitutes the logistic derivative of each hidden neuron's
//! analog distance for the comparator's derivative, and credits each hidden
//! neuron through the output weight that was in place when the example was
//! seen.

use rand::Rng;

use crate::circuit::{Neuron, WeightBounds};
use crate::config::{Topology, TrainingConfig};
use crate::loss::{logistic_derivative, LossKind, LossSignal};
use crate::optimizer::Optimizer;
use crate::truth_table::{Example, TruthTable};

/// Everything one update step needs besides the network itself
#[derive(Debug, Clone, Copy)]
pub struct StepContext {
    pub loss: LossKind,
    pub margin: f64,
    pub optimizer: Optimizer,
    pub bounds: WeightBounds,
}

impl StepContext {
    pub fn from_config(config: &TrainingConfig) -> Self {
        Self {
            loss: config.loss,
            margin: config.margin,
            optimizer: config.optimizer(),
            bounds: config.weight_bounds,
        }
    }
}

/// Two hidden comparators feeding one output comparator
#[derive(Debug, Clone)]
pub struct TwoLayerNetwork {
    pub hidden: [Neuron; 2],
    pub output: Neuron,
}

impl TwoLayerNetwork {
    pub fn new(hidden: [Neuron; 2], output: Neuron) -> Self {
        Self { hidden, output }
    }

    /// Forward pass; caches state on all three neurons
    pub fn forward(&mut self, x1: bool, x2: bool) -> bool {
        let h1 = self.hidden[0].forward(x1, x2);
        let h2 = self.hidden[1].forward(x1, x2);
        self.output.forward(h1, h2)
    }

    /// One forward + backward pass on a single example
    pub fn train_example(&mut self, example: &Example, ctx: &StepContext) -> LossSignal {
        let (x1, x2) = (example.x1, example.x2);
        let h1 = self.hidden[0].forward(x1, x2);
        let h2 = self.hidden[1].forward(x1, x2);
        self.output.forward(h1, h2);

        let signal = ctx
            .loss
            .evaluate(self.output.last().distance(), example.target, ctx.margin);
        let delta = signal.gradient;
        if delta == 0.0 {
            return signal;
        }

        // hidden blame uses the weights that produced this output
        let credit = [self.output.w1, self.output.w2];

        let grads = self.output.gradients(delta, h1, h2);
        self.output.apply_gradients(grads, &ctx.optimizer, &ctx.bounds);

        for (neuron, w) in self.hidden.iter_mut().zip(credit) {
            let surrogate = logistic_derivative(neuron.last().distance());
            let hidden_delta = delta * w * surrogate;
            let grads = neuron.gradients(hidden_delta, x1, x2);
            neuron.apply_gradients(grads, &ctx.optimizer, &ctx.bounds);
        }

        signal
    }
}

/// A trainable circuit of either supported topology
#[derive(Debug, Clone)]
pub enum Network {
    Single(Neuron),
    TwoLayer(TwoLayerNetwork),
}

impl Network {
    /// Fresh randomly initialized network for one training attempt
    pub fn new_random<R: Rng>(config: &TrainingConfig, rng: &mut R) -> Self {
        let bounds = &config.weight_bounds;
        match config.topology {
            Topology::SingleNeuron => {
                Network::Single(Neuron::new_random(config.input_domain, bounds, rng))
            }
            Topology::TwoLayer => {
                let h1 = Neuron::new_random(config.input_domain, bounds, rng);
                let h2 = Neuron::new_random(config.input_domain, bounds, rng);
                let out = Neuron::new_random(config.output_domain, bounds, rng);
                Network::TwoLayer(TwoLayerNetwork::new([h1, h2], out))
            }
        }
    }

    pub fn topology(&self) -> Topology {
        match self {
            Network::Single(_) => Topology::SingleNeuron,
            Network::TwoLayer(_) => Topology::TwoLayer,
        }
    }

    /// Neurons in evaluation order: hidden first, output last
    pub fn neurons(&self) -> Vec<&Neuron> {
        match self {
            Network::Single(n) => vec![n],
            Network::TwoLayer(net) => vec![&net.hidden[0], &net.hidden[1], &net.output],
        }
    }

    /// The neuron whose comparator drives the gate output
    pub fn output_neuron(&self) -> &Neuron {
        match self {
            Network::Single(n) => n,
            Network::TwoLayer(net) => &net.output,
        }
    }

    pub fn forward(&mut self, x1: bool, x2: bool) -> bool {
        match self {
            Network::Single(n) => n.forward(x1, x2),
            Network::TwoLayer(net) => net.forward(x1, x2),
        }
    }

    /// One forward pass plus, when the loss is not yet satisfied, one update
    pub fn train_example(&mut self, example: &Example, ctx: &StepContext) -> LossSignal {
        match self {
            Network::Single(neuron) => {
                neuron.forward(example.x1, example.x2);
                let signal = ctx
                    .loss
                    .evaluate(neuron.last().distance(), example.target, ctx.margin);
                if signal.gradient != 0.0 {
                    let grads = neuron.gradients(signal.gradient, example.x1, example.x2);
                    neuron.apply_gradients(grads, &ctx.optimizer, &ctx.bounds);
                }
                signal
            }
            Network::TwoLayer(net) => net.train_example(example, ctx),
        }
    }

    /// Score the network on the whole table without mutating it
    pub fn evaluate(&self, table: &TruthTable) -> Evaluation {
        let rows: Vec<RowReport> = table
            .examples()
            .iter()
            .map(|ex| match self {
                Network::Single(n) => {
                    let s = n.evaluate(ex.x1, ex.x2);
                    RowReport {
                        x1: ex.x1,
                        x2: ex.x2,
                        target: ex.target,
                        predicted: s.output,
                        hidden: None,
                        margin: s.margin(),
                        neuron_margins: vec![s.margin()],
                    }
                }
                Network::TwoLayer(net) => {
                    let s1 = net.hidden[0].evaluate(ex.x1, ex.x2);
                    let s2 = net.hidden[1].evaluate(ex.x1, ex.x2);
                    let so = net.output.evaluate(s1.output, s2.output);
                    RowReport {
                        x1: ex.x1,
                        x2: ex.x2,
                        target: ex.target,
                        predicted: so.output,
                        hidden: Some([s1.output, s2.output]),
                        margin: so.margin(),
                        neuron_margins: vec![s1.margin(), s2.margin(), so.margin()],
                    }
                }
            })
            .collect();

        Evaluation::from_rows(rows)
    }
}

/// Verification of one truth-table row
#[derive(Debug, Clone, PartialEq)]
pub struct RowReport {
    pub x1: bool,
    pub x2: bool,
    pub target: bool,
    pub predicted: bool,
    /// Hidden comparator outputs (two-layer only)
    pub hidden: Option<[bool; 2]>,
    /// `|v_a - v_bias|` of the output neuron
    pub margin: f64,
    /// `|v_a - v_bias|` of every neuron, hidden first
    pub neuron_margins: Vec<f64>,
}

impl RowReport {
    pub fn is_correct(&self) -> bool {
        self.predicted == self.target
    }

    /// Smallest margin of any neuron on this row
    pub fn min_margin(&self) -> f64 {
        self.neuron_margins
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min)
    }
}

/// Whole-table score of a trained network
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub rows: Vec<RowReport>,
    /// Rows where the gate output differs from the target
    pub mismatches: usize,
    /// Smallest `|v_a - v_bias|` over all neurons and all rows
    pub min_margin: f64,
}

impl Evaluation {
    fn from_rows(rows: Vec<RowReport>) -> Self {
        let mismatches = rows.iter().filter(|r| !r.is_correct()).count();
        let min_margin = rows
            .iter()
            .map(RowReport::min_margin)
            .fold(f64::INFINITY, f64::min);
        Self {
            rows,
            mismatches,
            min_margin,
        }
    }

    /// Every row reproduced
    pub fn is_perfect(&self) -> bool {
        self.mismatches == 0
    }

    /// Fewer mismatches wins; equal mismatches go to the larger minimum margin
    pub fn ranks_above(&self, other: &Evaluation) -> bool {
        self.mismatches < other.mismatches
            || (self.mismatches == other.mismatches && self.min_margin > other.min_margin)
    }
}
