//! Trainable analog logic gates.
//!
//! Simulates potentiometer-weighted voltage dividers feeding saturating op-amps
//! and a comparator, and trains the potentiometer positions by gradient descent
//! so the circuit reproduces a 2-input truth table.
//!
//! ```no_run
//! use analog_perceptron::{train_gate, TrainingConfig, TruthTable};
//!
//! let xor: TruthTable = "0110".parse()?;
//! let result = train_gate(&xor, &TrainingConfig::two_layer())?;
//! for row in &result.best.evaluation.rows {
//!     println!("{:?}", row);
//! }
//! # Ok::<(), analog_perceptron::CircuitError>(())
//! ```

pub mod circuit;
pub mod config;
pub mod error;
pub mod loss;
pub mod multistart;
pub mod network;
pub mod optimizer;
pub mod trainer;
pub mod truth_table;

pub use circuit::{ForwardState, Neuron, VoltageDomain, WeightBounds, DEFAULT_GAIN};
pub use config::{Topology, TrainingConfig};
pub use error::{CircuitError, Result};
pub use loss::{logistic, logistic_derivative, LossKind, LossSignal, DEFAULT_MARGIN};
pub use multistart::{train_gate, Candidate, MultiStartSelector, TrainingResult};
pub use network::{Evaluation, Network, RowReport, StepContext, TwoLayerNetwork};
pub use optimizer::{Optimizer, UpdateRule, Velocity};
pub use trainer::{AttemptReport, EpochStats, GateTrainer, TrainingOutcome};
pub use truth_table::{Example, TruthTable, INPUT_ORDER};
