//! Training loop for one attempt

use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::TrainingConfig;
use crate::network::{Network, StepContext};
use crate::truth_table::TruthTable;

/// How an attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingOutcome {
    /// The epoch error signal reached zero (hinge) or the tolerance
    Converged,
    /// The epoch budget ran out; weights are whatever training ended with
    BudgetExhausted,
}

impl TrainingOutcome {
    pub fn is_converged(&self) -> bool {
        *self == TrainingOutcome::Converged
    }
}

/// Summary of one pass over the shuffled table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochStats {
    /// Violation count (hinge) or accumulated squared error
    pub error: f64,
    /// Examples that triggered a weight update
    pub updates: usize,
}

/// Result of a single training attempt
#[derive(Debug, Clone)]
pub struct AttemptReport {
    pub outcome: TrainingOutcome,
    /// Epochs actually run
    pub epochs: usize,
    /// Error signal of the last epoch
    pub final_error: f64,
}

/// Trains one network on one truth table with stochastic per-example updates
pub struct GateTrainer<R> {
    pub network: Network,
    ctx: StepContext,
    tolerance: f64,
    max_epochs: usize,
    rng: R,
    pub epoch: usize,
}

impl<R: Rng> GateTrainer<R> {
    /// Create a trainer with a freshly randomized network drawn from `rng`
    pub fn new(config: &TrainingConfig, mut rng: R) -> Self {
        let network = Network::new_random(config, &mut rng);
        Self::with_network(network, config, rng)
    }

    /// Create a trainer around an existing network
    pub fn with_network(network: Network, config: &TrainingConfig, rng: R) -> Self {
        Self {
            network,
            ctx: StepContext::from_config(config),
            tolerance: config.tolerance(),
            max_epochs: config.max_epochs,
            rng,
            epoch: 0,
        }
    }

    /// Train for one epoch over the table in a fresh random order
    pub fn train_epoch(&mut self, truth_table: &TruthTable) -> EpochStats {
        let mut order = *truth_table.examples();
        order.shuffle(&mut self.rng);

        let mut stats = EpochStats {
            error: 0.0,
            updates: 0,
        };
        for example in &order {
            let signal = self.network.train_example(example, &self.ctx);
            stats.error += signal.error;
            if signal.gradient != 0.0 {
                stats.updates += 1;
            }
        }

        self.epoch += 1;
        stats
    }

    /// Train until convergence or until the epoch budget is spent
    pub fn train(&mut self, truth_table: &TruthTable) -> AttemptReport {
        let mut final_error = f64::INFINITY;

        for _ in 0..self.max_epochs {
            let stats = self.train_epoch(truth_table);
            final_error = stats.error;

            if self.ctx.loss.is_converged(stats.error, self.tolerance) {
                debug!("Converged after {} epochs (error {:.3e})", self.epoch, stats.error);
                return AttemptReport {
                    outcome: TrainingOutcome::Converged,
                    epochs: self.epoch,
                    final_error,
                };
            }
        }

        debug!(
            "Epoch budget of {} exhausted (last error {:.3e})",
            self.max_epochs, final_error
        );
        AttemptReport {
            outcome: TrainingOutcome::BudgetExhausted,
            epochs: self.epoch,
            final_error,
        }
    }

    pub fn into_network(self) -> Network {
        self.network
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Topology;
    use crate::loss::LossKind;
    use crate::optimizer::UpdateRule;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn single_config() -> TrainingConfig {
        TrainingConfig {
            max_epochs: 20_000,
            ..TrainingConfig::single_neuron()
        }
    }

    #[test]
    fn test_or_converges() {
        let table = TruthTable::from_fn(|a, b| a || b);
        let mut trainer = GateTrainer::new(&single_config(), StdRng::seed_from_u64(11));
        let report = trainer.train(&table);

        assert_eq!(report.outcome, TrainingOutcome::Converged);
        assert_eq!(report.epochs, trainer.epoch);
        assert!(report.epochs < 20_000);
        assert_eq!(report.final_error, 0.0);
        let eval = trainer.network.evaluate(&table);
        assert!(eval.is_perfect());
        // hinge convergence means every margin was met on the last epoch
        assert!(eval.min_margin >= 0.3 - 1e-9);
    }

    #[test]
    fn test_converged_hinge_epoch_is_a_no_op() {
        let table = TruthTable::from_fn(|a, b| a || b);
        let mut trainer = GateTrainer::new(&single_config(), StdRng::seed_from_u64(5));
        assert!(trainer.train(&table).outcome.is_converged());

        let before = trainer.network.neurons()[0].clone();
        let stats = trainer.train_epoch(&table);
        let after = trainer.network.neurons()[0];

        assert_eq!(stats.updates, 0);
        assert_eq!(stats.error, 0.0);
        assert_eq!((before.w1, before.w2, before.w_bias), (after.w1, after.w2, after.w_bias));
    }

    #[test]
    fn test_xor_exhausts_budget() {
        let table = TruthTable::from_fn(|a, b| a ^ b);
        let config = TrainingConfig {
            max_epochs: 2_000,
            ..single_config()
        };
        let mut trainer = GateTrainer::new(&config, StdRng::seed_from_u64(2));
        let report = trainer.train(&table);

        assert_eq!(report.outcome, TrainingOutcome::BudgetExhausted);
        assert_eq!(report.epochs, 2_000);
        assert!(trainer.network.evaluate(&table).mismatches > 0);
    }

    #[test]
    fn test_same_seed_same_trajectory() {
        let table = TruthTable::from_fn(|a, b| a ^ b);
        let config = TrainingConfig {
            max_epochs: 300,
            ..TrainingConfig::two_layer()
        };
        let run = |seed| {
            let mut t = GateTrainer::new(&config, StdRng::seed_from_u64(seed));
            t.train(&table);
            t.into_network()
                .neurons()
                .iter()
                .map(|n| (n.w1, n.w2, n.w_bias))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(9), run(9));
        assert_ne!(run(9), run(10));
    }

    #[test]
    fn test_squared_error_losses_stay_in_bounds() {
        let table = TruthTable::from_fn(|a, b| !(a && b));
        for (loss, update) in [
            (LossKind::ShiftedMse, UpdateRule::MomentumDecay),
            (LossKind::Logistic, UpdateRule::Plain),
        ] {
            let config = TrainingConfig {
                topology: Topology::SingleNeuron,
                loss,
                update,
                max_epochs: 500,
                ..TrainingConfig::single_neuron()
            };
            let mut trainer = GateTrainer::new(&config, StdRng::seed_from_u64(4));
            let report = trainer.train(&table);
            assert!(report.final_error.is_finite());
            let n = trainer.network.neurons()[0];
            assert!((0.0..=1.0).contains(&n.w1));
            assert!(n.w_bias * n.domain().v_supply <= n.domain().v_sat + 1e-12);
        }
    }
}
