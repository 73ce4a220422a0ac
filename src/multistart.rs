//! Multi-start search
//!
//! Runs independent training attempts from fresh random weights and keeps the
//! best by mismatch count, then minimum margin. Each attempt owns its network
//! and an RNG seeded from a per-attempt seed drawn up front from the master
//! seed, so attempts can run on the rayon pool without sharing any state.

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::config::TrainingConfig;
use crate::error::Result;
use crate::network::{Evaluation, Network};
use crate::trainer::{GateTrainer, TrainingOutcome};
use crate::truth_table::TruthTable;

/// One trained attempt and its score
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Zero-based attempt index
    pub attempt: usize,
    pub network: Network,
    pub outcome: TrainingOutcome,
    pub epochs: usize,
    pub evaluation: Evaluation,
}

impl Candidate {
    /// Selection order; ties go to the earlier attempt
    fn better(self, other: Candidate) -> Candidate {
        if other.evaluation.ranks_above(&self.evaluation)
            || (!self.evaluation.ranks_above(&other.evaluation) && other.attempt < self.attempt)
        {
            other
        } else {
            self
        }
    }
}

/// Outcome of a multi-start search
#[derive(Debug, Clone)]
pub struct TrainingResult {
    /// Best candidate found
    pub best: Candidate,
    /// Attempts actually trained
    pub attempts_run: usize,
    /// Best `(mismatches, min_margin)` so far, after each attempt
    pub history: Vec<(usize, f64)>,
    /// Master seed, for reproducing the run
    pub seed: u64,
}

impl TrainingResult {
    pub fn mismatches(&self) -> usize {
        self.best.evaluation.mismatches
    }

    pub fn min_margin(&self) -> f64 {
        self.best.evaluation.min_margin
    }

    pub fn is_perfect(&self) -> bool {
        self.best.evaluation.is_perfect()
    }
}

/// Runs up to `config.attempts` training attempts and selects the best
#[derive(Debug, Clone)]
pub struct MultiStartSelector {
    config: TrainingConfig,
}

impl MultiStartSelector {
    pub fn new(config: TrainingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Whether a candidate is good enough to stop searching
    pub fn is_acceptable(&self, evaluation: &Evaluation) -> bool {
        evaluation.is_perfect() && evaluation.min_margin > self.config.acceptable_margin
    }

    /// Train one attempt from its own seed
    pub fn run_attempt(&self, truth_table: &TruthTable, attempt: usize, seed: u64) -> Candidate {
        let mut trainer = GateTrainer::new(&self.config, StdRng::seed_from_u64(seed));
        let report = trainer.train(truth_table);
        let network = trainer.into_network();
        let evaluation = network.evaluate(truth_table);

        debug!(
            "Attempt {}: {:?} after {} epochs, {} mismatches, min margin {:.3}V",
            attempt + 1,
            report.outcome,
            report.epochs,
            evaluation.mismatches,
            evaluation.min_margin
        );

        Candidate {
            attempt,
            network,
            outcome: report.outcome,
            epochs: report.epochs,
            evaluation,
        }
    }

    /// Run the search on `truth_table`
    pub fn run(&self, truth_table: &TruthTable) -> TrainingResult {
        let seed = self.config.seed.unwrap_or_else(|| rand::rng().random());
        let mut master = StdRng::seed_from_u64(seed);
        let seeds: Vec<u64> = (0..self.config.attempts).map(|_| master.random()).collect();

        info!(
            "Training {} for {:?} ({:?} loss, {:?} updates), up to {} attempts, seed {}",
            truth_table,
            self.config.topology,
            self.config.loss,
            self.config.update,
            self.config.attempts,
            seed
        );

        let result = if self.config.parallel {
            self.run_parallel(truth_table, &seeds, seed)
        } else {
            self.run_sequential(truth_table, &seeds, seed)
        };

        if result.is_perfect() {
            info!(
                "Selected attempt {}: all rows correct, min margin {:.3}V",
                result.best.attempt + 1,
                result.min_margin()
            );
        } else {
            warn!(
                "No perfect candidate in {} attempts; best has {} mismatches",
                result.attempts_run,
                result.mismatches()
            );
        }
        result
    }

    fn run_sequential(&self, truth_table: &TruthTable, seeds: &[u64], seed: u64) -> TrainingResult {
        let mut best: Option<Candidate> = None;
        let mut history = Vec::with_capacity(seeds.len());

        for (attempt, &attempt_seed) in seeds.iter().enumerate() {
            let candidate = self.run_attempt(truth_table, attempt, attempt_seed);
            let current = match best.take() {
                Some(prev) => prev.better(candidate),
                None => candidate,
            };
            history.push((current.evaluation.mismatches, current.evaluation.min_margin));

            let done = self.is_acceptable(&current.evaluation);
            best = Some(current);
            if done {
                debug!("Attempt {} is acceptable, stopping early", attempt + 1);
                break;
            }
        }

        TrainingResult {
            attempts_run: history.len(),
            best: best.expect("at least one attempt is configured"),
            history,
            seed,
        }
    }

    fn run_parallel(&self, truth_table: &TruthTable, seeds: &[u64], seed: u64) -> TrainingResult {
        let candidates: Vec<Candidate> = seeds
            .par_iter()
            .enumerate()
            .map(|(attempt, &attempt_seed)| self.run_attempt(truth_table, attempt, attempt_seed))
            .collect();

        let mut history = Vec::with_capacity(candidates.len());
        let mut running: Option<(usize, f64)> = None;
        for c in &candidates {
            let e = (c.evaluation.mismatches, c.evaluation.min_margin);
            running = Some(match running {
                Some(prev) if !ranks_above(e, prev) => prev,
                _ => e,
            });
            history.extend(running);
        }

        let best = candidates
            .into_par_iter()
            .reduce_with(Candidate::better)
            .expect("at least one attempt is configured");

        TrainingResult {
            attempts_run: history.len(),
            best,
            history,
            seed,
        }
    }
}

fn ranks_above(a: (usize, f64), b: (usize, f64)) -> bool {
    a.0 < b.0 || (a.0 == b.0 && a.1 > b.1)
}

/// Validate `config` and run a multi-start search on `truth_table`
pub fn train_gate(truth_table: &TruthTable, config: &TrainingConfig) -> Result<TrainingResult> {
    let selector = MultiStartSelector::new(config.clone())?;
    Ok(selector.run(truth_table))
}
