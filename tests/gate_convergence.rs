//! End-to-end training of single-neuron and two-layer circuits

use analog_perceptron::{
    train_gate, LossKind, MultiStartSelector, Network, Topology, TrainingConfig, TrainingOutcome,
    TruthTable, UpdateRule,
};
use rstest::rstest;

fn single_neuron(seed: u64) -> TrainingConfig {
    TrainingConfig {
        max_epochs: 20_000,
        attempts: 10,
        seed: Some(seed),
        ..TrainingConfig::single_neuron()
    }
}

fn two_layer(seed: u64) -> TrainingConfig {
    TrainingConfig {
        max_epochs: 5_000,
        attempts: 20,
        seed: Some(seed),
        ..TrainingConfig::two_layer()
    }
}

#[test]
fn single_neuron_learns_and() {
    let table = TruthTable::parse("0001").unwrap();
    let result = train_gate(&table, &single_neuron(42)).unwrap();

    assert!(result.is_perfect());
    assert!(matches!(result.best.network, Network::Single(_)));
    for row in &result.best.evaluation.rows {
        assert_eq!(row.predicted, row.x1 && row.x2);
        assert!(row.margin > 0.0);
    }
}

#[rstest]
#[case("0111")]
#[case("1110")]
#[case("1000")]
#[case("0100")]
#[case("0010")]
fn single_neuron_learns_separable_gates(#[case] bits: &str) {
    let table = TruthTable::parse(bits).unwrap();
    let result = train_gate(&table, &single_neuron(7)).unwrap();

    assert!(result.is_perfect(), "{} left {} mismatches", bits, result.mismatches());
    assert!(result.min_margin() > 0.2);
}

#[rstest]
#[case(LossKind::ShiftedMse, UpdateRule::Plain)]
#[case(LossKind::ShiftedMse, UpdateRule::MomentumDecay)]
fn single_neuron_shifted_mse_learns_or(#[case] loss: LossKind, #[case] update: UpdateRule) {
    let table = TruthTable::from_fn(|a, b| a || b);
    let config = TrainingConfig {
        loss,
        update,
        ..single_neuron(3)
    };
    let result = train_gate(&table, &config).unwrap();
    assert!(result.is_perfect());
}

#[rstest]
#[case("0110")]
#[case("1001")]
fn single_neuron_cannot_learn_xor_family(#[case] bits: &str) {
    let table = TruthTable::parse(bits).unwrap();
    let config = TrainingConfig {
        max_epochs: 2_000,
        attempts: 4,
        ..single_neuron(99)
    };
    let result = train_gate(&table, &config).unwrap();

    assert_eq!(result.attempts_run, 4);
    assert!(result.mismatches() > 0);
    assert_eq!(result.best.outcome, TrainingOutcome::BudgetExhausted);
    assert!(result.history.iter().all(|&(mismatches, _)| mismatches > 0));
}

#[test]
fn two_layer_learns_xor() {
    let table = TruthTable::parse("0110").unwrap();
    let result = train_gate(&table, &two_layer(2024)).unwrap();

    assert!(result.is_perfect(), "history: {:?}", result.history);
    assert!(matches!(result.best.network, Network::TwoLayer(_)));
    for row in &result.best.evaluation.rows {
        assert_eq!(row.predicted, row.x1 ^ row.x2);
        assert_eq!(row.neuron_margins.len(), 3);
        for &m in &row.neuron_margins {
            assert!(m >= 0.1, "margin {:.3} on row {:?}", m, row);
        }
    }
}

#[test]
fn two_layer_xor_in_parallel() {
    let table = TruthTable::parse("0110").unwrap();
    let config = TrainingConfig {
        parallel: true,
        ..two_layer(2024)
    };
    let result = MultiStartSelector::new(config).unwrap().run(&table);

    assert_eq!(result.attempts_run, 20);
    assert!(result.is_perfect());
    assert!(result.min_margin() >= 0.1);
}

#[test]
fn two_layer_learns_or() {
    let table = TruthTable::parse("0111").unwrap();
    let result = train_gate(&table, &two_layer(8)).unwrap();
    assert!(result.is_perfect());
    assert_eq!(result.best.network.topology(), Topology::TwoLayer);
}

#[test]
fn trained_weights_respect_physical_limits() {
    let table = TruthTable::parse("0110").unwrap();
    let mut config = two_layer(17);
    config.attempts = 3;
    config.weight_bounds.min = 0.1;
    config.weight_bounds.max = 0.9;
    config.weight_bounds.bias_headroom = 0.5;
    let result = train_gate(&table, &config).unwrap();

    for neuron in result.best.network.neurons() {
        let d = neuron.domain();
        assert!((0.1..=0.9).contains(&neuron.w1));
        assert!((0.1..=0.9).contains(&neuron.w2));
        assert!(neuron.w_bias >= 0.1);
        assert!(neuron.w_bias * d.v_supply <= d.v_sat - 0.5 + 1e-9);
    }
}

#[test]
fn same_seed_reproduces_result() {
    let table = TruthTable::parse("0110").unwrap();
    let config = TrainingConfig {
        attempts: 3,
        max_epochs: 500,
        ..two_layer(31)
    };
    let a = train_gate(&table, &config).unwrap();
    let b = train_gate(&table, &config).unwrap();

    assert_eq!(a.history, b.history);
    assert_eq!(a.best.evaluation, b.best.evaluation);
}

#[test]
fn malformed_table_is_rejected_before_training() {
    for bad in ["011", "01x0", "00011"] {
        assert!(TruthTable::parse(bad).is_err());
    }
}
