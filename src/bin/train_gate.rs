//! Train an analog comparator circuit to realize a 2-input gate.
//!
//! The truth table is given as 4 bits for inputs (0,0), (1,0), (0,1), (1,1):
//!
//! ```text
//! train_gate 0001                      # AND on a single neuron
//! train_gate 0110 --topology two-layer # XOR needs the hidden layer
//! RUST_LOG=debug train_gate 0110 --topology two-layer --attempts 20 --seed 7
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use analog_perceptron::{
    train_gate, LossKind, Network, Neuron, Topology, TrainingConfig, TrainingResult, TruthTable,
    UpdateRule,
};
use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TopologyArg {
    Single,
    TwoLayer,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LossArg {
    Hinge,
    ShiftedMse,
    Logistic,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum UpdateArg {
    Plain,
    Momentum,
    MomentumDecay,
}

#[derive(Debug, Parser)]
#[command(about = "Train potentiometer weights so an op-amp comparator circuit realizes a logic gate")]
struct Args {
    /// Truth table bits for inputs (0,0), (1,0), (0,1), (1,1), e.g. 0110 for XOR
    table: String,

    /// TOML file with training parameters; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    topology: Option<TopologyArg>,

    #[arg(long, value_enum)]
    loss: Option<LossArg>,

    #[arg(long, value_enum)]
    update: Option<UpdateArg>,

    /// Independent training attempts
    #[arg(long)]
    attempts: Option<usize>,

    /// Epoch budget per attempt
    #[arg(long)]
    epochs: Option<usize>,

    /// Learning rate
    #[arg(long)]
    lr: Option<f64>,

    /// Master random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Run attempts in parallel
    #[arg(long)]
    parallel: bool,
}

impl Args {
    fn build_config(&self) -> analog_perceptron::Result<TrainingConfig> {
        let mut config = match (&self.config, self.topology) {
            (Some(path), _) => TrainingConfig::load_from_file(path)?,
            (None, Some(TopologyArg::Single)) => TrainingConfig::single_neuron(),
            (None, _) => TrainingConfig::two_layer(),
        };

        if let Some(t) = self.topology {
            config.topology = match t {
                TopologyArg::Single => Topology::SingleNeuron,
                TopologyArg::TwoLayer => Topology::TwoLayer,
            };
        }
        if let Some(l) = self.loss {
            config.loss = match l {
                LossArg::Hinge => LossKind::Hinge,
                LossArg::ShiftedMse => LossKind::ShiftedMse,
                LossArg::Logistic => LossKind::Logistic,
            };
        }
        if let Some(u) = self.update {
            config.update = match u {
                UpdateArg::Plain => UpdateRule::Plain,
                UpdateArg::Momentum => UpdateRule::Momentum,
                UpdateArg::MomentumDecay => UpdateRule::MomentumDecay,
            };
        }
        if let Some(a) = self.attempts {
            config.attempts = a;
        }
        if let Some(e) = self.epochs {
            config.max_epochs = e;
        }
        if let Some(lr) = self.lr {
            config.learning_rate = lr;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        config.parallel |= self.parallel;

        config.validate()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let table = match TruthTable::parse(args.table.trim()) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };
    let config = match args.build_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };

    let result = match train_gate(&table, &config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(2);
        }
    };

    print_report(&table, &result);

    if result.is_perfect() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

/// Potentiometer value of the reference build, in kOhm
const POT_KOHM: f64 = 10.0;

fn format_neuron(label: &str, neuron: &Neuron) -> String {
    let [v1, v2, vb] = neuron.weight_voltages();
    let [r1, r2, rb] = neuron.resistances(POT_KOHM);
    let rows = [
        ("P1 (w1)", neuron.w1, v1, r1),
        ("P2 (w2)", neuron.w2, v2, r2),
        ("PB (wb)", neuron.w_bias, vb, rb),
    ];

    let mut out = format!("  {}:\n", label);
    for (name, w, v, r) in rows {
        out.push_str(&format!("    {}: {:5.1}% -> {:.2} V, {:.2} kOhm\n", name, w * 100.0, v, r));
    }
    out
}

fn print_report(table: &TruthTable, result: &TrainingResult) {
    let best = &result.best;
    println!("\n=== Results for {} ===", table);
    println!(
        "Attempt {} of {} ({:?}, {} epochs), seed {}",
        best.attempt + 1,
        result.attempts_run,
        best.outcome,
        best.epochs,
        result.seed
    );

    match &best.network {
        Network::Single(n) => print!("{}", format_neuron("Neuron", n)),
        Network::TwoLayer(net) => {
            print!("{}", format_neuron("Hidden 1", &net.hidden[0]));
            print!("{}", format_neuron("Hidden 2", &net.hidden[1]));
            print!("{}", format_neuron("Output", &net.output));
        }
    }

    println!("\n--- Verification ---");
    for row in &best.evaluation.rows {
        let hidden = row
            .hidden
            .map(|[h1, h2]| format!(" -> hidden [{},{}]", h1 as u8, h2 as u8))
            .unwrap_or_default();
        println!(
            "  In({},{}){} -> Out {} (target {}) | margin {:.2} V | {}",
            row.x1 as u8,
            row.x2 as u8,
            hidden,
            row.predicted as u8,
            row.target as u8,
            row.margin,
            if row.is_correct() { "OK" } else { "ERROR" }
        );
    }

    if result.is_perfect() {
        println!(
            "\nSUCCESS: all rows reproduced, minimum margin {:.2} V",
            result.min_margin()
        );
    } else {
        println!("\nFAILED: {} rows wrong", result.mismatches());
        if !table.is_linearly_separable() && matches!(best.network, Network::Single(_)) {
            println!("  {} is not linearly separable; try --topology two-layer", table);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analog_perceptron::VoltageDomain;

    #[test]
    fn test_neuron_report_lists_percent_volts_and_resistance() {
        let n = Neuron::new(VoltageDomain::output_layer(), 0.2, 0.4, 0.5);
        let text = format_neuron("Output", &n);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "  Output:");
        assert_eq!(lines[1], "    P1 (w1):  20.0% -> 1.50 V, 2.00 kOhm");
        assert_eq!(lines[2], "    P2 (w2):  40.0% -> 3.00 V, 4.00 kOhm");
        assert_eq!(lines[3], "    PB (wb):  50.0% -> 3.75 V, 5.00 kOhm");
    }

    #[test]
    fn test_flags_override_preset() {
        let args = Args::parse_from([
            "train_gate", "0110", "--topology", "single", "--lr", "0.02", "--seed", "3",
        ]);
        let config = args.build_config().unwrap();
        assert_eq!(config.topology, Topology::SingleNeuron);
        assert_eq!(config.learning_rate, 0.02);
        assert_eq!(config.seed, Some(3));
    }
}
