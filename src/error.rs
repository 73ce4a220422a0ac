//! Error types for circuit construction, configuration and truth-table parsing.

use thiserror::Error;

/// Errors raised before any training starts.
///
/// Non-convergence is not represented here: an attempt that runs out of
/// epochs still returns its weights (see [`crate::TrainingOutcome`]).
#[derive(Debug, Error)]
pub enum CircuitError {
    /// The truth table string or example list is malformed.
    #[error("Invalid truth table {input:?}: {reason}")]
    InvalidTruthTable { input: String, reason: String },

    /// A training parameter is outside its physical or numeric range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configuration file could not be read.
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML for [`crate::TrainingConfig`].
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),
}

impl CircuitError {
    pub(crate) fn truth_table(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTruthTable {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, CircuitError>;
