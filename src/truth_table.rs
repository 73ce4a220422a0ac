//! Truth tables for 2-input gates

use std::fmt;
use std::str::FromStr;

use crate::error::{CircuitError, Result};

/// Input combinations in the order a 4-bit table string lists them:
/// `(0,0), (1,0), (0,1), (1,1)`
pub const INPUT_ORDER: [(bool, bool); 4] = [(false, false), (true, false), (false, true), (true, true)];

/// One row of a truth table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Example {
    pub x1: bool,
    pub x2: bool,
    pub target: bool,
}

impl Example {
    pub fn new(x1: bool, x2: bool, target: bool) -> Self {
        Self { x1, x2, target }
    }
}

/// Exactly one example per input combination, stored in [`INPUT_ORDER`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TruthTable {
    examples: [Example; 4],
}

impl TruthTable {
    /// Parse a 4-character `'0'/'1'` string such as `"0110"` (XOR)
    pub fn parse(bits: &str) -> Result<Self> {
        let chars: Vec<char> = bits.chars().collect();
        if chars.len() != 4 {
            return Err(CircuitError::truth_table(
                bits,
                format!("expected 4 characters, got {}", chars.len()),
            ));
        }

        let mut examples = [Example::new(false, false, false); 4];
        for (i, (&(x1, x2), c)) in INPUT_ORDER.iter().zip(chars).enumerate() {
            let target = match c {
                '0' => false,
                '1' => true,
                other => {
                    return Err(CircuitError::truth_table(
                        bits,
                        format!("character {:?} at position {} is not '0' or '1'", other, i),
                    ))
                }
            };
            examples[i] = Example::new(x1, x2, target);
        }

        Ok(Self { examples })
    }

    /// Build a table by evaluating `f` on every input combination
    pub fn from_fn<F: Fn(bool, bool) -> bool>(f: F) -> Self {
        Self {
            examples: INPUT_ORDER.map(|(x1, x2)| Example::new(x1, x2, f(x1, x2))),
        }
    }

    /// Build a table from arbitrary-order examples, rejecting missing or
    /// duplicated input combinations
    pub fn from_examples(rows: &[Example]) -> Result<Self> {
        let describe = || format!("{:?}", rows);
        if rows.len() != 4 {
            return Err(CircuitError::truth_table(
                describe(),
                format!("expected 4 examples, got {}", rows.len()),
            ));
        }

        let mut slots: [Option<Example>; 4] = [None; 4];
        for row in rows {
            let idx = Self::index_of(row.x1, row.x2);
            if slots[idx].replace(*row).is_some() {
                return Err(CircuitError::truth_table(
                    describe(),
                    format!("duplicate input ({}, {})", row.x1 as u8, row.x2 as u8),
                ));
            }
        }

        // four rows, no duplicates: every slot is filled
        let examples = slots.map(|slot| slot.unwrap_or(Example::new(false, false, false)));
        Ok(Self { examples })
    }

    #[inline]
    fn index_of(x1: bool, x2: bool) -> usize {
        (x1 as usize) | ((x2 as usize) << 1)
    }

    /// Examples in [`INPUT_ORDER`]
    pub fn examples(&self) -> &[Example; 4] {
        &self.examples
    }

    /// Target output for an input combination
    pub fn target(&self, x1: bool, x2: bool) -> bool {
        self.examples[Self::index_of(x1, x2)].target
    }

    /// Whether a single threshold unit can realize this table
    pub fn is_linearly_separable(&self) -> bool {
        // Only XOR and XNOR are not, out of the 16 two-input functions
        let t = |x1, x2| self.target(x1, x2);
        let xor_like = t(false, false) == t(true, true)
            && t(true, false) == t(false, true)
            && t(false, false) != t(true, false);
        !xor_like
    }
}

impl FromStr for TruthTable {
    type Err = CircuitError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for TruthTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ex in &self.examples {
            write!(f, "{}", ex.target as u8)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_order() {
        // "0100": only (1,0) is high
        let tt = TruthTable::parse("0100").unwrap();
        assert!(tt.target(true, false));
        assert!(!tt.target(false, true));
        assert!(!tt.target(false, false));
        assert!(!tt.target(true, true));
        assert_eq!(tt.to_string(), "0100");
    }

    #[test]
    fn test_truth_table_and() {
        let tt = TruthTable::from_fn(|a, b| a && b);
        assert_eq!(tt.to_string(), "0001");
        assert_eq!(tt, "0001".parse().unwrap());
    }

    #[test]
    fn test_truth_table_xor() {
        let tt = TruthTable::from_fn(|a, b| a ^ b);
        assert_eq!(tt.to_string(), "0110");
        assert!(!tt.is_linearly_separable());
        assert!(!TruthTable::parse("1001").unwrap().is_linearly_separable());
        assert!(TruthTable::parse("0111").unwrap().is_linearly_separable());
        assert!(TruthTable::parse("0000").unwrap().is_linearly_separable());
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        for bad in ["", "011", "01101", "01a1", "0 10", "２０１０"] {
            let err = TruthTable::parse(bad).unwrap_err();
            assert!(matches!(err, CircuitError::InvalidTruthTable { .. }), "{}", bad);
        }
    }

    #[test]
    fn test_from_examples() {
        let rows = [
            Example::new(true, true, true),
            Example::new(false, false, false),
            Example::new(false, true, true),
            Example::new(true, false, true),
        ];
        let tt = TruthTable::from_examples(&rows).unwrap();
        assert_eq!(tt.to_string(), "0111");

        let dup = [rows[0], rows[1], rows[2], rows[2]];
        assert!(TruthTable::from_examples(&dup).is_err());
        assert!(TruthTable::from_examples(&rows[..3]).is_err());
    }
}
