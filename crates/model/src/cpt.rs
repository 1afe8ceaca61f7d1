//! Conditional probability tables.

use crate::error::ModelError;
use std::fmt;

/// One row of a CPT: P(variable = outcome | parents = parent_outcomes).
#[derive(Debug, Clone, PartialEq)]
pub struct CptRow {
    pub outcome: String,
    /// Ordered identically to the owning variable's parent list.
    pub parent_outcomes: Vec<String>,
    pub probability: f64,
}

/// A conditional probability table for one variable given its parents.
///
/// Invariants, checked by [`Cpt::validate`]:
/// - exactly one row per (outcome × parent-outcome cross product),
/// - for each fixed parent-outcome vector the probabilities over the
///   variable's outcomes sum to 1 within a tolerance.
#[derive(Debug, Clone, PartialEq)]
pub struct Cpt {
    rows: Vec<CptRow>,
}

impl Cpt {
    pub fn new(rows: Vec<CptRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[CptRow] {
        &self.rows
    }

    /// Direct row lookup. Returns `None` when no row matches.
    pub fn probability(&self, outcome: &str, parent_outcomes: &[&str]) -> Option<f64> {
        self.rows
            .iter()
            .find(|row| {
                row.outcome == outcome
                    && row.parent_outcomes.len() == parent_outcomes.len()
                    && row
                        .parent_outcomes
                        .iter()
                        .zip(parent_outcomes)
                        .all(|(a, b)| a == b)
            })
            .map(|row| row.probability)
    }

    /// Check completeness and per-parent-assignment normalization.
    ///
    /// `parent_outcome_lists` holds, per parent and in parent-list order, the
    /// outcomes that parent can take.
    pub fn validate(
        &self,
        variable: &str,
        outcomes: &[String],
        parent_outcome_lists: &[&[String]],
        tolerance: f64,
    ) -> Result<(), ModelError> {
        let malformed = |reason: String| ModelError::MalformedTable {
            variable: variable.to_string(),
            reason,
        };

        let combinations: usize = parent_outcome_lists.iter().map(|l| l.len()).product();
        let expected = outcomes.len() * combinations;
        if self.rows.len() != expected {
            return Err(malformed(format!(
                "expected {} rows ({} outcomes x {} parent combinations), found {}",
                expected,
                outcomes.len(),
                combinations,
                self.rows.len()
            )));
        }

        for row in &self.rows {
            if !outcomes.contains(&row.outcome) {
                return Err(malformed(format!("unknown outcome '{}'", row.outcome)));
            }
            if row.parent_outcomes.len() != parent_outcome_lists.len() {
                return Err(malformed(format!(
                    "row for '{}' has {} parent outcomes, expected {}",
                    row.outcome,
                    row.parent_outcomes.len(),
                    parent_outcome_lists.len()
                )));
            }
            for (value, valid) in row.parent_outcomes.iter().zip(parent_outcome_lists) {
                if !valid.contains(value) {
                    return Err(malformed(format!("unknown parent outcome '{}'", value)));
                }
            }
            if !(0.0..=1.0).contains(&row.probability) {
                return Err(malformed(format!(
                    "probability {} outside [0, 1]",
                    row.probability
                )));
            }
        }

        // Walk every parent combination: each (outcome, combination) pair must
        // appear exactly once and each combination's column must sum to 1.
        for index in 0..combinations {
            let combination = decode_combination(index, parent_outcome_lists);
            let mut sum = 0.0;
            for outcome in outcomes {
                let matching = self
                    .rows
                    .iter()
                    .filter(|row| {
                        row.outcome == *outcome
                            && row
                                .parent_outcomes
                                .iter()
                                .zip(&combination)
                                .all(|(a, b)| a == *b)
                    })
                    .count();
                match matching {
                    0 => {
                        return Err(malformed(format!(
                            "missing row for outcome '{}' given {:?}",
                            outcome, combination
                        )))
                    }
                    1 => {}
                    n => {
                        return Err(malformed(format!(
                            "{} duplicate rows for outcome '{}' given {:?}",
                            n, outcome, combination
                        )))
                    }
                }
                sum += self
                    .probability(outcome, &combination)
                    .unwrap_or_default();
            }
            if (sum - 1.0).abs() > tolerance {
                return Err(malformed(format!(
                    "rows for parents {:?} sum to {} (expected 1.0)",
                    combination, sum
                )));
            }
        }

        Ok(())
    }
}

impl fmt::Display for Cpt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.rows {
            writeln!(
                f,
                "{} | {} : {:.4}",
                row.outcome,
                row.parent_outcomes.join(", "),
                row.probability
            )?;
        }
        Ok(())
    }
}

/// Decode a combination index into one outcome per parent (row-major).
fn decode_combination<'a>(mut index: usize, lists: &[&'a [String]]) -> Vec<&'a str> {
    let mut values = vec![""; lists.len()];
    for i in (0..lists.len()).rev() {
        let len = lists[i].len();
        values[i] = lists[i][index % len].as_str();
        index /= len;
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coin_given_weather() -> Cpt {
        Cpt::new(vec![
            CptRow {
                outcome: "h".into(),
                parent_outcomes: vec!["sun".into()],
                probability: 0.6,
            },
            CptRow {
                outcome: "t".into(),
                parent_outcomes: vec!["sun".into()],
                probability: 0.4,
            },
            CptRow {
                outcome: "h".into(),
                parent_outcomes: vec!["rain".into()],
                probability: 0.5,
            },
            CptRow {
                outcome: "t".into(),
                parent_outcomes: vec!["rain".into()],
                probability: 0.5,
            },
        ])
    }

    #[test]
    fn test_lookup() {
        let cpt = coin_given_weather();
        assert_eq!(cpt.probability("h", &["sun"]), Some(0.6));
        assert_eq!(cpt.probability("t", &["rain"]), Some(0.5));
        assert_eq!(cpt.probability("h", &["snow"]), None);
    }

    #[test]
    fn test_validate_complete_table() {
        let cpt = coin_given_weather();
        let outcomes = vec!["h".to_string(), "t".to_string()];
        let weather = vec!["sun".to_string(), "rain".to_string()];
        assert!(cpt
            .validate("Coin", &outcomes, &[&weather], 1e-5)
            .is_ok());
    }

    #[test]
    fn test_validate_missing_row() {
        let mut rows = coin_given_weather().rows().to_vec();
        rows.pop();
        let cpt = Cpt::new(rows);
        let outcomes = vec!["h".to_string(), "t".to_string()];
        let weather = vec!["sun".to_string(), "rain".to_string()];
        let result = cpt.validate("Coin", &outcomes, &[&weather], 1e-5);
        assert!(matches!(result, Err(ModelError::MalformedTable { .. })));
    }

    #[test]
    fn test_validate_normalization_drift() {
        let mut rows = coin_given_weather().rows().to_vec();
        rows[0].probability = 0.7; // h|sun + t|sun = 1.1
        let cpt = Cpt::new(rows);
        let outcomes = vec!["h".to_string(), "t".to_string()];
        let weather = vec!["sun".to_string(), "rain".to_string()];
        let result = cpt.validate("Coin", &outcomes, &[&weather], 1e-5);
        assert!(matches!(result, Err(ModelError::MalformedTable { .. })));
    }
}
