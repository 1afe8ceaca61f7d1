//! Model input format: structured specs and `.json`/`.yml`/`.yaml` files.
//!
//! Schema (identical semantics across formats):
//!
//! ```yaml
//! name: confounded pair
//! model:
//!   Z:
//!     outcomes: [z, ~z]
//!     table:
//!       - [z, 0.5]
//!       - [~z, 0.5]
//!   X:
//!     outcomes: [x, ~x]
//!     parents: [Z]
//!     table:
//!       - [x, z, 0.8]
//!       - [~x, z, 0.2]
//!       - [x, ~z, 0.3]
//!       - [~x, ~z, 0.7]
//! ```
//!
//! A missing `table` marks the variable latent; `latent: true` marks a
//! variable latent while letting a fixture keep its ground-truth table.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cpt::{Cpt, CptRow};
use crate::error::ModelError;
use crate::model::{Model, Variable};

/// A parsed model document.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelSpec {
    #[serde(default)]
    pub name: Option<String>,
    pub model: BTreeMap<String, VariableSpec>,
}

/// One variable's entry in a model document.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VariableSpec {
    pub outcomes: Vec<String>,
    #[serde(default)]
    pub parents: Vec<String>,
    #[serde(default)]
    pub latent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<Vec<Vec<TableCell>>>,
}

/// A cell in a table row: outcome labels and the trailing probability.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TableCell {
    Label(String),
    Probability(f64),
}

impl Model {
    /// Build a model from a parsed spec.
    pub fn from_spec(spec: ModelSpec) -> Result<Self, ModelError> {
        let mut variables = Vec::with_capacity(spec.model.len());
        for (name, var_spec) in spec.model {
            let table = match var_spec.table {
                Some(rows) => Some(parse_table(&name, rows, var_spec.parents.len())?),
                None => None,
            };
            let mut variable = Variable::new(name, var_spec.outcomes, var_spec.parents, table);
            if var_spec.latent {
                variable = variable.latent();
            }
            variables.push(variable);
        }
        Model::new(spec.name, variables)
    }

    /// Load a model from a `.json`, `.yml` or `.yaml` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        let spec: ModelSpec = match extension {
            "json" => serde_json::from_str(&text).map_err(|e| ModelError::MalformedModel {
                reason: format!("{}: {}", path.display(), e),
            })?,
            "yml" | "yaml" => {
                serde_yaml::from_str(&text).map_err(|e| ModelError::MalformedModel {
                    reason: format!("{}: {}", path.display(), e),
                })?
            }
            other => {
                return Err(ModelError::MalformedModel {
                    reason: format!(
                        "unsupported model file extension '{}' (expected json, yml or yaml)",
                        other
                    ),
                })
            }
        };
        Model::from_spec(spec)
    }
}

/// Each row is `[outcome, parent₁-outcome, …, parentₖ-outcome, probability]`.
fn parse_table(
    variable: &str,
    rows: Vec<Vec<TableCell>>,
    parent_count: usize,
) -> Result<Cpt, ModelError> {
    let malformed = |reason: String| ModelError::MalformedTable {
        variable: variable.to_string(),
        reason,
    };

    let mut parsed = Vec::with_capacity(rows.len());
    for row in rows {
        if row.len() != parent_count + 2 {
            return Err(malformed(format!(
                "row has {} cells, expected {} (outcome, {} parent outcomes, probability)",
                row.len(),
                parent_count + 2,
                parent_count
            )));
        }

        let mut cells = row.into_iter();
        let outcome = match cells.next() {
            Some(TableCell::Label(label)) => label,
            _ => return Err(malformed("row must start with an outcome label".into())),
        };
        let mut parent_outcomes = Vec::with_capacity(parent_count);
        for _ in 0..parent_count {
            match cells.next() {
                Some(TableCell::Label(label)) => parent_outcomes.push(label),
                _ => {
                    return Err(malformed(
                        "parent cells must be outcome labels".into(),
                    ))
                }
            }
        }
        let probability = match cells.next() {
            Some(TableCell::Probability(p)) => p,
            _ => return Err(malformed("row must end with a probability".into())),
        };

        parsed.push(CptRow {
            outcome,
            parent_outcomes,
            probability,
        });
    }
    Ok(Cpt::new(parsed))
}
