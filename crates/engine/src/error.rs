//! Error types for query evaluation and do-calculus inference.

use causal_graph::GraphError;
use causal_model::ModelError;
use thiserror::Error;

/// Errors raised while answering a query.
///
/// `NumericDrift` and `InconsistentDeconfounding` are recoverable at the
/// caller's discretion; the others abort the query. Nothing is ever silently
/// coerced to 0 or NaN.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    /// The query itself is ill-formed: unknown variable or outcome, a
    /// variable asserted more than once, or an intervention in the head.
    #[error("query shape: {reason}")]
    QueryShape { reason: String },

    /// Division by zero during a Bayes rewrite.
    #[error("division by zero evaluating {query}")]
    ZeroProbability { query: String },

    /// An evaluated probability fell outside [0, 1] beyond tolerance.
    #[error("evaluated {query} to {value}, outside [0, 1]")]
    NumericDrift { query: String, value: f64 },

    /// No rewrite rule applies and the query cannot be resolved from the
    /// given tables.
    #[error("unable to resolve {query} from the given tables")]
    Indeterminable { query: String },

    /// The rule search exhausted its depth or step budget with interventions
    /// still present.
    #[error(
        "do-calculus search failed within depth {depth_bound} ({steps} steps); best partial: {best}"
    )]
    DoCalculusFailed {
        depth_bound: usize,
        steps: u64,
        best: String,
    },

    /// Two deconfounding sets produced diverging numeric answers under the
    /// `all` policy.
    #[error("deconfounding sets disagree: {first} vs {second}")]
    InconsistentDeconfounding { first: f64, second: f64 },
}
