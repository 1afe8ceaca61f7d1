//! Error types for model construction and loading.

use thiserror::Error;

/// Errors that can occur while building or loading a model.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Schema mismatch, duplicate variable, unknown parent, or
    /// latent-ordering violation.
    #[error("malformed model: {reason}")]
    MalformedModel { reason: String },

    /// The parent relation contains a cycle; no topological order exists.
    #[error("cyclic graph: {remaining} variable(s) cannot be ordered ({unordered})")]
    CyclicGraph { remaining: usize, unordered: String },

    /// A conditional probability table is incomplete or fails to normalize.
    #[error("malformed table for '{variable}': {reason}")]
    MalformedTable { variable: String, reason: String },

    /// The model file could not be read.
    #[error("unable to read model file '{path}'")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
