//! Error types for graph queries.

use thiserror::Error;

/// Errors raised by the graph-analysis layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GraphError {
    /// A query names a vertex that is not in the graph.
    #[error("unknown vertex '{vertex}'")]
    UnknownVertex { vertex: String },

    /// Source, sink and blocker sets must be pairwise disjoint.
    #[error("variable sets must be disjoint: '{vertex}' appears on both sides")]
    OverlappingSets { vertex: String },
}
