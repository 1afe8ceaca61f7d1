//! # Model - Discrete Causal Bayesian Networks
//!
//! The data model underneath the causal-inference engine:
//!
//! - **Variables**: discrete outcomes, ordered parent lists, optional CPTs
//! - **Assertions**: observations vs interventions over outcomes
//! - **Models**: validated, immutable DAGs with derived roots/latents/order
//! - **Loading**: `.json` / `.yml` / `.yaml` model documents
//!
//! A model is constructed once and never mutated; the graph, evaluator and
//! do-calculus layers hold borrowed references for the duration of a query.

mod assertion;
mod cpt;
mod error;
mod model;
mod spec;

pub use assertion::{asserted_variables, contradictory, Assertion, AssertionKind};
pub use cpt::{Cpt, CptRow};
pub use error::ModelError;
pub use model::{Model, Variable, TABLE_TOLERANCE};
pub use spec::{ModelSpec, TableCell, VariableSpec};
