//! # Engine - Probability Evaluation and Do-Calculus
//!
//! The computational core of the causal-inference engine:
//!
//! - **Evaluator**: recursive evaluation of observational queries against
//!   the model's CPTs, with marginalization over latents and memoization
//! - **Expressions**: the symbolic algebra of sums, products and
//!   conditional probability terms
//! - **Do-calculus**: the three rewrite rules plus marginalization, driven
//!   by an iterative-deepening search that eliminates every `do(·)`
//! - **Dispatch**: the [`Do`] session tying it all together
//!
//! Everything is single-threaded and deterministic given a fixed seed: sets
//! become sorted sequences before iteration, and all randomness flows from
//! the RNG injected through [`Context`].
//!
//! ## Example
//!
//! ```rust
//! use causal_engine::Do;
//! use causal_model::{Assertion, Cpt, CptRow, Model, Variable};
//!
//! let row = |outcome: &str, parents: &[&str], p: f64| CptRow {
//!     outcome: outcome.into(),
//!     parent_outcomes: parents.iter().map(|s| s.to_string()).collect(),
//!     probability: p,
//! };
//!
//! // Y -> X with P(y) = 0.7, P(x | y) = 0.9, P(x | ~y) = 0.75.
//! let model = Model::new(
//!     None,
//!     vec![
//!         Variable::new(
//!             "Y",
//!             vec!["y".into(), "~y".into()],
//!             vec![],
//!             Some(Cpt::new(vec![row("y", &[], 0.7), row("~y", &[], 0.3)])),
//!         ),
//!         Variable::new(
//!             "X",
//!             vec!["x".into(), "~x".into()],
//!             vec!["Y".into()],
//!             Some(Cpt::new(vec![
//!                 row("x", &["y"], 0.9),
//!                 row("~x", &["y"], 0.1),
//!                 row("x", &["~y"], 0.75),
//!                 row("~x", &["~y"], 0.25),
//!             ])),
//!         ),
//!     ],
//! )
//! .unwrap();
//!
//! let mut session = Do::new(model);
//! let p = session.p(&[Assertion::observed("X", "x")], &[]).unwrap();
//! assert!((p - 0.855).abs() < 1e-9);
//! ```

mod context;
mod dispatch;
mod error;
mod evaluate;
mod expr;
mod rules;
mod search;
mod util;

pub use context::{
    ChooseDeconfounder, Context, DeconfoundingPolicy, CONSISTENCY_TOLERANCE, DRIFT_TOLERANCE,
};
pub use dispatch::{evaluate_expr, Do};
pub use error::EngineError;
pub use evaluate::{query_key, Evaluator};
pub use expr::{Expr, Term, Value};
