//! # Graph - Causal DAG Analysis
//!
//! Pure graph algorithms over an immutable causal model:
//!
//! - **Reachability**: ancestors, descendants, parents, children
//! - **Edge surgery**: the mutilated graphs Gₓ̄ and G w̲ of the do-calculus
//! - **d-separation**: the path-blocking criterion for conditional
//!   independence
//! - **Backdoor analysis**: path enumeration and deconfounding-set search
//!
//! Every operation is a pure function of the graph it is handed; callers
//! that want memoization keep their own caches keyed on
//! (source set, sink set, blocker set).

mod backdoor;
mod dag;
mod dsep;
mod error;

pub use backdoor::{backdoor_paths, deconfounding_sets};
pub use dag::Dag;
pub use dsep::{all_paths, d_separated, disjoint, path_blocked};
pub use error::GraphError;
