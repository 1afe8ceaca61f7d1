//! Explicit engine configuration.
//!
//! All tunables travel through a [`Context`] value handed to the engine at
//! construction; there are no process-wide singletons. A fixed seed makes
//! every query byte-identical across runs.

use std::collections::BTreeSet;
use std::fmt;

/// Tolerance for the post-evaluation probability range check.
pub const DRIFT_TOLERANCE: f64 = 1e-6;

/// Tolerance when comparing numeric answers across deconfounding sets.
pub const CONSISTENCY_TOLERANCE: f64 = 1e-7;

/// How to pick among the reported deconfounding sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeconfoundingPolicy {
    /// An external collaborator supplies the choice.
    Ask,
    /// Uniformly at random from the injected RNG.
    Random,
    /// Evaluate with every reported set and require agreement.
    All,
}

/// External collaborator consulted under [`DeconfoundingPolicy::Ask`].
///
/// Receives the reported sets and returns an index into them.
pub trait ChooseDeconfounder {
    fn choose(&mut self, sets: &[BTreeSet<String>]) -> usize;
}

/// Configuration for one engine instance.
pub struct Context {
    /// Post-evaluation range tolerance.
    pub drift_tolerance: f64,
    /// Cross-set agreement tolerance under the `all` policy.
    pub consistency_tolerance: f64,
    /// Report only inclusion-minimal deconfounding sets.
    pub minimal_sets: bool,
    pub policy: DeconfoundingPolicy,
    /// Maximum rewrite depth for the iterative-deepening search.
    pub depth_bound: usize,
    /// Optional cap on total rule applications per search.
    pub step_budget: Option<u64>,
    /// Seed for the injected RNG.
    pub seed: u64,
    /// Evaluator memoization toggle.
    pub cache: bool,
    /// Collaborator for the `ask` policy; falls back to the first reported
    /// set when absent.
    pub chooser: Option<Box<dyn ChooseDeconfounder>>,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            drift_tolerance: DRIFT_TOLERANCE,
            consistency_tolerance: CONSISTENCY_TOLERANCE,
            minimal_sets: false,
            policy: DeconfoundingPolicy::All,
            depth_bound: 12,
            step_budget: Some(500_000),
            seed: 0,
            cache: true,
            chooser: None,
        }
    }
}

impl Context {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_policy(mut self, policy: DeconfoundingPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_minimal_sets(mut self, minimal: bool) -> Self {
        self.minimal_sets = minimal;
        self
    }

    pub fn with_depth_bound(mut self, depth_bound: usize) -> Self {
        self.depth_bound = depth_bound;
        self
    }

    pub fn with_step_budget(mut self, budget: Option<u64>) -> Self {
        self.step_budget = budget;
        self
    }

    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_chooser(mut self, chooser: Box<dyn ChooseDeconfounder>) -> Self {
        self.chooser = Some(chooser);
        self
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("minimal_sets", &self.minimal_sets)
            .field("policy", &self.policy)
            .field("depth_bound", &self.depth_bound)
            .field("step_budget", &self.step_budget)
            .field("seed", &self.seed)
            .field("cache", &self.cache)
            .field("chooser", &self.chooser.as_ref().map(|_| "..."))
            .finish()
    }
}
