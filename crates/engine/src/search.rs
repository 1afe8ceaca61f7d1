//! Iterative-deepening search for a do-free rewrite.
//!
//! At depth d every `Prob` site of the current expression is a rewrite
//! site; each applicable rule with each parameter choice yields one
//! successor. A branch succeeds when no `Prob` term carries an
//! intervention, and fails at the depth bound. The first depth-minimal
//! success wins, ties broken by expression size then canonical form.
//!
//! The visited map records the shallowest depth each canonical form was
//! reached at and prunes only revisits at the same or greater depth, so a
//! longer correct derivation is never shadowed by a pruned shorter path.

use std::collections::HashMap;

use tracing::debug;

use causal_graph::Dag;
use causal_model::Model;

use crate::context::Context;
use crate::error::EngineError;
use crate::expr::Expr;
use crate::rules::{successors, RuleEnv};

/// The least-intervened, smallest expression seen so far; reported when the
/// search fails.
struct BestPartial {
    interventions: usize,
    size: usize,
    expr: Expr,
}

struct Iteration<'a> {
    env: RuleEnv<'a>,
    visited: HashMap<String, usize>,
    successes: Vec<Expr>,
    exhausted: bool,
}

/// Search for an expression equivalent to `initial` with no `do(·)` left.
pub(crate) fn eliminate_interventions(
    initial: &Expr,
    model: &Model,
    dag: &Dag,
    ctx: &Context,
) -> Result<Expr, EngineError> {
    let mut steps: u64 = 0;
    let mut best: Option<BestPartial> = None;

    for limit in 0..=ctx.depth_bound {
        let mut iteration = Iteration {
            env: RuleEnv::new(model, dag),
            visited: HashMap::new(),
            successes: Vec::new(),
            exhausted: false,
        };
        iteration.dfs(initial, 0, limit, ctx, &mut steps, &mut best)?;

        if !iteration.successes.is_empty() {
            debug!(
                depth = limit,
                candidates = iteration.successes.len(),
                steps,
                "do-free rewrites found"
            );
            let mut ranked: Vec<(usize, String, Expr)> = iteration
                .successes
                .into_iter()
                .map(|e| e.normalize())
                .map(|e| (e.size(), e.canonical(), e))
                .collect();
            ranked.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));
            ranked.dedup_by(|a, b| a.1 == b.1);
            if let Some((_, _, expr)) = ranked.into_iter().next() {
                return Ok(expr);
            }
        }
        if iteration.exhausted {
            break;
        }
    }

    Err(EngineError::DoCalculusFailed {
        depth_bound: ctx.depth_bound,
        steps,
        best: best
            .map(|b| b.expr.to_string())
            .unwrap_or_else(|| initial.to_string()),
    })
}

impl Iteration<'_> {
    fn dfs(
        &mut self,
        expr: &Expr,
        depth: usize,
        limit: usize,
        ctx: &Context,
        steps: &mut u64,
        best: &mut Option<BestPartial>,
    ) -> Result<(), EngineError> {
        let interventions = expr.intervention_count();
        if interventions == 0 {
            self.successes.push(expr.clone());
            return Ok(());
        }

        let size = expr.size();
        let better = match best {
            Some(b) => (interventions, size) < (b.interventions, b.size),
            None => true,
        };
        if better {
            *best = Some(BestPartial {
                interventions,
                size,
                expr: expr.clone(),
            });
        }

        if depth == limit {
            return Ok(());
        }

        for successor in successors(expr, &mut self.env)? {
            *steps += 1;
            if let Some(budget) = ctx.step_budget {
                if *steps > budget {
                    self.exhausted = true;
                    return Ok(());
                }
            }

            let canonical = successor.canonical();
            let next_depth = depth + 1;
            if let Some(&seen) = self.visited.get(&canonical) {
                if seen <= next_depth {
                    continue;
                }
            }
            self.visited.insert(canonical, next_depth);

            self.dfs(&successor, next_depth, limit, ctx, steps, best)?;
            if self.exhausted {
                return Ok(());
            }
        }
        Ok(())
    }
}
