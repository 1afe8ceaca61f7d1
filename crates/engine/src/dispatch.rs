//! High-level query dispatch.
//!
//! A [`Do`] session owns a model, its graph, the evaluator cache and the
//! graph-query cache. Observational queries go straight to the evaluator;
//! interventional queries are first rewritten into a do-free symbolic
//! expression — by the backdoor adjustment when a single-variable
//! intervention has a usable deconfounding set, by the rule search
//! otherwise — and then evaluated numerically.

use std::collections::{BTreeSet, HashMap};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use causal_graph::{backdoor_paths, deconfounding_sets, Dag};
use causal_model::{Assertion, Model};

use crate::context::{Context, DeconfoundingPolicy};
use crate::error::EngineError;
use crate::evaluate::{query_key, Evaluator};
use crate::expr::{Expr, Term};
use crate::rules::RuleEnv;
use crate::search::eliminate_interventions;

type PathKey = (Vec<String>, Vec<String>, Vec<String>);

/// A query session over one immutable model.
pub struct Do {
    model: Model,
    dag: Dag,
    ctx: Context,
    rng: StdRng,
    eval_cache: HashMap<String, f64>,
    path_cache: HashMap<PathKey, Vec<Vec<String>>>,
}

impl Do {
    pub fn new(model: Model) -> Self {
        Self::with_context(model, Context::default())
    }

    pub fn with_context(model: Model, ctx: Context) -> Self {
        let dag = Dag::from_model(&model);
        let rng = StdRng::seed_from_u64(ctx.seed);
        Self {
            model,
            dag,
            ctx,
            rng,
            eval_cache: HashMap::new(),
            path_cache: HashMap::new(),
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// P(head | body), body defaulting to the empty set.
    pub fn p(&mut self, head: &[Assertion], body: &[Assertion]) -> Result<f64, EngineError> {
        self.query(head, body).map(|(_, value)| value)
    }

    /// The symbolic expression answering the query, and its numeric value.
    ///
    /// For a purely observational query the expression is the query itself.
    pub fn query(
        &mut self,
        head: &[Assertion],
        body: &[Assertion],
    ) -> Result<(Expr, f64), EngineError> {
        self.validate(head, body)?;
        debug!(query = %query_key(head, body), "dispatching");

        let terms = |assertions: &[Assertion]| -> Vec<Term> {
            assertions.iter().map(Term::from_assertion).collect()
        };

        if !body.iter().any(Assertion::is_intervention) {
            let value = {
                let mut evaluator =
                    Evaluator::new(&self.model, &self.dag, &mut self.eval_cache, &self.ctx);
                evaluator.probability(head, body)?
            };
            return Ok((Expr::prob(terms(head), terms(body)), value));
        }

        let expressions = self.identify(head, body)?;
        let mut remaining = expressions.into_iter();
        let chosen = remaining.next().ok_or_else(|| EngineError::Indeterminable {
            query: query_key(head, body),
        })?;

        let value = self.evaluate(&chosen)?;
        for alternate in remaining {
            let other = self.evaluate(&alternate)?;
            if (other - value).abs() > self.ctx.consistency_tolerance {
                return Err(EngineError::InconsistentDeconfounding {
                    first: value,
                    second: other,
                });
            }
        }
        Ok((chosen, value))
    }

    /// Unblocked backdoor paths between two variable sets, memoized for the
    /// session's lifetime.
    pub fn backdoor_paths(
        &mut self,
        src: &BTreeSet<String>,
        dst: &BTreeSet<String>,
        blockers: &BTreeSet<String>,
    ) -> Result<Vec<Vec<String>>, EngineError> {
        let key: PathKey = (
            src.iter().cloned().collect(),
            dst.iter().cloned().collect(),
            blockers.iter().cloned().collect(),
        );
        if let Some(paths) = self.path_cache.get(&key) {
            return Ok(paths.clone());
        }
        let paths = backdoor_paths(&self.dag, src, dst, blockers)?;
        self.path_cache.insert(key, paths.clone());
        Ok(paths)
    }

    /// Deconfounding sets for (src, dst), honoring the `minimal_sets`
    /// configuration and excluding latent variables.
    pub fn deconfounding_sets(
        &self,
        src: &BTreeSet<String>,
        dst: &BTreeSet<String>,
    ) -> Result<Vec<BTreeSet<String>>, EngineError> {
        Ok(deconfounding_sets(
            &self.dag,
            src,
            dst,
            self.model.latents(),
            self.ctx.minimal_sets,
        )?)
    }

    /// The joint distribution over every non-latent variable, one row per
    /// outcome assignment in lexicographic order.
    pub fn joint_distribution_table(
        &mut self,
    ) -> Result<Vec<(Vec<Assertion>, f64)>, EngineError> {
        let observables: Vec<&str> = self
            .model
            .variables()
            .filter(|v| !self.model.is_latent(v))
            .collect();
        let lists: Vec<(&str, &[String])> = observables
            .iter()
            .map(|name| {
                let outcomes = self
                    .model
                    .outcomes(name)
                    .expect("variable names come from the model");
                (*name, outcomes)
            })
            .collect();

        let mut table = Vec::new();
        for assignment in crate::util::joint_assignments(&lists) {
            let assertions: Vec<Assertion> = assignment
                .iter()
                .map(|(variable, outcome)| Assertion::observed(*variable, *outcome))
                .collect();
            let value = {
                let mut evaluator =
                    Evaluator::new(&self.model, &self.dag, &mut self.eval_cache, &self.ctx);
                evaluator.probability(&assertions, &[])?
            };
            table.push((assertions, value));
        }
        Ok(table)
    }

    pub fn topological_order(&self) -> &[String] {
        self.model.topological_order()
    }

    fn validate(&self, head: &[Assertion], body: &[Assertion]) -> Result<(), EngineError> {
        let shape = |reason: String| EngineError::QueryShape { reason };

        let mut seen = BTreeSet::new();
        let tagged = head
            .iter()
            .map(|a| (a, true))
            .chain(body.iter().map(|a| (a, false)));
        for (assertion, in_head) in tagged {
            let variable = self
                .model
                .variable(&assertion.variable)
                .ok_or_else(|| shape(format!("unknown variable '{}'", assertion.variable)))?;
            if !variable.outcomes().contains(&assertion.outcome) {
                return Err(shape(format!(
                    "'{}' is not an outcome of '{}'",
                    assertion.outcome, assertion.variable
                )));
            }
            if in_head && assertion.is_intervention() {
                return Err(shape(format!(
                    "interventions belong in the body, found {}",
                    assertion
                )));
            }
            if !seen.insert(assertion.variable.as_str()) {
                return Err(shape(format!(
                    "variable '{}' asserted more than once",
                    assertion.variable
                )));
            }
        }
        Ok(())
    }

    /// Rewrite an interventional query into one or more do-free symbolic
    /// expressions: one per deconfounding set under the `all` policy, a
    /// single expression otherwise.
    fn identify(
        &mut self,
        head: &[Assertion],
        body: &[Assertion],
    ) -> Result<Vec<Expr>, EngineError> {
        let interventions: Vec<&Assertion> =
            body.iter().filter(|a| a.is_intervention()).collect();
        let observations: Vec<&Assertion> =
            body.iter().filter(|a| !a.is_intervention()).collect();

        // Backdoor shortcut: a single intervened variable with a usable
        // deconfounding set avoids the rule search entirely.
        if let [x] = interventions.as_slice() {
            let src = BTreeSet::from([x.variable.clone()]);
            let dst: BTreeSet<String> = head.iter().map(|a| a.variable.clone()).collect();
            let query_vars: BTreeSet<String> = head
                .iter()
                .chain(body.iter())
                .map(|a| a.variable.clone())
                .collect();

            let usable: Vec<BTreeSet<String>> = self
                .deconfounding_sets(&src, &dst)?
                .into_iter()
                .filter(|set| set.iter().all(|v| !query_vars.contains(v)))
                .collect();

            if !usable.is_empty() {
                debug!(sets = usable.len(), "backdoor shortcut applies");
                let selected: Vec<BTreeSet<String>> = match self.ctx.policy {
                    DeconfoundingPolicy::All => usable,
                    DeconfoundingPolicy::Random => {
                        let index = self.rng.gen_range(0..usable.len());
                        vec![usable[index].clone()]
                    }
                    DeconfoundingPolicy::Ask => {
                        let index = match self.ctx.chooser.as_mut() {
                            Some(chooser) => chooser.choose(&usable).min(usable.len() - 1),
                            None => 0,
                        };
                        vec![usable[index].clone()]
                    }
                };

                let mut env = RuleEnv::new(&self.model, &self.dag);
                return Ok(selected
                    .iter()
                    .map(|z| adjustment_expression(head, x, &observations, z, &mut env))
                    .collect());
            }
        }

        let initial = Expr::prob(
            head.iter().map(Term::from_assertion).collect(),
            body.iter().map(Term::from_assertion).collect(),
        );
        debug!(query = %initial, "no backdoor shortcut, searching rewrites");
        let expr = eliminate_interventions(&initial, &self.model, &self.dag, &self.ctx)?;
        Ok(vec![expr])
    }

    fn evaluate(&mut self, expr: &Expr) -> Result<f64, EngineError> {
        let mut evaluator =
            Evaluator::new(&self.model, &self.dag, &mut self.eval_cache, &self.ctx);
        evaluate_expr(expr, &mut evaluator)
    }
}

/// The backdoor adjustment for deconfounding set Z:
/// Σ_z P(head | X, W, Z=z) · P(Z=z | W), with the intervention read as an
/// observation inside the adjusted term.
fn adjustment_expression(
    head: &[Assertion],
    x: &Assertion,
    observations: &[&Assertion],
    z: &BTreeSet<String>,
    env: &mut RuleEnv,
) -> Expr {
    let head_terms: Vec<Term> = head.iter().map(Term::from_assertion).collect();
    let w_terms: Vec<Term> = observations
        .iter()
        .map(|a| Term::from_assertion(a))
        .collect();

    let bound: Vec<(String, String)> = z
        .iter()
        .map(|variable| (variable.clone(), env.fresh_placeholder(variable)))
        .collect();
    let z_terms: Vec<Term> = bound
        .iter()
        .map(|(variable, placeholder)| Term::bound(variable, placeholder))
        .collect();

    let mut adjusted_body = vec![Term::observed(&x.variable, &x.outcome)];
    adjusted_body.extend(w_terms.iter().cloned());
    adjusted_body.extend(z_terms.iter().cloned());

    let mut expr = if z_terms.is_empty() {
        Expr::prob(head_terms, adjusted_body)
    } else {
        Expr::Product(vec![
            Expr::prob(head_terms, adjusted_body),
            Expr::prob(z_terms, w_terms),
        ])
    };
    for (variable, placeholder) in bound.into_iter().rev() {
        expr = Expr::sum(variable, placeholder, expr);
    }
    expr
}

/// Numeric evaluation of a do-free symbolic expression: products multiply,
/// sums enumerate the outcomes of their source variable, `Prob` leaves go
/// to the evaluator.
pub fn evaluate_expr(expr: &Expr, evaluator: &mut Evaluator) -> Result<f64, EngineError> {
    match expr {
        Expr::Literal(value) => Ok(*value),
        Expr::Product(factors) => {
            let mut product = 1.0;
            for factor in factors {
                product *= evaluate_expr(factor, evaluator)?;
            }
            Ok(product)
        }
        Expr::Sum {
            variable,
            bound,
            inner,
        } => {
            let outcomes = evaluator
                .model()
                .outcomes(variable)
                .ok_or_else(|| EngineError::QueryShape {
                    reason: format!("unknown variable '{}'", variable),
                })?
                .to_vec();
            let mut total = 0.0;
            for outcome in &outcomes {
                total += evaluate_expr(&inner.substitute(bound, outcome), evaluator)?;
            }
            Ok(total)
        }
        Expr::Prob { head, body } => {
            let concrete = |terms: &[Term]| -> Result<Vec<Assertion>, EngineError> {
                terms
                    .iter()
                    .map(|t| {
                        t.to_assertion().ok_or_else(|| EngineError::Indeterminable {
                            query: format!("unbound placeholder in {}", t),
                        })
                    })
                    .collect()
            };
            evaluator.probability(&concrete(head)?, &concrete(body)?)
        }
    }
}
