//! The three rules of do-calculus plus marginalization.
//!
//! Each rule inspects one `Prob` site whose body still carries
//! interventions and, when its graphical precondition holds, yields a
//! rewritten expression:
//!
//! - **Rule 1** deletes an observation subset W when (Y ⊥ W | X, Z\W) in
//!   Gₓ̄ (incoming edges of the intervened set removed).
//! - **Rule 2** exchanges a subset W between action and observation when
//!   (Y ⊥ W | X, Z) in Gₓ̄ w̲ (incoming of X and outgoing of W removed).
//!   The precondition is symmetric, so both directions are generated.
//! - **Rule 3** deletes an action subset W when (Y ⊥ W | X, Z) in
//!   Gₓ̄ w̄(z), where w̄(z) = W minus the ancestors of Z *computed in Gₓ̄*.
//! - **Rule 4** introduces Σ over a fresh variable V from the ancestral
//!   closure of the term: P(Y | B) = Σ_V P(Y | V, B) · P(V | B).
//!
//! Latent variables are never introduced by rule 4: a term over a latent
//! cannot be estimated from observational data, which would defeat
//! identification.

use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;

use causal_graph::{d_separated, Dag};
use causal_model::Model;

use crate::error::EngineError;
use crate::expr::{Expr, Term};

/// Search-scoped environment: the model, the untouched graph, and the
/// fresh-name counter that keeps sum placeholders globally unique within
/// one inference call.
pub(crate) struct RuleEnv<'a> {
    pub model: &'a Model,
    pub dag: &'a Dag,
    fresh: BTreeMap<String, usize>,
}

impl<'a> RuleEnv<'a> {
    pub fn new(model: &'a Model, dag: &'a Dag) -> Self {
        Self {
            model,
            dag,
            fresh: BTreeMap::new(),
        }
    }

    /// The next primed placeholder for a variable: x′, x′′, x′′′, …
    pub fn fresh_placeholder(&mut self, variable: &str) -> String {
        let count = self.fresh.entry(variable.to_string()).or_insert(0);
        *count += 1;
        format!("{}{}", variable.to_lowercase(), "′".repeat(*count))
    }
}

/// Every expression reachable from `expr` by one rule application at one
/// `Prob` site, in deterministic order.
pub(crate) fn successors(expr: &Expr, env: &mut RuleEnv) -> Result<Vec<Expr>, EngineError> {
    match expr {
        Expr::Literal(_) => Ok(Vec::new()),
        Expr::Prob { head, body } => {
            if body.iter().any(Term::is_intervention) {
                prob_rewrites(head, body, env)
            } else {
                Ok(Vec::new())
            }
        }
        Expr::Product(factors) => {
            let mut out = Vec::new();
            for (i, factor) in factors.iter().enumerate() {
                for rewritten in successors(factor, env)? {
                    let mut copy = factors.clone();
                    copy[i] = rewritten;
                    out.push(Expr::Product(copy));
                }
            }
            Ok(out)
        }
        Expr::Sum {
            variable,
            bound,
            inner,
        } => {
            let mut out = Vec::new();
            for rewritten in successors(inner, env)? {
                out.push(Expr::Sum {
                    variable: variable.clone(),
                    bound: bound.clone(),
                    inner: Box::new(rewritten),
                });
            }
            Ok(out)
        }
    }
}

fn variables_of(terms: &[&Term]) -> BTreeSet<String> {
    terms.iter().map(|t| t.variable.clone()).collect()
}

/// Nonempty subsets of `terms`, by bitmask in increasing order.
fn nonempty_subsets<'t>(terms: &[&'t Term]) -> Vec<Vec<&'t Term>> {
    let mut out = Vec::new();
    for mask in 1u32..(1 << terms.len()) {
        out.push(
            terms
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, t)| *t)
                .collect(),
        );
    }
    out
}

fn without(body: &[Term], remove: &[&Term]) -> Vec<Term> {
    body.iter()
        .filter(|t| !remove.iter().any(|r| *r == *t))
        .cloned()
        .collect()
}

fn rewrite_kinds(body: &[Term], flip: &[&Term], to_intervention: bool) -> Vec<Term> {
    body.iter()
        .map(|t| {
            if flip.iter().any(|r| *r == t) {
                if to_intervention {
                    t.as_intervened()
                } else {
                    t.as_observed()
                }
            } else {
                t.clone()
            }
        })
        .collect()
}

fn prob_rewrites(
    head: &[Term],
    body: &[Term],
    env: &mut RuleEnv,
) -> Result<Vec<Expr>, EngineError> {
    let mut interventions: Vec<&Term> = body.iter().filter(|t| t.is_intervention()).collect();
    let mut observations: Vec<&Term> = body.iter().filter(|t| !t.is_intervention()).collect();
    interventions.sort();
    observations.sort();

    let y = variables_of(&head.iter().collect::<Vec<_>>());
    let do_vars = variables_of(&interventions);
    let obs_vars = variables_of(&observations);

    let mut out = Vec::new();

    // Rule 1: deletion of observations.
    for w in nonempty_subsets(&observations) {
        let w_vars = variables_of(&w);
        let graph = env.dag.without_incoming(&do_vars);
        let mut cond = do_vars.clone();
        cond.extend(obs_vars.difference(&w_vars).cloned());
        if d_separated(&graph, &y, &w_vars, &cond)? {
            trace!(site = %Expr::prob(head.to_vec(), body.to_vec()), w = ?w_vars, "rule 1 deletes observations");
            out.push(Expr::prob(head.to_vec(), without(body, &w)));
        }
    }

    // Rule 2, action -> observation.
    for w in nonempty_subsets(&interventions) {
        let w_vars = variables_of(&w);
        let x_rest: BTreeSet<String> = do_vars.difference(&w_vars).cloned().collect();
        let graph = env.dag.without_incoming(&x_rest).without_outgoing(&w_vars);
        let mut cond = x_rest.clone();
        cond.extend(obs_vars.iter().cloned());
        if d_separated(&graph, &y, &w_vars, &cond)? {
            trace!(w = ?w_vars, "rule 2 exchanges action for observation");
            out.push(Expr::prob(head.to_vec(), rewrite_kinds(body, &w, false)));
        }
    }

    // Rule 2, observation -> action (same precondition, other direction).
    for w in nonempty_subsets(&observations) {
        let w_vars = variables_of(&w);
        let graph = env.dag.without_incoming(&do_vars).without_outgoing(&w_vars);
        let mut cond = do_vars.clone();
        cond.extend(obs_vars.difference(&w_vars).cloned());
        if d_separated(&graph, &y, &w_vars, &cond)? {
            trace!(w = ?w_vars, "rule 2 exchanges observation for action");
            out.push(Expr::prob(head.to_vec(), rewrite_kinds(body, &w, true)));
        }
    }

    // Rule 3: deletion of actions, ancestor-restricted in Gₓ̄.
    for w in nonempty_subsets(&interventions) {
        let w_vars = variables_of(&w);
        let x_rest: BTreeSet<String> = do_vars.difference(&w_vars).cloned().collect();
        let g_x = env.dag.without_incoming(&x_rest);
        let z_ancestors = g_x.ancestors_of_set(&obs_vars)?;
        let w_restricted: BTreeSet<String> =
            w_vars.difference(&z_ancestors).cloned().collect();
        let graph = g_x.without_incoming(&w_restricted);
        let mut cond = x_rest.clone();
        cond.extend(obs_vars.iter().cloned());
        if d_separated(&graph, &y, &w_vars, &cond)? {
            trace!(w = ?w_vars, "rule 3 deletes actions");
            out.push(Expr::prob(head.to_vec(), without(body, &w)));
        }
    }

    // Rule 4: marginalization over a fresh variable from the ancestral
    // closure of the term.
    let asserted: BTreeSet<String> = y
        .iter()
        .chain(do_vars.iter())
        .chain(obs_vars.iter())
        .cloned()
        .collect();
    let mut closure = asserted.clone();
    closure.extend(env.dag.ancestors_of_set(&asserted)?);

    for candidate in &closure {
        if asserted.contains(candidate) || env.model.is_latent(candidate) {
            continue;
        }
        let placeholder = env.fresh_placeholder(candidate);
        let v_term = Term::bound(candidate, &placeholder);

        let mut extended = body.to_vec();
        extended.push(v_term.clone());

        trace!(variable = %candidate, %placeholder, "rule 4 marginalizes");
        out.push(Expr::sum(
            candidate,
            placeholder,
            Expr::Product(vec![
                Expr::prob(head.to_vec(), extended),
                Expr::prob(vec![v_term], body.to_vec()),
            ]),
        ));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use causal_model::{Cpt, CptRow, Variable};

    fn row(outcome: &str, parents: &[&str], p: f64) -> CptRow {
        CptRow {
            outcome: outcome.into(),
            parent_outcomes: parents.iter().map(|s| s.to_string()).collect(),
            probability: p,
        }
    }

    fn binary(name: &str, parents: &[&str], rows: Vec<CptRow>) -> Variable {
        Variable::new(
            name,
            vec![
                format!("{}1", name.to_lowercase()),
                format!("{}0", name.to_lowercase()),
            ],
            parents.iter().map(|s| s.to_string()).collect(),
            Some(Cpt::new(rows)),
        )
    }

    /// Z -> X -> Y with fully specified tables.
    fn chain_model() -> Model {
        Model::new(
            None,
            vec![
                binary("Z", &[], vec![row("z1", &[], 0.4), row("z0", &[], 0.6)]),
                binary(
                    "X",
                    &["Z"],
                    vec![
                        row("x1", &["z1"], 0.7),
                        row("x0", &["z1"], 0.3),
                        row("x1", &["z0"], 0.2),
                        row("x0", &["z0"], 0.8),
                    ],
                ),
                binary(
                    "Y",
                    &["X"],
                    vec![
                        row("y1", &["x1"], 0.9),
                        row("y0", &["x1"], 0.1),
                        row("y1", &["x0"], 0.5),
                        row("y0", &["x0"], 0.5),
                    ],
                ),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_rule_2_applies_in_unconfounded_chain() {
        // In Z -> X -> Y, P(Y | do(X)) = P(Y | X): no backdoor into X
        // stays open once X's outgoing edges are removed.
        let model = chain_model();
        let dag = Dag::from_model(&model);
        let mut env = RuleEnv::new(&model, &dag);

        let expr = Expr::prob(
            vec![Term::observed("Y", "y1")],
            vec![Term::intervened("X", "x1")],
        );
        let successors = successors(&expr, &mut env).unwrap();
        let expected = Expr::prob(
            vec![Term::observed("Y", "y1")],
            vec![Term::observed("X", "x1")],
        );
        assert!(successors.contains(&expected));
    }

    #[test]
    fn test_do_free_site_has_no_rewrites() {
        let model = chain_model();
        let dag = Dag::from_model(&model);
        let mut env = RuleEnv::new(&model, &dag);

        let expr = Expr::prob(
            vec![Term::observed("Y", "y1")],
            vec![Term::observed("X", "x1")],
        );
        assert!(successors(&expr, &mut env).unwrap().is_empty());
    }

    #[test]
    fn test_fresh_placeholders_accumulate_primes() {
        let model = chain_model();
        let dag = Dag::from_model(&model);
        let mut env = RuleEnv::new(&model, &dag);
        assert_eq!(env.fresh_placeholder("X"), "x′");
        assert_eq!(env.fresh_placeholder("X"), "x′′");
        assert_eq!(env.fresh_placeholder("Z"), "z′");
    }
}
