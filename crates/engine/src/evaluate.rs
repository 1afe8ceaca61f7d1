//! Recursive evaluation of purely observational queries.
//!
//! Computes P(Head | Body) by rewriting, in order:
//!
//! 1. empty head ⇒ 1.0
//! 2. contradictory outcomes across head ∪ body ⇒ 0.0
//! 3. head ⊆ body ⇒ 1.0
//! 4. multi-variable heads decompose by the product rule, deepest variable
//!    first (fewer marginalizations downstream)
//! 5. single heads read their CPT when every parent is asserted, otherwise
//!    marginalize over the missing parents (Jeffrey's rule)
//! 6. when the body asserts a descendant of the head, fall back to Bayes'
//!    rule, breaking the body down with rule 4
//!
//! Results are memoized against the canonical query rendering; the cache is
//! bound to the model instance that owns it. An in-flight stack aborts any
//! rewrite branch that re-enters a query it is already expanding.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::{debug, trace};

use causal_graph::Dag;
use causal_model::{contradictory, Assertion, Model};

use crate::context::Context;
use crate::error::EngineError;
use crate::util::joint_assignments;

/// Canonical rendering of a query, used as memo key and in error messages.
pub fn query_key(head: &[Assertion], body: &[Assertion]) -> String {
    let render = |assertions: &[Assertion]| {
        let sorted: BTreeSet<&Assertion> = assertions.iter().collect();
        sorted
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };
    if body.is_empty() {
        format!("P({})", render(head))
    } else {
        format!("P({} | {})", render(head), render(body))
    }
}

/// The observational probability evaluator.
///
/// Holds borrowed references only; the owning session supplies the cache so
/// memoized results outlive individual evaluator instances.
pub struct Evaluator<'a> {
    model: &'a Model,
    dag: &'a Dag,
    cache: &'a mut HashMap<String, f64>,
    cache_enabled: bool,
    drift_tolerance: f64,
    in_flight: Vec<String>,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        model: &'a Model,
        dag: &'a Dag,
        cache: &'a mut HashMap<String, f64>,
        ctx: &Context,
    ) -> Self {
        Self {
            model,
            dag,
            cache,
            cache_enabled: ctx.cache,
            drift_tolerance: ctx.drift_tolerance,
            in_flight: Vec::new(),
        }
    }

    pub fn model(&self) -> &Model {
        self.model
    }

    /// Evaluate P(head | body). Both sides must be free of interventions.
    pub fn probability(
        &mut self,
        head: &[Assertion],
        body: &[Assertion],
    ) -> Result<f64, EngineError> {
        if let Some(assertion) = head.iter().chain(body).find(|a| a.is_intervention()) {
            return Err(EngineError::QueryShape {
                reason: format!(
                    "the evaluator only handles observational queries, found {}",
                    assertion
                ),
            });
        }
        self.eval(head, body)
    }

    fn eval(&mut self, head: &[Assertion], body: &[Assertion]) -> Result<f64, EngineError> {
        let key = query_key(head, body);
        trace!(query = %key, "evaluating");

        if head.is_empty() {
            return Ok(1.0);
        }

        let combined: Vec<Assertion> = head.iter().chain(body).cloned().collect();
        if contradictory(&combined) {
            trace!(query = %key, "contradictory outcomes, 0.0");
            return Ok(0.0);
        }

        if head.iter().all(|h| {
            body.iter()
                .any(|b| b.variable == h.variable && b.outcome == h.outcome)
        }) {
            trace!(query = %key, "head asserted in body, 1.0");
            return Ok(1.0);
        }

        if self.cache_enabled {
            if let Some(&value) = self.cache.get(&key) {
                trace!(query = %key, value, "cache hit");
                return Ok(value);
            }
        }

        if self.in_flight.contains(&key) {
            return Err(EngineError::Indeterminable { query: key });
        }

        self.in_flight.push(key.clone());
        let result = self.rewrite(head, body);
        self.in_flight.pop();

        let value = result?;
        if value < -self.drift_tolerance || value > 1.0 + self.drift_tolerance {
            return Err(EngineError::NumericDrift { query: key, value });
        }
        if self.cache_enabled {
            self.cache.insert(key, value);
        }
        Ok(value)
    }

    fn rewrite(&mut self, head: &[Assertion], body: &[Assertion]) -> Result<f64, EngineError> {
        // Product rule: P(H1, Hrest | B) = P(H1 | Hrest, B) * P(Hrest | B),
        // picking the deepest variable as H1.
        if head.len() > 1 {
            let mut ordered = head.to_vec();
            ordered.sort_by_key(|a| {
                (
                    Reverse(self.model.topological_index(&a.variable).unwrap_or(0)),
                    a.variable.clone(),
                )
            });
            let first = ordered.remove(0);
            let mut rest_body = ordered.clone();
            rest_body.extend_from_slice(body);

            debug!(
                "product rule: {} = {} * {}",
                query_key(head, body),
                query_key(std::slice::from_ref(&first), &rest_body),
                query_key(&ordered, body)
            );
            let p_first = self.eval(std::slice::from_ref(&first), &rest_body)?;
            let p_rest = self.eval(&ordered, body)?;
            return Ok(p_first * p_rest);
        }

        let target = &head[0];
        let variable =
            self.model
                .variable(&target.variable)
                .ok_or_else(|| EngineError::QueryShape {
                    reason: format!("unknown variable '{}'", target.variable),
                })?;
        if variable.table().is_none() {
            return Err(EngineError::Indeterminable {
                query: query_key(head, body),
            });
        }

        // Bayes' rule when the body asserts a descendant of the head
        // variable: P(X | B) = P(B | X) * P(X) / P(B).
        let descendants = self.dag.descendants(&target.variable)?;
        if body.iter().any(|b| descendants.contains(&b.variable)) {
            debug!("Bayes' rule on {}", query_key(head, body));
            let p_body_given_x = self.eval(body, head)?;
            let p_x = self.eval(head, &[])?;
            let p_body = self.eval(body, &[])?;
            if p_body == 0.0 {
                return Err(EngineError::ZeroProbability {
                    query: query_key(head, body),
                });
            }
            return Ok(p_body_given_x * p_x / p_body);
        }

        // Direct CPT read when every parent is asserted; asserted
        // non-parents are non-descendants here, so the local Markov
        // property lets them drop out.
        let asserted: BTreeMap<&str, &str> = body
            .iter()
            .map(|a| (a.variable.as_str(), a.outcome.as_str()))
            .collect();
        let missing: Vec<&str> = variable
            .parents()
            .iter()
            .map(String::as_str)
            .filter(|p| !asserted.contains_key(p))
            .collect();

        if missing.is_empty() {
            let parent_values: Vec<&str> = variable
                .parents()
                .iter()
                .map(|p| asserted[p.as_str()])
                .collect();
            let value = self
                .model
                .probability(&target.variable, &target.outcome, &parent_values)
                .ok_or_else(|| EngineError::Indeterminable {
                    query: query_key(head, body),
                })?;
            trace!("table lookup {} = {}", query_key(head, body), value);
            return Ok(value);
        }

        // Jeffrey's rule: sum over every joint assignment to the missing
        // parents M of P(X | m, B) * P(m | B).
        debug!(
            missing = ?missing,
            "marginalizing {} over missing parents",
            query_key(head, body)
        );
        let lists: Vec<(&str, &[String])> = missing
            .iter()
            .map(|p| {
                let outcomes = self
                    .model
                    .outcomes(p)
                    .expect("parents were validated at model construction");
                (*p, outcomes)
            })
            .collect();

        let mut total = 0.0;
        for assignment in joint_assignments(&lists) {
            let extension: Vec<Assertion> = assignment
                .iter()
                .map(|(var, outcome)| Assertion::observed(*var, *outcome))
                .collect();
            let mut extended = body.to_vec();
            extended.extend(extension.iter().cloned());

            let p_head = self.eval(head, &extended)?;
            let p_assignment = self.eval(&extension, body)?;
            total += p_head * p_assignment;
        }
        Ok(total)
    }
}
