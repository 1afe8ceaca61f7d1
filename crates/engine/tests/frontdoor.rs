//! Front-door identification: the rule search must eliminate every do(·)
//! when no observable deconfounder exists, emit the front-door adjustment,
//! and agree with brute-force truncated factorization.

mod common;

use std::collections::BTreeSet;

use causal_engine::{Context, Do, EngineError, Expr, Term};
use causal_model::{Assertion, Model};

use common::frontdoor_model;

const TOLERANCE: f64 = 1e-9;

fn set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Brute-force evaluation by truncated factorization: drop the factors of
/// the intervened variables, fix their values, and sum the rest.
fn truncated_factorization(
    model: &Model,
    head: &[(&str, &str)],
    interventions: &[(&str, &str)],
) -> f64 {
    let variables: Vec<&str> = model.variables().collect();
    let outcome_lists: Vec<&[String]> = variables
        .iter()
        .map(|v| model.outcomes(v).expect("known variable"))
        .collect();

    let mut total = 0.0;
    let combinations: usize = outcome_lists.iter().map(|l| l.len()).product();
    for mut index in 0..combinations {
        let mut assignment: Vec<(&str, &str)> = Vec::with_capacity(variables.len());
        for i in (0..variables.len()).rev() {
            let list = outcome_lists[i];
            assignment.push((variables[i], list[index % list.len()].as_str()));
            index /= list.len();
        }
        assignment.reverse();

        let lookup = |name: &str| -> &str {
            assignment
                .iter()
                .find(|(v, _)| *v == name)
                .map(|(_, o)| *o)
                .expect("assignment covers every variable")
        };

        if interventions.iter().any(|(v, o)| lookup(v) != *o) {
            continue;
        }
        if head.iter().any(|(v, o)| lookup(v) != *o) {
            continue;
        }

        let mut weight = 1.0;
        for variable in &variables {
            if interventions.iter().any(|(v, _)| v == variable) {
                continue;
            }
            let parents: Vec<&str> = model
                .parents(variable)
                .expect("known variable")
                .iter()
                .map(|p| lookup(p))
                .collect();
            weight *= model
                .probability(variable, lookup(variable), &parents)
                .expect("tables are complete");
        }
        total += weight;
    }
    total
}

#[test]
fn no_observable_deconfounder_exists() {
    let session = Do::new(frontdoor_model());
    let sets = session
        .deconfounding_sets(&set(&["X"]), &set(&["Y"]))
        .unwrap();
    assert!(sets.is_empty());
}

#[test]
fn frontdoor_query_matches_hand_computation() {
    let mut session = Do::new(frontdoor_model());

    let p_do_x = session
        .p(
            &[Assertion::observed("Y", "y")],
            &[Assertion::intervened("X", "x")],
        )
        .unwrap();
    assert!((p_do_x - 0.62).abs() < TOLERANCE, "got {}", p_do_x);

    let p_do_not_x = session
        .p(
            &[Assertion::observed("Y", "y")],
            &[Assertion::intervened("X", "~x")],
        )
        .unwrap();
    assert!((p_do_not_x - 0.50).abs() < TOLERANCE, "got {}", p_do_not_x);
}

#[test]
fn frontdoor_query_matches_truncated_factorization() {
    let model = frontdoor_model();
    let mut session = Do::new(model.clone());

    for x in ["x", "~x"] {
        let engine = session
            .p(
                &[Assertion::observed("Y", "y")],
                &[Assertion::intervened("X", x)],
            )
            .unwrap();
        let brute = truncated_factorization(&model, &[("Y", "y")], &[("X", x)]);
        assert!(
            (engine - brute).abs() < TOLERANCE,
            "engine {} vs brute force {}",
            engine,
            brute
        );
    }
}

#[test]
fn frontdoor_expression_has_the_adjustment_shape() {
    let mut session = Do::new(frontdoor_model());
    let (expr, _) = session
        .query(
            &[Assertion::observed("Y", "y")],
            &[Assertion::intervened("X", "x")],
        )
        .unwrap();

    assert!(!expr.has_interventions());

    // Σ_z [ Σ_x′ [P(Y | Z, X′) * P(X′)] * P(Z | X) ], factors in any order.
    let (outer_variable, outer_factors) = match &expr {
        Expr::Sum {
            variable, inner, ..
        } => match inner.as_ref() {
            Expr::Product(factors) => (variable.as_str(), factors.clone()),
            other => panic!("expected a product under the outer sum, got {}", other),
        },
        other => panic!("expected an outer sum, got {}", other),
    };
    assert_eq!(outer_variable, "Z");
    assert_eq!(outer_factors.len(), 2);

    let z_given_x = outer_factors.iter().any(|f| match f {
        Expr::Prob { head, body } => {
            head.len() == 1
                && head[0].variable == "Z"
                && body.len() == 1
                && body[0] == Term::observed("X", "x")
        }
        _ => false,
    });
    assert!(z_given_x, "missing P(Z | X = x) factor in {}", expr);

    let inner_sum = outer_factors.iter().find_map(|f| match f {
        Expr::Sum {
            variable, inner, ..
        } if variable == "X" => Some(inner.as_ref().clone()),
        _ => None,
    });
    let inner_factors = match inner_sum {
        Some(Expr::Product(factors)) => factors,
        other => panic!("expected Σ over X with a product inside, got {:?}", other),
    };

    let y_given_z_x = inner_factors.iter().any(|f| match f {
        Expr::Prob { head, body } => {
            head.len() == 1
                && head[0].variable == "Y"
                && body.iter().any(|t| t.variable == "Z")
                && body.iter().any(|t| t.variable == "X")
        }
        _ => false,
    });
    assert!(y_given_z_x, "missing P(Y | Z, X′) factor in {}", expr);

    let x_prior = inner_factors.iter().any(|f| match f {
        Expr::Prob { head, body } => {
            head.len() == 1 && head[0].variable == "X" && body.is_empty()
        }
        _ => false,
    });
    assert!(x_prior, "missing P(X′) factor in {}", expr);
}

#[test]
fn search_does_not_collapse_to_marginal_times_mediator() {
    // The improperly shortened derivation Σ_z′ P(Y) · P(Z′ | X) evaluates
    // to 0.569 on this fixture; rule 3's ancestor restriction must keep the
    // search from producing it.
    let mut session = Do::new(frontdoor_model());
    let (expr, value) = session
        .query(
            &[Assertion::observed("Y", "y")],
            &[Assertion::intervened("X", "x")],
        )
        .unwrap();

    fn contains_unconditioned_y(expr: &Expr) -> bool {
        match expr {
            Expr::Prob { head, body } => {
                head.iter().any(|t| t.variable == "Y") && body.is_empty()
            }
            Expr::Product(factors) => factors.iter().any(contains_unconditioned_y),
            Expr::Sum { inner, .. } => contains_unconditioned_y(inner),
            Expr::Literal(_) => false,
        }
    }
    assert!(
        !contains_unconditioned_y(&expr),
        "derivation collapsed to a bare P(Y): {}",
        expr
    );
    assert!((value - 0.62).abs() < TOLERANCE);
    assert!((value - 0.569).abs() > 1e-3);
}

#[test]
fn shallow_depth_bound_fails_with_partial() {
    let ctx = Context::default().with_depth_bound(3);
    let mut session = Do::with_context(frontdoor_model(), ctx);
    let result = session.p(
        &[Assertion::observed("Y", "y")],
        &[Assertion::intervened("X", "x")],
    );
    assert!(matches!(result, Err(EngineError::DoCalculusFailed { .. })));
}
