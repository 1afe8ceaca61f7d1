//! Shared model fixtures for the integration suites.

use causal_model::{Cpt, CptRow, Model, Variable};

pub fn row(outcome: &str, parents: &[&str], p: f64) -> CptRow {
    CptRow {
        outcome: outcome.into(),
        parent_outcomes: parents.iter().map(|s| s.to_string()).collect(),
        probability: p,
    }
}

/// Y -> X with P(y) = 0.7, P(x|y) = 0.9, P(x|~y) = 0.75.
pub fn chain_model() -> Model {
    Model::new(
        Some("chain".into()),
        vec![
            Variable::new(
                "Y",
                vec!["y".into(), "~y".into()],
                vec![],
                Some(Cpt::new(vec![row("y", &[], 0.7), row("~y", &[], 0.3)])),
            ),
            Variable::new(
                "X",
                vec!["x".into(), "~x".into()],
                vec!["Y".into()],
                Some(Cpt::new(vec![
                    row("x", &["y"], 0.9),
                    row("~x", &["y"], 0.1),
                    row("x", &["~y"], 0.75),
                    row("~x", &["~y"], 0.25),
                ])),
            ),
        ],
    )
    .expect("chain fixture is valid")
}

/// Z -> X, Z -> Y, X -> Y: a single observable confounder.
pub fn confounded_model() -> Model {
    Model::new(
        Some("confounded pair".into()),
        vec![
            Variable::new(
                "Z",
                vec!["z".into(), "~z".into()],
                vec![],
                Some(Cpt::new(vec![row("z", &[], 0.5), row("~z", &[], 0.5)])),
            ),
            Variable::new(
                "X",
                vec!["x".into(), "~x".into()],
                vec!["Z".into()],
                Some(Cpt::new(vec![
                    row("x", &["z"], 0.8),
                    row("~x", &["z"], 0.2),
                    row("x", &["~z"], 0.3),
                    row("~x", &["~z"], 0.7),
                ])),
            ),
            Variable::new(
                "Y",
                vec!["y".into(), "~y".into()],
                vec!["X".into(), "Z".into()],
                Some(Cpt::new(vec![
                    row("y", &["x", "z"], 0.9),
                    row("~y", &["x", "z"], 0.1),
                    row("y", &["x", "~z"], 0.7),
                    row("~y", &["x", "~z"], 0.3),
                    row("y", &["~x", "z"], 0.5),
                    row("~y", &["~x", "z"], 0.5),
                    row("y", &["~x", "~z"], 0.2),
                    row("~y", &["~x", "~z"], 0.8),
                ])),
            ),
        ],
    )
    .expect("confounded fixture is valid")
}

/// Two interacting confounders:
/// A -> X, A -> M, B -> M, B -> Y, M -> Y, X -> Y.
///
/// Several distinct sets block every backdoor path from X to Y, so the
/// `all` policy has real work to do.
pub fn double_confounded_model() -> Model {
    Model::new(
        Some("double confounded".into()),
        vec![
            Variable::new(
                "A",
                vec!["a".into(), "~a".into()],
                vec![],
                Some(Cpt::new(vec![row("a", &[], 0.5), row("~a", &[], 0.5)])),
            ),
            Variable::new(
                "B",
                vec!["b".into(), "~b".into()],
                vec![],
                Some(Cpt::new(vec![row("b", &[], 0.4), row("~b", &[], 0.6)])),
            ),
            Variable::new(
                "M",
                vec!["m".into(), "~m".into()],
                vec!["A".into(), "B".into()],
                Some(Cpt::new(vec![
                    row("m", &["a", "b"], 0.9),
                    row("~m", &["a", "b"], 0.1),
                    row("m", &["a", "~b"], 0.6),
                    row("~m", &["a", "~b"], 0.4),
                    row("m", &["~a", "b"], 0.5),
                    row("~m", &["~a", "b"], 0.5),
                    row("m", &["~a", "~b"], 0.2),
                    row("~m", &["~a", "~b"], 0.8),
                ])),
            ),
            Variable::new(
                "X",
                vec!["x".into(), "~x".into()],
                vec!["A".into()],
                Some(Cpt::new(vec![
                    row("x", &["a"], 0.7),
                    row("~x", &["a"], 0.3),
                    row("x", &["~a"], 0.4),
                    row("~x", &["~a"], 0.6),
                ])),
            ),
            Variable::new(
                "Y",
                vec!["y".into(), "~y".into()],
                vec!["X".into(), "M".into(), "B".into()],
                Some(Cpt::new(vec![
                    row("y", &["x", "m", "b"], 0.95),
                    row("~y", &["x", "m", "b"], 0.05),
                    row("y", &["x", "m", "~b"], 0.8),
                    row("~y", &["x", "m", "~b"], 0.2),
                    row("y", &["x", "~m", "b"], 0.6),
                    row("~y", &["x", "~m", "b"], 0.4),
                    row("y", &["x", "~m", "~b"], 0.35),
                    row("~y", &["x", "~m", "~b"], 0.65),
                    row("y", &["~x", "m", "b"], 0.7),
                    row("~y", &["~x", "m", "b"], 0.3),
                    row("y", &["~x", "m", "~b"], 0.5),
                    row("~y", &["~x", "m", "~b"], 0.5),
                    row("y", &["~x", "~m", "b"], 0.3),
                    row("~y", &["~x", "~m", "b"], 0.7),
                    row("y", &["~x", "~m", "~b"], 0.1),
                    row("~y", &["~x", "~m", "~b"], 0.9),
                ])),
            ),
        ],
    )
    .expect("double-confounded fixture is valid")
}

/// The front-door graph: latent U confounds X and Y, X -> Z -> Y.
///
/// U carries a ground-truth table so the fixture can be evaluated
/// numerically, but stays latent for deconfounding purposes. Hand
/// computation for this parameterization:
/// P(Y=y | do(X=x)) = 0.62 and P(Y=y | do(X=~x)) = 0.50.
pub fn frontdoor_model() -> Model {
    Model::new(
        Some("front-door".into()),
        vec![
            Variable::new(
                "U",
                vec!["u".into(), "~u".into()],
                vec![],
                Some(Cpt::new(vec![row("u", &[], 0.5), row("~u", &[], 0.5)])),
            )
            .latent(),
            Variable::new(
                "X",
                vec!["x".into(), "~x".into()],
                vec!["U".into()],
                Some(Cpt::new(vec![
                    row("x", &["u"], 0.8),
                    row("~x", &["u"], 0.2),
                    row("x", &["~u"], 0.2),
                    row("~x", &["~u"], 0.8),
                ])),
            ),
            Variable::new(
                "Z",
                vec!["z".into(), "~z".into()],
                vec!["X".into()],
                Some(Cpt::new(vec![
                    row("z", &["x"], 0.75),
                    row("~z", &["x"], 0.25),
                    row("z", &["~x"], 0.25),
                    row("~z", &["~x"], 0.75),
                ])),
            ),
            Variable::new(
                "Y",
                vec!["y".into(), "~y".into()],
                vec!["Z".into(), "U".into()],
                Some(Cpt::new(vec![
                    row("y", &["z", "u"], 0.9),
                    row("~y", &["z", "u"], 0.1),
                    row("y", &["z", "~u"], 0.46),
                    row("~y", &["z", "~u"], 0.54),
                    row("y", &["~z", "u"], 0.6),
                    row("~y", &["~z", "u"], 0.4),
                    row("y", &["~z", "~u"], 0.28),
                    row("~y", &["~z", "~u"], 0.72),
                ])),
            ),
        ],
    )
    .expect("front-door fixture is valid")
}
