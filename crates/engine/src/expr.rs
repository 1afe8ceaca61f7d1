//! Symbolic probability expressions.
//!
//! The do-calculus layer manipulates a small expression algebra:
//!
//! - [`Expr::Prob`] — an atomic conditional probability term whose body may
//!   mix observations and interventions
//! - [`Expr::Product`] — a product of factors
//! - [`Expr::Sum`] — Σ over the outcomes of one variable, binding a fresh
//!   primed placeholder (X → x′ → x″) to avoid capture
//! - [`Expr::Literal`] — a fixed numeric factor
//!
//! Expression kinds are a tagged variant with exhaustive case analysis;
//! every operation is a plain function of the tree. `normalize` flattens
//! nested products, folds literal factors and collapses sums over a zero
//! inner expression; all semantic rewriting is left to the rule search.

use std::fmt;

use causal_model::{Assertion, AssertionKind};

/// The value slot of a term: a concrete outcome or a placeholder bound by an
/// enclosing sum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    Outcome(String),
    Bound(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Outcome(o) => write!(f, "{}", o),
            Value::Bound(b) => write!(f, "{}", b),
        }
    }
}

/// One assertion inside a `Prob` term.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Term {
    pub variable: String,
    pub value: Value,
    pub kind: AssertionKind,
}

impl Term {
    pub fn observed(variable: impl Into<String>, outcome: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            value: Value::Outcome(outcome.into()),
            kind: AssertionKind::Observation,
        }
    }

    pub fn intervened(variable: impl Into<String>, outcome: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            value: Value::Outcome(outcome.into()),
            kind: AssertionKind::Intervention,
        }
    }

    /// An observation whose outcome is a placeholder bound by a sum.
    pub fn bound(variable: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            value: Value::Bound(placeholder.into()),
            kind: AssertionKind::Observation,
        }
    }

    pub fn from_assertion(assertion: &Assertion) -> Self {
        Self {
            variable: assertion.variable.clone(),
            value: Value::Outcome(assertion.outcome.clone()),
            kind: assertion.kind,
        }
    }

    /// Back to a concrete assertion; `None` while the value is still bound.
    pub fn to_assertion(&self) -> Option<Assertion> {
        match &self.value {
            Value::Outcome(outcome) => Some(Assertion {
                variable: self.variable.clone(),
                outcome: outcome.clone(),
                kind: self.kind,
            }),
            Value::Bound(_) => None,
        }
    }

    pub fn is_intervention(&self) -> bool {
        self.kind == AssertionKind::Intervention
    }

    fn with_kind(&self, kind: AssertionKind) -> Self {
        Self {
            variable: self.variable.clone(),
            value: self.value.clone(),
            kind,
        }
    }

    pub fn as_observed(&self) -> Self {
        self.with_kind(AssertionKind::Observation)
    }

    pub fn as_intervened(&self) -> Self {
        self.with_kind(AssertionKind::Intervention)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            AssertionKind::Observation => write!(f, "{} = {}", self.variable, self.value),
            AssertionKind::Intervention => write!(f, "do({} = {})", self.variable, self.value),
        }
    }
}

/// A symbolic probability expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Prob { head: Vec<Term>, body: Vec<Term> },
    Product(Vec<Expr>),
    Sum {
        /// The model variable whose outcomes the sum ranges over.
        variable: String,
        /// The fresh placeholder substituted during evaluation.
        bound: String,
        inner: Box<Expr>,
    },
    Literal(f64),
}

impl Expr {
    pub fn prob(head: Vec<Term>, body: Vec<Term>) -> Self {
        Expr::Prob { head, body }
    }

    pub fn sum(variable: impl Into<String>, bound: impl Into<String>, inner: Expr) -> Self {
        Expr::Sum {
            variable: variable.into(),
            bound: bound.into(),
            inner: Box::new(inner),
        }
    }

    /// Replace every occurrence of a bound placeholder with a concrete
    /// outcome.
    pub fn substitute(&self, placeholder: &str, outcome: &str) -> Expr {
        match self {
            Expr::Prob { head, body } => {
                let replace = |terms: &[Term]| {
                    terms
                        .iter()
                        .map(|t| match &t.value {
                            Value::Bound(b) if b == placeholder => Term {
                                variable: t.variable.clone(),
                                value: Value::Outcome(outcome.to_string()),
                                kind: t.kind,
                            },
                            _ => t.clone(),
                        })
                        .collect()
                };
                Expr::Prob {
                    head: replace(head),
                    body: replace(body),
                }
            }
            Expr::Product(factors) => Expr::Product(
                factors
                    .iter()
                    .map(|f| f.substitute(placeholder, outcome))
                    .collect(),
            ),
            Expr::Sum {
                variable,
                bound,
                inner,
            } => Expr::Sum {
                variable: variable.clone(),
                bound: bound.clone(),
                inner: Box::new(inner.substitute(placeholder, outcome)),
            },
            Expr::Literal(v) => Expr::Literal(*v),
        }
    }

    /// Flatten nested products, fold literal factors, collapse zero sums.
    pub fn normalize(self) -> Expr {
        match self {
            Expr::Product(factors) => {
                let mut flat = Vec::new();
                let mut literal = 1.0;
                for factor in factors {
                    match factor.normalize() {
                        Expr::Literal(v) => literal *= v,
                        Expr::Product(inner) => flat.extend(inner),
                        other => flat.push(other),
                    }
                }
                if literal == 0.0 {
                    return Expr::Literal(0.0);
                }
                if literal != 1.0 {
                    flat.insert(0, Expr::Literal(literal));
                }
                match flat.len() {
                    0 => Expr::Literal(1.0),
                    1 => flat.into_iter().next().unwrap_or(Expr::Literal(1.0)),
                    _ => Expr::Product(flat),
                }
            }
            Expr::Sum {
                variable,
                bound,
                inner,
            } => {
                let inner = inner.normalize();
                if inner == Expr::Literal(0.0) {
                    Expr::Literal(0.0)
                } else {
                    Expr::Sum {
                        variable,
                        bound,
                        inner: Box::new(inner),
                    }
                }
            }
            other => other,
        }
    }

    /// Node count, the size measure used for search tie-breaking.
    pub fn size(&self) -> usize {
        match self {
            Expr::Prob { .. } | Expr::Literal(_) => 1,
            Expr::Product(factors) => 1 + factors.iter().map(Expr::size).sum::<usize>(),
            Expr::Sum { inner, .. } => 1 + inner.size(),
        }
    }

    /// Whether any `Prob` term still carries an intervention.
    pub fn has_interventions(&self) -> bool {
        self.intervention_count() > 0
    }

    /// Total interventions across all `Prob` terms.
    pub fn intervention_count(&self) -> usize {
        match self {
            Expr::Prob { head, body } => head
                .iter()
                .chain(body)
                .filter(|t| t.is_intervention())
                .count(),
            Expr::Product(factors) => factors.iter().map(Expr::intervention_count).sum(),
            Expr::Sum { inner, .. } => inner.intervention_count(),
            Expr::Literal(_) => 0,
        }
    }

    /// Order-independent rendering used for visited-set deduplication and
    /// deterministic tie-breaking.
    pub fn canonical(&self) -> String {
        match self {
            Expr::Prob { head, body } => {
                let render = |terms: &[Term]| {
                    let mut sorted: Vec<&Term> = terms.iter().collect();
                    sorted.sort();
                    sorted
                        .iter()
                        .map(|t| t.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                if body.is_empty() {
                    format!("P({})", render(head))
                } else {
                    format!("P({} | {})", render(head), render(body))
                }
            }
            Expr::Product(factors) => {
                let mut parts: Vec<String> = factors.iter().map(Expr::canonical).collect();
                parts.sort();
                parts.join(" * ")
            }
            Expr::Sum {
                variable,
                bound,
                inner,
            } => format!("Σ_{{{}:{}}} [{}]", bound, variable, inner.canonical()),
            Expr::Literal(v) => format!("{}", v),
        }
    }

    /// Every free placeholder is bound by an enclosing sum.
    pub fn well_formed(&self) -> bool {
        fn check(expr: &Expr, bound: &mut Vec<String>) -> bool {
            match expr {
                Expr::Prob { head, body } => head.iter().chain(body).all(|t| match &t.value {
                    Value::Bound(b) => bound.contains(b),
                    Value::Outcome(_) => true,
                }),
                Expr::Product(factors) => factors.iter().all(|f| check(f, bound)),
                Expr::Sum {
                    bound: name, inner, ..
                } => {
                    bound.push(name.clone());
                    let ok = check(inner, bound);
                    bound.pop();
                    ok
                }
                Expr::Literal(_) => true,
            }
        }
        check(self, &mut Vec::new())
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Prob { head, body } => {
                let render = |terms: &[Term]| {
                    terms
                        .iter()
                        .map(|t| t.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                if body.is_empty() {
                    write!(f, "P({})", render(head))
                } else {
                    write!(f, "P({} | {})", render(head), render(body))
                }
            }
            Expr::Product(factors) => {
                let parts: Vec<String> = factors.iter().map(|e| e.to_string()).collect();
                write!(f, "{}", parts.join(" * "))
            }
            Expr::Sum { bound, inner, .. } => write!(f, "Σ_{{{}}} [{}]", bound, inner),
            Expr::Literal(v) => write!(f, "{}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let expr = Expr::prob(
            vec![Term::observed("Y", "y")],
            vec![Term::intervened("X", "x"), Term::observed("Z", "z")],
        );
        assert_eq!(expr.to_string(), "P(Y = y | do(X = x), Z = z)");
    }

    #[test]
    fn test_substitute_bound_placeholder() {
        let expr = Expr::sum(
            "Z",
            "z′",
            Expr::prob(
                vec![Term::observed("Y", "y")],
                vec![Term::bound("Z", "z′")],
            ),
        );
        if let Expr::Sum { inner, .. } = &expr {
            let concrete = inner.substitute("z′", "z");
            assert_eq!(
                concrete,
                Expr::prob(
                    vec![Term::observed("Y", "y")],
                    vec![Term::observed("Z", "z")],
                )
            );
        } else {
            unreachable!();
        }
    }

    #[test]
    fn test_normalize_flattens_products() {
        let nested = Expr::Product(vec![
            Expr::Product(vec![
                Expr::prob(vec![Term::observed("A", "a")], vec![]),
                Expr::Literal(0.5),
            ]),
            Expr::Literal(0.5),
        ]);
        let normalized = nested.normalize();
        match normalized {
            Expr::Product(factors) => {
                assert_eq!(factors.len(), 2);
                assert_eq!(factors[0], Expr::Literal(0.25));
            }
            other => panic!("expected a product, got {}", other),
        }
    }

    #[test]
    fn test_normalize_drops_unit_literals() {
        let product = Expr::Product(vec![
            Expr::Literal(1.0),
            Expr::prob(vec![Term::observed("A", "a")], vec![]),
        ]);
        assert_eq!(
            product.normalize(),
            Expr::prob(vec![Term::observed("A", "a")], vec![])
        );
    }

    #[test]
    fn test_normalize_zero_sum_collapses() {
        let sum = Expr::sum("X", "x′", Expr::Literal(0.0));
        assert_eq!(sum.normalize(), Expr::Literal(0.0));
    }

    #[test]
    fn test_canonical_is_order_independent() {
        let a = Expr::prob(
            vec![Term::observed("Y", "y")],
            vec![Term::observed("Z", "z"), Term::intervened("X", "x")],
        );
        let b = Expr::prob(
            vec![Term::observed("Y", "y")],
            vec![Term::intervened("X", "x"), Term::observed("Z", "z")],
        );
        assert_eq!(a.canonical(), b.canonical());
    }

    #[test]
    fn test_well_formed() {
        let good = Expr::sum(
            "X",
            "x′",
            Expr::prob(vec![Term::bound("X", "x′")], vec![]),
        );
        assert!(good.well_formed());

        let bad = Expr::prob(vec![Term::bound("X", "x′")], vec![]);
        assert!(!bad.well_formed());
    }

    #[test]
    fn test_intervention_count() {
        let expr = Expr::Product(vec![
            Expr::prob(
                vec![Term::observed("Y", "y")],
                vec![Term::intervened("X", "x")],
            ),
            Expr::prob(vec![Term::observed("Z", "z")], vec![]),
        ]);
        assert_eq!(expr.intervention_count(), 1);
        assert!(expr.has_interventions());
    }
}
