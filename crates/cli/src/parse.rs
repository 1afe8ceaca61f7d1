//! Query-string parsing for the shell.
//!
//! Probability queries look like `Y = y | X = x, do(Z = z)`; path queries
//! look like `X, W -> Y | Z`. Parsing is intentionally forgiving about
//! whitespace and strict about everything else.

use std::collections::BTreeSet;

use causal_model::Assertion;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed assertion '{input}' (expected 'VAR = outcome')")]
    MalformedAssertion { input: String },

    #[error("malformed intervention '{input}' (expected 'do(VAR = outcome)')")]
    MalformedIntervention { input: String },

    #[error("malformed path query '{input}' (expected 'SRC -> DST' or 'SRC -> DST | BLOCKERS')")]
    MalformedPathQuery { input: String },

    #[error("empty query")]
    Empty,
}

/// Split on commas that are not nested inside parentheses.
fn split_top_level(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in input.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&input[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

fn parse_assignment(input: &str) -> Result<(String, String), ParseError> {
    let mut halves = input.splitn(2, '=');
    let variable = halves.next().unwrap_or_default().trim();
    let outcome = halves.next().unwrap_or_default().trim();
    if variable.is_empty() || outcome.is_empty() {
        return Err(ParseError::MalformedAssertion {
            input: input.to_string(),
        });
    }
    Ok((variable.to_string(), outcome.to_string()))
}

/// Parse a comma-separated assertion list, e.g. `X = x, do(Z = z), W = ~w`.
pub fn parse_assertions(input: &str) -> Result<Vec<Assertion>, ParseError> {
    let mut assertions = Vec::new();
    for segment in split_top_level(input) {
        if let Some(inner) = segment
            .strip_prefix("do(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            if inner.trim().is_empty() {
                return Err(ParseError::MalformedIntervention {
                    input: segment.to_string(),
                });
            }
            for assignment in split_top_level(inner) {
                let (variable, outcome) =
                    parse_assignment(assignment).map_err(|_| {
                        ParseError::MalformedIntervention {
                            input: segment.to_string(),
                        }
                    })?;
                assertions.push(Assertion::intervened(variable, outcome));
            }
        } else {
            let (variable, outcome) = parse_assignment(segment)?;
            assertions.push(Assertion::observed(variable, outcome));
        }
    }
    Ok(assertions)
}

/// Parse `HEAD | BODY` into head and body assertion lists; the body is
/// optional.
pub fn parse_probability_query(
    input: &str,
) -> Result<(Vec<Assertion>, Vec<Assertion>), ParseError> {
    let mut halves = input.splitn(2, '|');
    let head_text = halves.next().unwrap_or_default().trim();
    if head_text.is_empty() {
        return Err(ParseError::Empty);
    }
    let head = parse_assertions(head_text)?;
    let body = match halves.next() {
        Some(body_text) if !body_text.trim().is_empty() => parse_assertions(body_text)?,
        _ => Vec::new(),
    };
    Ok((head, body))
}

/// Parse `SRC -> DST` or `SRC -> DST | BLOCKERS` into three vertex sets.
pub fn parse_path_query(
    input: &str,
) -> Result<(BTreeSet<String>, BTreeSet<String>, BTreeSet<String>), ParseError> {
    let malformed = || ParseError::MalformedPathQuery {
        input: input.to_string(),
    };

    let mut arrow = input.splitn(2, "->");
    let src_text = arrow.next().unwrap_or_default().trim();
    let rest = arrow.next().ok_or_else(malformed)?.trim();

    let mut bar = rest.splitn(2, '|');
    let dst_text = bar.next().unwrap_or_default().trim();
    let blockers_text = bar.next().unwrap_or_default().trim();

    let names = |text: &str| -> BTreeSet<String> {
        text.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    };

    let src = names(src_text);
    let dst = names(dst_text);
    if src.is_empty() || dst.is_empty() {
        return Err(malformed());
    }
    Ok((src, dst, names(blockers_text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_head_only() {
        let (head, body) = parse_probability_query("Y = y").unwrap();
        assert_eq!(head, vec![Assertion::observed("Y", "y")]);
        assert!(body.is_empty());
    }

    #[test]
    fn test_parse_mixed_body() {
        let (head, body) =
            parse_probability_query("Y = y | X = ~x, do(Z = z)").unwrap();
        assert_eq!(head, vec![Assertion::observed("Y", "y")]);
        assert_eq!(
            body,
            vec![
                Assertion::observed("X", "~x"),
                Assertion::intervened("Z", "z"),
            ]
        );
    }

    #[test]
    fn test_parse_multi_variable_do() {
        let (_, body) = parse_probability_query("Y = y | do(X = x, Z = z)").unwrap();
        assert_eq!(
            body,
            vec![
                Assertion::intervened("X", "x"),
                Assertion::intervened("Z", "z"),
            ]
        );
    }

    #[test]
    fn test_parse_path_query() {
        let (src, dst, blockers) = parse_path_query("X, W -> Y | Z").unwrap();
        assert_eq!(src, BTreeSet::from(["X".to_string(), "W".to_string()]));
        assert_eq!(dst, BTreeSet::from(["Y".to_string()]));
        assert_eq!(blockers, BTreeSet::from(["Z".to_string()]));
    }

    #[test]
    fn test_parse_path_query_without_blockers() {
        let (src, dst, blockers) = parse_path_query("X -> Y").unwrap();
        assert_eq!(src.len(), 1);
        assert_eq!(dst.len(), 1);
        assert!(blockers.is_empty());
    }

    #[test]
    fn test_malformed_assertion() {
        let result = parse_probability_query("Y y");
        assert!(matches!(
            result,
            Err(ParseError::MalformedAssertion { .. })
        ));
    }

    #[test]
    fn test_malformed_path_query() {
        let result = parse_path_query("X Y Z");
        assert!(matches!(
            result,
            Err(ParseError::MalformedPathQuery { .. })
        ));
    }
}
