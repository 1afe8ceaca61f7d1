//! Backdoor paths and deconfounding-set search.
//!
//! A backdoor path from X to Y is an undirected path whose first edge points
//! *into* some x ∈ X. A deconfounding set Z blocks every backdoor path from
//! X to Y while containing neither query variables nor descendants of X.

use std::collections::BTreeSet;

use tracing::debug;

use crate::dag::Dag;
use crate::dsep::path_blocked;
use crate::error::GraphError;

fn require_disjoint(a: &BTreeSet<String>, b: &BTreeSet<String>) -> Result<(), GraphError> {
    if let Some(vertex) = a.intersection(b).next() {
        return Err(GraphError::OverlappingSets {
            vertex: vertex.clone(),
        });
    }
    Ok(())
}

fn require_known(dag: &Dag, set: &BTreeSet<String>) -> Result<(), GraphError> {
    for vertex in set {
        if !dag.contains(vertex) {
            return Err(GraphError::UnknownVertex {
                vertex: vertex.clone(),
            });
        }
    }
    Ok(())
}

/// All backdoor paths between the source and sink sets that `blockers` does
/// not block, as ordered vertex sequences (endpoints inclusive).
///
/// An empty result means every backdoor path is blocked.
pub fn backdoor_paths(
    dag: &Dag,
    src: &BTreeSet<String>,
    dst: &BTreeSet<String>,
    blockers: &BTreeSet<String>,
) -> Result<Vec<Vec<String>>, GraphError> {
    require_known(dag, src)?;
    require_known(dag, dst)?;
    require_known(dag, blockers)?;
    require_disjoint(src, dst)?;
    require_disjoint(src, blockers)?;
    require_disjoint(dst, blockers)?;

    let mut paths = Vec::new();
    for s in src {
        for t in dst {
            // The first edge must point into s, so the walk starts by
            // stepping to one of s's parents.
            for parent in dag.parents(s)? {
                if parent == *t {
                    paths.push(vec![s.clone(), parent.clone()]);
                    continue;
                }
                let mut trail = vec![s.clone(), parent.clone()];
                extend(dag, &parent, t, &mut trail, &mut paths)?;
            }
        }
    }
    paths.retain(|path| !path_blocked(dag, path, blockers));
    paths.sort();
    Ok(paths)
}

fn extend(
    dag: &Dag,
    current: &str,
    target: &str,
    trail: &mut Vec<String>,
    paths: &mut Vec<Vec<String>>,
) -> Result<(), GraphError> {
    let mut neighbors: BTreeSet<String> = dag.parents(current)?;
    neighbors.extend(dag.children(current)?);
    for next in neighbors {
        if trail.contains(&next) {
            continue;
        }
        if next == target {
            let mut complete = trail.clone();
            complete.push(next);
            paths.push(complete);
            continue;
        }
        trail.push(next.clone());
        extend(dag, &next, target, trail, paths)?;
        trail.pop();
    }
    Ok(())
}

/// Every subset Z of `V \ (src ∪ dst ∪ descendants(src) ∪ excluded)` that
/// blocks all backdoor paths from src to dst.
///
/// `excluded` is the model's latent set: a deconfounding set must be
/// conditionable on observed data. Candidates are enumerated in
/// nondecreasing size, lexicographically within a size; under `minimal`,
/// supersets of an accepted set are skipped.
pub fn deconfounding_sets(
    dag: &Dag,
    src: &BTreeSet<String>,
    dst: &BTreeSet<String>,
    excluded: &BTreeSet<String>,
    minimal: bool,
) -> Result<Vec<BTreeSet<String>>, GraphError> {
    require_known(dag, src)?;
    require_known(dag, dst)?;
    require_disjoint(src, dst)?;

    let descendants = dag.descendants_of_set(src)?;
    let pool: Vec<String> = dag
        .vertices()
        .filter(|v| {
            !src.contains(*v)
                && !dst.contains(*v)
                && !descendants.contains(*v)
                && !excluded.contains(*v)
        })
        .map(str::to_string)
        .collect();

    debug!(pool = ?pool, "searching deconfounding sets");

    let mut accepted: Vec<BTreeSet<String>> = Vec::new();
    for size in 0..=pool.len() {
        for combination in combinations(&pool, size) {
            let candidate: BTreeSet<String> = combination.into_iter().collect();
            if minimal && accepted.iter().any(|a| a.is_subset(&candidate)) {
                continue;
            }
            if backdoor_paths(dag, src, dst, &candidate)?.is_empty() {
                debug!(set = ?candidate, "deconfounding set blocks all backdoor paths");
                accepted.push(candidate);
            }
        }
    }
    Ok(accepted)
}

/// k-element combinations of a sorted slice, in lexicographic order.
fn combinations(pool: &[String], size: usize) -> Vec<Vec<String>> {
    let mut out = Vec::new();
    let mut current = Vec::with_capacity(size);
    pick(pool, size, 0, &mut current, &mut out);
    out
}

fn pick(
    pool: &[String],
    size: usize,
    start: usize,
    current: &mut Vec<String>,
    out: &mut Vec<Vec<String>>,
) {
    if current.len() == size {
        out.push(current.clone());
        return;
    }
    for i in start..pool.len() {
        current.push(pool[i].clone());
        pick(pool, size, i + 1, current, out);
        current.pop();
    }
}
