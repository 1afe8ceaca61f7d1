//! d-separation over enumerated undirected walks.
//!
//! A path between two vertices is *blocked* by a conditioning set Z when it
//! has an interior vertex v such that either
//!
//! - v is a chain or fork on the path and v ∈ Z, or
//! - v is a collider on the path and neither v nor any descendant of v is
//!   in Z.
//!
//! X ⊥ Y | Z holds iff every path between some x ∈ X and some y ∈ Y is
//! blocked. Graphs here are small, so paths are enumerated directly with a
//! DFS that keeps per-path memory (simple paths only).

use std::collections::BTreeSet;

use crate::dag::Dag;
use crate::error::GraphError;

/// True iff the two sets share no vertex.
pub fn disjoint(a: &BTreeSet<String>, b: &BTreeSet<String>) -> bool {
    a.intersection(b).next().is_none()
}

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

/// Every simple undirected path between two vertices, as ordered vertex
/// sequences (endpoints inclusive), in lexicographic order.
pub fn all_paths(dag: &Dag, from: &str, to: &str) -> Result<Vec<Vec<String>>, GraphError> {
    let mut paths = Vec::new();
    let mut trail = vec![from.to_string()];
    walk(dag, from, to, &mut trail, &mut paths)?;
    paths.sort();
    Ok(paths)
}

fn walk(
    dag: &Dag,
    current: &str,
    target: &str,
    trail: &mut Vec<String>,
    paths: &mut Vec<Vec<String>>,
) -> Result<(), GraphError> {
    if current == target {
        paths.push(trail.clone());
        return Ok(());
    }
    let mut neighbors: BTreeSet<String> = dag.parents(current)?;
    neighbors.extend(dag.children(current)?);
    for next in neighbors {
        if trail.contains(&next) {
            continue;
        }
        trail.push(next.clone());
        walk(dag, &next, target, trail, paths)?;
        trail.pop();
    }
    Ok(())
}

/// Whether a path (given as its vertex sequence) is blocked by `blockers`.
pub fn path_blocked(dag: &Dag, path: &[String], blockers: &BTreeSet<String>) -> bool {
    for window in path.windows(3) {
        let (before, vertex, after) = (&window[0], &window[1], &window[2]);
        let collider = dag.edge_exists(before, vertex) && dag.edge_exists(after, vertex);
        if collider {
            let opened = blockers.contains(vertex)
                || dag
                    .descendants(vertex)
                    .map(|d| !disjoint(&d, blockers))
                    .unwrap_or(false);
            if !opened {
                return true;
            }
        } else if blockers.contains(vertex) {
            return true;
        }
    }
    false
}

/// The d-separation criterion: X ⊥ Y | Z in the given graph.
///
/// The three sets must be pairwise disjoint and name known vertices.
pub fn d_separated(
    dag: &Dag,
    x: &BTreeSet<String>,
    y: &BTreeSet<String>,
    z: &BTreeSet<String>,
) -> Result<bool, GraphError> {
    require_known(dag, x)?;
    require_known(dag, y)?;
    require_known(dag, z)?;
    require_disjoint(x, y)?;
    require_disjoint(x, z)?;
    require_disjoint(y, z)?;

    for a in x {
        for b in y {
            for path in all_paths(dag, a, b)? {
                if !path_blocked(dag, &path, z) {
                    return Ok(false);
                }
            }
        }
    }
    Ok(true)
}
