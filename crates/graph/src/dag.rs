//! The directed acyclic graph underlying all causal analysis.
//!
//! A [`Dag`] interns variable names against `petgraph` node indices and adds
//! the two *edge surgery* operations the do-calculus needs: removing the
//! incoming edges of a set (the mutilated graph Gₓ̄) and removing the
//! outgoing edges of a set (G w̲).

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use causal_model::Model;

use crate::error::GraphError;

/// A name-interned directed acyclic graph.
#[derive(Debug, Clone)]
pub struct Dag {
    graph: DiGraph<String, ()>,
    index: BTreeMap<String, NodeIndex>,
}

impl Dag {
    /// Build a graph from explicit vertex and edge lists.
    ///
    /// Edges are `(parent, child)` pairs; both endpoints must be vertices.
    pub fn new<V, E>(vertices: V, edges: E) -> Result<Self, GraphError>
    where
        V: IntoIterator,
        V::Item: Into<String>,
        E: IntoIterator<Item = (String, String)>,
    {
        let mut graph = DiGraph::new();
        let mut index = BTreeMap::new();
        for vertex in vertices {
            let name: String = vertex.into();
            let node = graph.add_node(name.clone());
            index.insert(name, node);
        }
        let mut dag = Self { graph, index };
        for (parent, child) in edges {
            let from = dag.node(&parent)?;
            let to = dag.node(&child)?;
            dag.graph.add_edge(from, to, ());
        }
        Ok(dag)
    }

    /// Build the graph of a model: one vertex per variable, one edge per
    /// parent relation (latent parents included).
    pub fn from_model(model: &Model) -> Self {
        let mut graph = DiGraph::new();
        let mut index = BTreeMap::new();
        for name in model.variables() {
            let node = graph.add_node(name.to_string());
            index.insert(name.to_string(), node);
        }
        for name in model.variables() {
            let child = index[name];
            for parent in model.parents(name).unwrap_or_default() {
                graph.add_edge(index[parent.as_str()], child, ());
            }
        }
        Self { graph, index }
    }

    fn node(&self, name: &str) -> Result<NodeIndex, GraphError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::UnknownVertex {
                vertex: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Vertex names in lexicographic order.
    pub fn vertices(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    pub fn edge_exists(&self, parent: &str, child: &str) -> bool {
        match (self.index.get(parent), self.index.get(child)) {
            (Some(&from), Some(&to)) => self.graph.find_edge(from, to).is_some(),
            _ => false,
        }
    }

    pub fn parents(&self, name: &str) -> Result<BTreeSet<String>, GraphError> {
        let node = self.node(name)?;
        Ok(self
            .graph
            .neighbors_directed(node, Direction::Incoming)
            .map(|n| self.graph[n].clone())
            .collect())
    }

    pub fn children(&self, name: &str) -> Result<BTreeSet<String>, GraphError> {
        let node = self.node(name)?;
        Ok(self
            .graph
            .neighbors_directed(node, Direction::Outgoing)
            .map(|n| self.graph[n].clone())
            .collect())
    }

    /// All proper ancestors of a vertex.
    pub fn ancestors(&self, name: &str) -> Result<BTreeSet<String>, GraphError> {
        self.reach(name, Direction::Incoming)
    }

    /// All proper descendants of a vertex.
    pub fn descendants(&self, name: &str) -> Result<BTreeSet<String>, GraphError> {
        self.reach(name, Direction::Outgoing)
    }

    fn reach(&self, name: &str, direction: Direction) -> Result<BTreeSet<String>, GraphError> {
        let start = self.node(name)?;
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            for next in self.graph.neighbors_directed(node, direction) {
                if seen.insert(self.graph[next].clone()) {
                    queue.push_back(next);
                }
            }
        }
        seen.remove(name);
        Ok(seen)
    }

    /// Union of proper ancestors over a set of vertices.
    pub fn ancestors_of_set(
        &self,
        set: &BTreeSet<String>,
    ) -> Result<BTreeSet<String>, GraphError> {
        let mut all = BTreeSet::new();
        for name in set {
            all.extend(self.ancestors(name)?);
        }
        Ok(all)
    }

    /// Union of proper descendants over a set of vertices.
    pub fn descendants_of_set(
        &self,
        set: &BTreeSet<String>,
    ) -> Result<BTreeSet<String>, GraphError> {
        let mut all = BTreeSet::new();
        for name in set {
            all.extend(self.descendants(name)?);
        }
        Ok(all)
    }

    /// A copy with the incoming edges of every vertex in `set` removed (Gₓ̄).
    pub fn without_incoming(&self, set: &BTreeSet<String>) -> Self {
        let mut copy = self.clone();
        copy.graph.retain_edges(|graph, edge| {
            let (_, target) = graph.edge_endpoints(edge).expect("edge exists");
            !set.contains(&graph[target])
        });
        copy
    }

    /// A copy with the outgoing edges of every vertex in `set` removed (G w̲).
    pub fn without_outgoing(&self, set: &BTreeSet<String>) -> Self {
        let mut copy = self.clone();
        copy.graph.retain_edges(|graph, edge| {
            let (source, _) = graph.edge_endpoints(edge).expect("edge exists");
            !set.contains(&graph[source])
        });
        copy
    }
}
