//! Dual graph of a view.

use indexmap::IndexMap;

use super::frame::{ColumnValue, ViewFrame};
use super::payload::PayloadError;
use crate::models::{Column, GraphEdge};

type Weights = serde_json::Map<String, serde_json::Value>;

/// An undirected graph whose nodes are the units of a view.
///
/// Nodes carry the same column values as the view's [ViewFrame],
/// edges carry the weights stored with the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct DualGraph {
    columns: Vec<Column>,
    nodes: IndexMap<String, Vec<ColumnValue>>,
    /// Keyed by node indices, smaller index first.
    edges: IndexMap<(usize, usize), Weights>,
    adjacency: Vec<Vec<usize>>,
}

impl DualGraph {
    pub(crate) fn new(frame: ViewFrame, edges: &[GraphEdge]) -> Result<Self, PayloadError> {
        let (columns, units) = frame.into_parts();
        let nodes = units
            .into_iter()
            .map(|(path, unit)| (path, unit.values))
            .collect::<IndexMap<_, _>>();

        let mut graph = Self {
            columns,
            adjacency: vec![Vec::new(); nodes.len()],
            nodes,
            edges: IndexMap::with_capacity(edges.len()),
        };
        for edge in edges {
            let unknown = |unit: &str| PayloadError::UnknownUnit {
                left: edge.from.clone(),
                right: edge.to.clone(),
                unit: unit.to_string(),
            };
            let from = graph.endpoint(&edge.from).ok_or_else(|| unknown(&edge.from))?;
            let to = graph.endpoint(&edge.to).ok_or_else(|| unknown(&edge.to))?;
            graph.insert_edge(from, to, edge.weights.clone());
        }
        Ok(graph)
    }

    /// Index of an edge endpoint.
    ///
    /// Endpoints may be given as namespaced geography paths,
    /// nodes are keyed by the last segment.
    fn endpoint(&self, unit: &str) -> Option<usize> {
        self.nodes.get_index_of(unit).or_else(|| {
            let (_, last) = unit.rsplit_once('/')?;
            self.nodes.get_index_of(last)
        })
    }

    fn insert_edge(&mut self, a: usize, b: usize, weights: Weights) {
        let key = (a.min(b), a.max(b));
        if self.edges.insert(key, weights).is_none() {
            self.adjacency[a].push(b);
            if a != b {
                self.adjacency[b].push(a);
            }
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains_node(&self, node: &str) -> bool {
        self.nodes.contains_key(node)
    }

    pub(crate) fn node_index(&self, node: &str) -> Option<usize> {
        self.nodes.get_index_of(node)
    }

    pub(crate) fn node_name(&self, index: usize) -> &str {
        self.nodes
            .get_index(index)
            .map(|(name, _)| name.as_str())
            .unwrap_or_default()
    }

    /// Node identifiers in view order.
    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// All column values of a node.
    pub fn attributes(&self, node: &str) -> Option<&[ColumnValue]> {
        self.nodes.get(node).map(Vec::as_slice)
    }

    /// The value of `column` for `node`.
    pub fn attribute(&self, node: &str, column: &str) -> Option<&ColumnValue> {
        let index = self
            .columns
            .iter()
            .position(|candidate| candidate.canonical_path == column)?;
        self.nodes.get(node).map(|values| &values[index])
    }

    pub fn neighbors(&self, node: &str) -> impl Iterator<Item = &str> {
        self.node_index(node)
            .map(|index| self.adjacency[index].as_slice())
            .unwrap_or_default()
            .iter()
            .map(|neighbor| self.node_name(*neighbor))
    }

    pub fn has_edge(&self, a: &str, b: &str) -> bool {
        self.edge_weights(a, b).is_some()
    }

    pub fn edge_weights(&self, a: &str, b: &str) -> Option<&Weights> {
        let (a, b) = (self.node_index(a)?, self.node_index(b)?);
        self.edges.get(&(a.min(b), a.max(b)))
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, &Weights)> {
        self.edges
            .iter()
            .map(|((a, b), weights)| (self.node_name(*a), self.node_name(*b), weights))
    }

    pub(crate) fn edge_indices(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.edges.keys().copied()
    }
}
