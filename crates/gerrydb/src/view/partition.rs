//! Districting plans as partitions of a dual graph.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use super::graph::DualGraph;
use crate::models::ColumnKind;

/// An assignment of the nodes of a [DualGraph] to districts.
///
/// Nodes a plan leaves unassigned belong to no district. Edges between an
/// assigned and an unassigned node are cut edges. Columns of kind `count`
/// are tallied per district.
#[derive(Debug, Clone)]
pub struct Partition {
    graph: Arc<DualGraph>,
    /// District of each node, by node index.
    assignment: Vec<Option<String>>,
    parts: BTreeMap<String, Vec<usize>>,
    unassigned: Vec<usize>,
    cut_edges: Vec<(usize, usize)>,
    tallies: BTreeMap<String, BTreeMap<String, f64>>,
}

impl Partition {
    /// Build a partition from a map of unit to district.
    ///
    /// Units that are not part of the graph are ignored.
    pub fn new(graph: Arc<DualGraph>, assignment: &HashMap<String, String>) -> Self {
        let assignment = graph
            .nodes()
            .map(|node| assignment.get(node).cloned())
            .collect::<Vec<_>>();

        let mut parts: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        let mut unassigned = Vec::new();
        for (node, district) in assignment.iter().enumerate() {
            match district {
                Some(district) => parts.entry(district.clone()).or_default().push(node),
                None => unassigned.push(node),
            }
        }

        let cut_edges = graph
            .edge_indices()
            .filter(|(a, b)| assignment[*a] != assignment[*b])
            .collect();

        let tallies = graph
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, column)| column.kind == ColumnKind::Count)
            .map(|(index, column)| {
                let tally = parts
                    .iter()
                    .map(|(district, nodes)| {
                        let total = nodes
                            .iter()
                            .filter_map(|node| {
                                graph
                                    .attributes(graph.node_name(*node))
                                    .and_then(|values| values[index].as_f64())
                            })
                            .sum::<f64>();
                        (district.clone(), total)
                    })
                    .collect();
                (column.canonical_path.clone(), tally)
            })
            .collect();

        Self {
            graph,
            assignment,
            parts,
            unassigned,
            cut_edges,
            tallies,
        }
    }

    pub fn graph(&self) -> &DualGraph {
        &self.graph
    }

    /// The district `node` is assigned to.
    pub fn district(&self, node: &str) -> Option<&str> {
        let index = self.graph.node_index(node)?;
        self.assignment[index].as_deref()
    }

    /// Nodes of the graph the plan assigns to no district.
    pub fn unassigned(&self) -> Vec<&str> {
        self.unassigned
            .iter()
            .map(|node| self.graph.node_name(*node))
            .collect()
    }

    /// Whether every node of the graph is assigned.
    pub fn is_complete(&self) -> bool {
        self.unassigned.is_empty()
    }

    /// District labels in sorted order.
    pub fn districts(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(String::as_str)
    }

    pub fn num_districts(&self) -> usize {
        self.parts.len()
    }

    /// Nodes assigned to `district`.
    pub fn part(&self, district: &str) -> Vec<&str> {
        self.parts
            .get(district)
            .map(|nodes| {
                nodes
                    .iter()
                    .map(|node| self.graph.node_name(*node))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Edges whose endpoints lie in different districts.
    pub fn cut_edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cut_edges
            .iter()
            .map(|(a, b)| (self.graph.node_name(*a), self.graph.node_name(*b)))
    }

    pub fn cut_edge_count(&self) -> usize {
        self.cut_edges.len()
    }

    /// Per district totals of a `count` column.
    pub fn tally(&self, column: &str) -> Option<&BTreeMap<String, f64>> {
        self.tallies.get(column)
    }
}
