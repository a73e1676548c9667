use std::time::Duration;

use serde::Serialize;
use tracing::{debug, instrument};

use super::{Namespaced, ReadOnly, Repo, Resource, Writable, qualify};
use crate::error::GerryDbError;
use crate::models::{Graph, GraphEdge, GraphMeta};
use crate::path::normalize_path;

/// Uploading large graphs can take a long time server side.
const CREATE_TIMEOUT: Duration = Duration::from_secs(1200);

#[derive(Debug)]
pub struct Graphs;

impl Resource for Graphs {
    type Entity = Graph;

    const ENDPOINT: &'static str = "/graphs";
    const KIND: &'static str = "graph";
}

impl Namespaced for Graphs {}

/// Graphs are read including their edges.
pub type GraphRepo<'db, A = ReadOnly> = Repo<'db, Graphs, A>;

/// A dual graph to create.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewGraph {
    pub path: String,
    pub locality: String,
    /// The layer whose geographies are the graph's nodes.
    pub layer: String,
    pub description: String,
    /// Projection used for projection dependent weights, in WKT.
    pub proj: Option<String>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Serialize)]
struct GraphCreate<'a> {
    path: &'a str,
    description: &'a str,
    locality: String,
    layer: String,
    proj: Option<&'a str>,
    edges: &'a [GraphEdge],
}

impl Repo<'_, Graphs, Writable<'_>> {
    #[instrument(skip_all, fields(path = %graph.path))]
    pub async fn create(&self, graph: NewGraph) -> Result<GraphMeta, GerryDbError> {
        let object = self.resolve(&graph.path)?;
        debug!(n_edges = graph.edges.len(), "creating graph");

        self.post(&format!("/graphs/{}", object.namespace))
            .timeout(CREATE_TIMEOUT)
            .json(&GraphCreate {
                path: &object.name,
                description: &graph.description,
                locality: normalize_path(&graph.locality, false)?,
                layer: qualify(&graph.layer, &object.namespace)?,
                proj: graph.proj.as_deref(),
                edges: &graph.edges,
            })
            .send_json()
            .await
            .map_err(|e| GerryDbError::from_api(e, Graphs::KIND, object.to_string()))
    }
}
