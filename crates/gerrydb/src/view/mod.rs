//! Materialization of views into tables, dual graphs and partitions.
//!
//! A [View] only holds the view's metadata. Its rendered content is fetched
//! on first use and stored in the session's [PayloadCache](crate::cache::PayloadCache),
//! later calls on any session sharing the cache directory read it from disk.

mod frame;
mod graph;
mod partition;
mod payload;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
pub use frame::{ColumnValue, Unit, ViewFrame};
use gerrydb_client::ApiRequest;
pub use graph::DualGraph;
pub use partition::Partition;
pub use payload::PayloadError;
use payload::{RenderedView, decode_json, district_label};
use tracing::{debug, instrument, warn};

use crate::cache::{CacheKey, EntryKind};
use crate::db::GerryDb;
use crate::error::GerryDbError;
use crate::models::{Column, GeoLayer, Graph, GraphMeta, Locality, ObjectMeta, ViewMeta, ViewTemplate};

/// A handle to a view of a [GerryDb] session.
#[derive(Debug, Clone)]
pub struct View<'db> {
    db: &'db GerryDb,
    meta: ViewMeta,
}

impl<'db> View<'db> {
    pub(crate) fn new(db: &'db GerryDb, meta: ViewMeta) -> Self {
        Self { db, meta }
    }

    pub fn namespace(&self) -> &str {
        &self.meta.namespace
    }

    pub fn path(&self) -> &str {
        &self.meta.path
    }

    /// The namespaced path, e.g. `/census.2020/ma_bg_demo`.
    pub fn full_path(&self) -> String {
        self.meta.to_string()
    }

    pub fn template(&self) -> &ViewTemplate {
        &self.meta.template
    }

    pub fn locality(&self) -> &Locality {
        &self.meta.locality
    }

    pub fn layer(&self) -> &GeoLayer {
        &self.meta.layer
    }

    pub fn graph(&self) -> Option<&GraphMeta> {
        self.meta.graph.as_ref()
    }

    pub fn valid_at(&self) -> DateTime<Utc> {
        self.meta.valid_at
    }

    pub fn proj(&self) -> Option<&str> {
        self.meta.proj.as_deref()
    }

    pub fn meta(&self) -> &ObjectMeta {
        &self.meta.meta
    }

    /// Marker of the view's content, the id of the write that created it.
    pub fn version(&self) -> &str {
        &self.meta.meta.uuid
    }

    pub fn view_meta(&self) -> &ViewMeta {
        &self.meta
    }

    /// The template's columns, in the order of the frame's values.
    pub fn columns(&self) -> Vec<Column> {
        self.meta.template.columns().into_iter().cloned().collect()
    }

    /// Load the view as a table of units.
    #[instrument(skip_all, fields(view = %self.meta))]
    pub async fn to_df(&self) -> Result<ViewFrame, GerryDbError> {
        let render = self.render().await?;
        Ok(ViewFrame::from_render(self.columns(), &render)?)
    }

    /// Load the view as a dual graph.
    ///
    /// Fails with [GerryDbError::NoGraph] without fetching anything
    /// if no graph is attached to the view.
    #[instrument(skip_all, fields(view = %self.meta))]
    pub async fn to_graph(&self) -> Result<DualGraph, GerryDbError> {
        let graph = self.require_graph()?;
        let render = self.render().await?;
        self.dual_graph(graph, &render).await
    }

    /// Load every plan rendered with the view as a partition of its dual graph,
    /// keyed by plan path.
    ///
    /// Units a plan leaves unassigned are kept as unassigned nodes of its
    /// partition, see [Partition::unassigned].
    #[instrument(skip_all, fields(view = %self.meta))]
    pub async fn to_chain(&self) -> Result<BTreeMap<String, Partition>, GerryDbError> {
        let graph = self.require_graph()?;
        let render = self.render().await?;
        let dual_graph = Arc::new(self.dual_graph(graph, &render).await?);

        let chain = render
            .plans
            .iter()
            .map(|(plan, assignments)| {
                let assignment = assignments
                    .iter()
                    .filter_map(|(unit, district)| Some((unit.clone(), district_label(district)?)))
                    .collect::<HashMap<_, _>>();
                let partition = Partition::new(dual_graph.clone(), &assignment);
                if !partition.is_complete() {
                    debug!(%plan, n_unassigned = partition.unassigned().len(), "plan is incomplete");
                }
                (plan.clone(), partition)
            })
            .collect::<BTreeMap<_, _>>();
        debug!(n_plans = chain.len(), "built partitions");
        Ok(chain)
    }

    fn require_graph(&self) -> Result<&GraphMeta, GerryDbError> {
        self.meta
            .graph
            .as_ref()
            .ok_or_else(|| GerryDbError::NoGraph(self.full_path()))
    }

    async fn dual_graph(
        &self,
        graph: &GraphMeta,
        render: &RenderedView,
    ) -> Result<DualGraph, GerryDbError> {
        let frame = ViewFrame::from_render(self.columns(), render)?;
        let graph = self.graph_edges(graph).await?;
        Ok(DualGraph::new(frame, &graph.edges)?)
    }

    async fn render(&self) -> Result<RenderedView, GerryDbError> {
        let key = CacheKey {
            kind: EntryKind::View,
            namespace: self.meta.namespace.clone(),
            path: self.meta.path.clone(),
            version: self.version().to_string(),
        };
        let request = self
            .db
            .api()
            .post(&format!("/views/{}/{}", self.meta.namespace, self.meta.path));
        let columns = self.columns();
        load_cached(self.db, &key, request, "view", |bytes| -> Result<_, GerryDbError> {
            let render: RenderedView = decode_json(bytes)?;
            ViewFrame::from_render(columns.clone(), &render)?;
            Ok(render)
        })
        .await
    }

    async fn graph_edges(&self, graph: &GraphMeta) -> Result<Graph, GerryDbError> {
        let key = CacheKey {
            kind: EntryKind::Graph,
            namespace: graph.namespace.clone(),
            path: graph.path.clone(),
            version: graph.meta.uuid.clone(),
        };
        let request = self
            .db
            .api()
            .get(&format!("/graphs/{}/{}", graph.namespace, graph.path));
        load_cached(self.db, &key, request, "graph", |bytes| {
            Ok(decode_json::<Graph>(bytes)?)
        })
        .await
    }
}

/// Read a payload from the cache, fetching and storing it on a miss.
///
/// Payloads are only stored once `decode` accepts them. Cached payloads
/// `decode` rejects are fetched again and overwritten. Offline sessions
/// fail with [GerryDbError::Offline] instead of fetching.
async fn load_cached<T>(
    db: &GerryDb,
    key: &CacheKey,
    request: ApiRequest,
    resource: &'static str,
    decode: impl Fn(&[u8]) -> Result<T, GerryDbError>,
) -> Result<T, GerryDbError> {
    if let Some(bytes) = db.cache().get(key)? {
        match decode(&bytes) {
            Ok(decoded) => return Ok(decoded),
            Err(err) => warn!(%err, "cached payload could not be decoded, fetching again"),
        }
    }

    let path = format!("/{}/{}", key.namespace, key.path);
    db.require_online(format!("fetching uncached {resource} '{path}'"))?;
    let payload = request
        .send_bytes()
        .await
        .map_err(|e| GerryDbError::from_api(e, resource, &path))?;
    debug!(%path, render_id = ?payload.render_id, "fetched payload");

    let decoded = decode(&payload.bytes)?;
    db.cache().put(key, &payload.bytes)?;
    Ok(decoded)
}
