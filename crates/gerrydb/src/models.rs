//! Objects exchanged with the GerryDB API.
//!
//! All objects are immutable once created server side,
//! their [ObjectMeta] identifies the write that created them.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use derive_more::Display;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Provenance of a write, created when a write context is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub uuid: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub path: String,
    pub description: String,
    pub public: bool,
    pub meta: ObjectMeta,
}

/// A place such as a state or a county, independent of its boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locality {
    pub canonical_path: String,
    pub parent_path: Option<String>,
    pub default_proj: Option<String>,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub meta: ObjectMeta,
}

/// A partition scheme of geographic units, e.g. census blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoLayer {
    pub path: String,
    pub namespace: String,
    pub description: Option<String>,
    pub source_url: Option<String>,
    pub meta: ObjectMeta,
}

impl GeoLayer {
    pub fn full_path(&self) -> String {
        format!("/{}/{}", self.namespace, self.path)
    }
}

/// Meaning of a column's values.
///
/// `count` columns are tallied per district when building partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    #[display("count")]
    Count,
    #[display("percent")]
    Percent,
    #[display("categorical")]
    Categorical,
    #[display("identifier")]
    Identifier,
    #[display("area")]
    Area,
    #[display("other")]
    Other,
}

/// Storage type of a column's values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[display("float")]
    Float,
    #[display("int")]
    Int,
    #[display("bool")]
    Bool,
    #[display("str")]
    Str,
    #[display("json")]
    Json,
}

/// A tabular attribute definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub canonical_path: String,
    pub namespace: String,
    pub description: String,
    pub source_url: Option<String>,
    pub kind: ColumnKind,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub meta: ObjectMeta,
}

impl Column {
    pub fn full_path(&self) -> String {
        format!("/{}/{}", self.namespace, self.canonical_path)
    }
}

/// A named group of columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSet {
    pub path: String,
    pub namespace: String,
    pub description: String,
    pub columns: Vec<Column>,
    #[serde(default)]
    pub refs: Vec<String>,
    pub meta: ObjectMeta,
}

/// A member of a view template.
///
/// The API does not tag members, the variant is told apart by its fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplateMember {
    ColumnSet(ColumnSet),
    Column(Column),
}

/// A reusable bundle of columns and column sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewTemplate {
    pub path: String,
    pub namespace: String,
    pub description: String,
    pub members: Vec<TemplateMember>,
    pub valid_from: DateTime<Utc>,
    pub meta: ObjectMeta,
}

impl ViewTemplate {
    /// All columns of the template in declaration order.
    ///
    /// Columns reachable through more than one member are listed once.
    pub fn columns(&self) -> Vec<&Column> {
        self.members
            .iter()
            .flat_map(|member| match member {
                TemplateMember::Column(column) => std::slice::from_ref(column).iter(),
                TemplateMember::ColumnSet(set) => set.columns.iter(),
            })
            .unique_by(|column| column.full_path())
            .collect()
    }
}

/// An adjacency between two geographic units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "EdgeRepr", into = "EdgeRepr")]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub weights: serde_json::Map<String, serde_json::Value>,
}

impl GraphEdge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            weights: serde_json::Map::new(),
        }
    }
}

/// Edges are exchanged as `[from, to]` or `[from, to, weights]`.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum EdgeRepr {
    Weighted(
        String,
        String,
        Option<serde_json::Map<String, serde_json::Value>>,
    ),
    Plain(String, String),
}

impl From<EdgeRepr> for GraphEdge {
    fn from(repr: EdgeRepr) -> Self {
        match repr {
            EdgeRepr::Weighted(from, to, weights) => GraphEdge {
                from,
                to,
                weights: weights.unwrap_or_default(),
            },
            EdgeRepr::Plain(from, to) => GraphEdge::new(from, to),
        }
    }
}

impl From<GraphEdge> for EdgeRepr {
    fn from(edge: GraphEdge) -> Self {
        EdgeRepr::Weighted(edge.from, edge.to, Some(edge.weights))
    }
}

/// Descriptive attributes of a dual graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphMeta {
    pub path: String,
    pub namespace: String,
    pub description: String,
    pub locality: Locality,
    pub layer: GeoLayer,
    pub proj: Option<String>,
    pub created_at: DateTime<Utc>,
    pub meta: ObjectMeta,
}

impl GraphMeta {
    pub fn full_path(&self) -> String {
        format!("/{}/{}", self.namespace, self.path)
    }
}

/// A dual graph including its edges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    #[serde(flatten)]
    pub meta: GraphMeta,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
}

/// An assignment of a layer's units to districts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub path: String,
    pub namespace: String,
    pub description: String,
    pub source_url: Option<String>,
    pub districtr_id: Option<String>,
    pub daves_id: Option<String>,
    pub locality: Locality,
    pub layer: GeoLayer,
    pub num_districts: u32,
    pub complete: bool,
    #[serde(default)]
    pub assignments: BTreeMap<String, Option<String>>,
    pub created_at: DateTime<Utc>,
    pub meta: ObjectMeta,
}

/// Descriptive attributes of a view.
///
/// The rendered content of a view is fetched separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewMeta {
    pub path: String,
    pub namespace: String,
    pub template: ViewTemplate,
    pub locality: Locality,
    pub layer: GeoLayer,
    pub graph: Option<GraphMeta>,
    pub valid_at: DateTime<Utc>,
    pub proj: Option<String>,
    pub meta: ObjectMeta,
}

impl fmt::Display for ViewMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.namespace, self.path)
    }
}
