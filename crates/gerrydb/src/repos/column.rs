use serde::Serialize;
use tracing::{debug, instrument};

use super::{Namespaced, ReadOnly, Repo, Resource, Writable};
use crate::error::GerryDbError;
use crate::models::{Column, ColumnKind, ColumnType};
use crate::path::{normalize_path, normalize_path_with_max};

#[derive(Debug)]
pub struct Columns;

impl Resource for Columns {
    type Entity = Column;

    const ENDPOINT: &'static str = "/columns";
    const KIND: &'static str = "column";
}

impl Namespaced for Columns {}

pub type ColumnRepo<'db, A = ReadOnly> = Repo<'db, Columns, A>;

/// A column to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewColumn {
    pub path: String,
    pub kind: ColumnKind,
    pub column_type: ColumnType,
    pub description: String,
    pub source_url: Option<String>,
    pub aliases: Vec<String>,
}

impl NewColumn {
    pub fn new(
        path: impl Into<String>,
        kind: ColumnKind,
        column_type: ColumnType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            kind,
            column_type,
            description: description.into(),
            source_url: None,
            aliases: Vec::new(),
        }
    }
}

#[derive(Serialize)]
struct ColumnCreate<'a> {
    canonical_path: &'a str,
    description: &'a str,
    source_url: Option<&'a str>,
    kind: ColumnKind,
    #[serde(rename = "type")]
    column_type: ColumnType,
    aliases: Vec<String>,
}

#[derive(Serialize)]
struct ColumnValue<V> {
    path: String,
    value: V,
}

#[derive(Serialize)]
struct ColumnPatch {
    aliases: Vec<String>,
}

/// Qualify a geography reference as `/namespace/id`, keeping the id's case.
fn qualify_geography(geography: &str, namespace: &str) -> Result<String, GerryDbError> {
    let normalized = normalize_path_with_max(geography, true, 2)?;
    Ok(match normalized.contains('/') {
        true => format!("/{normalized}"),
        false => format!("/{namespace}/{normalized}"),
    })
}

fn normalize_aliases(aliases: &[String]) -> Result<Vec<String>, GerryDbError> {
    Ok(aliases
        .iter()
        .map(|alias| normalize_path(alias, false))
        .collect::<Result<Vec<_>, _>>()?)
}

impl Repo<'_, Columns, Writable<'_>> {
    #[instrument(skip_all, fields(path = %column.path))]
    pub async fn create(&self, column: NewColumn) -> Result<Column, GerryDbError> {
        let object = self.resolve(&column.path)?;
        self.post(&format!("/columns/{}", object.namespace))
            .json(&ColumnCreate {
                canonical_path: &object.name,
                description: &column.description,
                source_url: column.source_url.as_deref(),
                kind: column.kind,
                column_type: column.column_type,
                aliases: normalize_aliases(&column.aliases)?,
            })
            .send_json()
            .await
            .map_err(|e| GerryDbError::from_api(e, Columns::KIND, object.to_string()))
    }

    /// Add aliases to a column.
    #[instrument(skip(self))]
    pub async fn update(&self, path: &str, aliases: &[String]) -> Result<Column, GerryDbError> {
        let object = self.resolve(path)?;
        self.patch(&format!("/columns/{}", object.relative()))
            .json(&ColumnPatch {
                aliases: normalize_aliases(aliases)?,
            })
            .send_json()
            .await
            .map_err(|e| GerryDbError::from_api(e, Columns::KIND, object.to_string()))
    }

    /// Set the values of a column on a collection of geographies.
    ///
    /// Geographies given as bare names refer to the column's namespace.
    #[instrument(skip(self, values))]
    pub async fn set_values<G, V>(
        &self,
        path: &str,
        values: impl IntoIterator<Item = (G, V)>,
    ) -> Result<(), GerryDbError>
    where
        G: AsRef<str>,
        V: Serialize,
    {
        let object = self.resolve(path)?;
        let body = values
            .into_iter()
            .map(|(geo, value)| {
                Ok(ColumnValue {
                    path: qualify_geography(geo.as_ref(), &object.namespace)?,
                    value,
                })
            })
            .collect::<Result<Vec<_>, GerryDbError>>()?;
        debug!(n_values = body.len(), "setting column values");

        self.put(&format!("/columns/{}", object.relative()))
            .json(&body)
            .send_empty()
            .await
            .map_err(|e| GerryDbError::from_api(e, Columns::KIND, object.to_string()))
    }
}
