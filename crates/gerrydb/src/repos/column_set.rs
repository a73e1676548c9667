use serde::Serialize;
use tracing::instrument;

use super::{Namespaced, ReadOnly, Repo, Resource, Writable};
use crate::error::GerryDbError;
use crate::models::ColumnSet;
use crate::path::resolve;

#[derive(Debug)]
pub struct ColumnSets;

impl Resource for ColumnSets {
    type Entity = ColumnSet;

    const ENDPOINT: &'static str = "/column-sets";
    const KIND: &'static str = "column set";
}

impl Namespaced for ColumnSets {}

pub type ColumnSetRepo<'db, A = ReadOnly> = Repo<'db, ColumnSets, A>;

/// A column set to create.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewColumnSet {
    pub path: String,
    pub description: String,
    /// Columns of the set, bare or qualified with the set's namespace.
    pub columns: Vec<String>,
}

#[derive(Serialize)]
struct ColumnSetCreate<'a> {
    path: &'a str,
    description: &'a str,
    columns: Vec<String>,
}

impl Repo<'_, ColumnSets, Writable<'_>> {
    /// Create a column set.
    ///
    /// All columns must belong to the namespace of the column set.
    #[instrument(skip_all, fields(path = %set.path))]
    pub async fn create(&self, set: NewColumnSet) -> Result<ColumnSet, GerryDbError> {
        let object = self.resolve(&set.path)?;
        let columns = set
            .columns
            .iter()
            .map(|column| -> Result<String, GerryDbError> {
                let column = resolve(column, Some(&object.namespace))?;
                if column.namespace != object.namespace {
                    return Err(GerryDbError::InvalidRequest(format!(
                        "column '{column}' is not in namespace '{}' of column set '{object}'",
                        object.namespace
                    )));
                }
                Ok(column.name)
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.post(&format!("/column-sets/{}", object.namespace))
            .json(&ColumnSetCreate {
                path: &object.name,
                description: &set.description,
                columns,
            })
            .send_json()
            .await
            .map_err(|e| GerryDbError::from_api(e, ColumnSets::KIND, object.to_string()))
    }
}
