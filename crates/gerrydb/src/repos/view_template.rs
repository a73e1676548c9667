use serde::Serialize;
use tracing::instrument;

use super::{Namespaced, ReadOnly, Repo, Resource, Writable, qualify};
use crate::error::GerryDbError;
use crate::models::ViewTemplate;

#[derive(Debug)]
pub struct ViewTemplates;

impl Resource for ViewTemplates {
    type Entity = ViewTemplate;

    const ENDPOINT: &'static str = "/view-templates";
    const KIND: &'static str = "view template";
}

impl Namespaced for ViewTemplates {}

pub type ViewTemplateRepo<'db, A = ReadOnly> = Repo<'db, ViewTemplates, A>;

/// A view template to create.
///
/// Members given as bare names refer to the template's namespace.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewViewTemplate {
    pub path: String,
    pub description: String,
    pub columns: Vec<String>,
    pub column_sets: Vec<String>,
}

#[derive(Serialize)]
struct ViewTemplateCreate<'a> {
    path: &'a str,
    namespace: &'a str,
    description: &'a str,
    members: Vec<String>,
}

impl Repo<'_, ViewTemplates, Writable<'_>> {
    #[instrument(skip_all, fields(path = %template.path))]
    pub async fn create(&self, template: NewViewTemplate) -> Result<ViewTemplate, GerryDbError> {
        let object = self.resolve(&template.path)?;
        if template.columns.is_empty() && template.column_sets.is_empty() {
            return Err(GerryDbError::InvalidRequest(format!(
                "view template '{object}' needs at least one column or column set"
            )));
        }

        let columns = template
            .columns
            .iter()
            .map(|column| member("/columns", column, &object.namespace));
        let column_sets = template
            .column_sets
            .iter()
            .map(|set| member("/column-sets", set, &object.namespace));
        let members = columns
            .chain(column_sets)
            .collect::<Result<Vec<_>, _>>()?;

        self.post(&format!("/view-templates/{}", object.namespace))
            .json(&ViewTemplateCreate {
                path: &object.name,
                namespace: &object.namespace,
                description: &template.description,
                members,
            })
            .send_json()
            .await
            .map_err(|e| GerryDbError::from_api(e, ViewTemplates::KIND, object.to_string()))
    }
}

/// Reference to a template member, e.g. `/columns/census/total_pop`.
///
/// References that already name their collection are kept.
fn member(collection: &str, reference: &str, namespace: &str) -> Result<String, GerryDbError> {
    let reference = reference
        .trim()
        .strip_prefix(collection)
        .filter(|rest| rest.starts_with('/'))
        .unwrap_or(reference);
    Ok(format!("{collection}{}", qualify(reference, namespace)?))
}
