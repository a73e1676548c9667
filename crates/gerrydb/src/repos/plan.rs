use std::collections::BTreeMap;

use serde::Serialize;
use tracing::instrument;

use super::{Namespaced, ReadOnly, Repo, Resource, Writable, qualify};
use crate::error::GerryDbError;
use crate::models::Plan;
use crate::path::normalize_path;

#[derive(Debug)]
pub struct Plans;

impl Resource for Plans {
    type Entity = Plan;

    const ENDPOINT: &'static str = "/plans";
    const KIND: &'static str = "plan";
}

impl Namespaced for Plans {}

pub type PlanRepo<'db, A = ReadOnly> = Repo<'db, Plans, A>;

/// A districting plan to create.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewPlan {
    pub path: String,
    pub locality: String,
    pub layer: String,
    pub description: String,
    /// District of each geography, keyed by geography path.
    pub assignments: BTreeMap<String, String>,
    pub source_url: Option<String>,
    pub districtr_id: Option<String>,
    pub daves_id: Option<String>,
}

#[derive(Serialize)]
struct PlanCreate<'a> {
    path: &'a str,
    description: &'a str,
    source_url: Option<&'a str>,
    districtr_id: Option<&'a str>,
    daves_id: Option<&'a str>,
    locality: String,
    layer: String,
    assignments: &'a BTreeMap<String, String>,
}

impl Repo<'_, Plans, Writable<'_>> {
    #[instrument(skip_all, fields(path = %plan.path, n_assignments = plan.assignments.len()))]
    pub async fn create(&self, plan: NewPlan) -> Result<Plan, GerryDbError> {
        let object = self.resolve(&plan.path)?;
        self.post(&format!("/plans/{}", object.namespace))
            .json(&PlanCreate {
                path: &object.name,
                description: &plan.description,
                source_url: plan.source_url.as_deref(),
                districtr_id: plan.districtr_id.as_deref(),
                daves_id: plan.daves_id.as_deref(),
                locality: normalize_path(&plan.locality, false)?,
                layer: qualify(&plan.layer, &object.namespace)?,
                assignments: &plan.assignments,
            })
            .send_json()
            .await
            .map_err(|e| GerryDbError::from_api(e, Plans::KIND, object.to_string()))
    }
}
