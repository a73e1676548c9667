//! Repositories of GerryDB objects.
//!
//! Repositories are typed by their access. [ReadOnly] repositories are
//! obtained from a [GerryDb](crate::GerryDb) session and can only read,
//! [Writable] repositories are obtained from a
//! [WriteContext](crate::WriteContext) and additionally create objects,
//! attributing every write to the context.

mod column;
mod column_set;
mod geo_layer;
mod graph;
mod locality;
mod namespace;
mod plan;
mod view;
mod view_template;

use std::fmt::Debug;
use std::marker::PhantomData;

pub use column::{ColumnRepo, Columns, NewColumn};
pub use column_set::{ColumnSetRepo, ColumnSets, NewColumnSet};
pub use geo_layer::{GeoLayerRepo, GeoLayers, NewGeoLayer};
use gerrydb_client::{ApiRequest, META_ID_HEADER};
pub use graph::{GraphRepo, Graphs, NewGraph};
pub use locality::{Localities, LocalityRepo, NewLocality};
pub use namespace::{NamespaceRepo, Namespaces, NewNamespace};
pub use plan::{NewPlan, PlanRepo, Plans};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
pub use view::{NewView, ViewRepo, Views};
pub use view_template::{NewViewTemplate, ViewTemplateRepo, ViewTemplates};

use crate::db::GerryDb;
use crate::error::GerryDbError;
use crate::path::{ObjectPath, PathError, normalize_namespace};

/// A kind of object stored in GerryDB.
pub trait Resource {
    /// Name of the kind used in errors and logs.
    const KIND: &'static str;
    /// Collection endpoint, relative to the API root.
    const ENDPOINT: &'static str;
    type Entity: DeserializeOwned;
}

/// Marker for kinds whose objects live in a namespace
/// and are read through [Repo::get] and [Repo::list].
pub trait Namespaced: Resource {}

/// Access of a repository that can only read.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOnly;

/// Access of a repository bound to a write context.
#[derive(Debug, Clone, Copy)]
pub struct Writable<'ctx> {
    meta_id: &'ctx str,
}

impl<'ctx> Writable<'ctx> {
    pub(crate) fn new(meta_id: &'ctx str) -> Self {
        Self { meta_id }
    }
}

/// A repository of objects of kind `R`.
pub struct Repo<'db, R, A = ReadOnly> {
    db: &'db GerryDb,
    access: A,
    _resource: PhantomData<R>,
}

impl<R: Resource, A: Debug> Debug for Repo<'_, R, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repo")
            .field("kind", &R::KIND)
            .field("access", &self.access)
            .finish_non_exhaustive()
    }
}

impl<'db, R: Resource, A> Repo<'db, R, A> {
    pub(crate) fn new(db: &'db GerryDb, access: A) -> Self {
        Self {
            db,
            access,
            _resource: PhantomData,
        }
    }

    fn resolve(&self, path: &str) -> Result<ObjectPath, GerryDbError> {
        self.db.resolve(path)
    }

    /// The namespace to list, `namespace` or the session default.
    fn list_namespace(&self, namespace: Option<&str>) -> Result<String, GerryDbError> {
        match namespace.or(self.db.namespace()) {
            Some(namespace) => Ok(normalize_namespace(namespace)?),
            None => Err(PathError::NoNamespace(R::ENDPOINT.to_string()).into()),
        }
    }

    #[instrument(skip_all, fields(kind = R::KIND, path = %object))]
    async fn fetch(&self, object: &ObjectPath) -> Result<R::Entity, GerryDbError> {
        debug!("fetching object");
        self.db.require_online(format!("fetching {} '{object}'", R::KIND))?;
        self.db
            .api()
            .get(&format!("{}/{}", R::ENDPOINT, object.relative()))
            .send_json()
            .await
            .map_err(|e| GerryDbError::from_api(e, R::KIND, object.to_string()))
    }

    #[instrument(skip_all, fields(kind = R::KIND, %namespace))]
    async fn fetch_all(&self, namespace: &str) -> Result<Vec<R::Entity>, GerryDbError> {
        debug!("listing objects");
        self.db
            .require_online(format!("listing {} objects in '{namespace}'", R::KIND))?;
        self.db
            .api()
            .get(&format!("{}/{namespace}", R::ENDPOINT))
            .send_json()
            .await
            .map_err(|e| GerryDbError::from_api(e, R::KIND, format!("/{namespace}")))
    }
}

impl<R: Namespaced, A> Repo<'_, R, A> {
    /// Get an object by path.
    ///
    /// Bare names are resolved against the session's default namespace.
    pub async fn get(&self, path: &str) -> Result<R::Entity, GerryDbError> {
        let object = self.resolve(path)?;
        self.fetch(&object).await
    }

    /// List all objects in `namespace`, by default the session's namespace.
    pub async fn list(&self, namespace: Option<&str>) -> Result<Vec<R::Entity>, GerryDbError> {
        let namespace = self.list_namespace(namespace)?;
        self.fetch_all(&namespace).await
    }
}

impl<R: Resource> Repo<'_, R, Writable<'_>> {
    /// The id of the write context writes are attributed to.
    pub fn meta_id(&self) -> &str {
        self.access.meta_id
    }

    fn post(&self, path: &str) -> ApiRequest {
        self.db
            .api()
            .post(path)
            .header(META_ID_HEADER, self.access.meta_id)
    }

    fn put(&self, path: &str) -> ApiRequest {
        self.db
            .api()
            .put(path)
            .header(META_ID_HEADER, self.access.meta_id)
    }

    fn patch(&self, path: &str) -> ApiRequest {
        self.db
            .api()
            .patch(path)
            .header(META_ID_HEADER, self.access.meta_id)
    }
}

/// Qualify a reference to a namespaced object as `/namespace/name`,
/// bare names refer to `namespace`.
fn qualify(reference: &str, namespace: &str) -> Result<String, GerryDbError> {
    Ok(crate::path::resolve(reference, Some(namespace))?.to_string())
}
