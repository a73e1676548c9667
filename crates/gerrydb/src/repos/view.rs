use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use super::{ReadOnly, Repo, Resource, Writable, qualify};
use crate::cache::{CacheKey, EntryKind};
use crate::error::GerryDbError;
use crate::models::ViewMeta;
use crate::path::{ObjectPath, normalize_path};
use crate::view::{PayloadError, View};

/// Views are rendered when created, which can take a long time.
const CREATE_TIMEOUT: Duration = Duration::from_secs(10_000);

#[derive(Debug)]
pub struct Views;

impl Resource for Views {
    type Entity = ViewMeta;

    const ENDPOINT: &'static str = "/views";
    const KIND: &'static str = "view";
}

/// Views are read as [View] handles.
pub type ViewRepo<'db, A = ReadOnly> = Repo<'db, Views, A>;

/// A view to create.
///
/// Template, layer and graph given as bare names refer to the view's namespace.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewView {
    pub path: String,
    pub template: String,
    pub locality: String,
    pub layer: String,
    pub graph: Option<String>,
    /// Point in time to instantiate the view at, now if unset.
    pub valid_at: Option<DateTime<Utc>>,
    /// Projection of the view's geographies, in WKT.
    pub proj: Option<String>,
}

#[derive(Serialize)]
struct ViewCreate<'a> {
    path: &'a str,
    template: String,
    locality: String,
    layer: String,
    graph: Option<String>,
    valid_at: DateTime<Utc>,
    proj: Option<&'a str>,
}

/// Cache entry of a view's metadata, the latest one seen online.
fn meta_key(object: &ObjectPath) -> CacheKey {
    CacheKey {
        kind: EntryKind::ViewMeta,
        namespace: object.namespace.clone(),
        path: object.name.clone(),
        version: "latest".to_string(),
    }
}

impl<'db, A> Repo<'db, Views, A> {
    /// Get a view by path.
    ///
    /// Offline sessions read the metadata seen by the last online session
    /// sharing the cache.
    pub async fn get(&self, path: &str) -> Result<View<'db>, GerryDbError> {
        let object = self.resolve(path)?;
        if self.db.is_offline() {
            return self.cached(&object);
        }
        let meta = self.fetch(&object).await?;
        Ok(self.remember(meta))
    }

    /// List all views in `namespace`, by default the session's namespace.
    pub async fn list(&self, namespace: Option<&str>) -> Result<Vec<View<'db>>, GerryDbError> {
        let namespace = self.list_namespace(namespace)?;
        Ok(self
            .fetch_all(&namespace)
            .await?
            .into_iter()
            .map(|meta| self.remember(meta))
            .collect())
    }

    fn cached(&self, object: &ObjectPath) -> Result<View<'db>, GerryDbError> {
        let Some(bytes) = self.db.cache().get(&meta_key(object))? else {
            return Err(GerryDbError::Offline(format!("fetching uncached view '{object}'")));
        };
        let meta = serde_json::from_slice(&bytes).map_err(PayloadError::Parse)?;
        debug!(view = %object, "read view metadata from cache");
        Ok(View::new(self.db, meta))
    }

    /// Keep `meta` for offline sessions.
    fn remember(&self, meta: ViewMeta) -> View<'db> {
        let key = meta_key(&ObjectPath {
            namespace: meta.namespace.clone(),
            name: meta.path.clone(),
        });
        let stored = serde_json::to_vec(&meta)
            .map_err(|e| GerryDbError::from(PayloadError::Parse(e)))
            .and_then(|bytes| Ok(self.db.cache().put(&key, &bytes)?));
        if let Err(err) = stored {
            warn!(%err, view = %meta, "failed to cache view metadata");
        }
        View::new(self.db, meta)
    }
}

impl<'db> Repo<'db, Views, Writable<'_>> {
    #[instrument(skip_all, fields(path = %view.path))]
    pub async fn create(&self, view: NewView) -> Result<View<'db>, GerryDbError> {
        let object = self.resolve(&view.path)?;
        let body = ViewCreate {
            path: &object.name,
            template: qualify(&view.template, &object.namespace)?,
            locality: normalize_path(&view.locality, false)?,
            layer: qualify(&view.layer, &object.namespace)?,
            graph: view
                .graph
                .as_deref()
                .map(|graph| qualify(graph, &object.namespace))
                .transpose()?,
            valid_at: view.valid_at.unwrap_or_else(Utc::now),
            proj: view.proj.as_deref(),
        };

        let meta = self
            .post(&format!("/views/{}", object.namespace))
            .timeout(CREATE_TIMEOUT)
            .json(&body)
            .send_json()
            .await
            .map_err(|e| GerryDbError::from_api(e, Views::KIND, object.to_string()))?;
        Ok(self.remember(meta))
    }
}
