//! A client session against a GerryDB server.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::time::Duration;

use gerrydb_client::{ApiClient, ClientConfig, MockMode};
use serde::Serialize;
use tempfile::TempDir;
use tracing::{debug, instrument};

use crate::cache::{CacheError, PayloadCache};
use crate::config::{CacheLocation, ConfigOverrides, resolve};
use crate::context::WriteContext;
use crate::error::GerryDbError;
use crate::models::ObjectMeta;
use crate::path::{ObjectPath, normalize_namespace};
use crate::repos::{
    ColumnRepo,
    ColumnSetRepo,
    GeoLayerRepo,
    GraphRepo,
    LocalityRepo,
    NamespaceRepo,
    PlanRepo,
    ReadOnly,
    ViewRepo,
    ViewTemplateRepo,
};

/// Options for opening a [GerryDb] session.
///
/// Unset values are resolved from the environment and the profile
/// configuration, see [crate::config].
#[derive(Debug, Clone, Default)]
pub struct GerryDbOptions {
    pub profile: Option<String>,
    pub host: Option<String>,
    pub key: Option<String>,
    /// Namespace used for paths that don't name one.
    pub namespace: Option<String>,
    /// Cache directory, overriding the profile's cache.
    pub cache_dir: Option<PathBuf>,
    /// Timeout of a single request.
    pub timeout: Option<Duration>,
    pub extra_headers: BTreeMap<String, String>,
    pub mock_mode: MockMode,
    /// Serve views from the cache only, never contacting the server.
    pub offline: bool,
}

/// A session against a GerryDB server.
///
/// Read access is available through the repository accessors,
/// writes go through a [WriteContext] obtained from [GerryDb::context].
pub struct GerryDb {
    api: ApiClient,
    profile: String,
    namespace: Option<String>,
    offline: bool,
    cache: PayloadCache,
    /// Backs an ephemeral cache, removed with the session.
    _cache_dir: Option<TempDir>,
}

impl Debug for GerryDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GerryDb")
            .field("api", &self.api)
            .field("profile", &self.profile)
            .field("namespace", &self.namespace)
            .field("offline", &self.offline)
            .field("cache", &self.cache.root())
            .finish_non_exhaustive()
    }
}

impl GerryDb {
    /// Open a session.
    #[instrument(skip_all)]
    pub fn new(options: GerryDbOptions) -> Result<Self, GerryDbError> {
        let resolved = resolve(&ConfigOverrides {
            profile: options.profile,
            host: options.host,
            key: options.key,
        })?;
        let namespace = options
            .namespace
            .as_deref()
            .map(normalize_namespace)
            .transpose()?;

        let (cache, cache_dir) = match (options.cache_dir, resolved.cache) {
            (Some(dir), _) | (None, CacheLocation::Persistent(dir)) => {
                (PayloadCache::open(dir)?, None)
            },
            (None, CacheLocation::Ephemeral) => {
                let dir = TempDir::new()
                    .map_err(|e| CacheError::CreateDir(std::env::temp_dir(), e))?;
                (PayloadCache::open(dir.path())?, Some(dir))
            },
        };

        let mut config = ClientConfig::new(resolved.host, resolved.key);
        config.extra_headers = options.extra_headers;
        config.mock_mode = options.mock_mode;
        if let Some(timeout) = options.timeout {
            config.timeout = timeout;
        }
        let api = ApiClient::new(config).map_err(GerryDbError::Client)?;

        debug!(
            api_root = api.api_root(),
            profile = %resolved.profile,
            namespace = ?namespace,
            offline = options.offline,
            "opened GerryDB session"
        );
        Ok(Self {
            api,
            profile: resolved.profile,
            namespace,
            offline: options.offline,
            cache,
            _cache_dir: cache_dir,
        })
    }

    /// Open a session configured entirely from the environment
    /// and the profile configuration.
    pub fn from_env() -> Result<Self, GerryDbError> {
        Self::new(GerryDbOptions::default())
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// The default namespace, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Whether the session only reads from the cache.
    pub fn is_offline(&self) -> bool {
        self.offline
    }

    /// Fail with [GerryDbError::Offline] if the session is offline.
    pub(crate) fn require_online(&self, operation: impl Into<String>) -> Result<(), GerryDbError> {
        match self.offline {
            true => Err(GerryDbError::Offline(operation.into())),
            false => Ok(()),
        }
    }

    pub fn cache(&self) -> &PayloadCache {
        &self.cache
    }

    pub fn cache_dir(&self) -> &Path {
        self.cache.root()
    }

    /// Resolve `path` against the default namespace.
    pub fn resolve(&self, path: &str) -> Result<ObjectPath, GerryDbError> {
        Ok(crate::path::resolve(path, self.namespace())?)
    }

    /// Open a write context annotated with `notes`.
    ///
    /// All objects created through the context are attributed to it.
    #[instrument(skip(self))]
    pub async fn context(&self, notes: &str) -> Result<WriteContext<'_>, GerryDbError> {
        self.require_online("opening a write context")?;

        #[derive(Serialize)]
        struct MetaCreate<'a> {
            notes: &'a str,
        }

        let meta: ObjectMeta = self
            .api
            .post("/meta/")
            .json(&MetaCreate { notes })
            .send_json()
            .await
            .map_err(|e| GerryDbError::from_api(e, "write context", notes))?;
        Ok(WriteContext::new(self, meta))
    }

    pub fn namespaces(&self) -> NamespaceRepo<'_> {
        NamespaceRepo::new(self, ReadOnly)
    }

    pub fn localities(&self) -> LocalityRepo<'_> {
        LocalityRepo::new(self, ReadOnly)
    }

    pub fn geo_layers(&self) -> GeoLayerRepo<'_> {
        GeoLayerRepo::new(self, ReadOnly)
    }

    pub fn columns(&self) -> ColumnRepo<'_> {
        ColumnRepo::new(self, ReadOnly)
    }

    pub fn column_sets(&self) -> ColumnSetRepo<'_> {
        ColumnSetRepo::new(self, ReadOnly)
    }

    pub fn view_templates(&self) -> ViewTemplateRepo<'_> {
        ViewTemplateRepo::new(self, ReadOnly)
    }

    pub fn graphs(&self) -> GraphRepo<'_> {
        GraphRepo::new(self, ReadOnly)
    }

    pub fn plans(&self) -> PlanRepo<'_> {
        PlanRepo::new(self, ReadOnly)
    }

    pub fn views(&self) -> ViewRepo<'_> {
        ViewRepo::new(self, ReadOnly)
    }
}
