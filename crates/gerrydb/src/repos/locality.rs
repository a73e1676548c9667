use serde::Serialize;
use tracing::{debug, instrument};

use super::{ReadOnly, Repo, Resource, Writable};
use crate::error::GerryDbError;
use crate::models::Locality;
use crate::path::normalize_path;

#[derive(Debug)]
pub struct Localities;

impl Resource for Localities {
    type Entity = Locality;

    const ENDPOINT: &'static str = "/localities";
    const KIND: &'static str = "locality";
}

/// Localities are shared by all namespaces.
pub type LocalityRepo<'db, A = ReadOnly> = Repo<'db, Localities, A>;

/// A locality to create.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct NewLocality {
    pub canonical_path: String,
    pub name: String,
    pub parent_path: Option<String>,
    /// Default projection of the locality's geographies, in WKT.
    pub default_proj: Option<String>,
    pub aliases: Vec<String>,
}

impl NewLocality {
    fn normalized(&self) -> Result<Self, GerryDbError> {
        Ok(Self {
            canonical_path: normalize_path(&self.canonical_path, false)?,
            name: self.name.clone(),
            parent_path: self
                .parent_path
                .as_deref()
                .map(|path| normalize_path(path, false))
                .transpose()?,
            default_proj: self.default_proj.clone(),
            aliases: normalize_aliases(&self.aliases)?,
        })
    }
}

#[derive(Serialize)]
struct LocalityPatch {
    aliases: Vec<String>,
}

fn normalize_aliases(aliases: &[String]) -> Result<Vec<String>, GerryDbError> {
    Ok(aliases
        .iter()
        .map(|alias| normalize_path(alias, false))
        .collect::<Result<Vec<_>, _>>()?)
}

impl<A> Repo<'_, Localities, A> {
    /// Get a locality by its canonical path or one of its aliases.
    pub async fn get(&self, path: &str) -> Result<Locality, GerryDbError> {
        let path = normalize_path(path, false)?;
        self.db
            .api()
            .get(&format!("/localities/{path}"))
            .send_json()
            .await
            .map_err(|e| GerryDbError::from_api(e, Localities::KIND, path))
    }

    pub async fn list(&self) -> Result<Vec<Locality>, GerryDbError> {
        self.db
            .api()
            .get("/localities/")
            .send_json()
            .await
            .map_err(|e| GerryDbError::from_api(e, Localities::KIND, "/"))
    }
}

impl Repo<'_, Localities, Writable<'_>> {
    #[instrument(skip_all, fields(path = %locality.canonical_path))]
    pub async fn create(&self, locality: NewLocality) -> Result<Locality, GerryDbError> {
        let path = locality.canonical_path.clone();
        self.create_bulk(&[locality])
            .await?
            .pop()
            .ok_or(GerryDbError::Response {
                resource: Localities::KIND,
                path,
                source: None,
            })
    }

    /// Create several localities in a single request.
    #[instrument(skip_all, fields(n_localities = localities.len()))]
    pub async fn create_bulk(
        &self,
        localities: &[NewLocality],
    ) -> Result<Vec<Locality>, GerryDbError> {
        let localities = localities
            .iter()
            .map(NewLocality::normalized)
            .collect::<Result<Vec<_>, _>>()?;
        let paths = localities
            .iter()
            .map(|locality| locality.canonical_path.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        debug!(%paths, "creating localities");

        self.post("/localities/")
            .json(&localities)
            .send_json()
            .await
            .map_err(|e| GerryDbError::from_api(e, Localities::KIND, paths))
    }

    /// Add aliases to a locality.
    #[instrument(skip(self))]
    pub async fn update(&self, path: &str, aliases: &[String]) -> Result<Locality, GerryDbError> {
        let path = normalize_path(path, false)?;
        self.patch(&format!("/localities/{path}"))
            .json(&LocalityPatch {
                aliases: normalize_aliases(aliases)?,
            })
            .send_json()
            .await
            .map_err(|e| GerryDbError::from_api(e, Localities::KIND, path))
    }
}
