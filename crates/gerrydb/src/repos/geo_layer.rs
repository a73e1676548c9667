use serde::Serialize;
use tracing::{debug, instrument};

use super::{Namespaced, ReadOnly, Repo, Resource, Writable};
use crate::error::GerryDbError;
use crate::models::GeoLayer;
use crate::path::normalize_path;

#[derive(Debug)]
pub struct GeoLayers;

impl Resource for GeoLayers {
    type Entity = GeoLayer;

    const ENDPOINT: &'static str = "/layers";
    const KIND: &'static str = "geographic layer";
}

impl Namespaced for GeoLayers {}

pub type GeoLayerRepo<'db, A = ReadOnly> = Repo<'db, GeoLayers, A>;

/// A geographic layer to create.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewGeoLayer {
    /// Path of the layer, e.g. `bg` or `/census.2020/bg`.
    pub path: String,
    pub description: Option<String>,
    pub source_url: Option<String>,
}

#[derive(Serialize)]
struct GeoLayerCreate<'a> {
    path: &'a str,
    description: Option<&'a str>,
    source_url: Option<&'a str>,
}

#[derive(Serialize)]
struct GeoSetCreate<'a> {
    paths: &'a [String],
}

impl Repo<'_, GeoLayers, Writable<'_>> {
    #[instrument(skip_all, fields(path = %layer.path))]
    pub async fn create(&self, layer: NewGeoLayer) -> Result<GeoLayer, GerryDbError> {
        let object = self.resolve(&layer.path)?;
        self.post(&format!("/layers/{}", object.namespace))
            .json(&GeoLayerCreate {
                path: &object.name,
                description: layer.description.as_deref(),
                source_url: layer.source_url.as_deref(),
            })
            .send_json()
            .await
            .map_err(|e| GerryDbError::from_api(e, GeoLayers::KIND, object.to_string()))
    }

    /// Declare the geographies of `layer` that lie in `locality`.
    ///
    /// Geography paths keep the case of their identifiers.
    #[instrument(skip_all, fields(layer = %layer.full_path(), %locality))]
    pub async fn map_locality(
        &self,
        layer: &GeoLayer,
        locality: &str,
        geographies: &[String],
    ) -> Result<(), GerryDbError> {
        let locality = normalize_path(locality, false)?;
        let paths = geographies
            .iter()
            .map(|geography| normalize_path(geography, true))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(n_geographies = paths.len(), "mapping geographies to locality");

        self.put(&format!("/layers/{}/{}", layer.namespace, layer.path))
            .query(&[("locality", &locality)])
            .json(&GeoSetCreate { paths: &paths })
            .send_empty()
            .await
            .map_err(|e| GerryDbError::from_api(e, GeoLayers::KIND, layer.full_path()))
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::db::{GerryDb, GerryDbOptions};
    use crate::test_helpers::{META_ID, layer_json, mock_db, mock_meta};

    #[tokio::test]
    async fn get_layer_in_default_namespace() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET).path("/api/v1/layers/census.2020/bg");
            then.status(200).json_body(layer_json("census.2020", "bg"));
        });

        let db = mock_db(&server);
        let layer = db.geo_layers().get("bg").await.unwrap();
        assert_eq!(layer.full_path(), "/census.2020/bg");
        mock.assert();
    }

    #[tokio::test]
    async fn missing_qualified_layer_is_not_found_in_any_namespace() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/layers/elsewhere/bg");
            then.status(404).json_body(json!({"detail": "Layer not found."}));
        });

        for namespace in [None, Some("census.2020".to_string()), Some("elsewhere".to_string())] {
            let db = GerryDb::new(GerryDbOptions {
                host: Some(server.base_url()),
                key: Some("test-key".to_string()),
                namespace,
                ..Default::default()
            })
            .unwrap();
            let result = db.geo_layers().get("/elsewhere/bg").await;
            assert!(
                matches!(&result, Err(GerryDbError::NotFound { path, .. }) if path == "/elsewhere/bg"),
                "expected GerryDbError::NotFound, found: {result:?}"
            );
        }
    }

    #[tokio::test]
    async fn list_layers_of_given_namespace() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/layers/census.2010");
            then.status(200).json_body(json!([
                layer_json("census.2010", "bg"),
                layer_json("census.2010", "block"),
            ]));
        });

        let db = mock_db(&server);
        let layers = db.geo_layers().list(Some("census.2010")).await.unwrap();
        assert_eq!(layers.len(), 2);
        assert_eq!(layers[1].path, "block");
    }

    #[tokio::test]
    async fn create_layer() {
        let server = MockServer::start_async().await;
        let _meta_mock = mock_meta(&server);
        let create_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v1/layers/census.2020")
                .header("x-gerrydb-meta-id", META_ID)
                .json_body(json!({
                    "path": "bg",
                    "description": "block groups",
                    "source_url": null,
                }));
            then.status(201).json_body(layer_json("census.2020", "bg"));
        });

        let db = mock_db(&server);
        let ctx = db.context("layers").await.unwrap();
        let layer = ctx
            .geo_layers()
            .create(NewGeoLayer {
                path: "BG".to_string(),
                description: Some("block groups".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(layer.path, "bg");
        create_mock.assert();
    }

    #[tokio::test]
    async fn map_locality_puts_geography_paths() {
        let server = MockServer::start_async().await;
        let _meta_mock = mock_meta(&server);
        let map_mock = server.mock(|when, then| {
            when.method(PUT)
                .path("/api/v1/layers/census.2020/bg")
                .query_param("locality", "massachusetts")
                .header("x-gerrydb-meta-id", META_ID)
                .json_body(json!({"paths": ["census.2020/250010101001", "census.2020/25001010100A"]}));
            then.status(204);
        });

        let db = mock_db(&server);
        let layer: GeoLayer = serde_json::from_value(layer_json("census.2020", "bg")).unwrap();
        let ctx = db.context("layers").await.unwrap();
        ctx.geo_layers()
            .map_locality(&layer, "Massachusetts", &[
                "/census.2020/250010101001".to_string(),
                "/census.2020/25001010100A".to_string(),
            ])
            .await
            .unwrap();
        map_mock.assert();
    }
}
