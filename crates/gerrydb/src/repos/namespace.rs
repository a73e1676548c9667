use serde::Serialize;
use tracing::instrument;

use super::{ReadOnly, Repo, Resource, Writable};
use crate::error::GerryDbError;
use crate::models::Namespace;
use crate::path::normalize_namespace;

#[derive(Debug)]
pub struct Namespaces;

impl Resource for Namespaces {
    type Entity = Namespace;

    const ENDPOINT: &'static str = "/namespaces";
    const KIND: &'static str = "namespace";
}

pub type NamespaceRepo<'db, A = ReadOnly> = Repo<'db, Namespaces, A>;

/// A namespace to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewNamespace {
    pub path: String,
    pub description: String,
    /// Whether the namespace is readable by all users.
    pub public: bool,
}

impl<A> Repo<'_, Namespaces, A> {
    pub async fn get(&self, path: &str) -> Result<Namespace, GerryDbError> {
        let path = normalize_namespace(path)?;
        self.db
            .api()
            .get(&format!("/namespaces/{path}"))
            .send_json()
            .await
            .map_err(|e| GerryDbError::from_api(e, Namespaces::KIND, path))
    }

    /// All namespaces visible to the user.
    pub async fn list(&self) -> Result<Vec<Namespace>, GerryDbError> {
        self.db
            .api()
            .get("/namespaces/")
            .send_json()
            .await
            .map_err(|e| GerryDbError::from_api(e, Namespaces::KIND, "/"))
    }
}

impl Repo<'_, Namespaces, Writable<'_>> {
    #[instrument(skip_all, fields(path = %namespace.path))]
    pub async fn create(&self, namespace: NewNamespace) -> Result<Namespace, GerryDbError> {
        let namespace = NewNamespace {
            path: normalize_namespace(&namespace.path)?,
            ..namespace
        };
        self.post("/namespaces/")
            .json(&namespace)
            .send_json()
            .await
            .map_err(|e| GerryDbError::from_api(e, Namespaces::KIND, namespace.path))
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::test_helpers::{META_ID, mock_db, mock_meta, namespace_json};

    fn new_namespace(path: &str) -> NewNamespace {
        NewNamespace {
            path: path.to_string(),
            description: "2020 census data".to_string(),
            public: true,
        }
    }

    #[tokio::test]
    async fn get_namespace() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/namespaces/census.2020");
            then.status(200).json_body(namespace_json("census.2020"));
        });

        let db = mock_db(&server);
        let namespace = db.namespaces().get("/Census.2020").await.unwrap();
        assert_eq!(namespace.path, "census.2020");
        assert!(namespace.public);
    }

    #[tokio::test]
    async fn list_namespaces() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/namespaces/");
            then.status(200).json_body(json!([
                namespace_json("census.2020"),
                namespace_json("elections"),
            ]));
        });

        let db = mock_db(&server);
        let paths = db
            .namespaces()
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|namespace| namespace.path)
            .collect::<Vec<_>>();
        assert_eq!(paths, vec!["census.2020", "elections"]);
    }

    #[tokio::test]
    async fn create_namespace_in_context() {
        let server = MockServer::start_async().await;
        let _meta_mock = mock_meta(&server);
        let create_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v1/namespaces/")
                .header("x-gerrydb-meta-id", META_ID)
                .json_body(json!({
                    "path": "census.2020",
                    "description": "2020 census data",
                    "public": true,
                }));
            then.status(201).json_body(namespace_json("census.2020"));
        });

        let db = mock_db(&server);
        let ctx = db.context("create namespace").await.unwrap();
        let namespace = ctx
            .namespaces()
            .create(new_namespace("Census.2020"))
            .await
            .unwrap();
        assert_eq!(namespace.path, "census.2020");
        create_mock.assert();
    }

    #[tokio::test]
    async fn create_existing_namespace_conflicts() {
        let server = MockServer::start_async().await;
        let _meta_mock = mock_meta(&server);
        server.mock(|when, then| {
            when.method(POST).path("/api/v1/namespaces/");
            then.status(409)
                .json_body(json!({"detail": "Namespace already exists."}));
        });

        let db = mock_db(&server);
        let ctx = db.context("create namespace").await.unwrap();
        let result = ctx.namespaces().create(new_namespace("census.2020")).await;
        assert!(
            matches!(&result, Err(GerryDbError::Conflict { resource: "namespace", path, .. }) if path == "census.2020"),
            "expected GerryDbError::Conflict, found: {result:?}"
        );
    }

    #[tokio::test]
    async fn invalid_namespace_is_rejected_locally() {
        let server = MockServer::start_async().await;
        let _meta_mock = mock_meta(&server);
        let create_mock = server.mock(|when, then| {
            when.method(POST).path("/api/v1/namespaces/");
            then.status(201).json_body(namespace_json("census.2020"));
        });

        let db = mock_db(&server);
        let ctx = db.context("create namespace").await.unwrap();
        let result = ctx.namespaces().create(new_namespace("census/2020")).await;
        assert!(
            matches!(result, Err(GerryDbError::Path(_))),
            "expected GerryDbError::Path, found: {result:?}"
        );
        create_mock.assert_hits(0);
    }
}
