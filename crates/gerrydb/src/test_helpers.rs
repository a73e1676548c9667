//! Fixtures for tests against a mocked GerryDB server.

use httpmock::Mock;
use httpmock::prelude::*;
use serde_json::{Value, json};

use crate::db::{GerryDb, GerryDbOptions};

pub const META_ID: &str = "7f2c3c1e-3d1a-4bb4-9a57-0d0e3a6c2d11";

/// A session talking to `server` with `census.2020` as default namespace
/// and a throwaway cache.
pub fn mock_db(server: &MockServer) -> GerryDb {
    GerryDb::new(GerryDbOptions {
        host: Some(server.base_url()),
        key: Some("test-key".to_string()),
        namespace: Some("census.2020".to_string()),
        ..Default::default()
    })
    .unwrap()
}

/// Mock the endpoint opening a write context.
pub fn mock_meta(server: &MockServer) -> Mock<'_> {
    server.mock(|when, then| {
        when.method(POST).path("/api/v1/meta/");
        then.status(200).json_body(meta_json());
    })
}

pub fn meta_json() -> Value {
    json!({
        "uuid": META_ID,
        "notes": "test writes",
        "created_at": "2023-06-01T12:00:00Z",
        "created_by": "tester@example.org",
    })
}

pub fn namespace_json(path: &str) -> Value {
    json!({
        "path": path,
        "description": format!("{path} namespace"),
        "public": true,
        "meta": meta_json(),
    })
}

pub fn locality_json(path: &str) -> Value {
    json!({
        "canonical_path": path,
        "parent_path": null,
        "default_proj": null,
        "name": path.to_uppercase(),
        "aliases": [],
        "meta": meta_json(),
    })
}

pub fn layer_json(namespace: &str, path: &str) -> Value {
    json!({
        "path": path,
        "namespace": namespace,
        "description": format!("{path} units"),
        "source_url": null,
        "meta": meta_json(),
    })
}

pub fn column_json(namespace: &str, path: &str, kind: &str, column_type: &str) -> Value {
    json!({
        "canonical_path": path,
        "namespace": namespace,
        "description": format!("{path} column"),
        "source_url": null,
        "kind": kind,
        "type": column_type,
        "aliases": [],
        "meta": meta_json(),
    })
}

pub fn column_set_json(namespace: &str, path: &str, columns: Vec<Value>) -> Value {
    json!({
        "path": path,
        "namespace": namespace,
        "description": format!("{path} columns"),
        "columns": columns,
        "refs": [],
        "meta": meta_json(),
    })
}

pub fn template_json(namespace: &str, path: &str, members: Vec<Value>) -> Value {
    json!({
        "path": path,
        "namespace": namespace,
        "description": format!("{path} template"),
        "members": members,
        "valid_from": "2023-06-01T12:00:00Z",
        "meta": meta_json(),
    })
}

pub fn graph_meta_json(namespace: &str, path: &str, locality: &str, layer: &str) -> Value {
    json!({
        "path": path,
        "namespace": namespace,
        "description": format!("{path} dual graph"),
        "locality": locality_json(locality),
        "layer": layer_json(namespace, layer),
        "proj": null,
        "created_at": "2023-06-01T12:00:00Z",
        "meta": meta_json(),
    })
}

/// A view over a `basic_pops` template with a count and a float column.
pub fn view_json(namespace: &str, path: &str, graph: Option<&str>) -> Value {
    json!({
        "path": path,
        "namespace": namespace,
        "template": template_json(namespace, "basic_pops", vec![
            column_json(namespace, "total_pop", "count", "int"),
            column_json(namespace, "area_land", "area", "float"),
        ]),
        "locality": locality_json("massachusetts"),
        "layer": layer_json(namespace, "bg"),
        "graph": graph.map(|graph| graph_meta_json(namespace, graph, "massachusetts", "bg")),
        "valid_at": "2023-06-01T12:00:00Z",
        "proj": null,
        "meta": meta_json(),
    })
}
