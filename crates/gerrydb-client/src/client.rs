//! Thin request layer over `reqwest` for the GerryDB REST API.

use std::fmt::Debug;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Method;
use reqwest::header::{self, HeaderMap};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::config::{ClientConfig, DEFAULT_USER_AGENT, api_root};
use crate::error::ApiError;
use crate::mock::MockGuard;

const API_KEY_HEADER: &str = "x-api-key";

/// A client for the GerryDB API.
///
/// Handles:
/// - HTTP client configuration with timeouts
/// - API key authentication
/// - Mock server recording/replay for testing
pub struct ApiClient {
    client: reqwest::Client,
    config: ClientConfig,
    api_root: String,

    _mock_guard: Option<MockGuard>,
}

impl Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_root", &self.api_root)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a new API client from configuration.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        // create a mock server if configured
        let mock_guard = MockGuard::new(&config);
        let api_root = match mock_guard {
            Some(ref mock) => api_root(&mock.host()),
            None => config.api_root(),
        };

        let client = build_http_client(&config)?;

        Ok(Self {
            client,
            config,
            api_root,
            _mock_guard: mock_guard,
        })
    }

    /// The versioned API root all request paths are relative to.
    pub fn api_root(&self) -> &str {
        &self.api_root
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Absolute URL for an API path such as `/columns/census`.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_root, path.trim_start_matches('/'))
    }

    pub fn request(&self, method: Method, path: &str) -> ApiRequest {
        let url = self.url(path);
        ApiRequest {
            builder: self.client.request(method.clone(), &url),
            method,
            url,
        }
    }

    pub fn get(&self, path: &str) -> ApiRequest {
        self.request(Method::GET, path)
    }

    pub fn post(&self, path: &str) -> ApiRequest {
        self.request(Method::POST, path)
    }

    pub fn put(&self, path: &str) -> ApiRequest {
        self.request(Method::PUT, path)
    }

    pub fn patch(&self, path: &str) -> ApiRequest {
        self.request(Method::PATCH, path)
    }
}

/// A pending request against the API.
#[must_use = "requests do nothing unless sent"]
pub struct ApiRequest {
    builder: reqwest::RequestBuilder,
    method: Method,
    url: String,
}

/// A raw response body, e.g. a rendered view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPayload {
    pub bytes: Vec<u8>,
    /// Identifier the server assigned to the rendering, if reported.
    pub render_id: Option<String>,
}

impl ApiRequest {
    pub fn json<B: Serialize + ?Sized>(self, body: &B) -> Self {
        Self {
            builder: self.builder.json(body),
            ..self
        }
    }

    pub fn query<Q: Serialize + ?Sized>(self, query: &Q) -> Self {
        Self {
            builder: self.builder.query(query),
            ..self
        }
    }

    pub fn header(self, name: &str, value: &str) -> Self {
        Self {
            builder: self.builder.header(name, value),
            ..self
        }
    }

    /// Override the client wide timeout for this request.
    pub fn timeout(self, timeout: Duration) -> Self {
        Self {
            builder: self.builder.timeout(timeout),
            ..self
        }
    }

    /// Send the request and parse a JSON response.
    pub async fn send_json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        let response = self.execute().await?;
        let body = response.bytes().await.map_err(ApiError::Connection)?;
        serde_json::from_slice(&body).map_err(ApiError::Decode)
    }

    /// Send the request, discarding the response body.
    pub async fn send_empty(self) -> Result<(), ApiError> {
        self.execute().await?;
        Ok(())
    }

    /// Send the request and return the raw response body.
    pub async fn send_bytes(self) -> Result<RawPayload, ApiError> {
        let response = self.execute().await?;
        let render_id = render_id(response.headers());
        let bytes = response.bytes().await.map_err(ApiError::Connection)?;
        debug!(n_bytes = bytes.len(), ?render_id, "received payload");
        Ok(RawPayload {
            bytes: bytes.to_vec(),
            render_id,
        })
    }

    #[instrument(skip_all, fields(method = %self.method, url = %self.url))]
    async fn execute(self) -> Result<reqwest::Response, ApiError> {
        let response = self.builder.send().await.map_err(ApiError::Connection)?;
        let status = response.status();
        debug!(%status, "received response");
        if status.is_success() {
            return Ok(response);
        }

        // The body is only used to extract a message, a failure to read it
        // should not mask the status.
        let body = response.bytes().await.unwrap_or_default();
        Err(ApiError::from_response(status, &body))
    }
}

/// Extract the render id from a response.
///
/// Large renders are redirected to object storage,
/// which reports the id as custom object metadata.
fn render_id(headers: &HeaderMap) -> Option<String> {
    headers.iter().find_map(|(name, value)| {
        let name = name.as_str();
        let is_render_id = name.ends_with("-render-id")
            && (name.starts_with("x-gerrydb-") || name.starts_with("x-goog-meta-gerrydb-"));
        if !is_render_id {
            return None;
        }
        value.to_str().ok().map(str::to_string)
    })
}

// ---------------------------------------------------------------------------
// HTTP client builder
// ---------------------------------------------------------------------------

/// Build HTTP client with API key auth for the GerryDB API.
fn build_http_client(config: &ClientConfig) -> Result<reqwest::Client, ApiError> {
    let mut headers = HeaderMap::new();

    let mut api_key = header::HeaderValue::from_str(&config.api_key)
        .map_err(|_| ApiError::InvalidHeader(API_KEY_HEADER.to_string()))?;
    api_key.set_sensitive(true);
    headers.insert(header::HeaderName::from_static(API_KEY_HEADER), api_key);

    for (key, value) in &config.extra_headers {
        headers.insert(
            header::HeaderName::from_str(key)
                .map_err(|_| ApiError::InvalidHeader(key.to_string()))?,
            header::HeaderValue::from_str(value)
                .map_err(|_| ApiError::InvalidHeader(key.to_string()))?,
        );
    }

    debug!(
        host = %config.host,
        extra_headers = config.extra_headers.len(),
        timeout = ?config.timeout,
        "building GerryDB HTTP client"
    );

    reqwest::Client::builder()
        .default_headers(headers)
        .user_agent(config.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT))
        .connect_timeout(Duration::from_secs(15))
        .timeout(config.timeout)
        .build()
        .map_err(ApiError::Build)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use httpmock::prelude::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::config::MockMode;

    fn client_config(url: &str) -> ClientConfig {
        ClientConfig {
            host: url.to_string(),
            api_key: "test-key".to_string(),
            extra_headers: Default::default(),
            user_agent: None,
            timeout: Duration::from_secs(5),
            mock_mode: MockMode::None,
        }
    }

    #[tokio::test]
    async fn api_key_and_user_agent_set_on_all_requests() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/namespaces/")
                .header("x-api-key", "test-key")
                .header("user-agent", DEFAULT_USER_AGENT);
            then.status(200).json_body(json!([]));
        });

        let client = ApiClient::new(client_config(&server.base_url())).unwrap();
        let namespaces: Vec<serde_json::Value> =
            client.get("/namespaces/").send_json().await.unwrap();
        assert!(namespaces.is_empty());
        mock.assert();
    }

    #[tokio::test]
    async fn extra_headers_set_on_all_requests() {
        let mut extra_headers: BTreeMap<String, String> = BTreeMap::new();
        extra_headers.insert("gerrydb-test".to_string(), "test-value".to_string());

        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.header("gerrydb-test", "test-value")
                .header("user-agent", "my-custom-user-agent");
            then.status(200).json_body(json!({}));
        });

        let config = ClientConfig {
            extra_headers,
            user_agent: Some("my-custom-user-agent".to_string()),
            ..client_config(&server.base_url())
        };

        let client = ApiClient::new(config).unwrap();
        client.get("/meta/").send_empty().await.unwrap();
        mock.assert();
    }

    #[tokio::test]
    async fn json_body_and_query_are_sent() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(PUT)
                .path("/api/v1/layers/census/blocks")
                .query_param("locality", "maine")
                .json_body(json!({"paths": ["a", "b"]}));
            then.status(200);
        });

        let client = ApiClient::new(client_config(&server.base_url())).unwrap();
        client
            .put("/layers/census/blocks")
            .query(&[("locality", "maine")])
            .json(&json!({"paths": ["a", "b"]}))
            .send_empty()
            .await
            .unwrap();
        mock.assert();
    }

    /// 404 errors are mapped to [ApiError::NotFound] and keep the detail
    #[tokio::test]
    async fn error_response_not_found() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|_, then| {
            then.status(404)
                .header("content-type", "application/json")
                .json_body(json!({"detail": "Namespace not found."}));
        });

        let client = ApiClient::new(client_config(&server.base_url())).unwrap();
        let result = client
            .get("/namespaces/missing")
            .send_json::<serde_json::Value>()
            .await;
        let Err(ApiError::NotFound(response)) = result else {
            panic!("expected ApiError::NotFound, found: {result:?}");
        };
        assert_eq!(response.detail.as_deref(), Some("Namespace not found."));
        mock.assert();
    }

    #[tokio::test]
    async fn error_response_server() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|_, then| {
            then.status(503).body("upstream unavailable");
        });

        let client = ApiClient::new(client_config(&server.base_url())).unwrap();
        let result = client.post("/meta/").send_empty().await;
        assert!(
            matches!(&result, Err(err @ ApiError::Server(_)) if err.is_transient()),
            "expected ApiError::Server, found: {result:?}"
        );
        mock.assert();
    }

    /// Success responses that don't parse are [ApiError::Decode]s
    #[tokio::test]
    async fn undecodable_response() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|_, then| {
            then.status(200).body("not json");
        });

        let client = ApiClient::new(client_config(&server.base_url())).unwrap();
        let result = client.get("/meta/").send_json::<serde_json::Value>().await;
        assert!(
            matches!(result, Err(ApiError::Decode(_))),
            "expected ApiError::Decode, found: {result:?}"
        );
        mock.assert();
    }

    #[tokio::test]
    async fn refused_connection_is_transient() {
        let client = ApiClient::new(client_config("http://127.0.0.1:1")).unwrap();
        let result = client.get("/meta/").send_empty().await;
        assert!(
            matches!(&result, Err(err @ ApiError::Connection(_)) if err.is_transient()),
            "expected ApiError::Connection, found: {result:?}"
        );
    }

    #[tokio::test]
    async fn raw_payload_reports_render_id() {
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST).path("/api/v1/views/census/ma_bg");
            then.status(200)
                .header("x-gerrydb-view-render-id", "render-123")
                .body(b"\x1f\x8bpayload".as_slice());
        });

        let client = ApiClient::new(client_config(&server.base_url())).unwrap();
        let payload = client.post("/views/census/ma_bg").send_bytes().await.unwrap();
        assert_eq!(payload, RawPayload {
            bytes: b"\x1f\x8bpayload".to_vec(),
            render_id: Some("render-123".to_string()),
        });
        mock.assert();
    }

    #[test]
    fn invalid_api_key_is_rejected() {
        let config = ClientConfig {
            api_key: "line\nbreak".to_string(),
            ..client_config("localhost")
        };
        let result = ApiClient::new(config);
        assert!(matches!(result, Err(ApiError::InvalidHeader(_))));
    }

    #[test]
    fn url_joins_paths() {
        let client = ApiClient::new(client_config("localhost:8000")).unwrap();
        assert_eq!(
            client.url("/namespaces/"),
            "http://localhost:8000/api/v1/namespaces/"
        );
        assert_eq!(
            client.url("columns/census"),
            "http://localhost:8000/api/v1/columns/census"
        );
    }
}
