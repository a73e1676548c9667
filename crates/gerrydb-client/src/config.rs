//! Configuration types for API client construction.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// User agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = "gerrydb-client-rs";

/// Rendering large views can take several minutes server side.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Configuration for API client construction.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Host of the GerryDB server, optionally including a scheme.
    pub host: String,
    /// API key sent with every request.
    pub api_key: String,
    /// Additional headers to include in requests.
    pub extra_headers: BTreeMap<String, String>,
    /// Optional user agent override.
    pub user_agent: Option<String>,
    /// Total timeout applied to each request.
    pub timeout: Duration,
    /// Mock mode for testing.
    pub mock_mode: MockMode,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            api_key: api_key.into(),
            extra_headers: BTreeMap::new(),
            user_agent: None,
            timeout: DEFAULT_TIMEOUT,
            mock_mode: MockMode::None,
        }
    }

    /// The versioned API root derived from [ClientConfig::host].
    pub fn api_root(&self) -> String {
        api_root(&self.host)
    }
}

/// Mock recording/replay mode for integration testing.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub enum MockMode {
    /// Use a real server without any mock recording or replaying.
    #[default]
    None,
    /// Proxy via a mock server and record interactions to a path.
    Record(PathBuf),
    /// Replay interactions from a path using a mock server.
    Replay(PathBuf),
}

/// Returns the scheme and authority part of a host, i.e. without the API path.
///
/// Hosts with an explicit scheme are taken as-is,
/// local development servers are reached over plain http.
pub(crate) fn origin(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else if host.starts_with("localhost") {
        format!("http://{host}")
    } else {
        format!("https://{host}")
    }
}

/// Returns the versioned API root for a host.
pub fn api_root(host: &str) -> String {
    format!("{}/api/v1", origin(host))
}
