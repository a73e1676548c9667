use gerrydb_client::ApiError;
use thiserror::Error;

use crate::cache::CacheError;
use crate::config::ConfigError;
use crate::path::PathError;
use crate::view::PayloadError;

/// Errors returned by GerryDB operations.
///
/// API failures are classified so callers can branch on the outcome
/// without inspecting responses.
#[derive(Debug, Error)]
pub enum GerryDbError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("failed to set up GerryDB client")]
    Client(#[source] ApiError),

    #[error("{resource} '{path}' not found")]
    NotFound {
        resource: &'static str,
        path: String,
        #[source]
        source: ApiError,
    },
    #[error("{resource} '{path}' already exists")]
    Conflict {
        resource: &'static str,
        path: String,
        #[source]
        source: ApiError,
    },
    #[error("invalid {resource} request for '{path}'")]
    Validation {
        resource: &'static str,
        path: String,
        #[source]
        source: ApiError,
    },
    #[error("access denied to {resource} '{path}'")]
    Forbidden {
        resource: &'static str,
        path: String,
        #[source]
        source: ApiError,
    },
    #[error("request for {resource} '{path}' failed, the server may be unavailable")]
    Transient {
        resource: &'static str,
        path: String,
        #[source]
        source: ApiError,
    },
    #[error("unexpected response for {resource} '{path}'")]
    Response {
        resource: &'static str,
        path: String,
        #[source]
        source: Option<ApiError>,
    },

    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0} requires a connection to the GerryDB server, but the session is offline")]
    Offline(String),
    #[error("view '{0}' has no graph attached")]
    NoGraph(String),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Payload(#[from] PayloadError),
}

impl GerryDbError {
    /// Classify an API failure concerning the object at `path`.
    pub(crate) fn from_api(source: ApiError, resource: &'static str, path: impl Into<String>) -> Self {
        let path = path.into();
        match source {
            ApiError::NotFound(_) => GerryDbError::NotFound {
                resource,
                path,
                source,
            },
            ApiError::Conflict(_) => GerryDbError::Conflict {
                resource,
                path,
                source,
            },
            ApiError::Validation(_) => GerryDbError::Validation {
                resource,
                path,
                source,
            },
            ApiError::Forbidden(_) => GerryDbError::Forbidden {
                resource,
                path,
                source,
            },
            source if source.is_transient() => GerryDbError::Transient {
                resource,
                path,
                source,
            },
            source => GerryDbError::Response {
                resource,
                path,
                source: Some(source),
            },
        }
    }

    /// Detail reported by the server, if any.
    pub fn detail(&self) -> Option<&str> {
        let source = match self {
            GerryDbError::NotFound { source, .. }
            | GerryDbError::Conflict { source, .. }
            | GerryDbError::Validation { source, .. }
            | GerryDbError::Forbidden { source, .. }
            | GerryDbError::Transient { source, .. } => source,
            GerryDbError::Response {
                source: Some(source),
                ..
            } => source,
            _ => return None,
        };
        source.response()?.detail.as_deref()
    }
}
