//! Shared HTTP client infrastructure for the GerryDB API.
//!
//! This crate provides:
//! - HTTP client construction with API key authentication
//! - Status-class error mapping for GerryDB API responses
//! - Mock server infrastructure for integration testing
//!
//! ## Usage
//!
//! ```ignore
//! use gerrydb_client::{ApiClient, ClientConfig};
//!
//! let config = ClientConfig::new("gerrydb.example.org", key);
//! let client = ApiClient::new(config)?;
//! let namespaces: Vec<serde_json::Value> = client.get("/namespaces/").send_json().await?;
//! ```

mod client;
mod config;
mod error;
pub(crate) mod mock;

pub use client::{ApiClient, ApiRequest, RawPayload};
pub use config::{ClientConfig, MockMode, api_root};
pub use error::{ApiError, ErrorResponse};

/// Header carrying the write context a mutating request is attributed to.
pub const META_ID_HEADER: &str = "X-GerryDB-Meta-ID";
