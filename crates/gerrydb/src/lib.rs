//! Client library for GerryDB.
//!
//! GerryDB stores redistricting data: geographic layers, columns of
//! demographic and electoral data, dual graphs and districting plans,
//! combined into immutable views. This crate reads and writes those objects
//! and materializes views into tables, dual graphs and partitions,
//! caching rendered views locally.
//!
//! ```ignore
//! use gerrydb::{GerryDb, GerryDbOptions};
//!
//! let db = GerryDb::new(GerryDbOptions {
//!     namespace: Some("census.2020".to_string()),
//!     ..Default::default()
//! })?;
//! let view = db.views().get("ma_bg_demo").await?;
//! let frame = view.to_df().await?;
//! ```

pub mod cache;
pub mod config;
mod context;
mod db;
mod error;
pub mod models;
pub mod path;
pub mod repos;
pub mod utils;
pub mod view;

#[cfg(test)]
mod test_helpers;

pub use context::WriteContext;
pub use db::{GerryDb, GerryDbOptions};
pub use error::GerryDbError;
pub use gerrydb_client::{ApiError, MockMode};
pub use view::View;
