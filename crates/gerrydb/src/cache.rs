//! A local cache of rendered payloads.
//!
//! Views and graphs never change once created, so an entry is addressed by
//! the object's path and the id of the write that created it and is never
//! invalidated or evicted.
//!
//! Entries are stored as `<root>/<kind>/<namespace>/<path>/<version hash>.bin`
//! and start with a magic header and a blake3 checksum of the payload.
//! Entries are written to a temporary file and renamed into place,
//! an entry that fails validation is treated as a miss.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use derive_more::Display;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::utils::logging::traceable_path;

const MAGIC: &[u8; 8] = b"GDBCACHE";
const CHECKSUM_LEN: usize = blake3::OUT_LEN;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache entry stored in an invalid location: '{}'", .0.display())]
    InvalidLocation(PathBuf),
    #[error("failed to create cache directory '{}'", .0.display())]
    CreateDir(PathBuf, #[source] io::Error),
    #[error("failed to read cache entry '{}'", .0.display())]
    Read(PathBuf, #[source] io::Error),
    #[error("failed to open temporary file")]
    OpenTmpFile(#[source] io::Error),
    #[error("failed to write temporary file")]
    WriteTmpFile(#[source] io::Error),
    #[error("failed to rename temporary file")]
    RenameTmpFile(#[source] tempfile::PersistError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum EntryKind {
    #[display("views")]
    View,
    #[display("graphs")]
    Graph,
    /// Metadata of a view, kept for offline sessions.
    #[display("view-meta")]
    ViewMeta,
}

/// Identity of a cached payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: EntryKind,
    pub namespace: String,
    pub path: String,
    /// Marker of the object's version, the id of the write that created it.
    pub version: String,
}

#[derive(Debug, Clone)]
pub struct PayloadCache {
    root: PathBuf,
}

impl PayloadCache {
    /// Open a cache rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| CacheError::CreateDir(root.clone(), e))?;
        debug!(root = traceable_path(&root), "opened payload cache");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of the entry for `key`.
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        let version = blake3::hash(key.version.as_bytes()).to_hex();
        self.root
            .join(key.kind.to_string())
            .join(&key.namespace)
            .join(&key.path)
            .join(format!("{version}.bin"))
    }

    /// Look up a payload.
    ///
    /// Entries that are truncated or don't match their checksum are removed
    /// and reported as a miss.
    #[instrument(skip_all, fields(kind = %key.kind, namespace = %key.namespace, path = %key.path))]
    pub fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        let entry_path = self.entry_path(key);
        let mut contents = match fs::read(&entry_path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("cache miss");
                return Ok(None);
            },
            Err(err) => return Err(CacheError::Read(entry_path, err)),
        };

        if unpack(&contents).is_none() {
            warn!(
                entry = traceable_path(&entry_path),
                "discarding corrupted cache entry"
            );
            if let Err(err) = fs::remove_file(&entry_path) {
                debug!(%err, "failed to remove corrupted cache entry");
            }
            return Ok(None);
        }

        debug!(n_bytes = contents.len() - MAGIC.len() - CHECKSUM_LEN, "cache hit");
        contents.drain(..MAGIC.len() + CHECKSUM_LEN);
        Ok(Some(contents))
    }

    /// Store a payload, replacing any existing entry for `key`.
    ///
    /// The entry only becomes visible once it is completely written.
    #[instrument(skip_all, fields(kind = %key.kind, namespace = %key.namespace, path = %key.path))]
    pub fn put(&self, key: &CacheKey, payload: &[u8]) -> Result<PathBuf, CacheError> {
        let entry_path = self.entry_path(key);
        let parent = entry_path
            .parent()
            .ok_or_else(|| CacheError::InvalidLocation(entry_path.clone()))?;
        fs::create_dir_all(parent).map_err(|e| CacheError::CreateDir(parent.to_path_buf(), e))?;

        let mut temp_file =
            tempfile::NamedTempFile::new_in(parent).map_err(CacheError::OpenTmpFile)?;
        temp_file
            .write_all(MAGIC)
            .and_then(|_| temp_file.write_all(blake3::hash(payload).as_bytes()))
            .and_then(|_| temp_file.write_all(payload))
            .and_then(|_| temp_file.as_file().sync_all())
            .map_err(CacheError::WriteTmpFile)?;
        temp_file
            .persist(&entry_path)
            .map_err(CacheError::RenameTmpFile)?;

        debug!(
            entry = traceable_path(&entry_path),
            n_bytes = payload.len(),
            "stored cache entry"
        );
        Ok(entry_path)
    }
}

/// Validate an entry and return its payload.
fn unpack(contents: &[u8]) -> Option<&[u8]> {
    let rest = contents.strip_prefix(MAGIC.as_slice())?;
    if rest.len() < CHECKSUM_LEN {
        return None;
    }
    let (checksum, payload) = rest.split_at(CHECKSUM_LEN);
    (blake3::hash(payload).as_bytes().as_slice() == checksum).then_some(payload)
}
