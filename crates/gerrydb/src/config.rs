//! Resolution of the server host and API key.
//!
//! Credentials are looked up in order from explicit overrides,
//! the `GERRYDB_HOST`/`GERRYDB_KEY` environment variables,
//! and finally a profile in `$GERRYDB_ROOT/config`:
//!
//! ```toml
//! [default]
//! host = "gerrydb.example.org"
//! key = "..."
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::utils::logging::traceable_path;

pub const GERRYDB_ROOT_VAR: &str = "GERRYDB_ROOT";
pub const GERRYDB_PROFILE_VAR: &str = "GERRYDB_PROFILE";
pub const GERRYDB_HOST_VAR: &str = "GERRYDB_HOST";
pub const GERRYDB_KEY_VAR: &str = "GERRYDB_KEY";

pub const DEFAULT_PROFILE: &str = "default";
const CONFIG_FILE_NAME: &str = "config";
const CACHES_DIR_NAME: &str = "caches";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine home directory")]
    NoHomeDirectory,
    #[error("GerryDB configuration not found at '{}'", .0.display())]
    NotFound(PathBuf),
    #[error("could not read GerryDB configuration at '{}'", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: config::ConfigError,
    },
    #[error("profile '{profile}' not found in '{}'", path.display())]
    ProfileNotFound { profile: String, path: PathBuf },
    #[error("profile '{profile}' is missing required field '{field}'")]
    MissingField {
        profile: String,
        field: &'static str,
    },
    #[error("{given} was provided without {missing}")]
    PartialOverride {
        given: &'static str,
        missing: &'static str,
    },
}

/// Values that take precedence over the configuration file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub profile: Option<String>,
    pub host: Option<String>,
    pub key: Option<String>,
}

/// Where rendered payloads are cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLocation {
    /// A directory that outlives the session.
    Persistent(PathBuf),
    /// A temporary directory removed with the session.
    Ephemeral,
}

#[derive(Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub profile: String,
    pub host: String,
    pub key: String,
    pub cache: CacheLocation,
}

impl fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("profile", &self.profile)
            .field("host", &self.host)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct ProfileEntry {
    host: Option<String>,
    key: Option<String>,
}

/// The GerryDB root directory, `$GERRYDB_ROOT` or `~/.gerrydb`.
pub fn gerrydb_root() -> Result<PathBuf, ConfigError> {
    if let Some(root) = env_var(GERRYDB_ROOT_VAR) {
        return Ok(PathBuf::from(root));
    }
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDirectory)?;
    Ok(home.join(".gerrydb"))
}

/// Resolve credentials and cache location.
pub fn resolve(overrides: &ConfigOverrides) -> Result<ResolvedConfig, ConfigError> {
    resolve_in(overrides, gerrydb_root)
}

/// [resolve] with the root directory looked up by `root`, only if needed.
fn resolve_in(
    overrides: &ConfigOverrides,
    root: impl FnOnce() -> Result<PathBuf, ConfigError>,
) -> Result<ResolvedConfig, ConfigError> {
    let profile = overrides
        .profile
        .clone()
        .or_else(|| env_var(GERRYDB_PROFILE_VAR))
        .unwrap_or_else(|| DEFAULT_PROFILE.to_string());

    if let Some((host, key)) = pair(
        (overrides.host.clone(), "host"),
        (overrides.key.clone(), "key"),
    )? {
        debug!(%host, "using explicitly configured host");
        return Ok(ResolvedConfig {
            profile,
            host,
            key,
            cache: CacheLocation::Ephemeral,
        });
    }

    let env_credentials = pair(
        (env_var(GERRYDB_HOST_VAR), GERRYDB_HOST_VAR),
        (env_var(GERRYDB_KEY_VAR), GERRYDB_KEY_VAR),
    )?;
    let root = match root() {
        Ok(root) => root,
        Err(err) => {
            let Some((host, key)) = env_credentials else {
                return Err(err);
            };
            debug!(%host, %err, "using host from environment without a cache directory");
            return Ok(ResolvedConfig {
                profile,
                host,
                key,
                cache: CacheLocation::Ephemeral,
            });
        },
    };
    let cache = CacheLocation::Persistent(root.join(CACHES_DIR_NAME).join(&profile));

    if let Some((host, key)) = env_credentials {
        debug!(%host, "using host from environment");
        return Ok(ResolvedConfig {
            profile,
            host,
            key,
            cache,
        });
    }

    let (host, key) = read_profile(&root.join(CONFIG_FILE_NAME), &profile)?;
    debug!(%host, %profile, "using host from configuration file");
    Ok(ResolvedConfig {
        profile,
        host,
        key,
        cache,
    })
}

/// Read `host` and `key` of a profile from a TOML configuration file.
fn read_profile(path: &Path, profile: &str) -> Result<(String, String), ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    debug!(path = traceable_path(path), "reading configuration");

    let mut profiles: HashMap<String, ProfileEntry> = config::Config::builder()
        .add_source(config::File::from(path.to_path_buf()).format(config::FileFormat::Toml))
        .build()
        .and_then(|config| config.try_deserialize())
        .map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    let entry = profiles
        .remove(profile)
        .ok_or_else(|| ConfigError::ProfileNotFound {
            profile: profile.to_string(),
            path: path.to_path_buf(),
        })?;
    let missing = |field| ConfigError::MissingField {
        profile: profile.to_string(),
        field,
    };
    Ok((
        entry.host.ok_or_else(|| missing("host"))?,
        entry.key.ok_or_else(|| missing("key"))?,
    ))
}

/// Both values or neither.
fn pair(
    (first, first_name): (Option<String>, &'static str),
    (second, second_name): (Option<String>, &'static str),
) -> Result<Option<(String, String)>, ConfigError> {
    match (first, second) {
        (Some(first), Some(second)) => Ok(Some((first, second))),
        (None, None) => Ok(None),
        (Some(_), None) => Err(ConfigError::PartialOverride {
            given: first_name,
            missing: second_name,
        }),
        (None, Some(_)) => Err(ConfigError::PartialOverride {
            given: second_name,
            missing: first_name,
        }),
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}
