//! Store configuration
//!
//! `StoreConfig` is resolved once by the embedding process (from a JSON file,
//! environment variables, or plain code) and handed to
//! [`DatabaseService::open`](crate::db::DatabaseService::open) and
//! [`ListStore::new`](crate::services::ListStore::new). Nothing in the store
//! reads the environment on its own.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Maximum nesting depth of an item tree (root items are depth 1)
pub const MAX_DEPTH: usize = 3;

/// Gap between consecutive sibling order keys
pub const ORDER_STEP: i64 = 1024;

/// Default busy timeout applied to every local connection
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Broadcast capacity for store events
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 128;

/// Environment variable names read by [`StoreConfig::from_env`]
pub const ENV_DB_PATH: &str = "LISTKEEPER_DB_PATH";
pub const ENV_DB_URL: &str = "LISTKEEPER_DB_URL";
pub const ENV_DB_AUTH_TOKEN: &str = "LISTKEEPER_DB_AUTH_TOKEN";

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Missing environment variable {0}")]
    MissingEnv(&'static str),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Where the database lives
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DatabaseTarget {
    /// Embedded database file
    Local { path: PathBuf },

    /// Remote libsql endpoint (managed Turso database)
    Remote { url: String, auth_token: String },
}

impl DatabaseTarget {
    /// Human-readable description without credentials
    pub fn describe(&self) -> String {
        match self {
            Self::Local { path } => path.display().to_string(),
            Self::Remote { url, .. } => url.clone(),
        }
    }
}

// Manual Debug so auth tokens never reach logs
impl fmt::Debug for DatabaseTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local { path } => f.debug_struct("Local").field("path", path).finish(),
            Self::Remote { url, .. } => f
                .debug_struct("Remote")
                .field("url", url)
                .field("auth_token", &"<redacted>")
                .finish(),
        }
    }
}

/// Connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub target: DatabaseTarget,

    /// SQLite busy timeout for local connections
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            target: DatabaseTarget::Local {
                path: PathBuf::from("listkeeper.db"),
            },
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl DatabaseConfig {
    /// Local database file at `path` with default settings
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            target: DatabaseTarget::Local { path: path.into() },
            ..Self::default()
        }
    }

    /// Remote endpoint with an auth token
    pub fn remote(url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            target: DatabaseTarget::Remote {
                url: url.into(),
                auth_token: auth_token.into(),
            },
            ..Self::default()
        }
    }
}

/// Structural limits of item trees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeLimits {
    /// Maximum depth of any item (root = 1)
    pub max_depth: usize,

    /// Sparse order step between appended siblings
    pub order_step: i64,
}

impl Default for TreeLimits {
    fn default() -> Self {
        Self {
            max_depth: MAX_DEPTH,
            order_step: ORDER_STEP,
        }
    }
}

/// Complete store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub database: DatabaseConfig,
    pub limits: TreeLimits,
    pub event_channel_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            limits: TreeLimits::default(),
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl StoreConfig {
    /// Config pointing at a local database file, all other settings default
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            database: DatabaseConfig::local(path),
            ..Self::default()
        }
    }

    /// Load a JSON config file; missing fields take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Build a config from environment variables
    ///
    /// `LISTKEEPER_DB_URL` (with `LISTKEEPER_DB_AUTH_TOKEN`) selects a remote
    /// database; otherwise `LISTKEEPER_DB_PATH` selects a local file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database = if let Some(url) = lookup(ENV_DB_URL) {
            let token = lookup(ENV_DB_AUTH_TOKEN).ok_or(ConfigError::MissingEnv(ENV_DB_AUTH_TOKEN))?;
            DatabaseConfig::remote(url, token)
        } else if let Some(path) = lookup(ENV_DB_PATH) {
            DatabaseConfig::local(path)
        } else {
            return Err(ConfigError::MissingEnv(ENV_DB_PATH));
        };

        let config = Self {
            database,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the store cannot operate with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limits.max_depth == 0 {
            return Err(ConfigError::Invalid("max_depth must be at least 1".into()));
        }
        if self.limits.order_step < 2 {
            return Err(ConfigError::Invalid(
                "order_step must leave room between siblings (>= 2)".into(),
            ));
        }
        if self.event_channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "event_channel_capacity must be positive".into(),
            ));
        }
        if let DatabaseTarget::Remote { url, .. } = &self.database.target {
            if url.trim().is_empty() {
                return Err(ConfigError::Invalid("remote url is empty".into()));
            }
        }
        Ok(())
    }
}
