use crate::core::{DbError, Result};
use rusqlite::OpenFlags;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level configuration structure parsed from a TOML file.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub database: ConnectionParams,
}

/// How the cursor opens transactions before data-modifying statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IsolationLevel {
    /// `BEGIN DEFERRED`
    #[default]
    Deferred,
    /// `BEGIN IMMEDIATE`
    Immediate,
    /// `BEGIN EXCLUSIVE`
    Exclusive,
    /// Never open a transaction implicitly; every statement commits itself.
    Autocommit,
}

impl IsolationLevel {
    /// The statement that opens a transaction at this level, if any.
    pub fn begin_statement(self) -> Option<&'static str> {
        match self {
            IsolationLevel::Deferred => Some("BEGIN DEFERRED"),
            IsolationLevel::Immediate => Some("BEGIN IMMEDIATE"),
            IsolationLevel::Exclusive => Some("BEGIN EXCLUSIVE"),
            IsolationLevel::Autocommit => None,
        }
    }
}

/// Parameters handed to the driver when a scoped connection is opened.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConnectionParams {
    /// Database file, `:memory:`, or a `file:` URI when `uri` is set.
    pub path: String,
    /// Busy timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: f64,
    #[serde(default)]
    pub isolation_level: IsolationLevel,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default = "default_create")]
    pub create: bool,
    #[serde(default)]
    pub uri: bool,
}

fn default_timeout() -> f64 {
    5.0
}

fn default_create() -> bool {
    true
}

impl ConnectionParams {
    /// Parameters for `path` with the driver defaults.
    pub fn new(path: impl Into<String>) -> Self {
        ConnectionParams {
            path: path.into(),
            timeout: default_timeout(),
            isolation_level: IsolationLevel::default(),
            read_only: false,
            create: default_create(),
            uri: false,
        }
    }

    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout = seconds;
        self
    }

    pub fn with_isolation_level(mut self, level: IsolationLevel) -> Self {
        self.isolation_level = level;
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    pub fn uri(mut self, uri: bool) -> Self {
        self.uri = uri;
        self
    }

    /// Driver open flags for these parameters.
    pub fn open_flags(&self) -> OpenFlags {
        let mut flags = if self.read_only {
            OpenFlags::SQLITE_OPEN_READ_ONLY
        } else {
            OpenFlags::SQLITE_OPEN_READ_WRITE
        };
        if self.create && !self.read_only {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }
        if self.uri {
            flags |= OpenFlags::SQLITE_OPEN_URI;
        }
        flags | OpenFlags::SQLITE_OPEN_NO_MUTEX
    }

    /// Busy timeout as a `Duration`; negative or non-finite values disable it.
    pub fn busy_timeout(&self) -> Duration {
        if self.timeout.is_finite() && self.timeout > 0.0 {
            Duration::from_secs_f64(self.timeout)
        } else {
            Duration::ZERO
        }
    }
}

/// Loads connection parameters from the `[database]` table of a TOML file.
///
/// # Example
///
/// ```no_run
/// let params = scopedb::config::load_params("scopedb.toml")?;
/// println!("{:?}", params);
/// # Ok::<(), scopedb::core::DbError>(())
/// ```
pub fn load_params<P: AsRef<Path>>(path: P) -> Result<ConnectionParams> {
    let content = fs::read_to_string(path)?;
    parse_params(&content)
}

/// Parses connection parameters from TOML text.
pub fn parse_params(content: &str) -> Result<ConnectionParams> {
    let config: Config = toml::from_str(content).map_err(|e| DbError::Config(e.to_string()))?;
    Ok(config.database)
}
