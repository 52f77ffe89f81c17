//! Optional YAML configuration for the CLI.
//!
//! # Example YAML
//!
//! ```yaml
//! database: /var/lib/registry/students.db
//! log_filter: student_registry_sqlite=debug
//! ```
//!
//! Command-line flags win over the file, and the file wins over the
//! built-in defaults. `RUST_LOG`, when set, wins over `log_filter`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Database used when neither `--db` nor the config names one.
pub const DEFAULT_DATABASE: &str = "students.db";

/// Log filter used when neither `RUST_LOG` nor the config sets one.
pub const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Path of the SQLite database file.
    pub database: Option<PathBuf>,
    /// `tracing_subscriber::EnvFilter` directive string.
    pub log_filter: Option<String>,
}

impl CliConfig {
    /// Loads configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config '{}': {e}", path.display()))?;
        Self::parse(&raw).map_err(|e| format!("Invalid config '{}': {e}", path.display()))
    }

    /// Parses configuration from YAML text. An empty document is the default.
    pub fn parse(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    /// Loads the file when a path is given, otherwise returns the defaults.
    pub fn load_optional(path: Option<&Path>) -> Result<Self, String> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Picks the database path: flag, then config, then the default.
    pub fn database_path(&self, flag: Option<&Path>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.database.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE))
    }

    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}
