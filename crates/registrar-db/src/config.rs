//! # Registrar Configuration
//!
//! Database location, pool sizing and the two tunable admission policies.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     REGISTRAR_DB_PATH=/var/lib/registrar/registrar.db                  │
//! │     REGISTRAR_ENROLLMENT_POLICY=strict                                 │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/registrar/registrar.toml (Linux)                         │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     lenient enrollment batches, skip absent grading                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "./registrar.db"
//! max_connections = 5
//!
//! [policy]
//! enrollment_batch = "lenient"   # lenient | strict
//! absent_grading = "skip"        # skip | reject
//! ```

use std::path::PathBuf;
use std::time::Duration;

use registrar_core::{AbsentGradingPolicy, BatchPolicy};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::pool::DbConfig;

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. `:memory:` gives a throwaway database.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("registrar.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_min_connections() -> u32 {
    1
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_idle_timeout() -> u64 {
    600
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

// =============================================================================
// Policy Settings
// =============================================================================

/// Admission behaviors that deployments disagree on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PolicySettings {
    /// What an enrollment batch does when one student is rejected.
    #[serde(default)]
    pub enrollment_batch: BatchPolicy,

    /// What grading an absent exam entry does.
    #[serde(default)]
    pub absent_grading: AbsentGradingPolicy,
}

// =============================================================================
// Main Configuration
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistrarConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub policy: PolicySettings,
}

impl RegistrarConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (registrar.toml), if it exists
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading registrar config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Platform config location, e.g. `~/.config/registrar/registrar.toml`.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("org", "registrar", "registrar")
            .map(|dirs| dirs.config_dir().join("registrar.toml"))
    }

    /// Applies `REGISTRAR_*` environment variables. Unparseable values are
    /// logged and ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("REGISTRAR_DB_PATH") {
            debug!(%path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(value) = std::env::var("REGISTRAR_MAX_CONNECTIONS") {
            match value.parse() {
                Ok(max) => self.database.max_connections = max,
                Err(_) => warn!(%value, "Invalid REGISTRAR_MAX_CONNECTIONS, ignoring"),
            }
        }

        if let Ok(value) = std::env::var("REGISTRAR_ENROLLMENT_POLICY") {
            match BatchPolicy::parse(&value) {
                Some(policy) => self.policy.enrollment_batch = policy,
                None => warn!(%value, "Invalid REGISTRAR_ENROLLMENT_POLICY, ignoring"),
            }
        }

        if let Ok(value) = std::env::var("REGISTRAR_ABSENT_GRADING") {
            match AbsentGradingPolicy::parse(&value) {
                Some(policy) => self.policy.absent_grading = policy,
                None => warn!(%value, "Invalid REGISTRAR_ABSENT_GRADING, ignoring"),
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let db = &self.database;
        if db.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }
        if db.max_connections == 0 {
            return Err(ConfigError::Invalid("database.max_connections must be at least 1".into()));
        }
        if db.min_connections > db.max_connections {
            return Err(ConfigError::Invalid(format!(
                "database.min_connections ({}) exceeds max_connections ({})",
                db.min_connections, db.max_connections
            )));
        }
        Ok(())
    }

    /// Pool settings for [`Database::new`](crate::Database::new).
    pub fn to_db_config(&self) -> DbConfig {
        let db = &self.database;
        if db.path.as_os_str() == ":memory:" {
            return DbConfig::in_memory().policy(self.policy);
        }
        DbConfig::new(&db.path)
            .max_connections(db.max_connections)
            .min_connections(db.min_connections)
            .connect_timeout(Duration::from_secs(db.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(db.idle_timeout_secs))
            .policy(self.policy)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = RegistrarConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.policy.enrollment_batch, BatchPolicy::Lenient);
        assert_eq!(config.policy.absent_grading, AbsentGradingPolicy::Skip);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: RegistrarConfig = toml::from_str(
            r#"
            [policy]
            enrollment_batch = "strict"
            "#,
        )
        .unwrap();

        assert_eq!(config.policy.enrollment_batch, BatchPolicy::Strict);
        assert_eq!(config.policy.absent_grading, AbsentGradingPolicy::Skip);
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_config_serialization_round_trip() {
        let mut config = RegistrarConfig::default();
        config.policy.absent_grading = AbsentGradingPolicy::Reject;

        let text = config.to_toml().unwrap();
        assert!(text.contains("absent_grading = \"reject\""));

        let parsed: RegistrarConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_min_above_max_is_rejected() {
        let mut config = RegistrarConfig::default();
        config.database.min_connections = 9;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_reads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registrar.toml");
        std::fs::write(&path, "[database]\nmax_connections = 3\n").unwrap();

        let config = RegistrarConfig::load(Some(path)).unwrap();
        assert!(config.database.max_connections >= 1);
    }

    #[test]
    fn test_memory_path_maps_to_single_connection() {
        let mut config = RegistrarConfig::default();
        config.database.path = PathBuf::from(":memory:");

        let db = config.to_db_config();
        assert!(db.is_in_memory());
        assert_eq!(db.max_connections, 1);
    }
}
