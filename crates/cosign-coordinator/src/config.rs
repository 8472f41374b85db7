//! # Coordinator Configuration
//!
//! Loaded from a YAML file, then overridden from the environment:
//!
//! | Variable | Field | Default |
//! |---|---|---|
//! | `COSIGN_EXPORT_DIR` | `export_dir` | `signed-contracts` |
//! | `COSIGN_SCHEMA_DIR` | `schema_dir` | built-in schema |
//! | `COSIGN_RECORD_OWN_APPROVAL` | `record_own_approval` | `false` |
//! | `COSIGN_NOTIFY_CAPACITY` | `notify_capacity` | `256` |
//!
//! Signing keys are not part of this file; see
//! [`Keyring::from_env`](cosign_crypto::Keyring::from_env).

use std::path::{Path, PathBuf};

use cosign_schema::{SchemaValidationError, SchemaValidator};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::DEFAULT_NOTIFY_CAPACITY;

/// Export directory override.
pub const EXPORT_DIR_ENV: &str = "COSIGN_EXPORT_DIR";
/// Schema directory override.
pub const SCHEMA_DIR_ENV: &str = "COSIGN_SCHEMA_DIR";
/// Own-approval recording override.
pub const RECORD_OWN_APPROVAL_ENV: &str = "COSIGN_RECORD_OWN_APPROVAL";
/// Store notification buffer override.
pub const NOTIFY_CAPACITY_ENV: &str = "COSIGN_NOTIFY_CAPACITY";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("cannot read config {path}: {source}")]
    Io {
        /// Config file path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The config file is not valid YAML for this structure.
    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// An environment override could not be parsed.
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// `notify_capacity` must be positive.
    #[error("notify_capacity must be at least 1")]
    ZeroCapacity,
}

/// Runtime settings for a [`CoordinatorService`](crate::service::CoordinatorService).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoordinatorConfig {
    /// Where exported contracts are written.
    pub export_dir: PathBuf,
    /// Directory of `*.schema.json` files; `None` uses the built-in schema.
    pub schema_dir: Option<PathBuf>,
    /// Write the local signature into the store on approve, instead of
    /// relying on the relay echoing it back.
    pub record_own_approval: bool,
    /// Per-subscriber buffer of the store change feed.
    pub notify_capacity: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            export_dir: PathBuf::from("signed-contracts"),
            schema_dir: None,
            record_own_approval: false,
            notify_capacity: DEFAULT_NOTIFY_CAPACITY,
        }
    }
}

impl CoordinatorConfig {
    /// Parse YAML. Missing fields take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.check()?;
        Ok(config)
    }

    /// Read and parse a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|var| std::env::var(var).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(dir) = lookup(EXPORT_DIR_ENV) {
            self.export_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup(SCHEMA_DIR_ENV) {
            self.schema_dir = Some(PathBuf::from(dir));
        }
        if let Some(raw) = lookup(RECORD_OWN_APPROVAL_ENV) {
            self.record_own_approval = parse_bool(RECORD_OWN_APPROVAL_ENV, &raw)?;
        }
        if let Some(raw) = lookup(NOTIFY_CAPACITY_ENV) {
            self.notify_capacity =
                raw.trim()
                    .parse()
                    .map_err(|e: std::num::ParseIntError| ConfigError::InvalidValue {
                        var: NOTIFY_CAPACITY_ENV,
                        value: raw.clone(),
                        reason: e.to_string(),
                    })?;
        }
        self.check()?;
        Ok(self)
    }

    /// The export validator this config selects.
    pub fn load_validator(&self) -> Result<SchemaValidator, SchemaValidationError> {
        match &self.schema_dir {
            Some(dir) => SchemaValidator::new(dir),
            None => SchemaValidator::builtin(),
        }
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.notify_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(())
    }
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var,
            value: raw.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}
