//! Kernel configuration loaded from YAML.
//!
//! ```yaml
//! observability:
//!   log_backend: jsonl          # memory (default) or jsonl
//!   log_path: logs/events.jsonl # required for jsonl
//! execution:
//!   enable_runtimes: [callable, http]  # omitted = every built-in runtime
//! policy_files:
//!   - policies/base.yaml        # omitted = no policy engine
//! specs:
//!   - id: "tool:http_get"
//!     name: HTTP get
//!     kind: tool
//!     runtime: http
//! ```
//!
//! Relative paths are resolved against the directory holding the config
//! file.

use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::policy::PolicyLoadError;
use crate::ports::FileSystem;
use crate::registry::{RegistryError, Spec};

/// File name looked up in the working directory when nothing else is given.
pub const DEFAULT_CONFIG_FILE: &str = "capgate.yaml";
/// Environment variable overriding the config path.
pub const CONFIG_ENV: &str = "CAPGATE_CONFIG";

/// Event backend keeping events for the life of the process.
pub const MEMORY_BACKEND: &str = "memory";
/// Event backend appending JSON lines to `log_path`.
pub const JSONL_BACKEND: &str = "jsonl";

/// Errors raised while loading configuration or booting a kernel from it.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {message}")]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying error text.
        message: String,
    },
    /// The config file is not valid YAML for [`KernelConfig`].
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    /// `enable_runtimes` names a runtime that is not built in.
    #[error("unknown runtime '{0}' in execution.enable_runtimes")]
    UnknownRuntime(String),
    /// `log_backend` is neither `memory` nor `jsonl`.
    #[error("unknown log backend '{0}' (expected 'memory' or 'jsonl')")]
    UnknownLogBackend(String),
    /// The jsonl backend was selected without a path.
    #[error("observability.log_path is required for the jsonl backend")]
    MissingLogPath,
    /// The event log could not be opened.
    #[error("failed to open event log {path}: {message}")]
    EventLog {
        /// Log file.
        path: PathBuf,
        /// Underlying error text.
        message: String,
    },
    /// A policy file failed to load.
    #[error(transparent)]
    Policy(#[from] PolicyLoadError),
    /// Two specs in the manifest share an id.
    #[error(transparent)]
    DuplicateSpec(#[from] RegistryError),
}

/// Where events go.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObservabilityConfig {
    /// `memory` or `jsonl`.
    #[serde(default = "default_log_backend")]
    pub log_backend: String,
    /// File for the jsonl backend.
    #[serde(default)]
    pub log_path: Option<PathBuf>,
}

fn default_log_backend() -> String {
    MEMORY_BACKEND.to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_backend: default_log_backend(),
            log_path: None,
        }
    }
}

/// Which built-in runtimes are registered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExecutionConfig {
    /// Runtime names to enable; `None` enables all of them.
    #[serde(default)]
    pub enable_runtimes: Option<Vec<String>>,
}

/// Everything needed to boot a [`Kernel`](crate::kernel::Kernel).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KernelConfig {
    /// Event log settings.
    #[serde(default)]
    pub observability: ObservabilityConfig,
    /// Runtime settings.
    #[serde(default)]
    pub execution: ExecutionConfig,
    /// Policy files merged in order. Empty means no policy engine.
    #[serde(default)]
    pub policy_files: Vec<PathBuf>,
    /// Specs registered at boot.
    #[serde(default)]
    pub specs: Vec<Spec>,
}

impl KernelConfig {
    /// Parses a config document without resolving paths.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed YAML.
    pub fn from_yaml_str(document: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(document)?)
    }

    /// Reads a config file through `fs` and resolves its relative paths
    /// against the file's directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(fs: &dyn FileSystem, path: &Path) -> Result<Self, ConfigError> {
        let document = fs.read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let config = Self::from_yaml_str(&document)?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(config.resolve_relative_to(base))
    }

    /// Rewrites relative policy and log paths to sit under `base`.
    #[must_use]
    pub fn resolve_relative_to(mut self, base: &Path) -> Self {
        let resolve = |p: PathBuf| if p.is_relative() { base.join(p) } else { p };
        self.policy_files = self.policy_files.into_iter().map(resolve).collect();
        self.observability.log_path = self.observability.log_path.map(resolve);
        self
    }
}

/// Path to load when none is given on the command line.
///
/// `CAPGATE_CONFIG` wins; otherwise `capgate.yaml` in the working
/// directory.
#[must_use]
pub fn default_config_path() -> PathBuf {
    env::var_os(CONFIG_ENV).map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from)
}
