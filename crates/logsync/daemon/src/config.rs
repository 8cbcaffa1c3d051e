//! Configuration for logsync-daemon

use crate::error::{DaemonError, DaemonResult};
use logsync_types::Scope;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Cluster/namespace this instance syncs
    #[serde(default)]
    pub scope: ScopeConfig,

    /// Sync loop configuration
    #[serde(default)]
    pub syncer: SyncerConfig,

    /// Build engine connection
    #[serde(default)]
    pub engine: EngineConfig,

    /// Storage configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Scope configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeConfig {
    /// Cluster name
    #[serde(default = "default_cluster")]
    pub cluster: String,

    /// Namespace filter; unset means every namespace
    #[serde(default)]
    pub namespace: Option<String>,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            cluster: default_cluster(),
            namespace: None,
        }
    }
}

impl ScopeConfig {
    pub fn to_scope(&self) -> Scope {
        match &self.namespace {
            Some(ns) if !ns.is_empty() => Scope::namespace(self.cluster.clone(), ns.clone()),
            _ => Scope::cluster(self.cluster.clone()),
        }
    }
}

/// What to do with the rest of a cycle after a record fails to persist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistFailurePolicy {
    /// Log and move on to the next record
    #[default]
    Continue,

    /// Log and abandon the remaining records until the next tick
    Abort,
}

/// Sync loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncerConfig {
    /// Interval between sync cycles in seconds
    #[serde(default = "default_sync_interval")]
    pub sync_interval_secs: u64,

    /// Upper bound for the delay after repeated cycle failures, in seconds
    #[serde(default = "default_max_backoff")]
    pub max_backoff_secs: u64,

    /// Persist failure handling
    #[serde(default)]
    pub persist_failure_policy: PersistFailurePolicy,
}

impl Default for SyncerConfig {
    fn default() -> Self {
        Self {
            sync_interval_secs: default_sync_interval(),
            max_backoff_secs: default_max_backoff(),
            persist_failure_policy: PersistFailurePolicy::default(),
        }
    }
}

impl SyncerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }

    pub fn validate(&self) -> DaemonResult<()> {
        if self.sync_interval_secs == 0 {
            return Err(DaemonError::Config(
                "sync_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.max_backoff_secs < self.sync_interval_secs {
            return Err(DaemonError::Config(format!(
                "max_backoff_secs ({}) must not be below sync_interval_secs ({})",
                self.max_backoff_secs, self.sync_interval_secs
            )));
        }
        Ok(())
    }
}

/// Build engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EngineConfig {
    /// In-process engine (for development/testing)
    #[default]
    Memory,

    /// Engine reachable over HTTP
    Http {
        /// Base URL, e.g. `http://jenkins.p-ns:8080`
        base_url: String,

        /// Per-request timeout in seconds
        #[serde(default = "default_request_timeout")]
        request_timeout_secs: u64,
    },
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory storage
    Memory {
        /// JSON file with cluster pipelines, executions and log records
        #[serde(default)]
        seed_path: Option<String>,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Memory { seed_path: None }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_cluster() -> String {
    "local".to_string()
}

fn default_sync_interval() -> u64 {
    10
}

fn default_max_backoff() -> u64 {
    300
}

fn default_request_timeout() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration: defaults, then the optional file, then `LOGSYNC_*` env vars.
    ///
    /// Nested keys use a double underscore, e.g. `LOGSYNC_SYNCER__SYNC_INTERVAL_SECS`.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("LOGSYNC")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
