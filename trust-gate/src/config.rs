//! Configuration for content-trust-gate

use decision_store::DecisionStoreConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use verdict::{PolicyVersion, DEFAULT_POLICY_VERSION};

use crate::error::GateError;

/// Config file name inside the storage directory
pub const CONFIG_FILE: &str = "config.toml";

/// Default storage directory
pub fn default_storage_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("content-trust-gate")
}

/// Where decisions and gate logs live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// SQLite file under the storage directory
    Sqlite,
    /// Process memory only, lost on exit
    Memory,
}

/// Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Ruleset tag stamped on new decisions
    #[serde(default = "default_policy_version")]
    pub policy_version: String,

    /// Storage directory for the decision database
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    #[serde(default = "default_backend")]
    pub backend: Backend,

    /// Per storage operation; expiry counts as a persistence failure
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,

    /// Capacity of the buffered audit channel
    #[serde(default = "default_audit_buffer")]
    pub audit_buffer: usize,

    /// Decisions kept in memory after a failed insert (0 = disabled)
    #[serde(default = "default_fallback_cache_size")]
    pub fallback_cache_size: usize,

    /// How long the publish flow remembers a non-PASS result per post
    #[serde(default = "default_publish_memo_ttl_secs")]
    pub publish_memo_ttl_secs: u64,
}

fn default_policy_version() -> String {
    DEFAULT_POLICY_VERSION.to_string()
}

fn default_backend() -> Backend {
    Backend::Sqlite
}

fn default_store_timeout_ms() -> u64 {
    2000
}

fn default_audit_buffer() -> usize {
    1024
}

fn default_fallback_cache_size() -> usize {
    1024
}

fn default_publish_memo_ttl_secs() -> u64 {
    3600
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            policy_version: default_policy_version(),
            storage_dir: default_storage_dir(),
            backend: Backend::Sqlite,
            store_timeout_ms: 2000,
            audit_buffer: 1024,
            fallback_cache_size: 1024,
            publish_memo_ttl_secs: 3600,
        }
    }
}

impl GateConfig {
    /// Load config from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GateError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| GateError::Config(e.to_string()))
    }

    /// Save config to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), GateError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| GateError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the gate cannot run with.
    pub fn validate(&self) -> Result<(), GateError> {
        self.policy()?;
        if self.store_timeout_ms == 0 {
            return Err(GateError::Config(
                "store_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.audit_buffer == 0 {
            return Err(GateError::Config(
                "audit_buffer must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn policy(&self) -> Result<PolicyVersion, GateError> {
        PolicyVersion::new(self.policy_version.clone()).map_err(|e| GateError::Config(e.to_string()))
    }

    pub fn store_config(&self) -> Result<DecisionStoreConfig, GateError> {
        Ok(DecisionStoreConfig {
            policy_version: self.policy()?,
            op_timeout: Duration::from_millis(self.store_timeout_ms),
            fallback_capacity: self.fallback_cache_size,
        })
    }

    pub fn publish_memo_ttl(&self) -> Duration {
        Duration::from_secs(self.publish_memo_ttl_secs)
    }

    /// Get decision database path
    pub fn db_path(&self) -> PathBuf {
        self.storage_dir.join(decision_store::db::DB_FILE)
    }

    /// Get config file path
    pub fn config_path(&self) -> PathBuf {
        self.storage_dir.join(CONFIG_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GateConfig::default();
        assert_eq!(config.policy_version, "2026.01");
        assert_eq!(config.backend, Backend::Sqlite);
        assert_eq!(config.store_timeout_ms, 2000);
        assert!(config.storage_dir.ends_with("content-trust-gate"));
        assert!(config.db_path().ends_with("content-trust-gate.db"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: GateConfig = toml::from_str(
            r#"
            policy_version = "2026.02"
            backend = "memory"
            "#,
        )
        .unwrap();

        assert_eq!(config.policy_version, "2026.02");
        assert_eq!(config.backend, Backend::Memory);
        assert_eq!(config.audit_buffer, 1024);
        assert_eq!(config.publish_memo_ttl_secs, 3600);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        let config = GateConfig {
            storage_dir: dir.path().to_path_buf(),
            fallback_cache_size: 8,
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = GateConfig::load(&path).unwrap();
        assert_eq!(loaded.storage_dir, dir.path());
        assert_eq!(loaded.fallback_cache_size, 8);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let empty_policy = GateConfig {
            policy_version: String::new(),
            ..Default::default()
        };
        assert!(matches!(empty_policy.validate(), Err(GateError::Config(_))));

        let zero_timeout = GateConfig {
            store_timeout_ms: 0,
            ..Default::default()
        };
        assert!(zero_timeout.validate().is_err());

        let zero_buffer = GateConfig {
            audit_buffer: 0,
            ..Default::default()
        };
        assert!(zero_buffer.validate().is_err());
    }

    #[test]
    fn test_store_config() {
        let config = GateConfig {
            store_timeout_ms: 250,
            ..Default::default()
        };
        let store = config.store_config().unwrap();
        assert_eq!(store.op_timeout, Duration::from_millis(250));
        assert_eq!(store.policy_version.as_str(), "2026.01");
    }
}
