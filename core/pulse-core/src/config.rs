//! Environment-driven configuration for the hook process.
//!
//! Read once at startup. The session id only changes which file is used,
//! never how events are interpreted.

use std::path::PathBuf;

use crate::storage::StorageConfig;

/// Explicit session identity.
pub const SESSION_ID_ENV: &str = "PULSE_SESSION_ID";
/// Overrides the state root (default `/tmp`).
pub const STATE_DIR_ENV: &str = "PULSE_STATE_DIR";
/// `EnvFilter` directive for the diagnostic log.
pub const LOG_FILTER_ENV: &str = "PULSE_LOG";

pub const DEFAULT_LOG_FILTER: &str = "debug";

#[derive(Debug, Clone)]
pub struct HookConfig {
    pub session_id: Option<String>,
    pub storage: StorageConfig,
    pub log_filter: String,
}

impl HookConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let storage = match get(STATE_DIR_ENV) {
            Some(dir) => StorageConfig::with_root(PathBuf::from(dir)),
            None => StorageConfig::default(),
        };

        HookConfig {
            session_id: get(SESSION_ID_ENV),
            storage,
            log_filter: get(LOG_FILTER_ENV).unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        }
    }

    pub fn with_storage(storage: StorageConfig) -> Self {
        HookConfig {
            session_id: None,
            storage,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }

    /// Session log path, only when an explicit session id is configured.
    pub fn hook_log_file(&self) -> Option<PathBuf> {
        self.session_id
            .as_deref()
            .map(|id| self.storage.hook_log_file(id))
    }
}
