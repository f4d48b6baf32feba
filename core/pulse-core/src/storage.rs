//! Storage configuration and path management for pulse.
//!
//! `StorageConfig` owns every path decision:
//!
//! - State files: `<root>/pulse-stats-<identity>.json`, one per session
//! - Diagnostic logs: `<root>/pulse-<session_id>/hooks.log`
//! - Host settings: `<claude_root>/settings.json` (hook registration only)
//!
//! Production code uses `StorageConfig::default()` (root `/tmp`, Claude root
//! `~/.claude`). Tests inject temp directories with `with_root`/`with_roots`.
//! Without a home directory there is no Claude root, and asking for the
//! settings file fails with [`PulseError::HomeDirNotFound`].

use std::path::{Path, PathBuf};

use crate::error::{PulseError, Result};
use crate::state::SessionIdentity;

/// Default root for state files. Fixed rather than `$TMPDIR` so that the hook
/// and a reader in a different environment agree on the location.
pub const DEFAULT_STATE_ROOT: &str = "/tmp";

const STATS_FILE_PREFIX: &str = "pulse-stats-";
const SESSION_DIR_PREFIX: &str = "pulse-";
const HOOK_LOG_FILE: &str = "hooks.log";

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory holding state files and per-session log directories.
    root: PathBuf,
    /// Root directory for the host's own data (default: ~/.claude).
    claude_root: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_STATE_ROOT),
            claude_root: dirs::home_dir().map(|home| home.join(".claude")),
        }
    }
}

impl StorageConfig {
    /// Custom state root; the Claude root keeps its default.
    pub fn with_root(root: PathBuf) -> Self {
        Self {
            root,
            ..Self::default()
        }
    }

    pub fn with_roots(root: PathBuf, claude_root: PathBuf) -> Self {
        Self {
            root,
            claude_root: Some(claude_root),
        }
    }

    /// Custom state root and no Claude root, as when `$HOME` cannot be found.
    pub fn without_claude_root(root: PathBuf) -> Self {
        Self {
            root,
            claude_root: None,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn claude_root(&self) -> Option<&Path> {
        self.claude_root.as_deref()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Session Files
    // ─────────────────────────────────────────────────────────────────────────────

    /// Path of the state file for a resolved session identity.
    pub fn stats_file(&self, identity: &SessionIdentity) -> PathBuf {
        self.root
            .join(format!("{}{}.json", STATS_FILE_PREFIX, identity.key()))
    }

    /// Per-session directory for diagnostics.
    pub fn session_dir(&self, session_id: &str) -> PathBuf {
        self.root.join(format!(
            "{}{}",
            SESSION_DIR_PREFIX,
            SessionIdentity::sanitize(session_id)
        ))
    }

    pub fn hook_log_file(&self, session_id: &str) -> PathBuf {
        self.session_dir(session_id).join(HOOK_LOG_FILE)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Host Paths
    // ─────────────────────────────────────────────────────────────────────────────

    /// The host's settings file, where hook commands are registered.
    pub fn claude_settings_file(&self) -> Result<PathBuf> {
        self.claude_root
            .as_ref()
            .map(|root| root.join("settings.json"))
            .ok_or(PulseError::HomeDirNotFound)
    }
}
