//! File-backed session state persistence.
//!
//! One JSON file per session identity, rewritten in full by every hook
//! invocation (see [`crate::storage::StorageConfig::stats_file`]).
//!
//! # Defensive Loading
//!
//! Another invocation may be mid-write, or a crash may have left garbage:
//! - Missing file (return defaults)
//! - Empty file (return defaults)
//! - Corrupt or truncated JSON (return defaults, log)
//! - Missing fields (serde defaults)
//!
//! # Atomic Writes
//!
//! Saves write a temp file in the target's directory, named after the current
//! PID, then rename it over the target. Readers see either the old document or
//! the new one. There is no lock: concurrent writers race and the last rename
//! wins.

use std::io::Write;
use std::path::{Path, PathBuf};

use fs_err as fs;
use tempfile::Builder;

use super::identity::SessionIdentity;
use super::types::{EventDetails, HistoryEntry, SessionState, MAX_EVENT_HISTORY};
use crate::clock::unix_now;
use crate::error::{PulseError, Result};
use crate::storage::StorageConfig;

/// Load/save access to one session's state file.
#[derive(Debug, Clone)]
pub struct StatsStore {
    file_path: PathBuf,
}

impl StatsStore {
    pub fn new(file_path: &Path) -> Self {
        StatsStore {
            file_path: file_path.to_path_buf(),
        }
    }

    /// Store for `session_id` (if set) or the hash of `cwd`.
    pub fn for_session(storage: &StorageConfig, session_id: Option<&str>, cwd: &str) -> Self {
        let identity = SessionIdentity::resolve(session_id, cwd);
        StatsStore {
            file_path: storage.stats_file(&identity),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Reads the state, substituting defaults for anything unreadable.
    pub fn load(&self) -> SessionState {
        let content = match fs::read_to_string(&self.file_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return SessionState::default();
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read state file, using defaults");
                return SessionState::default();
            }
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %self.file_path.display(), "Empty state file, using defaults");
            return SessionState::default();
        }

        match serde_json::from_str::<SessionState>(&content) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(
                    path = %self.file_path.display(),
                    error = %e,
                    "Failed to parse state file, using defaults"
                );
                SessionState::default()
            }
        }
    }

    /// Stamps `last_updated` and atomically replaces the state file.
    pub fn save(&self, state: &mut SessionState) -> Result<()> {
        self.save_at(state, unix_now())
    }

    pub fn save_at(&self, state: &mut SessionState, now: f64) -> Result<()> {
        state.last_updated = Some(now);

        let content = serde_json::to_string(state).map_err(|e| PulseError::Json {
            context: "serializing session state".to_string(),
            source: e,
        })?;

        let parent_dir = self
            .file_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent_dir).map_err(|e| PulseError::Io {
            context: format!("creating state directory {}", parent_dir.display()),
            source: e,
        })?;

        let mut temp_file = Builder::new()
            .prefix(&self.temp_prefix())
            .suffix(".tmp")
            .tempfile_in(parent_dir)
            .map_err(|e| PulseError::Io {
                context: format!("creating temp file in {}", parent_dir.display()),
                source: e,
            })?;

        // On error below, dropping `temp_file` removes it.
        temp_file
            .write_all(content.as_bytes())
            .map_err(|e| PulseError::Io {
                context: format!("writing temp file for {}", self.file_path.display()),
                source: e,
            })?;
        temp_file.flush().map_err(|e| PulseError::Io {
            context: format!("flushing temp file for {}", self.file_path.display()),
            source: e,
        })?;

        if let Err(e) = temp_file.persist(&self.file_path) {
            let source = e.error;
            if let Err(cleanup) = e.file.close() {
                tracing::debug!(error = %cleanup, "Failed to remove temp state file");
            }
            return Err(PulseError::Persist {
                path: self.file_path.clone(),
                source,
            });
        }

        Ok(())
    }

    /// Deletes the state file. A file that is already gone is not an error.
    pub fn remove(&self) -> Result<bool> {
        match fs::remove_file(&self.file_path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(PulseError::Io {
                context: format!("removing {}", self.file_path.display()),
                source: e,
            }),
        }
    }

    /// `.pulse-stats-<id>.json.<pid>.` so leftovers are attributable to a process.
    fn temp_prefix(&self) -> String {
        let file_name = self
            .file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "state".to_string());
        format!(".{}.{}.", file_name, std::process::id())
    }
}

/// Records `event` with the current phase as `state_before`, then trims the
/// history to the newest [`MAX_EVENT_HISTORY`] entries.
///
/// Must run before the event mutates `state.state`.
pub fn append_history(
    state: &mut SessionState,
    event: &str,
    details: Option<EventDetails>,
    now: f64,
) {
    state.event_history.push(HistoryEntry {
        ts: now,
        event: event.to_string(),
        state_before: state.state,
        details,
    });

    let len = state.event_history.len();
    if len > MAX_EVENT_HISTORY {
        state.event_history.drain(..len - MAX_EVENT_HISTORY);
    }
}
