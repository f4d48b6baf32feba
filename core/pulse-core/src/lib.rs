//! # pulse-core
//!
//! Core library for pulse: the per-session state record that answers "what is
//! the assistant doing right now", the interpreter that advances it one hook
//! event at a time, and the file store that persists it between invocations.
//!
//! ## Design Principles
//!
//! - **Synchronous**: No async runtime. Each hook invocation is one short process.
//! - **Stateless workers**: The state file is the only thing shared between invocations.
//! - **Graceful degradation**: Missing or corrupt state loads as defaults, never an error.
//! - **Errors are values**: Only the hook binary decides to swallow them.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pulse_core::{apply_event, HookConfig, HookInput, StatsStore};
//!
//! let config = HookConfig::from_env();
//! let input: HookInput = serde_json::from_str(payload)?;
//! let store = StatsStore::for_session(&config.storage, config.session_id.as_deref(), cwd);
//! let mut state = store.load();
//! apply_event(&mut state, &input.to_event(), pulse_core::clock::unix_now());
//! store.save(&mut state)?;
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod setup;
pub mod state;
pub mod storage;

pub use config::HookConfig;
pub use error::{PulseError, Result};
pub use setup::{HookInstaller, InstallOutcome};
pub use state::{
    append_history, apply_event, EventDetails, HistoryEntry, HookEvent, HookInput, Phase,
    SessionIdentity, SessionState, StatsStore, MAX_EVENT_HISTORY,
};
pub use storage::StorageConfig;
