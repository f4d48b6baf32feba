//! Session State Tracking
//!
//! Keeps one durable record per session describing what the assistant is
//! doing right now.
//!
//! # Architecture: One Process Per Event
//!
//! ```text
//! Host → pulse-hook handle → load → apply_event → save → exit
//!          (stdin payload)     └──── state file ────┘
//!                                        ↑
//!                              status bar (reader)
//! ```
//!
//! Nothing survives between invocations except the state file. Concurrent
//! invocations for the same session race on it; atomic rename guarantees every
//! reader sees a complete document and the last writer wins.
//!
//! # Module Structure
//!
//! - [`identity`]: session id or cwd hash → file key
//! - [`store`]: load-or-default, atomic save, bounded history append
//! - [`transition`]: the event interpreter
//! - [`types`]: the persisted record and the hook payload schema

mod identity;
mod store;
mod transition;
pub(crate) mod types;


pub use identity::{SessionIdentity, CWD_HASH_LEN};
pub use store::{append_history, StatsStore};
pub use transition::apply_event;
pub use types::{
    EventDetails, HistoryEntry, HookEvent, HookInput, Phase, SessionState, MAX_EVENT_HISTORY,
    QUESTION_TOOL, UNKNOWN_TOOL,
};
