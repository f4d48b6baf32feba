//! Event handler for Claude Code hooks.
//!
//! Reads one JSON payload from stdin, loads the session's state file, applies
//! the event and saves it back. Every failure comes back as a `HandleError`;
//! `main` logs it and still exits 0 so the host is never blocked.
//!
//! ## State Machine
//!
//! ```text
//! UserPromptSubmit   → thinking
//! PermissionRequest  → permission
//! PostToolUse        → thinking   (AskUserQuestion marks a pending question)
//! Stop               → question | complete
//! SubagentStop       → unchanged
//! PreCompact         → unchanged
//! ```

use std::env;
use std::io::{self, Read};

use pulse_core::clock::unix_now;
use pulse_core::{apply_event, HookConfig, HookInput, PulseError, StatsStore};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HandleError {
    #[error("Failed to read stdin: {0}")]
    Stdin(#[source] io::Error),

    #[error("Failed to parse hook input: {0}")]
    InvalidInput(#[source] serde_json::Error),

    #[error(transparent)]
    Store(#[from] PulseError),
}

pub fn run(config: &HookConfig) -> Result<(), HandleError> {
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .map_err(HandleError::Stdin)?;

    handle_payload(&input, config, unix_now())
}

fn handle_payload(payload: &str, config: &HookConfig, now: f64) -> Result<(), HandleError> {
    if payload.trim().is_empty() {
        tracing::debug!("Empty hook payload, nothing to do");
        return Ok(());
    }

    let hook_input: HookInput =
        serde_json::from_str(payload).map_err(HandleError::InvalidInput)?;

    handle_hook_input(&hook_input, config, now)
}

fn handle_hook_input(hook_input: &HookInput, config: &HookConfig, now: f64) -> Result<(), HandleError> {
    let process_cwd = env::current_dir()
        .ok()
        .map(|p| p.to_string_lossy().into_owned());
    let cwd = hook_input
        .resolve_cwd(process_cwd.as_deref())
        .unwrap_or_default();

    let event = hook_input.to_event();
    tracing::debug!(event = %event.name(), cwd = %cwd, "Hook event");

    let store = StatsStore::for_session(&config.storage, config.session_id.as_deref(), &cwd);
    let mut state = store.load();
    tracing::debug!(
        state_before = %state.state,
        file = %store.path().display(),
        "Loaded session state"
    );

    apply_event(&mut state, &event, now);
    tracing::debug!(state_after = %state.state, "Applied event");

    store.save_at(&mut state, now)?;
    tracing::debug!(file = %store.path().display(), "Saved session state");

    Ok(())
}
