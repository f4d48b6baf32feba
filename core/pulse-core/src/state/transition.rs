//! Applies one hook event to a loaded session state.
//!
//! No I/O and no error path: the caller loads, calls [`apply_event`], saves.
//! Every event, recognized or not, appends exactly one history entry before
//! anything else is mutated.
//!
//! ```text
//! UserPromptSubmit   → thinking     prompts+1, clears pending_question/idle_since
//! PermissionRequest  → permission
//! PostToolUse        → thinking     tools[name]+1, timestamp; AskUserQuestion sets pending_question
//! Stop               → question     if pending_question (cleared), else complete; idle_since=now
//! SubagentStop       → (unchanged)  subagent_messages+1
//! PreCompact         → (unchanged)  compressions+1
//! other              → (unchanged)  history marked unhandled
//! ```

use serde_json::Value;

use super::store::append_history;
use super::types::{EventDetails, HookEvent, Phase, SessionState, QUESTION_TOOL};

pub fn apply_event(state: &mut SessionState, event: &HookEvent, now: f64) {
    append_history(state, event.name(), history_details(state, event), now);

    match event {
        HookEvent::UserPromptSubmit => {
            state.prompts = state.prompts.saturating_add(1);
            state.state = Phase::Thinking;
            state.pending_question = false;
            state.idle_since = None;
        }

        HookEvent::PermissionRequest { .. } => {
            state.state = Phase::Permission;
        }

        HookEvent::PostToolUse { tool_name } => {
            let count = state.tools.entry(tool_name.clone()).or_insert(0);
            *count = count.saturating_add(1);
            state.tool_timestamps.push(now);
            if tool_name == QUESTION_TOOL {
                state.pending_question = true;
            }
            // More tools may follow before the turn ends
            state.state = Phase::Thinking;
        }

        HookEvent::Stop => {
            state.completions = state.completions.saturating_add(1);
            state.state = if state.pending_question {
                Phase::Question
            } else {
                Phase::Complete
            };
            state.pending_question = false;
            state.idle_since = Some(now);
        }

        HookEvent::SubagentStop => {
            state.subagent_messages = state.subagent_messages.saturating_add(1);
        }

        HookEvent::PreCompact => {
            state.compressions = state.compressions.saturating_add(1);
        }

        HookEvent::Unknown { event_name } => {
            tracing::debug!(event_name = %event_name, "Unhandled event");
        }
    }
}

/// Details captured alongside the history entry, read before mutation.
fn history_details(state: &SessionState, event: &HookEvent) -> Option<EventDetails> {
    let (key, value) = match event {
        HookEvent::PermissionRequest { tool_name } | HookEvent::PostToolUse { tool_name } => {
            ("tool", Value::from(tool_name.as_str()))
        }
        HookEvent::Stop => ("pending_question", Value::from(state.pending_question)),
        HookEvent::Unknown { .. } => ("unhandled", Value::from(true)),
        HookEvent::UserPromptSubmit | HookEvent::SubagentStop | HookEvent::PreCompact => {
            return None
        }
    };
    Some(EventDetails::from([(key.to_string(), value)]))
}
