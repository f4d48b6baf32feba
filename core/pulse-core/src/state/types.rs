//! Serialized state types used by the hook/state pipeline.
//!
//! The state file is a flat JSON object. Missing fields take their defaults on
//! load so older or hand-edited files still parse.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Maximum number of entries kept in `SessionState::event_history`.
pub const MAX_EVENT_HISTORY: usize = 100;

/// Tool whose use marks the turn as ending on an open question.
pub const QUESTION_TOOL: &str = "AskUserQuestion";

/// Substituted when a tool event carries no `tool_name`.
pub const UNKNOWN_TOOL: &str = "unknown";

/// Free-form details attached to a history entry.
pub type EventDetails = BTreeMap<String, Value>;

// -----------------------------------------------------------------------------
// Hook → phase mapping (implemented in state/transition.rs)
//
// UserPromptSubmit   -> thinking
// PermissionRequest  -> permission
// PostToolUse        -> thinking   (AskUserQuestion sets pending_question)
// Stop               -> question if pending_question, else complete
// SubagentStop       -> no phase change
// PreCompact         -> no phase change
// anything else      -> no phase change, history marked unhandled
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Nothing has happened yet.
    #[default]
    Ready,
    /// Actively processing.
    Thinking,
    /// Blocked on a permission decision.
    Permission,
    /// Turn ended with a question to the user.
    Question,
    /// Turn ended without a pending question.
    Complete,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Ready => "ready",
            Phase::Thinking => "thinking",
            Phase::Permission => "permission",
            Phase::Question => "question",
            Phase::Complete => "complete",
        }
    }

}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One processed event. `state_before` is the phase prior to applying it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub ts: f64,
    pub event: String,
    #[serde(default)]
    pub state_before: Phase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<EventDetails>,
}

impl HistoryEntry {
    /// True when the event name was not recognized by the interpreter.
    pub fn is_unhandled(&self) -> bool {
        self.details
            .as_ref()
            .and_then(|d| d.get("unhandled"))
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}

/// The durable per-session record.
///
/// `event_history` is capped at [`MAX_EVENT_HISTORY`]. `tool_timestamps` grows
/// for the life of the session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    pub prompts: u64,
    pub completions: u64,
    pub subagent_messages: u64,
    pub compressions: u64,
    pub tools: BTreeMap<String, u64>,
    pub tool_timestamps: Vec<f64>,
    pub state: Phase,
    pub pending_question: bool,
    pub idle_since: Option<f64>,
    pub last_updated: Option<f64>,
    pub event_history: Vec<HistoryEntry>,
}

impl SessionState {
    pub fn total_tool_calls(&self) -> u64 {
        self.tools.values().sum()
    }

    /// Top `n` tools by count, ties broken by name.
    pub fn top_tools(&self, n: usize) -> Vec<(&str, u64)> {
        let mut sorted: Vec<_> = self.tools.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        sorted.truncate(n);
        sorted
    }

    /// Seconds since the assistant went idle, if it is idle.
    pub fn idle_seconds(&self, now: f64) -> Option<f64> {
        self.idle_since.map(|since| (now - since).max(0.0))
    }
}

/// Host payload, one JSON object per invocation.
///
/// Every field is optional; accessors apply the defaults. A field holding a
/// non-string value counts as absent. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HookInput {
    #[serde(default, deserialize_with = "string_or_absent")]
    pub hook_event_name: Option<String>,
    #[serde(default, deserialize_with = "string_or_absent")]
    pub cwd: Option<String>,
    #[serde(default, deserialize_with = "string_or_absent")]
    pub tool_name: Option<String>,
}

fn string_or_absent<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Ok(Some(s)),
        _ => Ok(None),
    }
}

impl HookInput {
    /// Event name, `""` when absent.
    pub fn event_name(&self) -> &str {
        self.hook_event_name.as_deref().unwrap_or("")
    }

    /// Tool name, [`UNKNOWN_TOOL`] when absent.
    pub fn tool_name(&self) -> &str {
        self.tool_name.as_deref().unwrap_or(UNKNOWN_TOOL)
    }

    /// Payload cwd, else `fallback` (normally the process working directory).
    /// Only an absent cwd falls back; `""` is a cwd like any other.
    pub fn resolve_cwd(&self, fallback: Option<&str>) -> Option<String> {
        self.cwd.as_deref().or(fallback).map(str::to_string)
    }

    pub fn to_event(&self) -> HookEvent {
        HookEvent::from_name(self.event_name(), self.tool_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookEvent {
    UserPromptSubmit,
    PermissionRequest { tool_name: String },
    PostToolUse { tool_name: String },
    Stop,
    SubagentStop,
    PreCompact,
    Unknown { event_name: String },
}

impl HookEvent {
    pub fn from_name(event_name: &str, tool_name: &str) -> Self {
        match event_name {
            "UserPromptSubmit" => HookEvent::UserPromptSubmit,
            "PermissionRequest" => HookEvent::PermissionRequest {
                tool_name: tool_name.to_string(),
            },
            "PostToolUse" => HookEvent::PostToolUse {
                tool_name: tool_name.to_string(),
            },
            "Stop" => HookEvent::Stop,
            "SubagentStop" => HookEvent::SubagentStop,
            "PreCompact" => HookEvent::PreCompact,
            other => HookEvent::Unknown {
                event_name: other.to_string(),
            },
        }
    }

    /// Name as recorded in history.
    pub fn name(&self) -> &str {
        match self {
            HookEvent::UserPromptSubmit => "UserPromptSubmit",
            HookEvent::PermissionRequest { .. } => "PermissionRequest",
            HookEvent::PostToolUse { .. } => "PostToolUse",
            HookEvent::Stop => "Stop",
            HookEvent::SubagentStop => "SubagentStop",
            HookEvent::PreCompact => "PreCompact",
            HookEvent::Unknown { event_name } => event_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_state_serializes_flat_with_nulls() {
        let value = serde_json::to_value(SessionState::default()).unwrap();
        assert_eq!(
            value,
            json!({
                "prompts": 0,
                "completions": 0,
                "subagent_messages": 0,
                "compressions": 0,
                "tools": {},
                "tool_timestamps": [],
                "state": "ready",
                "pending_question": false,
                "idle_since": null,
                "last_updated": null,
                "event_history": [],
            })
        );
    }

    #[test]
    fn test_partial_document_fills_defaults() {
        let state: SessionState =
            serde_json::from_str(r#"{"prompts": 3, "state": "thinking"}"#).unwrap();
        assert_eq!(state.prompts, 3);
        assert_eq!(state.state, Phase::Thinking);
        assert!(state.tools.is_empty());
        assert!(state.event_history.is_empty());
    }

    #[test]
    fn test_history_entry_omits_absent_details() {
        let entry = HistoryEntry {
            ts: 1.5,
            event: "SubagentStop".to_string(),
            state_before: Phase::Thinking,
            details: None,
        };
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({"ts": 1.5, "event": "SubagentStop", "state_before": "thinking"})
        );
    }

    #[test]
    fn test_unknown_phase_string_is_rejected() {
        let result = serde_json::from_str::<SessionState>(r#"{"state": "working"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_top_tools_orders_by_count_then_name() {
        let mut state = SessionState::default();
        state.tools.insert("Read".to_string(), 3);
        state.tools.insert("Edit".to_string(), 3);
        state.tools.insert("Bash".to_string(), 5);
        state.tools.insert("Grep".to_string(), 1);

        assert_eq!(
            state.top_tools(3),
            vec![("Bash", 5), ("Edit", 3), ("Read", 3)]
        );
        assert_eq!(state.total_tool_calls(), 12);
    }

    #[test]
    fn test_idle_seconds() {
        let mut state = SessionState::default();
        assert_eq!(state.idle_seconds(100.0), None);
        state.idle_since = Some(40.0);
        assert_eq!(state.idle_seconds(100.0), Some(60.0));
        // Clock skew never yields a negative duration
        assert_eq!(state.idle_seconds(10.0), Some(0.0));
    }

    #[test]
    fn test_hook_input_defaults() {
        let input: HookInput = serde_json::from_str("{}").unwrap();
        assert_eq!(input.event_name(), "");
        assert_eq!(input.tool_name(), UNKNOWN_TOOL);
        assert_eq!(
            input.to_event(),
            HookEvent::Unknown {
                event_name: String::new()
            }
        );
    }

    #[test]
    fn test_hook_input_ignores_extra_fields() {
        let input: HookInput = serde_json::from_str(
            r#"{"hook_event_name":"PostToolUse","cwd":"/p","tool_name":"Read","session_id":"x","tool_input":{"file_path":"/p/a"}}"#,
        )
        .unwrap();
        assert_eq!(
            input.to_event(),
            HookEvent::PostToolUse {
                tool_name: "Read".to_string()
            }
        );
    }

    #[test]
    fn test_resolve_cwd_prefers_payload() {
        let input = HookInput {
            cwd: Some("/payload".to_string()),
            ..Default::default()
        };
        assert_eq!(input.resolve_cwd(Some("/process")), Some("/payload".to_string()));

        let empty = HookInput::default();
        assert_eq!(empty.resolve_cwd(Some("/process")), Some("/process".to_string()));
        assert_eq!(empty.resolve_cwd(None), None);
    }

    #[test]
    fn test_resolve_cwd_keeps_empty_string() {
        let input: HookInput = serde_json::from_str(r#"{"cwd": ""}"#).unwrap();
        assert_eq!(input.resolve_cwd(Some("/process")), Some(String::new()));
    }

    #[test]
    fn test_non_string_fields_count_as_absent() {
        let input: HookInput = serde_json::from_str(
            r#"{"hook_event_name":"PostToolUse","tool_name":7,"cwd":null}"#,
        )
        .unwrap();
        assert_eq!(input.tool_name(), UNKNOWN_TOOL);
        assert_eq!(input.cwd, None);
        assert_eq!(
            input.to_event(),
            HookEvent::PostToolUse {
                tool_name: UNKNOWN_TOOL.to_string()
            }
        );

        let input: HookInput =
            serde_json::from_str(r#"{"hook_event_name":{"name":"Stop"},"cwd":["/p"]}"#).unwrap();
        assert_eq!(input.event_name(), "");
        assert_eq!(input.resolve_cwd(Some("/process")), Some("/process".to_string()));
    }

    #[test]
    fn test_event_name_round_trip() {
        for name in [
            "UserPromptSubmit",
            "PermissionRequest",
            "PostToolUse",
            "Stop",
            "SubagentStop",
            "PreCompact",
            "SessionStart",
        ] {
            assert_eq!(HookEvent::from_name(name, "Bash").name(), name);
        }
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::Permission.to_string(), "permission");
        assert_eq!(Phase::Ready.as_str(), "ready");
    }
}
