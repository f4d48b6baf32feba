//! `pulse-hook status`: print the tracked record for one session.

use std::io::{self, Write};

use chrono::DateTime;
use pulse_core::clock::unix_now;
use pulse_core::{HookConfig, PulseError, Result, SessionState, StatsStore};

const TOP_TOOLS: usize = 5;

pub fn run(config: &HookConfig, cwd: Option<&str>, history: usize, json: bool) -> Result<()> {
    let cwd = super::resolve_cwd(cwd);
    let store = StatsStore::for_session(&config.storage, config.session_id.as_deref(), &cwd);
    let state = store.load();

    let mut out = io::stdout().lock();
    if json {
        let doc = serde_json::to_string_pretty(&state).map_err(|source| PulseError::Json {
            context: "serializing session state".to_string(),
            source,
        })?;
        writeln!(out, "{}", doc).map_err(stdout_error)
    } else {
        render(&mut out, &store, &state, history, unix_now()).map_err(stdout_error)
    }
}

fn stdout_error(source: io::Error) -> PulseError {
    PulseError::Io {
        context: "writing to stdout".to_string(),
        source,
    }
}

fn render(
    out: &mut impl Write,
    store: &StatsStore,
    state: &SessionState,
    history: usize,
    now: f64,
) -> io::Result<()> {
    writeln!(out, "── Session ───────────────────────────────────────────────")?;
    writeln!(out, "  File:        {}", store.path().display())?;
    if !store.path().exists() {
        writeln!(out, "  (no state recorded yet)")?;
    }
    writeln!(out, "  State:       {}", state.state)?;
    if let Some(idle) = state.idle_seconds(now) {
        writeln!(out, "  Idle for:    {}", format_duration(idle as u64))?;
    }
    if let Some(updated) = state.last_updated {
        writeln!(out, "  Updated:     {}", format_timestamp(updated))?;
    }
    writeln!(out)?;

    writeln!(out, "── Activity ──────────────────────────────────────────────")?;
    writeln!(out, "  Prompts:     {}", state.prompts)?;
    writeln!(out, "  Completions: {}", state.completions)?;
    writeln!(out, "  Subagents:   {}", state.subagent_messages)?;
    writeln!(out, "  Compactions: {}", state.compressions)?;
    writeln!(out, "  Tool calls:  {}", state.total_tool_calls())?;
    for (tool, count) in state.top_tools(TOP_TOOLS) {
        writeln!(out, "    {:<18} {}", tool, count)?;
    }

    if history == 0 || state.event_history.is_empty() {
        return Ok(());
    }
    writeln!(out)?;
    writeln!(out, "── Recent Events ─────────────────────────────────────────")?;
    let skip = state.event_history.len().saturating_sub(history);
    for entry in &state.event_history[skip..] {
        writeln!(
            out,
            "  {}  {:<18} from {}",
            format_timestamp(entry.ts),
            entry.event,
            entry.state_before
        )?;
    }

    Ok(())
}

/// UTC wall-clock time, falling back to raw seconds for out-of-range values.
fn format_timestamp(ts: f64) -> String {
    DateTime::from_timestamp_millis((ts * 1000.0) as i64)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| format!("{:.3}", ts))
}

/// Compact durations: `42s`, `5m`, `2h 10m`, `3d 4h`.
fn format_duration(secs: u64) -> String {
    let (days, hours, minutes) = (secs / 86_400, (secs % 86_400) / 3_600, (secs % 3_600) / 60);
    match (days, hours, minutes) {
        (0, 0, 0) => format!("{}s", secs),
        (0, 0, m) => format!("{}m", m),
        (0, h, m) => format!("{}h {}m", h, m),
        (d, h, _) => format!("{}d {}h", d, h),
    }
}
