//! Diagnostic logging for pulse-hook.
//!
//! With a session id, milestones go to `<root>/pulse-<session_id>/hooks.log`,
//! one plain-text line per event prefixed with Unix seconds. Without one (or if
//! the log file cannot be opened) only warnings reach stderr. Logging never
//! changes the outcome of a command.

use std::path::Path;

use fs_err as fs;
use pulse_core::clock::unix_now;
use pulse_core::config::DEFAULT_LOG_FILTER;
use pulse_core::HookConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the global subscriber. Keep the returned guard alive until exit so
/// buffered lines are flushed.
pub fn init(config: &HookConfig) -> Option<WorkerGuard> {
    let Some(appender) = config.hook_log_file().and_then(|path| open_appender(&path)) else {
        let _ = tracing_subscriber::registry()
            .with(EnvFilter::new("warn"))
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .try_init();
        return None;
    };

    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter =
        EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false)
                .with_timer(UnixSeconds),
        )
        .try_init();

    Some(guard)
}

fn open_appender(path: &Path) -> Option<RollingFileAppender> {
    let dir = path.parent()?;
    let file_name = path.file_name()?.to_str()?;
    fs::create_dir_all(dir).ok()?;

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(dir)
        .ok()
}

/// `1700000000.123` style timestamps.
struct UnixSeconds;

impl FormatTime for UnixSeconds {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{:.3}", unix_now())
    }
}
