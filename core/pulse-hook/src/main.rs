//! pulse-hook: CLI hook handler for pulse session state tracking.
//!
//! Called by Claude Code hooks configured in ~/.claude/settings.json. Each
//! invocation handles exactly one event and exits.
//!
//! ## Subcommands
//!
//! - `handle`: Main hook handler, reads JSON from stdin
//! - `status`: Print the tracked state for a session
//! - `clean`: Delete the tracked state for a session
//! - `install`: Register the hook in settings.json

mod clean;
mod handle;
mod install;
mod logging;
mod status;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use pulse_core::HookConfig;

#[derive(Parser)]
#[command(name = "pulse-hook")]
#[command(about = "Session state tracker for Claude Code")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle a hook event (reads JSON from stdin)
    Handle,

    /// Print the tracked state for a session
    Status {
        /// Working directory identifying the session when PULSE_SESSION_ID is unset
        #[arg(long)]
        cwd: Option<String>,

        /// Number of recent events to show
        #[arg(long, default_value_t = 10)]
        history: usize,

        /// Print the raw state document
        #[arg(long)]
        json: bool,
    },

    /// Delete the tracked state for a session
    Clean {
        /// Working directory identifying the session when PULSE_SESSION_ID is unset
        #[arg(long)]
        cwd: Option<String>,
    },

    /// Register pulse-hook for every tracked event in settings.json
    Install {
        /// Command line the host should run
        #[arg(long)]
        command: Option<String>,

        /// Only report whether the hooks are registered
        #[arg(long)]
        check: bool,
    },
}

fn main() -> ExitCode {
    let config = HookConfig::from_env();
    let _logging_guard = logging::init(&config);
    let cli = Cli::parse();

    match cli.command {
        Commands::Handle => handle_exit(handle::run(&config)),
        Commands::Status { cwd, history, json } => {
            report(status::run(&config, cwd.as_deref(), history, json).map(|()| true))
        }
        Commands::Clean { cwd } => report(clean::run(&config, cwd.as_deref()).map(|()| true)),
        Commands::Install { command, check } => report(install::run(&config, command, check)),
    }
}

/// The host must never be blocked: failures are logged and the exit is still clean.
fn handle_exit(result: Result<(), handle::HandleError>) -> ExitCode {
    if let Err(e) = result {
        tracing::warn!(error = %e, "pulse-hook handle failed");
    }
    ExitCode::SUCCESS
}

fn report(result: pulse_core::Result<bool>) -> ExitCode {
    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %e, "pulse-hook command failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// `--cwd` if given, else the process working directory.
fn resolve_cwd(explicit: Option<&str>) -> String {
    explicit.map(str::to_string).unwrap_or_else(|| {
        std::env::current_dir()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default()
    })
}
