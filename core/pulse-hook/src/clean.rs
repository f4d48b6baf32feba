//! `pulse-hook clean`: forget a session's record.

use pulse_core::{HookConfig, Result, StatsStore};

pub fn run(config: &HookConfig, cwd: Option<&str>) -> Result<()> {
    let cwd = super::resolve_cwd(cwd);
    let store = StatsStore::for_session(&config.storage, config.session_id.as_deref(), &cwd);

    if store.remove()? {
        tracing::info!(file = %store.path().display(), "Removed session state");
        println!("Removed {}", store.path().display());
    } else {
        println!("No session state at {}", store.path().display());
    }
    Ok(())
}
