//! `pulse-hook install`: register the hook in the host's settings.json.

use pulse_core::{HookConfig, HookInstaller, InstallOutcome, Result};

/// Returns whether the hooks are registered once the command finishes.
pub fn run(config: &HookConfig, command: Option<String>, check: bool) -> Result<bool> {
    let mut installer = HookInstaller::new(config.storage.clone());
    if let Some(command) = command {
        installer = installer.with_command(command);
    }
    let settings = config.storage.claude_settings_file()?;

    if check {
        let registered = installer.is_registered();
        if registered {
            println!("✓ Hooks registered in {}", settings.display());
        } else {
            println!("✗ Hooks missing from {}", settings.display());
        }
        return Ok(registered);
    }

    match installer.install()? {
        InstallOutcome::Installed => {
            println!("✓ Registered `{}` in {}", installer.command(), settings.display())
        }
        InstallOutcome::AlreadyInstalled => {
            println!("✓ Already registered in {}", settings.display())
        }
    }
    Ok(true)
}
