//! Hook registration in the host's `settings.json`.
//!
//! Only ever adds or normalizes our own hook entries. Every other setting and
//! hook is preserved. A settings file that does not parse is never
//! overwritten. Writes are atomic (temp + rename).

use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

use fs_err as fs;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{PulseError, Result};
use crate::storage::StorageConfig;

pub const HOOK_COMMAND: &str = "$HOME/.local/bin/pulse-hook handle";

/// Hook events we register: (event_name, needs_matcher).
/// Tool events need `matcher: "*"` to fire for every tool.
const PULSE_HOOK_EVENTS: [(&str, bool); 6] = [
    ("PermissionRequest", true),
    ("PostToolUse", true),
    ("Stop", false),
    ("SubagentStop", false),
    ("PreCompact", false),
    ("UserPromptSubmit", false),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed,
    AlreadyInstalled,
}

pub struct HookInstaller {
    storage: StorageConfig,
    command: String,
}

impl HookInstaller {
    pub fn new(storage: StorageConfig) -> Self {
        Self {
            storage,
            command: HOOK_COMMAND.to_string(),
        }
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// True when every event has our hook in the right place.
    pub fn is_registered(&self) -> bool {
        let Ok(settings_path) = self.storage.claude_settings_file() else {
            return false;
        };
        let settings = match read_settings(&settings_path) {
            Ok(Some(settings)) => settings,
            Ok(None) | Err(_) => return false,
        };

        let Some(hooks) = settings.hooks else {
            return false;
        };

        PULSE_HOOK_EVENTS.iter().all(|(event, needs_matcher)| {
            hooks
                .get(*event)
                .map(|groups| {
                    groups
                        .iter()
                        .any(|group| group_has_pulse_hook(group, *needs_matcher))
                })
                .unwrap_or(false)
        })
    }

    /// Fails with [`PulseError::HomeDirNotFound`] when there is no Claude root
    /// to write into.
    pub fn install(&self) -> Result<InstallOutcome> {
        let settings_path = self.storage.claude_settings_file()?;
        let existing = read_settings(&settings_path)?;
        let existed = existing.is_some();
        let original = existing.unwrap_or_default();

        let mut settings = original.clone();
        let hooks = settings.hooks.get_or_insert_with(BTreeMap::new);
        for (event, needs_matcher) in PULSE_HOOK_EVENTS {
            let groups = hooks.entry(event.to_string()).or_default();
            self.place_hook(groups, needs_matcher);
        }

        if existed && settings == original {
            tracing::debug!(path = %settings_path.display(), "Hooks already registered");
            return Ok(InstallOutcome::AlreadyInstalled);
        }

        let content = serde_json::to_string_pretty(&settings).map_err(|e| PulseError::Json {
            context: "serializing settings".to_string(),
            source: e,
        })?;
        atomic_write(&settings_path, &content)?;

        tracing::info!(path = %settings_path.display(), "Hooks registered");
        Ok(InstallOutcome::Installed)
    }

    /// Ensures exactly one copy of our hook for this event, in the group where
    /// it belongs, and drops groups left empty by the cleanup.
    fn place_hook(&self, groups: &mut Vec<MatcherGroup>, needs_matcher: bool) {
        let primary = if needs_matcher {
            groups
                .iter()
                .position(|g| g.is_wildcard() && g.hooks.is_some())
        } else {
            groups.iter().position(|g| g.contains_pulse_hook())
        };
        let primary = primary.unwrap_or_else(|| {
            groups.push(MatcherGroup {
                matcher: needs_matcher.then(|| "*".to_string()),
                hooks: Some(Vec::new()),
                other: BTreeMap::new(),
            });
            groups.len() - 1
        });

        for (index, group) in groups.iter_mut().enumerate() {
            let Some(inner) = group.hooks.as_mut() else {
                continue;
            };
            let mut kept = false;
            inner.retain(|hook| {
                if !hook.is_pulse_hook() {
                    return true;
                }
                let keep = index == primary && !kept;
                kept |= keep;
                keep
            });

            if index == primary {
                match inner.iter_mut().find(|hook| hook.is_pulse_hook()) {
                    Some(hook) => hook.command = Some(self.command.clone()),
                    None => inner.push(InnerHook::command(&self.command)),
                }
            }
        }

        groups.retain(|group| group.hooks.as_ref().map_or(true, |h| !h.is_empty()));
    }
}

fn read_settings(path: &Path) -> Result<Option<SettingsFile>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(PulseError::Io {
                context: format!("reading {}", path.display()),
                source: e,
            })
        }
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| PulseError::SettingsMalformed {
            path: path.to_path_buf(),
            details: format!("{}; refusing to overwrite", e),
        })
}

fn atomic_write(path: &Path, contents: &str) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| PulseError::Io {
        context: format!("creating {}", dir.display()),
        source: e,
    })?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| PulseError::Io {
        context: format!("creating temp file in {}", dir.display()),
        source: e,
    })?;
    tmp.write_all(contents.as_bytes())
        .map_err(|e| PulseError::Io {
            context: format!("writing temp file for {}", path.display()),
            source: e,
        })?;
    tmp.flush().map_err(|e| PulseError::Io {
        context: format!("flushing temp file for {}", path.display()),
        source: e,
    })?;
    tmp.persist(path).map_err(|e| PulseError::Persist {
        path: path.to_path_buf(),
        source: e.error,
    })?;

    Ok(())
}

fn group_has_pulse_hook(group: &MatcherGroup, needs_matcher: bool) -> bool {
    group.contains_pulse_hook() && (!needs_matcher || group.is_wildcard())
}

/// Check if a command runs the pulse hook binary.
fn is_pulse_hook_command(cmd: Option<&str>) -> bool {
    cmd.map(|c| c.contains("pulse-hook")).unwrap_or(false)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct SettingsFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    hooks: Option<BTreeMap<String, Vec<MatcherGroup>>>,
    #[serde(flatten)]
    other: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct MatcherGroup {
    #[serde(skip_serializing_if = "Option::is_none")]
    matcher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hooks: Option<Vec<InnerHook>>,
    #[serde(flatten)]
    other: BTreeMap<String, serde_json::Value>,
}

impl MatcherGroup {
    fn is_wildcard(&self) -> bool {
        self.matcher.as_deref().map(str::trim) == Some("*")
    }

    fn contains_pulse_hook(&self) -> bool {
        self.hooks
            .as_ref()
            .is_some_and(|hooks| hooks.iter().any(InnerHook::is_pulse_hook))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct InnerHook {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    hook_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    command: Option<String>,
    #[serde(flatten)]
    other: BTreeMap<String, serde_json::Value>,
}

impl InnerHook {
    fn command(command: &str) -> Self {
        InnerHook {
            hook_type: Some("command".to_string()),
            command: Some(command.to_string()),
            other: BTreeMap::new(),
        }
    }

    fn is_pulse_hook(&self) -> bool {
        is_pulse_hook_command(self.command.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn setup_test_env() -> (TempDir, StorageConfig) {
        let temp = TempDir::new().unwrap();
        let storage =
            StorageConfig::with_roots(temp.path().join("state"), temp.path().join(".claude"));
        (temp, storage)
    }

    fn read_json(storage: &StorageConfig) -> Value {
        let content = std::fs::read_to_string(storage.claude_settings_file().unwrap()).unwrap();
        serde_json::from_str(&content).unwrap()
    }

    fn pulse_hook_count(settings: &Value, event: &str) -> usize {
        settings["hooks"][event]
            .as_array()
            .unwrap()
            .iter()
            .flat_map(|group| group["hooks"].as_array().cloned().unwrap_or_default())
            .filter(|hook| {
                hook["command"]
                    .as_str()
                    .is_some_and(|c| c.contains("pulse-hook"))
            })
            .count()
    }

    #[test]
    fn test_not_registered_without_settings() {
        let (_temp, storage) = setup_test_env();
        assert!(!HookInstaller::new(storage).is_registered());
    }

    #[test]
    fn test_install_creates_settings() {
        let (_temp, storage) = setup_test_env();
        let installer = HookInstaller::new(storage.clone());

        assert_eq!(installer.install().unwrap(), InstallOutcome::Installed);
        assert!(installer.is_registered());

        let settings = read_json(&storage);
        assert_eq!(settings["hooks"]["PostToolUse"][0]["matcher"], "*");
        assert_eq!(settings["hooks"]["PermissionRequest"][0]["matcher"], "*");
        assert!(settings["hooks"]["Stop"][0].get("matcher").is_none());
        assert_eq!(
            settings["hooks"]["UserPromptSubmit"][0]["hooks"][0],
            json!({"type": "command", "command": HOOK_COMMAND})
        );
    }

    #[test]
    fn test_install_is_idempotent() {
        let (_temp, storage) = setup_test_env();
        let installer = HookInstaller::new(storage.clone());

        installer.install().unwrap();
        let first = std::fs::read_to_string(storage.claude_settings_file().unwrap()).unwrap();
        assert_eq!(installer.install().unwrap(), InstallOutcome::AlreadyInstalled);
        let second = std::fs::read_to_string(storage.claude_settings_file().unwrap()).unwrap();

        assert_eq!(first, second);
        for (event, _) in PULSE_HOOK_EVENTS {
            assert_eq!(pulse_hook_count(&read_json(&storage), event), 1);
        }
    }

    #[test]
    fn test_does_not_clobber_existing_settings() {
        let (_temp, storage) = setup_test_env();
        std::fs::create_dir_all(storage.claude_root().unwrap()).unwrap();
        let existing = r#"{
            "someOtherSetting": "value",
            "hooks": {
                "CustomEvent": [{"hooks": [{"type": "command", "command": "custom.sh"}]}],
                "Stop": [{"hooks": [{"type": "command", "command": "notify.sh", "timeout": 5}]}]
            }
        }"#;
        std::fs::write(storage.claude_settings_file().unwrap(), existing).unwrap();

        HookInstaller::new(storage.clone()).install().unwrap();
        let settings = read_json(&storage);

        assert_eq!(settings["someOtherSetting"], "value");
        assert_eq!(
            settings["hooks"]["CustomEvent"][0]["hooks"][0]["command"],
            "custom.sh"
        );
        assert_eq!(settings["hooks"]["Stop"][0]["hooks"][0]["timeout"], 5);
        assert_eq!(pulse_hook_count(&settings, "Stop"), 1);
    }

    #[test]
    fn test_moves_tool_hook_into_wildcard_group() {
        let (_temp, storage) = setup_test_env();
        std::fs::create_dir_all(storage.claude_root().unwrap()).unwrap();
        let existing = json!({
            "hooks": {
                "PostToolUse": [
                    {"matcher": "Bash", "hooks": [{"type": "command", "command": "/old/pulse-hook handle"}]},
                    {"matcher": "Edit", "hooks": [{"type": "command", "command": "fmt.sh"}]}
                ]
            }
        });
        std::fs::write(storage.claude_settings_file().unwrap(), existing.to_string()).unwrap();

        HookInstaller::new(storage.clone()).install().unwrap();
        let groups = read_json(&storage)["hooks"]["PostToolUse"].clone();
        let groups = groups.as_array().unwrap();

        // The Bash group only held our hook, so it is dropped.
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0]["matcher"], "Edit");
        assert_eq!(groups[1]["matcher"], "*");
        assert_eq!(groups[1]["hooks"][0]["command"], HOOK_COMMAND);
    }

    #[test]
    fn test_removes_duplicate_hooks() {
        let (_temp, storage) = setup_test_env();
        std::fs::create_dir_all(storage.claude_root().unwrap()).unwrap();
        let hook = json!({"type": "command", "command": HOOK_COMMAND});
        let existing = json!({
            "hooks": {"PreCompact": [{"hooks": [hook.clone(), hook.clone()]}, {"hooks": [hook]}]}
        });
        std::fs::write(storage.claude_settings_file().unwrap(), existing.to_string()).unwrap();

        HookInstaller::new(storage.clone()).install().unwrap();
        let settings = read_json(&storage);

        assert_eq!(pulse_hook_count(&settings, "PreCompact"), 1);
        assert_eq!(settings["hooks"]["PreCompact"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_custom_command_replaces_existing() {
        let (_temp, storage) = setup_test_env();
        HookInstaller::new(storage.clone()).install().unwrap();

        let installer = HookInstaller::new(storage.clone()).with_command("/opt/bin/pulse-hook handle");
        assert_eq!(installer.install().unwrap(), InstallOutcome::Installed);

        let settings = read_json(&storage);
        assert_eq!(
            settings["hooks"]["Stop"][0]["hooks"][0]["command"],
            "/opt/bin/pulse-hook handle"
        );
        assert_eq!(pulse_hook_count(&settings, "Stop"), 1);
    }

    #[test]
    fn test_install_fails_on_corrupt_json() {
        let (_temp, storage) = setup_test_env();
        std::fs::create_dir_all(storage.claude_root().unwrap()).unwrap();
        let corrupt = r#"{ invalid json }"#;
        std::fs::write(storage.claude_settings_file().unwrap(), corrupt).unwrap();

        let result = HookInstaller::new(storage.clone()).install();
        assert!(matches!(result, Err(PulseError::SettingsMalformed { .. })));

        let content = std::fs::read_to_string(storage.claude_settings_file().unwrap()).unwrap();
        assert_eq!(content, corrupt);
    }

    #[test]
    fn test_install_fails_when_hooks_is_not_an_object() {
        let (_temp, storage) = setup_test_env();
        std::fs::create_dir_all(storage.claude_root().unwrap()).unwrap();
        std::fs::write(storage.claude_settings_file().unwrap(), r#"{"hooks": []}"#).unwrap();

        let result = HookInstaller::new(storage).install();
        assert!(matches!(result, Err(PulseError::SettingsMalformed { .. })));
    }

    #[test]
    fn test_registration_requires_wildcard_for_tool_events() {
        let (_temp, storage) = setup_test_env();
        let installer = HookInstaller::new(storage.clone());
        installer.install().unwrap();

        let mut settings = read_json(&storage);
        settings["hooks"]["PostToolUse"][0]["matcher"] = json!("Bash");
        std::fs::write(storage.claude_settings_file().unwrap(), settings.to_string()).unwrap();

        assert!(!installer.is_registered());
    }

    #[test]
    fn test_registration_requires_every_event() {
        let (_temp, storage) = setup_test_env();
        let installer = HookInstaller::new(storage.clone());
        installer.install().unwrap();

        let mut settings = read_json(&storage);
        settings["hooks"]
            .as_object_mut()
            .unwrap()
            .remove("SubagentStop");
        std::fs::write(storage.claude_settings_file().unwrap(), settings.to_string()).unwrap();

        assert!(!installer.is_registered());
    }

    #[test]
    fn test_install_without_home_dir_fails() {
        let temp = TempDir::new().unwrap();
        let storage = StorageConfig::without_claude_root(temp.path().join("state"));
        let installer = HookInstaller::new(storage);

        let result = installer.install();

        assert!(matches!(result, Err(PulseError::HomeDirNotFound)));
        assert!(!installer.is_registered());
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }
}
