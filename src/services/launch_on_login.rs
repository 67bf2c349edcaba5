//! Per-user LaunchAgent that starts Centre when the user logs in.

use crate::config::persistence::write_atomically;
use crate::Result;
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DEFAULT_LABEL: &str = "com.centre-app.centre";

/// Manages `~/Library/LaunchAgents/<label>.plist`
#[derive(Debug, Clone)]
pub struct LaunchAtLogin {
    label: String,
    agents_dir: PathBuf,
    program: PathBuf,
}

impl LaunchAtLogin {
    pub fn new(label: impl Into<String>, agents_dir: impl Into<PathBuf>, program: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            agents_dir: agents_dir.into(),
            program: program.into(),
        }
    }

    /// Agent for the running executable in the user's LaunchAgents directory
    pub fn for_current_exe() -> Result<Self> {
        let program = std::env::current_exe().context("Failed to resolve current executable")?;
        let home = dirs::home_dir().context("Failed to resolve home directory")?;
        Ok(Self::new(
            DEFAULT_LABEL,
            home.join("Library").join("LaunchAgents"),
            program,
        ))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn plist_path(&self) -> PathBuf {
        self.agents_dir.join(format!("{}.plist", self.label))
    }

    pub fn is_enabled(&self) -> bool {
        self.plist_path().is_file()
    }

    /// Install or remove the agent. Returns whether anything changed.
    pub fn set_enabled(&self, enabled: bool) -> Result<bool> {
        if enabled == self.is_enabled() {
            debug!(enabled, "Launch at login already in requested state");
            return Ok(false);
        }

        let path = self.plist_path();
        if enabled {
            fs::create_dir_all(&self.agents_dir).with_context(|| {
                format!("Failed to create {}", self.agents_dir.display())
            })?;
            write_atomically(&path, &self.render_plist())
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "Launch at login enabled");
        } else {
            fs::remove_file(&path).with_context(|| format!("Failed to remove {}", path.display()))?;
            info!(path = %path.display(), "Launch at login disabled");
        }

        Ok(true)
    }

    /// Like [`LaunchAtLogin::set_enabled`] but only logs failures
    pub fn apply(&self, enabled: bool) -> bool {
        match self.set_enabled(enabled) {
            Ok(_) => self.is_enabled() == enabled,
            Err(err) => {
                warn!("Failed to update launch at login: {:#}", err);
                false
            }
        }
    }

    fn render_plist(&self) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <key>Label</key>
    <string>{label}</string>
    <key>ProgramArguments</key>
    <array>
        <string>{program}</string>
        <string>run</string>
    </array>
    <key>RunAtLoad</key>
    <true/>
    <key>ProcessType</key>
    <string>Interactive</string>
</dict>
</plist>
"#,
            label = xml_escape(&self.label),
            program = xml_escape(&path_string(&self.program)),
        )
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn agent(dir: &TempDir) -> LaunchAtLogin {
        LaunchAtLogin::new(
            "com.example.centre",
            dir.path().join("LaunchAgents"),
            "/Applications/Centre & Co.app/Contents/MacOS/centre",
        )
    }

    #[test]
    fn disabled_until_enabled() {
        let dir = TempDir::new().unwrap();
        let agent = agent(&dir);

        assert!(!agent.is_enabled());
        assert!(agent.set_enabled(true).unwrap());
        assert!(agent.is_enabled());
        assert_eq!(
            agent.plist_path(),
            dir.path().join("LaunchAgents").join("com.example.centre.plist")
        );
    }

    #[test]
    fn plist_runs_the_app_at_load() {
        let dir = TempDir::new().unwrap();
        let agent = agent(&dir);
        agent.set_enabled(true).unwrap();

        let plist = fs::read_to_string(agent.plist_path()).unwrap();
        assert!(plist.contains("<string>com.example.centre</string>"));
        assert!(plist.contains("Centre &amp; Co.app"));
        assert!(plist.contains("<string>run</string>"));
        assert!(plist.contains("<key>RunAtLoad</key>\n    <true/>"));
    }

    #[test]
    fn repeated_state_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let agent = agent(&dir);

        assert!(!agent.set_enabled(false).unwrap());
        assert!(agent.set_enabled(true).unwrap());
        assert!(!agent.set_enabled(true).unwrap());
        assert!(agent.set_enabled(false).unwrap());
        assert!(!agent.is_enabled());
    }

    #[test]
    fn apply_reports_failure_without_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("LaunchAgents");
        fs::write(&blocker, "not a directory").unwrap();

        let agent = agent(&dir);
        assert!(!agent.apply(true));
        assert!(!agent.is_enabled());
    }
}
