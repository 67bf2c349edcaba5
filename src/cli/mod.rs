//! Command-line interface for Centre
//!
//! Starts the menu bar app and exposes one-shot commands for centring,
//! permissions, preferences and launch-at-login.

use crate::{
    lifecycle::CentreServices,
    models::{
        action::{CentreAction, WindowTarget},
        geometry::Axes,
    },
    CentreError, Result,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::Write;
use tracing::info;

/// Centre command-line interface
#[derive(Parser, Debug)]
#[command(name = "centre")]
#[command(about = "Centre windows on the main screen from the macOS menu bar")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct CentreCli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable JSON output for machine-readable results
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand; runs the menu bar app when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl CentreCli {
    /// The command to execute, defaulting to `run`
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Run)
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the menu bar app
    Run,

    /// Centre the active window, or every visible window, once
    Centre(CentreArgs),

    /// List the windows a "visible windows" action would move
    Windows,

    /// Accessibility permission commands
    Permissions(PermissionCommands),

    /// Preference commands
    Prefs(PrefsCommands),

    /// Launch on login commands
    Login(LoginCommands),
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct CentreArgs {
    /// Centre every visible window instead of the active one
    #[arg(short, long)]
    pub all: bool,

    /// Axes to centre on
    #[arg(long, value_enum, default_value_t = AxisArg::Both)]
    pub axis: AxisArg,
}

impl CentreArgs {
    pub fn action(&self) -> CentreAction {
        let target = if self.all {
            WindowTarget::VisibleWindows
        } else {
            WindowTarget::ActiveWindow
        };
        CentreAction::new(target, self.axis.into())
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisArg {
    Both,
    Horizontal,
    Vertical,
}

impl From<AxisArg> for Axes {
    fn from(axis: AxisArg) -> Self {
        match axis {
            AxisArg::Both => Axes::BOTH,
            AxisArg::Horizontal => Axes::HORIZONTAL,
            AxisArg::Vertical => Axes::VERTICAL,
        }
    }
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct PermissionCommands {
    #[command(subcommand)]
    pub action: PermissionActions,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum PermissionActions {
    /// Show whether Centre may move windows
    Status,
    /// Ask macOS to show the accessibility prompt
    Prompt,
    /// Open System Settings at the Accessibility pane
    Open,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct PrefsCommands {
    #[command(subcommand)]
    pub action: PrefsActions,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum PrefsActions {
    /// Print the current preferences
    Show,
    /// Centre within the visible frame (true) or the full screen (false)
    SetVisibleFrameOnly {
        #[arg(action = clap::ArgAction::Set)]
        value: bool,
    },
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct LoginCommands {
    #[command(subcommand)]
    pub action: LoginActions,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum LoginActions {
    /// Show whether Centre starts at login
    Status,
    /// Start Centre at login
    Enable,
    /// Stop starting Centre at login
    Disable,
}

#[derive(Serialize)]
struct LoginStatus<'a> {
    enabled: bool,
    label: Option<&'a str>,
    plist: Option<String>,
}

/// CLI command executor
pub struct CentreCliExecutor<'a> {
    services: &'a CentreServices,
    json_output: bool,
}

impl<'a> CentreCliExecutor<'a> {
    pub fn new(services: &'a CentreServices, json_output: bool) -> Self {
        Self {
            services,
            json_output,
        }
    }

    /// Execute a one-shot command, writing results to `out`
    pub fn execute(&self, command: Commands, out: &mut impl Write) -> Result<()> {
        match command {
            Commands::Run => Err(CentreError::ValidationError(
                "`run` is handled by the application lifecycle".to_string(),
            )
            .into()),
            Commands::Centre(args) => self.execute_centre(&args, out),
            Commands::Windows => self.execute_windows(out),
            Commands::Permissions(cmd) => self.execute_permission_command(cmd, out),
            Commands::Prefs(cmd) => self.execute_prefs_command(cmd, out),
            Commands::Login(cmd) => self.execute_login_command(cmd, out),
        }
    }

    fn execute_centre(&self, args: &CentreArgs, out: &mut impl Write) -> Result<()> {
        let permissions = &self.services.permissions;
        if !permissions.check().is_granted() {
            writeln!(out, "{}", permissions.instructions())?;
            return Err(CentreError::PermissionDenied(
                "Accessibility permission is not granted".to_string(),
            )
            .into());
        }

        let action = args.action();
        info!(action = %action, "Centring from the command line");
        let report = crate::trace_performance!("cli_centre", {
            self.services.centrer.perform(action)?
        });

        if self.json_output {
            writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
        } else {
            writeln!(
                out,
                "{}: moved {} window(s), {} failed",
                action.title(),
                report.moved,
                report.failed
            )?;
        }
        Ok(())
    }

    fn execute_windows(&self, out: &mut impl Write) -> Result<()> {
        let windows = self.services.centrer.visible_windows()?;

        if self.json_output {
            writeln!(out, "{}", serde_json::to_string_pretty(&windows)?)?;
        } else if windows.is_empty() {
            writeln!(out, "No visible windows.")?;
        } else {
            writeln!(out, "Windows:")?;
            for window in windows {
                writeln!(
                    out,
                    "  [{}] {} - {} (pid {}) {}",
                    window.window_id,
                    window.application_name,
                    window.title,
                    window.pid,
                    window.frame
                )?;
            }
        }
        Ok(())
    }

    fn execute_permission_command(&self, cmd: PermissionCommands, out: &mut impl Write) -> Result<()> {
        let permissions = &self.services.permissions;
        let status = match cmd.action {
            PermissionActions::Status => permissions.check(),
            PermissionActions::Prompt => permissions.verify(),
            PermissionActions::Open => {
                permissions.open_settings()?;
                writeln!(out, "Opened System Settings > Privacy & Security > Accessibility")?;
                return Ok(());
            }
        };

        if self.json_output {
            let status_json = serde_json::json!({
                "accessibility": status,
                "granted": status.is_granted(),
            });
            writeln!(out, "{}", serde_json::to_string_pretty(&status_json)?)?;
        } else if status.is_granted() {
            writeln!(out, "Accessibility permission: granted")?;
        } else {
            writeln!(out, "Accessibility permission: not granted")?;
            writeln!(out, "\n{}", permissions.instructions())?;
        }
        Ok(())
    }

    fn execute_prefs_command(&self, cmd: PrefsCommands, out: &mut impl Write) -> Result<()> {
        let preferences = &self.services.preferences;
        match cmd.action {
            PrefsActions::Show => {}
            PrefsActions::SetVisibleFrameOnly { value } => {
                preferences.set_visible_frame_only(value);
                self.services.store.save(&preferences.snapshot())?;
                info!(value, "Visible frame preference updated");
            }
        }

        let snapshot = preferences.snapshot();
        if self.json_output {
            writeln!(out, "{}", serde_json::to_string_pretty(&snapshot)?)?;
        } else {
            writeln!(out, "Preferences ({}):", self.services.store.path().display())?;
            writeln!(out, "  visible_frame_only: {}", snapshot.visible_frame_only)?;
            writeln!(out, "  error_sound: {}", snapshot.error_sound)?;
            writeln!(out, "  hotkeys:")?;
            for binding in self.services.bindings() {
                writeln!(out, "    {:<30} {}", binding.action.title(), binding.shortcut)?;
            }
        }
        Ok(())
    }

    fn execute_login_command(&self, cmd: LoginCommands, out: &mut impl Write) -> Result<()> {
        let agent = self.services.launch_at_login.as_ref();

        let requested = match cmd.action {
            LoginActions::Status => None,
            LoginActions::Enable => Some(true),
            LoginActions::Disable => Some(false),
        };

        if let Some(enabled) = requested {
            let agent = agent.ok_or_else(|| {
                CentreError::ConfigurationError("Launch at login is unavailable".to_string())
            })?;
            agent.set_enabled(enabled)?;
        }

        let status = LoginStatus {
            enabled: agent.map(|agent| agent.is_enabled()).unwrap_or(false),
            label: agent.map(|agent| agent.label()),
            plist: agent.map(|agent| agent.plist_path().display().to_string()),
        };

        if self.json_output {
            writeln!(out, "{}", serde_json::to_string_pretty(&status)?)?;
        } else {
            writeln!(
                out,
                "Launch on login: {}",
                if status.enabled { "enabled" } else { "disabled" }
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Preferences, PreferencesStore};
    use crate::lifecycle::Providers;
    use crate::macos::accessibility::{AXWindow, InMemoryAccessibilityProvider};
    use crate::macos::display::{InMemoryDisplayProvider, ScreenInfo};
    use crate::models::geometry::{Point, Rect};
    use crate::permissions::test_support::FakeProbe;
    use crate::services::LaunchAtLogin;
    use crate::ui::RecordingNotifier;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        probe: Arc<FakeProbe>,
        accessibility: Arc<InMemoryAccessibilityProvider>,
        services: CentreServices,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let accessibility = Arc::new(InMemoryAccessibilityProvider::new_with(vec![
            AXWindow::new(1, 10, "Inbox", "Mail", Rect::new(0.0, 0.0, 400.0, 300.0)),
            AXWindow::new(2, 20, "main.rs", "Editor", Rect::new(50.0, 50.0, 1000.0, 700.0)),
        ]));
        let probe = Arc::new(FakeProbe::default());
        probe.set_trusted(true);

        let providers = Providers {
            accessibility: accessibility.clone(),
            displays: Arc::new(InMemoryDisplayProvider::new_with(Some(ScreenInfo::new(
                Rect::new(0.0, 0.0, 1920.0, 1080.0),
                Rect::new(0.0, 0.0, 1920.0, 1080.0),
            )))),
            notifier: Arc::new(RecordingNotifier::new()),
            permissions: probe.clone(),
        };
        let agent = LaunchAtLogin::new("com.example.centre", dir.path().join("agents"), "/bin/centre");
        let services = CentreServices::new(
            PreferencesStore::at(dir.path().join("config")),
            Preferences::default(),
            providers,
            Some(agent),
        );

        Fixture {
            dir,
            probe,
            accessibility,
            services,
        }
    }

    fn run(f: &Fixture, json: bool, args: &[&str]) -> Result<String> {
        let cli = CentreCli::try_parse_from(std::iter::once("centre").chain(args.iter().copied()))?;
        let mut out = Vec::new();
        CentreCliExecutor::new(&f.services, json || cli.json).execute(cli.command(), &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn no_subcommand_means_run() {
        let cli = CentreCli::try_parse_from(["centre"]).unwrap();
        assert_eq!(cli.command(), Commands::Run);

        let cli = CentreCli::try_parse_from(["centre", "--verbose", "run"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.command(), Commands::Run);
    }

    #[test]
    fn centre_args_map_to_actions() {
        let cli = CentreCli::try_parse_from(["centre", "centre", "--all", "--axis", "vertical"]).unwrap();
        match cli.command() {
            Commands::Centre(args) => {
                assert_eq!(args.action(), CentreAction::CENTRE_VISIBLE_VERTICALLY)
            }
            other => panic!("unexpected command {:?}", other),
        }

        let cli = CentreCli::try_parse_from(["centre", "centre"]).unwrap();
        assert_eq!(
            cli.command(),
            Commands::Centre(CentreArgs {
                all: false,
                axis: AxisArg::Both
            })
        );
    }

    #[test]
    fn centre_all_moves_every_window() {
        let f = fixture();
        let output = run(&f, false, &["centre", "--all"]).unwrap();

        assert!(output.contains("moved 2 window(s), 0 failed"));
        assert_eq!(f.accessibility.window(1).unwrap().frame.origin, Point::new(760.0, 390.0));
        assert_eq!(f.accessibility.window(2).unwrap().frame.origin, Point::new(460.0, 190.0));
    }

    #[test]
    fn centre_requires_permission() {
        let f = fixture();
        f.probe.set_trusted(false);

        let err = run(&f, false, &["centre"]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CentreError>(),
            Some(CentreError::PermissionDenied(_))
        ));
        assert_eq!(f.accessibility.window(1).unwrap().frame.origin, Point::new(0.0, 0.0));
    }

    #[test]
    fn windows_json_lists_windows() {
        let f = fixture();
        let output = run(&f, false, &["--json", "windows"]).unwrap();

        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        let windows = value.as_array().unwrap();
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0]["application_name"], "Mail");
        assert_eq!(windows[1]["frame"]["size"]["width"], 1000.0);
    }

    #[test]
    fn permissions_status_reports_json() {
        let f = fixture();
        let output = run(&f, true, &["permissions", "status"]).unwrap();

        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["accessibility"], "granted");
        assert_eq!(value["granted"], true);
    }

    #[test]
    fn set_visible_frame_only_persists() {
        let f = fixture();
        run(&f, false, &["prefs", "set-visible-frame-only", "false"]).unwrap();

        assert!(!f.services.preferences.visible_frame_only());
        let saved = f.services.store.load().unwrap();
        assert!(!saved.visible_frame_only);

        let output = run(&f, false, &["prefs", "show"]).unwrap();
        assert!(output.contains("visible_frame_only: false"));
        assert!(output.contains("⌥⇧⌘0"));
    }

    #[test]
    fn login_enable_and_disable() {
        let f = fixture();
        let plist = f.dir.path().join("agents").join("com.example.centre.plist");

        let output = run(&f, false, &["login", "enable"]).unwrap();
        assert!(output.contains("enabled"));
        assert!(plist.exists());

        let output = run(&f, true, &["login", "status"]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["enabled"], true);

        run(&f, false, &["login", "disable"]).unwrap();
        assert!(!plist.exists());
    }

    #[test]
    fn run_is_not_a_one_shot_command() {
        let f = fixture();
        assert!(run(&f, false, &["run"]).is_err());
    }
}
