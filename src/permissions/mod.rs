//! Accessibility permission tracking for Centre
//!
//! Centre can only move other applications' windows once the user has
//! trusted it under Privacy & Security > Accessibility. The checker keeps the
//! last verified answer so the menu can enable or disable its items without
//! querying the system on every redraw.

use crate::macos::permissions::{self as platform, PrivacyPane};
use crate::Result;
use serde::Serialize;
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Permission status for the accessibility API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PermissionStatus {
    /// Permission was not checked yet
    Unknown,
    /// Permission is granted
    Granted,
    /// Permission is denied
    Denied,
}

impl PermissionStatus {
    pub fn is_granted(self) -> bool {
        self == PermissionStatus::Granted
    }

    fn from_trusted(trusted: bool) -> Self {
        if trusted {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        }
    }
}

/// Source of truth for whether this process is trusted
pub trait PermissionProbe: Send + Sync {
    /// Query trust without showing any system UI
    fn is_trusted(&self) -> Result<bool>;

    /// Query trust, letting the system show its "grant access" prompt
    fn prompt(&self) -> Result<bool>;

    /// Send the user to the relevant System Settings pane
    fn open_settings(&self) -> Result<()>;
}

/// Probe backed by `AXIsProcessTrusted*`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemPermissionProbe;

impl PermissionProbe for SystemPermissionProbe {
    fn is_trusted(&self) -> Result<bool> {
        platform::is_accessibility_permission_granted()
    }

    fn prompt(&self) -> Result<bool> {
        platform::prompt_accessibility_permission()
    }

    fn open_settings(&self) -> Result<()> {
        platform::open_privacy_pane(PrivacyPane::Accessibility)
    }
}

/// Caches the most recent accessibility permission answer
pub struct PermissionChecker {
    probe: Arc<dyn PermissionProbe>,
    state: RwLock<(PermissionStatus, Option<Instant>)>,
}

impl PermissionChecker {
    pub fn new(probe: Arc<dyn PermissionProbe>) -> Self {
        Self {
            probe,
            state: RwLock::new((PermissionStatus::Unknown, None)),
        }
    }

    /// Last known status; `Unknown` until the first check
    pub fn status(&self) -> PermissionStatus {
        self.state
            .read()
            .map(|state| state.0)
            .unwrap_or(PermissionStatus::Unknown)
    }

    pub fn is_granted(&self) -> bool {
        self.status().is_granted()
    }

    /// Re-query the system without prompting
    pub fn check(&self) -> PermissionStatus {
        let status = match self.probe.is_trusted() {
            Ok(trusted) => PermissionStatus::from_trusted(trusted),
            Err(err) => {
                warn!("Accessibility permission check failed: {}", err);
                PermissionStatus::Denied
            }
        };
        self.record(status);
        debug!(?status, "Accessibility permission checked");
        status
    }

    /// Re-query the system, showing the trust prompt when not yet granted.
    /// This backs both the launch-time check and "Verify Permission".
    pub fn verify(&self) -> PermissionStatus {
        let status = match self.probe.prompt() {
            Ok(trusted) => PermissionStatus::from_trusted(trusted),
            Err(err) => {
                warn!("Accessibility permission prompt failed: {}", err);
                PermissionStatus::Denied
            }
        };
        self.record(status);
        info!(?status, "Accessibility permission verified");
        status
    }

    /// Open System Settings at the Accessibility pane
    pub fn open_settings(&self) -> Result<()> {
        self.probe.open_settings()
    }

    /// When the status was last refreshed
    pub fn last_checked(&self) -> Option<Instant> {
        self.state.read().ok().and_then(|state| state.1)
    }

    /// Get user-friendly instructions for enabling the permission
    pub fn instructions(&self) -> &'static str {
        "To let Centre move windows:\n\
         1. Open System Settings > Privacy & Security > Accessibility\n\
         2. Enable the switch next to 'Centre'\n\
         3. Choose 'Verify Permission' from the Centre menu"
    }

    fn record(&self, status: PermissionStatus) {
        if let Ok(mut state) = self.state.write() {
            *state = (status, Some(Instant::now()));
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Probe whose answer tests can flip
    #[derive(Default)]
    pub struct FakeProbe {
        pub trusted: AtomicBool,
        pub prompts: AtomicUsize,
    }

    impl FakeProbe {
        pub fn set_trusted(&self, trusted: bool) {
            self.trusted.store(trusted, Ordering::SeqCst);
        }
    }

    impl PermissionProbe for FakeProbe {
        fn is_trusted(&self) -> Result<bool> {
            Ok(self.trusted.load(Ordering::SeqCst))
        }

        fn prompt(&self) -> Result<bool> {
            self.prompts.fetch_add(1, Ordering::SeqCst);
            self.is_trusted()
        }

        fn open_settings(&self) -> Result<()> {
            Ok(())
        }
    }
}
