//! Application lifecycle management for Centre
//!
//! Wires the services together and runs the menu bar app on the main
//! thread.

use crate::{
    config::{Preferences, PreferencesHandle, PreferencesStore},
    macos::{AccessibilityProvider, DisplayProvider},
    models::shortcut::HotKeyBinding,
    permissions::{PermissionChecker, PermissionProbe, SystemPermissionProbe},
    services::{CentreReport, HotKeyId, KeyboardHandler, LaunchAtLogin, WindowCentrer},
    ui::{MenuController, Notifier},
    CentreError, Result,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Platform integrations the services are built on
pub struct Providers {
    pub accessibility: Arc<dyn AccessibilityProvider>,
    pub displays: Arc<dyn DisplayProvider>,
    pub notifier: Arc<dyn Notifier>,
    pub permissions: Arc<dyn PermissionProbe>,
}

impl Providers {
    /// Real platform providers. `interactive` selects alert and sound
    /// feedback over log-only feedback.
    #[cfg(target_os = "macos")]
    pub fn system(interactive: bool, error_sound: &str) -> Self {
        use crate::macos::{SystemAccessibilityProvider, SystemDisplayProvider};
        use crate::ui::{LogNotifier, SystemNotifier};

        let notifier: Arc<dyn Notifier> = if interactive {
            Arc::new(SystemNotifier::new(error_sound))
        } else {
            Arc::new(LogNotifier)
        };

        Self {
            accessibility: Arc::new(SystemAccessibilityProvider::new()),
            displays: Arc::new(SystemDisplayProvider::new()),
            notifier,
            permissions: Arc::new(SystemPermissionProbe),
        }
    }

    /// Off macOS there are no windows to move and no main screen
    #[cfg(not(target_os = "macos"))]
    pub fn system(_interactive: bool, _error_sound: &str) -> Self {
        use crate::macos::{InMemoryAccessibilityProvider, InMemoryDisplayProvider};
        use crate::ui::LogNotifier;

        Self {
            accessibility: Arc::new(InMemoryAccessibilityProvider::new_with(Vec::new())),
            displays: Arc::new(InMemoryDisplayProvider::new_with(None)),
            notifier: Arc::new(LogNotifier),
            permissions: Arc::new(SystemPermissionProbe),
        }
    }
}

/// Everything the menu, hot keys, and CLI operate on
pub struct CentreServices {
    pub preferences: PreferencesHandle,
    pub store: PreferencesStore,
    pub permissions: Arc<PermissionChecker>,
    pub centrer: Arc<WindowCentrer>,
    pub keyboard: Arc<KeyboardHandler>,
    pub launch_at_login: Option<LaunchAtLogin>,
}

impl CentreServices {
    pub fn new(
        store: PreferencesStore,
        preferences: Preferences,
        providers: Providers,
        launch_at_login: Option<LaunchAtLogin>,
    ) -> Self {
        let bindings = resolve_bindings(&preferences);
        let preferences = PreferencesHandle::new(preferences);

        let permissions = Arc::new(PermissionChecker::new(providers.permissions));
        let centrer = Arc::new(WindowCentrer::new(
            providers.accessibility,
            providers.displays,
            providers.notifier,
            preferences.clone(),
        ));

        let keyboard = Arc::new(KeyboardHandler::with_system_reserved());
        let registered = keyboard.register_all(bindings);
        debug!(count = registered.len(), "Hot key bindings registered");

        Self {
            preferences,
            store,
            permissions,
            centrer,
            keyboard,
            launch_at_login,
        }
    }

    /// Services backed by the real platform and the user's preferences file
    pub fn system(store: PreferencesStore, interactive: bool) -> Self {
        let preferences = load_preferences(&store);
        let providers = Providers::system(interactive, &preferences.error_sound);

        let launch_at_login = match LaunchAtLogin::for_current_exe() {
            Ok(agent) => Some(agent),
            Err(err) => {
                warn!("Launch at login unavailable: {:#}", err);
                None
            }
        };

        Self::new(store, preferences, providers, launch_at_login)
    }

    /// Bindings that registered successfully
    pub fn bindings(&self) -> Vec<HotKeyBinding> {
        self.keyboard
            .bindings()
            .into_iter()
            .map(|(_, binding)| binding)
            .collect()
    }

    pub fn menu_controller(&self) -> MenuController {
        MenuController::new(
            self.centrer.clone(),
            self.permissions.clone(),
            self.preferences.clone(),
            self.store.clone(),
            self.launch_at_login.clone(),
            self.bindings(),
        )
    }

    /// Run the action bound to a pressed hot key. `None` for unknown ids.
    pub fn handle_hot_key(&self, id: HotKeyId) -> Option<Result<CentreReport>> {
        let event = self.keyboard.handle_hot_key(id)?;

        if !self.permissions.is_granted() {
            warn!(action = %event.action, "Hot key pressed without accessibility permission");
            return Some(Err(CentreError::PermissionDenied(
                "Accessibility permission has not been verified".to_string(),
            )
            .into()));
        }

        Some(self.centrer.perform(event.action))
    }
}

/// Load preferences, falling back to defaults when the file is unreadable
pub fn load_preferences(store: &PreferencesStore) -> Preferences {
    match store.load() {
        Ok(preferences) => preferences,
        Err(err) => {
            warn!(path = %store.path().display(), "Ignoring unreadable preferences: {}", err);
            Preferences::default()
        }
    }
}

fn resolve_bindings(preferences: &Preferences) -> Vec<HotKeyBinding> {
    match preferences.bindings() {
        Ok(bindings) => bindings,
        Err(err) => {
            warn!("Invalid hot key table, using defaults: {}", err);
            HotKeyBinding::defaults()
        }
    }
}

/// Run the menu bar app until the user quits
pub fn run(services: CentreServices) -> Result<()> {
    info!("Centre v{} starting", env!("CARGO_PKG_VERSION"));

    #[cfg(target_os = "macos")]
    {
        app::run(Arc::new(services))
    }

    #[cfg(not(target_os = "macos"))]
    {
        drop(services);
        Err(CentreError::MacOSAPIError("The menu bar app requires macOS".to_string()).into())
    }
}

#[cfg(target_os = "macos")]
mod app {
    use super::CentreServices;
    use crate::macos::HotKeyCenter;
    use crate::ui::StatusBarMenu;
    use crate::Result;
    use cocoa::appkit::{NSApp, NSApplication, NSApplicationActivationPolicy};
    use cocoa::base::nil;
    use cocoa::foundation::NSAutoreleasePool;
    use std::sync::Arc;
    use tracing::{debug, info, warn};

    pub(super) fn run(services: Arc<CentreServices>) -> Result<()> {
        unsafe {
            let _pool = NSAutoreleasePool::new(nil);
            let app = NSApp();
            app.setActivationPolicy_(
                NSApplicationActivationPolicy::NSApplicationActivationPolicyAccessory,
            );

            // Prompts on first launch, as "Verify Permission" does later
            let status = services.permissions.verify();
            if !status.is_granted() {
                warn!("{}", services.permissions.instructions());
            }

            let dispatch = services.clone();
            let mut hot_keys = HotKeyCenter::new(Box::new(move |id| {
                match dispatch.handle_hot_key(id) {
                    Some(Ok(report)) => debug!(id, ?report, "Hot key handled"),
                    Some(Err(err)) => debug!(id, "Hot key action failed: {}", err),
                    None => {}
                }
            }))?;

            for (id, binding) in services.keyboard.bindings() {
                if let Err(err) = hot_keys.register(id, &binding.shortcut) {
                    warn!(action = %binding.action, "Failed to register hot key: {}", err);
                }
            }
            info!(count = hot_keys.registered_count(), "Global hot keys active");

            let menu = StatusBarMenu::install(Arc::new(services.menu_controller()))?;

            info!("Centre is ready");
            app.run();

            drop(menu);
            drop(hot_keys);
        }

        info!("Centre stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macos::accessibility::{AXWindow, InMemoryAccessibilityProvider};
    use crate::macos::display::{InMemoryDisplayProvider, ScreenInfo};
    use crate::models::action::CentreAction;
    use crate::models::geometry::{Point, Rect};
    use crate::permissions::test_support::FakeProbe;
    use crate::ui::RecordingNotifier;
    use tempfile::TempDir;

    fn services(dir: &TempDir, preferences: Preferences, trusted: bool) -> (CentreServices, Arc<InMemoryAccessibilityProvider>) {
        let accessibility = Arc::new(InMemoryAccessibilityProvider::new_with(vec![AXWindow::new(
            7,
            70,
            "Terminal",
            "Terminal",
            Rect::new(0.0, 0.0, 800.0, 600.0),
        )]));
        let probe = Arc::new(FakeProbe::default());
        probe.set_trusted(trusted);

        let providers = Providers {
            accessibility: accessibility.clone(),
            displays: Arc::new(InMemoryDisplayProvider::new_with(Some(ScreenInfo::new(
                Rect::new(0.0, 0.0, 1440.0, 900.0),
                Rect::new(0.0, 25.0, 1440.0, 875.0),
            )))),
            notifier: Arc::new(RecordingNotifier::new()),
            permissions: probe,
        };

        let services = CentreServices::new(
            PreferencesStore::at(dir.path()),
            preferences,
            providers,
            None,
        );
        (services, accessibility)
    }

    #[test]
    fn registers_default_hot_keys() {
        let dir = TempDir::new().unwrap();
        let (services, _) = services(&dir, Preferences::default(), true);

        let actions: Vec<CentreAction> = services.bindings().iter().map(|b| b.action).collect();
        assert_eq!(actions.len(), 6);
        for action in CentreAction::ALL {
            assert!(actions.contains(&action));
        }
    }

    #[test]
    fn invalid_hot_key_table_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let mut preferences = Preferences::default();
        preferences
            .hotkeys
            .insert("centre-active".to_string(), "not a shortcut".to_string());

        let (services, _) = services(&dir, preferences, true);
        assert_eq!(services.bindings(), HotKeyBinding::defaults());
    }

    #[test]
    fn hot_key_centres_after_permission_verified() {
        let dir = TempDir::new().unwrap();
        let (services, accessibility) = services(&dir, Preferences::default(), true);
        let (id, _) = services
            .keyboard
            .bindings()
            .into_iter()
            .find(|(_, binding)| binding.action == CentreAction::CENTRE_ACTIVE)
            .unwrap();

        // Permission is unknown until verified
        assert!(services.handle_hot_key(id).unwrap().is_err());
        assert_eq!(accessibility.window(7).unwrap().frame.origin, Point::new(0.0, 0.0));

        services.permissions.verify();
        let report = services.handle_hot_key(id).unwrap().unwrap();
        assert_eq!(report.moved, 1);
        assert_eq!(
            accessibility.window(7).unwrap().frame.origin,
            Point::new(320.0, 25.0 + 875.0 / 2.0 - 300.0)
        );
    }

    #[test]
    fn unknown_hot_key_is_ignored() {
        let dir = TempDir::new().unwrap();
        let (services, _) = services(&dir, Preferences::default(), true);
        assert!(services.handle_hot_key(999).is_none());
    }

    #[test]
    fn unreadable_preferences_use_defaults() {
        let dir = TempDir::new().unwrap();
        let store = PreferencesStore::at(dir.path());
        std::fs::write(store.path(), "visible_frame_only = \"sometimes\"").unwrap();

        assert_eq!(load_preferences(&store), Preferences::default());
    }
}
