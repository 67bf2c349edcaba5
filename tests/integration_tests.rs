//! Integration tests for Centre
//! Drives the public API with in-memory platform providers.

use centre::config::{Preferences, PreferencesStore};
use centre::lifecycle::{CentreServices, Providers};
use centre::macos::{
    AXWindow, AccessibilityProvider, InMemoryAccessibilityProvider, InMemoryDisplayProvider,
    ScreenInfo, WindowFilter,
};
use centre::permissions::{PermissionProbe, PermissionStatus};
use centre::ui::{MenuCommand, MenuOutcome, Notification, RecordingNotifier};
use centre::{Axes, CentreAction, CentreError, Point, Rect, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

struct StaticProbe(AtomicBool);

impl PermissionProbe for StaticProbe {
    fn is_trusted(&self) -> Result<bool> {
        Ok(self.0.load(Ordering::SeqCst))
    }

    fn prompt(&self) -> Result<bool> {
        self.is_trusted()
    }

    fn open_settings(&self) -> Result<()> {
        Ok(())
    }
}

struct Harness {
    _dir: TempDir,
    accessibility: Arc<InMemoryAccessibilityProvider>,
    displays: Arc<InMemoryDisplayProvider>,
    notifier: Arc<RecordingNotifier>,
    services: CentreServices,
}

/// 1440x900 laptop screen with a 25pt menu bar and a 70pt dock
fn laptop() -> ScreenInfo {
    ScreenInfo::new(
        Rect::new(0.0, 0.0, 1440.0, 900.0),
        Rect::new(0.0, 25.0, 1440.0, 805.0),
    )
}

fn harness(windows: Vec<AXWindow>) -> Harness {
    let dir = TempDir::new().unwrap();
    let accessibility = Arc::new(InMemoryAccessibilityProvider::new_with(windows));
    let displays = Arc::new(InMemoryDisplayProvider::new_with(Some(laptop())));
    let notifier = Arc::new(RecordingNotifier::new());

    let providers = Providers {
        accessibility: accessibility.clone(),
        displays: displays.clone(),
        notifier: notifier.clone(),
        permissions: Arc::new(StaticProbe(AtomicBool::new(true))),
    };
    let services = CentreServices::new(
        PreferencesStore::at(dir.path()),
        Preferences::default(),
        providers,
        None,
    );
    services.permissions.verify();

    Harness {
        _dir: dir,
        accessibility,
        displays,
        notifier,
        services,
    }
}

fn desktop() -> Vec<AXWindow> {
    vec![
        AXWindow::new(1, 501, "Inbox", "Mail", Rect::new(12.0, 40.0, 900.0, 600.0)),
        AXWindow::new(2, 501, "Draft", "Mail", Rect::new(300.0, 200.0, 500.0, 400.0)),
        AXWindow::new(3, 733, "notes.md", "Editor", Rect::new(700.0, 90.0, 1200.0, 860.0)),
    ]
}

mod contract {
    //! Behaviour every accessibility provider must show

    use super::*;

    #[test]
    fn list_windows_honours_process_filter() {
        let provider = InMemoryAccessibilityProvider::new_with(desktop());

        let all = provider.list_windows(WindowFilter::All).unwrap();
        assert_eq!(all.len(), 3);

        let mail = provider.list_windows(WindowFilter::Process(501)).unwrap();
        assert_eq!(mail.iter().map(|w| w.window_id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn set_window_position_updates_frame() {
        let provider = InMemoryAccessibilityProvider::new_with(desktop());
        provider.set_window_position(3, Point::new(5.0, 6.0)).unwrap();

        let frame = provider.window_frame(3).unwrap();
        assert_eq!(frame.origin, Point::new(5.0, 6.0));
        assert_eq!(frame.size.width, 1200.0);
    }

    #[test]
    fn set_window_position_reports_unavailable_element() {
        let provider = InMemoryAccessibilityProvider::new_with(desktop());
        provider.mark_unavailable(2);

        let err = provider.set_window_position(2, Point::new(0.0, 0.0)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CentreError>(),
            Some(CentreError::ElementUnavailable(_))
        ));
    }

    #[test]
    fn set_window_position_requires_permission() {
        let provider = InMemoryAccessibilityProvider::new_with(desktop());
        provider.set_permission_status(PermissionStatus::Denied);

        let err = provider.set_window_position(1, Point::new(0.0, 0.0)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CentreError>(),
            Some(CentreError::PermissionDenied(_))
        ));
    }
}

mod integration {
    use super::*;

    #[test]
    fn centre_visible_windows_in_visible_frame() {
        let h = harness(desktop());
        let report = h.services.centrer.perform(CentreAction::CENTRE_VISIBLE).unwrap();
        assert_eq!(report.moved, 3);

        let visible = laptop().visible_frame;
        for id in [1, 2, 3] {
            let frame = h.accessibility.window(id).unwrap().frame;
            assert!((frame.mid_x() - visible.mid_x()).abs() < 1e-9);
            assert!((frame.mid_y() - visible.mid_y()).abs() < 1e-9);
        }
        assert!(h.notifier.notifications().is_empty());
    }

    #[test]
    fn oversized_window_is_centred_off_screen() {
        let h = harness(desktop());
        h.services
            .centrer
            .centre_active_window(Axes::BOTH)
            .unwrap();
        h.services.centrer.centre_visible_windows(Axes::VERTICAL).unwrap();

        // notes.md is taller than the visible frame
        let notes = h.accessibility.window(3).unwrap().frame;
        assert_eq!(notes.origin.y, 25.0 + 805.0 / 2.0 - 430.0);
        assert!(notes.min_y() < 25.0);
    }

    #[test]
    fn horizontal_then_vertical_equals_both() {
        let split = harness(desktop());
        split.services.centrer.centre_visible_windows(Axes::HORIZONTAL).unwrap();
        split.services.centrer.centre_visible_windows(Axes::VERTICAL).unwrap();

        let both = harness(desktop());
        both.services.centrer.centre_visible_windows(Axes::BOTH).unwrap();

        for id in [1, 2, 3] {
            assert_eq!(
                split.accessibility.window(id).unwrap().frame,
                both.accessibility.window(id).unwrap().frame
            );
        }
    }

    #[test]
    fn menu_toggle_switches_to_full_frame() {
        let h = harness(desktop());
        let controller = h.services.menu_controller();

        assert_eq!(controller.handle(MenuCommand::ToggleVisibleFrame), MenuOutcome::Continue);
        controller.handle(MenuCommand::Centre(CentreAction::CENTRE_ACTIVE_VERTICALLY));

        let inbox = h.accessibility.window(1).unwrap().frame;
        assert_eq!(inbox.origin, Point::new(12.0, 150.0));
        assert!(!h.services.store.load().unwrap().visible_frame_only);
    }

    #[test]
    fn screen_loss_interrupts_with_modal() {
        let h = harness(desktop());
        h.displays.set_screen(None);

        assert!(h.services.centrer.perform(CentreAction::CENTRE_ACTIVE).is_err());
        assert!(matches!(
            h.notifier.notifications().as_slice(),
            [Notification::Modal { description, .. }] if description == "The main screen could not be acquired."
        ));
    }

    #[test]
    fn empty_desktop_plays_sound_for_active_window() {
        let h = harness(Vec::new());

        assert!(h.services.centrer.perform(CentreAction::CENTRE_ACTIVE_HORIZONTALLY).is_err());
        assert_eq!(h.notifier.notifications(), vec![Notification::Sound]);

        // Nothing visible is not an error for the all-windows sweep
        let report = h.services.centrer.perform(CentreAction::CENTRE_VISIBLE).unwrap();
        assert_eq!(report.moved, 0);
        assert_eq!(h.notifier.sound_count(), 1);
    }

    #[test]
    fn hot_key_ids_drive_matching_actions() {
        let h = harness(desktop());

        for (id, binding) in h.services.keyboard.bindings() {
            let report = h.services.handle_hot_key(id).unwrap().unwrap();
            let expected = match binding.action.target {
                centre::WindowTarget::ActiveWindow => 1,
                centre::WindowTarget::VisibleWindows => 3,
            };
            assert_eq!(report.moved, expected, "{}", binding.action);
        }

        assert_eq!(h.services.centrer.metrics().operations, 6);
    }
}
