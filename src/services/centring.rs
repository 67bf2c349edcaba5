use crate::config::PreferencesHandle;
use crate::macos::accessibility::{AXWindow, AccessibilityProvider, WindowFilter};
use crate::macos::display::{DisplayProvider, ScreenInfo};
use crate::models::action::{CentreAction, WindowTarget};
use crate::models::geometry::{Axes, Axis, Point, Rect};
use crate::ui::alerts::{Notifier, DEFAULT_ALERT_TITLE};
use crate::{CentreError, Result};
use serde::Serialize;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, instrument, warn};

pub const SCREEN_UNAVAILABLE: &str = "The main screen could not be acquired.";
pub const WINDOWS_UNAVAILABLE: &str = "The currently-open windows could not be acquired.";

/// Position that centres `window` within `reference` on the requested axes.
///
/// Both rectangles must be in the same coordinate space. Axes not in `axes`
/// keep the window's current coordinate.
pub fn centre_position(window: Rect, reference: Rect, axes: Axes) -> Point {
    let x = if axes.contains(Axis::Horizontal) {
        reference.mid_x() - window.size.width / 2.0
    } else {
        window.origin.x
    };

    let y = if axes.contains(Axis::Vertical) {
        reference.mid_y() - window.size.height / 2.0
    } else {
        window.origin.y
    };

    Point::new(x, y)
}

/// Outcome of one centring operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CentreReport {
    pub moved: usize,
    pub failed: usize,
}

/// Telemetry for centring operations
#[derive(Debug, Default, Clone, Serialize)]
pub struct WindowCentrerMetrics {
    pub operations: u64,
    pub windows_moved: u64,
    pub move_failures: u64,
    pub alerts_shown: u64,
    pub sounds_played: u64,
}

/// Moves windows to the middle of the main screen
pub struct WindowCentrer {
    accessibility: Arc<dyn AccessibilityProvider>,
    displays: Arc<dyn DisplayProvider>,
    notifier: Arc<dyn Notifier>,
    preferences: PreferencesHandle,
    metrics: RwLock<WindowCentrerMetrics>,
}

impl WindowCentrer {
    pub fn new(
        accessibility: Arc<dyn AccessibilityProvider>,
        displays: Arc<dyn DisplayProvider>,
        notifier: Arc<dyn Notifier>,
        preferences: PreferencesHandle,
    ) -> Self {
        Self {
            accessibility,
            displays,
            notifier,
            preferences,
            metrics: RwLock::new(WindowCentrerMetrics::default()),
        }
    }

    /// Run a menu or hot key action
    pub fn perform(&self, action: CentreAction) -> Result<CentreReport> {
        match action.target {
            WindowTarget::ActiveWindow => self.centre_active_window(action.axes),
            WindowTarget::VisibleWindows => self.centre_visible_windows(action.axes),
        }
    }

    /// Centre the first window of the frontmost application
    #[instrument(skip(self, axes), fields(axes = %axes))]
    pub fn centre_active_window(&self, axes: Axes) -> Result<CentreReport> {
        self.begin_operation()?;

        let window = match self.active_window() {
            Ok(Some(window)) => window,
            Ok(None) => {
                debug!("No active window");
                self.play_error_sound();
                return Err(CentreError::NoActiveWindow.into());
            }
            Err(err) => {
                debug!("Active window lookup failed: {}", err);
                self.play_error_sound();
                return Err(err);
            }
        };

        let reference = self.reference_rect()?;
        Ok(self.centre_windows(std::slice::from_ref(&window), reference, axes))
    }

    /// Centre every visible window
    #[instrument(skip(self, axes), fields(axes = %axes))]
    pub fn centre_visible_windows(&self, axes: Axes) -> Result<CentreReport> {
        self.begin_operation()?;

        let windows = match self.accessibility.list_windows(WindowFilter::All) {
            Ok(windows) => windows,
            Err(err) => {
                warn!("Window enumeration failed: {}", err);
                self.show_error(WINDOWS_UNAVAILABLE);
                return Err(CentreError::WindowListUnavailable(err.to_string()).into());
            }
        };

        // The screen is only acquired once there is something to move
        if windows.is_empty() {
            debug!("No visible windows to centre");
            return Ok(CentreReport::default());
        }

        let reference = self.reference_rect()?;
        Ok(self.centre_windows(&windows, reference, axes))
    }

    /// Windows that a "visible windows" action would touch
    pub fn visible_windows(&self) -> Result<Vec<AXWindow>> {
        self.accessibility.list_windows(WindowFilter::All)
    }

    pub fn metrics(&self) -> WindowCentrerMetrics {
        self.metrics
            .read()
            .map(|metrics| metrics.clone())
            .unwrap_or_default()
    }

    fn begin_operation(&self) -> Result<()> {
        self.record(|metrics| metrics.operations += 1);
        self.accessibility.ensure_permissions()
    }

    fn active_window(&self) -> Result<Option<AXWindow>> {
        let Some(pid) = self.accessibility.frontmost_pid()? else {
            return Ok(None);
        };

        let windows = self.accessibility.list_windows(WindowFilter::Process(pid))?;
        Ok(windows.into_iter().next())
    }

    /// Screen rectangle selected by the visible-frame preference, read once
    /// per operation
    fn reference_rect(&self) -> Result<Rect> {
        let screen: Option<ScreenInfo> = match self.displays.main_screen() {
            Ok(screen) => screen,
            Err(err) => {
                warn!("Main screen query failed: {}", err);
                None
            }
        };

        match screen {
            Some(screen) => Ok(screen.reference_rect(self.preferences.visible_frame_only())),
            None => {
                self.show_error(SCREEN_UNAVAILABLE);
                Err(CentreError::ScreenUnavailable.into())
            }
        }
    }

    fn centre_windows(&self, windows: &[AXWindow], reference: Rect, axes: Axes) -> CentreReport {
        let mut report = CentreReport::default();

        for window in windows {
            let target = centre_position(window.frame, reference, axes);
            match self.accessibility.set_window_position(window.window_id, target) {
                Ok(()) => {
                    debug!(
                        window = window.window_id,
                        app = %window.application_name,
                        x = target.x,
                        y = target.y,
                        "Centred window"
                    );
                    report.moved += 1;
                }
                Err(err) => {
                    warn!(
                        window = window.window_id,
                        app = %window.application_name,
                        "Failed to move window: {}",
                        err
                    );
                    report.failed += 1;
                }
            }
        }

        self.record(|metrics| {
            metrics.windows_moved += report.moved as u64;
            metrics.move_failures += report.failed as u64;
        });
        info!(moved = report.moved, failed = report.failed, reference = %reference, "Centring finished");
        report
    }

    fn show_error(&self, description: &str) {
        self.record(|metrics| metrics.alerts_shown += 1);
        self.notifier.error_modal(DEFAULT_ALERT_TITLE, description);
    }

    fn play_error_sound(&self) {
        self.record(|metrics| metrics.sounds_played += 1);
        self.notifier.error_sound();
    }

    fn record(&self, f: impl FnOnce(&mut WindowCentrerMetrics)) {
        if let Ok(mut metrics) = self.metrics.write() {
            f(&mut metrics);
        }
    }
}
