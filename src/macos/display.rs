use crate::models::geometry::Rect;
use crate::{CentreError, Result};
use std::sync::RwLock;

/// Geometry of the screen that currently holds keyboard focus.
///
/// Both rectangles are in top-left (accessibility) coordinates, so they can
/// be compared directly with window frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenInfo {
    /// Whole screen
    pub frame: Rect,
    /// Screen minus the menu bar and the dock
    pub visible_frame: Rect,
}

impl ScreenInfo {
    pub fn new(frame: Rect, visible_frame: Rect) -> Self {
        Self {
            frame,
            visible_frame,
        }
    }

    /// Build from AppKit's bottom-left rectangles, flipping against the
    /// height of the primary screen (the one holding the menu bar).
    pub fn from_cocoa(frame: Rect, visible_frame: Rect, primary_height: f64) -> Self {
        Self {
            frame: frame.flip_y(primary_height),
            visible_frame: visible_frame.flip_y(primary_height),
        }
    }

    /// The rectangle windows are centred within
    pub fn reference_rect(&self, visible_frame_only: bool) -> Rect {
        if visible_frame_only {
            self.visible_frame
        } else {
            self.frame
        }
    }
}

/// Abstraction over AppKit screen queries
pub trait DisplayProvider: Send + Sync {
    /// The main screen, or `None` when AppKit has none to offer
    fn main_screen(&self) -> Result<Option<ScreenInfo>>;
}

/// Display provider with a fixed, settable screen
#[derive(Debug, Default)]
pub struct InMemoryDisplayProvider {
    screen: RwLock<Option<ScreenInfo>>,
}

impl InMemoryDisplayProvider {
    pub fn new_with(screen: Option<ScreenInfo>) -> Self {
        Self {
            screen: RwLock::new(screen),
        }
    }

    pub fn set_screen(&self, screen: Option<ScreenInfo>) {
        if let Ok(mut guard) = self.screen.write() {
            *guard = screen;
        }
    }
}

impl DisplayProvider for InMemoryDisplayProvider {
    fn main_screen(&self) -> Result<Option<ScreenInfo>> {
        self.screen
            .read()
            .map(|screen| *screen)
            .map_err(|_| CentreError::MacOSAPIError("display provider lock poisoned".into()).into())
    }
}

#[cfg(target_os = "macos")]
pub use system::SystemDisplayProvider;

#[cfg(target_os = "macos")]
mod system {
    use super::{DisplayProvider, ScreenInfo};
    use crate::models::geometry::Rect;
    use crate::Result;
    use cocoa::appkit::NSScreen;
    use cocoa::base::{id, nil};
    use cocoa::foundation::{NSArray, NSAutoreleasePool, NSRect};
    use tracing::trace;

    fn to_rect(rect: NSRect) -> Rect {
        Rect::new(rect.origin.x, rect.origin.y, rect.size.width, rect.size.height)
    }

    /// Reads `NSScreen.mainScreen`; must be called on the main thread
    #[derive(Debug, Default, Clone, Copy)]
    pub struct SystemDisplayProvider;

    impl SystemDisplayProvider {
        pub fn new() -> Self {
            Self
        }
    }

    impl DisplayProvider for SystemDisplayProvider {
        fn main_screen(&self) -> Result<Option<ScreenInfo>> {
            unsafe {
                let pool = NSAutoreleasePool::new(nil);

                let main: id = NSScreen::mainScreen(nil);
                let screens: id = NSScreen::screens(nil);
                let info = if main == nil || screens == nil || screens.count() == 0 {
                    None
                } else {
                    let primary: id = screens.objectAtIndex(0);
                    let primary_height = NSScreen::frame(primary).size.height;
                    Some(ScreenInfo::from_cocoa(
                        to_rect(NSScreen::frame(main)),
                        to_rect(NSScreen::visibleFrame(main)),
                        primary_height,
                    ))
                };

                pool.drain();
                trace!(?info, "Queried main screen");
                Ok(info)
            }
        }
    }
}
