//! User-facing error feedback
//!
//! Centre has two ways to tell the user that something went wrong: a modal
//! alert for failures to acquire the screen or window list, and a short
//! system sound when there is simply nothing to centre.

use std::sync::Mutex;
use tracing::{error, warn};

/// Default title of error alerts
pub const DEFAULT_ALERT_TITLE: &str = "Centre: Error";

/// Default system sound played for target-unavailable failures
pub const DEFAULT_ERROR_SOUND: &str = "Purr";

/// Sink for error feedback
pub trait Notifier: Send + Sync {
    /// Show a blocking alert
    fn error_modal(&self, message: &str, description: &str);

    /// Play the error cue
    fn error_sound(&self);
}

/// Notifier that only writes to the log; used by the CLI and off macOS
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn error_modal(&self, message: &str, description: &str) {
        error!(message, description, "Centre error");
    }

    fn error_sound(&self) {
        warn!("Nothing to centre");
    }
}

/// Feedback captured by [`RecordingNotifier`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Modal { message: String, description: String },
    Sound,
}

/// Notifier that remembers every call, for tests and dry runs
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn modal_count(&self) -> usize {
        self.notifications()
            .iter()
            .filter(|n| matches!(n, Notification::Modal { .. }))
            .count()
    }

    pub fn sound_count(&self) -> usize {
        self.notifications()
            .iter()
            .filter(|n| matches!(n, Notification::Sound))
            .count()
    }

    fn push(&self, notification: Notification) {
        if let Ok(mut guard) = self.notifications.lock() {
            guard.push(notification);
        }
    }
}

impl Notifier for RecordingNotifier {
    fn error_modal(&self, message: &str, description: &str) {
        self.push(Notification::Modal {
            message: message.to_string(),
            description: description.to_string(),
        });
    }

    fn error_sound(&self) {
        self.push(Notification::Sound);
    }
}

#[cfg(target_os = "macos")]
pub use system::SystemNotifier;

#[cfg(target_os = "macos")]
mod system {
    use super::Notifier;
    use cocoa::base::{id, nil, BOOL, YES};
    use cocoa::foundation::{NSAutoreleasePool, NSString};
    use objc::{class, msg_send, sel, sel_impl};
    use tracing::{debug, warn};

    /// Notifier backed by `NSAlert` and `NSSound`; main thread only
    #[derive(Debug, Clone)]
    pub struct SystemNotifier {
        sound_name: String,
    }

    impl SystemNotifier {
        pub fn new(sound_name: impl Into<String>) -> Self {
            Self {
                sound_name: sound_name.into(),
            }
        }
    }

    impl Default for SystemNotifier {
        fn default() -> Self {
            Self::new(super::DEFAULT_ERROR_SOUND)
        }
    }

    impl Notifier for SystemNotifier {
        fn error_modal(&self, message: &str, description: &str) {
            warn!(message, description, "Presenting error alert");
            unsafe {
                let pool = NSAutoreleasePool::new(nil);

                let alert: id = msg_send![class!(NSAlert), new];
                let ns_message = NSString::alloc(nil).init_str(message).autorelease();
                let ns_description = NSString::alloc(nil).init_str(description).autorelease();
                let _: () = msg_send![alert, setMessageText: ns_message];
                let _: () = msg_send![alert, setInformativeText: ns_description];

                let symbol = NSString::alloc(nil)
                    .init_str("exclamationmark.circle")
                    .autorelease();
                let image: id = msg_send![
                    class!(NSImage),
                    imageWithSystemSymbolName: symbol
                    accessibilityDescription: nil
                ];
                if image != nil {
                    let _: () = msg_send![alert, setIcon: image];
                }

                // A menu bar app is never active on its own; bring the alert forward
                let app: id = msg_send![class!(NSApplication), sharedApplication];
                let _: () = msg_send![app, activateIgnoringOtherApps: YES];
                let _: isize = msg_send![alert, runModal];
                let _: () = msg_send![alert, release];

                pool.drain();
            }
        }

        fn error_sound(&self) {
            unsafe {
                let pool = NSAutoreleasePool::new(nil);
                let name = NSString::alloc(nil).init_str(&self.sound_name).autorelease();
                let sound: id = msg_send![class!(NSSound), soundNamed: name];
                if sound == nil {
                    debug!(sound = %self.sound_name, "System sound not found");
                } else {
                    let _: BOOL = msg_send![sound, play];
                }
                pool.drain();
            }
        }
    }
}
