//! macOS integration layer for Centre
//!
//! These modules wrap the Accessibility, AppKit, Core Graphics and Carbon
//! APIs behind small traits. The concrete implementations talk to the
//! platform while unit tests rely on in-memory providers.

pub mod accessibility;
pub mod display;
pub mod hotkeys;
pub mod permissions;

pub use accessibility::*;
pub use display::*;
pub use hotkeys::*;
pub use permissions::*;
