//! User interface components for Centre
//!
//! The status bar menu and the error feedback shown to the user.

pub mod alerts;
pub mod menu_bar;

pub use alerts::*;
pub use menu_bar::*;
