//! Centre - Window Centring for the macOS Menu Bar
//!
//! Centre moves the active window, or every visible window, so that its
//! midpoint sits on the midpoint of the main screen. Actions are bound to
//! global hot keys and mirrored in a status bar menu.

pub mod cli;
pub mod config;
pub mod lifecycle;
pub mod logging;
pub mod macos;
pub mod models;
pub mod permissions;
pub mod services;
pub mod ui;

pub use models::*;
pub use services::*;

/// Result type alias for Centre operations
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to Centre operations
#[derive(thiserror::Error, Debug)]
pub enum CentreError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Accessibility element unavailable: {0}")]
    ElementUnavailable(String),

    #[error("The main screen could not be acquired")]
    ScreenUnavailable,

    #[error("The currently-open windows could not be acquired: {0}")]
    WindowListUnavailable(String),

    #[error("No active window to centre")]
    NoActiveWindow,

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("macOS API error: {0}")]
    MacOSAPIError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}
