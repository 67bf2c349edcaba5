//! Data models for Centre

pub mod action;
pub mod geometry;
pub mod shortcut;

pub use action::*;
pub use geometry::*;
pub use shortcut::*;
