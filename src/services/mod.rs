//! Core services for Centre

pub mod centring;
pub mod keyboard_handler;
pub mod launch_on_login;

pub use centring::*;
pub use keyboard_handler::*;
pub use launch_on_login::*;
