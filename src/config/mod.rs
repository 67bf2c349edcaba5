//! Configuration management for Centre

pub mod persistence;
pub mod preferences;

pub use persistence::{PreferencesError, PreferencesStore, PreferencesStoreConfig};
pub use preferences::{Preferences, PreferencesHandle};
