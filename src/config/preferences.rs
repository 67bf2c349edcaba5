use crate::models::shortcut::{HotKeyBinding, ShortcutError};
use crate::ui::alerts::DEFAULT_ERROR_SOUND;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// User preferences persisted between launches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    /// Centre within the visible frame (excluding the menu bar and dock)
    /// instead of the full screen frame
    pub visible_frame_only: bool,
    /// System sound played when there is no window to centre
    pub error_sound: String,
    /// Action name to shortcut string, e.g. `centre-active = "cmd+opt+0"`
    pub hotkeys: BTreeMap<String, String>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            visible_frame_only: true,
            error_sound: DEFAULT_ERROR_SOUND.to_string(),
            hotkeys: HotKeyBinding::to_table(&HotKeyBinding::defaults()),
        }
    }
}

impl Preferences {
    /// Resolve the hot key table into bindings
    pub fn bindings(&self) -> Result<Vec<HotKeyBinding>, ShortcutError> {
        HotKeyBinding::from_table(&self.hotkeys)
    }
}

/// Preferences shared between the menu and the centring service
#[derive(Debug, Clone, Default)]
pub struct PreferencesHandle {
    inner: Arc<RwLock<Preferences>>,
}

impl PreferencesHandle {
    pub fn new(preferences: Preferences) -> Self {
        Self {
            inner: Arc::new(RwLock::new(preferences)),
        }
    }

    /// Copy of the current preferences
    pub fn snapshot(&self) -> Preferences {
        self.inner
            .read()
            .map(|prefs| prefs.clone())
            .unwrap_or_default()
    }

    pub fn visible_frame_only(&self) -> bool {
        self.inner
            .read()
            .map(|prefs| prefs.visible_frame_only)
            .unwrap_or(true)
    }

    pub fn set_visible_frame_only(&self, value: bool) {
        self.update(|prefs| prefs.visible_frame_only = value);
    }

    pub fn update(&self, f: impl FnOnce(&mut Preferences)) {
        if let Ok(mut prefs) = self.inner.write() {
            f(&mut prefs);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipped_behaviour() {
        let prefs = Preferences::default();
        assert!(prefs.visible_frame_only);
        assert_eq!(prefs.error_sound, "Purr");
        assert_eq!(prefs.bindings().unwrap(), HotKeyBinding::defaults());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let prefs: Preferences = toml::from_str("visible_frame_only = false").unwrap();
        assert!(!prefs.visible_frame_only);
        assert_eq!(prefs.hotkeys.len(), 6);
    }

    #[test]
    fn handle_shares_updates() {
        let handle = PreferencesHandle::new(Preferences::default());
        let clone = handle.clone();

        clone.set_visible_frame_only(false);
        assert!(!handle.visible_frame_only());
        assert!(!handle.snapshot().visible_frame_only);
    }
}
