use crate::models::action::CentreAction;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Modifier keys, declared in the order macOS draws them in menus
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModifierKey {
    /// Control key (⌃)
    Control,
    /// Option/Alt key (⌥)
    Option,
    /// Shift key (⇧)
    Shift,
    /// Command key (⌘)
    Command,
}

impl ModifierKey {
    fn glyph(self) -> &'static str {
        match self {
            ModifierKey::Control => "⌃",
            ModifierKey::Option => "⌥",
            ModifierKey::Shift => "⇧",
            ModifierKey::Command => "⌘",
        }
    }

    fn token(self) -> &'static str {
        match self {
            ModifierKey::Control => "ctrl",
            ModifierKey::Option => "opt",
            ModifierKey::Shift => "shift",
            ModifierKey::Command => "cmd",
        }
    }

    fn parse_token(token: &str) -> Option<Self> {
        match token {
            "cmd" | "command" | "⌘" | "super" => Some(ModifierKey::Command),
            "opt" | "option" | "alt" | "⌥" => Some(ModifierKey::Option),
            "ctrl" | "control" | "⌃" => Some(ModifierKey::Control),
            "shift" | "⇧" => Some(ModifierKey::Shift),
            _ => None,
        }
    }

    /// Carbon `EventModifiers` bit used by `RegisterEventHotKey`
    pub fn carbon_mask(self) -> u32 {
        match self {
            ModifierKey::Command => 1 << 8,
            ModifierKey::Shift => 1 << 9,
            ModifierKey::Option => 1 << 11,
            ModifierKey::Control => 1 << 12,
        }
    }

    /// `NSEventModifierFlags` bit used for menu key equivalents
    pub fn cocoa_mask(self) -> u64 {
        match self {
            ModifierKey::Shift => 1 << 17,
            ModifierKey::Control => 1 << 18,
            ModifierKey::Option => 1 << 19,
            ModifierKey::Command => 1 << 20,
        }
    }
}

/// Keys a global shortcut can be bound to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Key {
    /// Letter keys a-z, stored lowercase
    Letter(char),
    /// Number keys 0-9
    Number(u8),
}

impl Key {
    /// ANSI virtual key code from `HIToolbox/Events.h`
    pub fn virtual_key_code(self) -> Option<u32> {
        let code = match self {
            Key::Letter(c) => match c {
                'a' => 0x00,
                's' => 0x01,
                'd' => 0x02,
                'f' => 0x03,
                'h' => 0x04,
                'g' => 0x05,
                'z' => 0x06,
                'x' => 0x07,
                'c' => 0x08,
                'v' => 0x09,
                'b' => 0x0B,
                'q' => 0x0C,
                'w' => 0x0D,
                'e' => 0x0E,
                'r' => 0x0F,
                'y' => 0x10,
                't' => 0x11,
                'o' => 0x1F,
                'u' => 0x20,
                'i' => 0x22,
                'p' => 0x23,
                'l' => 0x25,
                'j' => 0x26,
                'k' => 0x28,
                'n' => 0x2D,
                'm' => 0x2E,
                _ => return None,
            },
            Key::Number(n) => match n {
                1 => 0x12,
                2 => 0x13,
                3 => 0x14,
                4 => 0x15,
                6 => 0x16,
                5 => 0x17,
                9 => 0x19,
                7 => 0x1A,
                8 => 0x1C,
                0 => 0x1D,
                _ => return None,
            },
        };
        Some(code)
    }

    /// Character used as an `NSMenuItem` key equivalent
    pub fn key_equivalent(self) -> String {
        match self {
            Key::Letter(c) => c.to_string(),
            Key::Number(n) => n.to_string(),
        }
    }
}

/// Complete keyboard shortcut combination
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ShortcutCombination {
    /// Modifier keys that must be held, sorted and de-duplicated
    pub modifiers: Vec<ModifierKey>,
    /// Primary key to press
    pub key: Key,
}

impl ShortcutCombination {
    pub fn new(modifiers: Vec<ModifierKey>, key: Key) -> Self {
        let mut sorted_modifiers = modifiers;
        sorted_modifiers.sort();
        sorted_modifiers.dedup();

        let key = match key {
            Key::Letter(c) => Key::Letter(c.to_ascii_lowercase()),
            other => other,
        };

        ShortcutCombination {
            modifiers: sorted_modifiers,
            key,
        }
    }

    /// Validate the shortcut combination
    pub fn validate(&self) -> Result<(), ShortcutError> {
        match self.key {
            Key::Letter(c) if !c.is_ascii_alphabetic() => return Err(ShortcutError::InvalidKey),
            Key::Number(n) if n > 9 => return Err(ShortcutError::InvalidKey),
            _ => {}
        }

        // Global shortcuts without a modifier would swallow ordinary typing
        if self.modifiers.is_empty() {
            return Err(ShortcutError::NoModifiers);
        }

        Ok(())
    }

    pub fn has_modifier(&self, modifier: ModifierKey) -> bool {
        self.modifiers.contains(&modifier)
    }

    pub fn carbon_modifiers(&self) -> u32 {
        self.modifiers
            .iter()
            .fold(0, |mask, modifier| mask | modifier.carbon_mask())
    }

    pub fn cocoa_modifiers(&self) -> u64 {
        self.modifiers
            .iter()
            .fold(0, |mask, modifier| mask | modifier.cocoa_mask())
    }

    /// Canonical textual form, e.g. `opt+shift+cmd+h`
    pub fn to_config_string(&self) -> String {
        let mut parts: Vec<String> = self
            .modifiers
            .iter()
            .map(|m| m.token().to_string())
            .collect();
        parts.push(self.key.key_equivalent());
        parts.join("+")
    }
}

impl FromStr for ShortcutCombination {
    type Err = ShortcutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<String> = s
            .split('+')
            .map(|token| token.trim().to_lowercase())
            .filter(|token| !token.is_empty())
            .collect();

        let (key_token, modifier_tokens) = tokens
            .split_last()
            .ok_or_else(|| ShortcutError::Unparseable(s.to_string()))?;

        let mut modifiers = Vec::with_capacity(modifier_tokens.len());
        for token in modifier_tokens {
            let modifier = ModifierKey::parse_token(token)
                .ok_or_else(|| ShortcutError::UnknownModifier(token.clone()))?;
            modifiers.push(modifier);
        }

        let mut chars = key_token.chars();
        let key = match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_digit() => Key::Number(c as u8 - b'0'),
            (Some(c), None) if c.is_ascii_alphabetic() => Key::Letter(c),
            _ => return Err(ShortcutError::InvalidKey),
        };

        let combination = ShortcutCombination::new(modifiers, key);
        combination.validate()?;
        Ok(combination)
    }
}

impl fmt::Display for ShortcutCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let modifiers: String = self.modifiers.iter().map(|m| m.glyph()).collect();
        let key = match self.key {
            Key::Letter(c) => c.to_ascii_uppercase().to_string(),
            Key::Number(n) => n.to_string(),
        };
        write!(f, "{}{}", modifiers, key)
    }
}

/// Global hot key bound to a centring action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotKeyBinding {
    pub action: CentreAction,
    pub shortcut: ShortcutCombination,
}

impl HotKeyBinding {
    pub fn new(action: CentreAction, shortcut: ShortcutCombination) -> Self {
        Self { action, shortcut }
    }

    /// Bindings shipped with Centre: ⌥⌘ plus 0/H/V for the active window,
    /// with ⇧ added for every visible window.
    pub fn defaults() -> Vec<HotKeyBinding> {
        use ModifierKey::{Command, Option, Shift};

        let base = vec![Command, Option];
        let shifted = vec![Command, Option, Shift];

        vec![
            HotKeyBinding::new(
                CentreAction::CENTRE_ACTIVE,
                ShortcutCombination::new(base.clone(), Key::Number(0)),
            ),
            HotKeyBinding::new(
                CentreAction::CENTRE_VISIBLE,
                ShortcutCombination::new(shifted.clone(), Key::Number(0)),
            ),
            HotKeyBinding::new(
                CentreAction::CENTRE_ACTIVE_HORIZONTALLY,
                ShortcutCombination::new(base.clone(), Key::Letter('h')),
            ),
            HotKeyBinding::new(
                CentreAction::CENTRE_VISIBLE_HORIZONTALLY,
                ShortcutCombination::new(shifted.clone(), Key::Letter('h')),
            ),
            HotKeyBinding::new(
                CentreAction::CENTRE_ACTIVE_VERTICALLY,
                ShortcutCombination::new(base, Key::Letter('v')),
            ),
            HotKeyBinding::new(
                CentreAction::CENTRE_VISIBLE_VERTICALLY,
                ShortcutCombination::new(shifted, Key::Letter('v')),
            ),
        ]
    }

    /// Build bindings from the `[hotkeys]` preferences table. Actions missing
    /// from the table keep their default shortcut.
    pub fn from_table(table: &BTreeMap<String, String>) -> Result<Vec<HotKeyBinding>, ShortcutError> {
        for name in table.keys() {
            name.parse::<CentreAction>()
                .map_err(|_| ShortcutError::UnknownAction(name.clone()))?;
        }

        HotKeyBinding::defaults()
            .into_iter()
            .map(|binding| match table.get(binding.action.name()) {
                Some(raw) => Ok(HotKeyBinding::new(binding.action, raw.parse()?)),
                None => Ok(binding),
            })
            .collect()
    }

    /// Inverse of [`HotKeyBinding::from_table`]
    pub fn to_table(bindings: &[HotKeyBinding]) -> BTreeMap<String, String> {
        bindings
            .iter()
            .map(|binding| {
                (
                    binding.action.name().to_string(),
                    binding.shortcut.to_config_string(),
                )
            })
            .collect()
    }
}

/// Errors raised while parsing or registering shortcuts
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ShortcutError {
    #[error("Invalid key specification")]
    InvalidKey,

    #[error("Shortcut must have at least one modifier key")]
    NoModifiers,

    #[error("Unknown modifier key: {0}")]
    UnknownModifier(String),

    #[error("Could not parse shortcut: {0}")]
    Unparseable(String),

    #[error("Unknown action in hot key table: {0}")]
    UnknownAction(String),

    #[error("Conflicting keyboard shortcut: {0}")]
    ConflictingShortcut(String),

    #[error("Shortcut {0} is reserved by the system")]
    Reserved(String),
}
