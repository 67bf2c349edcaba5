use crate::models::action::CentreAction;
use crate::models::shortcut::{HotKeyBinding, Key, ModifierKey, ShortcutCombination, ShortcutError};
use crate::{CentreError, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::RwLock;
use tracing::{debug, warn};

/// Identifier handed to the system hot key API
pub type HotKeyId = u32;

/// Event emitted when a registered hot key fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyboardEvent {
    pub id: HotKeyId,
    pub action: CentreAction,
}

/// Metrics for keyboard handler operations
#[derive(Debug, Default, Clone, Serialize)]
pub struct KeyboardHandlerMetrics {
    pub registered_bindings: usize,
    pub triggered_events: u64,
    pub conflicts_prevented: u64,
    pub unknown_events: u64,
}

#[derive(Debug, Default)]
struct Registry {
    next_id: HotKeyId,
    bindings: BTreeMap<HotKeyId, HotKeyBinding>,
}

/// Registry of global hot keys and the actions they trigger
pub struct KeyboardHandler {
    registry: RwLock<Registry>,
    metrics: RwLock<KeyboardHandlerMetrics>,
    reserved_shortcuts: HashSet<ShortcutCombination>,
}

impl KeyboardHandler {
    /// Create a handler that refuses the given reserved shortcuts
    pub fn new(reserved_shortcuts: HashSet<ShortcutCombination>) -> Self {
        Self {
            registry: RwLock::new(Registry {
                next_id: 1,
                bindings: BTreeMap::new(),
            }),
            metrics: RwLock::new(KeyboardHandlerMetrics::default()),
            reserved_shortcuts,
        }
    }

    /// Handler that refuses shortcuts macOS already owns
    pub fn with_system_reserved() -> Self {
        Self::new(system_reserved_shortcuts())
    }

    /// Register a binding and return the id the system should report for it
    pub fn register(&self, binding: HotKeyBinding) -> Result<HotKeyId> {
        binding.shortcut.validate().map_err(convert_shortcut_error)?;

        if self.reserved_shortcuts.contains(&binding.shortcut) {
            warn!(
                shortcut = %binding.shortcut,
                "Shortcut conflicts with macOS reserved combination"
            );
            self.record(|metrics| metrics.conflicts_prevented += 1);
            return Err(convert_shortcut_error(ShortcutError::Reserved(
                binding.shortcut.to_string(),
            )));
        }

        let mut registry = self
            .registry
            .write()
            .map_err(|_| CentreError::ValidationError("hot key registry poisoned".into()))?;

        if let Some(existing) = registry
            .bindings
            .values()
            .find(|existing| existing.shortcut == binding.shortcut)
        {
            warn!(
                shortcut = %binding.shortcut,
                existing = %existing.action,
                "Shortcut already bound"
            );
            self.record(|metrics| metrics.conflicts_prevented += 1);
            return Err(convert_shortcut_error(ShortcutError::ConflictingShortcut(
                binding.shortcut.to_string(),
            )));
        }

        let id = registry.next_id;
        registry.next_id += 1;
        debug!(id, shortcut = %binding.shortcut, action = %binding.action, "Registered hot key");
        registry.bindings.insert(id, binding);

        let count = registry.bindings.len();
        self.record(|metrics| metrics.registered_bindings = count);
        Ok(id)
    }

    /// Register every binding, skipping those that fail
    pub fn register_all(&self, bindings: impl IntoIterator<Item = HotKeyBinding>) -> Vec<HotKeyId> {
        bindings
            .into_iter()
            .filter_map(|binding| {
                let action = binding.action;
                match self.register(binding) {
                    Ok(id) => Some(id),
                    Err(err) => {
                        warn!(action = %action, "Skipping hot key: {}", err);
                        None
                    }
                }
            })
            .collect()
    }

    /// Resolve a hot key id reported by the system
    pub fn handle_hot_key(&self, id: HotKeyId) -> Option<KeyboardEvent> {
        let action = self
            .registry
            .read()
            .ok()
            .and_then(|registry| registry.bindings.get(&id).map(|binding| binding.action));

        match action {
            Some(action) => {
                self.record(|metrics| metrics.triggered_events += 1);
                Some(KeyboardEvent { id, action })
            }
            None => {
                debug!(id, "Hot key id not registered");
                self.record(|metrics| metrics.unknown_events += 1);
                None
            }
        }
    }

    /// Snapshot registered bindings in id order
    pub fn bindings(&self) -> Vec<(HotKeyId, HotKeyBinding)> {
        self.registry
            .read()
            .map(|registry| {
                registry
                    .bindings
                    .iter()
                    .map(|(id, binding)| (*id, binding.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn metrics(&self) -> KeyboardHandlerMetrics {
        self.metrics
            .read()
            .map(|metrics| metrics.clone())
            .unwrap_or_default()
    }

    fn record(&self, f: impl FnOnce(&mut KeyboardHandlerMetrics)) {
        if let Ok(mut metrics) = self.metrics.write() {
            f(&mut metrics);
        }
    }
}

impl Default for KeyboardHandler {
    fn default() -> Self {
        Self::with_system_reserved()
    }
}

/// Command shortcuts claimed by macOS or nearly every application
pub fn system_reserved_shortcuts() -> HashSet<ShortcutCombination> {
    use ModifierKey::{Command, Control, Shift};

    let mut reserved: HashSet<ShortcutCombination> = ['q', 'w', 'h', 'm', 'a', 'c', 'v', 'x', 'z']
        .into_iter()
        .map(|c| ShortcutCombination::new(vec![Command], Key::Letter(c)))
        .collect();

    // Screenshot shortcuts
    for n in [3, 4, 5] {
        reserved.insert(ShortcutCombination::new(vec![Command, Shift], Key::Number(n)));
    }

    // Lock screen
    reserved.insert(ShortcutCombination::new(vec![Control, Command], Key::Letter('q')));
    reserved
}

fn convert_shortcut_error(error: ShortcutError) -> anyhow::Error {
    CentreError::ValidationError(error.to_string()).into()
}
