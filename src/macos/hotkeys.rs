//! Global hot keys through Carbon's `RegisterEventHotKey`.
//!
//! Presses are delivered on the main run loop as the numeric id chosen by
//! [`crate::services::KeyboardHandler`].

use crate::services::keyboard_handler::HotKeyId;

/// Four-character signature stamped on every hot key Centre registers
pub const HOT_KEY_SIGNATURE: u32 = u32::from_be_bytes(*b"CNTR");

/// Callback invoked with the id of the pressed hot key
pub type HotKeyCallback = Box<dyn Fn(HotKeyId) + 'static>;

#[cfg(target_os = "macos")]
pub use system::HotKeyCenter;

#[cfg(target_os = "macos")]
mod system {
    use super::{HotKeyCallback, HOT_KEY_SIGNATURE};
    use crate::models::shortcut::ShortcutCombination;
    use crate::services::keyboard_handler::HotKeyId;
    use crate::{CentreError, Result};
    use std::collections::HashMap;
    use std::ffi::c_void;
    use tracing::{debug, trace, warn};

    type OSStatus = i32;
    type EventTargetRef = *mut c_void;
    type EventHandlerRef = *mut c_void;
    type EventHandlerCallRef = *mut c_void;
    type EventRef = *mut c_void;
    type EventHotKeyRef = *mut c_void;
    type EventHandlerProcPtr =
        extern "C" fn(EventHandlerCallRef, EventRef, *mut c_void) -> OSStatus;

    const NO_ERR: OSStatus = 0;
    const EVENT_NOT_HANDLED_ERR: OSStatus = -9874;

    const K_EVENT_CLASS_KEYBOARD: u32 = u32::from_be_bytes(*b"keyb");
    const K_EVENT_HOT_KEY_PRESSED: u32 = 5;
    const K_EVENT_PARAM_DIRECT_OBJECT: u32 = u32::from_be_bytes(*b"----");
    const TYPE_EVENT_HOT_KEY_ID: u32 = u32::from_be_bytes(*b"hkid");

    #[repr(C)]
    struct EventTypeSpec {
        event_class: u32,
        event_kind: u32,
    }

    #[repr(C)]
    #[derive(Default)]
    struct EventHotKeyID {
        signature: u32,
        id: u32,
    }

    #[link(name = "Carbon", kind = "framework")]
    extern "C" {
        fn GetApplicationEventTarget() -> EventTargetRef;
        fn InstallEventHandler(
            target: EventTargetRef,
            handler: EventHandlerProcPtr,
            num_types: u32,
            list: *const EventTypeSpec,
            user_data: *mut c_void,
            out_ref: *mut EventHandlerRef,
        ) -> OSStatus;
        fn RemoveEventHandler(handler: EventHandlerRef) -> OSStatus;
        fn RegisterEventHotKey(
            key_code: u32,
            modifiers: u32,
            hot_key_id: EventHotKeyID,
            target: EventTargetRef,
            options: u32,
            out_ref: *mut EventHotKeyRef,
        ) -> OSStatus;
        fn UnregisterEventHotKey(hot_key: EventHotKeyRef) -> OSStatus;
        fn GetEventParameter(
            event: EventRef,
            name: u32,
            desired_type: u32,
            actual_type: *mut u32,
            buffer_size: usize,
            actual_size: *mut usize,
            data: *mut c_void,
        ) -> OSStatus;
    }

    extern "C" fn hot_key_handler(
        _next: EventHandlerCallRef,
        event: EventRef,
        user_data: *mut c_void,
    ) -> OSStatus {
        let mut hot_key = EventHotKeyID::default();
        let status = unsafe {
            GetEventParameter(
                event,
                K_EVENT_PARAM_DIRECT_OBJECT,
                TYPE_EVENT_HOT_KEY_ID,
                std::ptr::null_mut(),
                std::mem::size_of::<EventHotKeyID>(),
                std::ptr::null_mut(),
                &mut hot_key as *mut EventHotKeyID as *mut c_void,
            )
        };

        if status != NO_ERR || hot_key.signature != HOT_KEY_SIGNATURE || user_data.is_null() {
            return EVENT_NOT_HANDLED_ERR;
        }

        trace!(id = hot_key.id, "Hot key pressed");
        let callback = unsafe { &*(user_data as *const HotKeyCallback) };
        callback(hot_key.id);
        NO_ERR
    }

    /// Owns the Carbon event handler and every registered hot key.
    /// Must live on the main thread for as long as hot keys should fire.
    pub struct HotKeyCenter {
        handler: EventHandlerRef,
        callback: *mut HotKeyCallback,
        registered: HashMap<HotKeyId, EventHotKeyRef>,
    }

    impl HotKeyCenter {
        pub fn new(callback: HotKeyCallback) -> Result<Self> {
            let callback = Box::into_raw(Box::new(callback));
            let spec = EventTypeSpec {
                event_class: K_EVENT_CLASS_KEYBOARD,
                event_kind: K_EVENT_HOT_KEY_PRESSED,
            };
            let mut handler: EventHandlerRef = std::ptr::null_mut();

            let status = unsafe {
                InstallEventHandler(
                    GetApplicationEventTarget(),
                    hot_key_handler,
                    1,
                    &spec,
                    callback as *mut c_void,
                    &mut handler,
                )
            };

            if status != NO_ERR {
                drop(unsafe { Box::from_raw(callback) });
                return Err(CentreError::MacOSAPIError(format!(
                    "InstallEventHandler failed with status {}",
                    status
                ))
                .into());
            }

            Ok(Self {
                handler,
                callback,
                registered: HashMap::new(),
            })
        }

        /// Register `shortcut` so that presses report `id`
        pub fn register(&mut self, id: HotKeyId, shortcut: &ShortcutCombination) -> Result<()> {
            let key_code = shortcut.key.virtual_key_code().ok_or_else(|| {
                CentreError::ValidationError(format!("No virtual key code for {}", shortcut))
            })?;

            let hot_key_id = EventHotKeyID {
                signature: HOT_KEY_SIGNATURE,
                id,
            };
            let mut hot_key_ref: EventHotKeyRef = std::ptr::null_mut();
            let status = unsafe {
                RegisterEventHotKey(
                    key_code,
                    shortcut.carbon_modifiers(),
                    hot_key_id,
                    GetApplicationEventTarget(),
                    0,
                    &mut hot_key_ref,
                )
            };

            if status != NO_ERR {
                return Err(CentreError::MacOSAPIError(format!(
                    "RegisterEventHotKey({}) failed with status {}",
                    shortcut, status
                ))
                .into());
            }

            if let Some(previous) = self.registered.insert(id, hot_key_ref) {
                unsafe { UnregisterEventHotKey(previous) };
            }
            debug!(id, shortcut = %shortcut, "Registered global hot key");
            Ok(())
        }

        pub fn unregister(&mut self, id: HotKeyId) -> bool {
            match self.registered.remove(&id) {
                Some(hot_key_ref) => {
                    let status = unsafe { UnregisterEventHotKey(hot_key_ref) };
                    if status != NO_ERR {
                        warn!(id, status, "UnregisterEventHotKey failed");
                    }
                    true
                }
                None => false,
            }
        }

        pub fn registered_count(&self) -> usize {
            self.registered.len()
        }
    }

    impl Drop for HotKeyCenter {
        fn drop(&mut self) {
            let ids: Vec<HotKeyId> = self.registered.keys().copied().collect();
            for id in ids {
                self.unregister(id);
            }

            unsafe {
                RemoveEventHandler(self.handler);
                drop(Box::from_raw(self.callback));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_spells_cntr() {
        assert_eq!(HOT_KEY_SIGNATURE, 0x434E_5452);
        assert_eq!(HOT_KEY_SIGNATURE.to_be_bytes(), *b"CNTR");
    }
}
