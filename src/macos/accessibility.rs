use crate::models::geometry::{Point, Rect};
use crate::permissions::PermissionStatus;
use crate::{CentreError, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

/// Accessibility-derived window metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AXWindow {
    /// Handle valid until the next enumeration
    pub window_id: u32,
    pub pid: i32,
    pub title: String,
    pub application_name: String,
    pub frame: Rect,
}

impl AXWindow {
    pub fn new(
        window_id: u32,
        pid: i32,
        title: impl Into<String>,
        application_name: impl Into<String>,
        frame: Rect,
    ) -> Self {
        Self {
            window_id,
            pid,
            title: title.into(),
            application_name: application_name.into(),
            frame,
        }
    }
}

/// Restricts window enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowFilter {
    /// Every on-screen, layer-zero window
    All,
    /// Only windows owned by this process
    Process(i32),
}

impl WindowFilter {
    pub fn admits(&self, pid: i32) -> bool {
        match self {
            WindowFilter::All => true,
            WindowFilter::Process(wanted) => *wanted == pid,
        }
    }
}

/// Abstraction for interacting with macOS Accessibility APIs
pub trait AccessibilityProvider: Send + Sync {
    /// Retrieve permission status without prompting the user
    fn permission_status(&self) -> PermissionStatus;

    /// Fail with `PermissionDenied` unless the process is trusted
    fn ensure_permissions(&self) -> Result<()> {
        if self.permission_status().is_granted() {
            Ok(())
        } else {
            Err(CentreError::PermissionDenied(
                "Accessibility permission is required to move windows".into(),
            )
            .into())
        }
    }

    /// Process identifier of the frontmost application, if any
    fn frontmost_pid(&self) -> Result<Option<i32>>;

    /// Snapshot visible windows. Ids from earlier snapshots become invalid.
    fn list_windows(&self, filter: WindowFilter) -> Result<Vec<AXWindow>>;

    /// Current frame of a window, in top-left screen coordinates
    fn window_frame(&self, window_id: u32) -> Result<Rect>;

    /// Move a window so its top-left corner lands on `position`
    fn set_window_position(&self, window_id: u32, position: Point) -> Result<()>;
}

/// Simple in-memory provider used for testing the higher level services
#[derive(Debug)]
pub struct InMemoryAccessibilityProvider {
    windows: RwLock<Vec<AXWindow>>,
    frontmost: RwLock<Option<i32>>,
    status: RwLock<PermissionStatus>,
    unavailable: RwLock<HashSet<u32>>,
    listing_fails: AtomicBool,
}

impl InMemoryAccessibilityProvider {
    /// Windows are kept in the given order, which stands in for z-order
    pub fn new_with(windows: Vec<AXWindow>) -> Self {
        let frontmost = windows.first().map(|window| window.pid);
        Self {
            windows: RwLock::new(windows),
            frontmost: RwLock::new(frontmost),
            status: RwLock::new(PermissionStatus::Granted),
            unavailable: RwLock::new(HashSet::new()),
            listing_fails: AtomicBool::new(false),
        }
    }

    pub fn set_permission_status(&self, status: PermissionStatus) {
        if let Ok(mut guard) = self.status.write() {
            *guard = status;
        }
    }

    pub fn set_frontmost(&self, pid: Option<i32>) {
        if let Ok(mut guard) = self.frontmost.write() {
            *guard = pid;
        }
    }

    /// Make later reads and writes of this window fail as if it had closed
    pub fn mark_unavailable(&self, window_id: u32) {
        if let Ok(mut guard) = self.unavailable.write() {
            guard.insert(window_id);
        }
    }

    /// Make `list_windows` fail as if the window server could not be queried
    pub fn set_listing_fails(&self, fails: bool) {
        self.listing_fails.store(fails, Ordering::SeqCst);
    }

    pub fn window(&self, window_id: u32) -> Option<AXWindow> {
        self.windows
            .read()
            .ok()?
            .iter()
            .find(|window| window.window_id == window_id)
            .cloned()
    }

    fn check_available(&self, window_id: u32) -> Result<()> {
        let unavailable = self
            .unavailable
            .read()
            .map(|set| set.contains(&window_id))
            .unwrap_or(false);
        if unavailable {
            return Err(CentreError::ElementUnavailable(format!("window {}", window_id)).into());
        }
        Ok(())
    }

    fn poisoned() -> anyhow::Error {
        CentreError::MacOSAPIError("in-memory provider lock poisoned".into()).into()
    }
}

impl AccessibilityProvider for InMemoryAccessibilityProvider {
    fn permission_status(&self) -> PermissionStatus {
        self.status
            .read()
            .map(|status| *status)
            .unwrap_or(PermissionStatus::Unknown)
    }

    fn frontmost_pid(&self) -> Result<Option<i32>> {
        self.frontmost
            .read()
            .map(|pid| *pid)
            .map_err(|_| Self::poisoned())
    }

    fn list_windows(&self, filter: WindowFilter) -> Result<Vec<AXWindow>> {
        if self.listing_fails.load(Ordering::SeqCst) {
            return Err(CentreError::WindowListUnavailable(
                "window server did not answer".into(),
            )
            .into());
        }

        let windows = self.windows.read().map_err(|_| Self::poisoned())?;
        Ok(windows
            .iter()
            .filter(|window| filter.admits(window.pid))
            .cloned()
            .collect())
    }

    fn window_frame(&self, window_id: u32) -> Result<Rect> {
        self.check_available(window_id)?;
        self.window(window_id)
            .map(|window| window.frame)
            .ok_or_else(|| CentreError::ElementUnavailable(format!("window {}", window_id)).into())
    }

    fn set_window_position(&self, window_id: u32, position: Point) -> Result<()> {
        self.ensure_permissions()?;
        self.check_available(window_id)?;

        let mut windows = self.windows.write().map_err(|_| Self::poisoned())?;
        match windows.iter_mut().find(|window| window.window_id == window_id) {
            Some(window) => {
                window.frame.origin = position;
                Ok(())
            }
            None => Err(CentreError::ElementUnavailable(format!("window {}", window_id)).into()),
        }
    }
}

impl Default for InMemoryAccessibilityProvider {
    fn default() -> Self {
        Self::new_with(Vec::new())
    }
}

#[cfg(target_os = "macos")]
pub use system::SystemAccessibilityProvider;

#[cfg(target_os = "macos")]
mod system {
    use super::{AXWindow, AccessibilityProvider, WindowFilter};
    use crate::models::geometry::{Point, Rect, Size};
    use crate::permissions::PermissionStatus;
    use crate::{CentreError, Result};
    use cocoa::base::{id, nil};
    use cocoa::foundation::NSAutoreleasePool;
    use core_foundation::array::CFArray;
    use core_foundation::base::TCFType;
    use core_foundation::string::CFString;
    use core_foundation_sys::base::{CFGetTypeID, CFRelease, CFRetain, CFTypeRef};
    use core_foundation_sys::dictionary::{CFDictionaryGetValue, CFDictionaryRef};
    use core_foundation_sys::number::{kCFNumberSInt64Type, CFNumberGetValue, CFNumberRef};
    use core_foundation_sys::string::{CFStringGetTypeID, CFStringRef};
    use core_graphics::geometry::{CGPoint, CGSize};
    use core_graphics::window::{
        copy_window_info, kCGNullWindowID, kCGWindowLayer, kCGWindowListExcludeDesktopElements,
        kCGWindowListOptionOnScreenOnly, kCGWindowOwnerName, kCGWindowOwnerPID,
    };
    use objc::{class, msg_send, sel, sel_impl};
    use std::collections::HashMap;
    use std::ffi::c_void;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tracing::{debug, trace};

    type AXUIElementRef = *const c_void;
    type AXValueRef = *const c_void;
    type AXError = i32;

    const K_AX_ERROR_SUCCESS: AXError = 0;
    const K_AX_ERROR_INVALID_UI_ELEMENT: AXError = -25202;
    const K_AX_ERROR_CANNOT_COMPLETE: AXError = -25204;
    const K_AX_ERROR_API_DISABLED: AXError = -25211;
    const K_AX_ERROR_NO_VALUE: AXError = -25212;
    const K_AX_ERROR_NOT_TRUSTED: AXError = -25215;

    const K_AX_VALUE_CG_POINT_TYPE: u32 = 1;
    const K_AX_VALUE_CG_SIZE_TYPE: u32 = 2;

    #[link(name = "ApplicationServices", kind = "framework")]
    extern "C" {
        fn AXUIElementCreateApplication(pid: i32) -> AXUIElementRef;
        fn AXUIElementCopyAttributeValue(
            element: AXUIElementRef,
            attribute: CFStringRef,
            value: *mut CFTypeRef,
        ) -> AXError;
        fn AXUIElementSetAttributeValue(
            element: AXUIElementRef,
            attribute: CFStringRef,
            value: CFTypeRef,
        ) -> AXError;
        fn AXValueCreate(value_type: u32, value: *const c_void) -> AXValueRef;
        fn AXValueGetValue(value: AXValueRef, value_type: u32, out: *mut c_void) -> bool;
    }

    fn ax_failure(code: AXError, context: &str) -> anyhow::Error {
        match code {
            K_AX_ERROR_API_DISABLED | K_AX_ERROR_NOT_TRUSTED => {
                CentreError::PermissionDenied(format!("{} (AXError {})", context, code)).into()
            }
            K_AX_ERROR_INVALID_UI_ELEMENT | K_AX_ERROR_CANNOT_COMPLETE | K_AX_ERROR_NO_VALUE => {
                CentreError::ElementUnavailable(format!("{} (AXError {})", context, code)).into()
            }
            _ => CentreError::MacOSAPIError(format!("{} (AXError {})", context, code)).into(),
        }
    }

    /// Owned, retained `AXUIElementRef`
    struct AxElement(AXUIElementRef);

    // AXUIElement is a CFType; the accessibility API may be called from any thread.
    unsafe impl Send for AxElement {}
    unsafe impl Sync for AxElement {}

    impl AxElement {
        fn application(pid: i32) -> Option<Self> {
            let raw = unsafe { AXUIElementCreateApplication(pid) };
            if raw.is_null() {
                None
            } else {
                Some(Self(raw))
            }
        }

        fn retain(raw: AXUIElementRef) -> Self {
            unsafe { CFRetain(raw) };
            Self(raw)
        }

        /// Copy an attribute value; the caller owns the returned reference
        fn copy_attribute(&self, name: &'static str) -> std::result::Result<CFTypeRef, AXError> {
            let attribute = CFString::from_static_string(name);
            let mut value: CFTypeRef = std::ptr::null();
            let code = unsafe {
                AXUIElementCopyAttributeValue(self.0, attribute.as_concrete_TypeRef(), &mut value)
            };
            if code != K_AX_ERROR_SUCCESS {
                return Err(code);
            }
            if value.is_null() {
                return Err(K_AX_ERROR_NO_VALUE);
            }
            Ok(value)
        }

        fn windows(&self) -> std::result::Result<Vec<AxElement>, AXError> {
            let value = self.copy_attribute("AXWindows")?;
            let array: CFArray<*const c_void> =
                unsafe { CFArray::wrap_under_create_rule(value as _) };
            Ok(array
                .get_all_values()
                .into_iter()
                .map(AxElement::retain)
                .collect())
        }

        fn title(&self) -> String {
            let Ok(value) = self.copy_attribute("AXTitle") else {
                return String::new();
            };
            unsafe {
                if CFGetTypeID(value) == CFStringGetTypeID() {
                    CFString::wrap_under_create_rule(value as CFStringRef).to_string()
                } else {
                    CFRelease(value);
                    String::new()
                }
            }
        }

        fn position(&self) -> std::result::Result<Point, AXError> {
            let value = self.copy_attribute("AXPosition")?;
            let mut point = CGPoint::new(0.0, 0.0);
            let ok = unsafe {
                let ok = AXValueGetValue(
                    value,
                    K_AX_VALUE_CG_POINT_TYPE,
                    &mut point as *mut CGPoint as *mut c_void,
                );
                CFRelease(value);
                ok
            };
            if !ok {
                return Err(K_AX_ERROR_NO_VALUE);
            }
            Ok(Point::new(point.x, point.y))
        }

        fn size(&self) -> std::result::Result<Size, AXError> {
            let value = self.copy_attribute("AXSize")?;
            let mut size = CGSize::new(0.0, 0.0);
            let ok = unsafe {
                let ok = AXValueGetValue(
                    value,
                    K_AX_VALUE_CG_SIZE_TYPE,
                    &mut size as *mut CGSize as *mut c_void,
                );
                CFRelease(value);
                ok
            };
            if !ok {
                return Err(K_AX_ERROR_NO_VALUE);
            }
            Ok(Size::new(size.width, size.height))
        }

        fn frame(&self) -> std::result::Result<Rect, AXError> {
            Ok(Rect::from_parts(self.position()?, self.size()?))
        }

        fn set_position(&self, position: Point) -> std::result::Result<(), AXError> {
            let point = CGPoint::new(position.x, position.y);
            let attribute = CFString::from_static_string("AXPosition");
            unsafe {
                let value = AXValueCreate(
                    K_AX_VALUE_CG_POINT_TYPE,
                    &point as *const CGPoint as *const c_void,
                );
                if value.is_null() {
                    return Err(K_AX_ERROR_CANNOT_COMPLETE);
                }
                let code =
                    AXUIElementSetAttributeValue(self.0, attribute.as_concrete_TypeRef(), value);
                CFRelease(value);
                if code == K_AX_ERROR_SUCCESS {
                    Ok(())
                } else {
                    Err(code)
                }
            }
        }
    }

    impl Drop for AxElement {
        fn drop(&mut self) {
            unsafe { CFRelease(self.0) };
        }
    }

    /// Entry of the on-screen window list worth expanding through AX
    struct WindowOwner {
        pid: i32,
        name: String,
    }

    unsafe fn dictionary_i64(dict: CFDictionaryRef, key: CFStringRef) -> Option<i64> {
        let value = CFDictionaryGetValue(dict, key as *const c_void);
        if value.is_null() {
            return None;
        }
        let mut out: i64 = 0;
        let ok = CFNumberGetValue(
            value as CFNumberRef,
            kCFNumberSInt64Type,
            &mut out as *mut i64 as *mut c_void,
        );
        ok.then_some(out)
    }

    unsafe fn dictionary_string(dict: CFDictionaryRef, key: CFStringRef) -> Option<String> {
        let value = CFDictionaryGetValue(dict, key as *const c_void);
        if value.is_null() || CFGetTypeID(value) != CFStringGetTypeID() {
            return None;
        }
        Some(CFString::wrap_under_get_rule(value as CFStringRef).to_string())
    }

    /// Owners of on-screen layer-zero windows, front to back, each pid once
    fn window_owners(filter: WindowFilter) -> Result<Vec<WindowOwner>> {
        let options = kCGWindowListOptionOnScreenOnly | kCGWindowListExcludeDesktopElements;
        let info = copy_window_info(options, kCGNullWindowID).ok_or_else(|| {
            CentreError::WindowListUnavailable("CGWindowListCopyWindowInfo returned NULL".into())
        })?;

        let mut seen = std::collections::HashSet::new();
        let mut owners = Vec::new();

        for entry in info.get_all_values() {
            let dict = entry as CFDictionaryRef;
            let (layer, pid, name) = unsafe {
                (
                    dictionary_i64(dict, kCGWindowLayer),
                    dictionary_i64(dict, kCGWindowOwnerPID),
                    dictionary_string(dict, kCGWindowOwnerName),
                )
            };

            let (Some(0), Some(pid)) = (layer, pid) else {
                continue;
            };
            let pid = pid as i32;

            if filter.admits(pid) && seen.insert(pid) {
                owners.push(WindowOwner {
                    pid,
                    name: name.unwrap_or_default(),
                });
            }
        }

        Ok(owners)
    }

    /// Accessibility provider backed by the system AX and Quartz window APIs
    pub struct SystemAccessibilityProvider {
        elements: Mutex<HashMap<u32, AxElement>>,
        next_id: AtomicU32,
    }

    impl SystemAccessibilityProvider {
        pub fn new() -> Self {
            Self {
                elements: Mutex::new(HashMap::new()),
                next_id: AtomicU32::new(1),
            }
        }

        fn with_element<T>(
            &self,
            window_id: u32,
            f: impl FnOnce(&AxElement) -> std::result::Result<T, AXError>,
            context: &str,
        ) -> Result<T> {
            let elements = self.elements.lock().map_err(|_| {
                CentreError::MacOSAPIError("accessibility element cache poisoned".into())
            })?;
            let element = elements
                .get(&window_id)
                .ok_or_else(|| CentreError::ElementUnavailable(format!("window {}", window_id)))?;
            f(element).map_err(|code| ax_failure(code, context))
        }
    }

    impl Default for SystemAccessibilityProvider {
        fn default() -> Self {
            Self::new()
        }
    }

    impl AccessibilityProvider for SystemAccessibilityProvider {
        fn permission_status(&self) -> PermissionStatus {
            match crate::macos::permissions::is_accessibility_permission_granted() {
                Ok(true) => PermissionStatus::Granted,
                Ok(false) => PermissionStatus::Denied,
                Err(_) => PermissionStatus::Unknown,
            }
        }

        fn frontmost_pid(&self) -> Result<Option<i32>> {
            unsafe {
                let pool = NSAutoreleasePool::new(nil);
                let workspace: id = msg_send![class!(NSWorkspace), sharedWorkspace];
                let application: id = msg_send![workspace, frontmostApplication];
                let pid = if application == nil {
                    None
                } else {
                    let pid: i32 = msg_send![application, processIdentifier];
                    Some(pid)
                };
                pool.drain();
                Ok(pid)
            }
        }

        fn list_windows(&self, filter: WindowFilter) -> Result<Vec<AXWindow>> {
            let owners = window_owners(filter)?;

            let mut elements = self.elements.lock().map_err(|_| {
                CentreError::MacOSAPIError("accessibility element cache poisoned".into())
            })?;
            elements.clear();

            let mut windows = Vec::new();
            for owner in owners {
                let Some(application) = AxElement::application(owner.pid) else {
                    continue;
                };

                let ax_windows = match application.windows() {
                    Ok(ax_windows) => ax_windows,
                    Err(code) => {
                        // Apps that do not expose AXWindows are skipped, not fatal
                        trace!(pid = owner.pid, code, "Skipping application without AXWindows");
                        continue;
                    }
                };

                for element in ax_windows {
                    let frame = match element.frame() {
                        Ok(frame) => frame,
                        Err(code) => {
                            trace!(pid = owner.pid, code, "Skipping window without geometry");
                            continue;
                        }
                    };

                    let window_id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    windows.push(AXWindow::new(
                        window_id,
                        owner.pid,
                        element.title(),
                        owner.name.clone(),
                        frame,
                    ));
                    elements.insert(window_id, element);
                }
            }

            debug!(count = windows.len(), ?filter, "Enumerated accessibility windows");
            Ok(windows)
        }

        fn window_frame(&self, window_id: u32) -> Result<Rect> {
            self.with_element(window_id, AxElement::frame, "reading window frame")
        }

        fn set_window_position(&self, window_id: u32, position: Point) -> Result<()> {
            self.with_element(
                window_id,
                |element| element.set_position(position),
                "setting window position",
            )
        }
    }
}
