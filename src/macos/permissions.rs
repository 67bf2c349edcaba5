use crate::Result;
use anyhow::anyhow;

#[derive(Debug, Clone, Copy)]
pub enum PrivacyPane {
    Accessibility,
}

impl PrivacyPane {
    fn url(self) -> &'static str {
        match self {
            PrivacyPane::Accessibility => {
                "x-apple.systempreferences:com.apple.preference.security?Privacy_Accessibility"
            }
        }
    }
}

/// Open the specified System Settings privacy pane to guide the user manually.
#[cfg(target_os = "macos")]
pub fn open_privacy_pane(pane: PrivacyPane) -> Result<()> {
    use anyhow::Context;

    let status = std::process::Command::new("open")
        .arg(pane.url())
        .status()
        .context("failed to open System Settings")?;

    if status.success() {
        Ok(())
    } else {
        Err(anyhow!("open command returned non-zero status: {status}"))
    }
}

#[cfg(not(target_os = "macos"))]
pub fn open_privacy_pane(pane: PrivacyPane) -> Result<()> {
    Err(anyhow!(
        "opening System Settings ({}) is not supported on this platform",
        pane.url()
    ))
}

#[cfg(target_os = "macos")]
mod platform {
    use crate::Result;
    use core_foundation::base::TCFType;
    use core_foundation::boolean::CFBoolean;
    use core_foundation::dictionary::CFMutableDictionary;
    use core_foundation::string::CFString;
    use core_foundation_sys::dictionary::CFDictionaryRef;
    use core_foundation_sys::string::CFStringRef;

    #[link(name = "ApplicationServices", kind = "framework")]
    extern "C" {
        fn AXIsProcessTrusted() -> bool;
        fn AXIsProcessTrustedWithOptions(options: CFDictionaryRef) -> bool;
        static kAXTrustedCheckOptionPrompt: CFStringRef;
    }

    pub fn is_accessibility_permission_granted() -> Result<bool> {
        Ok(unsafe { AXIsProcessTrusted() })
    }

    pub fn prompt_accessibility_permission() -> Result<bool> {
        unsafe {
            let mut options = CFMutableDictionary::new();
            let key = CFString::wrap_under_get_rule(kAXTrustedCheckOptionPrompt);
            let value = CFBoolean::true_value();
            options.set(key, value);

            Ok(AXIsProcessTrustedWithOptions(options.as_concrete_TypeRef()))
        }
    }
}

#[cfg(not(target_os = "macos"))]
mod platform {
    use crate::Result;

    fn env_flag(name: &str) -> bool {
        std::env::var(name)
            .map(|value| value.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub fn is_accessibility_permission_granted() -> Result<bool> {
        Ok(env_flag("CENTRE_PERMISSION_ACCESSIBILITY"))
    }

    pub fn prompt_accessibility_permission() -> Result<bool> {
        Ok(env_flag("CENTRE_PERMISSION_ACCESSIBILITY"))
    }
}

pub use platform::{is_accessibility_permission_granted, prompt_accessibility_permission};
