//! Accessibility trust checks

use core_foundation::base::TCFType;
use core_foundation::boolean::CFBoolean;
use core_foundation::dictionary::{CFDictionary, CFDictionaryRef};
use core_foundation::string::{CFString, CFStringRef};
use tracing::info;

use crate::platform::PermissionProvider;

#[link(name = "ApplicationServices", kind = "framework")]
extern "C" {
    static kAXTrustedCheckOptionPrompt: CFStringRef;
    fn AXIsProcessTrusted() -> bool;
    fn AXIsProcessTrustedWithOptions(options: CFDictionaryRef) -> bool;
}

/// The Accessibility entry in System Settings > Privacy & Security
pub struct AxPermission;

impl PermissionProvider for AxPermission {
    fn has_capability(&self) -> bool {
        unsafe { AXIsProcessTrusted() }
    }

    /// Adds this process to the Accessibility list and shows the system
    /// prompt; the user still has to toggle it on
    fn request_capability(&self) {
        let options = CFDictionary::from_CFType_pairs(&[(
            unsafe { CFString::wrap_under_get_rule(kAXTrustedCheckOptionPrompt) },
            CFBoolean::true_value(),
        )]);

        let trusted = unsafe { AXIsProcessTrustedWithOptions(options.as_concrete_TypeRef()) };
        info!(trusted, "requested accessibility permission");
    }
}
