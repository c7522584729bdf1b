// ── Camera devices and device classes ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A camera as reported by the platform's enumeration capability.
///
/// Owned by the platform; the core only reads it. Labels may be empty
/// (no permission granted yet) or localized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraDevice {
    pub id: String,
    #[serde(default)]
    pub label: String,
}

impl CameraDevice {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }

    /// Whether the label suggests a rear-facing camera ("back" / "rear",
    /// case-insensitive). A heuristic only.
    pub fn looks_rear_facing(&self) -> bool {
        let label = self.label.to_lowercase();
        label.contains("back") || label.contains("rear")
    }
}

/// Coarse platform category, declared by the caller or detected by the
/// platform layer.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DeviceClass {
    #[default]
    Desktop,
    Mobile,
    /// An app-embedded browser view. Exact-device enumeration is not
    /// trusted here.
    #[serde(rename = "webview")]
    #[strum(serialize = "webview")]
    EmbeddedWebView,
}

impl DeviceClass {
    /// Mobile browsers and embedded webviews get the full-viewport surface.
    pub fn is_mobile_like(self) -> bool {
        matches!(self, Self::Mobile | Self::EmbeddedWebView)
    }

    pub fn is_embedded_webview(self) -> bool {
        matches!(self, Self::EmbeddedWebView)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rear_facing_label_match_is_case_insensitive() {
        assert!(CameraDevice::new("2", "Back Camera").looks_rear_facing());
        assert!(CameraDevice::new("3", "camera2 1, facing REAR").looks_rear_facing());
        assert!(!CameraDevice::new("1", "Front Camera").looks_rear_facing());
        assert!(!CameraDevice::new("4", "").looks_rear_facing());
    }

    #[test]
    fn device_class_flags() {
        assert!(!DeviceClass::Desktop.is_mobile_like());
        assert!(DeviceClass::Mobile.is_mobile_like());
        assert!(!DeviceClass::Mobile.is_embedded_webview());
        assert!(DeviceClass::EmbeddedWebView.is_mobile_like());
        assert!(DeviceClass::EmbeddedWebView.is_embedded_webview());
    }

    #[test]
    fn device_class_parses_from_kebab_case() {
        assert_eq!("webview".parse::<DeviceClass>().ok(), Some(DeviceClass::EmbeddedWebView));
        assert_eq!("mobile".parse::<DeviceClass>().ok(), Some(DeviceClass::Mobile));
        assert_eq!(DeviceClass::Desktop.to_string(), "desktop");
    }
}
