// ── Scanner settings ──
//
// Device-class conditioned configuration. Everything here is applied
// once per scan: the surface layout when the modal opens, the decode
// configuration when the session starts. Nothing is re-derived per frame.
// The core never reads config files; `camscan-config` builds these.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::device::DeviceClass;
use super::strategy::StrategyOrder;

// ── Symbologies ──────────────────────────────────────────────────────

/// Barcode encodings the decoder is asked to recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
pub enum Symbology {
    #[serde(rename = "CODE_128")]
    #[strum(serialize = "CODE_128")]
    Code128,
    #[serde(rename = "CODE_39")]
    #[strum(serialize = "CODE_39")]
    Code39,
    #[serde(rename = "EAN_13")]
    #[strum(serialize = "EAN_13")]
    Ean13,
    #[serde(rename = "EAN_8")]
    #[strum(serialize = "EAN_8")]
    Ean8,
    #[serde(rename = "UPC_A")]
    #[strum(serialize = "UPC_A")]
    UpcA,
    #[serde(rename = "UPC_E")]
    #[strum(serialize = "UPC_E")]
    UpcE,
    #[serde(rename = "ITF")]
    #[strum(serialize = "ITF")]
    Itf,
    #[serde(rename = "QR_CODE")]
    #[strum(serialize = "QR_CODE")]
    QrCode,
    #[serde(rename = "DATA_MATRIX")]
    #[strum(serialize = "DATA_MATRIX")]
    DataMatrix,
    #[serde(rename = "PDF_417")]
    #[strum(serialize = "PDF_417")]
    Pdf417,
}

/// Linear retail/logistics codes: the default recognition set.
pub const DEFAULT_SYMBOLOGIES: [Symbology; 3] =
    [Symbology::Code128, Symbology::Ean13, Symbology::UpcA];

pub const DEFAULT_FPS: u32 = 10;

// ── Geometry ─────────────────────────────────────────────────────────

/// Visible viewport size in CSS pixels, reported by the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 800,
        }
    }
}

/// Pixel size of the box the decoder examines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeBox {
    pub width: u32,
    pub height: u32,
}

/// Decode region as configured, before it is resolved against a viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum DecodeRegion {
    Fixed { width: u32, height: u32 },
    /// Width is a fraction of the viewport width.
    Viewport { width_fraction: f64, height: u32 },
}

impl DecodeRegion {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::as_conversions
    )]
    pub fn resolve(&self, viewport: Viewport) -> DecodeBox {
        match *self {
            Self::Fixed { width, height } => DecodeBox { width, height },
            Self::Viewport {
                width_fraction,
                height,
            } => {
                let fraction = width_fraction.clamp(0.0, 1.0);
                let width = (f64::from(viewport.width) * fraction).floor() as u32;
                DecodeBox { width, height }
            }
        }
    }
}

/// Size of the capture surface (the video element's container).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum CaptureRegion {
    /// Fixed height, full container width.
    Fixed { height: u32 },
    /// Whole viewport, minus vertical space kept free for the stop control.
    FullViewport { reserved_bottom: u32 },
}

impl CaptureRegion {
    pub fn height_for(&self, viewport: Viewport) -> u32 {
        match *self {
            Self::Fixed { height } => height,
            Self::FullViewport { reserved_bottom } => viewport.height.saturating_sub(reserved_bottom),
        }
    }

    pub fn is_full_viewport(&self) -> bool {
        matches!(self, Self::FullViewport { .. })
    }
}

/// Stacking order for the scan surface overlays. `None` means "auto".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayLayers {
    #[serde(default)]
    pub video: Option<i32>,
    #[serde(default)]
    pub canvas: Option<i32>,
    #[serde(default)]
    pub shaded_region: Option<i32>,
    #[serde(default = "default_stop_control_layer")]
    pub stop_control: i32,
}

fn default_stop_control_layer() -> i32 {
    99_999
}

impl Default for OverlayLayers {
    fn default() -> Self {
        Self {
            video: None,
            canvas: None,
            shaded_region: None,
            stop_control: default_stop_control_layer(),
        }
    }
}

/// Everything the surface needs to lay out the modal for one scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceLayout {
    pub capture: CaptureRegion,
    #[serde(default)]
    pub overlay: OverlayLayers,
    /// Distance of the stop control from the bottom edge.
    #[serde(default = "default_stop_control_inset")]
    pub stop_control_inset: u32,
}

fn default_stop_control_inset() -> u32 {
    20
}

// ── Per-class profiles ───────────────────────────────────────────────

/// Surface layout plus decode region for one device class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanProfile {
    pub decode_region: DecodeRegion,
    pub layout: SurfaceLayout,
}

impl ScanProfile {
    /// Moderate fixed region for desktop browsers.
    pub fn desktop() -> Self {
        Self {
            decode_region: DecodeRegion::Fixed {
                width: 300,
                height: 100,
            },
            layout: SurfaceLayout {
                capture: CaptureRegion::Fixed { height: 400 },
                overlay: OverlayLayers::default(),
                stop_control_inset: default_stop_control_inset(),
            },
        }
    }

    /// Full-viewport surface for mobile browsers and embedded webviews.
    pub fn full_viewport() -> Self {
        Self {
            decode_region: DecodeRegion::Viewport {
                width_fraction: 0.8,
                height: 150,
            },
            layout: SurfaceLayout {
                capture: CaptureRegion::FullViewport {
                    reserved_bottom: 60,
                },
                overlay: OverlayLayers::default(),
                stop_control_inset: default_stop_control_inset(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceProfiles {
    pub desktop: ScanProfile,
    pub mobile: ScanProfile,
    pub webview: ScanProfile,
}

impl Default for DeviceProfiles {
    fn default() -> Self {
        Self {
            desktop: ScanProfile::desktop(),
            mobile: ScanProfile::full_viewport(),
            webview: ScanProfile::full_viewport(),
        }
    }
}

impl DeviceProfiles {
    pub fn for_class(&self, class: DeviceClass) -> &ScanProfile {
        match class {
            DeviceClass::Desktop => &self.desktop,
            DeviceClass::Mobile => &self.mobile,
            DeviceClass::EmbeddedWebView => &self.webview,
        }
    }
}

// ── Session-level settings ───────────────────────────────────────────

/// What `request_scan` does while another session is live.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum BusyPolicy {
    /// Refuse the new scan; the live session keeps running.
    #[default]
    Reject,
    /// Fully stop the live session, then open the new one.
    Restart,
}

/// Decoder configuration for one session. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    pub fps: u32,
    pub decode_box: DecodeBox,
    pub symbologies: Vec<Symbology>,
}

/// Runtime settings handed to [`ScanController`](crate::ScanController).
#[derive(Debug, Clone, PartialEq)]
pub struct ScannerSettings {
    pub fps: u32,
    pub symbologies: Vec<Symbology>,
    pub strategy_order: StrategyOrder,
    pub busy_policy: BusyPolicy,
    pub profiles: DeviceProfiles,
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            symbologies: DEFAULT_SYMBOLOGIES.to_vec(),
            strategy_order: StrategyOrder::default(),
            busy_policy: BusyPolicy::default(),
            profiles: DeviceProfiles::default(),
        }
    }
}

impl ScannerSettings {
    pub fn layout(&self, class: DeviceClass) -> SurfaceLayout {
        self.profiles.for_class(class).layout
    }

    /// Build the session's decode configuration for a device class and the
    /// viewport measured at session start.
    pub fn scan_config(&self, class: DeviceClass, viewport: Viewport) -> ScanConfig {
        ScanConfig {
            fps: self.fps,
            decode_box: self.profiles.for_class(class).decode_region.resolve(viewport),
            symbologies: self.symbologies.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const PHONE: Viewport = Viewport {
        width: 390,
        height: 844,
    };

    #[test]
    fn desktop_config_uses_fixed_decode_box() {
        let settings = ScannerSettings::default();
        let config = settings.scan_config(DeviceClass::Desktop, PHONE);
        assert_eq!(
            config,
            ScanConfig {
                fps: 10,
                decode_box: DecodeBox {
                    width: 300,
                    height: 100
                },
                symbologies: vec![Symbology::Code128, Symbology::Ean13, Symbology::UpcA],
            }
        );
    }

    #[test]
    fn mobile_decode_box_scales_with_viewport() {
        let settings = ScannerSettings::default();
        let config = settings.scan_config(DeviceClass::Mobile, PHONE);
        assert_eq!(config.decode_box, DecodeBox { width: 312, height: 150 });
    }

    #[test]
    fn full_viewport_capture_reserves_stop_control_space() {
        let layout = ScannerSettings::default().layout(DeviceClass::EmbeddedWebView);
        assert!(layout.capture.is_full_viewport());
        assert_eq!(layout.capture.height_for(PHONE), 784);
        assert_eq!(layout.overlay.stop_control, 99_999);
    }

    #[test]
    fn tiny_viewport_does_not_underflow() {
        let region = CaptureRegion::FullViewport { reserved_bottom: 60 };
        let vp = Viewport { width: 10, height: 40 };
        assert_eq!(region.height_for(vp), 0);
    }

    #[test]
    fn symbology_names_match_decoder_vocabulary() {
        assert_eq!(Symbology::Code128.to_string(), "CODE_128");
        assert_eq!("UPC_A".parse::<Symbology>().ok(), Some(Symbology::UpcA));
        assert_eq!(
            serde_json::to_string(&Symbology::Ean13).ok().as_deref(),
            Some("\"EAN_13\"")
        );
    }
}
