// ── Domain model ──
//
// Plain data types shared by the resolver, session, and controller.

pub mod device;
pub mod settings;
pub mod strategy;

pub use device::{CameraDevice, DeviceClass};
pub use settings::{
    BusyPolicy, CaptureRegion, DEFAULT_FPS, DEFAULT_SYMBOLOGIES, DecodeBox, DecodeRegion,
    DeviceProfiles, OverlayLayers, ScanConfig, ScanProfile, ScannerSettings, SurfaceLayout,
    Symbology, Viewport,
};
pub use strategy::{AcquisitionStrategy, CameraConstraints, Constrain, StrategyOrder};
