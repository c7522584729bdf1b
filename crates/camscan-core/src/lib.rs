//! Camera acquisition and scanner lifecycle for in-page code scanning.
//!
//! The crate owns the failure-handling core of a scan widget: picking a
//! camera, falling back across acquisition strategies, delivering exactly
//! one decoded value, and always releasing the camera stream. Cameras,
//! decoders, and the modal are injected collaborators ([`platform`]).
//!
//! - **[`ScanController`]**: Lifecycle state machine
//!   (`Idle → Opening → Scanning → Stopping → Idle`). Shows the modal as
//!   soon as a scan is requested, runs one session at a time on its own
//!   task, hides the modal only after teardown completes.
//!
//! - **[`CameraSourceResolver`]**: Enumerates cameras, prefers a device
//!   labelled back/rear, and builds the ordered
//!   [`AcquisitionStrategy`] chain. Enumeration failures only drop the
//!   device-based strategy.
//!
//! - **Scan session**: Attempts strategies strictly in sequence, streams
//!   frames until the first decode, and releases the decoder exactly once,
//!   including when an acquisition resolves after a stop request.
//!
//! - **[`ScriptedPlatform`]**: Deterministic collaborators driven by a
//!   [`Script`], for tests and the `camscan simulate` command.

pub mod controller;
pub mod error;
pub mod model;
pub mod platform;
pub mod resolver;
pub mod scripted;
pub mod session;
pub mod sink;

// ── Primary re-exports ──────────────────────────────────────────────
pub use controller::{LifecycleState, ScanController};
pub use error::{PlatformError, ScanError};
pub use platform::{
    CameraEnumerator, Collaborators, Decoder, DecoderFactory, FrameEvent, FrameSender,
    ScanSurface,
};
pub use resolver::{CameraSourceResolver, StrategyPlan, build_strategy_chain, select_candidate};
pub use scripted::{AcquisitionScript, FrameScript, PlatformCall, Script, ScriptedPlatform};
pub use session::{AttemptRecord, ScanOutcome, SessionReport};
pub use sink::{ScanSink, TargetField, field_sink};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    AcquisitionStrategy, BusyPolicy, CameraConstraints, CameraDevice, CaptureRegion, DecodeBox,
    DecodeRegion, DeviceClass, DeviceProfiles, OverlayLayers, ScanConfig, ScanProfile,
    ScannerSettings, StrategyOrder, SurfaceLayout, Symbology, Viewport,
};
