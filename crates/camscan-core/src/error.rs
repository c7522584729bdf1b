// ── Core error types ──
//
// `PlatformError` is what injected collaborators report. `ScanError` is
// the scanner's own taxonomy; only the terminal variants ever surface as
// a user-visible outcome, the rest are observability-only.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::controller::LifecycleState;
use crate::model::AcquisitionStrategy;

/// Failure reported by a platform capability (enumeration, decoder).
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "message", rename_all = "kebab-case")]
pub enum PlatformError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("no matching camera: {0}")]
    NotFound(String),

    #[error("camera could not be read: {0}")]
    NotReadable(String),

    #[error("constraint cannot be satisfied: {0}")]
    Overconstrained(String),

    #[error("{0}")]
    Other(String),
}

/// Scanner error taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    // ── Enumeration (non-fatal, triggers facing-mode fallback) ───────
    #[error("camera enumeration denied: {reason}")]
    EnumerationDenied { reason: PlatformError },

    #[error("no camera devices found")]
    NoDevicesFound,

    // ── Acquisition ──────────────────────────────────────────────────
    /// One strategy failed; the next one in the chain is tried.
    #[error("stream acquisition failed with {strategy}: {reason}")]
    StreamAcquisitionFailed {
        strategy: AcquisitionStrategy,
        reason: PlatformError,
    },

    /// Every strategy in the chain failed.
    #[error("camera unavailable after {attempts} acquisition attempt(s)")]
    CameraUnavailable { attempts: usize },

    // ── Scanning ─────────────────────────────────────────────────────
    /// No code in this frame. Expected on nearly every frame.
    #[error("no code in frame: {message}")]
    DecodeFrameError { message: String },

    #[error("decoder frame stream ended while scanning")]
    StreamLost,

    // ── Teardown ─────────────────────────────────────────────────────
    #[error("scanner stop failed: {reason}")]
    StopFailed { reason: PlatformError },

    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("a scan session is already active (state: {state})")]
    SessionActive { state: LifecycleState },

    /// The session task died before it could release and report.
    #[error("scan session aborted: {message}")]
    SessionAborted { message: String },
}

impl ScanError {
    /// Classify an enumeration failure. Either way the caller falls back to
    /// facing-mode strategies; only the reported kind differs.
    pub fn from_enumeration(reason: PlatformError) -> Self {
        match reason {
            PlatformError::NotFound(_) => Self::NoDevicesFound,
            reason => Self::EnumerationDenied { reason },
        }
    }

    /// Terminal errors end a session without a decoded value.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::CameraUnavailable { .. } | Self::StreamLost | Self::SessionAborted { .. }
        )
    }

    /// Short stable name for logs and telemetry.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::EnumerationDenied { .. } => "enumeration_denied",
            Self::NoDevicesFound => "no_devices_found",
            Self::StreamAcquisitionFailed { .. } => "stream_acquisition_failed",
            Self::CameraUnavailable { .. } => "camera_unavailable",
            Self::DecodeFrameError { .. } => "decode_frame_error",
            Self::StreamLost => "stream_lost",
            Self::StopFailed { .. } => "stop_failed",
            Self::SessionActive { .. } => "session_active",
            Self::SessionAborted { .. } => "session_aborted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_session_ending_errors_are_terminal() {
        assert!(ScanError::CameraUnavailable { attempts: 3 }.is_terminal());
        assert!(ScanError::StreamLost.is_terminal());
        assert!(
            ScanError::SessionAborted {
                message: "boom".into()
            }
            .is_terminal()
        );
        assert!(!ScanError::NoDevicesFound.is_terminal());
        assert!(
            !ScanError::StreamAcquisitionFailed {
                strategy: AcquisitionStrategy::EnvironmentFacingExact,
                reason: PlatformError::Overconstrained("facingMode".into()),
            }
            .is_terminal()
        );
        assert!(
            !ScanError::StopFailed {
                reason: PlatformError::Other("track already ended".into())
            }
            .is_terminal()
        );
    }

    #[test]
    fn missing_camera_during_enumeration_is_not_a_denial() {
        assert_eq!(
            ScanError::from_enumeration(PlatformError::NotFound("no video input".into())),
            ScanError::NoDevicesFound
        );
        assert_eq!(
            ScanError::from_enumeration(PlatformError::Other("media devices unsupported".into()))
                .kind(),
            "enumeration_denied"
        );
    }

    #[test]
    fn messages_name_the_failing_strategy() {
        let err = ScanError::StreamAcquisitionFailed {
            strategy: AcquisitionStrategy::ExactDevice("2".into()),
            reason: PlatformError::NotReadable("device in use".into()),
        };
        assert_eq!(
            err.to_string(),
            "stream acquisition failed with exact-device(2): camera could not be read: device in use"
        );
    }

    #[test]
    fn platform_error_serializes_with_kind_tag() {
        let json = serde_json::to_value(PlatformError::PermissionDenied("prompt dismissed".into()))
            .expect("serializable");
        assert_eq!(
            json,
            serde_json::json!({ "kind": "permission-denied", "message": "prompt dismissed" })
        );
    }
}
