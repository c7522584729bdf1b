//! CLI error types with miette diagnostics.
//!
//! Maps config, scenario, and scan failures into user-facing errors with
//! actionable help text and a stable exit code.

use miette::Diagnostic;
use thiserror::Error;

use camscan_config::ConfigError;
use camscan_core::ScanError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CAMERA_UNAVAILABLE: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Scanning ─────────────────────────────────────────────────────

    #[error("No camera could be opened after {attempts} attempt(s)")]
    #[diagnostic(
        code(camscan::camera_unavailable),
        help(
            "Every acquisition strategy failed.\n\
             Check camera permissions and that no other application holds the camera."
        )
    )]
    CameraUnavailable { attempts: usize },

    #[error("Scan ended without a code")]
    #[diagnostic(code(camscan::scan_failed))]
    ScanFailed {
        #[source]
        reason: ScanError,
    },

    #[error("Scan was stopped before a code was decoded")]
    #[diagnostic(
        code(camscan::cancelled),
        help("Add a `code` frame to the scenario, or raise --stop-after.")
    )]
    Cancelled,

    #[error("Scan session ended without a report")]
    #[diagnostic(
        code(camscan::session_aborted),
        help("The session task stopped unexpectedly. Re-run with -vv for details.")
    )]
    SessionAborted,

    // ── Scenario ─────────────────────────────────────────────────────

    #[error("Could not parse scenario {path}")]
    #[diagnostic(
        code(camscan::scenario),
        help("Scenarios are TOML; see `camscan simulate --help` for the shape.")
    )]
    Scenario {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(camscan::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error(transparent)]
    #[diagnostic(
        code(camscan::config),
        help("Inspect the merged configuration with: camscan config show")
    )]
    Config(#[from] ConfigError),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not serialize output: {0}")]
    #[diagnostic(code(camscan::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::CameraUnavailable { .. } => exit_code::CAMERA_UNAVAILABLE,
            Self::Validation { .. } | Self::Scenario { .. } | Self::Config(_) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── ScanError → CliError mapping ─────────────────────────────────────

impl From<ScanError> for CliError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::CameraUnavailable { attempts } => CliError::CameraUnavailable { attempts },
            reason => CliError::ScanFailed { reason },
        }
    }
}

#[cfg(test)]
mod tests {
    use camscan_core::PlatformError;

    use super::*;

    #[test]
    fn camera_unavailable_maps_to_its_own_exit_code() {
        let err = CliError::from(ScanError::CameraUnavailable { attempts: 3 });
        assert_eq!(err.exit_code(), exit_code::CAMERA_UNAVAILABLE);
        assert_eq!(
            err.to_string(),
            "No camera could be opened after 3 attempt(s)"
        );
    }

    #[test]
    fn other_scan_errors_are_general_failures() {
        let err = CliError::from(ScanError::StreamLost);
        assert!(matches!(err, CliError::ScanFailed { .. }));
        assert_eq!(err.exit_code(), exit_code::GENERAL);

        let stop = CliError::from(ScanError::StopFailed {
            reason: PlatformError::Other("gone".into()),
        });
        assert_eq!(stop.exit_code(), exit_code::GENERAL);
        assert_eq!(CliError::Cancelled.exit_code(), exit_code::GENERAL);
    }

    #[test]
    fn config_errors_are_usage_errors() {
        let err = CliError::from(ConfigError::Validation {
            field: "fps".into(),
            reason: "expected 1..=60, got 0".into(),
        });
        assert_eq!(err.exit_code(), exit_code::USAGE);
    }
}
