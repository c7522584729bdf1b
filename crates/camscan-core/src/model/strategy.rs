// ── Acquisition strategies ──
//
// One strategy is one way of asking the platform for a camera stream.
// Strategies translate into the platform's constraint vocabulary
// (`{"deviceId": {"exact": ..}}`, `{"facingMode": ..}`) right before an
// attempt is made.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How to request a camera stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AcquisitionStrategy {
    /// The specific device picked by the resolver.
    ExactDevice(String),
    /// Strict rear-camera request; fails if no camera faces the environment.
    EnvironmentFacingExact,
    /// Best-effort rear-camera request; the platform may hand back any camera.
    EnvironmentFacingPreferred,
}

impl AcquisitionStrategy {
    /// Translate into the platform constraint vocabulary.
    pub fn constraints(&self) -> CameraConstraints {
        match self {
            Self::ExactDevice(id) => CameraConstraints {
                device_id: Some(Constrain::Exact { exact: id.clone() }),
                facing_mode: None,
            },
            Self::EnvironmentFacingExact => CameraConstraints {
                device_id: None,
                facing_mode: Some(Constrain::Exact {
                    exact: ENVIRONMENT.into(),
                }),
            },
            Self::EnvironmentFacingPreferred => CameraConstraints {
                device_id: None,
                facing_mode: Some(Constrain::Ideal(ENVIRONMENT.into())),
            },
        }
    }

    pub fn is_device_based(&self) -> bool {
        matches!(self, Self::ExactDevice(_))
    }
}

impl fmt::Display for AcquisitionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExactDevice(id) => write!(f, "exact-device({id})"),
            Self::EnvironmentFacingExact => f.write_str("environment-facing-exact"),
            Self::EnvironmentFacingPreferred => f.write_str("environment-facing-preferred"),
        }
    }
}

const ENVIRONMENT: &str = "environment";

/// Order in which device-based and facing-mode strategies are tried.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum StrategyOrder {
    /// Exact device first, then strict and preferred facing mode.
    #[default]
    DeviceFirst,
    /// Strict and preferred facing mode first, exact device last.
    FacingFirst,
}

// ── Platform constraint vocabulary ───────────────────────────────────

/// Video constraints handed to the decoding capability.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<Constrain>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facing_mode: Option<Constrain>,
}

/// A single constrained string value: either a hard requirement or an ideal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Constrain {
    Exact { exact: String },
    Ideal(String),
}

impl CameraConstraints {
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
