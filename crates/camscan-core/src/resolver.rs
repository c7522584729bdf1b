// ── Camera source resolver ──
//
// Enumerates cameras, picks the most likely rear camera, and turns that
// choice into an ordered chain of acquisition strategies. Enumeration
// failures never abort a scan; they only drop the device-based strategy.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::ScanError;
use crate::model::{AcquisitionStrategy, CameraDevice, DeviceClass, StrategyOrder};
use crate::platform::CameraEnumerator;

/// Outcome of resolution: the candidate (if any) and the chain to attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrategyPlan {
    pub candidate: Option<CameraDevice>,
    pub chain: Vec<AcquisitionStrategy>,
    /// Why no candidate is known, when enumeration was attempted and failed.
    pub enumeration_error: Option<ScanError>,
}

pub struct CameraSourceResolver {
    cameras: Arc<dyn CameraEnumerator>,
}

impl CameraSourceResolver {
    pub fn new(cameras: Arc<dyn CameraEnumerator>) -> Self {
        Self { cameras }
    }

    /// Current cameras in enumeration order.
    ///
    /// Reflects live device state at call time; call again for a fresh view.
    pub async fn list_candidates(&self) -> Result<Vec<CameraDevice>, ScanError> {
        let devices = self
            .cameras
            .list_cameras()
            .await
            .map_err(ScanError::from_enumeration)?;

        if devices.is_empty() {
            return Err(ScanError::NoDevicesFound);
        }
        debug!(count = devices.len(), "enumerated cameras");
        Ok(devices)
    }

    /// Enumerate (unless the device class makes it pointless) and build the
    /// strategy chain. Never fails: enumeration errors are folded into the plan.
    pub async fn resolve(&self, class: DeviceClass, order: StrategyOrder) -> StrategyPlan {
        if class.is_embedded_webview() {
            debug!("embedded webview: skipping device enumeration");
            return StrategyPlan {
                candidate: None,
                chain: build_strategy_chain(None, class, order),
                enumeration_error: None,
            };
        }

        match self.list_candidates().await {
            Ok(devices) => {
                let candidate = select_candidate(&devices).cloned();
                if let Some(ref device) = candidate {
                    info!(
                        device_id = %device.id,
                        rear = device.looks_rear_facing(),
                        "selected camera"
                    );
                }
                let chain = build_strategy_chain(candidate.as_ref(), class, order);
                StrategyPlan {
                    candidate,
                    chain,
                    enumeration_error: None,
                }
            }
            Err(e) => {
                warn!(error = %e, "camera enumeration failed, using facing-mode strategies");
                StrategyPlan {
                    candidate: None,
                    chain: build_strategy_chain(None, class, order),
                    enumeration_error: Some(e),
                }
            }
        }
    }
}

/// First device labelled "back"/"rear" (case-insensitive), else the first device.
pub fn select_candidate(devices: &[CameraDevice]) -> Option<&CameraDevice> {
    devices
        .iter()
        .find(|d| d.looks_rear_facing())
        .or_else(|| devices.first())
}

/// Deterministic strategy chain for a candidate and device class.
///
/// Embedded webviews never get an exact-device strategy.
pub fn build_strategy_chain(
    candidate: Option<&CameraDevice>,
    class: DeviceClass,
    order: StrategyOrder,
) -> Vec<AcquisitionStrategy> {
    let device = candidate
        .filter(|_| !class.is_embedded_webview())
        .map(|d| AcquisitionStrategy::ExactDevice(d.id.clone()));
    let facing = [
        AcquisitionStrategy::EnvironmentFacingExact,
        AcquisitionStrategy::EnvironmentFacingPreferred,
    ];

    match order {
        StrategyOrder::DeviceFirst => device.into_iter().chain(facing).collect(),
        StrategyOrder::FacingFirst => facing.into_iter().chain(device).collect(),
    }
}
