// ── Scan session ──
//
// One decoder lifetime. Resolves the strategy chain, attempts each
// strategy strictly in order, streams frame results until the first
// decode, then releases the decoder exactly once. Cancellation arrives
// through a `CancellationToken`; an acquisition that completes after a
// stop request is released instead of scanned.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::controller::LifecycleState;
use crate::error::{PlatformError, ScanError};
use crate::model::{AcquisitionStrategy, DeviceClass, ScanConfig, StrategyOrder};
use crate::platform::{Decoder, FrameEvent};
use crate::resolver::{CameraSourceResolver, StrategyPlan};
use crate::sink::ScanSink;

// ── Reporting types ──────────────────────────────────────────────

/// One acquisition attempt and how it ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub strategy: AcquisitionStrategy,
    /// `None` when the stream was acquired.
    pub error: Option<PlatformError>,
}

impl AttemptRecord {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// How a session ended. Exactly one per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The sink was called once with this text.
    Decoded(String),
    /// Stopped on request before a code was decoded.
    Cancelled,
    /// Ended without a decode; the sink was never called.
    Failed(ScanError),
}

impl ScanOutcome {
    pub fn decoded(&self) -> Option<&str> {
        match self {
            Self::Decoded(text) => Some(text),
            Self::Cancelled | Self::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ScanError> {
        match self {
            Self::Failed(e) => Some(e),
            Self::Decoded(_) | Self::Cancelled => None,
        }
    }
}

/// Everything observed during one session, for logging and telemetry.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub device_class: DeviceClass,
    pub plan: StrategyPlan,
    pub attempts: Vec<AttemptRecord>,
    /// Lifecycle states entered, in order, starting at `Opening`.
    pub transitions: Vec<LifecycleState>,
    pub outcome: ScanOutcome,
    /// Best-effort teardown failure, if any. Never blocks hiding the modal.
    pub stop_error: Option<ScanError>,
}

impl SessionReport {
    /// Report for a session whose task died before it could report itself.
    pub(crate) fn aborted(session_id: Uuid, device_class: DeviceClass, message: String) -> Self {
        Self {
            session_id,
            device_class,
            plan: StrategyPlan::default(),
            attempts: Vec::new(),
            transitions: vec![LifecycleState::Opening, LifecycleState::Stopping],
            outcome: ScanOutcome::Failed(ScanError::SessionAborted { message }),
            stop_error: None,
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "panic with a non-string payload".into()
    }
}

// ── Session ──────────────────────────────────────────────────────

enum Acquisition {
    Stream(mpsc::UnboundedReceiver<FrameEvent>),
    Cancelled,
    Exhausted,
}

pub(crate) struct SessionParams {
    pub id: Uuid,
    pub device_class: DeviceClass,
    pub order: StrategyOrder,
    pub config: ScanConfig,
    pub resolver: CameraSourceResolver,
    pub decoder: Box<dyn Decoder>,
    pub state: watch::Sender<LifecycleState>,
    pub cancel: CancellationToken,
}

pub(crate) struct ScanSession {
    id: Uuid,
    device_class: DeviceClass,
    order: StrategyOrder,
    config: ScanConfig,
    resolver: CameraSourceResolver,
    /// The session's only decoder. Taken on release, so release runs once.
    decoder: Option<Box<dyn Decoder>>,
    /// Whether the decoder currently holds an open camera stream.
    streaming: bool,
    attempts: Vec<AttemptRecord>,
    transitions: Vec<LifecycleState>,
    stop_error: Option<ScanError>,
    state: watch::Sender<LifecycleState>,
    cancel: CancellationToken,
}

impl ScanSession {
    pub(crate) fn new(params: SessionParams) -> Self {
        Self {
            id: params.id,
            device_class: params.device_class,
            order: params.order,
            config: params.config,
            resolver: params.resolver,
            decoder: Some(params.decoder),
            streaming: false,
            attempts: Vec::new(),
            transitions: vec![LifecycleState::Opening],
            stop_error: None,
            state: params.state,
            cancel: params.cancel,
        }
    }

    /// Drive the session to completion and release the decoder.
    pub(crate) async fn run(mut self, sink: ScanSink) -> SessionReport {
        let plan = self.resolver.resolve(self.device_class, self.order).await;
        debug!(chain = ?plan.chain, "strategy chain resolved");

        let outcome = match self.acquire(&plan.chain).await {
            Acquisition::Stream(frames) => scan(self.cancel.clone(), frames, sink).await,
            Acquisition::Cancelled => ScanOutcome::Cancelled,
            Acquisition::Exhausted => {
                let attempts = self.attempts.len();
                ScanOutcome::Failed(ScanError::CameraUnavailable { attempts })
            }
        };

        self.release().await;

        SessionReport {
            session_id: self.id,
            device_class: self.device_class,
            plan,
            attempts: self.attempts,
            transitions: self.transitions,
            outcome,
            stop_error: self.stop_error,
        }
    }

    /// Try each strategy in order; the next attempt starts only after the
    /// previous one has resolved.
    async fn acquire(&mut self, chain: &[AcquisitionStrategy]) -> Acquisition {
        for strategy in chain {
            if self.cancel.is_cancelled() {
                debug!(%strategy, "stop requested, abandoning acquisition");
                return Acquisition::Cancelled;
            }
            let Some(decoder) = self.decoder.as_mut() else {
                return Acquisition::Cancelled;
            };

            let (frames_tx, frames_rx) = mpsc::unbounded_channel();
            let constraints = strategy.constraints();
            debug!(%strategy, constraints = %constraints.to_json(), "attempting stream acquisition");

            let result = decoder.start(&constraints, &self.config, frames_tx).await;
            match result {
                Ok(()) => {
                    self.streaming = true;
                    self.attempts.push(AttemptRecord {
                        strategy: strategy.clone(),
                        error: None,
                    });
                    if self.cancel.is_cancelled() {
                        info!(%strategy, "stream acquired after stop was requested, releasing");
                        return Acquisition::Cancelled;
                    }
                    info!(%strategy, "camera stream acquired");
                    self.transition(LifecycleState::Scanning);
                    return Acquisition::Stream(frames_rx);
                }
                Err(reason) => {
                    let err = ScanError::StreamAcquisitionFailed {
                        strategy: strategy.clone(),
                        reason: reason.clone(),
                    };
                    warn!(error = %err, "acquisition attempt failed, trying next strategy");
                    self.attempts.push(AttemptRecord {
                        strategy: strategy.clone(),
                        error: Some(reason),
                    });
                }
            }
        }

        if self.cancel.is_cancelled() {
            Acquisition::Cancelled
        } else {
            Acquisition::Exhausted
        }
    }

    /// Stop the stream (if one is open), then clear the decoder. Both steps
    /// are best-effort: failures are recorded and logged, never propagated.
    async fn release(&mut self) {
        self.transition(LifecycleState::Stopping);

        let Some(mut decoder) = self.decoder.take() else {
            return;
        };

        if std::mem::take(&mut self.streaming) {
            if let Err(reason) = decoder.stop().await {
                let err = ScanError::StopFailed { reason };
                warn!(error = %err, "camera stream stop failed, continuing teardown");
                self.stop_error = Some(err);
            }
        }

        if let Err(reason) = decoder.clear() {
            warn!(error = %reason, "decoder clear failed, continuing teardown");
            self.stop_error.get_or_insert(ScanError::StopFailed { reason });
        }

        debug!("decoder released");
    }

    fn transition(&mut self, next: LifecycleState) {
        self.transitions.push(next);
        self.state.send_replace(next);
    }
}

/// Consume frame results until the first decode, a stop request, or the
/// decoder closing its frame channel.
async fn scan(
    cancel: CancellationToken,
    mut frames: mpsc::UnboundedReceiver<FrameEvent>,
    sink: ScanSink,
) -> ScanOutcome {
    let mut misses: u64 = 0;

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(misses, "stop requested while scanning");
                return ScanOutcome::Cancelled;
            }
            event = frames.recv() => match event {
                Some(FrameEvent::Decoded(text)) => {
                    info!(misses, "code decoded");
                    let delivered = text.clone();
                    if let Err(payload) = catch_unwind(AssertUnwindSafe(move || sink(delivered))) {
                        let message = panic_message(payload.as_ref());
                        error!(panic = %message, "scan sink panicked, releasing camera");
                    }
                    return ScanOutcome::Decoded(text);
                }
                Some(FrameEvent::Miss(message)) => {
                    misses += 1;
                    let err = ScanError::DecodeFrameError { message };
                    trace!(error = %err, "frame skipped");
                }
                None => {
                    warn!(misses, "decoder frame stream closed while scanning");
                    return ScanOutcome::Failed(ScanError::StreamLost);
                }
            }
        }
    }
}
