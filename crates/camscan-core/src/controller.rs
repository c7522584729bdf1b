// ── Lifecycle controller ──
//
// Gates modal visibility and session start/stop. One controller drives
// one modal: at most one session is live at a time. Each session runs on
// its own task under a small supervisor task that finishes the session
// even if the session task dies; the controller keeps only a cancellation
// token and a shared completion future for it.
//
//   Idle → Opening → Scanning → Stopping → Idle
//              └──────────────────┘ (acquisition failed or stopped early)

use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use strum::Display;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinError;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::error::ScanError;
use crate::model::{BusyPolicy, DeviceClass, ScannerSettings};
use crate::platform::Collaborators;
use crate::resolver::CameraSourceResolver;
use crate::session::{ScanOutcome, ScanSession, SessionParams, SessionReport, panic_message};
use crate::sink::ScanSink;

// ── LifecycleState ───────────────────────────────────────────────

/// Scanner lifecycle phase, observable by consumers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum LifecycleState {
    #[default]
    Idle,
    Opening,
    Scanning,
    Stopping,
}

// ── ScanController ───────────────────────────────────────────────

type SessionDone = Shared<BoxFuture<'static, Option<Arc<SessionReport>>>>;

struct ActiveScan {
    id: Uuid,
    cancel: CancellationToken,
    done: SessionDone,
}

/// The entry point for hosts.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Built with injected
/// collaborators, so several independent controllers can coexist.
#[derive(Clone)]
pub struct ScanController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    settings: ScannerSettings,
    device_class: DeviceClass,
    collaborators: Collaborators,
    state: watch::Sender<LifecycleState>,
    active: Mutex<Option<ActiveScan>>,
    last_report: watch::Sender<Option<Arc<SessionReport>>>,
}

impl std::fmt::Debug for ScanController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanController")
            .field("device_class", &self.inner.device_class)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl ScanController {
    pub fn new(
        settings: ScannerSettings,
        device_class: DeviceClass,
        collaborators: Collaborators,
    ) -> Self {
        let (state, _) = watch::channel(LifecycleState::Idle);
        let (last_report, _) = watch::channel(None);

        Self {
            inner: Arc::new(ControllerInner {
                settings,
                device_class,
                collaborators,
                state,
                active: Mutex::new(None),
                last_report,
            }),
        }
    }

    pub fn settings(&self) -> &ScannerSettings {
        &self.inner.settings
    }

    pub fn device_class(&self) -> DeviceClass {
        self.inner.device_class
    }

    pub fn state(&self) -> LifecycleState {
        *self.inner.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<LifecycleState> {
        self.inner.state.subscribe()
    }

    /// Lifecycle changes as a `Stream`, starting with the current state.
    pub fn state_stream(&self) -> WatchStream<LifecycleState> {
        WatchStream::new(self.inner.state.subscribe())
    }

    /// Report of the most recently finished session.
    pub fn last_report(&self) -> Option<Arc<SessionReport>> {
        self.inner.last_report.borrow().clone()
    }

    pub fn last_outcome(&self) -> Option<ScanOutcome> {
        self.last_report().map(|r| r.outcome.clone())
    }

    async fn is_active(&self) -> bool {
        self.inner.active.lock().await.is_some()
    }

    // ── Scan requests ────────────────────────────────────────────

    /// Open the modal and start a session that delivers at most one
    /// decoded value to `sink`.
    ///
    /// Returns as soon as the session task is spawned; the modal is shown
    /// before any camera is requested. While a session is live the
    /// configured [`BusyPolicy`] decides between rejecting this request and
    /// restarting.
    pub async fn request_scan<F>(&self, sink: F) -> Result<Uuid, ScanError>
    where
        F: FnOnce(String) + Send + 'static,
    {
        if self.inner.settings.busy_policy == BusyPolicy::Restart && self.is_active().await {
            info!("scan requested while busy, restarting session");
            self.request_stop().await;
        }

        let mut active = self.inner.active.lock().await;
        if active.is_some() {
            let state = self.state();
            warn!(%state, "scan requested while a session is active");
            return Err(ScanError::SessionActive { state });
        }

        let inner = &self.inner;
        let id = Uuid::new_v4();
        let class = inner.device_class;
        inner.state.send_replace(LifecycleState::Opening);

        let surface = &inner.collaborators.surface;
        let layout = inner.settings.layout(class);
        surface.show(&layout);

        let config = inner.settings.scan_config(class, surface.viewport());
        debug!(?layout, ?config, "scan surface configured");

        let cancel = CancellationToken::new();
        let session = ScanSession::new(SessionParams {
            id,
            device_class: class,
            order: inner.settings.strategy_order,
            config,
            resolver: CameraSourceResolver::new(Arc::clone(&inner.collaborators.cameras)),
            decoder: inner.collaborators.decoders.create(surface.render_target()),
            state: inner.state.clone(),
            cancel: cancel.clone(),
        });

        let sink: ScanSink = Box::new(sink);
        let ctrl = self.clone();
        let span = info_span!("scan_session", session_id = %id, device_class = %class);
        let worker = tokio::spawn(session.run(sink).instrument(span.clone()));
        let handle = tokio::spawn(
            async move {
                let report = match worker.await {
                    Ok(report) => report,
                    Err(err) => ctrl.recover(id, err),
                };
                ctrl.finish(id, report).await
            }
            .instrument(span),
        );
        let done = async move { handle.await.ok() }.boxed().shared();

        *active = Some(ActiveScan { id, cancel, done });
        info!(session_id = %id, device_class = %class, "scan started");
        Ok(id)
    }

    /// Stand-in report for a session task that panicked or was aborted
    /// before it could release and report. Its decoder is already dropped.
    fn recover(&self, id: Uuid, err: JoinError) -> SessionReport {
        let message = if err.is_panic() {
            panic_message(err.into_panic().as_ref())
        } else {
            err.to_string()
        };
        error!(reason = %message, "scan session task died, recovering");
        self.inner.state.send_replace(LifecycleState::Stopping);
        SessionReport::aborted(id, self.inner.device_class, message)
    }

    /// Hide the modal, publish the report, and return to `Idle`.
    async fn finish(&self, id: Uuid, mut report: SessionReport) -> Arc<SessionReport> {
        self.inner.collaborators.surface.hide();
        report.transitions.push(LifecycleState::Idle);

        match &report.outcome {
            ScanOutcome::Decoded(_) => info!("scan completed with a decoded value"),
            ScanOutcome::Cancelled => info!("scan cancelled"),
            ScanOutcome::Failed(e) => error!(kind = e.kind(), error = %e, "scan failed"),
        }

        let report = Arc::new(report);
        self.inner.last_report.send_replace(Some(Arc::clone(&report)));

        let mut active = self.inner.active.lock().await;
        if active.as_ref().is_some_and(|scan| scan.id == id) {
            self.inner.state.send_replace(LifecycleState::Idle);
            *active = None;
        }
        report
    }

    // ── Stopping ─────────────────────────────────────────────────

    /// Ask the live session to stop without waiting for teardown.
    ///
    /// Returns `false` when there is nothing to stop.
    pub async fn signal_stop(&self) -> bool {
        let active = self.inner.active.lock().await;
        if let Some(scan) = active.as_ref() {
            if !scan.cancel.is_cancelled() {
                info!(session_id = %scan.id, "stop requested");
            }
            scan.cancel.cancel();
            true
        } else {
            debug!("stop requested while idle, nothing to do");
            false
        }
    }

    /// Stop the live session and wait until its camera stream and decoder
    /// are released and the modal is hidden.
    ///
    /// Idempotent: from `Idle` this is a no-op returning `None`; concurrent
    /// callers all observe the same single teardown.
    pub async fn request_stop(&self) -> Option<Arc<SessionReport>> {
        let done = {
            let active = self.inner.active.lock().await;
            let Some(scan) = active.as_ref() else {
                debug!("stop requested while idle, nothing to do");
                return None;
            };
            if !scan.cancel.is_cancelled() {
                info!(session_id = %scan.id, "stop requested");
            }
            scan.cancel.cancel();
            scan.done.clone()
        };
        done.await
    }

    /// Wait for the live session to end on its own. Returns the last
    /// report immediately when idle.
    pub async fn wait(&self) -> Option<Arc<SessionReport>> {
        let done = self
            .inner
            .active
            .lock()
            .await
            .as_ref()
            .map(|scan| scan.done.clone());
        match done {
            Some(done) => done.await,
            None => self.last_report(),
        }
    }
}
