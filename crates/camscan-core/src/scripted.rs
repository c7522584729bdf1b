// ── Scripted platform ──
//
// A deterministic stand-in for camera enumeration, the decoder, and the
// modal surface. Outcomes come from a `Script`; every call is journaled so
// callers can check ordering (acquisition attempts, stop before clear,
// hide after release). Used by the test suite and by `camscan simulate`.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

use crate::error::PlatformError;
use crate::model::{CameraConstraints, CameraDevice, ScanConfig, SurfaceLayout, Viewport};
use crate::platform::{
    CameraEnumerator, Collaborators, Decoder, DecoderFactory, FrameEvent, FrameSender,
    ScanSurface,
};

const MISS_MESSAGE: &str = "No barcode or QR code detected.";

// ── Script ───────────────────────────────────────────────────────

/// Result of one acquisition attempt, consumed in attempt order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "kebab-case")]
pub enum AcquisitionScript {
    Ok,
    Fail { error: PlatformError },
}

/// One frame produced after a successful acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FrameScript {
    Miss,
    Code { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Script {
    pub devices: Vec<CameraDevice>,
    /// When set, enumeration fails with this error instead of listing `devices`.
    pub enumeration_error: Option<PlatformError>,
    /// Attempts past the end of this list succeed.
    pub acquisitions: Vec<AcquisitionScript>,
    pub frames: Vec<FrameScript>,
    /// Close the frame channel once `frames` are delivered.
    pub close_after_frames: bool,
    pub stop_error: Option<PlatformError>,
    pub clear_error: Option<PlatformError>,
    pub viewport: Viewport,
    pub render_target: String,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            devices: Vec::new(),
            enumeration_error: None,
            acquisitions: Vec::new(),
            frames: Vec::new(),
            close_after_frames: false,
            stop_error: None,
            clear_error: None,
            viewport: Viewport::default(),
            render_target: "scanner-container".into(),
        }
    }
}

/// A collaborator call, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    Show(SurfaceLayout),
    Hide,
    Enumerate,
    CreateDecoder(String),
    Start(CameraConstraints),
    Stop,
    Clear,
}

// ── ScriptedPlatform ─────────────────────────────────────────────

#[derive(Clone)]
pub struct ScriptedPlatform {
    inner: Arc<ScriptedInner>,
}

struct ScriptedInner {
    script: Script,
    journal: Mutex<Vec<PlatformCall>>,
    next_acquisition: AtomicUsize,
    visible: AtomicBool,
    /// When present, each acquisition waits for one permit before resolving.
    gate: Option<Arc<Notify>>,
}

impl std::fmt::Debug for ScriptedPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedPlatform")
            .field("script", &self.inner.script)
            .field("visible", &self.is_visible())
            .finish_non_exhaustive()
    }
}

impl ScriptedPlatform {
    pub fn new(script: Script) -> Self {
        Self::build(script, None)
    }

    /// Like [`new`](Self::new), but every acquisition blocks until the
    /// returned `Notify` hands out a permit.
    pub fn gated(script: Script) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        (Self::build(script, Some(Arc::clone(&gate))), gate)
    }

    fn build(script: Script, gate: Option<Arc<Notify>>) -> Self {
        Self {
            inner: Arc::new(ScriptedInner {
                script,
                journal: Mutex::new(Vec::new()),
                next_acquisition: AtomicUsize::new(0),
                visible: AtomicBool::new(false),
                gate,
            }),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            cameras: Arc::new(self.clone()),
            decoders: Arc::new(self.clone()),
            surface: Arc::new(self.clone()),
        }
    }

    pub fn script(&self) -> &Script {
        &self.inner.script
    }

    pub fn journal(&self) -> Vec<PlatformCall> {
        self.inner
            .journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Constraints of every acquisition attempt so far.
    pub fn attempted_constraints(&self) -> Vec<CameraConstraints> {
        self.journal()
            .into_iter()
            .filter_map(|call| match call {
                PlatformCall::Start(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, call: &PlatformCall) -> usize {
        self.journal().iter().filter(|c| *c == call).count()
    }

    pub fn is_visible(&self) -> bool {
        self.inner.visible.load(Ordering::SeqCst)
    }

    fn record(&self, call: PlatformCall) {
        self.inner
            .journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }
}

impl CameraEnumerator for ScriptedPlatform {
    fn list_cameras(&self) -> BoxFuture<'_, Result<Vec<CameraDevice>, PlatformError>> {
        self.record(PlatformCall::Enumerate);
        let script = &self.inner.script;
        let result = match script.enumeration_error {
            Some(ref e) => Err(e.clone()),
            None => Ok(script.devices.clone()),
        };
        async move { result }.boxed()
    }
}

impl ScanSurface for ScriptedPlatform {
    fn render_target(&self) -> &str {
        &self.inner.script.render_target
    }

    fn viewport(&self) -> Viewport {
        self.inner.script.viewport
    }

    fn show(&self, layout: &SurfaceLayout) {
        self.record(PlatformCall::Show(*layout));
        self.inner.visible.store(true, Ordering::SeqCst);
    }

    fn hide(&self) {
        self.record(PlatformCall::Hide);
        self.inner.visible.store(false, Ordering::SeqCst);
    }
}

impl DecoderFactory for ScriptedPlatform {
    fn create(&self, render_target: &str) -> Box<dyn Decoder> {
        self.record(PlatformCall::CreateDecoder(render_target.to_owned()));
        Box::new(ScriptedDecoder {
            platform: self.clone(),
            frames: None,
        })
    }
}

// ── ScriptedDecoder ──────────────────────────────────────────────

struct ScriptedDecoder {
    platform: ScriptedPlatform,
    /// Held while "streaming" so the session keeps waiting for frames.
    frames: Option<FrameSender>,
}

impl Decoder for ScriptedDecoder {
    fn start<'a>(
        &'a mut self,
        constraints: &'a CameraConstraints,
        _config: &'a ScanConfig,
        frames: FrameSender,
    ) -> BoxFuture<'a, Result<(), PlatformError>> {
        self.platform.record(PlatformCall::Start(constraints.clone()));
        let inner = Arc::clone(&self.platform.inner);
        let index = inner.next_acquisition.fetch_add(1, Ordering::SeqCst);
        let outcome = inner
            .script
            .acquisitions
            .get(index)
            .cloned()
            .unwrap_or(AcquisitionScript::Ok);

        async move {
            if let Some(ref gate) = inner.gate {
                gate.notified().await;
            }
            match outcome {
                AcquisitionScript::Fail { error } => Err(error),
                AcquisitionScript::Ok => {
                    for frame in &inner.script.frames {
                        let event = match frame {
                            FrameScript::Miss => FrameEvent::Miss(MISS_MESSAGE.into()),
                            FrameScript::Code { text } => FrameEvent::Decoded(text.clone()),
                        };
                        // Receiver gone means the session already stopped.
                        let _ = frames.send(event);
                    }
                    if !inner.script.close_after_frames {
                        self.frames = Some(frames);
                    }
                    Ok(())
                }
            }
        }
        .boxed()
    }

    fn stop(&mut self) -> BoxFuture<'_, Result<(), PlatformError>> {
        self.platform.record(PlatformCall::Stop);
        self.frames = None;
        let result = match self.platform.inner.script.stop_error {
            Some(ref e) => Err(e.clone()),
            None => Ok(()),
        };
        async move { result }.boxed()
    }

    fn clear(&mut self) -> Result<(), PlatformError> {
        self.platform.record(PlatformCall::Clear);
        match self.platform.inner.script.clear_error {
            Some(ref e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}
