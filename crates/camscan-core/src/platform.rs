// ── Platform collaborators ──
//
// The scanner core never touches a camera, a DOM, or a barcode decoder
// directly. Hosts inject these capabilities; every async method returns a
// boxed future so the traits stay object-safe and can be held as
// `Arc<dyn _>`.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio::sync::mpsc;

use crate::error::PlatformError;
use crate::model::{CameraConstraints, CameraDevice, ScanConfig, SurfaceLayout, Viewport};

/// One decode attempt on one video frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    /// A code was found; carries the decoded text.
    Decoded(String),
    /// No code in this frame. Soft error, never escalated.
    Miss(String),
}

/// Where a started decoder pushes its per-frame results.
pub type FrameSender = mpsc::UnboundedSender<FrameEvent>;

/// Lists the cameras currently attached.
pub trait CameraEnumerator: Send + Sync {
    fn list_cameras(&self) -> BoxFuture<'_, Result<Vec<CameraDevice>, PlatformError>>;
}

/// A live decoder bound to a render target.
///
/// `start` opens a camera stream with the given constraints and begins
/// decoding; on success, frame results flow through `frames` until `stop`.
pub trait Decoder: Send {
    fn start<'a>(
        &'a mut self,
        constraints: &'a CameraConstraints,
        config: &'a ScanConfig,
        frames: FrameSender,
    ) -> BoxFuture<'a, Result<(), PlatformError>>;

    /// Stop the underlying camera stream.
    fn stop(&mut self) -> BoxFuture<'_, Result<(), PlatformError>>;

    /// Release internal buffers and detach from the render target.
    fn clear(&mut self) -> Result<(), PlatformError>;
}

/// Constructs decoders against a named render target.
pub trait DecoderFactory: Send + Sync {
    fn create(&self, render_target: &str) -> Box<dyn Decoder>;
}

/// The modal that hosts the scan surface.
pub trait ScanSurface: Send + Sync {
    /// Element id of the video/decoder render surface.
    fn render_target(&self) -> &str;

    fn viewport(&self) -> Viewport;

    /// Reveal the modal with the given layout applied.
    fn show(&self, layout: &SurfaceLayout);

    fn hide(&self);
}

/// The set of capabilities a [`ScanController`](crate::ScanController) is built with.
#[derive(Clone)]
pub struct Collaborators {
    pub cameras: Arc<dyn CameraEnumerator>,
    pub decoders: Arc<dyn DecoderFactory>,
    pub surface: Arc<dyn ScanSurface>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("render_target", &self.surface.render_target())
            .finish_non_exhaustive()
    }
}
