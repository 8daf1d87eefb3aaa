//! Capture bookkeeping: which destination the next captured object goes
//! to, and the fast-picture batch.

use std::collections::VecDeque;
use std::path::PathBuf;

use tracing::debug;

use crate::session::Session;
use crate::traits::{CameraError, CameraSdk, Capacity, Command, ObjectRef, Result};

/// How a capture was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureKind {
    /// [`CaptureController::request_single`].
    Single,
    /// [`CaptureController::request_fast`], inside a batch.
    Fast,
}

/// A shutter release waiting for its captured object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCapture {
    /// Where the picture should end up (file or directory).
    pub dest: PathBuf,
    /// Whether live view was active before this capture paused it.
    pub resume_live_view: bool,
    /// Single or fast request.
    pub kind: CaptureKind,
}

impl PendingCapture {
    /// A single-picture capture.
    pub const fn single(dest: PathBuf, resume_live_view: bool) -> Self {
        Self {
            dest,
            resume_live_view,
            kind: CaptureKind::Single,
        }
    }

    /// A fast-picture capture.
    pub const fn fast(dest: PathBuf) -> Self {
        Self {
            dest,
            resume_live_view: false,
            kind: CaptureKind::Fast,
        }
    }
}

/// A captured object paired with its destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferItem {
    /// Device-side object reference, owned by this item.
    pub object: ObjectRef,
    /// The capture it completes.
    pub capture: PendingCapture,
}

/// What to do with an object-ready notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectReady {
    /// Transfer it now.
    Transfer(TransferItem),
    /// Queued until the batch ends.
    Queued,
    /// No capture was waiting for it.
    Unexpected(ObjectRef),
}

/// Fast-picture batch drained by [`CaptureController::end_batch`].
#[derive(Debug, Default)]
pub struct Batch {
    /// Whether live view was active when the batch began.
    pub resume_live_view: bool,
    /// Objects that arrived during the batch, in arrival order.
    pub queued: VecDeque<TransferItem>,
}

/// Tracks in-flight captures and the fast-picture batch.
#[derive(Debug, Default)]
pub struct CaptureController {
    pending: VecDeque<PendingCapture>,
    batch: Option<Batch>,
}

impl CaptureController {
    /// Empty controller, not in a batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a single-picture destination.
    ///
    /// Outside a batch only one single capture is tracked: a request made
    /// while another single capture is pending takes over its place in the
    /// queue, and the replaced capture is returned. The live-view resume
    /// owed to the replaced capture carries over. Fast captures still
    /// waiting for their objects are never replaced.
    pub fn request_single(&mut self, mut capture: PendingCapture) -> Option<PendingCapture> {
        if self.batch.is_none() {
            if let Some(slot) = self.last_single_mut() {
                capture.resume_live_view |= slot.resume_live_view;
                return Some(std::mem::replace(slot, capture));
            }
        }
        self.pending.push_back(capture);
        None
    }

    /// Record a fast-picture destination. Fails outside a batch.
    pub fn request_fast(&mut self, dest: PathBuf) -> Result<()> {
        if self.batch.is_none() {
            return Err(CameraError::NotInBatch);
        }
        self.pending.push_back(PendingCapture::fast(dest));
        Ok(())
    }

    /// Undo [`CaptureController::request_single`] after its shutter release
    /// failed, putting back the capture it replaced.
    pub fn cancel_single(&mut self, replaced: Option<PendingCapture>) {
        match replaced {
            Some(previous) => {
                if let Some(slot) = self.last_single_mut() {
                    *slot = previous;
                }
            }
            None => {
                let index = self
                    .pending
                    .iter()
                    .rposition(|capture| capture.kind == CaptureKind::Single);
                if let Some(index) = index {
                    self.pending.remove(index);
                }
            }
        }
    }

    /// Forget the most recent fast request after its shutter release failed.
    pub fn cancel_fast(&mut self) -> Option<PendingCapture> {
        if self.pending.back()?.kind == CaptureKind::Fast {
            self.pending.pop_back()
        } else {
            None
        }
    }

    fn last_single_mut(&mut self) -> Option<&mut PendingCapture> {
        self.pending
            .iter_mut()
            .rev()
            .find(|capture| capture.kind == CaptureKind::Single)
    }

    /// Whether any capture is waiting for its object.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Number of captures waiting for their objects.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Start a batch. Returns `false` if one is already running.
    pub fn begin_batch(&mut self, resume_live_view: bool) -> bool {
        if self.batch.is_some() {
            return false;
        }
        debug!(resume_live_view, "fast picture batch started");
        self.batch = Some(Batch {
            resume_live_view,
            queued: VecDeque::new(),
        });
        true
    }

    /// Whether a batch is running.
    pub const fn in_batch(&self) -> bool {
        self.batch.is_some()
    }

    /// End the batch, handing back the queued objects.
    pub fn end_batch(&mut self) -> Option<Batch> {
        let batch = self.batch.take();
        if let Some(batch) = &batch {
            debug!(queued = batch.queued.len(), "fast picture batch ended");
        }
        batch
    }

    /// Route a captured object to the oldest pending capture.
    pub fn object_ready(&mut self, object: ObjectRef) -> ObjectReady {
        let Some(capture) = self.pending.pop_front() else {
            return ObjectReady::Unexpected(object);
        };
        let item = TransferItem { object, capture };
        match &mut self.batch {
            Some(batch) => {
                batch.queued.push_back(item);
                ObjectReady::Queued
            }
            None => ObjectReady::Transfer(item),
        }
    }
}

/// Defeat the camera's own free-space check and fire the shutter.
///
/// Busy and not-ready statuses become [`CameraError::DeviceBusy`].
pub fn release_shutter<S: CameraSdk>(session: &mut Session<S>) -> Result<()> {
    session.set_capacity(Capacity::UNLIMITED)?;
    let device = session.device()?;
    session
        .sdk_mut()
        .send_command(device, Command::TAKE_PICTURE, 0)
        .map_err(CameraError::from_shutter)
}
