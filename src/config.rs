//! Camera driver configuration

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::diagnostics::Severity;

/// Size of the live-view frame buffer (8 MiB).
pub const DEFAULT_FRAME_BUFFER_SIZE: usize = 0x80_0000;

/// Suggested interval between live-view frame grabs.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 200;

/// Driver configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Rewrite the image-quality property so captures come out as JPEG
    pub force_jpeg: bool,

    /// Directory for staging downloads. `None` stages next to the destination
    pub staging_dir: Option<PathBuf>,

    /// Live-view frame buffer size in bytes
    pub frame_buffer_size: usize,

    /// How often the host is expected to grab live-view frames
    pub poll_interval_ms: u64,

    /// Diagnostics threshold applied when the camera is created. `None`
    /// leaves the queue's threshold alone
    pub diagnostics_threshold: Option<Severity>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            force_jpeg: false,
            staging_dir: None,
            frame_buffer_size: DEFAULT_FRAME_BUFFER_SIZE,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            diagnostics_threshold: None,
        }
    }
}

impl CameraConfig {
    /// Force JPEG output.
    #[must_use]
    pub const fn with_force_jpeg(mut self, force_jpeg: bool) -> Self {
        self.force_jpeg = force_jpeg;
        self
    }

    /// Stage downloads in `dir` instead of the destination directory.
    #[must_use]
    pub fn with_staging_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    /// Use a live-view buffer of `size` bytes.
    #[must_use]
    pub const fn with_frame_buffer_size(mut self, size: usize) -> Self {
        self.frame_buffer_size = size;
        self
    }

    /// Set the diagnostics threshold.
    #[must_use]
    pub const fn with_diagnostics_threshold(mut self, threshold: Severity) -> Self {
        self.diagnostics_threshold = Some(threshold);
        self
    }

    /// Poll interval as a `Duration`.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
