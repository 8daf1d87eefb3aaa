//! eds-tether: a tethered-shooting driver for Canon EOS cameras
//!
//! This library arbitrates live view, picture capture and property writes
//! over a trait-based abstraction of the vendor SDK, so the same driver runs
//! against real hardware (the `edsdk` feature) or the simulated camera in
//! [`mock`].

pub mod camera;
pub mod capture;
pub mod config;
pub mod diagnostics;
pub mod fsutil;
pub mod live_view;
pub mod mock;
pub mod profile;
pub mod properties;
pub mod session;
pub mod status;
pub mod traits;
pub mod transfer;

#[cfg(feature = "edsdk")]
pub mod device;

pub use camera::{Camera, PictureCallback};
pub use config::CameraConfig;
pub use diagnostics::{Diagnostics, ErrorMessage, Severity};
pub use live_view::LiveViewState;
pub use mock::MockSdk;
pub use profile::CameraModelProfile;
pub use properties::{AfMode, DriveMode, MeteringMode, WhiteBalance};
pub use traits::{CameraError, CameraSdk, Point, Result, Size};

#[cfg(feature = "edsdk")]
pub use device::EdsSdk;
