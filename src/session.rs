//! Device session: discovery, connection and baseline configuration.

use std::sync::mpsc;

use tracing::{debug, info, warn};

use crate::traits::{
    CameraError, CameraSdk, Capacity, Command, DeviceEvent, DeviceRef, EventSink, PropertyId,
    PropertyValue, Result, IMAGE_TYPE_JPEG, SAVE_TO_HOST,
};

/// Clears the main-image format nibble (bits 20..24) of the image-quality
/// bitfield.
pub const IMAGE_FORMAT_CLEAR_MASK: u32 = 0xFF0F_FFFF;
/// Bit offset of the main-image format nibble.
pub const IMAGE_FORMAT_SHIFT: u32 = 20;

/// Rewrite an image-quality value so the main image is JPEG, keeping size
/// and compression untouched.
#[must_use]
pub const fn force_jpeg_quality(quality: u32) -> u32 {
    (quality & IMAGE_FORMAT_CLEAR_MASK) | (IMAGE_TYPE_JPEG << IMAGE_FORMAT_SHIFT)
}

/// Session with exactly one camera.
///
/// Owns the SDK handle. Notifications registered by [`Session::open`] land
/// in this session's own queue, so several sessions never see each
/// other's events.
pub struct Session<S: CameraSdk> {
    sdk: S,
    device: Option<DeviceRef>,
    name: String,
    events: Option<mpsc::Receiver<DeviceEvent>>,
}

impl<S: CameraSdk> Session<S> {
    /// Wrap an SDK without touching the device.
    pub const fn new(sdk: S) -> Self {
        Self {
            sdk,
            device: None,
            name: String::new(),
            events: None,
        }
    }

    /// Discover the single attached camera, open a session, register
    /// notification handlers and apply the baseline configuration.
    ///
    /// Opening an already open session is a no-op.
    pub fn open(&mut self, force_jpeg: bool) -> Result<()> {
        if self.device.is_some() {
            return Ok(());
        }

        let mut cameras = self.sdk.camera_list()?;
        let device = match cameras.len() {
            0 => return Err(CameraError::NoDeviceFound),
            1 => cameras.pop().ok_or(CameraError::NoDeviceFound)?,
            count => {
                for camera in cameras {
                    self.sdk.release(camera);
                }
                return Err(CameraError::MultipleDevicesUnsupported(count));
            }
        };

        if let Err(code) = self.sdk.open_session(device) {
            self.sdk.release(device);
            return Err(code.into());
        }

        match self.establish(device, force_jpeg) {
            Ok((name, events)) => {
                info!(camera = %name, "camera session opened");
                self.device = Some(device);
                self.name = name;
                self.events = Some(events);
                Ok(())
            }
            Err(err) => {
                if let Err(code) = self.sdk.close_session(device) {
                    warn!(%code, "closing abandoned session failed");
                }
                self.sdk.release(device);
                Err(err)
            }
        }
    }

    fn establish(
        &mut self,
        device: DeviceRef,
        force_jpeg: bool,
    ) -> Result<(String, mpsc::Receiver<DeviceEvent>)> {
        let name = self.sdk.device_description(device)?;

        let (sink, events) = EventSink::channel();
        self.sdk.subscribe(device, sink)?;

        self.sdk
            .set_property(device, PropertyId::SAVE_TO, PropertyValue::UInt(SAVE_TO_HOST))
            .map_err(|code| {
                CameraError::ConfigurationFailed(format!("cannot save captures to host: {code}"))
            })?;

        if force_jpeg {
            let quality = self
                .sdk
                .property(device, PropertyId::IMAGE_QUALITY)
                .map_err(|code| {
                    CameraError::ConfigurationFailed(format!("cannot read image quality: {code}"))
                })?
                .as_u32()
                .ok_or_else(|| {
                    CameraError::ConfigurationFailed("image quality is not an integer".to_owned())
                })?;
            let forced = force_jpeg_quality(quality);
            debug!(quality, forced, "forcing JPEG output");
            self.sdk
                .set_property(device, PropertyId::IMAGE_QUALITY, PropertyValue::UInt(forced))
                .map_err(|code| {
                    CameraError::ConfigurationFailed(format!("cannot force JPEG: {code}"))
                })?;
        }

        Ok((name, events))
    }

    /// Close the session and release the handle. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        let Some(device) = self.device.take() else {
            return Ok(());
        };
        self.events = None;
        let closed = self.sdk.close_session(device);
        self.sdk.release(device);
        info!(camera = %self.name, "camera session closed");
        closed.map_err(CameraError::from)
    }

    /// Whether a session is open.
    pub const fn is_open(&self) -> bool {
        self.device.is_some()
    }

    /// Handle of the open device.
    pub fn device(&self) -> Result<DeviceRef> {
        self.device.ok_or(CameraError::NotConnected)
    }

    /// Model identity reported at open time; empty when never opened.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The wrapped SDK.
    pub const fn sdk(&self) -> &S {
        &self.sdk
    }

    /// The wrapped SDK, mutably.
    pub fn sdk_mut(&mut self) -> &mut S {
        &mut self.sdk
    }

    /// Read a property of the open device.
    pub fn property(&mut self, id: PropertyId) -> Result<PropertyValue> {
        let device = self.device()?;
        Ok(self.sdk.property(device, id)?)
    }

    /// Write a property of the open device.
    pub fn set_property(&mut self, id: PropertyId, value: PropertyValue) -> Result<()> {
        let device = self.device()?;
        Ok(self.sdk.set_property(device, id, value)?)
    }

    /// Send a command to the open device.
    pub fn send_command(&mut self, command: Command, param: i32) -> Result<()> {
        let device = self.device()?;
        Ok(self.sdk.send_command(device, command, param)?)
    }

    /// Report free host space to the open device.
    pub fn set_capacity(&mut self, capacity: Capacity) -> Result<()> {
        let device = self.device()?;
        Ok(self.sdk.set_capacity(device, capacity)?)
    }

    /// Download the current live-view image into `buffer`.
    pub fn download_evf_image(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let device = self.device()?;
        Ok(self.sdk.download_evf_image(device, buffer)?)
    }

    /// Let the SDK deliver pending notifications.
    pub fn pump(&mut self) -> Result<()> {
        Ok(self.sdk.pump_events()?)
    }

    /// Next queued notification for this session.
    pub fn next_event(&mut self) -> Option<DeviceEvent> {
        self.events.as_ref().and_then(|rx| rx.try_recv().ok())
    }
}

impl<S: CameraSdk> Drop for Session<S> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(%err, "closing camera session on drop failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockSdk;
    use crate::traits::{StatusCode, SAVE_TO_CAMERA};

    #[test]
    fn test_force_jpeg_clears_format_nibble() {
        // RAW main image (type 4) with large size and fine compression.
        let raw = 0x0040_0F0F | (4 << 20);
        assert_eq!(force_jpeg_quality(raw), 0x0010_0F0F);
        assert_eq!(force_jpeg_quality(0xFFFF_FFFF), 0xFF1F_FFFF);
    }

    #[test]
    fn test_open_applies_baseline() {
        let mut session = Session::new(MockSdk::new());
        session.open(false).expect("open should succeed");

        assert!(session.is_open());
        assert_eq!(session.name(), "Canon EOS 5D Mark II");
        assert_eq!(
            session.property(PropertyId::SAVE_TO).expect("read save-to"),
            PropertyValue::UInt(SAVE_TO_HOST)
        );
        assert!(session.sdk().is_subscribed());
    }

    #[test]
    fn test_open_forces_jpeg() {
        let sdk = MockSdk::new().with_property(PropertyId::IMAGE_QUALITY, PropertyValue::UInt(0x0064_FF0F));
        let mut session = Session::new(sdk);
        session.open(true).expect("open should succeed");

        assert_eq!(
            session.property(PropertyId::IMAGE_QUALITY).expect("read quality"),
            PropertyValue::UInt(0x0014_FF0F)
        );
    }

    #[test]
    fn test_open_without_camera() {
        let mut session = Session::new(MockSdk::new().with_cameras(0));
        assert!(matches!(session.open(false), Err(CameraError::NoDeviceFound)));
        assert!(!session.is_open());
    }

    #[test]
    fn test_open_with_two_cameras() {
        let mut session = Session::new(MockSdk::new().with_cameras(2));
        assert!(matches!(
            session.open(false),
            Err(CameraError::MultipleDevicesUnsupported(2))
        ));
        assert_eq!(session.sdk().released_devices(), 2);
    }

    #[test]
    fn test_open_session_failure_is_device_error() {
        let sdk = MockSdk::new().with_open_failure(StatusCode::COMM_DISCONNECTED);
        let mut session = Session::new(sdk);
        let err = session.open(false).expect_err("open should fail");
        assert!(matches!(err, CameraError::DeviceError(StatusCode::COMM_DISCONNECTED)));
        assert_eq!(session.sdk().released_devices(), 1);
    }

    #[test]
    fn test_baseline_failure_is_configuration_failed() {
        let mut sdk = MockSdk::new();
        sdk.fail_property_write(PropertyId::SAVE_TO, StatusCode::DEVICE_BUSY);
        let mut session = Session::new(sdk);

        let err = session.open(false).expect_err("open should fail");
        assert!(matches!(err, CameraError::ConfigurationFailed(_)));
        assert!(!session.is_open());
        assert!(!session.sdk().session_open());
        assert_eq!(
            session.sdk().stored_property(PropertyId::SAVE_TO),
            Some(PropertyValue::UInt(SAVE_TO_CAMERA))
        );
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut session = Session::new(MockSdk::new());
        session.open(false).expect("open should succeed");
        session.close().expect("first close");
        session.close().expect("second close");
        assert!(!session.is_open());
        assert!(!session.sdk().session_open());
        assert!(matches!(
            session.property(PropertyId::SAVE_TO),
            Err(CameraError::NotConnected)
        ));
    }
}
