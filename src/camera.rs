//! Host-facing camera API.
//!
//! Commands never block on the camera. They issue at most one device
//! request, return a success flag and report failures on the diagnostics
//! queue. Everything the camera says back arrives through
//! [`Camera::process_events`], which the host calls from its polling loop.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::capture::{self, CaptureController, ObjectReady, PendingCapture, TransferItem};
use crate::config::CameraConfig;
use crate::diagnostics::{Diagnostics, ErrorMessage, Severity};
use crate::live_view::{FrameBuffer, LiveView, LiveViewState, OutputRequest};
use crate::profile::CameraModelProfile;
use crate::properties::{exposure, AfMode, DriveMode, MeteringMode, PropertySync, WhiteBalance};
use crate::session::Session;
use crate::traits::{
    CameraError, CameraSdk, Command, DeviceEvent, ObjectEvent, ObjectRef, Point, PropertyEvent,
    PropertyId, PropertyValue, Result, ShutterButton, Size, StateEvent, StatusCode, EVF_OUTPUT_PC,
};

/// Called with the final path of every transferred picture.
pub type PictureCallback = Box<dyn FnMut(&Path) + Send>;

/// A tethered camera.
pub struct Camera<S: CameraSdk> {
    session: Session<S>,
    config: CameraConfig,
    diagnostics: Diagnostics,
    live_view: LiveView,
    frame: FrameBuffer,
    properties: PropertySync,
    capture: CaptureController,
    done: VecDeque<PathBuf>,
    on_picture: Option<PictureCallback>,
}

impl<S: CameraSdk> Camera<S> {
    /// Initialize the SDK and prepare a camera that is not yet connected.
    ///
    /// Reports to the process-wide diagnostics queue.
    pub fn new(mut sdk: S, config: CameraConfig) -> Result<Self> {
        sdk.initialize()?;
        let diagnostics = Diagnostics::global();
        if let Some(threshold) = config.diagnostics_threshold {
            diagnostics.set_threshold(threshold);
        }
        Ok(Self {
            session: Session::new(sdk),
            frame: FrameBuffer::new(config.frame_buffer_size),
            config,
            diagnostics,
            live_view: LiveView::new(),
            properties: PropertySync::default(),
            capture: CaptureController::new(),
            done: VecDeque::new(),
            on_picture: None,
        })
    }

    /// Initialize the SDK and connect to the single attached camera.
    pub fn connect(sdk: S, config: CameraConfig) -> Result<Self> {
        let mut camera = Self::new(sdk, config)?;
        camera.open()?;
        Ok(camera)
    }

    /// Report to `diagnostics` instead of the process-wide queue.
    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        if let Some(threshold) = self.config.diagnostics_threshold {
            diagnostics.set_threshold(threshold);
        }
        self.diagnostics = diagnostics;
        self
    }

    /// Open the session. Connecting twice is a no-op.
    pub fn open(&mut self) -> Result<()> {
        if let Err(err) = self.session.open(self.config.force_jpeg) {
            self.diagnostics.error(format!("unable to connect: {err}"));
            return Err(err);
        }
        self.properties.refresh(&mut self.session, &self.diagnostics);
        info!(camera = %self.session.name(), "camera connected");
        Ok(())
    }

    /// Stop live view, drop in-flight captures and close the session.
    pub fn disconnect(&mut self) -> bool {
        if !self.session.is_open() {
            return true;
        }

        if self.live_view.state() != LiveViewState::Off {
            if let Err(err) = self
                .session
                .set_property(PropertyId::EVF_OUTPUT_DEVICE, PropertyValue::UInt(0))
            {
                self.diagnostics
                    .debug(format!("unable to stop live view before disconnecting: {err}"));
            }
        }
        self.live_view.reset();
        self.abandon_captures();

        let closed = self.session.close();
        self.report(closed, "unable to close camera session").is_some()
    }

    /// Disconnect and shut the SDK down.
    pub fn terminate(&mut self) -> bool {
        let disconnected = self.disconnect();
        let terminated = self.session.sdk_mut().terminate().map_err(CameraError::from);
        self.report(terminated, "unable to terminate the SDK").is_some() && disconnected
    }

    /// Whether a session is open.
    pub const fn is_connected(&self) -> bool {
        self.session.is_open()
    }

    /// Model identity, e.g. `Canon EOS 7D`. Empty before the first connect.
    pub fn name(&self) -> &str {
        self.session.name()
    }

    /// Live-view geometry of the connected model, or of the fallback model
    /// when it is unknown.
    pub fn camera_specific_data(&self) -> &'static CameraModelProfile {
        CameraModelProfile::lookup(self.session.name())
    }

    /// Live-view image size at the current zoom ratio.
    pub fn live_view_image_size(&self) -> Size {
        self.camera_specific_data().image_size(self.zoom_ratio())
    }

    /// Largest zoom position at the current zoom ratio.
    pub fn max_zoom_position(&self) -> Point {
        self.camera_specific_data().max_zoom_position(self.zoom_ratio())
    }

    /// On-screen footprint of the zoom box.
    pub fn zoom_box_size(&self) -> Size {
        self.camera_specific_data().zoom_box_size
    }

    /// Diagnostics queue this camera reports to.
    pub const fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Set the minimum severity retained on the diagnostics queue.
    pub fn set_error_level(&self, threshold: Severity) {
        self.diagnostics.set_threshold(threshold);
    }

    /// Minimum severity retained on the diagnostics queue.
    pub fn error_level(&self) -> Severity {
        self.diagnostics.threshold()
    }

    /// Oldest retained diagnostic message.
    pub fn pop_error_message(&self) -> Option<ErrorMessage> {
        self.diagnostics.pop()
    }

    /// Number of retained diagnostic messages.
    pub fn error_message_count(&self) -> usize {
        self.diagnostics.len()
    }

    /// The SDK, for inspection.
    pub const fn sdk(&self) -> &S {
        self.session.sdk()
    }

    /// The SDK, mutably.
    pub fn sdk_mut(&mut self) -> &mut S {
        self.session.sdk_mut()
    }

    // Properties applied between live-view frames.

    /// Live-view zoom multiplier.
    pub const fn zoom_ratio(&self) -> u32 {
        *self.properties.zoom_ratio.get()
    }

    /// Request a live-view zoom multiplier.
    pub fn set_zoom_ratio(&mut self, ratio: u32) {
        self.properties.zoom_ratio.set(ratio);
    }

    /// Top-left corner of the zoom box.
    pub const fn zoom_position(&self) -> Point {
        *self.properties.zoom_position.get()
    }

    /// Request a zoom box position.
    pub fn set_zoom_position(&mut self, position: Point) {
        self.properties.zoom_position.set(position);
    }

    /// White balance mode.
    pub const fn white_balance(&self) -> WhiteBalance {
        *self.properties.white_balance.get()
    }

    /// Request a white balance mode.
    pub fn set_white_balance(&mut self, white_balance: WhiteBalance) {
        self.properties.white_balance.set(white_balance);
    }

    // Properties written straight through.

    /// Current metering mode.
    pub fn metering_mode(&mut self) -> Option<MeteringMode> {
        self.read_mode(PropertyId::METERING_MODE, "metering mode")
    }

    /// Set the metering mode.
    pub fn set_metering_mode(&mut self, mode: MeteringMode) -> bool {
        self.write(PropertyId::METERING_MODE, PropertyValue::UInt(mode as u32), "metering mode")
    }

    /// Current drive mode.
    pub fn drive_mode(&mut self) -> Option<DriveMode> {
        self.read_mode(PropertyId::DRIVE_MODE, "drive mode")
    }

    /// Set the drive mode.
    pub fn set_drive_mode(&mut self, mode: DriveMode) -> bool {
        self.write(PropertyId::DRIVE_MODE, PropertyValue::UInt(mode as u32), "drive mode")
    }

    /// Current autofocus mode.
    pub fn af_mode(&mut self) -> Option<AfMode> {
        self.read_mode(PropertyId::AF_MODE, "AF mode")
    }

    /// Set the autofocus mode.
    pub fn set_af_mode(&mut self, mode: AfMode) -> bool {
        self.write(PropertyId::AF_MODE, PropertyValue::UInt(mode as u32), "AF mode")
    }

    /// Exposure compensation in stops.
    pub fn exposure_compensation(&mut self) -> Option<f32> {
        let value = self.session.property(PropertyId::EXPOSURE_COMPENSATION);
        let value = self.report(value, "unable to read exposure compensation")?;
        value.as_u32().map(exposure::code_to_stops)
    }

    /// Set exposure compensation to the nearest third or half stop.
    pub fn set_exposure_compensation(&mut self, stops: f32) -> bool {
        let Some(code) = exposure::stops_to_code(stops) else {
            self.diagnostics
                .error(format!("exposure compensation {stops} is out of range"));
            return false;
        };
        self.write(
            PropertyId::EXPOSURE_COMPENSATION,
            PropertyValue::UInt(code),
            "exposure compensation",
        )
    }

    /// Stop the lens down in live view to preview depth of field.
    pub fn set_depth_of_field_preview(&mut self, enabled: bool) -> bool {
        self.write(
            PropertyId::EVF_DEPTH_OF_FIELD_PREVIEW,
            PropertyValue::UInt(u32::from(enabled)),
            "depth of field preview",
        )
    }

    /// Focus once by half-pressing and releasing the shutter button.
    pub fn auto_focus(&mut self) -> bool {
        let pressed = self
            .session
            .send_command(Command::PRESS_SHUTTER_BUTTON, ShutterButton::Halfway as i32);
        let released = self
            .session
            .send_command(Command::PRESS_SHUTTER_BUTTON, ShutterButton::Off as i32);
        self.report(pressed.and(released), "auto focus failed").is_some()
    }

    // Live view.

    /// Current live-view state.
    pub const fn live_view_state(&self) -> LiveViewState {
        self.live_view.state()
    }

    /// Whether frames can be grabbed right now.
    pub fn is_live_view_on(&self) -> bool {
        self.live_view.state() == LiveViewState::On
    }

    /// Ask for live view.
    pub fn start_live_view(&mut self) -> bool {
        if !self.require_connection("start live view") {
            return false;
        }
        let request = self.live_view.start();
        self.apply_output_request(request)
    }

    /// Interrupt live view until [`Camera::resume_live_view`].
    pub fn pause_live_view(&mut self) -> bool {
        let request = self.live_view.pause();
        self.apply_output_request(request)
    }

    /// Undo [`Camera::pause_live_view`].
    pub fn resume_live_view(&mut self) -> bool {
        let request = self.live_view.resume();
        self.apply_output_request(request)
    }

    /// Stop live view.
    pub fn stop_live_view(&mut self) -> bool {
        let request = self.live_view.stop();
        self.apply_output_request(request)
    }

    /// Grab one live-view frame, then apply pending property writes.
    ///
    /// Outside [`LiveViewState::On`] nothing is sent to the camera.
    pub fn grab_live_view_frame(&mut self) -> bool {
        if let Err(skip) = self.live_view.check_grab() {
            self.diagnostics
                .debug(format!("skipping live view frame: {skip}"));
            return false;
        }

        let grabbed = match self.session.download_evf_image(self.frame.storage()) {
            Ok(len) => {
                self.frame.set_len(len);
                true
            }
            Err(CameraError::DeviceError(StatusCode::OBJECT_NOT_READY)) => {
                self.diagnostics.debug("live view frame not ready yet");
                false
            }
            Err(err) => {
                self.diagnostics
                    .error(format!("unable to grab live view frame: {err}"));
                false
            }
        };

        self.properties.sync(&mut self.session, &self.diagnostics);
        grabbed
    }

    /// Bytes of the latest live-view frame.
    pub fn live_view_frame(&self) -> &[u8] {
        self.frame.as_slice()
    }

    /// Size in bytes of the latest live-view frame.
    pub const fn live_view_frame_size(&self) -> usize {
        self.frame.len()
    }

    // Capture.

    /// Fire the shutter; the picture is transferred to `path` when the
    /// camera reports it ready. A directory keeps the camera's file name.
    pub fn take_single_picture<P: AsRef<Path>>(&mut self, path: P) -> bool {
        if !self.require_connection("take a picture") {
            return false;
        }

        let resume_live_view = self.live_view.is_active();
        let paused = self.live_view.pause();
        if !self.apply_output_request(paused) {
            self.diagnostics
                .error("unable to take picture: live view could not be paused");
            return false;
        }

        let capture = PendingCapture::single(path.as_ref().to_path_buf(), resume_live_view);
        let replaced = self.capture.request_single(capture);
        if let Some(replaced) = &replaced {
            self.diagnostics.warning(format!(
                "picture for {} still pending, redirecting it",
                replaced.dest.display()
            ));
        }

        match capture::release_shutter(&mut self.session) {
            Ok(()) => true,
            Err(err) => {
                let still_pending = replaced.is_some();
                self.capture.cancel_single(replaced);
                self.diagnostics
                    .error(format!("unable to take picture: {err}"));
                if resume_live_view && !still_pending && !self.capture.in_batch() {
                    self.resume_live_view();
                }
                false
            }
        }
    }

    /// Start a fast-picture batch: live view is paused and captured
    /// objects are queued instead of transferred.
    pub fn begin_fast_pictures(&mut self) -> bool {
        if !self.require_connection("begin fast pictures") {
            return false;
        }
        if self.capture.in_batch() {
            self.diagnostics.warning("already taking fast pictures");
            return false;
        }
        let resume_live_view = self.live_view.is_active();
        let paused = self.live_view.pause();
        if !self.apply_output_request(paused) {
            self.diagnostics
                .error("unable to begin fast pictures: live view could not be paused");
            return false;
        }
        self.capture.begin_batch(resume_live_view)
    }

    /// Fire the shutter without waiting for earlier transfers.
    pub fn take_fast_picture<P: AsRef<Path>>(&mut self, path: P) -> bool {
        if let Err(err) = self.capture.request_fast(path.as_ref().to_path_buf()) {
            self.diagnostics
                .error(format!("unable to take fast picture: {err}"));
            return false;
        }
        match capture::release_shutter(&mut self.session) {
            Ok(()) => true,
            Err(err) => {
                self.capture.cancel_fast();
                self.diagnostics
                    .error(format!("unable to take fast picture: {err}"));
                false
            }
        }
    }

    /// Transfer everything queued during the batch in arrival order, then
    /// resume live view if it was active before the batch.
    ///
    /// Objects arriving after this returns are transferred as they come.
    pub fn end_fast_pictures(&mut self) -> bool {
        if !self.capture.in_batch() {
            self.diagnostics.debug("not taking fast pictures");
            return false;
        }

        self.process_events();
        let Some(batch) = self.capture.end_batch() else {
            return false;
        };

        let mut all_ok = true;
        for item in batch.queued {
            all_ok &= self.complete_transfer(item);
        }
        if batch.resume_live_view {
            self.resume_live_view();
        }
        all_ok
    }

    /// Register the picture-completed callback, replacing any earlier one.
    pub fn set_picture_complete_callback<F>(&mut self, callback: F)
    where
        F: FnMut(&Path) + Send + 'static,
    {
        self.on_picture = Some(Box::new(callback));
    }

    /// Oldest completed picture not yet popped.
    pub fn pop_picture_done(&mut self) -> Option<PathBuf> {
        self.done.pop_front()
    }

    /// Number of completed pictures not yet popped.
    pub fn picture_done_count(&self) -> usize {
        self.done.len()
    }

    // Notifications.

    /// Pump the SDK and handle every queued notification.
    pub fn process_events(&mut self) {
        if !self.session.is_open() {
            return;
        }
        if let Err(err) = self.session.pump() {
            self.diagnostics
                .warning(format!("unable to poll camera events: {err}"));
        }
        while let Some(event) = self.session.next_event() {
            self.dispatch(event);
        }
    }

    fn dispatch(&mut self, event: DeviceEvent) {
        match event {
            DeviceEvent::Property {
                event: PropertyEvent::PROPERTY_CHANGED,
                property: PropertyId::EVF_OUTPUT_DEVICE,
                ..
            } => self.on_output_device_changed(),
            DeviceEvent::Property { event, property, param } => {
                debug!(event = event.0, property = property.0, param, "property event");
            }
            DeviceEvent::Object {
                event: ObjectEvent::DIR_ITEM_REQUEST_TRANSFER,
                object,
            } => self.on_object_ready(object),
            DeviceEvent::Object { event, object } => {
                debug!(event = event.0, ?object, "ignoring object event");
                self.session.sdk_mut().release_object(object);
            }
            DeviceEvent::State {
                event: StateEvent::SHUTDOWN,
                ..
            } => {
                self.diagnostics.error("camera shut down or was disconnected");
                self.disconnect();
            }
            DeviceEvent::State {
                event: StateEvent::WILL_SOON_SHUT_DOWN,
                ..
            } => {
                self.diagnostics.warning("camera will power down soon");
            }
            DeviceEvent::State { event, param } => {
                debug!(event = event.0, param, "state event");
            }
        }
    }

    fn on_output_device_changed(&mut self) {
        let value = self.session.property(PropertyId::EVF_OUTPUT_DEVICE);
        let Some(value) = self.report(value, "unable to read live view output device") else {
            return;
        };
        let to_host = value.as_u32().is_some_and(|bits| bits & EVF_OUTPUT_PC != 0);
        self.diagnostics.debug(if to_host {
            "live view output device now includes the host"
        } else {
            "live view output device no longer includes the host"
        });
        let follow_on = self.live_view.output_changed(to_host);
        self.apply_output_request(follow_on);
    }

    fn on_object_ready(&mut self, object: ObjectRef) {
        match self.capture.object_ready(object) {
            ObjectReady::Transfer(item) => {
                self.complete_transfer(item);
            }
            ObjectReady::Queued => debug!(?object, "capture queued until the batch ends"),
            ObjectReady::Unexpected(object) => {
                self.diagnostics
                    .warning("camera sent a picture nobody asked for, discarding it");
                self.session.sdk_mut().release_object(object);
            }
        }
    }

    fn complete_transfer(&mut self, item: TransferItem) -> bool {
        let TransferItem { object, capture } = item;
        let result = crate::transfer::transfer(
            self.session.sdk_mut(),
            object,
            &capture.dest,
            self.config.staging_dir.as_deref(),
        );

        let transferred = match result {
            Ok(path) => {
                if let Some(callback) = self.on_picture.as_mut() {
                    callback(&path);
                }
                self.done.push_back(path);
                true
            }
            Err(err) => {
                self.diagnostics.error(format!(
                    "unable to save picture to {}: {err}",
                    capture.dest.display()
                ));
                false
            }
        };

        if capture.resume_live_view {
            self.resume_live_view();
        }
        transferred
    }

    fn abandon_captures(&mut self) {
        let mut controller = std::mem::take(&mut self.capture);
        if let Some(batch) = controller.end_batch() {
            for item in batch.queued {
                self.session.sdk_mut().release_object(item.object);
            }
        }
        if controller.has_pending() {
            self.diagnostics.warning(format!(
                "{} picture(s) still pending at disconnect were dropped",
                controller.pending_len()
            ));
        }
    }

    fn apply_output_request(&mut self, request: Option<OutputRequest>) -> bool {
        let Some(request) = request else {
            return true;
        };
        let bits = match request {
            OutputRequest::Start => EVF_OUTPUT_PC,
            OutputRequest::Stop => 0,
        };
        match self
            .session
            .set_property(PropertyId::EVF_OUTPUT_DEVICE, PropertyValue::UInt(bits))
        {
            Ok(()) => true,
            Err(err) => {
                self.live_view.request_failed(request);
                self.diagnostics
                    .error(format!("unable to change live view output ({request:?}): {err}"));
                false
            }
        }
    }

    fn read_mode<T: TryFrom<u32, Error = u32>>(&mut self, id: PropertyId, label: &str) -> Option<T> {
        let value = self.session.property(id);
        let code = self.report(value, &format!("unable to read {label}"))?.as_u32()?;
        match T::try_from(code) {
            Ok(mode) => Some(mode),
            Err(code) => {
                self.diagnostics
                    .warning(format!("unknown {label} code 0x{code:X}"));
                None
            }
        }
    }

    fn write(&mut self, id: PropertyId, value: PropertyValue, label: &str) -> bool {
        let written = self.session.set_property(id, value);
        self.report(written, &format!("unable to set {label}")).is_some()
    }

    fn require_connection(&self, action: &str) -> bool {
        if self.session.is_open() {
            return true;
        }
        self.diagnostics
            .error(format!("unable to {action}: {}", CameraError::NotConnected));
        false
    }

    fn report<T>(&self, result: Result<T>, context: &str) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.diagnostics.error(format!("{context}: {err}"));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockSdk;
    use crate::profile::{EOS_40D, EOS_7D};
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    fn camera_with(sdk: MockSdk) -> Camera<MockSdk> {
        let mut camera = Camera::new(sdk, CameraConfig::default())
            .expect("sdk initializes")
            .with_diagnostics(Diagnostics::new(Severity::Debug));
        camera.open().expect("camera connects");
        camera.diagnostics().clear();
        camera
    }

    fn camera() -> Camera<MockSdk> {
        camera_with(MockSdk::new())
    }

    fn live_camera() -> Camera<MockSdk> {
        let mut camera = camera();
        assert!(camera.start_live_view());
        camera.process_events();
        assert_eq!(camera.live_view_state(), LiveViewState::On);
        camera
    }

    fn output_writes(camera: &Camera<MockSdk>) -> Vec<PropertyValue> {
        camera.sdk().property_writes(PropertyId::EVF_OUTPUT_DEVICE)
    }

    #[test]
    fn test_connect_failure_is_reported() {
        let mut camera = Camera::new(MockSdk::new().with_cameras(0), CameraConfig::default())
            .expect("sdk initializes")
            .with_diagnostics(Diagnostics::new(Severity::Error));
        assert!(matches!(camera.open(), Err(CameraError::NoDeviceFound)));
        assert!(!camera.is_connected());
        let message = camera.pop_error_message().expect("error reported");
        assert!(message.text.contains("No camera connected"));
    }

    #[test]
    fn test_commands_need_connection() {
        let mut camera = Camera::new(MockSdk::new(), CameraConfig::default())
            .expect("sdk initializes")
            .with_diagnostics(Diagnostics::new(Severity::Debug));
        assert!(!camera.take_single_picture("photo.jpg"));
        assert!(!camera.start_live_view());
        assert_eq!(camera.error_message_count(), 2);
        assert!(camera.sdk().commands().is_empty());
    }

    #[test]
    fn test_start_live_view_waits_for_ack() {
        let mut camera = camera_with(MockSdk::new().with_manual_ack());
        assert!(camera.start_live_view());
        assert_eq!(camera.live_view_state(), LiveViewState::WaitingToStart);
        assert!(!camera.grab_live_view_frame());
        assert_eq!(camera.sdk().evf_downloads(), 0);

        camera.sdk_mut().acknowledge_output();
        camera.process_events();
        assert!(camera.is_live_view_on());
        assert!(camera.grab_live_view_frame());
        assert_eq!(camera.sdk().evf_downloads(), 1);
        assert!(!camera.live_view_frame().is_empty());
        assert_eq!(camera.live_view_frame_size(), camera.live_view_frame().len());
    }

    #[test]
    fn test_grab_skip_reasons() {
        let mut camera = camera_with(MockSdk::new().with_manual_ack());
        assert!(!camera.grab_live_view_frame());
        let off = camera.pop_error_message().expect("skip logged");
        assert!(off.text.contains("not wanted on"));

        camera.start_live_view();
        assert!(!camera.grab_live_view_frame());
        let waiting = camera.pop_error_message().expect("skip logged");
        assert!(waiting.text.contains("not on yet"));
        assert_eq!(camera.sdk().evf_downloads(), 0);
    }

    #[test]
    fn test_requests_while_waiting_send_one_command() {
        let mut camera = camera_with(MockSdk::new().with_manual_ack());
        camera.start_live_view();
        camera.stop_live_view();
        camera.start_live_view();
        camera.pause_live_view();
        camera.resume_live_view();
        assert_eq!(output_writes(&camera), vec![PropertyValue::UInt(EVF_OUTPUT_PC)]);

        camera.sdk_mut().acknowledge_output();
        camera.process_events();
        assert_eq!(camera.live_view_state(), LiveViewState::On);
        assert_eq!(output_writes(&camera).len(), 1);
    }

    #[test]
    fn test_changed_mind_issues_single_follow_on() {
        let mut camera = camera_with(MockSdk::new().with_manual_ack());
        camera.start_live_view();
        camera.stop_live_view();

        camera.sdk_mut().acknowledge_output();
        camera.process_events();
        assert_eq!(camera.live_view_state(), LiveViewState::WaitingToStop);
        assert_eq!(
            output_writes(&camera),
            vec![PropertyValue::UInt(EVF_OUTPUT_PC), PropertyValue::UInt(0)]
        );

        camera.sdk_mut().acknowledge_output();
        camera.process_events();
        assert_eq!(camera.live_view_state(), LiveViewState::Off);
        assert_eq!(output_writes(&camera).len(), 2);
    }

    #[test]
    fn test_failed_output_write_falls_back() {
        let mut camera = camera();
        camera
            .sdk_mut()
            .fail_property_write(PropertyId::EVF_OUTPUT_DEVICE, StatusCode::DEVICE_BUSY);
        assert!(!camera.start_live_view());
        assert_eq!(camera.live_view_state(), LiveViewState::Off);
        assert_eq!(camera.error_message_count(), 1);
    }

    #[test]
    fn test_shutter_held_when_pause_rejected() {
        let dir = tempdir().expect("tempdir");
        let mut camera = live_camera();
        camera
            .sdk_mut()
            .fail_property_write(PropertyId::EVF_OUTPUT_DEVICE, StatusCode::DEVICE_BUSY);

        assert!(!camera.take_single_picture(dir.path().join("photo.jpg")));
        assert_eq!(camera.live_view_state(), LiveViewState::On);
        assert!(camera.sdk().commands().is_empty());
        assert!(camera.error_message_count() >= 1);

        camera.sdk_mut().clear_failures();
        assert!(camera.take_single_picture(dir.path().join("photo.jpg")));
        camera.process_events();
        camera.process_events();
        assert_eq!(camera.pop_picture_done(), Some(dir.path().join("photo.jpg")));
    }

    #[test]
    fn test_batch_not_started_when_pause_rejected() {
        let dir = tempdir().expect("tempdir");
        let mut camera = live_camera();
        camera
            .sdk_mut()
            .fail_property_write(PropertyId::EVF_OUTPUT_DEVICE, StatusCode::DEVICE_BUSY);

        assert!(!camera.begin_fast_pictures());
        assert!(!camera.take_fast_picture(dir.path().join("a.jpg")));
        assert!(camera.sdk().commands().is_empty());

        camera.sdk_mut().clear_failures();
        assert!(camera.take_single_picture(dir.path().join("photo.jpg")));
        camera.process_events();
        camera.process_events();
        assert_eq!(camera.picture_done_count(), 1);
    }

    #[test]
    fn test_object_before_stop_ack_resumes_live_view() {
        let dir = tempdir().expect("tempdir");
        let mut camera = camera_with(MockSdk::new().with_manual_ack());
        assert!(camera.start_live_view());
        camera.sdk_mut().acknowledge_output();
        camera.process_events();
        assert_eq!(camera.live_view_state(), LiveViewState::On);

        let dest = dir.path().join("photo.jpg");
        assert!(camera.take_single_picture(&dest));
        camera.process_events();
        assert_eq!(camera.pop_picture_done(), Some(dest));
        assert_eq!(camera.live_view_state(), LiveViewState::WaitingToStop);

        camera.sdk_mut().acknowledge_output();
        camera.process_events();
        assert_eq!(camera.live_view_state(), LiveViewState::WaitingToStart);

        camera.sdk_mut().acknowledge_output();
        camera.process_events();
        assert_eq!(camera.live_view_state(), LiveViewState::On);
        assert_eq!(
            output_writes(&camera),
            vec![
                PropertyValue::UInt(EVF_OUTPUT_PC),
                PropertyValue::UInt(0),
                PropertyValue::UInt(EVF_OUTPUT_PC),
            ]
        );
    }

    #[test]
    fn test_zoom_writes_coalesce_into_next_frame() {
        let mut camera = live_camera();
        camera.set_zoom_ratio(2);
        camera.set_zoom_ratio(4);
        assert!(camera.sdk().property_writes(PropertyId::EVF_ZOOM).is_empty());

        camera.grab_live_view_frame();
        assert_eq!(
            camera.sdk().property_writes(PropertyId::EVF_ZOOM),
            vec![PropertyValue::UInt(4)]
        );
        assert_eq!(camera.zoom_ratio(), 4);
    }

    #[test]
    fn test_clean_properties_track_device() {
        let mut camera = live_camera();
        camera
            .sdk_mut()
            .store_property(PropertyId::WHITE_BALANCE, PropertyValue::Int(3));
        camera.grab_live_view_frame();
        assert_eq!(camera.white_balance(), WhiteBalance::TUNGSTEN);
    }

    #[test]
    fn test_profile_queries() {
        let camera = camera_with(MockSdk::new().with_name(EOS_7D));
        assert_eq!(camera.live_view_image_size(), Size::new(1056, 704));
        assert_eq!(camera.zoom_box_size(), Size::new(212, 144));

        let unknown = camera_with(MockSdk::new().with_name("Prototype X"));
        assert_eq!(
            unknown.camera_specific_data(),
            CameraModelProfile::lookup(EOS_40D)
        );
    }

    #[test]
    fn test_magnified_geometry_follows_zoom() {
        let mut camera = live_camera();
        camera.set_zoom_ratio(5);
        assert_eq!(camera.live_view_image_size(), Size::new(1120, 752));
        assert_eq!(camera.max_zoom_position(), Point::new(4464, 2976));
    }

    #[test]
    fn test_single_picture_round_trips_live_view() {
        let dir = tempdir().expect("tempdir");
        let mut camera = live_camera();
        let dest = dir.path().join("photo.jpg");

        assert!(camera.take_single_picture(&dest));
        assert_eq!(camera.live_view_state(), LiveViewState::WaitingToStop);

        camera.process_events();
        camera.process_events();

        assert_eq!(camera.live_view_state(), LiveViewState::On);
        assert_eq!(camera.pop_picture_done(), Some(dest.clone()));
        assert!(dest.exists());
        assert_eq!(
            output_writes(&camera),
            vec![
                PropertyValue::UInt(EVF_OUTPUT_PC),
                PropertyValue::UInt(0),
                PropertyValue::UInt(EVF_OUTPUT_PC),
            ]
        );
    }

    #[test]
    fn test_single_picture_with_live_view_off_stays_off() {
        let dir = tempdir().expect("tempdir");
        let mut camera = camera();

        assert!(camera.take_single_picture(dir.path()));
        camera.process_events();

        assert_eq!(camera.live_view_state(), LiveViewState::Off);
        assert!(output_writes(&camera).is_empty());
        let saved = camera.pop_picture_done().expect("picture saved");
        assert_eq!(saved, dir.path().join("IMG_0001.JPG"));
    }

    #[test]
    fn test_busy_shutter() {
        let mut camera = live_camera();
        camera.sdk_mut().fail_next_command(StatusCode::DEVICE_BUSY);

        assert!(!camera.take_single_picture("photo.jpg"));
        let message = camera.pop_error_message().expect("error reported");
        assert_eq!(message.severity, Severity::Error);
        assert!(message.text.contains("busy"));

        camera.process_events();
        camera.process_events();
        assert_eq!(camera.live_view_state(), LiveViewState::On);
        assert_eq!(camera.picture_done_count(), 0);
    }

    #[test]
    fn test_callback_sees_final_path() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("photo.jpg"), b"old").expect("write");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut camera = camera();
        camera.set_picture_complete_callback(move |path| {
            sink.lock().expect("lock").push(path.to_path_buf());
        });
        camera.take_single_picture(dir.path().join("photo.jpg"));
        camera.process_events();

        let seen = seen.lock().expect("lock");
        assert_eq!(seen.as_slice(), &[dir.path().join("photo_1.jpg")]);
    }

    #[test]
    fn test_failed_transfer_skips_callback_and_resumes() {
        let dir = tempdir().expect("tempdir");
        let mut camera = live_camera();
        camera.sdk_mut().fail_downloads(StatusCode::STREAM_IO_ERROR);

        camera.take_single_picture(dir.path().join("photo.jpg"));
        camera.process_events();
        camera.process_events();

        assert_eq!(camera.picture_done_count(), 0);
        assert_eq!(camera.live_view_state(), LiveViewState::On);
        assert_eq!(camera.sdk().released_objects().len(), 1);
    }

    #[test]
    fn test_fast_batch_transfers_in_order() {
        let dir = tempdir().expect("tempdir");
        let a = dir.path().join("a.jpg");
        let b = dir.path().join("b.jpg");
        let mut camera = live_camera();

        assert!(camera.begin_fast_pictures());
        assert!(camera.take_fast_picture(&a));
        assert!(camera.take_fast_picture(&b));
        camera.process_events();
        assert_eq!(camera.picture_done_count(), 0);

        assert!(camera.end_fast_pictures());
        assert_eq!(camera.pop_picture_done(), Some(a));
        assert_eq!(camera.pop_picture_done(), Some(b));
        assert_eq!(camera.pop_picture_done(), None);

        camera.process_events();
        camera.process_events();
        assert_eq!(camera.live_view_state(), LiveViewState::On);
    }

    #[test]
    fn test_fast_picture_outside_batch() {
        let mut camera = camera();
        assert!(!camera.take_fast_picture("a.jpg"));
        let message = camera.pop_error_message().expect("error reported");
        assert!(message.text.contains("Not in fast picture mode"));
        assert!(camera.sdk().commands().is_empty());
    }

    #[test]
    fn test_unexpected_object_is_released() {
        let mut camera = camera();
        let object = camera.sdk_mut().add_object("IMG_0099.JPG");
        camera.sdk_mut().emit_object_ready(object);
        camera.process_events();

        assert_eq!(camera.sdk().released_objects(), &[object]);
        assert_eq!(camera.picture_done_count(), 0);
        let message = camera.pop_error_message().expect("warning reported");
        assert_eq!(message.severity, Severity::Warning);
    }

    #[test]
    fn test_direct_properties() {
        let mut camera = camera();
        assert!(camera.set_metering_mode(MeteringMode::Spot));
        assert_eq!(camera.metering_mode(), Some(MeteringMode::Spot));
        assert!(camera.set_drive_mode(DriveMode::Continuous));
        assert_eq!(camera.drive_mode(), Some(DriveMode::Continuous));
        assert!(camera.set_af_mode(AfMode::AiServo));
        assert_eq!(camera.af_mode(), Some(AfMode::AiServo));

        assert!(camera.set_exposure_compensation(-1.0));
        let stops = camera.exposure_compensation().expect("readable");
        assert!((stops + 1.0).abs() < f32::EPSILON);
        assert!(!camera.set_exposure_compensation(f32::INFINITY));

        assert!(camera.set_depth_of_field_preview(true));
        assert_eq!(
            camera
                .sdk()
                .stored_property(PropertyId::EVF_DEPTH_OF_FIELD_PREVIEW),
            Some(PropertyValue::UInt(1))
        );
    }

    #[test]
    fn test_auto_focus_presses_halfway_then_releases() {
        let mut camera = camera();
        assert!(camera.auto_focus());
        assert_eq!(
            camera.sdk().commands(),
            &[
                (Command::PRESS_SHUTTER_BUTTON, ShutterButton::Halfway as i32),
                (Command::PRESS_SHUTTER_BUTTON, ShutterButton::Off as i32),
            ]
        );
    }

    #[test]
    fn test_shutdown_event_disconnects() {
        let mut camera = live_camera();
        camera.sdk_mut().emit_shutdown();
        camera.process_events();

        assert!(!camera.is_connected());
        assert_eq!(camera.live_view_state(), LiveViewState::Off);
        assert!(!camera.sdk().session_open());
    }

    #[test]
    fn test_power_down_warning() {
        let mut camera = live_camera();
        camera.sdk_mut().emit_state(StateEvent::WILL_SOON_SHUT_DOWN);
        camera.process_events();

        assert!(camera.is_connected());
        let message = camera.pop_error_message().expect("warning reported");
        assert_eq!(message.severity, Severity::Warning);
        assert!(message.text.contains("power down"));
    }

    #[test]
    fn test_error_level_from_config() {
        let camera = Camera::new(
            MockSdk::new(),
            CameraConfig::default().with_diagnostics_threshold(Severity::Warning),
        )
        .expect("sdk initializes")
        .with_diagnostics(Diagnostics::new(Severity::Error));
        assert_eq!(camera.error_level(), Severity::Warning);

        camera.set_error_level(Severity::Debug);
        assert_eq!(camera.error_level(), Severity::Debug);
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let mut camera = camera();
        assert!(camera.disconnect());
        assert!(camera.disconnect());
        assert!(camera.terminate());
        assert!(!camera.sdk().is_initialized());
    }
}
