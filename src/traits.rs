//! Core traits and types for the tethered camera SDK boundary.
//!
//! Everything the driver needs from the vendor SDK goes through
//! [`CameraSdk`]. Handles are opaque: the driver never dereferences them,
//! it only hands them back to the SDK.

use std::path::Path;
use std::sync::mpsc;

use thiserror::Error;

use crate::status;

/// Raw status code returned by every SDK call (`0` means success).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(pub u32);

impl StatusCode {
    /// Call succeeded.
    pub const OK: Self = Self(0x0000_0000);
    /// Internal SDK failure.
    pub const INTERNAL_ERROR: Self = Self(0x0000_0002);
    /// Property or operation not supported by this body.
    pub const NOT_SUPPORTED: Self = Self(0x0000_0007);
    /// Handle passed to the SDK was not valid.
    pub const INVALID_HANDLE: Self = Self(0x0000_0061);
    /// No device at the given index.
    pub const DEVICE_NOT_FOUND: Self = Self(0x0000_0080);
    /// Device is busy and refused the request.
    pub const DEVICE_BUSY: Self = Self(0x0000_0081);
    /// Stream I/O failure while downloading.
    pub const STREAM_IO_ERROR: Self = Self(0x0000_00A0);
    /// USB link went away.
    pub const COMM_DISCONNECTED: Self = Self(0x0000_00C1);
    /// PTP session is not open.
    pub const SESSION_NOT_OPEN: Self = Self(0x0000_2003);
    /// Requested object (or live-view image) is not ready yet.
    pub const OBJECT_NOT_READY: Self = Self(0x0000_A102);
    /// Autofocus failed, shutter not released.
    pub const TAKE_PICTURE_AF_NG: Self = Self(0x0000_8D01);

    /// Whether the code reports success.
    #[must_use]
    pub const fn is_ok(self) -> bool {
        self.0 == Self::OK.0
    }

    /// Whether the device said it cannot act right now.
    #[must_use]
    pub const fn is_busy(self) -> bool {
        self.0 == Self::DEVICE_BUSY.0 || self.0 == Self::OBJECT_NOT_READY.0
    }

    /// Convert an SDK return value into a `Result`.
    pub const fn check(self) -> SdkResult<()> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Symbolic name of the code, e.g. `EDS_ERR_DEVICE_BUSY`.
    #[must_use]
    pub fn name(self) -> String {
        status::status_name(self.0)
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (0x{:08X})", self.name(), self.0)
    }
}

/// Result type of raw SDK calls.
pub type SdkResult<T> = std::result::Result<T, StatusCode>;

/// Opaque handle to an attached camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceRef(pub usize);

/// Opaque handle to a device-side directory item (a captured file).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef(pub usize);

/// Numeric property identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyId(pub u32);

impl PropertyId {
    /// Model name of the body.
    pub const PRODUCT_NAME: Self = Self(0x0000_0002);
    /// Where captures are stored (camera, host or both).
    pub const SAVE_TO: Self = Self(0x0000_000B);
    /// Image quality bitfield (size, compression and format).
    pub const IMAGE_QUALITY: Self = Self(0x0000_0100);
    /// White balance mode.
    pub const WHITE_BALANCE: Self = Self(0x0000_0106);
    /// Drive mode.
    pub const DRIVE_MODE: Self = Self(0x0000_0401);
    /// Metering mode.
    pub const METERING_MODE: Self = Self(0x0000_0403);
    /// Autofocus mode.
    pub const AF_MODE: Self = Self(0x0000_0404);
    /// Exposure compensation code.
    pub const EXPOSURE_COMPENSATION: Self = Self(0x0000_0407);
    /// Live-view output device bitmask.
    pub const EVF_OUTPUT_DEVICE: Self = Self(0x0000_0500);
    /// Live-view depth-of-field preview switch.
    pub const EVF_DEPTH_OF_FIELD_PREVIEW: Self = Self(0x0000_0504);
    /// Live-view zoom ratio.
    pub const EVF_ZOOM: Self = Self(0x0000_0507);
    /// Live-view zoom position (top-left corner of the zoom box).
    pub const EVF_ZOOM_POSITION: Self = Self(0x0000_0508);

    /// Shape of the value stored under this id.
    #[must_use]
    pub const fn kind(self) -> PropertyKind {
        match self.0 {
            0x0000_0508 => PropertyKind::Point,
            0x0000_0106 => PropertyKind::Int,
            0x0000_0002 => PropertyKind::Text,
            _ => PropertyKind::UInt,
        }
    }
}

/// [`PropertyId::SAVE_TO`] value: store captures on the camera's card.
pub const SAVE_TO_CAMERA: u32 = 1;
/// [`PropertyId::SAVE_TO`] value: transfer captures to the host.
pub const SAVE_TO_HOST: u32 = 2;

/// [`PropertyId::EVF_OUTPUT_DEVICE`] bit: the camera's rear screen.
pub const EVF_OUTPUT_TFT: u32 = 1;
/// [`PropertyId::EVF_OUTPUT_DEVICE`] bit: the host.
pub const EVF_OUTPUT_PC: u32 = 2;

/// Image type code for JPEG in the image-quality bitfield.
pub const IMAGE_TYPE_JPEG: u32 = 1;

/// Data shape of a property value on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    /// 32-bit unsigned.
    UInt,
    /// 32-bit signed.
    Int,
    /// Two signed 32-bit coordinates.
    Point,
    /// Zero-terminated string.
    Text,
}

/// Value of a device property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    /// Unsigned value.
    UInt(u32),
    /// Signed value.
    Int(i32),
    /// Coordinate pair.
    Point(Point),
    /// Text value.
    Text(String),
}

impl PropertyValue {
    /// Read the value as unsigned, reinterpreting signed values.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub const fn as_u32(&self) -> Option<u32> {
        match self {
            Self::UInt(v) => Some(*v),
            Self::Int(v) => Some(*v as u32),
            _ => None,
        }
    }

    /// Read the value as signed, reinterpreting unsigned values.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            Self::UInt(v) => Some(*v as i32),
            _ => None,
        }
    }

    /// Read the value as a point.
    #[must_use]
    pub const fn as_point(&self) -> Option<Point> {
        match self {
            Self::Point(p) => Some(*p),
            _ => None,
        }
    }
}

/// Integer coordinate on the sensor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
}

impl Point {
    /// Create a point.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Width and height in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Size {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Size {
    /// Create a size.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Command sent to the camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Command(pub u32);

impl Command {
    /// Release the shutter.
    pub const TAKE_PICTURE: Self = Self(0x0000_0000);
    /// Press the shutter button; the parameter is a [`ShutterButton`] state.
    pub const PRESS_SHUTTER_BUTTON: Self = Self(0x0000_0004);
}

/// Shutter button positions for [`Command::PRESS_SHUTTER_BUTTON`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ShutterButton {
    /// Released.
    Off = 0,
    /// Half-pressed (focus and meter).
    Halfway = 1,
}

/// Free-space report sent to the camera before shooting to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity {
    /// Number of free clusters.
    pub free_clusters: i32,
    /// Bytes per cluster.
    pub bytes_per_sector: i32,
    /// Whether the camera should reset its own estimate.
    pub reset: bool,
}

impl Capacity {
    /// Large enough that the camera never refuses a shot for lack of space.
    pub const UNLIMITED: Self = Self {
        free_clusters: 0x7FFF_FFFF,
        bytes_per_sector: 512,
        reset: true,
    };
}

/// Metadata of a device-side file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryItemInfo {
    /// Size in bytes.
    pub size: u64,
    /// Whether the item is a folder.
    pub is_folder: bool,
    /// File name on the device, e.g. `IMG_0001.JPG`.
    pub file_name: String,
}

/// Camera state notification code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateEvent(pub u32);

impl StateEvent {
    /// Subscribe to every state event.
    pub const ALL: Self = Self(0x0000_0300);
    /// Camera lost its connection or was switched off.
    pub const SHUTDOWN: Self = Self(0x0000_0301);
    /// Camera is about to power down.
    pub const WILL_SOON_SHUT_DOWN: Self = Self(0x0000_0303);
}

/// Directory object notification code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectEvent(pub u32);

impl ObjectEvent {
    /// Subscribe to every object event.
    pub const ALL: Self = Self(0x0000_0200);
    /// A capture is ready to be transferred to the host.
    pub const DIR_ITEM_REQUEST_TRANSFER: Self = Self(0x0000_0208);
}

/// Property notification code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyEvent(pub u32);

impl PropertyEvent {
    /// Subscribe to every property event.
    pub const ALL: Self = Self(0x0000_0100);
    /// A property value changed.
    pub const PROPERTY_CHANGED: Self = Self(0x0000_0101);
}

/// Asynchronous notification delivered by the SDK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// Camera state changed.
    State {
        /// Event code.
        event: StateEvent,
        /// Event-specific parameter.
        param: u32,
    },
    /// Directory object event.
    Object {
        /// Event code.
        event: ObjectEvent,
        /// Object the event refers to. The receiver owns the reference.
        object: ObjectRef,
    },
    /// Property event.
    Property {
        /// Event code.
        event: PropertyEvent,
        /// Property that changed.
        property: PropertyId,
        /// Event-specific parameter.
        param: u32,
    },
}

/// Per-instance notification target handed to the SDK at registration.
///
/// The SDK's callbacks only enqueue; the owning camera drains the queue from
/// a single dispatch point.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<DeviceEvent>,
}

impl EventSink {
    /// Create a sink and the receiver the owner drains.
    #[must_use]
    pub fn channel() -> (Self, mpsc::Receiver<DeviceEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }

    /// Deliver a notification. Returns `false` if the owner is gone.
    pub fn notify(&self, event: DeviceEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Error type for camera operations.
#[derive(Debug, Error)]
pub enum CameraError {
    /// No camera is attached.
    #[error("No camera connected")]
    NoDeviceFound,

    /// More than one camera is attached; this driver manages exactly one.
    #[error("Too many cameras connected ({0}), only one is supported")]
    MultipleDevicesUnsupported(usize),

    /// The camera refused the shutter because it is not ready.
    #[error("Camera is busy: {0}")]
    DeviceBusy(StatusCode),

    /// Any other non-OK device status.
    #[error("Device error: {0}")]
    DeviceError(StatusCode),

    /// Download, metadata query or publish of a capture failed.
    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    /// Baseline session configuration failed.
    #[error("Session configuration failed: {0}")]
    ConfigurationFailed(String),

    /// Operation needs an open session.
    #[error("No open session with the camera")]
    NotConnected,

    /// Fast picture requested outside a fast-picture batch.
    #[error("Not in fast picture mode")]
    NotInBatch,
}

impl From<StatusCode> for CameraError {
    fn from(code: StatusCode) -> Self {
        Self::DeviceError(code)
    }
}

impl CameraError {
    /// Map a shutter status: busy codes become [`CameraError::DeviceBusy`].
    #[must_use]
    pub fn from_shutter(code: StatusCode) -> Self {
        if code.is_busy() {
            Self::DeviceBusy(code)
        } else {
            Self::DeviceError(code)
        }
    }
}

/// Result type for camera operations.
pub type Result<T> = std::result::Result<T, CameraError>;

/// Abstraction over the vendor SDK.
///
/// Calls return immediately. Notifications are delivered to the
/// [`EventSink`] registered with [`CameraSdk::subscribe`], from inside
/// [`CameraSdk::pump_events`] or from an SDK-owned thread.
pub trait CameraSdk {
    /// Initialize the SDK. Repeated calls are no-ops.
    fn initialize(&mut self) -> SdkResult<()>;

    /// Tear the SDK down. Repeated calls are no-ops.
    fn terminate(&mut self) -> SdkResult<()>;

    /// Enumerate attached cameras.
    fn camera_list(&mut self) -> SdkResult<Vec<DeviceRef>>;

    /// Release a camera handle.
    fn release(&mut self, device: DeviceRef);

    /// Open a session on a camera.
    fn open_session(&mut self, device: DeviceRef) -> SdkResult<()>;

    /// Close the session; drops registered handlers on the device side.
    fn close_session(&mut self, device: DeviceRef) -> SdkResult<()>;

    /// Human-readable model identity, e.g. `Canon EOS 7D`.
    fn device_description(&mut self, device: DeviceRef) -> SdkResult<String>;

    /// Register state, object and property handlers for `device`.
    fn subscribe(&mut self, device: DeviceRef, sink: EventSink) -> SdkResult<()>;

    /// Read a property.
    fn property(&mut self, device: DeviceRef, id: PropertyId) -> SdkResult<PropertyValue>;

    /// Write a property.
    fn set_property(
        &mut self,
        device: DeviceRef,
        id: PropertyId,
        value: PropertyValue,
    ) -> SdkResult<()>;

    /// Tell the camera how much space the host has.
    fn set_capacity(&mut self, device: DeviceRef, capacity: Capacity) -> SdkResult<()>;

    /// Send a command.
    fn send_command(&mut self, device: DeviceRef, command: Command, param: i32) -> SdkResult<()>;

    /// Query a directory item's metadata.
    fn item_info(&mut self, object: ObjectRef) -> SdkResult<DirectoryItemInfo>;

    /// Download `size` bytes of `object` into the file at `dest`.
    fn download(&mut self, object: ObjectRef, size: u64, dest: &Path) -> SdkResult<()>;

    /// Acknowledge that a download finished.
    fn download_complete(&mut self, object: ObjectRef) -> SdkResult<()>;

    /// Release an object reference received from a notification.
    fn release_object(&mut self, object: ObjectRef);

    /// Download the current live-view image into `buffer`, returning the
    /// number of bytes written.
    fn download_evf_image(&mut self, device: DeviceRef, buffer: &mut [u8]) -> SdkResult<usize>;

    /// Let the SDK deliver pending notifications.
    fn pump_events(&mut self) -> SdkResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_check() {
        assert!(StatusCode::OK.check().is_ok());
        assert_eq!(
            StatusCode::DEVICE_BUSY.check(),
            Err(StatusCode::DEVICE_BUSY)
        );
    }

    #[test]
    fn test_status_display() {
        let text = StatusCode::DEVICE_BUSY.to_string();
        assert_eq!(text, "EDS_ERR_DEVICE_BUSY (0x00000081)");
    }

    #[test]
    fn test_shutter_errors() {
        assert!(matches!(
            CameraError::from_shutter(StatusCode::DEVICE_BUSY),
            CameraError::DeviceBusy(_)
        ));
        assert!(matches!(
            CameraError::from_shutter(StatusCode::OBJECT_NOT_READY),
            CameraError::DeviceBusy(_)
        ));
        assert!(matches!(
            CameraError::from_shutter(StatusCode::TAKE_PICTURE_AF_NG),
            CameraError::DeviceError(_)
        ));
        assert!(matches!(
            CameraError::from(StatusCode::INTERNAL_ERROR),
            CameraError::DeviceError(StatusCode::INTERNAL_ERROR)
        ));
    }

    #[test]
    fn test_property_value_conversions() {
        assert_eq!(PropertyValue::Int(-1).as_u32(), Some(u32::MAX));
        assert_eq!(PropertyValue::UInt(u32::MAX).as_i32(), Some(-1));
        assert_eq!(PropertyValue::Text("x".to_owned()).as_u32(), None);
        assert_eq!(
            PropertyValue::Point(Point::new(3, 4)).as_point(),
            Some(Point::new(3, 4))
        );
        assert_eq!(PropertyValue::UInt(1).as_point(), None);
    }

    #[test]
    fn test_property_kinds() {
        assert_eq!(PropertyId::EVF_ZOOM_POSITION.kind(), PropertyKind::Point);
        assert_eq!(PropertyId::WHITE_BALANCE.kind(), PropertyKind::Int);
        assert_eq!(PropertyId::PRODUCT_NAME.kind(), PropertyKind::Text);
        assert_eq!(PropertyId::EVF_ZOOM.kind(), PropertyKind::UInt);
    }

    #[test]
    fn test_sink_reports_dropped_owner() {
        let (sink, events) = EventSink::channel();
        let event = DeviceEvent::State {
            event: StateEvent::SHUTDOWN,
            param: 0,
        };
        assert!(sink.notify(event.clone()));
        assert_eq!(events.try_recv().ok(), Some(event.clone()));

        drop(events);
        assert!(!sink.notify(event));
    }
}
