//! Canon EDSDK backend.
//!
//! Thin binding over the vendor library: every call maps one-to-one onto an
//! `Eds*` function. Handles cross the [`CameraSdk`] boundary as plain
//! integers holding the SDK's pointers. Notification handlers are
//! registered with a boxed [`EventSink`] as context, so each session's
//! callbacks land in its own queue.

#![allow(unsafe_code)]

use std::collections::HashMap;
use std::ffi::{c_char, c_void, CStr, CString};
use std::path::Path;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use crate::traits::{
    CameraSdk, Capacity, Command, DeviceEvent, DeviceRef, DirectoryItemInfo, EventSink,
    ObjectEvent, ObjectRef, Point, PropertyEvent, PropertyId, PropertyKind, PropertyValue,
    SdkResult, StateEvent, StatusCode,
};

type EdsError = u32;
type EdsBaseRef = *mut c_void;

const EDS_MAX_NAME: usize = 256;
const FILE_CREATE_ALWAYS: u32 = 1;
const ACCESS_READ_WRITE: u32 = 2;

#[repr(C)]
struct EdsDeviceInfo {
    port_name: [c_char; EDS_MAX_NAME],
    device_description: [c_char; EDS_MAX_NAME],
    device_sub_type: u32,
    reserved: u32,
}

#[repr(C)]
struct EdsDirectoryItemInfo {
    size: u64,
    is_folder: i32,
    group_id: u32,
    option: u32,
    file_name: [c_char; EDS_MAX_NAME],
    format: u32,
    date_time: u32,
}

#[repr(C)]
#[derive(Default)]
struct EdsPoint {
    x: i32,
    y: i32,
}

#[repr(C)]
struct EdsCapacity {
    number_of_free_clusters: i32,
    bytes_per_sector: i32,
    reset: i32,
}

type ObjectHandler = unsafe extern "system" fn(u32, EdsBaseRef, *mut c_void) -> EdsError;
type PropertyHandler = unsafe extern "system" fn(u32, u32, u32, *mut c_void) -> EdsError;
type StateHandler = unsafe extern "system" fn(u32, u32, *mut c_void) -> EdsError;

// Linked through build.rs.
extern "system" {
    fn EdsInitializeSDK() -> EdsError;
    fn EdsTerminateSDK() -> EdsError;
    fn EdsRelease(item: EdsBaseRef) -> u32;
    fn EdsGetChildCount(item: EdsBaseRef, count: *mut u32) -> EdsError;
    fn EdsGetChildAtIndex(item: EdsBaseRef, index: i32, child: *mut EdsBaseRef) -> EdsError;
    fn EdsGetCameraList(list: *mut EdsBaseRef) -> EdsError;
    fn EdsGetDeviceInfo(camera: EdsBaseRef, info: *mut EdsDeviceInfo) -> EdsError;
    fn EdsOpenSession(camera: EdsBaseRef) -> EdsError;
    fn EdsCloseSession(camera: EdsBaseRef) -> EdsError;
    fn EdsGetPropertySize(
        item: EdsBaseRef,
        id: u32,
        param: i32,
        data_type: *mut u32,
        size: *mut u32,
    ) -> EdsError;
    fn EdsGetPropertyData(
        item: EdsBaseRef,
        id: u32,
        param: i32,
        size: u32,
        data: *mut c_void,
    ) -> EdsError;
    fn EdsSetPropertyData(
        item: EdsBaseRef,
        id: u32,
        param: i32,
        size: u32,
        data: *const c_void,
    ) -> EdsError;
    fn EdsSetCapacity(camera: EdsBaseRef, capacity: EdsCapacity) -> EdsError;
    fn EdsSendCommand(camera: EdsBaseRef, command: u32, param: i32) -> EdsError;
    fn EdsGetDirectoryItemInfo(item: EdsBaseRef, info: *mut EdsDirectoryItemInfo) -> EdsError;
    fn EdsCreateFileStream(
        file_name: *const c_char,
        disposition: u32,
        access: u32,
        stream: *mut EdsBaseRef,
    ) -> EdsError;
    fn EdsCreateMemoryStreamFromPointer(
        buffer: *mut c_void,
        size: u64,
        stream: *mut EdsBaseRef,
    ) -> EdsError;
    fn EdsGetLength(stream: EdsBaseRef, length: *mut u64) -> EdsError;
    fn EdsDownload(item: EdsBaseRef, size: u64, stream: EdsBaseRef) -> EdsError;
    fn EdsDownloadComplete(item: EdsBaseRef) -> EdsError;
    fn EdsCreateEvfImageRef(stream: EdsBaseRef, image: *mut EdsBaseRef) -> EdsError;
    fn EdsDownloadEvfImage(camera: EdsBaseRef, image: EdsBaseRef) -> EdsError;
    fn EdsSetObjectEventHandler(
        camera: EdsBaseRef,
        event: u32,
        handler: Option<ObjectHandler>,
        context: *mut c_void,
    ) -> EdsError;
    fn EdsSetPropertyEventHandler(
        camera: EdsBaseRef,
        event: u32,
        handler: Option<PropertyHandler>,
        context: *mut c_void,
    ) -> EdsError;
    fn EdsSetCameraStateEventHandler(
        camera: EdsBaseRef,
        event: u32,
        handler: Option<StateHandler>,
        context: *mut c_void,
    ) -> EdsError;
    fn EdsGetEvent() -> EdsError;
}

static SDK_INITIALIZED: AtomicBool = AtomicBool::new(false);

fn check(code: EdsError) -> SdkResult<()> {
    StatusCode(code).check()
}

fn as_ref(handle: usize) -> EdsBaseRef {
    handle as EdsBaseRef
}

#[allow(clippy::cast_sign_loss)]
fn c_string(raw: &[c_char]) -> String {
    let bytes: Vec<u8> = raw.iter().map(|&c| c as u8).collect();
    CStr::from_bytes_until_nul(&bytes)
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned())
}

/// Releases an SDK reference when dropped.
struct Owned(EdsBaseRef);

impl Drop for Owned {
    fn drop(&mut self) {
        if !self.0.is_null() {
            // SAFETY: the reference came from an SDK call and is released once.
            unsafe { EdsRelease(self.0) };
        }
    }
}

unsafe extern "system" fn on_object_event(
    event: u32,
    object: EdsBaseRef,
    context: *mut c_void,
) -> EdsError {
    // SAFETY: `context` is the boxed sink registered in `subscribe`, alive
    // until the session is closed.
    let sink = unsafe { context.cast::<EventSink>().as_ref() };
    let delivered = sink.is_some_and(|sink| {
        sink.notify(DeviceEvent::Object {
            event: ObjectEvent(event),
            object: ObjectRef(object as usize),
        })
    });
    if !delivered && !object.is_null() {
        // SAFETY: nobody will receive the reference, so it is released here.
        unsafe { EdsRelease(object) };
    }
    StatusCode::OK.0
}

unsafe extern "system" fn on_property_event(
    event: u32,
    property: u32,
    param: u32,
    context: *mut c_void,
) -> EdsError {
    // SAFETY: see `on_object_event`.
    if let Some(sink) = unsafe { context.cast::<EventSink>().as_ref() } {
        sink.notify(DeviceEvent::Property {
            event: PropertyEvent(event),
            property: PropertyId(property),
            param,
        });
    }
    StatusCode::OK.0
}

unsafe extern "system" fn on_state_event(event: u32, param: u32, context: *mut c_void) -> EdsError {
    // SAFETY: see `on_object_event`.
    if let Some(sink) = unsafe { context.cast::<EventSink>().as_ref() } {
        sink.notify(DeviceEvent::State {
            event: StateEvent(event),
            param,
        });
    }
    StatusCode::OK.0
}

/// The vendor SDK.
#[derive(Default)]
pub struct EdsSdk {
    // Sinks handed to the SDK as handler context, keyed by camera handle.
    sinks: HashMap<usize, *mut EventSink>,
}

impl EdsSdk {
    /// Create the backend. The SDK itself is set up by
    /// [`CameraSdk::initialize`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn drop_sink(&mut self, device: DeviceRef) {
        if let Some(sink) = self.sinks.remove(&device.0) {
            // SAFETY: produced by `Box::into_raw` in `subscribe`; the handlers
            // using it were removed when the session closed.
            drop(unsafe { Box::from_raw(sink) });
        }
    }

    fn read<T: Default>(device: DeviceRef, id: PropertyId) -> SdkResult<T> {
        let mut value = T::default();
        let size = u32::try_from(std::mem::size_of::<T>()).map_err(|_| StatusCode::INTERNAL_ERROR)?;
        // SAFETY: `value` is a plain value of exactly `size` bytes.
        check(unsafe {
            EdsGetPropertyData(as_ref(device.0), id.0, 0, size, ptr::addr_of_mut!(value).cast())
        })?;
        Ok(value)
    }

    fn write<T>(device: DeviceRef, id: PropertyId, value: &T) -> SdkResult<()> {
        let size = u32::try_from(std::mem::size_of::<T>()).map_err(|_| StatusCode::INTERNAL_ERROR)?;
        // SAFETY: `value` is a plain value of exactly `size` bytes.
        check(unsafe {
            EdsSetPropertyData(as_ref(device.0), id.0, 0, size, ptr::from_ref(value).cast())
        })
    }

    fn read_text(device: DeviceRef, id: PropertyId) -> SdkResult<String> {
        let mut data_type = 0;
        let mut size = 0;
        // SAFETY: out-pointers reference live locals.
        check(unsafe { EdsGetPropertySize(as_ref(device.0), id.0, 0, &mut data_type, &mut size) })?;
        let mut buffer: Vec<c_char> = vec![0; size as usize];
        // SAFETY: `buffer` holds `size` bytes.
        check(unsafe {
            EdsGetPropertyData(as_ref(device.0), id.0, 0, size, buffer.as_mut_ptr().cast())
        })?;
        Ok(c_string(&buffer))
    }
}

impl Drop for EdsSdk {
    fn drop(&mut self) {
        for (_, sink) in self.sinks.drain() {
            // SAFETY: see `drop_sink`.
            drop(unsafe { Box::from_raw(sink) });
        }
    }
}

impl CameraSdk for EdsSdk {
    fn initialize(&mut self) -> SdkResult<()> {
        if SDK_INITIALIZED.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        // SAFETY: guarded by the process-wide flag.
        let result = check(unsafe { EdsInitializeSDK() });
        if result.is_err() {
            SDK_INITIALIZED.store(false, Ordering::SeqCst);
        } else {
            debug!("EDSDK initialized");
        }
        result
    }

    fn terminate(&mut self) -> SdkResult<()> {
        if !SDK_INITIALIZED.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        debug!("EDSDK terminated");
        // SAFETY: the SDK was initialized by this process.
        check(unsafe { EdsTerminateSDK() })
    }

    fn camera_list(&mut self) -> SdkResult<Vec<DeviceRef>> {
        let mut list = ptr::null_mut();
        // SAFETY: out-pointer references a live local.
        check(unsafe { EdsGetCameraList(&mut list) })?;
        let list = Owned(list);

        let mut count = 0;
        // SAFETY: `list` is a valid camera list.
        check(unsafe { EdsGetChildCount(list.0, &mut count) })?;

        let mut cameras = Vec::new();
        for index in 0..count {
            let mut camera = ptr::null_mut();
            let index = i32::try_from(index).map_err(|_| StatusCode::INTERNAL_ERROR)?;
            // SAFETY: `index` is below the child count.
            if let Err(code) = check(unsafe { EdsGetChildAtIndex(list.0, index, &mut camera) }) {
                for camera in cameras {
                    self.release(camera);
                }
                return Err(code);
            }
            cameras.push(DeviceRef(camera as usize));
        }
        Ok(cameras)
    }

    fn release(&mut self, device: DeviceRef) {
        self.drop_sink(device);
        drop(Owned(as_ref(device.0)));
    }

    fn open_session(&mut self, device: DeviceRef) -> SdkResult<()> {
        // SAFETY: `device` came from `camera_list`.
        check(unsafe { EdsOpenSession(as_ref(device.0)) })
    }

    fn close_session(&mut self, device: DeviceRef) -> SdkResult<()> {
        // SAFETY: `device` came from `camera_list`.
        let result = check(unsafe { EdsCloseSession(as_ref(device.0)) });
        self.drop_sink(device);
        result
    }

    fn device_description(&mut self, device: DeviceRef) -> SdkResult<String> {
        let mut info = EdsDeviceInfo {
            port_name: [0; EDS_MAX_NAME],
            device_description: [0; EDS_MAX_NAME],
            device_sub_type: 0,
            reserved: 0,
        };
        // SAFETY: out-pointer references a live local.
        check(unsafe { EdsGetDeviceInfo(as_ref(device.0), &mut info) })?;
        Ok(c_string(&info.device_description))
    }

    fn subscribe(&mut self, device: DeviceRef, sink: EventSink) -> SdkResult<()> {
        self.drop_sink(device);
        let context = Box::into_raw(Box::new(sink));
        self.sinks.insert(device.0, context);

        let camera = as_ref(device.0);
        // SAFETY: handlers are `extern "system"` functions matching the SDK's
        // signatures; `context` outlives the registration.
        let result = unsafe {
            check(EdsSetCameraStateEventHandler(
                camera,
                StateEvent::ALL.0,
                Some(on_state_event),
                context.cast(),
            ))
            .and_then(|()| {
                check(EdsSetObjectEventHandler(
                    camera,
                    ObjectEvent::ALL.0,
                    Some(on_object_event),
                    context.cast(),
                ))
            })
            .and_then(|()| {
                check(EdsSetPropertyEventHandler(
                    camera,
                    PropertyEvent::ALL.0,
                    Some(on_property_event),
                    context.cast(),
                ))
            })
        };
        if let Err(code) = result {
            warn!(%code, "registering event handlers failed");
        }
        result
    }

    fn property(&mut self, device: DeviceRef, id: PropertyId) -> SdkResult<PropertyValue> {
        match id.kind() {
            PropertyKind::UInt => Self::read::<u32>(device, id).map(PropertyValue::UInt),
            PropertyKind::Int => Self::read::<i32>(device, id).map(PropertyValue::Int),
            PropertyKind::Point => Self::read::<EdsPoint>(device, id)
                .map(|p| PropertyValue::Point(Point::new(p.x, p.y))),
            PropertyKind::Text => Self::read_text(device, id).map(PropertyValue::Text),
        }
    }

    fn set_property(
        &mut self,
        device: DeviceRef,
        id: PropertyId,
        value: PropertyValue,
    ) -> SdkResult<()> {
        match value {
            PropertyValue::UInt(v) => Self::write(device, id, &v),
            PropertyValue::Int(v) => Self::write(device, id, &v),
            PropertyValue::Point(p) => Self::write(device, id, &EdsPoint { x: p.x, y: p.y }),
            PropertyValue::Text(_) => Err(StatusCode::NOT_SUPPORTED),
        }
    }

    fn set_capacity(&mut self, device: DeviceRef, capacity: Capacity) -> SdkResult<()> {
        let capacity = EdsCapacity {
            number_of_free_clusters: capacity.free_clusters,
            bytes_per_sector: capacity.bytes_per_sector,
            reset: i32::from(capacity.reset),
        };
        // SAFETY: plain value passed by copy.
        check(unsafe { EdsSetCapacity(as_ref(device.0), capacity) })
    }

    fn send_command(&mut self, device: DeviceRef, command: Command, param: i32) -> SdkResult<()> {
        // SAFETY: `device` came from `camera_list`.
        check(unsafe { EdsSendCommand(as_ref(device.0), command.0, param) })
    }

    fn item_info(&mut self, object: ObjectRef) -> SdkResult<DirectoryItemInfo> {
        let mut info = EdsDirectoryItemInfo {
            size: 0,
            is_folder: 0,
            group_id: 0,
            option: 0,
            file_name: [0; EDS_MAX_NAME],
            format: 0,
            date_time: 0,
        };
        // SAFETY: out-pointer references a live local.
        check(unsafe { EdsGetDirectoryItemInfo(as_ref(object.0), &mut info) })?;
        Ok(DirectoryItemInfo {
            size: info.size,
            is_folder: info.is_folder != 0,
            file_name: c_string(&info.file_name),
        })
    }

    fn download(&mut self, object: ObjectRef, size: u64, dest: &Path) -> SdkResult<()> {
        let path = dest
            .to_str()
            .and_then(|s| CString::new(s).ok())
            .ok_or(StatusCode::INTERNAL_ERROR)?;

        let mut stream = ptr::null_mut();
        // SAFETY: `path` is a valid C string; out-pointer references a local.
        check(unsafe {
            EdsCreateFileStream(path.as_ptr(), FILE_CREATE_ALWAYS, ACCESS_READ_WRITE, &mut stream)
        })?;
        let stream = Owned(stream);
        // SAFETY: `object` came from an object notification.
        check(unsafe { EdsDownload(as_ref(object.0), size, stream.0) })
    }

    fn download_complete(&mut self, object: ObjectRef) -> SdkResult<()> {
        // SAFETY: `object` came from an object notification.
        check(unsafe { EdsDownloadComplete(as_ref(object.0)) })
    }

    fn release_object(&mut self, object: ObjectRef) {
        drop(Owned(as_ref(object.0)));
    }

    fn download_evf_image(&mut self, device: DeviceRef, buffer: &mut [u8]) -> SdkResult<usize> {
        let mut stream = ptr::null_mut();
        // SAFETY: the stream writes into `buffer`, which outlives it.
        check(unsafe {
            EdsCreateMemoryStreamFromPointer(buffer.as_mut_ptr().cast(), buffer.len() as u64, &mut stream)
        })?;
        let stream = Owned(stream);

        let mut image = ptr::null_mut();
        // SAFETY: `stream` is valid; out-pointer references a local.
        check(unsafe { EdsCreateEvfImageRef(stream.0, &mut image) })?;
        let image = Owned(image);

        // SAFETY: `device` has an open session; `image` is valid.
        check(unsafe { EdsDownloadEvfImage(as_ref(device.0), image.0) })?;

        let mut length = 0;
        // SAFETY: out-pointer references a local.
        check(unsafe { EdsGetLength(stream.0, &mut length) })?;
        Ok(usize::try_from(length).map_or(buffer.len(), |n| n.min(buffer.len())))
    }

    fn pump_events(&mut self) -> SdkResult<()> {
        // SAFETY: no preconditions beyond initialization.
        check(unsafe { EdsGetEvent() })
    }
}
