//! Simulated camera for testing without hardware.
//!
//! [`MockSdk`] keeps properties in memory, turns shutter releases into
//! captured objects and acknowledges live-view output changes the way a
//! body does: with a property-changed notification delivered on the next
//! [`CameraSdk::pump_events`].

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::Path;

use crate::profile::EOS_5D_MARK_II;
use crate::traits::{
    CameraSdk, Capacity, Command, DeviceEvent, DeviceRef, DirectoryItemInfo, EventSink,
    ObjectEvent, ObjectRef, Point, PropertyEvent, PropertyId, PropertyValue, SdkResult,
    StateEvent, StatusCode, EVF_OUTPUT_TFT, SAVE_TO_CAMERA,
};

/// Simulated camera SDK.
pub struct MockSdk {
    cameras: usize,
    name: String,
    initialized: bool,
    session_open: bool,
    sink: Option<EventSink>,
    events: VecDeque<DeviceEvent>,
    manual_ack: bool,

    properties: HashMap<PropertyId, PropertyValue>,
    writes: Vec<(PropertyId, PropertyValue)>,
    capacity: Option<Capacity>,
    commands: Vec<(Command, i32)>,

    picture_data: Vec<u8>,
    live_view_image: Vec<u8>,
    objects: HashMap<usize, String>,
    next_object: usize,
    shots: u32,
    completed: Vec<ObjectRef>,
    released_objects: Vec<ObjectRef>,
    released_devices: usize,
    evf_downloads: usize,

    open_failure: Option<StatusCode>,
    write_failures: HashMap<PropertyId, StatusCode>,
    command_failure: Option<StatusCode>,
    download_failure: Option<StatusCode>,
}

impl Default for MockSdk {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSdk {
    /// One attached "Canon EOS 5D Mark II" with typical settings.
    #[must_use]
    pub fn new() -> Self {
        let properties = HashMap::from([
            (PropertyId::PRODUCT_NAME, PropertyValue::Text(EOS_5D_MARK_II.to_owned())),
            (PropertyId::SAVE_TO, PropertyValue::UInt(SAVE_TO_CAMERA)),
            (PropertyId::IMAGE_QUALITY, PropertyValue::UInt(0x0013_FF0F)),
            (PropertyId::WHITE_BALANCE, PropertyValue::Int(0)),
            (PropertyId::DRIVE_MODE, PropertyValue::UInt(0)),
            (PropertyId::METERING_MODE, PropertyValue::UInt(3)),
            (PropertyId::AF_MODE, PropertyValue::UInt(0)),
            (PropertyId::EXPOSURE_COMPENSATION, PropertyValue::UInt(0)),
            (PropertyId::EVF_OUTPUT_DEVICE, PropertyValue::UInt(EVF_OUTPUT_TFT)),
            (PropertyId::EVF_DEPTH_OF_FIELD_PREVIEW, PropertyValue::UInt(0)),
            (PropertyId::EVF_ZOOM, PropertyValue::UInt(1)),
            (PropertyId::EVF_ZOOM_POSITION, PropertyValue::Point(Point::default())),
        ]);

        Self {
            cameras: 1,
            name: EOS_5D_MARK_II.to_owned(),
            initialized: false,
            session_open: false,
            sink: None,
            events: VecDeque::new(),
            manual_ack: false,
            properties,
            writes: Vec::new(),
            capacity: None,
            commands: Vec::new(),
            picture_data: fake_jpeg(0x5A, 256),
            live_view_image: fake_jpeg(0xA5, 64),
            objects: HashMap::new(),
            next_object: 1,
            shots: 0,
            completed: Vec::new(),
            released_objects: Vec::new(),
            released_devices: 0,
            evf_downloads: 0,
            open_failure: None,
            write_failures: HashMap::new(),
            command_failure: None,
            download_failure: None,
        }
    }

    /// Report `count` attached cameras.
    #[must_use]
    pub const fn with_cameras(mut self, count: usize) -> Self {
        self.cameras = count;
        self
    }

    /// Report a different model name.
    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_owned();
        self.properties
            .insert(PropertyId::PRODUCT_NAME, PropertyValue::Text(name.to_owned()));
        self
    }

    /// Start with `value` stored under `id`.
    #[must_use]
    pub fn with_property(mut self, id: PropertyId, value: PropertyValue) -> Self {
        self.properties.insert(id, value);
        self
    }

    /// Contents of every captured file.
    #[must_use]
    pub fn with_picture_data(mut self, data: Vec<u8>) -> Self {
        self.picture_data = data;
        self
    }

    /// Contents of every live-view frame.
    #[must_use]
    pub fn with_live_view_image(mut self, data: Vec<u8>) -> Self {
        self.live_view_image = data;
        self
    }

    /// Make opening a session fail with `code`.
    #[must_use]
    pub const fn with_open_failure(mut self, code: StatusCode) -> Self {
        self.open_failure = Some(code);
        self
    }

    /// Only acknowledge output-device changes on
    /// [`MockSdk::acknowledge_output`].
    #[must_use]
    pub const fn with_manual_ack(mut self) -> Self {
        self.manual_ack = true;
        self
    }

    /// Fail every write of `id` with `code`.
    pub fn fail_property_write(&mut self, id: PropertyId, code: StatusCode) {
        self.write_failures.insert(id, code);
    }

    /// Fail the next command with `code`.
    pub fn fail_next_command(&mut self, code: StatusCode) {
        self.command_failure = Some(code);
    }

    /// Fail every download with `code`.
    pub fn fail_downloads(&mut self, code: StatusCode) {
        self.download_failure = Some(code);
    }

    /// Drop every injected failure.
    pub fn clear_failures(&mut self) {
        self.open_failure = None;
        self.write_failures.clear();
        self.command_failure = None;
        self.download_failure = None;
    }

    /// Change a property as if from the camera body, without recording a
    /// write or notifying.
    pub fn store_property(&mut self, id: PropertyId, value: PropertyValue) {
        self.properties.insert(id, value);
    }

    /// Current stored value of `id`.
    pub fn stored_property(&self, id: PropertyId) -> Option<PropertyValue> {
        self.properties.get(&id).cloned()
    }

    /// Every successful write of `id`, oldest first.
    pub fn property_writes(&self, id: PropertyId) -> Vec<PropertyValue> {
        self.writes
            .iter()
            .filter(|(written, _)| *written == id)
            .map(|(_, value)| value.clone())
            .collect()
    }

    /// Create a device-side file without notifying.
    pub fn add_object(&mut self, file_name: &str) -> ObjectRef {
        let object = ObjectRef(self.next_object);
        self.next_object += 1;
        self.objects.insert(object.0, file_name.to_owned());
        object
    }

    /// Queue an object-ready notification.
    pub fn emit_object_ready(&mut self, object: ObjectRef) {
        self.events.push_back(DeviceEvent::Object {
            event: ObjectEvent::DIR_ITEM_REQUEST_TRANSFER,
            object,
        });
    }

    /// Queue a camera state notification.
    pub fn emit_state(&mut self, event: StateEvent) {
        self.events.push_back(DeviceEvent::State { event, param: 0 });
    }

    /// Queue a shutdown notification.
    pub fn emit_shutdown(&mut self) {
        self.emit_state(StateEvent::SHUTDOWN);
    }

    /// Queue the acknowledgment of the current output-device value.
    pub fn acknowledge_output(&mut self) {
        self.events.push_back(DeviceEvent::Property {
            event: PropertyEvent::PROPERTY_CHANGED,
            property: PropertyId::EVF_OUTPUT_DEVICE,
            param: 0,
        });
    }

    /// Whether [`CameraSdk::initialize`] ran without a later terminate.
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Whether a session is open.
    pub const fn session_open(&self) -> bool {
        self.session_open
    }

    /// Whether notification handlers are registered.
    pub const fn is_subscribed(&self) -> bool {
        self.sink.is_some()
    }

    /// Last free-space report.
    pub const fn capacity(&self) -> Option<Capacity> {
        self.capacity
    }

    /// Successful commands, oldest first.
    pub fn commands(&self) -> &[(Command, i32)] {
        &self.commands
    }

    /// Objects whose download was acknowledged.
    pub fn completed_downloads(&self) -> &[ObjectRef] {
        &self.completed
    }

    /// Released object references.
    pub fn released_objects(&self) -> &[ObjectRef] {
        &self.released_objects
    }

    /// Number of released device handles.
    pub const fn released_devices(&self) -> usize {
        self.released_devices
    }

    /// Number of live-view frames handed out.
    pub const fn evf_downloads(&self) -> usize {
        self.evf_downloads
    }

    const fn require_session(&self) -> SdkResult<()> {
        if self.session_open {
            Ok(())
        } else {
            Err(StatusCode::SESSION_NOT_OPEN)
        }
    }
}

impl CameraSdk for MockSdk {
    fn initialize(&mut self) -> SdkResult<()> {
        self.initialized = true;
        Ok(())
    }

    fn terminate(&mut self) -> SdkResult<()> {
        self.initialized = false;
        Ok(())
    }

    fn camera_list(&mut self) -> SdkResult<Vec<DeviceRef>> {
        Ok((0..self.cameras).map(DeviceRef).collect())
    }

    fn release(&mut self, _device: DeviceRef) {
        self.released_devices += 1;
    }

    fn open_session(&mut self, _device: DeviceRef) -> SdkResult<()> {
        if let Some(code) = self.open_failure {
            return Err(code);
        }
        self.session_open = true;
        Ok(())
    }

    fn close_session(&mut self, _device: DeviceRef) -> SdkResult<()> {
        self.require_session()?;
        self.session_open = false;
        self.sink = None;
        self.events.clear();
        Ok(())
    }

    fn device_description(&mut self, _device: DeviceRef) -> SdkResult<String> {
        Ok(self.name.clone())
    }

    fn subscribe(&mut self, _device: DeviceRef, sink: EventSink) -> SdkResult<()> {
        self.sink = Some(sink);
        Ok(())
    }

    fn property(&mut self, _device: DeviceRef, id: PropertyId) -> SdkResult<PropertyValue> {
        self.require_session()?;
        self.properties
            .get(&id)
            .cloned()
            .ok_or(StatusCode::NOT_SUPPORTED)
    }

    fn set_property(
        &mut self,
        _device: DeviceRef,
        id: PropertyId,
        value: PropertyValue,
    ) -> SdkResult<()> {
        self.require_session()?;
        if let Some(&code) = self.write_failures.get(&id) {
            return Err(code);
        }
        self.writes.push((id, value.clone()));
        self.properties.insert(id, value);
        if id == PropertyId::EVF_OUTPUT_DEVICE && !self.manual_ack {
            self.acknowledge_output();
        }
        Ok(())
    }

    fn set_capacity(&mut self, _device: DeviceRef, capacity: Capacity) -> SdkResult<()> {
        self.require_session()?;
        self.capacity = Some(capacity);
        Ok(())
    }

    fn send_command(&mut self, _device: DeviceRef, command: Command, param: i32) -> SdkResult<()> {
        self.require_session()?;
        if let Some(code) = self.command_failure.take() {
            return Err(code);
        }
        self.commands.push((command, param));
        if command == Command::TAKE_PICTURE {
            self.shots += 1;
            let object = self.add_object(&format!("IMG_{:04}.JPG", self.shots));
            self.emit_object_ready(object);
        }
        Ok(())
    }

    fn item_info(&mut self, object: ObjectRef) -> SdkResult<DirectoryItemInfo> {
        let file_name = self
            .objects
            .get(&object.0)
            .cloned()
            .ok_or(StatusCode::INVALID_HANDLE)?;
        Ok(DirectoryItemInfo {
            size: self.picture_data.len() as u64,
            is_folder: false,
            file_name,
        })
    }

    fn download(&mut self, object: ObjectRef, size: u64, dest: &Path) -> SdkResult<()> {
        if let Some(code) = self.download_failure {
            return Err(code);
        }
        if !self.objects.contains_key(&object.0) {
            return Err(StatusCode::INVALID_HANDLE);
        }
        let len = usize::try_from(size).map_or(self.picture_data.len(), |n| n.min(self.picture_data.len()));
        let data = self.picture_data.get(..len).unwrap_or_default();
        fs::write(dest, data).map_err(|_| StatusCode::STREAM_IO_ERROR)
    }

    fn download_complete(&mut self, object: ObjectRef) -> SdkResult<()> {
        self.completed.push(object);
        Ok(())
    }

    fn release_object(&mut self, object: ObjectRef) {
        self.objects.remove(&object.0);
        self.released_objects.push(object);
    }

    fn download_evf_image(&mut self, _device: DeviceRef, buffer: &mut [u8]) -> SdkResult<usize> {
        self.require_session()?;
        let len = self.live_view_image.len().min(buffer.len());
        let (frame, source) = (buffer.get_mut(..len), self.live_view_image.get(..len));
        match (frame, source) {
            (Some(frame), Some(source)) => frame.copy_from_slice(source),
            _ => return Err(StatusCode::INTERNAL_ERROR),
        }
        self.evf_downloads += 1;
        Ok(len)
    }

    fn pump_events(&mut self) -> SdkResult<()> {
        let Some(sink) = &self.sink else {
            self.events.clear();
            return Ok(());
        };
        while let Some(event) = self.events.pop_front() {
            sink.notify(event);
        }
        Ok(())
    }
}

/// A JPEG-shaped byte pattern: start marker, filler, end marker.
fn fake_jpeg(fill: u8, len: usize) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8];
    data.resize(len.max(4) - 2, fill);
    data.extend_from_slice(&[0xFF, 0xD9]);
    data
}
