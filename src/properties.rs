//! Camera properties: deferred writes for live-view settings and typed
//! values for the shooting settings.
//!
//! Zoom ratio, zoom position and white balance are only written between
//! live-view frames. Setters record the value and mark it dirty; the next
//! [`PropertySync::sync`] pass writes dirty values and refreshes the rest
//! from the device.

use std::fmt::Debug;

use tracing::trace;

use crate::diagnostics::Diagnostics;
use crate::session::Session;
use crate::traits::{CameraSdk, Point, PropertyId, PropertyValue};

/// A locally cached property value with an undelivered-write flag.
///
/// Later writes overwrite earlier undelivered ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pending<T> {
    value: T,
    dirty: bool,
}

impl<T: Clone> Pending<T> {
    /// Clean cache holding `value`.
    pub const fn new(value: T) -> Self {
        Self {
            value,
            dirty: false,
        }
    }

    /// Record a value to write on the next sync.
    pub fn set(&mut self, value: T) {
        self.value = value;
        self.dirty = true;
    }

    /// Latest known or requested value.
    pub const fn get(&self) -> &T {
        &self.value
    }

    /// Whether a write is outstanding.
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Value to write, if a write is outstanding.
    pub fn pending_write(&self) -> Option<T> {
        self.dirty.then(|| self.value.clone())
    }

    /// The outstanding write reached the device.
    pub fn mark_written(&mut self) {
        self.dirty = false;
    }

    /// Replace the cache with the device's value unless a write is
    /// outstanding.
    pub fn observe(&mut self, value: T) {
        if !self.dirty {
            self.value = value;
        }
    }
}

/// Conversion between a cached property and its wire value.
pub trait SyncedValue: Clone + PartialEq + Debug {
    /// Wire representation.
    fn to_value(&self) -> PropertyValue;

    /// Parse a wire value, `None` if it has the wrong shape.
    fn from_value(value: &PropertyValue) -> Option<Self>;
}

impl SyncedValue for u32 {
    fn to_value(&self) -> PropertyValue {
        PropertyValue::UInt(*self)
    }

    fn from_value(value: &PropertyValue) -> Option<Self> {
        value.as_u32()
    }
}

impl SyncedValue for Point {
    fn to_value(&self) -> PropertyValue {
        PropertyValue::Point(*self)
    }

    fn from_value(value: &PropertyValue) -> Option<Self> {
        value.as_point()
    }
}

impl SyncedValue for WhiteBalance {
    fn to_value(&self) -> PropertyValue {
        PropertyValue::Int(self.0)
    }

    fn from_value(value: &PropertyValue) -> Option<Self> {
        value.as_i32().map(Self)
    }
}

/// Deferred-write state of the live-view properties.
#[derive(Debug, Clone)]
pub struct PropertySync {
    /// Live-view zoom multiplier.
    pub zoom_ratio: Pending<u32>,
    /// Top-left corner of the zoom box.
    pub zoom_position: Pending<Point>,
    /// White balance mode.
    pub white_balance: Pending<WhiteBalance>,
}

impl Default for PropertySync {
    fn default() -> Self {
        Self {
            zoom_ratio: Pending::new(1),
            zoom_position: Pending::new(Point::default()),
            white_balance: Pending::new(WhiteBalance::AUTO),
        }
    }
}

impl PropertySync {
    /// Write every dirty value, refresh every clean one.
    ///
    /// A failed write stays dirty and is retried on the next pass.
    pub fn sync<S: CameraSdk>(&mut self, session: &mut Session<S>, diagnostics: &Diagnostics) {
        sync_one(&mut self.zoom_ratio, PropertyId::EVF_ZOOM, "zoom ratio", session, diagnostics);
        sync_one(
            &mut self.zoom_position,
            PropertyId::EVF_ZOOM_POSITION,
            "zoom position",
            session,
            diagnostics,
        );
        sync_one(
            &mut self.white_balance,
            PropertyId::WHITE_BALANCE,
            "white balance",
            session,
            diagnostics,
        );
    }

    /// Refresh clean values from the device without writing anything.
    pub fn refresh<S: CameraSdk>(&mut self, session: &mut Session<S>, diagnostics: &Diagnostics) {
        refresh_one(&mut self.zoom_ratio, PropertyId::EVF_ZOOM, "zoom ratio", session, diagnostics);
        refresh_one(
            &mut self.zoom_position,
            PropertyId::EVF_ZOOM_POSITION,
            "zoom position",
            session,
            diagnostics,
        );
        refresh_one(
            &mut self.white_balance,
            PropertyId::WHITE_BALANCE,
            "white balance",
            session,
            diagnostics,
        );
    }
}

fn sync_one<S: CameraSdk, T: SyncedValue>(
    pending: &mut Pending<T>,
    id: PropertyId,
    label: &str,
    session: &mut Session<S>,
    diagnostics: &Diagnostics,
) {
    let Some(value) = pending.pending_write() else {
        refresh_one(pending, id, label, session, diagnostics);
        return;
    };

    match session.set_property(id, value.to_value()) {
        Ok(()) => {
            diagnostics.debug(format!("{label} set to {value:?}"));
            pending.mark_written();
        }
        Err(err) => diagnostics.warning(format!("unable to set {label}, will retry: {err}")),
    }
}

fn refresh_one<S: CameraSdk, T: SyncedValue>(
    pending: &mut Pending<T>,
    id: PropertyId,
    label: &str,
    session: &mut Session<S>,
    diagnostics: &Diagnostics,
) {
    if pending.is_dirty() {
        return;
    }
    match session.property(id) {
        Ok(raw) => match T::from_value(&raw) {
            Some(value) => {
                trace!(label, ?value, "property refreshed");
                pending.observe(value);
            }
            None => diagnostics.warning(format!("unexpected {label} value from camera: {raw:?}")),
        },
        Err(err) => diagnostics.debug(format!("unable to read {label}: {err}")),
    }
}

/// White balance mode code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WhiteBalance(pub i32);

impl WhiteBalance {
    /// Set by clicking a white point in live view.
    pub const CLICK: Self = Self(-1);
    /// Automatic.
    pub const AUTO: Self = Self(0);
    /// Daylight.
    pub const DAYLIGHT: Self = Self(1);
    /// Cloudy.
    pub const CLOUDY: Self = Self(2);
    /// Tungsten light.
    pub const TUNGSTEN: Self = Self(3);
    /// Fluorescent light.
    pub const FLUORESCENT: Self = Self(4);
    /// Flash.
    pub const STROBE: Self = Self(5);
    /// Custom, from a white reference shot.
    pub const WHITE_PAPER: Self = Self(6);
    /// Shade.
    pub const SHADE: Self = Self(8);
    /// Explicit color temperature.
    pub const COLOR_TEMP: Self = Self(9);
}

/// Metering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MeteringMode {
    /// Spot metering.
    Spot = 1,
    /// Evaluative metering.
    Evaluative = 3,
    /// Partial metering.
    Partial = 4,
    /// Center-weighted average metering.
    CenterWeighted = 5,
}

impl TryFrom<u32> for MeteringMode {
    type Error = u32;

    fn try_from(code: u32) -> Result<Self, u32> {
        match code {
            1 => Ok(Self::Spot),
            3 => Ok(Self::Evaluative),
            4 => Ok(Self::Partial),
            5 => Ok(Self::CenterWeighted),
            other => Err(other),
        }
    }
}

/// Drive mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum DriveMode {
    /// One frame per shutter press.
    SingleFrame = 0x00,
    /// Continuous shooting.
    Continuous = 0x01,
    /// Movie recording.
    Video = 0x02,
    /// High-speed continuous shooting.
    HighSpeedContinuous = 0x04,
    /// Low-speed continuous shooting.
    LowSpeedContinuous = 0x05,
    /// Silent single shot.
    SilentSingle = 0x06,
    /// 10 second self-timer followed by continuous shots.
    SelfTimer10sContinuous = 0x07,
    /// 10 second self-timer.
    SelfTimer10s = 0x10,
    /// 2 second self-timer.
    SelfTimer2s = 0x11,
}

impl TryFrom<u32> for DriveMode {
    type Error = u32;

    fn try_from(code: u32) -> Result<Self, u32> {
        match code {
            0x00 => Ok(Self::SingleFrame),
            0x01 => Ok(Self::Continuous),
            0x02 => Ok(Self::Video),
            0x04 => Ok(Self::HighSpeedContinuous),
            0x05 => Ok(Self::LowSpeedContinuous),
            0x06 => Ok(Self::SilentSingle),
            0x07 => Ok(Self::SelfTimer10sContinuous),
            0x10 => Ok(Self::SelfTimer10s),
            0x11 => Ok(Self::SelfTimer2s),
            other => Err(other),
        }
    }
}

/// Autofocus mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum AfMode {
    /// Focus once and lock.
    OneShot = 0,
    /// Track a moving subject.
    AiServo = 1,
    /// Switch between one-shot and servo automatically.
    AiFocus = 2,
    /// Manual focus (lens switch set to MF).
    Manual = 3,
}

impl TryFrom<u32> for AfMode {
    type Error = u32;

    fn try_from(code: u32) -> Result<Self, u32> {
        match code {
            0 => Ok(Self::OneShot),
            1 => Ok(Self::AiServo),
            2 => Ok(Self::AiFocus),
            3 => Ok(Self::Manual),
            other => Err(other),
        }
    }
}

/// Exposure compensation code conversions.
///
/// The camera encodes compensation as a signed byte in eighths of a stop,
/// with the third-stop and half-stop fractions mapped onto 3, 4 and 5.
pub mod exposure {
    // Eighths used for 0, 1/3, 1/2, 2/3 and a full stop.
    const FRACTION_CODES: [(f32, i32); 5] = [
        (0.0, 0),
        (1.0 / 3.0, 3),
        (0.5, 4),
        (2.0 / 3.0, 5),
        (1.0, 8),
    ];

    /// Stops for a device code; the code is read as a signed byte.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_possible_wrap,
        clippy::cast_precision_loss
    )]
    pub fn code_to_stops(code: u32) -> f32 {
        let signed = i32::from(code as u8 as i8);
        let whole = signed / 8;
        let fraction = match (signed % 8).abs() {
            3 => 1.0 / 3.0,
            4 => 0.5,
            5 => 2.0 / 3.0,
            _ => 0.0,
        };
        let magnitude = whole.abs() as f32 + fraction;
        if signed < 0 {
            -magnitude
        } else {
            magnitude
        }
    }

    /// Nearest device code for `stops`, `None` if out of the encodable
    /// range.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn stops_to_code(stops: f32) -> Option<u32> {
        if !stops.is_finite() {
            return None;
        }
        let magnitude = stops.abs();
        let whole = magnitude.trunc();
        let remainder = magnitude - whole;
        let eighths = FRACTION_CODES
            .iter()
            .min_by(|a, b| (a.0 - remainder).abs().total_cmp(&(b.0 - remainder).abs()))
            .map_or(0, |&(_, code)| code);

        let whole = i32::try_from(whole as i64).ok()?;
        let code = whole.checked_mul(8)?.checked_add(eighths)?;
        let code = if stops < 0.0 { -code } else { code };
        let byte = i8::try_from(code).ok()?;
        Some(u32::from(byte as u8))
    }
}
