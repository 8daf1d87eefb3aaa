//! Per-model live-view calibration data.
//!
//! Used only to answer layout queries (image size, zoom range, zoom box).
//! The table is built once per process and never mutated.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::traits::{Point, Size};

/// Model name of the Canon EOS 5D Mark II.
pub const EOS_5D_MARK_II: &str = "Canon EOS 5D Mark II";
/// Model name of the Canon EOS 40D.
pub const EOS_40D: &str = "Canon EOS 40D";
/// Model name of the Canon EOS 7D.
pub const EOS_7D: &str = "Canon EOS 7D";

/// Model answered for bodies missing from the table.
pub const FALLBACK_MODEL: &str = EOS_40D;

/// Zoom ratio at and above which the magnified geometry applies.
pub const MAGNIFIED_ZOOM_RATIO: u32 = 5;

/// Live-view geometry of one camera model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CameraModelProfile {
    /// Largest zoom position at 1x.
    pub zoom100_max_position: Point,
    /// Largest zoom position at 5x.
    pub zoom500_max_position: Point,
    /// Live-view image size at 1x.
    pub zoom100_image_size: Size,
    /// Live-view image size at 5x.
    pub zoom500_image_size: Size,
    /// On-screen footprint of the zoom box.
    pub zoom_box_size: Size,
}

impl CameraModelProfile {
    /// Profile for `model`, or the fallback profile if it is unknown.
    #[must_use]
    pub fn lookup(model: &str) -> &'static Self {
        let table = table();
        table
            .get(model)
            .or_else(|| table.get(FALLBACK_MODEL))
            .unwrap_or(&FALLBACK_PROFILE)
    }

    /// Whether `model` has its own entry.
    #[must_use]
    pub fn is_known(model: &str) -> bool {
        table().contains_key(model)
    }

    /// Live-view image size for a zoom ratio.
    #[must_use]
    pub const fn image_size(&self, zoom_ratio: u32) -> Size {
        if zoom_ratio >= MAGNIFIED_ZOOM_RATIO {
            self.zoom500_image_size
        } else {
            self.zoom100_image_size
        }
    }

    /// Largest settable zoom position for a zoom ratio.
    #[must_use]
    pub const fn max_zoom_position(&self, zoom_ratio: u32) -> Point {
        if zoom_ratio >= MAGNIFIED_ZOOM_RATIO {
            self.zoom500_max_position
        } else {
            self.zoom100_max_position
        }
    }
}

const FALLBACK_PROFILE: CameraModelProfile = CameraModelProfile {
    zoom100_max_position: Point::new(3104, 2016),
    zoom500_max_position: Point::new(3104, 2080),
    zoom100_image_size: Size::new(1024, 680),
    zoom500_image_size: Size::new(768, 800),
    zoom_box_size: Size::new(204, 208),
};

fn table() -> &'static HashMap<&'static str, CameraModelProfile> {
    static TABLE: OnceLock<HashMap<&'static str, CameraModelProfile>> = OnceLock::new();
    TABLE.get_or_init(|| {
        HashMap::from([
            (EOS_40D, FALLBACK_PROFILE),
            (
                EOS_5D_MARK_II,
                CameraModelProfile {
                    zoom100_max_position: Point::new(4464, 2976),
                    zoom500_max_position: Point::new(4464, 2976),
                    zoom100_image_size: Size::new(1024, 680),
                    zoom500_image_size: Size::new(1120, 752),
                    zoom_box_size: Size::new(202, 135),
                },
            ),
            (
                EOS_7D,
                CameraModelProfile {
                    zoom100_max_position: Point::new(4136, 2754),
                    zoom500_max_position: Point::new(4136, 2754),
                    zoom100_image_size: Size::new(1056, 704),
                    zoom500_image_size: Size::new(1024, 680),
                    zoom_box_size: Size::new(212, 144),
                },
            ),
        ])
    })
}
