//! Output size negotiation
//!
//! Picks the smallest device-supported size that still covers a requested
//! minimum. Sizes are compared in display orientation: when the sensor is
//! mounted a quarter turn away from the display, every candidate is swapped
//! before filtering.

use crate::types::{CameraIdentity, ImageFormat, Size};

/// Whether sensor and display orientation differ by a quarter turn
pub fn is_rotated(sensor_orientation: u32, display_rotation: u32) -> bool {
    let sensor = (sensor_orientation % 360) as i64;
    let display = (display_rotation % 360) as i64;
    let delta = (sensor - display).unsigned_abs();
    delta == 90 || delta == 270
}

/// Candidate sizes in display orientation
pub fn orient_sizes(sizes: &[Size], rotated: bool) -> Vec<Size> {
    if rotated {
        sizes.iter().map(|s| s.swapped()).collect()
    } else {
        sizes.to_vec()
    }
}

/// Smallest-area candidate covering `requested`.
///
/// Ties keep the first candidate in input order. Returns `None` when nothing
/// is large enough.
pub fn negotiate(requested: Size, candidates: &[Size]) -> Option<Size> {
    let mut best: Option<Size> = None;
    for candidate in candidates.iter().filter(|c| c.covers(requested)) {
        match best {
            Some(current) if current.area() <= candidate.area() => {}
            _ => best = Some(*candidate),
        }
    }
    best
}

/// A negotiated size together with the rotation it was negotiated under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Negotiated {
    /// Size in display orientation
    pub size: Size,
    pub rotated: bool,
}

impl Negotiated {
    /// Buffer size the render surface must be fixed to
    pub fn buffer_size(&self) -> Size {
        if self.rotated {
            self.size.swapped()
        } else {
            self.size
        }
    }
}

/// Negotiate against the sizes `identity` reports for `format`.
///
/// A miss is logged and returned as `None`; callers continue without
/// resizing.
pub fn negotiate_for(
    identity: &CameraIdentity,
    format: ImageFormat,
    requested: Size,
    display_rotation: u32,
) -> Option<Negotiated> {
    let rotated = is_rotated(identity.sensor_orientation, display_rotation);
    let candidates = orient_sizes(identity.output_sizes(format), rotated);

    match negotiate(requested, &candidates) {
        Some(size) => {
            log::debug!(
                "Negotiated {} size {} for camera {} (requested {}, rotated={})",
                format.as_str(),
                size,
                identity.id,
                requested,
                rotated
            );
            Some(Negotiated { size, rotated })
        }
        None => {
            log::warn!(
                "Unsupported preview size {} for camera {}, keeping surface size",
                requested,
                identity.id
            );
            None
        }
    }
}
