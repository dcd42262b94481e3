use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Width/height pair in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Same size with width and height exchanged
    pub const fn swapped(self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// True when both dimensions are at least those of `min`
    pub fn covers(&self, min: Size) -> bool {
        self.width >= min.width && self.height >= min.height
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl From<(u32, u32)> for Size {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

impl From<[u32; 2]> for Size {
    fn from([width, height]: [u32; 2]) -> Self {
        Self { width, height }
    }
}

/// Direction a camera lens faces relative to the screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    Front,
    Back,
    External,
}

impl Facing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Facing::Front => "front",
            Facing::Back => "back",
            Facing::External => "external",
        }
    }
}

/// Output stream formats a device can be asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageFormat {
    #[serde(rename = "jpeg")]
    Jpeg,
    #[serde(rename = "yuv_420_888")]
    Yuv420_888,
    #[serde(rename = "raw_sensor")]
    RawSensor,
    /// Opaque format used by on-screen render surfaces
    #[serde(rename = "private")]
    Private,
}

impl ImageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Yuv420_888 => "yuv_420_888",
            ImageFormat::RawSensor => "raw_sensor",
            ImageFormat::Private => "private",
        }
    }
}

/// Opaque handle to a render or buffer target owned by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SurfaceId(pub u64);

/// Identity the platform assigns to a submitted capture request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u64);

/// A physical camera and its cached characteristics.
///
/// Resolved once from the platform and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraIdentity {
    pub id: String,
    pub facing: Facing,
    /// Mounting angle of the sensor in degrees (0, 90, 180 or 270)
    pub sensor_orientation: u32,
    /// Supported output sizes per format, in device-reported order
    pub stream_configurations: HashMap<ImageFormat, Vec<Size>>,
}

impl CameraIdentity {
    pub fn new(id: impl Into<String>, facing: Facing, sensor_orientation: u32) -> Self {
        Self {
            id: id.into(),
            facing,
            sensor_orientation,
            stream_configurations: HashMap::new(),
        }
    }

    pub fn with_sizes(mut self, format: ImageFormat, sizes: Vec<Size>) -> Self {
        self.stream_configurations.insert(format, sizes);
        self
    }

    /// Device-reported sizes for `format`, empty when the format is not offered
    pub fn output_sizes(&self, format: ImageFormat) -> &[Size] {
        self.stream_configurations
            .get(&format)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// One plane of a captured image together with its stride metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePlane {
    pub row_stride: u32,
    pub pixel_stride: u32,
    pub data: Bytes,
}

/// A still frame handed to a shot callback
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedImage {
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,
    /// Sensor timestamp in nanoseconds
    pub timestamp_ns: i64,
    pub planes: Vec<ImagePlane>,
    pub received_at: DateTime<Utc>,
}

impl CapturedImage {
    pub fn new(size: Size, format: ImageFormat, timestamp_ns: i64, planes: Vec<ImagePlane>) -> Self {
        Self {
            width: size.width,
            height: size.height,
            format,
            timestamp_ns,
            planes,
            received_at: Utc::now(),
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn byte_len(&self) -> usize {
        self.planes.iter().map(|p| p.data.len()).sum()
    }

    /// Plane buffers concatenated in plane order, the layout hosts persist
    pub fn concat_planes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.byte_len());
        for plane in &self.planes {
            out.extend_from_slice(&plane.data);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_helpers() {
        let size = Size::new(1920, 1080);
        assert_eq!(size.swapped(), Size::new(1080, 1920));
        assert_eq!(size.area(), 2_073_600);
        assert!(size.covers(Size::new(1920, 720)));
        assert!(!size.covers(Size::new(1921, 720)));
        assert_eq!(size.to_string(), "1920x1080");
    }

    #[test]
    fn test_output_sizes_missing_format() {
        let identity = CameraIdentity::new("0", Facing::Back, 90)
            .with_sizes(ImageFormat::Jpeg, vec![Size::new(640, 480)]);
        assert_eq!(identity.output_sizes(ImageFormat::Jpeg).len(), 1);
        assert!(identity.output_sizes(ImageFormat::RawSensor).is_empty());
    }

    #[test]
    fn test_concat_planes_keeps_order() {
        let planes = vec![
            ImagePlane {
                row_stride: 2,
                pixel_stride: 1,
                data: Bytes::from_static(&[1, 2]),
            },
            ImagePlane {
                row_stride: 1,
                pixel_stride: 2,
                data: Bytes::from_static(&[3]),
            },
        ];
        let image = CapturedImage::new(Size::new(2, 1), ImageFormat::Yuv420_888, 7, planes);
        assert_eq!(image.concat_planes(), vec![1, 2, 3]);
        assert_eq!(image.byte_len(), 3);
    }

    #[test]
    fn test_format_serde_names() {
        let json = serde_json::to_string(&ImageFormat::Yuv420_888).unwrap();
        assert_eq!(json, "\"yuv_420_888\"");
        let facing: Facing = serde_json::from_str("\"front\"").unwrap();
        assert_eq!(facing, Facing::Front);
    }
}
