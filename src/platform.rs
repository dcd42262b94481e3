//! Seams to the platform camera stack
//!
//! The session controller never talks to hardware directly. Requests go out
//! through [`CameraBackend`]; their asynchronous outcomes come back as
//! [`PlatformEvent`]s that the owner of the session feeds into
//! `CameraSession::handle_event`.

use crate::errors::{AccessReason, DeviceErrorCode};
use crate::permissions::PermissionStatus;
use crate::preview::SurfaceEvent;
use crate::shots::FrameSink;
use crate::types::{CameraIdentity, CapturedImage, ImageFormat, RequestId, Size, SurfaceId};
use tokio::sync::mpsc;

/// Asynchronous notifications from the device, session and surface layers
#[derive(Debug)]
pub enum PlatformEvent {
    DeviceOpened,
    DeviceDisconnected,
    DeviceError(DeviceErrorCode),
    DeviceClosed,
    SessionConfigured,
    SessionConfigureFailed,
    SessionClosed,
    CaptureCompleted {
        request: RequestId,
        sensor_timestamp_ns: Option<i64>,
    },
    CaptureFailed {
        request: RequestId,
        reason: String,
    },
    /// A still frame, for backends that deliver frames through the event
    /// stream instead of a [`FrameSink`]
    ImageAvailable(CapturedImage),
    Surface(SurfaceEvent),
}

pub type EventSender = mpsc::UnboundedSender<PlatformEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<PlatformEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Requests a session makes of one physical camera.
///
/// Every method returns once the request is submitted. A synchronous
/// rejection is an `Err`; later outcomes arrive as [`PlatformEvent`]s.
pub trait CameraBackend: Send {
    /// Camera permission, consulted before every device open
    fn permission(&self) -> PermissionStatus;

    /// Current display rotation in degrees
    fn display_rotation(&self) -> u32;

    fn open_device(&mut self, camera_id: &str) -> Result<(), AccessReason>;

    /// Create a buffer target receiving still frames; frames go to `sink`
    fn create_image_target(
        &mut self,
        size: Size,
        format: ImageFormat,
        max_images: u32,
        sink: FrameSink,
    ) -> Result<SurfaceId, AccessReason>;

    fn create_session(&mut self, outputs: &[SurfaceId]) -> Result<(), AccessReason>;

    fn set_repeating_request(&mut self, target: SurfaceId) -> Result<(), AccessReason>;

    fn capture(&mut self, target: SurfaceId) -> Result<RequestId, AccessReason>;

    fn close_device(&mut self);
}

/// Camera enumeration
pub trait CameraProvider: Send + Sync {
    fn camera_ids(&self) -> Result<Vec<String>, AccessReason>;

    fn characteristics(&self, camera_id: &str) -> Result<CameraIdentity, AccessReason>;
}
