//! Simulated camera platform
//!
//! `SimulatedBackend` records every request. In manual mode tests inject the
//! platform's answers through `CameraSession::handle_event`; in auto mode the
//! backend answers itself over an event channel the way a healthy device
//! would, unless told to fail.

use crate::commands::{CameraHost, StartCameraOptions};
use crate::errors::{AccessReason, CameraError, DeviceErrorCode, ErrorKind};
use crate::permissions::PermissionStatus;
use crate::platform::{CameraBackend, CameraProvider, EventSender, PlatformEvent};
use crate::preview::{FixedPreview, LayoutHandle, PreviewSurface, SurfaceEvent};
use crate::session::SessionObserver;
use crate::shots::FrameSink;
use crate::types::{
    CameraIdentity, CapturedImage, Facing, ImageFormat, ImagePlane, RequestId, Size, SurfaceId,
};
use bytes::Bytes;
use std::sync::{Arc, Mutex, MutexGuard};

/// A request the session made of the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    OpenDevice(String),
    CreateImageTarget {
        size: Size,
        format: ImageFormat,
        max_images: u32,
    },
    CreateSession(Vec<SurfaceId>),
    SetRepeatingRequest(SurfaceId),
    Capture(SurfaceId),
    CloseDevice,
}

struct ControlsInner {
    calls: Vec<BackendCall>,
    permission: PermissionStatus,
    display_rotation: u32,
    open_failure: Option<AccessReason>,
    device_error: Option<DeviceErrorCode>,
    session_failure: Option<AccessReason>,
    reject_session: bool,
    repeating_failure: Option<AccessReason>,
    capture_failure: Option<AccessReason>,
    capture_failed_async: Option<String>,
    next_request: u64,
    next_surface: u64,
    picture: Option<(Size, ImageFormat)>,
    sink: Option<FrameSink>,
}

impl Default for ControlsInner {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            permission: PermissionStatus::Granted,
            display_rotation: 0,
            open_failure: None,
            device_error: None,
            session_failure: None,
            reject_session: false,
            repeating_failure: None,
            capture_failure: None,
            capture_failed_async: None,
            next_request: 1,
            next_surface: 1000,
            picture: None,
            sink: None,
        }
    }
}

/// Test-side handle on a [`SimulatedBackend`]
#[derive(Clone, Default)]
pub struct SimulatedControls {
    inner: Arc<Mutex<ControlsInner>>,
}

impl SimulatedControls {
    fn lock(&self) -> MutexGuard<'_, ControlsInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.clone()
    }

    pub fn count(&self, predicate: impl Fn(&BackendCall) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| predicate(c)).count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn set_permission(&self, status: PermissionStatus) {
        self.lock().permission = status;
    }

    pub fn set_display_rotation(&self, degrees: u32) {
        self.lock().display_rotation = degrees;
    }

    /// Reject the next device opens synchronously
    pub fn fail_open(&self, reason: AccessReason) {
        self.lock().open_failure = Some(reason);
    }

    /// Answer device opens with an asynchronous device error (auto mode)
    pub fn device_error(&self, code: DeviceErrorCode) {
        self.lock().device_error = Some(code);
    }

    pub fn fail_session(&self, reason: AccessReason) {
        self.lock().session_failure = Some(reason);
    }

    /// Answer session creation with a configuration failure (auto mode)
    pub fn reject_session(&self) {
        self.lock().reject_session = true;
    }

    pub fn fail_repeating(&self, reason: AccessReason) {
        self.lock().repeating_failure = Some(reason);
    }

    pub fn fail_capture(&self, reason: AccessReason) {
        self.lock().capture_failure = Some(reason);
    }

    /// Answer captures with an asynchronous capture failure (auto mode)
    pub fn fail_capture_async(&self, reason: impl Into<String>) {
        self.lock().capture_failed_async = Some(reason.into());
    }

    /// Frame sink handed to the still-capture target, if one was created
    pub fn frame_sink(&self) -> Option<FrameSink> {
        self.lock().sink.clone()
    }
}

/// Scripted [`CameraBackend`]
pub struct SimulatedBackend {
    controls: SimulatedControls,
    events: Option<EventSender>,
}

impl SimulatedBackend {
    /// Backend that only records; the test injects every platform event
    pub fn new() -> (Self, SimulatedControls) {
        let controls = SimulatedControls::default();
        (
            Self {
                controls: controls.clone(),
                events: None,
            },
            controls,
        )
    }

    /// Backend that answers its own requests over `events`
    pub fn auto(events: EventSender) -> (Self, SimulatedControls) {
        let controls = SimulatedControls::default();
        (
            Self {
                controls: controls.clone(),
                events: Some(events),
            },
            controls,
        )
    }

    fn emit(&self, event: PlatformEvent) {
        if let Some(events) = &self.events {
            if events.send(event).is_err() {
                log::debug!("Simulated event dropped, receiver gone");
            }
        }
    }
}

impl CameraBackend for SimulatedBackend {
    fn permission(&self) -> PermissionStatus {
        self.controls.lock().permission
    }

    fn display_rotation(&self) -> u32 {
        self.controls.lock().display_rotation
    }

    fn open_device(&mut self, camera_id: &str) -> Result<(), AccessReason> {
        let device_error = {
            let mut inner = self.controls.lock();
            inner.calls.push(BackendCall::OpenDevice(camera_id.to_string()));
            if let Some(reason) = inner.open_failure {
                return Err(reason);
            }
            inner.device_error
        };
        match device_error {
            Some(code) => self.emit(PlatformEvent::DeviceError(code)),
            None => self.emit(PlatformEvent::DeviceOpened),
        }
        Ok(())
    }

    fn create_image_target(
        &mut self,
        size: Size,
        format: ImageFormat,
        max_images: u32,
        sink: FrameSink,
    ) -> Result<SurfaceId, AccessReason> {
        let mut inner = self.controls.lock();
        inner.calls.push(BackendCall::CreateImageTarget {
            size,
            format,
            max_images,
        });
        let surface = SurfaceId(inner.next_surface);
        inner.next_surface += 1;
        inner.picture = Some((size, format));
        inner.sink = Some(sink);
        Ok(surface)
    }

    fn create_session(&mut self, outputs: &[SurfaceId]) -> Result<(), AccessReason> {
        let reject = {
            let mut inner = self.controls.lock();
            inner.calls.push(BackendCall::CreateSession(outputs.to_vec()));
            if let Some(reason) = inner.session_failure {
                return Err(reason);
            }
            inner.reject_session
        };
        if reject {
            self.emit(PlatformEvent::SessionConfigureFailed);
        } else {
            self.emit(PlatformEvent::SessionConfigured);
        }
        Ok(())
    }

    fn set_repeating_request(&mut self, target: SurfaceId) -> Result<(), AccessReason> {
        let mut inner = self.controls.lock();
        inner.calls.push(BackendCall::SetRepeatingRequest(target));
        match inner.repeating_failure {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }

    fn capture(&mut self, target: SurfaceId) -> Result<RequestId, AccessReason> {
        let (request, failure, picture) = {
            let mut inner = self.controls.lock();
            inner.calls.push(BackendCall::Capture(target));
            if let Some(reason) = inner.capture_failure {
                return Err(reason);
            }
            let request = RequestId(inner.next_request);
            inner.next_request += 1;
            (request, inner.capture_failed_async.clone(), inner.picture)
        };

        match failure {
            Some(reason) => self.emit(PlatformEvent::CaptureFailed { request, reason }),
            None => {
                let timestamp = request.0 as i64 * 33_333_333;
                self.emit(PlatformEvent::CaptureCompleted {
                    request,
                    sensor_timestamp_ns: Some(timestamp),
                });
                let (size, format) = picture.unwrap_or((Size::new(64, 48), ImageFormat::Jpeg));
                self.emit(PlatformEvent::ImageAvailable(synthetic_image(
                    size, format, timestamp,
                )));
            }
        }
        Ok(request)
    }

    fn close_device(&mut self) {
        self.controls.lock().calls.push(BackendCall::CloseDevice);
        self.emit(PlatformEvent::SessionClosed);
        self.emit(PlatformEvent::DeviceClosed);
    }
}

/// Build a still frame with a deterministic gradient
pub fn synthetic_image(size: Size, format: ImageFormat, timestamp_ns: i64) -> CapturedImage {
    let base = (timestamp_ns % 256) as u8;
    let luma: Vec<u8> = (0..size.area())
        .map(|i| base.wrapping_add((i % 256) as u8))
        .collect();

    let planes = match format {
        ImageFormat::Yuv420_888 => {
            let chroma_len = (size.area() / 4) as usize;
            vec![
                ImagePlane {
                    row_stride: size.width,
                    pixel_stride: 1,
                    data: Bytes::from(luma),
                },
                ImagePlane {
                    row_stride: size.width / 2,
                    pixel_stride: 1,
                    data: Bytes::from(vec![128u8; chroma_len]),
                },
                ImagePlane {
                    row_stride: size.width / 2,
                    pixel_stride: 1,
                    data: Bytes::from(vec![128u8; chroma_len]),
                },
            ]
        }
        _ => vec![ImagePlane {
            row_stride: 0,
            pixel_stride: 0,
            data: Bytes::from(luma),
        }],
    };

    CapturedImage::new(size, format, timestamp_ns, planes)
}

/// What a [`RecordingObserver`] saw
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservedEvent {
    Open,
    Error(ErrorKind, String),
    Close,
}

/// Session observer that records every callback
#[derive(Clone, Default)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<ObservedEvent>>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<ObservedEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn errors(&self) -> Vec<ErrorKind> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ObservedEvent::Error(kind, _) => Some(kind),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: ObservedEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}

impl SessionObserver for RecordingObserver {
    fn on_open(&mut self) {
        self.record(ObservedEvent::Open);
    }

    fn on_error(&mut self, error: CameraError) {
        self.record(ObservedEvent::Error(error.kind(), error.message()));
    }

    fn on_close(&mut self) {
        self.record(ObservedEvent::Close);
    }
}

/// Fixed list of cameras
pub struct SimulatedProvider {
    cameras: Vec<CameraIdentity>,
}

impl SimulatedProvider {
    pub fn new(cameras: Vec<CameraIdentity>) -> Self {
        Self { cameras }
    }

    /// A phone-like pair: back camera mounted at 90°, front at 270°
    pub fn typical() -> Self {
        let sizes = vec![
            Size::new(640, 480),
            Size::new(1280, 720),
            Size::new(1920, 1080),
        ];
        let back = CameraIdentity::new("0", Facing::Back, 90)
            .with_sizes(ImageFormat::Private, sizes.clone())
            .with_sizes(ImageFormat::Jpeg, sizes.clone())
            .with_sizes(ImageFormat::Yuv420_888, sizes.clone());
        let front = CameraIdentity::new("1", Facing::Front, 270)
            .with_sizes(ImageFormat::Private, sizes[..2].to_vec())
            .with_sizes(ImageFormat::Jpeg, sizes[..2].to_vec());
        Self::new(vec![back, front])
    }
}

impl CameraProvider for SimulatedProvider {
    fn camera_ids(&self) -> Result<Vec<String>, AccessReason> {
        Ok(self.cameras.iter().map(|c| c.id.clone()).collect())
    }

    fn characteristics(&self, camera_id: &str) -> Result<CameraIdentity, AccessReason> {
        self.cameras
            .iter()
            .find(|c| c.id == camera_id)
            .cloned()
            .ok_or(AccessReason::Disconnected)
    }
}

/// Preview whose buffer resizes are reported back as surface changes
pub struct SimulatedPreview {
    inner: FixedPreview,
    events: Option<EventSender>,
}

impl SimulatedPreview {
    pub fn new(surface: SurfaceId, size: Size) -> Self {
        Self {
            inner: FixedPreview::new(surface, size),
            events: None,
        }
    }

    /// Report creation now and a change after every resize over `events`
    pub fn attached(surface: SurfaceId, size: Size, events: EventSender) -> Self {
        if events
            .send(PlatformEvent::Surface(SurfaceEvent::Created))
            .is_err()
        {
            log::debug!("Simulated surface created with no listener");
        }
        Self {
            inner: FixedPreview::new(surface, size),
            events: Some(events),
        }
    }

    pub fn layout_handle(&self) -> LayoutHandle {
        self.inner.layout_handle()
    }
}

impl PreviewSurface for SimulatedPreview {
    fn surface(&self) -> SurfaceId {
        self.inner.surface()
    }

    fn size(&self) -> Size {
        self.inner.size()
    }

    fn set_camera_size(&mut self, size: Size, rotated: bool) {
        self.inner.set_camera_size(size, rotated);
        if let Some(events) = &self.events {
            let buffer = if rotated { size.swapped() } else { size };
            if events
                .send(PlatformEvent::Surface(SurfaceEvent::Changed(buffer)))
                .is_err()
            {
                log::debug!("Simulated surface change dropped");
            }
        }
    }
}

/// Host glue wiring simulated backends and previews into the command layer
pub struct SimulatedHost {
    provider: SimulatedProvider,
    display_rotation: u32,
    permission: PermissionStatus,
    backends: Mutex<Vec<SimulatedControls>>,
    next_surface: Mutex<u64>,
}

impl SimulatedHost {
    pub fn new(provider: SimulatedProvider) -> Self {
        Self {
            provider,
            display_rotation: 0,
            permission: PermissionStatus::Granted,
            backends: Mutex::new(Vec::new()),
            next_surface: Mutex::new(1),
        }
    }

    pub fn typical() -> Self {
        Self::new(SimulatedProvider::typical())
    }

    pub fn with_permission(mut self, status: PermissionStatus) -> Self {
        self.permission = status;
        self
    }

    pub fn with_display_rotation(mut self, degrees: u32) -> Self {
        self.display_rotation = degrees;
        self
    }

    /// Controls of the most recently connected backend
    pub fn last_backend(&self) -> Option<SimulatedControls> {
        self.backends
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }

    pub fn connections(&self) -> usize {
        self.backends
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

impl CameraHost for SimulatedHost {
    fn provider(&self) -> &dyn CameraProvider {
        &self.provider
    }

    fn permission(&self) -> PermissionStatus {
        self.permission
    }

    fn display_rotation(&self) -> u32 {
        self.display_rotation
    }

    fn connect(
        &self,
        identity: &CameraIdentity,
        events: EventSender,
    ) -> Result<Box<dyn CameraBackend>, CameraError> {
        log::debug!("Connecting simulated backend for camera {}", identity.id);
        let (backend, controls) = SimulatedBackend::auto(events);
        controls.set_permission(self.permission);
        controls.set_display_rotation(self.display_rotation);
        self.backends
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(controls);
        Ok(Box::new(backend))
    }

    fn create_preview(
        &self,
        options: &StartCameraOptions,
        events: EventSender,
    ) -> Option<Box<dyn PreviewSurface>> {
        let size = options.preview?;
        let mut next = self.next_surface.lock().unwrap_or_else(|e| e.into_inner());
        let surface = SurfaceId(*next);
        *next += 1;
        Some(Box::new(SimulatedPreview::attached(surface, size, events)))
    }
}
