//! Camera session lifecycle controller
//!
//! One [`CameraSession`] owns one physical camera through
//! open → configure → preview → capture → close. Requests go out through the
//! [`CameraBackend`]; every asynchronous outcome comes back through
//! [`CameraSession::handle_event`] and is checked against the transition
//! table in [`SessionState::can_transition_to`].
//!
//! The controller is single-owner: callers serialize access to it. The only
//! piece shared across callback threads is the pending-shot queue behind
//! [`CameraSession::frame_sink`].

use crate::errors::{CameraError, DeviceErrorCode};
use crate::negotiate::{is_rotated, negotiate_for, orient_sizes};
use crate::platform::{CameraBackend, PlatformEvent};
use crate::preview::{AttachedPreview, PreviewSurface, ReadinessNotice, SurfaceEvent};
use crate::shots::{FrameSink, PendingShot, ShotCallback, ShotQueue};
use crate::types::{CameraIdentity, ImageFormat, RequestId, Size, SurfaceId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lifecycle of one camera session. Still captures overlay `PreviewActive`
/// rather than having a state of their own; see [`CameraSession::is_capturing`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    AwaitingSurface,
    OpeningDevice,
    ConfiguringSession,
    PreviewActive,
    Closing,
    Closed,
}

impl SessionState {
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle | Closed, AwaitingSurface | OpeningDevice)
                | (AwaitingSurface, OpeningDevice | Idle)
                | (OpeningDevice, ConfiguringSession | Closing | Idle)
                | (ConfiguringSession, PreviewActive | Closing)
                | (PreviewActive, Closing)
                | (OpeningDevice | ConfiguringSession | PreviewActive | Closing, Closed)
        )
    }

    /// True from the moment `open` is accepted until the device reports closed
    pub fn is_open(self) -> bool {
        !matches!(self, SessionState::Idle | SessionState::Closed)
    }
}

/// Receives the outcome of [`CameraSession::open`]
pub trait SessionObserver: Send {
    fn on_open(&mut self);
    fn on_error(&mut self, error: CameraError);
    fn on_close(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PictureTarget {
    surface: SurfaceId,
    size: Size,
    format: ImageFormat,
}

/// Snapshot of a session for diagnostics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub camera_id: String,
    pub state: SessionState,
    pub preview_attached: bool,
    pub preview_ready: bool,
    pub picture_size: Option<Size>,
    pub in_flight_shots: usize,
    pub pending_shots: usize,
}

pub struct CameraSession {
    identity: CameraIdentity,
    backend: Box<dyn CameraBackend>,
    state: SessionState,
    observer: Option<Box<dyn SessionObserver>>,
    preview: Option<AttachedPreview>,
    picture: Option<PictureTarget>,
    awaiting_surface: bool,
    preview_requested: bool,
    device_open: bool,
    session_configured: bool,
    in_flight: HashMap<RequestId, ShotCallback>,
    shots: ShotQueue,
}

impl CameraSession {
    pub fn new(identity: CameraIdentity, backend: Box<dyn CameraBackend>) -> Self {
        Self {
            identity,
            backend,
            state: SessionState::Idle,
            observer: None,
            preview: None,
            picture: None,
            awaiting_surface: false,
            preview_requested: false,
            device_open: false,
            session_configured: false,
            in_flight: HashMap::new(),
            shots: ShotQueue::new(),
        }
    }

    pub fn identity(&self) -> &CameraIdentity {
        &self.identity
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether any still capture is submitted or waiting for its frame
    pub fn is_capturing(&self) -> bool {
        !self.in_flight.is_empty() || !self.shots.is_empty()
    }

    pub fn pending_shots(&self) -> usize {
        self.shots.len()
    }

    pub fn in_flight_shots(&self) -> usize {
        self.in_flight.len()
    }

    /// Handle for "frame available" notifications arriving on other threads
    pub fn frame_sink(&self) -> FrameSink {
        self.shots.frame_sink()
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            camera_id: self.identity.id.clone(),
            state: self.state,
            preview_attached: self.preview.is_some(),
            preview_ready: self.preview.as_ref().is_some_and(|p| p.is_ready()),
            picture_size: self.picture.map(|p| p.size),
            in_flight_shots: self.in_flight.len(),
            pending_shots: self.shots.len(),
        }
    }

    /// Attach the render target for preview frames. Only valid while closed.
    pub fn set_preview(&mut self, surface: Box<dyn PreviewSurface>) -> Result<(), CameraError> {
        if self.state.is_open() {
            return Err(CameraError::in_use());
        }
        self.preview = Some(AttachedPreview::new(surface));
        Ok(())
    }

    pub fn clear_preview(&mut self) -> Result<(), CameraError> {
        if self.state.is_open() {
            return Err(CameraError::in_use());
        }
        self.preview = None;
        Ok(())
    }

    /// Create the still-capture target. Only valid while closed.
    pub fn set_picture(
        &mut self,
        size: Size,
        format: ImageFormat,
        max_images: u32,
    ) -> Result<(), CameraError> {
        if self.state.is_open() {
            return Err(CameraError::in_use());
        }
        let sink = self.shots.frame_sink();
        let surface = self
            .backend
            .create_image_target(size, format, max_images, sink)
            .map_err(CameraError::Access)?;
        log::debug!(
            "Still-capture target {:?}: {} {} (max {} images)",
            surface,
            size,
            format.as_str(),
            max_images
        );
        self.picture = Some(PictureTarget {
            surface,
            size,
            format,
        });
        Ok(())
    }

    pub fn is_rotated(&self) -> bool {
        is_rotated(
            self.identity.sensor_orientation,
            self.backend.display_rotation(),
        )
    }

    /// Device sizes for `format` in the orientation of `display_rotation`
    pub fn supported_sizes(&self, format: ImageFormat, display_rotation: u32) -> Vec<Size> {
        let rotated = is_rotated(self.identity.sensor_orientation, display_rotation);
        orient_sizes(self.identity.output_sizes(format), rotated)
    }

    pub fn open(&mut self, mut observer: Box<dyn SessionObserver>) {
        if self.state.is_open() {
            log::warn!(
                "Open requested for camera {} while {:?}",
                self.identity.id,
                self.state
            );
            observer.on_error(CameraError::in_use());
            return;
        }

        log::info!("Opening camera {}", self.identity.id);
        self.observer = Some(observer);

        match self.preview.as_ref().map(|p| p.exists()) {
            Some(false) => {
                if self.transition(SessionState::AwaitingSurface) {
                    self.awaiting_surface = true;
                    log::debug!("Waiting for preview surface of camera {}", self.identity.id);
                }
            }
            Some(true) => {
                self.prepare_preview();
                self.open_device();
            }
            None => self.open_device(),
        }
    }

    /// Submit the repeating preview request, now if the surface is ready or
    /// as soon as it becomes ready. Resubmitted after every readiness change
    /// until the session closes.
    pub fn start_preview(&mut self) -> Result<(), CameraError> {
        if !self.session_configured {
            return Err(CameraError::NoSession);
        }
        let ready = match self.preview.as_ref() {
            Some(preview) => preview.is_ready(),
            None => {
                log::debug!("No preview attached to camera {}", self.identity.id);
                return Ok(());
            }
        };

        self.preview_requested = true;
        if ready {
            self.submit_preview()
        } else {
            log::debug!("Preview deferred until surface is ready");
            Ok(())
        }
    }

    /// Submit a one-shot still capture. `callback` receives the frame once
    /// both the capture completion and a frame notification have arrived.
    pub fn take_picture(&mut self, callback: ShotCallback) {
        if !self.session_configured {
            callback(Err(CameraError::NoSession));
            return;
        }
        let Some(target) = self.picture else {
            callback(Err(CameraError::Capture(
                "No still-capture target configured".to_string(),
            )));
            return;
        };

        match self.backend.capture(target.surface) {
            Ok(request) => {
                log::debug!("Submitted still capture {:?}", request);
                self.in_flight.insert(request, callback);
            }
            Err(reason) => {
                log::warn!("Still capture rejected: {}", reason);
                callback(Err(CameraError::Access(reason)));
            }
        }
    }

    /// Release the device. A no-op when no device is open.
    pub fn close(&mut self) {
        self.preview_requested = false;
        // No capture or preview request is valid once a close is requested.
        self.session_configured = false;

        match self.state {
            SessionState::AwaitingSurface => {
                self.awaiting_surface = false;
                self.device_open = false;
                self.transition(SessionState::Idle);
                self.observer = None;
                log::debug!("Open of camera {} cancelled", self.identity.id);
            }
            SessionState::OpeningDevice if !self.device_open => {
                // The open is still pending; the device is closed on arrival.
                self.transition(SessionState::Closing);
            }
            SessionState::Closing => {
                log::debug!("Camera {} already closing", self.identity.id);
            }
            _ if self.device_open => {
                log::info!("Closing camera {}", self.identity.id);
                self.transition(SessionState::Closing);
                self.backend.close_device();
            }
            _ => {
                log::debug!("Close requested with no open device");
            }
        }
    }

    pub fn handle_event(&mut self, event: PlatformEvent) {
        log::debug!("Camera {} in {:?} got {:?}", self.identity.id, self.state, event);

        match event {
            PlatformEvent::DeviceOpened => self.on_device_opened(),
            PlatformEvent::DeviceDisconnected => {
                if !self.state.is_open() {
                    log::debug!("Ignoring disconnect while {:?}", self.state);
                    return;
                }
                log::warn!("Camera {} disconnected", self.identity.id);
                self.release_after_failure();
            }
            PlatformEvent::DeviceError(code) => self.on_device_error(code),
            PlatformEvent::DeviceClosed => self.on_device_closed(),
            PlatformEvent::SessionConfigured => self.on_session_configured(),
            PlatformEvent::SessionConfigureFailed => {
                if self.state != SessionState::ConfiguringSession {
                    log::warn!("Ignoring session failure while {:?}", self.state);
                    return;
                }
                self.notify_error(CameraError::SessionConfiguration(
                    "Session configuration error".to_string(),
                ));
                self.close();
            }
            PlatformEvent::SessionClosed => {
                self.session_configured = false;
            }
            PlatformEvent::CaptureCompleted {
                request,
                sensor_timestamp_ns,
            } => match self.in_flight.remove(&request) {
                Some(callback) => {
                    self.shots
                        .push(PendingShot::new(request, sensor_timestamp_ns, callback));
                }
                None => log::warn!("Completion for unknown capture {:?}", request),
            },
            PlatformEvent::CaptureFailed { request, reason } => {
                match self.in_flight.remove(&request) {
                    Some(callback) => callback(Err(CameraError::Capture(reason))),
                    None => log::warn!("Failure for unknown capture {:?}: {}", request, reason),
                }
            }
            PlatformEvent::ImageAvailable(image) => {
                self.shots.frame_sink().deliver(image);
            }
            PlatformEvent::Surface(event) => self.on_surface_event(event),
        }
    }

    fn transition(&mut self, next: SessionState) -> bool {
        if self.state.can_transition_to(next) {
            log::debug!("Camera {}: {:?} -> {:?}", self.identity.id, self.state, next);
            self.state = next;
            true
        } else {
            log::warn!(
                "Camera {}: rejected transition {:?} -> {:?}",
                self.identity.id,
                self.state,
                next
            );
            false
        }
    }

    fn notify_error(&mut self, error: CameraError) {
        log::error!("Camera {}: {}", self.identity.id, error);
        match self.observer.as_mut() {
            Some(observer) => observer.on_error(error),
            None => log::warn!("No observer for camera error"),
        }
    }

    fn prepare_preview(&mut self) {
        let rotation = self.backend.display_rotation();
        if let Some(preview) = self.preview.as_mut() {
            if let Some(negotiated) =
                negotiate_for(&self.identity, preview.format(), preview.requested_size(), rotation)
            {
                preview.apply_camera_size(negotiated);
            }
        }
    }

    fn open_device(&mut self) {
        if !self.transition(SessionState::OpeningDevice) {
            return;
        }

        if !self.backend.permission().is_granted() {
            self.notify_error(CameraError::permission_not_granted());
            self.transition(SessionState::Idle);
            return;
        }

        if let Err(reason) = self.backend.open_device(&self.identity.id) {
            self.notify_error(CameraError::Access(reason));
            self.transition(SessionState::Idle);
        }
    }

    fn on_device_opened(&mut self) {
        if self.state == SessionState::Closing {
            self.device_open = true;
            self.backend.close_device();
            return;
        }
        if !self.transition(SessionState::ConfiguringSession) {
            return;
        }
        self.device_open = true;

        let outputs: Vec<SurfaceId> = self
            .preview
            .as_ref()
            .map(|p| p.surface_id())
            .into_iter()
            .chain(self.picture.map(|p| p.surface))
            .collect();

        if outputs.is_empty() {
            self.notify_error(CameraError::SessionConfiguration(
                "No output targets attached".to_string(),
            ));
            self.close();
            return;
        }

        if let Err(reason) = self.backend.create_session(&outputs) {
            self.notify_error(CameraError::Access(reason));
            self.close();
        }
    }

    fn on_device_error(&mut self, code: DeviceErrorCode) {
        if !self.state.is_open() {
            log::warn!("Ignoring device error {:?} while {:?}", code, self.state);
            return;
        }
        self.notify_error(CameraError::device(code));
        self.release_after_failure();
    }

    /// Force the device closed after an asynchronous device failure
    fn release_after_failure(&mut self) {
        match self.state {
            // No device was requested yet.
            SessionState::AwaitingSurface => self.close(),
            // A close raced the pending open; the failure is the open's answer.
            SessionState::Closing if !self.device_open => {
                self.device_open = true;
                self.backend.close_device();
            }
            _ => {
                self.device_open = true;
                self.close();
            }
        }
    }

    fn on_session_configured(&mut self) {
        if !self.transition(SessionState::PreviewActive) {
            return;
        }
        self.session_configured = true;
        log::info!("Camera {} open", self.identity.id);
        if let Some(observer) = self.observer.as_mut() {
            observer.on_open();
        }
    }

    fn on_device_closed(&mut self) {
        if !self.transition(SessionState::Closed) {
            return;
        }
        self.device_open = false;
        self.session_configured = false;
        self.preview_requested = false;
        self.awaiting_surface = false;

        let closed = || {
            CameraError::Capture("Camera closed before the frame was delivered".to_string())
        };
        for (_, callback) in self.in_flight.drain() {
            callback(Err(closed()));
        }
        for shot in self.shots.drain() {
            shot.resolve(Err(closed()));
        }

        log::info!("Camera {} closed", self.identity.id);
        if let Some(mut observer) = self.observer.take() {
            observer.on_close();
        }
    }

    fn on_surface_event(&mut self, event: SurfaceEvent) {
        let notices = match self.preview.as_mut() {
            Some(preview) => preview.handle_event(event),
            None => {
                log::debug!("Surface event {:?} with no preview attached", event);
                return;
            }
        };

        for notice in notices {
            match notice {
                ReadinessNotice::Ready => {
                    if self.preview_requested && self.session_configured {
                        if let Err(e) = self.submit_preview() {
                            self.notify_error(e);
                        }
                    }
                }
                ReadinessNotice::Created => {
                    if self.awaiting_surface {
                        self.awaiting_surface = false;
                        self.prepare_preview();
                        self.open_device();
                    }
                }
                ReadinessNotice::Destroyed => {}
            }
        }
    }

    fn submit_preview(&mut self) -> Result<(), CameraError> {
        let Some(target) = self.preview.as_ref().map(|p| p.surface_id()) else {
            return Ok(());
        };
        log::debug!("Submitting repeating preview request to {:?}", target);
        self.backend
            .set_repeating_request(target)
            .map_err(CameraError::Access)
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        if self.device_open {
            log::debug!("Releasing camera {} on drop", self.identity.id);
            self.backend.close_device();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{BackendCall, SimulatedBackend};
    use crate::types::Facing;

    fn identity() -> CameraIdentity {
        CameraIdentity::new("0", Facing::Back, 0)
    }

    #[test]
    fn test_transition_table() {
        use SessionState::*;
        assert!(Idle.can_transition_to(OpeningDevice));
        assert!(Closed.can_transition_to(AwaitingSurface));
        assert!(!Idle.can_transition_to(PreviewActive));
        assert!(!PreviewActive.can_transition_to(ConfiguringSession));
        assert!(Closing.can_transition_to(Closed));
        assert!(!Idle.can_transition_to(Closed));
    }

    #[test]
    fn test_close_while_idle_is_noop() {
        let (backend, controls) = SimulatedBackend::new();
        let mut session = CameraSession::new(identity(), Box::new(backend));
        session.close();
        session.close();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(controls.calls().is_empty());
    }

    #[test]
    fn test_close_before_device_opened_closes_on_arrival() {
        let (backend, controls) = SimulatedBackend::new();
        let mut session = CameraSession::new(identity(), Box::new(backend));
        session.set_picture(Size::new(640, 480), ImageFormat::Jpeg, 2).unwrap();
        session.open(Box::new(crate::testing::RecordingObserver::default()));
        assert_eq!(session.state(), SessionState::OpeningDevice);

        session.close();
        assert_eq!(session.state(), SessionState::Closing);

        session.handle_event(PlatformEvent::DeviceOpened);
        assert_eq!(controls.calls().last(), Some(&BackendCall::CloseDevice));
        session.handle_event(PlatformEvent::DeviceClosed);
        assert_eq!(session.state(), SessionState::Closed);
    }
}
