//! Bridge commands backed by a [`CameraSession`]
//!
//! Each command maps onto one session operation and returns either a
//! serializable payload or an error string for the web layer. Platform events
//! are pumped into the session by a tokio task per opened camera.

use crate::catalog::CameraCatalog;
use crate::config::PreviewConfig;
use crate::errors::CameraError;
use crate::negotiate::{is_rotated, orient_sizes};
use crate::permissions::{PermissionInfo, PermissionStatus};
use crate::platform::{event_channel, CameraBackend, CameraProvider, EventReceiver, EventSender};
use crate::preview::PreviewSurface;
use crate::session::{CameraSession, SessionInfo, SessionObserver, SessionState};
use crate::types::{CameraIdentity, CapturedImage, Facing, ImageFormat, Size};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as SyncMutex};
use tokio::sync::{oneshot, OnceCell, RwLock};
use tokio::task::JoinHandle;

/// Host-side glue: enumeration, backends and preview surfaces
pub trait CameraHost: Send + Sync {
    fn provider(&self) -> &dyn CameraProvider;

    /// Camera permission as the host platform currently reports it
    fn permission(&self) -> PermissionStatus;

    /// Display rotation in degrees, used when no session is open
    fn display_rotation(&self) -> u32;

    /// Backend for `identity`; asynchronous outcomes go to `events`
    fn connect(
        &self,
        identity: &CameraIdentity,
        events: EventSender,
    ) -> Result<Box<dyn CameraBackend>, CameraError>;

    /// Render surface for a start request. Surface lifecycle events go to
    /// `events`. `None` opens the camera without preview.
    fn create_preview(
        &self,
        options: &StartCameraOptions,
        events: EventSender,
    ) -> Option<Box<dyn PreviewSurface>>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartCameraOptions {
    #[serde(default)]
    pub facing: Option<Facing>,
    /// Requested minimum preview size
    #[serde(default)]
    pub preview: Option<Size>,
    #[serde(default)]
    pub picture: Option<Size>,
    #[serde(default)]
    pub picture_format: Option<ImageFormat>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportedSizesOptions {
    #[serde(default)]
    pub facing: Option<Facing>,
    pub format: ImageFormat,
    #[serde(default)]
    pub display_rotation: Option<u32>,
}

type SharedSession = Arc<SyncMutex<CameraSession>>;

struct ActiveCamera {
    generation: u64,
    session: SharedSession,
    pump: JoinHandle<()>,
}

type ActiveSlot = Arc<RwLock<Option<ActiveCamera>>>;

/// Turns the first open/error outcome into a oneshot completion
struct OpenObserver {
    camera_id: String,
    outcome: Option<oneshot::Sender<Result<(), CameraError>>>,
}

impl SessionObserver for OpenObserver {
    fn on_open(&mut self) {
        if let Some(tx) = self.outcome.take() {
            let _ = tx.send(Ok(()));
        }
    }

    fn on_error(&mut self, error: CameraError) {
        match self.outcome.take() {
            Some(tx) => {
                let _ = tx.send(Err(error));
            }
            None => log::warn!("Camera {} error after open: {}", self.camera_id, error),
        }
    }

    fn on_close(&mut self) {
        log::info!("Camera {} released", self.camera_id);
    }
}

/// The plugin's command surface
pub struct CameraPlugin {
    host: Arc<dyn CameraHost>,
    config: PreviewConfig,
    catalog: OnceCell<CameraCatalog>,
    active: ActiveSlot,
    generation: AtomicU64,
}

impl CameraPlugin {
    pub fn new(host: Arc<dyn CameraHost>, config: PreviewConfig) -> Self {
        Self {
            host,
            config,
            catalog: OnceCell::new(),
            active: Arc::new(RwLock::new(None)),
            generation: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    async fn catalog(&self) -> Result<&CameraCatalog, CameraError> {
        self.catalog
            .get_or_try_init(|| async { CameraCatalog::resolve(self.host.provider()) })
            .await
    }

    async fn identity(&self, facing: Option<Facing>) -> Result<CameraIdentity, CameraError> {
        let facing = facing.unwrap_or(self.config.camera.default_facing);
        Ok(self.catalog().await?.require(facing)?.clone())
    }

    async fn active_session(&self) -> Option<SharedSession> {
        self.active.read().await.as_ref().map(|a| a.session.clone())
    }

    /// Open a camera and start its preview once the session is configured
    pub async fn start_camera(&self, options: StartCameraOptions) -> Result<(), String> {
        log::info!("Starting camera: {:?}", options);

        let mut active = self.active.write().await;
        if active.is_some() {
            return Err(CameraError::in_use().to_string());
        }

        let identity = self.identity(options.facing).await.map_err(|e| e.to_string())?;
        let camera_id = identity.id.clone();
        let (events, receiver) = event_channel();
        let backend = self
            .host
            .connect(&identity, events.clone())
            .map_err(|e| e.to_string())?;
        let mut session = CameraSession::new(identity, backend);

        if self.config.preview.enabled {
            let mut options = options.clone();
            options.preview = options.preview.or_else(|| self.config.preview_min_size());
            if let Some(preview) = self.host.create_preview(&options, events) {
                session.set_preview(preview).map_err(|e| e.to_string())?;
            }
        }

        let picture_size = options.picture.unwrap_or_else(|| self.config.picture_size());
        let picture_format = options
            .picture_format
            .unwrap_or(self.config.camera.picture_format);
        session
            .set_picture(picture_size, picture_format, self.config.camera.max_images)
            .map_err(|e| e.to_string())?;

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let session = Arc::new(SyncMutex::new(session));
        let pump = tokio::spawn(pump_events(
            session.clone(),
            receiver,
            self.active.clone(),
            generation,
        ));

        let (tx, rx) = oneshot::channel();
        {
            let mut guard = session
                .lock()
                .map_err(|_| "Camera session lock poisoned".to_string())?;
            guard.open(Box::new(OpenObserver {
                camera_id,
                outcome: Some(tx),
            }));
        }
        *active = Some(ActiveCamera {
            generation,
            session: session.clone(),
            pump,
        });
        drop(active);

        match rx.await {
            Ok(Ok(())) => {
                let mut guard = session
                    .lock()
                    .map_err(|_| "Camera session lock poisoned".to_string())?;
                guard.start_preview().map_err(|e| e.to_string())
            }
            Ok(Err(e)) => {
                self.forget_if_released(generation).await;
                Err(e.to_string())
            }
            Err(_) => {
                self.forget_if_released(generation).await;
                Err("Camera closed before it finished opening".to_string())
            }
        }
    }

    /// Capture one still frame from the open camera
    pub async fn take_picture(&self) -> Result<CapturedImage, String> {
        let session = self
            .active_session()
            .await
            .ok_or_else(|| CameraError::NoSession.to_string())?;

        let (tx, rx) = oneshot::channel();
        {
            let mut guard = session
                .lock()
                .map_err(|_| "Camera session lock poisoned".to_string())?;
            guard.take_picture(Box::new(move |result| {
                let _ = tx.send(result);
            }));
        }

        match rx.await {
            Ok(Ok(image)) => {
                log::info!(
                    "Captured {}x{} {} frame ({} bytes)",
                    image.width,
                    image.height,
                    image.format.as_str(),
                    image.byte_len()
                );
                Ok(image)
            }
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err("Camera closed before the frame was delivered".to_string()),
        }
    }

    /// Release the open camera. Succeeds when nothing is open.
    pub async fn close(&self) -> Result<(), String> {
        let mut active = self.active.write().await;
        let state = match active.as_ref() {
            Some(camera) => {
                let mut guard = camera
                    .session
                    .lock()
                    .map_err(|_| "Camera session lock poisoned".to_string())?;
                guard.close();
                guard.state()
            }
            None => return Ok(()),
        };

        if !state.is_open() {
            if let Some(camera) = active.take() {
                camera.pump.abort();
            }
        }
        Ok(())
    }

    /// Current camera permission with guidance for the web layer
    pub async fn check_permission(&self) -> Result<PermissionInfo, String> {
        let info = PermissionInfo::from(self.host.permission());
        if info.status.is_granted() {
            log::debug!("Camera permission: {}", info.status);
        } else {
            log::warn!("Camera permission {}: {}", info.status, info.message);
        }
        Ok(info)
    }

    /// Sizes the camera supports for a format, in display orientation
    pub async fn get_supported_sizes(
        &self,
        options: SupportedSizesOptions,
    ) -> Result<Vec<Size>, String> {
        let identity = self
            .identity(options.facing)
            .await
            .map_err(|e| e.to_string())?;
        let rotation = options
            .display_rotation
            .unwrap_or_else(|| self.host.display_rotation());
        let rotated = is_rotated(identity.sensor_orientation, rotation);
        Ok(orient_sizes(identity.output_sizes(options.format), rotated))
    }

    /// Snapshot of the open camera, if any
    pub async fn session_info(&self) -> Option<SessionInfo> {
        let session = self.active_session().await?;
        let guard = session.lock().ok()?;
        Some(guard.info())
    }

    async fn forget_if_released(&self, generation: u64) {
        let mut active = self.active.write().await;
        let released = match active.as_ref() {
            Some(camera) if camera.generation == generation => camera
                .session
                .lock()
                .map(|s| !s.state().is_open())
                .unwrap_or(true),
            _ => false,
        };
        if released {
            if let Some(camera) = active.take() {
                camera.pump.abort();
            }
        }
    }
}

async fn pump_events(
    session: SharedSession,
    mut receiver: EventReceiver,
    active: ActiveSlot,
    generation: u64,
) {
    while let Some(event) = receiver.recv().await {
        let state = match session.lock() {
            Ok(mut guard) => {
                guard.handle_event(event);
                guard.state()
            }
            Err(_) => {
                log::error!("Camera session lock poisoned, stopping event pump");
                break;
            }
        };
        if state == SessionState::Closed {
            break;
        }
    }

    let mut active = active.write().await;
    if active.as_ref().is_some_and(|a| a.generation == generation) {
        log::debug!("Forgetting camera session {}", generation);
        *active = None;
    }
}
