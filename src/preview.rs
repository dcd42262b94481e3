//! Preview surfaces and their readiness protocol
//!
//! A surface is ready once it exists and has no buffer resize pending.
//! "Created" and "ready" are separate notices: a resize makes the surface
//! briefly not ready and the following change makes it ready again without a
//! second creation.

use crate::negotiate::Negotiated;
use crate::types::{ImageFormat, Size, SurfaceId};
use std::sync::{Arc, Mutex};

/// Lifecycle events the presentation layer reports for a render surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    Created,
    Changed(Size),
    Destroyed,
}

/// Notices derived from surface events, in delivery order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessNotice {
    Ready,
    Created,
    Destroyed,
}

/// A render target the camera writes preview frames into.
///
/// One implementation exists per render-surface technology.
pub trait PreviewSurface: Send {
    /// Platform handle passed to session configuration and preview requests
    fn surface(&self) -> SurfaceId;

    /// Size the host wants the preview to cover
    fn size(&self) -> Size;

    /// Apply the camera-assigned size. `size` is in display orientation.
    fn set_camera_size(&mut self, size: Size, rotated: bool);

    /// Stream format used to look up supported preview sizes
    fn format(&self) -> ImageFormat {
        ImageFormat::Private
    }
}

/// Tracks existence and pending resizes of one surface
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceTracker {
    exists: bool,
    needs_change: bool,
}

impl SurfaceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn is_ready(&self) -> bool {
        self.exists && !self.needs_change
    }

    /// Mark a buffer resize as requested; readiness returns with the next change
    pub fn resize_pending(&mut self) {
        self.needs_change = true;
    }

    pub fn apply(&mut self, event: SurfaceEvent) -> Vec<ReadinessNotice> {
        let was_ready = self.is_ready();
        let mut notices = Vec::with_capacity(2);

        match event {
            SurfaceEvent::Created => {
                self.exists = true;
                if !was_ready && self.is_ready() {
                    notices.push(ReadinessNotice::Ready);
                }
                notices.push(ReadinessNotice::Created);
            }
            SurfaceEvent::Changed(_) => {
                self.needs_change = false;
                if !was_ready && self.is_ready() {
                    notices.push(ReadinessNotice::Ready);
                }
            }
            SurfaceEvent::Destroyed => {
                self.exists = false;
                notices.push(ReadinessNotice::Destroyed);
            }
        }

        notices
    }
}

/// A preview surface attached to a session, with its readiness state
pub struct AttachedPreview {
    surface: Box<dyn PreviewSurface>,
    tracker: SurfaceTracker,
}

impl AttachedPreview {
    pub fn new(surface: Box<dyn PreviewSurface>) -> Self {
        Self {
            surface,
            tracker: SurfaceTracker::new(),
        }
    }

    pub fn surface_id(&self) -> SurfaceId {
        self.surface.surface()
    }

    pub fn requested_size(&self) -> Size {
        self.surface.size()
    }

    pub fn format(&self) -> ImageFormat {
        self.surface.format()
    }

    pub fn exists(&self) -> bool {
        self.tracker.exists()
    }

    pub fn is_ready(&self) -> bool {
        self.tracker.is_ready()
    }

    pub fn handle_event(&mut self, event: SurfaceEvent) -> Vec<ReadinessNotice> {
        let notices = self.tracker.apply(event);
        log::debug!(
            "Preview surface {:?} event {:?} -> {:?}",
            self.surface.surface(),
            event,
            notices
        );
        notices
    }

    pub fn apply_camera_size(&mut self, negotiated: Negotiated) {
        self.surface
            .set_camera_size(negotiated.size, negotiated.rotated);
        self.tracker.resize_pending();
    }
}

/// Layout a host must apply to its native view after size negotiation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceLayout {
    /// View size in display orientation
    pub view_size: Size,
    /// Fixed buffer size in sensor orientation
    pub buffer_size: Size,
    /// Visible region, the size the host asked for
    pub clip: Size,
}

/// Shared view of the layout a [`FixedPreview`] computed
#[derive(Debug, Clone, Default)]
pub struct LayoutHandle {
    inner: Arc<Mutex<Option<SurfaceLayout>>>,
}

impl LayoutHandle {
    pub fn get(&self) -> Option<SurfaceLayout> {
        self.inner.lock().ok().and_then(|g| *g)
    }

    fn set(&self, layout: SurfaceLayout) {
        match self.inner.lock() {
            Ok(mut g) => *g = Some(layout),
            Err(_) => log::error!("Preview layout lock poisoned, dropping layout update"),
        }
    }
}

/// Preview backed by a fixed-size native surface view.
///
/// The view is sized to the negotiated camera size, its buffer is fixed in
/// sensor orientation and the visible part is clipped to the requested size.
pub struct FixedPreview {
    surface: SurfaceId,
    size: Size,
    format: ImageFormat,
    layout: LayoutHandle,
}

impl FixedPreview {
    pub fn new(surface: SurfaceId, size: Size) -> Self {
        Self {
            surface,
            size,
            format: ImageFormat::Private,
            layout: LayoutHandle::default(),
        }
    }

    pub fn with_format(mut self, format: ImageFormat) -> Self {
        self.format = format;
        self
    }

    pub fn layout_handle(&self) -> LayoutHandle {
        self.layout.clone()
    }
}

impl PreviewSurface for FixedPreview {
    fn surface(&self) -> SurfaceId {
        self.surface
    }

    fn size(&self) -> Size {
        self.size
    }

    fn set_camera_size(&mut self, size: Size, rotated: bool) {
        let buffer_size = if rotated { size.swapped() } else { size };
        self.layout.set(SurfaceLayout {
            view_size: size,
            buffer_size,
            clip: self.size,
        });
    }

    fn format(&self) -> ImageFormat {
        self.format
    }
}
