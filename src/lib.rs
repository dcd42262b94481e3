//! crabpreview: camera session lifecycle for hybrid-app camera plugins
//!
//! Opens a device camera, binds a preview surface and captures still images,
//! translating the platform's asynchronous camera callbacks into one explicit
//! state machine that a web-facing command layer can drive.
//!
//! # Features
//! - Session state machine with a checked transition table
//! - Preview surface readiness protocol (created vs. ready)
//! - Output size negotiation with sensor/display rotation handling
//! - Thread-safe FIFO pairing of capture completions with delivered frames
//! - Async command surface: start camera, take picture, close, supported sizes
//!
//! # Usage
//! ```rust,ignore
//! use crabpreview::commands::{CameraPlugin, StartCameraOptions};
//! use crabpreview::config::PreviewConfig;
//! use std::sync::Arc;
//!
//! let plugin = CameraPlugin::new(Arc::new(host), PreviewConfig::load_or_default());
//! plugin.start_camera(StartCameraOptions::default()).await?;
//! let image = plugin.take_picture().await?;
//! plugin.close().await?;
//! ```
pub mod catalog;
pub mod commands;
pub mod config;
pub mod errors;
pub mod negotiate;
pub mod permissions;
pub mod platform;
pub mod preview;
pub mod session;
pub mod shots;
pub mod types;

// Testing utilities - simulated platform for offline testing
pub mod testing;

// Re-exports for convenience
pub use catalog::CameraCatalog;
pub use errors::{AccessReason, CameraError, DeviceErrorCode, ErrorKind};
pub use platform::{CameraBackend, CameraProvider, PlatformEvent};
pub use preview::{PreviewSurface, SurfaceEvent};
pub use session::{CameraSession, SessionObserver, SessionState};
pub use shots::{FrameSink, ShotCallback};
pub use types::{CameraIdentity, CapturedImage, Facing, ImageFormat, Size};

/// Initialize logging for the camera plugin
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "crabpreview=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

#[cfg(test)]
mod lib_tests {
    use super::*;

    #[test]
    fn test_crate_info() {
        let info = get_info();
        assert_eq!(info.name, "crabpreview");
        assert!(!info.version.is_empty());
        assert!(!info.description.is_empty());
    }
}
