pub mod camera;

pub use camera::{CameraHost, CameraPlugin, StartCameraOptions, SupportedSizesOptions};

use crate::permissions::PermissionInfo;
use crate::types::{CapturedImage, Size};
use std::sync::{Arc, RwLock};

// Process-wide plugin instance the free command functions dispatch to
lazy_static::lazy_static! {
    static ref PLUGIN: RwLock<Option<Arc<CameraPlugin>>> = RwLock::new(None);
}

/// Install the plugin the command functions use, replacing any previous one
pub fn install(plugin: CameraPlugin) -> Arc<CameraPlugin> {
    let plugin = Arc::new(plugin);
    match PLUGIN.write() {
        Ok(mut slot) => *slot = Some(plugin.clone()),
        Err(e) => *e.into_inner() = Some(plugin.clone()),
    }
    plugin
}

fn installed() -> Result<Arc<CameraPlugin>, String> {
    PLUGIN
        .read()
        .map_err(|e| e.to_string())?
        .clone()
        .ok_or_else(|| "Camera plugin not installed".to_string())
}

pub async fn start_camera(options: StartCameraOptions) -> Result<(), String> {
    installed()?.start_camera(options).await
}

pub async fn take_picture() -> Result<CapturedImage, String> {
    installed()?.take_picture().await
}

pub async fn close() -> Result<(), String> {
    installed()?.close().await
}

pub async fn check_permission() -> Result<PermissionInfo, String> {
    installed()?.check_permission().await
}

pub async fn get_supported_sizes(options: SupportedSizesOptions) -> Result<Vec<Size>, String> {
    installed()?.get_supported_sizes(options).await
}
