use crate::errors::{AccessReason, CameraError};
use crate::platform::CameraProvider;
use crate::types::{CameraIdentity, Facing};
use std::collections::HashMap;

/// Camera identities resolved once and cached by facing
#[derive(Debug, Clone, Default)]
pub struct CameraCatalog {
    by_facing: HashMap<Facing, CameraIdentity>,
}

impl CameraCatalog {
    /// Inspect every camera the provider reports. When several cameras share
    /// a facing, the last one reported wins.
    pub fn resolve(provider: &dyn CameraProvider) -> Result<Self, CameraError> {
        let ids = provider.camera_ids().map_err(CameraError::Access)?;
        log::info!("Resolving {} camera(s)", ids.len());

        let mut by_facing = HashMap::new();
        for id in ids {
            match provider.characteristics(&id) {
                Ok(identity) => {
                    log::debug!(
                        "Camera {} faces {} (sensor at {} degrees)",
                        identity.id,
                        identity.facing.as_str(),
                        identity.sensor_orientation
                    );
                    by_facing.insert(identity.facing, identity);
                }
                Err(reason) => {
                    log::warn!("Skipping camera {}: {}", id, reason);
                }
            }
        }

        Ok(Self { by_facing })
    }

    pub fn get(&self, facing: Facing) -> Option<&CameraIdentity> {
        self.by_facing.get(&facing)
    }

    /// Identity for `facing`, or a disconnected access error
    pub fn require(&self, facing: Facing) -> Result<&CameraIdentity, CameraError> {
        self.get(facing)
            .ok_or(CameraError::Access(AccessReason::Disconnected))
    }

    pub fn len(&self) -> usize {
        self.by_facing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_facing.is_empty()
    }
}
