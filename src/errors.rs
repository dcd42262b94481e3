use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Flat error kinds reported to session observers and shot callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    OpenFailed,
    SessionConfiguration,
    Access,
    Capture,
    NoSession,
    Config,
}

impl ErrorKind {
    /// Error code string handed to the web layer.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::OpenFailed => "OPEN_FAILED_ERROR",
            ErrorKind::SessionConfiguration => "SESSION_CONFIGURATION_ERROR",
            ErrorKind::Access => "CAMERA_ACCESS_ERROR",
            ErrorKind::Capture => "CAPTURE_ERROR",
            ErrorKind::NoSession => "NO_SESSION_ERROR",
            ErrorKind::Config => "CONFIG_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Checked failure reasons reported by the platform access layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessReason {
    Disabled,
    Disconnected,
    Error,
    InUse,
    MaxInUse,
}

impl AccessReason {
    pub fn message(&self) -> &'static str {
        match self {
            AccessReason::Disabled => "The camera is disabled due to a device policy",
            AccessReason::Disconnected => "The camera device is no longer connected",
            AccessReason::Error => "The camera device is currently in an error state",
            AccessReason::InUse => "The camera device is in use already",
            AccessReason::MaxInUse => {
                "The system-wide limit for number of open cameras has been reached"
            }
        }
    }
}

impl std::fmt::Display for AccessReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Native device error codes delivered asynchronously after an open request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceErrorCode {
    CameraDevice,
    CameraDisabled,
    CameraInUse,
    CameraService,
    MaxCamerasInUse,
    Unknown(i32),
}

impl DeviceErrorCode {
    pub fn from_raw(code: i32) -> Self {
        match code {
            4 => DeviceErrorCode::CameraDevice,
            3 => DeviceErrorCode::CameraDisabled,
            1 => DeviceErrorCode::CameraInUse,
            5 => DeviceErrorCode::CameraService,
            2 => DeviceErrorCode::MaxCamerasInUse,
            other => DeviceErrorCode::Unknown(other),
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            DeviceErrorCode::CameraDevice => "Camera device has encountered a fatal error",
            DeviceErrorCode::CameraDisabled => {
                "Camera device could not be opened due to a device policy"
            }
            DeviceErrorCode::CameraInUse => "Camera device is in use already",
            DeviceErrorCode::CameraService => "Camera service has encountered a fatal error",
            DeviceErrorCode::MaxCamerasInUse => {
                "Camera device could not be opened because there are too many other open camera devices"
            }
            DeviceErrorCode::Unknown(_) => "Unknown error",
        }
    }
}

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("Camera open failed: {0}")]
    OpenFailed(String),

    #[error("Session configuration error: {0}")]
    SessionConfiguration(String),

    #[error("Camera access error: {0}")]
    Access(AccessReason),

    #[error("Capture error: {0}")]
    Capture(String),

    #[error("No active capture session")]
    NoSession,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CameraError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CameraError::OpenFailed(_) => ErrorKind::OpenFailed,
            CameraError::SessionConfiguration(_) => ErrorKind::SessionConfiguration,
            CameraError::Access(_) => ErrorKind::Access,
            CameraError::Capture(_) => ErrorKind::Capture,
            CameraError::NoSession => ErrorKind::NoSession,
            CameraError::Config(_) | CameraError::Io(_) => ErrorKind::Config,
        }
    }

    /// Human-readable reason without the kind prefix.
    pub fn message(&self) -> String {
        match self {
            CameraError::OpenFailed(msg)
            | CameraError::SessionConfiguration(msg)
            | CameraError::Capture(msg)
            | CameraError::Config(msg) => msg.clone(),
            CameraError::Access(reason) => reason.message().to_string(),
            CameraError::NoSession => "No active capture session".to_string(),
            CameraError::Io(e) => e.to_string(),
        }
    }

    pub fn in_use() -> Self {
        CameraError::Access(AccessReason::InUse)
    }

    pub fn permission_not_granted() -> Self {
        CameraError::OpenFailed("Permission not granted".to_string())
    }

    pub fn device(code: DeviceErrorCode) -> Self {
        CameraError::OpenFailed(code.message().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_error_messages() {
        assert_eq!(
            CameraError::device(DeviceErrorCode::CameraInUse).message(),
            "Camera device is in use already"
        );
        assert_eq!(DeviceErrorCode::from_raw(42), DeviceErrorCode::Unknown(42));
        assert_eq!(DeviceErrorCode::from_raw(42).message(), "Unknown error");
        assert_eq!(DeviceErrorCode::from_raw(2), DeviceErrorCode::MaxCamerasInUse);
    }

    #[test]
    fn test_kind_codes() {
        assert_eq!(CameraError::in_use().kind().code(), "CAMERA_ACCESS_ERROR");
        assert_eq!(
            CameraError::permission_not_granted().kind(),
            ErrorKind::OpenFailed
        );
        assert_eq!(CameraError::NoSession.kind().code(), "NO_SESSION_ERROR");
    }

    #[test]
    fn test_display_includes_reason() {
        let error = CameraError::Access(AccessReason::Disconnected);
        assert!(error.to_string().contains("no longer connected"));
    }
}
