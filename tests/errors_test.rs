#[cfg(test)]
mod error_tests {
    use crabpreview::errors::{AccessReason, CameraError, DeviceErrorCode, ErrorKind};
    use std::error::Error;

    #[test]
    fn test_camera_error_open_failed() {
        let error = CameraError::OpenFailed("Test open error".to_string());
        assert!(error.to_string().contains("Camera open failed"));
        assert!(error.to_string().contains("Test open error"));
        assert_eq!(error.message(), "Test open error");
    }

    #[test]
    fn test_camera_error_display_trait() {
        let error = CameraError::Capture("Display test".to_string());
        assert_eq!(format!("{}", error), "Capture error: Display test");
    }

    #[test]
    fn test_camera_error_debug_format() {
        let error = CameraError::SessionConfiguration("Debug test".to_string());
        let debug_str = format!("{:?}", error);
        assert!(debug_str.contains("SessionConfiguration"));
        assert!(debug_str.contains("Debug test"));
    }

    #[test]
    fn test_camera_error_implements_error_trait() {
        let error = CameraError::in_use();
        let _error_trait: &dyn Error = &error;
        assert!(error.source().is_none());

        let io = CameraError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert!(io.source().is_some());
        assert_eq!(io.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_error_codes_for_web_layer() {
        let cases = [
            (CameraError::OpenFailed(String::new()), "OPEN_FAILED_ERROR"),
            (
                CameraError::SessionConfiguration(String::new()),
                "SESSION_CONFIGURATION_ERROR",
            ),
            (
                CameraError::Access(AccessReason::Error),
                "CAMERA_ACCESS_ERROR",
            ),
            (CameraError::Capture(String::new()), "CAPTURE_ERROR"),
            (CameraError::NoSession, "NO_SESSION_ERROR"),
            (CameraError::Config(String::new()), "CONFIG_ERROR"),
        ];

        for (error, code) in cases {
            assert_eq!(error.kind().code(), code);
            assert_eq!(error.kind().to_string(), code);
        }
    }

    #[test]
    fn test_access_reason_messages() {
        let reasons = [
            AccessReason::Disabled,
            AccessReason::Disconnected,
            AccessReason::Error,
            AccessReason::InUse,
            AccessReason::MaxInUse,
        ];
        for reason in reasons {
            let error = CameraError::Access(reason);
            assert_eq!(error.message(), reason.message());
            assert!(error.to_string().contains(reason.message()));
        }
    }

    #[test]
    fn test_device_error_codes() {
        assert_eq!(DeviceErrorCode::from_raw(1), DeviceErrorCode::CameraInUse);
        assert_eq!(DeviceErrorCode::from_raw(2), DeviceErrorCode::MaxCamerasInUse);
        assert_eq!(DeviceErrorCode::from_raw(3), DeviceErrorCode::CameraDisabled);
        assert_eq!(DeviceErrorCode::from_raw(4), DeviceErrorCode::CameraDevice);
        assert_eq!(DeviceErrorCode::from_raw(5), DeviceErrorCode::CameraService);
        assert_eq!(DeviceErrorCode::from_raw(0), DeviceErrorCode::Unknown(0));

        let error = CameraError::device(DeviceErrorCode::CameraService);
        assert_eq!(error.kind(), ErrorKind::OpenFailed);
        assert_eq!(error.message(), "Camera service has encountered a fatal error");
    }

    #[test]
    fn test_error_kind_serialization() {
        let json = serde_json::to_string(&ErrorKind::SessionConfiguration).unwrap();
        assert_eq!(json, "\"SessionConfiguration\"");
        let reason: AccessReason = serde_json::from_str("\"MaxInUse\"").unwrap();
        assert_eq!(reason, AccessReason::MaxInUse);
    }
}
