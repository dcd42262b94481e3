#[cfg(test)]
mod commands_tests {
    use crabpreview::commands::{
        self, CameraPlugin, StartCameraOptions, SupportedSizesOptions,
    };
    use crabpreview::config::PreviewConfig;
    use crabpreview::permissions::PermissionStatus;
    use crabpreview::session::SessionState;
    use crabpreview::testing::{BackendCall, SimulatedHost};
    use crabpreview::types::{Facing, ImageFormat, Size};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    fn plugin_with(host: SimulatedHost) -> (CameraPlugin, Arc<SimulatedHost>) {
        let host = Arc::new(host);
        (CameraPlugin::new(host.clone(), PreviewConfig::default()), host)
    }

    fn small_picture() -> StartCameraOptions {
        StartCameraOptions {
            picture: Some(Size::new(64, 48)),
            ..Default::default()
        }
    }

    async fn wait_released(plugin: &CameraPlugin) {
        for _ in 0..200 {
            if plugin.session_info().await.is_none() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("camera was not released");
    }

    #[tokio::test]
    async fn test_start_take_close() {
        let (plugin, host) = plugin_with(SimulatedHost::typical());

        assert_ok!(plugin.start_camera(small_picture()).await);
        let info = plugin.session_info().await.unwrap();
        assert_eq!(info.camera_id, "0");
        assert_eq!(info.state, SessionState::PreviewActive);
        assert!(!info.preview_attached);

        let image = assert_ok!(plugin.take_picture().await);
        assert_eq!(image.size(), Size::new(64, 48));
        assert_eq!(image.format, ImageFormat::Jpeg);
        assert_eq!(image.byte_len(), 64 * 48);

        assert_ok!(plugin.close().await);
        wait_released(&plugin).await;

        let controls = host.last_backend().unwrap();
        assert_eq!(controls.count(|c| *c == BackendCall::CloseDevice), 1);
    }

    #[tokio::test]
    async fn test_consecutive_pictures_arrive_in_order() {
        let (plugin, _host) = plugin_with(SimulatedHost::typical());
        assert_ok!(plugin.start_camera(small_picture()).await);

        let mut timestamps = Vec::new();
        for _ in 0..3 {
            timestamps.push(assert_ok!(plugin.take_picture().await).timestamp_ns);
        }
        assert_eq!(timestamps, vec![33_333_333, 66_666_666, 99_999_999]);

        assert_ok!(plugin.close().await);
    }

    #[tokio::test]
    async fn test_start_with_preview_submits_repeating_request() {
        let (plugin, host) = plugin_with(SimulatedHost::typical());

        let options = StartCameraOptions {
            preview: Some(Size::new(700, 1000)),
            ..small_picture()
        };
        assert_ok!(plugin.start_camera(options).await);

        let info = plugin.session_info().await.unwrap();
        assert!(info.preview_attached);
        assert!(info.preview_ready);

        let controls = host.last_backend().unwrap();
        assert_eq!(
            controls.count(|c| matches!(c, BackendCall::SetRepeatingRequest(_))),
            1
        );
        assert_eq!(
            controls.count(|c| matches!(c, BackendCall::CreateSession(outputs) if outputs.len() == 2)),
            1
        );

        assert_ok!(plugin.close().await);
    }

    #[tokio::test]
    async fn test_second_start_is_rejected_while_open() {
        let (plugin, host) = plugin_with(SimulatedHost::typical());
        assert_ok!(plugin.start_camera(small_picture()).await);

        let error = assert_err!(plugin.start_camera(small_picture()).await);
        assert!(error.contains("in use already"));
        assert_eq!(host.connections(), 1);

        assert_ok!(plugin.close().await);
    }

    #[tokio::test]
    async fn test_start_again_after_close() {
        let (plugin, host) = plugin_with(SimulatedHost::typical());

        assert_ok!(plugin.start_camera(small_picture()).await);
        assert_ok!(plugin.close().await);
        wait_released(&plugin).await;

        assert_ok!(
            plugin
                .start_camera(StartCameraOptions {
                    facing: Some(Facing::Front),
                    ..small_picture()
                })
                .await
        );
        assert_eq!(host.connections(), 2);
        assert_eq!(plugin.session_info().await.unwrap().camera_id, "1");
        assert_ok!(plugin.close().await);
    }

    #[tokio::test]
    async fn test_permission_denied_releases_camera() {
        let (plugin, _host) =
            plugin_with(SimulatedHost::typical().with_permission(PermissionStatus::Denied));

        let error = assert_err!(plugin.start_camera(small_picture()).await);
        assert!(error.contains("Permission not granted"));
        assert!(plugin.session_info().await.is_none());
    }

    #[tokio::test]
    async fn test_missing_facing_is_reported() {
        let (plugin, _host) = plugin_with(SimulatedHost::typical());
        let error = assert_err!(
            plugin
                .start_camera(StartCameraOptions {
                    facing: Some(Facing::External),
                    ..Default::default()
                })
                .await
        );
        assert!(error.contains("no longer connected"));
    }

    #[tokio::test]
    async fn test_take_picture_without_camera() {
        let (plugin, _host) = plugin_with(SimulatedHost::typical());
        let error = assert_err!(plugin.take_picture().await);
        assert_eq!(error, "No active capture session");
    }

    #[tokio::test]
    async fn test_capture_failure_is_reported() {
        let (plugin, host) = plugin_with(SimulatedHost::typical());
        assert_ok!(plugin.start_camera(small_picture()).await);
        host.last_backend().unwrap().fail_capture_async("sensor timeout");

        let error = assert_err!(plugin.take_picture().await);
        assert_eq!(error, "Capture error: sensor timeout");

        // The session stays usable after a failed shot.
        assert_eq!(
            plugin.session_info().await.unwrap().state,
            SessionState::PreviewActive
        );
        assert_ok!(plugin.close().await);
    }

    #[tokio::test]
    async fn test_close_without_camera_succeeds() {
        let (plugin, _host) = plugin_with(SimulatedHost::typical());
        assert_ok!(plugin.close().await);
    }

    #[tokio::test]
    async fn test_supported_sizes_follow_rotation() {
        let (plugin, _host) = plugin_with(SimulatedHost::typical());

        let portrait = assert_ok!(
            plugin
                .get_supported_sizes(SupportedSizesOptions {
                    facing: None,
                    format: ImageFormat::Jpeg,
                    display_rotation: None,
                })
                .await
        );
        assert_eq!(
            portrait,
            vec![
                Size::new(480, 640),
                Size::new(720, 1280),
                Size::new(1080, 1920)
            ]
        );

        let landscape = assert_ok!(
            plugin
                .get_supported_sizes(SupportedSizesOptions {
                    facing: None,
                    format: ImageFormat::Jpeg,
                    display_rotation: Some(90),
                })
                .await
        );
        assert_eq!(landscape[0], Size::new(640, 480));

        let front_raw = assert_ok!(
            plugin
                .get_supported_sizes(SupportedSizesOptions {
                    facing: Some(Facing::Front),
                    format: ImageFormat::RawSensor,
                    display_rotation: None,
                })
                .await
        );
        assert!(front_raw.is_empty());
    }

    #[tokio::test]
    async fn test_installed_plugin_commands() {
        commands::install(CameraPlugin::new(
            Arc::new(SimulatedHost::typical()),
            PreviewConfig::default(),
        ));

        assert_ok!(commands::start_camera(small_picture()).await);
        let image = assert_ok!(commands::take_picture().await);
        assert_eq!(image.size(), Size::new(64, 48));
        let sizes = assert_ok!(
            commands::get_supported_sizes(SupportedSizesOptions {
                facing: Some(Facing::Front),
                format: ImageFormat::Private,
                display_rotation: Some(0),
            })
            .await
        );
        assert_eq!(sizes.len(), 2);
        assert_ok!(commands::close().await);
    }

    #[tokio::test]
    async fn test_check_permission_reports_host_status() {
        let (plugin, _host) = plugin_with(SimulatedHost::typical());
        let granted = assert_ok!(plugin.check_permission().await);
        assert_eq!(granted.status, PermissionStatus::Granted);
        assert!(!granted.can_request);

        let (plugin, _host) =
            plugin_with(SimulatedHost::typical().with_permission(PermissionStatus::Denied));
        let denied = assert_ok!(plugin.check_permission().await);
        assert_eq!(denied.status, PermissionStatus::Denied);
        assert!(denied.can_request);
        assert_eq!(denied.message, "Camera access denied");
    }
}
