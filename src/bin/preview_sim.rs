//! Drive the camera commands against the simulated platform.
//!
//! Usage: preview-sim [config.toml] [--shots N] [--front] [--json]

use anyhow::{anyhow, Context, Result};
use crabpreview::commands::{CameraPlugin, StartCameraOptions, SupportedSizesOptions};
use crabpreview::config::PreviewConfig;
use crabpreview::testing::SimulatedHost;
use crabpreview::types::{Facing, ImageFormat, Size};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    crabpreview::init_logging();

    let args: Vec<String> = std::env::args().collect();
    let mut config_path = None;
    let mut shots = 3;
    let mut facing = None;
    let mut json = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--shots" => {
                i += 1;
                let value = args.get(i).ok_or_else(|| anyhow!("--shots needs a value"))?;
                shots = value.parse().context("invalid shot count")?;
            }
            "--front" => facing = Some(Facing::Front),
            "--json" => json = true,
            other => config_path = Some(other.to_string()),
        }
        i += 1;
    }

    let config = match config_path {
        Some(path) => PreviewConfig::load_from_file(&path)
            .with_context(|| format!("loading {}", path))?,
        None => PreviewConfig::load_or_default(),
    };
    config.validate().context("invalid configuration")?;

    let host = Arc::new(SimulatedHost::typical().with_display_rotation(0));
    let plugin = CameraPlugin::new(host, config);

    let sizes = plugin
        .get_supported_sizes(SupportedSizesOptions {
            facing,
            format: ImageFormat::Private,
            display_rotation: None,
        })
        .await
        .map_err(|e| anyhow!(e))?;
    println!("Preview sizes: {:?}", sizes);

    plugin
        .start_camera(StartCameraOptions {
            facing,
            preview: Some(Size::new(600, 800)),
            ..Default::default()
        })
        .await
        .map_err(|e| anyhow!(e))?;

    if let Some(info) = plugin.session_info().await {
        println!("{}", serde_json::to_string(&info)?);
    }

    for _ in 0..shots {
        let image = plugin.take_picture().await.map_err(|e| anyhow!(e))?;
        if json {
            println!(
                "{}",
                serde_json::json!({
                    "width": image.width,
                    "height": image.height,
                    "format": image.format.as_str(),
                    "timestamp_ns": image.timestamp_ns,
                    "bytes": image.byte_len(),
                })
            );
        } else {
            println!(
                "Frame: {}x{} {} ts:{} ({} bytes)",
                image.width,
                image.height,
                image.format.as_str(),
                image.timestamp_ns,
                image.byte_len()
            );
        }
    }

    plugin.close().await.map_err(|e| anyhow!(e))?;
    Ok(())
}
