//! Configuration management for crabpreview
//!
//! Defaults for which camera to open, the still-capture target and the
//! preview surface, loaded from and saved to TOML.

use crate::errors::CameraError;
use crate::types::{Facing, ImageFormat, Size};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewConfig {
    pub camera: CameraConfig,
    #[serde(default)]
    pub preview: PreviewSection,
}

/// Camera selection and still capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Camera opened when a start request names no facing
    pub default_facing: Facing,
    /// Still-capture size [width, height]
    pub picture_size: [u32; 2],
    /// Still-capture stream format
    pub picture_format: ImageFormat,
    /// Frames the still-capture target may hold at once
    pub max_images: u32,
}

/// Preview surface defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewSection {
    /// Attach a preview surface when the host can provide one
    pub enabled: bool,
    /// Requested minimum preview size when a start request gives none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_size: Option<[u32; 2]>,
}

impl Default for PreviewSection {
    fn default() -> Self {
        Self {
            enabled: true,
            min_size: None,
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                default_facing: Facing::Back,
                picture_size: [1920, 1080],
                picture_format: ImageFormat::Jpeg,
                max_images: 5,
            },
            preview: PreviewSection::default(),
        }
    }
}

impl PreviewConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, CameraError> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let config: PreviewConfig = toml::from_str(&contents)
            .map_err(|e| CameraError::Config(format!("Failed to parse config file: {}", e)))?;

        log::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), CameraError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| CameraError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, toml_string)?;

        log::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get default config file path
    pub fn default_path() -> PathBuf {
        PathBuf::from("crabpreview.toml")
    }

    /// Load from default location, falling back to defaults
    pub fn load_or_default() -> Self {
        Self::load_from_file(Self::default_path()).unwrap_or_else(|e| {
            log::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    pub fn picture_size(&self) -> Size {
        self.camera.picture_size.into()
    }

    pub fn preview_min_size(&self) -> Option<Size> {
        self.preview.min_size.map(Size::from)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), CameraError> {
        let [w, h] = self.camera.picture_size;
        if w == 0 || h == 0 {
            return Err(CameraError::Config("Invalid picture size".to_string()));
        }
        if self.camera.picture_format == ImageFormat::Private {
            return Err(CameraError::Config(
                "Picture format must be a readable image format".to_string(),
            ));
        }
        if self.camera.max_images == 0 || self.camera.max_images > 32 {
            return Err(CameraError::Config(
                "Max images must be between 1 and 32".to_string(),
            ));
        }
        if let Some([w, h]) = self.preview.min_size {
            if w == 0 || h == 0 {
                return Err(CameraError::Config("Invalid preview size".to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PreviewConfig::default();
        assert_eq!(config.camera.default_facing, Facing::Back);
        assert_eq!(config.picture_size(), Size::new(1920, 1080));
        assert_eq!(config.camera.max_images, 5);
        assert!(config.preview.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut bad_size = PreviewConfig::default();
        bad_size.camera.picture_size = [0, 1080];
        assert!(bad_size.validate().is_err());

        let mut bad_format = PreviewConfig::default();
        bad_format.camera.picture_format = ImageFormat::Private;
        assert!(bad_format.validate().is_err());

        let mut bad_images = PreviewConfig::default();
        bad_images.camera.max_images = 64;
        assert!(bad_images.validate().is_err());

        let mut bad_preview = PreviewConfig::default();
        bad_preview.preview.min_size = Some([640, 0]);
        assert!(bad_preview.validate().is_err());
    }

    #[test]
    fn test_config_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("nested").join("crabpreview.toml");

        let mut config = PreviewConfig::default();
        config.camera.default_facing = Facing::Front;
        config.preview.min_size = Some([1000, 700]);
        config.save_to_file(&config_path).unwrap();

        let loaded = PreviewConfig::load_from_file(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_toml_format() {
        let toml_string = toml::to_string_pretty(&PreviewConfig::default()).unwrap();
        assert!(toml_string.contains("[camera]"));
        assert!(toml_string.contains("[preview]"));
        assert!(toml_string.contains("default_facing = \"back\""));
        assert!(toml_string.contains("picture_format = \"jpeg\""));
    }

    #[test]
    fn test_preview_section_optional() {
        let config: PreviewConfig = toml::from_str(
            r#"
            [camera]
            default_facing = "front"
            picture_size = [640, 480]
            picture_format = "yuv_420_888"
            max_images = 2
            "#,
        )
        .unwrap();
        assert!(config.preview.enabled);
        assert_eq!(config.camera.picture_format, ImageFormat::Yuv420_888);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = PreviewConfig::load_from_file("nonexistent_crabpreview.toml");
        assert_eq!(result.unwrap(), PreviewConfig::default());
    }
}
