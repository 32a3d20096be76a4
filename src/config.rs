//! Hostbridge Configuration
//!
//! Handles parsing and management of hostbridge.toml configuration files and
//! the process-wide active configuration consulted by the adapters.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration file name searched for by [`BridgeConfig::find_and_load`].
pub const CONFIG_FILE_NAME: &str = "hostbridge.toml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Root configuration structure matching hostbridge.toml.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct BridgeConfig {
    /// Output size limits for untrusted input
    #[serde(default)]
    pub limits: LimitsConfig,

    /// LZ4 tuning
    #[serde(default)]
    pub lz4: Lz4Config,

    /// BlurHash decoding
    #[serde(default)]
    pub blurhash: BlurhashConfig,

    /// Image encoding
    #[serde(default)]
    pub image: ImageConfig,
}

impl BridgeConfig {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration text.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: BridgeConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Find and load configuration by searching up from the given directory.
    pub fn find_and_load(start_dir: &Path) -> ConfigResult<Self> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Self::load(&config_path);
            }
            if !dir.pop() {
                // Reached root without finding config
                return Ok(Self::default());
            }
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check value ranges.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.limits.max_output_bytes == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_output_bytes must be positive".to_string(),
            ));
        }
        if self.limits.max_image_pixels == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_image_pixels must be positive".to_string(),
            ));
        }
        if self.lz4.acceleration < 1 {
            return Err(ConfigError::Invalid(format!(
                "lz4.acceleration must be at least 1, got {}",
                self.lz4.acceleration
            )));
        }
        if !(1..=12).contains(&self.lz4.hc_level) {
            return Err(ConfigError::Invalid(format!(
                "lz4.hc_level must be in 1..=12, got {}",
                self.lz4.hc_level
            )));
        }
        if !self.blurhash.punch.is_finite() || self.blurhash.punch <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "blurhash.punch must be a positive number, got {}",
                self.blurhash.punch
            )));
        }
        if !(1..=100).contains(&self.image.jpeg_quality) {
            return Err(ConfigError::Invalid(format!(
                "image.jpeg_quality must be in 1..=100, got {}",
                self.image.jpeg_quality
            )));
        }
        Ok(())
    }
}

/// Output size limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Largest buffer an allocating transform may produce from untrusted input
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,

    /// Largest image (width * height) accepted by the image adapters
    #[serde(default = "default_max_image_pixels")]
    pub max_image_pixels: u64,
}

fn default_max_output_bytes() -> usize {
    256 * 1024 * 1024
}

fn default_max_image_pixels() -> u64 {
    64 * 1024 * 1024
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_output_bytes: default_max_output_bytes(),
            max_image_pixels: default_max_image_pixels(),
        }
    }
}

/// LZ4 tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lz4Config {
    /// Acceleration used by the registry's fast compression entry
    #[serde(default = "default_acceleration")]
    pub acceleration: i32,

    /// Level used by the registry's high-compression entry
    #[serde(default = "default_hc_level")]
    pub hc_level: i32,
}

fn default_acceleration() -> i32 {
    1
}

fn default_hc_level() -> i32 {
    9
}

impl Default for Lz4Config {
    fn default() -> Self {
        Self {
            acceleration: default_acceleration(),
            hc_level: default_hc_level(),
        }
    }
}

/// BlurHash decoding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlurhashConfig {
    /// Contrast multiplier applied when decoding
    #[serde(default = "default_punch")]
    pub punch: f32,
}

fn default_punch() -> f32 {
    1.0
}

impl Default for BlurhashConfig {
    fn default() -> Self {
        Self {
            punch: default_punch(),
        }
    }
}

/// Image encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageConfig {
    /// JPEG quality (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,
}

fn default_jpeg_quality() -> u8 {
    85
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: default_jpeg_quality(),
        }
    }
}

// =============================================================================
// Active configuration
// =============================================================================

lazy_static::lazy_static! {
    static ref ACTIVE: RwLock<BridgeConfig> = RwLock::new(BridgeConfig::default());
}

/// Validate and install `config` as the process-wide active configuration.
pub fn install(config: BridgeConfig) -> ConfigResult<()> {
    config.validate()?;
    *ACTIVE.write() = config;
    tracing::debug!(?config, "configuration installed");
    Ok(())
}

/// The active configuration (defaults until [`install`] is called).
pub fn active() -> BridgeConfig {
    *ACTIVE.read()
}
