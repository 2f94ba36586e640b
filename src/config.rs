use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MediaConfig {
    pub capture: CaptureConfig,
    pub normalizer: NormalizerConfig,
    pub persistence: PersistenceConfig,
    pub media: MediaListConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CaptureConfig {
    /// Resolution requested from the device when it has no native preference (width, height)
    #[serde(default = "default_ideal_resolution")]
    pub ideal_resolution: (u32, u32),

    /// JPEG quality of snapshots, 0..1
    #[serde(default = "default_snapshot_quality")]
    pub snapshot_quality: f32,

    /// Hard ceiling on clip length; recording stops by itself at this point
    #[serde(default = "default_max_recording_seconds")]
    pub max_recording_seconds: u32,

    /// Preferred camera ("environment" or "user")
    #[serde(default = "default_facing_mode")]
    pub facing_mode: String,

    /// Whether local audio monitoring starts muted
    #[serde(default = "default_start_muted")]
    pub start_muted: bool,
}

/// Resize + re-encode parameters for one call site
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq)]
pub struct NormalizePreset {
    /// Longest side of the output, in pixels
    pub max_dimension: u32,

    /// JPEG quality, 0..1
    pub quality: f32,

    /// Inputs at or below this many bytes pass through untouched
    #[serde(default)]
    pub min_input_bytes: Option<usize>,
}

impl NormalizePreset {
    pub const PROFILE: NormalizePreset = NormalizePreset {
        max_dimension: 300,
        quality: 0.7,
        min_input_bytes: Some(500_000),
    };

    pub const LOGO: NormalizePreset = NormalizePreset {
        max_dimension: 400,
        quality: 0.8,
        min_input_bytes: None,
    };
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct NormalizerConfig {
    /// Preset applied to profile images before they are persisted locally
    #[serde(default = "default_profile_preset")]
    pub profile: NormalizePreset,

    /// Preset applied to company logo and personal photo uploads
    #[serde(default = "default_logo_preset")]
    pub logo: NormalizePreset,

    /// Logo uploads above this size are rejected outright
    #[serde(default = "default_max_logo_upload_bytes")]
    pub max_logo_upload_bytes: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PersistenceConfig {
    #[serde(default = "default_token_key")]
    pub token_key: String,

    #[serde(default = "default_user_key")]
    pub user_key: String,

    /// Total capacity of the local key/value store in bytes
    #[serde(default = "default_capacity_bytes")]
    pub capacity_bytes: usize,

    /// Embedded profile images above this estimated size are never written
    #[serde(default = "default_max_inline_image_bytes")]
    pub max_inline_image_bytes: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MediaListConfig {
    /// Prefix the backend serves persisted media under
    #[serde(default = "default_server_base_url")]
    pub server_base_url: String,
}

impl MediaConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("dealer-media.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default(
                "capture.ideal_resolution",
                vec![default_ideal_resolution().0, default_ideal_resolution().1],
            )?
            .set_default(
                "capture.snapshot_quality",
                default_snapshot_quality() as f64,
            )?
            .set_default(
                "capture.max_recording_seconds",
                default_max_recording_seconds(),
            )?
            .set_default("capture.facing_mode", default_facing_mode())?
            .set_default("capture.start_muted", default_start_muted())?
            .set_default(
                "normalizer.profile.max_dimension",
                NormalizePreset::PROFILE.max_dimension,
            )?
            .set_default(
                "normalizer.profile.quality",
                NormalizePreset::PROFILE.quality as f64,
            )?
            .set_default("normalizer.profile.min_input_bytes", 500_000_i64)?
            .set_default(
                "normalizer.logo.max_dimension",
                NormalizePreset::LOGO.max_dimension,
            )?
            .set_default(
                "normalizer.logo.quality",
                NormalizePreset::LOGO.quality as f64,
            )?
            .set_default(
                "normalizer.max_logo_upload_bytes",
                default_max_logo_upload_bytes() as i64,
            )?
            .set_default("persistence.token_key", default_token_key())?
            .set_default("persistence.user_key", default_user_key())?
            .set_default(
                "persistence.capacity_bytes",
                default_capacity_bytes() as i64,
            )?
            .set_default(
                "persistence.max_inline_image_bytes",
                default_max_inline_image_bytes() as i64,
            )?
            .set_default("media.server_base_url", default_server_base_url())?
            .add_source(File::with_name(&path_str).required(false))
            // DEALER_MEDIA_CAPTURE__MAX_RECORDING_SECONDS=15
            .add_source(
                Environment::with_prefix("DEALER_MEDIA")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: MediaConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capture.ideal_resolution.0 == 0 || self.capture.ideal_resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Capture ideal_resolution must be greater than 0".to_string(),
            ));
        }

        if self.capture.max_recording_seconds == 0 {
            return Err(ConfigError::Message(
                "Capture max_recording_seconds must be greater than 0".to_string(),
            ));
        }

        validate_quality("capture.snapshot_quality", self.capture.snapshot_quality)?;

        for (name, preset) in [
            ("normalizer.profile", &self.normalizer.profile),
            ("normalizer.logo", &self.normalizer.logo),
        ] {
            if preset.max_dimension == 0 {
                return Err(ConfigError::Message(format!(
                    "{}.max_dimension must be greater than 0",
                    name
                )));
            }
            validate_quality(name, preset.quality)?;
        }

        if self.persistence.token_key.is_empty() || self.persistence.user_key.is_empty() {
            return Err(ConfigError::Message(
                "Persistence keys must not be empty".to_string(),
            ));
        }

        if self.persistence.token_key == self.persistence.user_key {
            return Err(ConfigError::Message(
                "Persistence token_key and user_key must differ".to_string(),
            ));
        }

        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

fn validate_quality(name: &str, quality: f32) -> Result<(), ConfigError> {
    if !(quality > 0.0 && quality <= 1.0) {
        return Err(ConfigError::Message(format!(
            "{} quality must be within (0, 1], got {}",
            name, quality
        )));
    }
    Ok(())
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            normalizer: NormalizerConfig {
                profile: default_profile_preset(),
                logo: default_logo_preset(),
                max_logo_upload_bytes: default_max_logo_upload_bytes(),
            },
            persistence: PersistenceConfig::default(),
            media: MediaListConfig::default(),
        }
    }
}

impl Default for MediaListConfig {
    fn default() -> Self {
        Self {
            server_base_url: default_server_base_url(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            ideal_resolution: default_ideal_resolution(),
            snapshot_quality: default_snapshot_quality(),
            max_recording_seconds: default_max_recording_seconds(),
            facing_mode: default_facing_mode(),
            start_muted: default_start_muted(),
        }
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            token_key: default_token_key(),
            user_key: default_user_key(),
            capacity_bytes: default_capacity_bytes(),
            max_inline_image_bytes: default_max_inline_image_bytes(),
        }
    }
}

// Default value functions
fn default_ideal_resolution() -> (u32, u32) {
    (1280, 720)
}
fn default_snapshot_quality() -> f32 {
    0.9
}
fn default_max_recording_seconds() -> u32 {
    30
}
fn default_facing_mode() -> String {
    "environment".to_string()
}
fn default_start_muted() -> bool {
    true
}

fn default_profile_preset() -> NormalizePreset {
    NormalizePreset::PROFILE
}
fn default_logo_preset() -> NormalizePreset {
    NormalizePreset::LOGO
}
fn default_max_logo_upload_bytes() -> usize {
    2 * 1024 * 1024
}

fn default_token_key() -> String {
    "token".to_string()
}
fn default_user_key() -> String {
    "user".to_string()
}
fn default_capacity_bytes() -> usize {
    5 * 1024 * 1024
}
fn default_max_inline_image_bytes() -> usize {
    1_000_000
}

fn default_server_base_url() -> String {
    "http://localhost:3001".to_string()
}
