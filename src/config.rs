//! Configuration file handling for overlay-recorder.
//!
//! Loads configuration from `~/.config/overlay-recorder/config.toml` or a custom path.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::audio::AudioFormat;
use crate::session::SessionConfig;

/// Configuration file structure for overlay-recorder.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub video: VideoConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub audio: AudioConfig,
}

/// Where recordings go. File names are relative to `dir`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub video_file: String,
    pub audio_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            video_file: "screen_recording.avi".to_string(),
            audio_file: "audio_recording.wav".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Capture period in milliseconds
    pub tick_interval_ms: u64,
    /// Frame rate written into the container
    pub encoder_fps: f64,
    /// ffmpeg encoder
    pub codec: String,
    /// Container codec tag; empty for none
    pub fourcc: String,
    /// ffmpeg executable
    pub ffmpeg: String,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 30,
            encoder_fps: 20.0,
            codec: "mpeg4".to_string(),
            fourcc: "xvid".to_string(),
            ffmpeg: "ffmpeg".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct CameraConfig {
    /// Overlay flag at startup
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub device: u32,
    #[serde(default)]
    pub mirror: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AudioConfig {
    pub enabled: bool,
    /// Input device name; empty for the system default
    pub device: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub block_size: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        let format = AudioFormat::default();
        Self {
            enabled: true,
            device: String::new(),
            sample_rate: format.sample_rate,
            channels: format.channels,
            block_size: format.block_size,
        }
    }
}

impl AudioConfig {
    pub fn format(&self) -> AudioFormat {
        AudioFormat {
            sample_rate: self.sample_rate,
            channels: self.channels,
            block_size: self.block_size,
        }
    }

    /// Named input device, if one is configured.
    pub fn device_name(&self) -> Option<String> {
        let name = self.device.trim();
        (!name.is_empty()).then(|| name.to_string())
    }
}

impl VideoConfig {
    pub fn fourcc(&self) -> Option<String> {
        let tag = self.fourcc.trim();
        (!tag.is_empty()).then(|| tag.to_string())
    }
}

impl Config {
    /// Load configuration from a file path.
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but cannot be parsed or holds
    /// values the recorder cannot use.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.map(PathBuf::from).unwrap_or_else(default_path);

        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError {
            path: path.clone(),
            source: e,
        })?;
        let config = Self::parse(&content).map_err(|e| match e {
            ConfigError::ParseError { source, .. } => ConfigError::ParseError {
                path: path.clone(),
                source,
            },
            ConfigError::Invalid { message, .. } => ConfigError::Invalid {
                path: path.clone(),
                message,
            },
            other => other,
        })?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content).map_err(|e| ConfigError::ParseError {
            path: PathBuf::new(),
            source: e,
        })?;
        config.validate().map_err(|message| ConfigError::Invalid {
            path: PathBuf::new(),
            message,
        })?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.video.tick_interval_ms == 0 {
            return Err("video.tick_interval_ms must be at least 1".to_string());
        }
        if !(self.video.encoder_fps.is_finite() && self.video.encoder_fps > 0.0) {
            return Err(format!(
                "video.encoder_fps must be positive, got {}",
                self.video.encoder_fps
            ));
        }
        if self.video.codec.trim().is_empty() {
            return Err("video.codec must not be empty".to_string());
        }
        if !(1..=2).contains(&self.audio.channels) {
            return Err(format!(
                "audio.channels must be 1 or 2, got {}",
                self.audio.channels
            ));
        }
        if self.audio.sample_rate == 0 || self.audio.block_size == 0 {
            return Err("audio.sample_rate and audio.block_size must be positive".to_string());
        }
        if self.output.video_file.trim().is_empty() || self.output.audio_file.trim().is_empty() {
            return Err("output file names must not be empty".to_string());
        }
        Ok(())
    }

    /// Session settings derived from this configuration.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            output_dir: self.output.dir.clone(),
            video_file: self.output.video_file.clone(),
            audio_file: self.output.audio_file.clone(),
            tick_interval: Duration::from_millis(self.video.tick_interval_ms),
            encoder_fps: self.video.encoder_fps,
            camera_mirror: self.camera.mirror,
            audio_enabled: self.audio.enabled,
            audio_format: self.audio.format(),
        }
    }

    /// The file `config init` writes.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    Invalid {
        path: PathBuf,
        message: String,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError { path, source } => {
                write!(
                    f,
                    "Failed to read config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::ParseError { path, source } => {
                write!(
                    f,
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    source
                )
            }
            ConfigError::Invalid { path, message } => {
                write!(f, "Invalid config file '{}': {}", path.display(), message)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            ConfigError::Invalid { .. } => None,
        }
    }
}

/// Get the default config file path.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("overlay-recorder").join("config.toml"))
        .unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config/overlay-recorder/config.toml")
        })
}
