//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Screen recorder with a camera overlay and separate microphone track
#[derive(Parser, Debug)]
#[command(name = "overlay-recorder")]
#[command(version, about = "Record the screen with a webcam overlay and microphone audio", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Config file path
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Start with the camera overlay enabled
    #[arg(long)]
    pub camera: bool,

    /// Camera device index (from list-devices)
    #[arg(long)]
    pub camera_device: Option<u32>,

    /// Mirror the camera horizontally
    #[arg(long)]
    pub mirror: bool,

    /// Directory for the video and audio files
    #[arg(long, short)]
    pub output_dir: Option<PathBuf>,

    /// Record video only
    #[arg(long)]
    pub no_audio: bool,

    /// Start recording immediately
    #[arg(long)]
    pub autostart: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List screens, cameras and microphones
    ListDevices {
        /// Only list screens and cameras
        #[arg(long)]
        video: bool,
        /// Only list microphones
        #[arg(long)]
        audio: bool,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Create default config file
    Init,
}

impl Args {
    /// Apply command-line overrides on top of the loaded config.
    pub fn apply_to(&self, config: &mut crate::config::Config) {
        if self.camera {
            config.camera.enabled = true;
        }
        if let Some(device) = self.camera_device {
            config.camera.device = device;
        }
        if self.mirror {
            config.camera.mirror = true;
        }
        if let Some(dir) = &self.output_dir {
            config.output.dir = dir.clone();
        }
        if self.no_audio {
            config.audio.enabled = false;
        }
    }
}
