//! Subcommand handlers for list-devices and config actions.

use std::path::Path;

use super::args::ConfigAction;
use crate::config::{default_path, Config, ConfigError};

/// Print the devices the recorder can use.
#[cfg(feature = "devices")]
pub fn list_devices(video: bool, audio: bool) {
    use crate::devices::{discover, DeviceFilter};

    let list = discover(DeviceFilter::from_flags(video, audio));
    if list.screens.is_empty() && list.cameras.is_empty() && list.microphones.is_empty() {
        println!("No capture devices found.");
        println!();
        println!("On macOS, grant access in System Settings > Privacy & Security");
        println!("(Screen Recording, Camera and Microphone).");
    } else {
        print!("{}", list);
        println!("Use --camera-device <index> to select a camera.");
    }
    for e in &list.errors {
        log::debug!("Device query failed: {}", e);
    }
}

/// Handle config subcommand actions.
pub fn handle_config_action(
    action: ConfigAction,
    path: Option<&Path>,
) -> Result<(), ConfigCommandError> {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(default_path);
    match action {
        ConfigAction::Show => {
            let config = Config::load(Some(&config_path))?;
            if config_path.exists() {
                println!("# {} (exists)", config_path.display());
            } else {
                println!("# {} (not found, showing defaults)", config_path.display());
            }
            print!("{}", config.to_toml()?);
            Ok(())
        }
        ConfigAction::Init => {
            let written = init_config(&config_path)?;
            println!("Created config file: {}", written.display());
            Ok(())
        }
    }
}

/// Write the default configuration to `path`, refusing to overwrite.
pub fn init_config(path: &Path) -> Result<&Path, ConfigCommandError> {
    if path.exists() {
        return Err(ConfigCommandError::AlreadyExists(path.to_path_buf()));
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let text = format!(
        "# overlay-recorder configuration\n\n{}",
        Config::default().to_toml()?
    );
    std::fs::write(path, text)?;
    Ok(path)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigCommandError {
    #[error("config file already exists: {} (use 'overlay-recorder config show')", .0.display())]
    AlreadyExists(std::path::PathBuf),
    #[error(transparent)]
    Load(#[from] ConfigError),
    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("cannot write config file: {0}")]
    Io(#[from] std::io::Error),
}
