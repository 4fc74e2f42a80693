//! Command-line interface definitions and helpers.
//!
//! This module contains CLI argument parsing, the interactive command loop,
//! and subcommand handlers.

mod args;
mod commands;
pub mod control;

pub use args::{Args, Command, ConfigAction};
pub use commands::{handle_config_action, init_config, ConfigCommandError};
#[cfg(feature = "devices")]
pub use commands::list_devices;
pub use control::ControlCommand;
