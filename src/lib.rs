//! overlay-recorder library crate.
//!
//! Screen capture on a fixed cadence with an optional camera overlay,
//! encoded by ffmpeg, plus a separately recorded microphone track. The
//! device backends live behind the `devices` feature; everything else,
//! including the [`session::RecordingSession`] state machine, builds and
//! tests without them.

pub mod audio;
pub mod camera;
pub mod capture;
pub mod cli;
pub mod compositor;
pub mod config;
#[cfg(feature = "devices")]
pub mod devices;
pub mod frame;
pub mod pipeline;
pub mod scheduler;
pub mod session;
pub mod video;
