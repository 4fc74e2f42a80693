use clap::Parser;
use std::error::Error;
use std::sync::Arc;

use tokio::sync::{mpsc, Notify};

use overlay_recorder::audio::{AudioProvider, CpalAudio, WavFinalizer};
use overlay_recorder::camera::{CameraSettings, NokhwaCameras};
use overlay_recorder::capture::PrimaryScreen;
use overlay_recorder::cli::{self, control, Args, Command};
use overlay_recorder::config::{Config, ConfigError};
use overlay_recorder::session::{Devices, RecordingSession};
use overlay_recorder::video::FfmpegSinkFactory;

/// Load config. An explicit `--config` must exist; a broken default file
/// falls back to built-in defaults with a warning.
fn load_config(args: &Args) -> Result<Config, ConfigError> {
    match &args.config {
        Some(path) if !path.exists() => Err(ConfigError::IoError {
            path: path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        }),
        Some(path) => Config::load(Some(path)),
        None => match Config::load(None) {
            Ok(c) => Ok(c),
            Err(e) => {
                eprintln!("Warning: Failed to load config file: {}", e);
                eprintln!("Using default settings.\n");
                Ok(Config::default())
            }
        },
    }
}

fn build_devices(config: &Config) -> Result<Devices, Box<dyn Error>> {
    let screen = PrimaryScreen::open()?;
    let camera = NokhwaCameras::new(CameraSettings {
        device_index: config.camera.device,
        ..CameraSettings::default()
    });
    let audio = config.audio.enabled.then(|| {
        Arc::new(CpalAudio::new(config.audio.device_name())) as Arc<dyn AudioProvider>
    });
    let video = FfmpegSinkFactory {
        program: config.video.ffmpeg.clone(),
        codec: config.video.codec.clone(),
        fourcc: config.video.fourcc(),
    };

    Ok(Devices {
        screen: Box::new(screen),
        camera: Box::new(camera),
        audio,
        video: Box::new(video),
        finalizer: Box::new(WavFinalizer),
    })
}

fn run_recorder(args: &Args) -> Result<(), Box<dyn Error>> {
    let mut config = load_config(args)?;
    args.apply_to(&mut config);

    let devices = build_devices(&config)?;
    let mut session = RecordingSession::new(config.session_config(), devices);
    session.set_overlay_enabled(config.camera.enabled);

    let quit = Arc::new(Notify::new());
    let signal = Arc::clone(&quit);
    ctrlc::set_handler(move || {
        signal.notify_one();
        eprintln!("\nReceived Ctrl+C, shutting down...");
    })?;

    println!("overlay-recorder ready. Commands: start, stop, camera on|off, status, quit");
    if args.autostart {
        session.start()?;
        println!("Recording. Type 'stop' to finish.");
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let summaries = runtime.block_on(async {
        let (tx, rx) = mpsc::unbounded_channel();
        let _reader = control::spawn_stdin_reader(tx);
        control::run(&mut session, rx, &quit).await
    });
    // A pending stdin read would otherwise hold up exit until Enter.
    runtime.shutdown_background();

    log::debug!("Exiting after {} recording(s)", summaries.len());
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    match &args.command {
        Some(Command::ListDevices { video, audio }) => cli::list_devices(*video, *audio),
        Some(Command::Config { action }) => {
            if let Err(e) = cli::handle_config_action(action.clone(), args.config.as_deref()) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        None => {
            if let Err(e) = run_recorder(&args) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}
