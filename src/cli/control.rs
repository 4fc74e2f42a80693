//! Interactive control of a running recorder.
//!
//! Commands arrive on a channel (normally fed line by line from stdin) and
//! are multiplexed with the capture ticker and the quit signal in one
//! `select!` loop, so the session is only ever touched from one task.

use std::str::FromStr;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::scheduler::CaptureScheduler;
use crate::session::{RecordingSession, RecordingSummary};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Start,
    Stop,
    Camera(bool),
    Status,
    Help,
    Quit,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown command '{0}' (try: start, stop, camera on|off, status, help, quit)")]
pub struct UnknownCommand(pub String);

impl FromStr for ControlCommand {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let words: Vec<String> = s.split_whitespace().map(str::to_lowercase).collect();
        let words: Vec<&str> = words.iter().map(String::as_str).collect();
        match words.as_slice() {
            ["start"] | ["record"] => Ok(ControlCommand::Start),
            ["stop"] => Ok(ControlCommand::Stop),
            ["camera", "on"] => Ok(ControlCommand::Camera(true)),
            ["camera", "off"] => Ok(ControlCommand::Camera(false)),
            ["status"] => Ok(ControlCommand::Status),
            ["help"] | ["?"] => Ok(ControlCommand::Help),
            ["quit"] | ["exit"] | ["q"] => Ok(ControlCommand::Quit),
            _ => Err(UnknownCommand(s.trim().to_string())),
        }
    }
}

/// Read commands from stdin until EOF. Blank lines are ignored and unknown
/// commands are reported on stderr. Dropping `tx` at EOF closes the channel.
///
/// tokio cannot cancel a pending stdin read, so the runtime running this
/// task should be shut down with `shutdown_background`.
pub fn spawn_stdin_reader(tx: UnboundedSender<ControlCommand>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<ControlCommand>() {
                Ok(cmd) => {
                    if tx.send(cmd).is_err() {
                        break;
                    }
                }
                Err(e) => eprintln!("{}", e),
            }
        }
    })
}

/// Drive `session` until a quit command, a `quit` notification, or the
/// command channel closing while idle. A recording runs on until `quit`
/// even after input closes. Any recording in progress is stopped before
/// returning. Returns the summary of every recording that finished.
pub async fn run(
    session: &mut RecordingSession,
    mut commands: UnboundedReceiver<ControlCommand>,
    quit: &Notify,
) -> Vec<RecordingSummary> {
    let mut summaries = Vec::new();
    let mut ticker: Option<CaptureScheduler> = None;
    let mut input_open = true;

    loop {
        // One ticker per recording, created on start and dropped on stop.
        if session.is_recording() != ticker.is_some() {
            ticker = session
                .is_recording()
                .then(|| CaptureScheduler::new(session.config().tick_interval));
        }
        if !input_open && !session.is_recording() {
            break;
        }

        tokio::select! {
            _ = quit.notified() => break,
            cmd = commands.recv(), if input_open => match cmd {
                Some(ControlCommand::Quit) => break,
                Some(cmd) => handle(session, cmd, &mut summaries),
                None => {
                    log::debug!("Command input closed");
                    input_open = false;
                }
            },
            skipped = next_tick(&mut ticker) => {
                session.tick(skipped);
            }
        }
    }

    if let Some(summary) = session.shutdown() {
        println!("Saved {}", summary);
        summaries.push(summary);
    }
    summaries
}

/// Next tick of `ticker`, or never while idle.
async fn next_tick(ticker: &mut Option<CaptureScheduler>) -> u64 {
    match ticker {
        Some(ticker) => ticker.tick().await,
        None => std::future::pending().await,
    }
}

fn handle(
    session: &mut RecordingSession,
    cmd: ControlCommand,
    summaries: &mut Vec<RecordingSummary>,
) {
    match cmd {
        ControlCommand::Start => {
            if session.is_recording() {
                println!("Already recording.");
            } else if let Err(e) = session.start() {
                log::error!("Could not start recording: {}", e);
            } else {
                println!("Recording. Type 'stop' to finish.");
            }
        }
        ControlCommand::Stop => match session.stop() {
            Some(summary) => {
                println!("Saved {}", summary);
                summaries.push(summary);
            }
            None => println!("Not recording."),
        },
        ControlCommand::Camera(enabled) => {
            session.set_overlay_enabled(enabled);
            println!("Camera overlay {}.", if enabled { "on" } else { "off" });
        }
        ControlCommand::Status => println!("{}", status_line(session)),
        ControlCommand::Help => {
            println!("Commands: start, stop, camera on, camera off, status, quit")
        }
        ControlCommand::Quit => {}
    }
}

/// One-line description of the session for `status`.
pub fn status_line(session: &RecordingSession) -> String {
    let camera = if session.overlay_enabled() { "on" } else { "off" };
    match session.stats() {
        Some(stats) => format!(
            "recording: {} frames, {} with camera, {} skipped ticks, {} capture failures (camera {})",
            stats.frames_written,
            stats.overlay_composites,
            stats.skipped_ticks,
            stats.capture_failures,
            camera
        ),
        None => format!("idle (camera {})", camera),
    }
}
