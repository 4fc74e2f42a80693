//! End-to-end tests for the recording session.
//!
//! The session is driven with in-process devices: a solid-color screen, a
//! scripted camera, a synthetic microphone and a sink that keeps frames in
//! memory. Audio goes through the real WAV finalizer and is read back with
//! hound.

use overlay_recorder::audio::{
    AudioError, AudioFormat, AudioInput, AudioProvider, PcmChunk, WavFinalizer,
};
use overlay_recorder::camera::{CameraDevice, CameraError, CameraProvider};
use overlay_recorder::capture::{CaptureError, ScreenSource};
use overlay_recorder::cli::control::{self, ControlCommand};
use overlay_recorder::frame::{Frame, PixelFormat};
use overlay_recorder::session::{
    AudioOutcome, Devices, RecordingSession, SessionConfig, SessionState,
};
use overlay_recorder::video::{SinkError, VideoSettings, VideoSink, VideoSinkFactory};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

const SCREEN_COLOR: [u8; 3] = [40, 40, 40];

struct Screen {
    width: u32,
    height: u32,
}

impl ScreenSource for Screen {
    fn resolution(&self) -> Result<(u32, u32), CaptureError> {
        Ok((self.width, self.height))
    }

    fn capture(&mut self) -> Result<Frame, CaptureError> {
        Ok(Frame::filled(self.width, self.height, SCREEN_COLOR))
    }
}

/// A 640x480 BGR gradient, the way a webcam driver would hand it out.
fn camera_frame() -> Frame {
    let mut data = Vec::with_capacity(640 * 480 * 3);
    for y in 0..480u32 {
        for x in 0..640u32 {
            data.extend_from_slice(&[(x / 3) as u8, (y / 2) as u8, 200]);
        }
    }
    Frame::new(640, 480, PixelFormat::Bgr, data).unwrap()
}

struct Webcam {
    closed: Rc<RefCell<u32>>,
}

impl CameraDevice for Webcam {
    fn read_frame(&mut self) -> Result<Option<Frame>, CameraError> {
        Ok(Some(camera_frame()))
    }

    fn close(&mut self) {
        *self.closed.borrow_mut() += 1;
    }
}

struct Webcams {
    available: bool,
    opened: Rc<RefCell<u32>>,
    closed: Rc<RefCell<u32>>,
}

impl CameraProvider for Webcams {
    fn open_camera(&mut self) -> Result<Box<dyn CameraDevice>, CameraError> {
        if !self.available {
            return Err(CameraError::OpenFailed("device busy".to_string()));
        }
        *self.opened.borrow_mut() += 1;
        Ok(Box::new(Webcam {
            closed: self.closed.clone(),
        }))
    }
}

#[derive(Default)]
struct Recorded {
    settings: Vec<VideoSettings>,
    frames: Vec<Frame>,
    closes: u32,
}

struct MemorySink(Rc<RefCell<Recorded>>);

impl VideoSink for MemorySink {
    fn write(&mut self, frame: &Frame) -> Result<(), SinkError> {
        self.0.borrow_mut().frames.push(frame.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        self.0.borrow_mut().closes += 1;
        Ok(())
    }
}

struct MemorySinks(Rc<RefCell<Recorded>>);

impl VideoSinkFactory for MemorySinks {
    fn open(&mut self, settings: &VideoSettings) -> Result<Box<dyn VideoSink>, SinkError> {
        self.0.borrow_mut().settings.push(settings.clone());
        Ok(Box::new(MemorySink(self.0.clone())))
    }
}

/// Paced microphone: each block carries its own index so order can be
/// checked after read-back. Fails once `fail_after` blocks were read.
struct Microphone {
    fail_after: Option<usize>,
    opens: AtomicUsize,
}

struct MicInput {
    next: i16,
    fail_after: Option<usize>,
}

impl AudioInput for MicInput {
    fn read_block(&mut self, frames: usize) -> Result<PcmChunk, AudioError> {
        if self.fail_after.is_some_and(|n| self.next as usize >= n) {
            return Err(AudioError::Disconnected);
        }
        thread::sleep(Duration::from_millis(2));
        let chunk = PcmChunk::new(vec![self.next; frames]);
        self.next += 1;
        Ok(chunk)
    }
}

impl AudioProvider for Microphone {
    fn open_input(&self, _format: AudioFormat) -> Result<Box<dyn AudioInput>, AudioError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MicInput {
            next: 0,
            fail_after: self.fail_after,
        }))
    }
}

struct Rig {
    session: RecordingSession,
    recorded: Rc<RefCell<Recorded>>,
    camera_opened: Rc<RefCell<u32>>,
    camera_closed: Rc<RefCell<u32>>,
    microphone: Arc<Microphone>,
    dir: tempfile::TempDir,
}

fn rig(screen: (u32, u32), camera_available: bool, fail_audio_after: Option<usize>) -> Rig {
    let dir = tempfile::tempdir().unwrap();
    let recorded = Rc::new(RefCell::new(Recorded::default()));
    let camera_opened = Rc::new(RefCell::new(0));
    let camera_closed = Rc::new(RefCell::new(0));
    let microphone = Arc::new(Microphone {
        fail_after: fail_audio_after,
        opens: AtomicUsize::new(0),
    });

    let devices = Devices {
        screen: Box::new(Screen {
            width: screen.0,
            height: screen.1,
        }),
        camera: Box::new(Webcams {
            available: camera_available,
            opened: camera_opened.clone(),
            closed: camera_closed.clone(),
        }),
        audio: Some(microphone.clone() as Arc<dyn AudioProvider>),
        video: Box::new(MemorySinks(recorded.clone())),
        finalizer: Box::new(WavFinalizer),
    };
    let config = SessionConfig {
        output_dir: dir.path().join("recordings"),
        ..SessionConfig::default()
    };

    Rig {
        session: RecordingSession::new(config, devices),
        recorded,
        camera_opened,
        camera_closed,
        microphone,
        dir,
    }
}

fn record_ticks(session: &mut RecordingSession, ticks: u32) {
    session.start().unwrap();
    for _ in 0..ticks {
        assert!(session.tick(0));
    }
}

fn read_wav(path: &std::path::Path) -> (hound::WavSpec, Vec<i16>) {
    let mut reader = hound::WavReader::open(path).unwrap();
    let spec = reader.spec();
    let samples = reader.samples::<i16>().map(|s| s.unwrap()).collect();
    (spec, samples)
}

fn assert_block_equals(frame: &Frame, x0: u32, y0: u32, expected: &Frame) {
    for y in 0..expected.height {
        for x in 0..expected.width {
            assert_eq!(
                frame.pixel(x0 + x, y0 + y),
                expected.pixel(x, y),
                "pixel ({}, {}) of overlay",
                x,
                y
            );
        }
    }
}

#[test]
fn test_full_hd_recording_with_camera_overlay() {
    let mut rig = rig((1920, 1080), true, None);
    rig.session.set_overlay_enabled(true);
    record_ticks(&mut rig.session, 10);
    // Give the microphone a few blocks' worth of time.
    thread::sleep(Duration::from_millis(20));
    let summary = rig.session.stop().unwrap();

    assert_eq!(rig.session.state(), SessionState::Idle);
    assert_eq!(summary.stats.ticks, 10);
    assert_eq!(summary.stats.frames_written, 10);
    assert_eq!(summary.stats.overlay_composites, 10);
    assert!(summary.video_error.is_none());

    let recorded = rig.recorded.borrow();
    assert_eq!(recorded.settings.len(), 1);
    assert_eq!(recorded.settings[0].width, 1920);
    assert_eq!(recorded.settings[0].height, 1080);
    assert_eq!(recorded.settings[0].frame_rate, 20.0);
    assert_eq!(recorded.closes, 1);

    let expected = camera_frame().into_rgb().resize(150, 100);
    assert_eq!(recorded.frames.len(), 10);
    for frame in &recorded.frames {
        assert_eq!(frame.size(), (1920, 1080));
        assert_block_equals(frame, 1920 - 160, 10, &expected);
        // Just outside the overlay the screen shows through.
        assert_eq!(frame.pixel(1920 - 161, 10), &SCREEN_COLOR);
        assert_eq!(frame.pixel(1920 - 10, 10), &SCREEN_COLOR);
        assert_eq!(frame.pixel(1920 - 160, 110), &SCREEN_COLOR);
    }
    assert_eq!(*rig.camera_opened.borrow(), 1);
    assert_eq!(*rig.camera_closed.borrow(), 1);

    match summary.audio {
        AudioOutcome::Written {
            path,
            samples,
            interrupted,
        } => {
            assert!(interrupted.is_none());
            assert!(samples > 0);
            assert_eq!(samples % 1024, 0);

            let (spec, read) = read_wav(&path);
            assert_eq!(spec.sample_rate, 44_100);
            assert_eq!(spec.channels, 1);
            assert_eq!(spec.bits_per_sample, 16);
            assert_eq!(read.len() as u64, samples);
            // Blocks in capture order, none dropped.
            for (i, block) in read.chunks(1024).enumerate() {
                assert!(block.iter().all(|&s| s == i as i16));
            }
        }
        other => panic!("Expected written audio, got {:?}", other),
    }
}

#[test]
fn test_camera_open_failure_records_screen_only() {
    let mut rig = rig((1280, 720), false, None);
    rig.session.set_overlay_enabled(true);
    record_ticks(&mut rig.session, 6);
    let summary = rig.session.stop().unwrap();

    assert_eq!(summary.stats.frames_written, 6);
    assert_eq!(summary.stats.overlay_composites, 0);
    for frame in &rig.recorded.borrow().frames {
        assert_eq!(frame.pixel(1280 - 100, 50), &SCREEN_COLOR);
    }
    assert!(matches!(summary.audio, AudioOutcome::Written { .. }));
}

#[test]
fn test_overlay_disabled_does_not_open_camera() {
    let mut rig = rig((800, 600), true, None);
    record_ticks(&mut rig.session, 3);
    let summary = rig.session.stop().unwrap();

    assert_eq!(summary.stats.overlay_composites, 0);
    assert_eq!(*rig.camera_opened.borrow(), 0);
}

#[test]
fn test_repeated_start_and_stop_are_no_ops() {
    let mut rig = rig((800, 600), true, None);
    rig.session.set_overlay_enabled(true);
    rig.session.start().unwrap();
    rig.session.start().unwrap();
    assert_eq!(rig.recorded.borrow().settings.len(), 1);
    assert_eq!(*rig.camera_opened.borrow(), 1);

    assert!(rig.session.stop().is_some());
    assert!(rig.session.stop().is_none());
    assert_eq!(rig.recorded.borrow().closes, 1);
    assert_eq!(*rig.camera_closed.borrow(), 1);
    // The microphone opens on the worker thread; stop() joined it.
    assert_eq!(rig.microphone.opens.load(Ordering::SeqCst), 1);
}

#[test]
fn test_audio_failure_keeps_partial_audio_and_video() {
    let mut rig = rig((800, 600), false, Some(3));
    rig.session.start().unwrap();
    // Let the microphone run into its failure.
    thread::sleep(Duration::from_millis(50));
    for _ in 0..4 {
        assert!(rig.session.tick(0));
    }
    let summary = rig.session.stop().unwrap();

    assert_eq!(summary.stats.frames_written, 4);
    match summary.audio {
        AudioOutcome::Written {
            path,
            samples,
            interrupted,
        } => {
            assert_eq!(samples, 3 * 1024);
            assert!(matches!(interrupted, Some(AudioError::Disconnected)));
            assert_eq!(read_wav(&path).1.len(), 3 * 1024);
        }
        other => panic!("Expected partial audio, got {:?}", other),
    }
}

#[test]
fn test_sessions_can_record_again_after_stop() {
    let mut rig = rig((640, 480), false, None);
    record_ticks(&mut rig.session, 2);
    rig.session.stop().unwrap();
    record_ticks(&mut rig.session, 3);
    let summary = rig.session.stop().unwrap();

    assert_eq!(summary.stats.frames_written, 3);
    assert_eq!(rig.recorded.borrow().frames.len(), 5);
    assert_eq!(rig.recorded.borrow().closes, 2);
    assert_eq!(rig.microphone.opens.load(Ordering::SeqCst), 2);
    assert!(rig.dir.path().join("recordings").is_dir());
}

#[tokio::test(start_paused = true)]
async fn test_control_loop_records_until_stop() {
    let mut rig = rig((640, 480), true, None);
    let (tx, rx) = mpsc::unbounded_channel();
    let quit = Notify::new();

    let sender = tokio::spawn(async move {
        tx.send(ControlCommand::Camera(true)).unwrap();
        tx.send(ControlCommand::Start).unwrap();
        // Ticks land on 30, 60, ... 300ms of the paused clock.
        tokio::time::sleep(Duration::from_millis(315)).await;
        tx.send(ControlCommand::Status).unwrap();
        tx.send(ControlCommand::Stop).unwrap();
        tx.send(ControlCommand::Quit).unwrap();
    });

    let summaries = control::run(&mut rig.session, rx, &quit).await;
    sender.await.unwrap();

    assert_eq!(summaries.len(), 1);
    let stats = summaries[0].stats;
    assert_eq!(stats.ticks, 10);
    assert_eq!(stats.skipped_ticks, 0);
    assert_eq!(stats.frames_written, 10);
    assert_eq!(stats.overlay_composites, 10);
    assert!(!rig.session.is_recording());
}

#[tokio::test(start_paused = true)]
async fn test_control_loop_quit_signal_stops_recording() {
    let mut rig = rig((640, 480), false, None);
    let (tx, rx) = mpsc::unbounded_channel();
    let quit = Arc::new(Notify::new());
    let signal = Arc::clone(&quit);

    tx.send(ControlCommand::Start).unwrap();
    let notifier = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(165)).await;
        signal.notify_one();
    });

    let summaries = control::run(&mut rig.session, rx, &quit).await;
    notifier.await.unwrap();
    drop(tx);

    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].stats.frames_written, 5);
    assert_eq!(rig.recorded.borrow().closes, 1);
}

#[tokio::test(start_paused = true)]
async fn test_control_loop_exits_when_input_closes_while_idle() {
    let mut rig = rig((640, 480), false, None);
    let (tx, rx) = mpsc::unbounded_channel();
    let quit = Notify::new();

    tx.send(ControlCommand::Start).unwrap();
    tx.send(ControlCommand::Stop).unwrap();
    drop(tx);

    let summaries = control::run(&mut rig.session, rx, &quit).await;
    assert_eq!(summaries.len(), 1);
    assert_eq!(rig.recorded.borrow().closes, 1);
}

#[tokio::test(start_paused = true)]
async fn test_control_loop_keeps_recording_after_input_closes() {
    let mut rig = rig((640, 480), false, None);
    let (tx, rx) = mpsc::unbounded_channel();
    let quit = Arc::new(Notify::new());
    let signal = Arc::clone(&quit);

    tx.send(ControlCommand::Start).unwrap();
    drop(tx);
    let notifier = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(95)).await;
        signal.notify_one();
    });

    let summaries = control::run(&mut rig.session, rx, &quit).await;
    notifier.await.unwrap();

    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].stats.frames_written, 3);
}
