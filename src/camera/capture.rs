//! nokhwa-backed camera handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use nokhwa::query;
use nokhwa::utils::ApiBackend;

use super::capture_loop::run_capture_loop;
use super::slot::FrameSlot;
use super::types::{CameraError, CameraInfo, CameraSettings};
use super::{CameraDevice, CameraProvider};
use crate::frame::Frame;

/// How long `start()` waits for the camera thread to get a stream going.
const STREAM_OPEN_TIMEOUT: Duration = Duration::from_secs(5);

/// Cameras visible to nokhwa. An empty list is not an error.
pub fn list_devices() -> Result<Vec<CameraInfo>, CameraError> {
    let devices = query(ApiBackend::Auto).map_err(|e| CameraError::QueryFailed(e.to_string()))?;
    Ok(devices
        .into_iter()
        .map(|d| CameraInfo {
            index: d.index().as_index().unwrap_or(0),
            name: d.human_name(),
            description: d.description().to_string(),
        })
        .collect())
}

/// A camera streaming on its own thread.
///
/// The thread owns the nokhwa camera (it is not `Send` on every platform)
/// and keeps the newest decoded frame in a [`FrameSlot`]. Reads hand out a
/// copy of that frame while it is fresh, so a slow camera repeats its last
/// frame for a moment rather than stalling the recorder.
pub struct CameraCapture {
    latest: Arc<FrameSlot>,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    settings: CameraSettings,
}

impl CameraCapture {
    /// Check the device exists. Nothing is opened until `start()`.
    pub fn open(settings: CameraSettings) -> Result<Self, CameraError> {
        let devices = list_devices()?;
        if devices.is_empty() {
            return Err(CameraError::NoDevices);
        }
        if !devices.iter().any(|d| d.index == settings.device_index) {
            return Err(CameraError::DeviceNotFound(settings.device_index));
        }

        Ok(Self {
            latest: Arc::new(FrameSlot::new()),
            stop: Arc::new(AtomicBool::new(false)),
            thread: None,
            settings,
        })
    }

    /// Spawn the camera thread and block until its stream is open or fails.
    pub fn start(&mut self) -> Result<(), CameraError> {
        if self.is_running() {
            return Err(CameraError::AlreadyRunning);
        }
        self.stop.store(false, Ordering::Release);

        let latest = Arc::clone(&self.latest);
        let stop = Arc::clone(&self.stop);
        let settings = self.settings.clone();
        let (ready_tx, ready_rx) = mpsc::channel();

        let handle = std::thread::Builder::new()
            .name("camera-capture".to_string())
            .spawn(move || run_capture_loop(settings, latest, stop, ready_tx))
            .map_err(|e| CameraError::StreamFailed(e.to_string()))?;
        self.thread = Some(handle);

        let result = match ready_rx.recv_timeout(STREAM_OPEN_TIMEOUT) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(CameraError::StreamFailed(format!(
                "no stream after {:?}",
                STREAM_OPEN_TIMEOUT
            ))),
            Err(RecvTimeoutError::Disconnected) => Err(CameraError::StreamFailed(
                "camera thread exited during startup".to_string(),
            )),
        };

        match result {
            Ok(res) => {
                log::info!(
                    "Camera {} streaming at {}x{}",
                    self.settings.device_index,
                    res.width,
                    res.height
                );
                Ok(())
            }
            Err(e) => {
                self.stop();
                Err(e)
            }
        }
    }

    /// Stop the camera thread and wait for it to release the device.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                log::error!("Camera capture thread panicked");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl CameraDevice for CameraCapture {
    fn read_frame(&mut self) -> Result<Option<Frame>, CameraError> {
        if !self.is_running() {
            return Err(CameraError::ReadFailed("camera thread has exited".to_string()));
        }
        self.latest.latest(Instant::now())
    }

    fn close(&mut self) {
        self.stop();
    }
}

impl Drop for CameraCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for CameraCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraCapture")
            .field("settings", &self.settings)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

/// [`CameraProvider`] that opens and starts a [`CameraCapture`].
#[derive(Debug, Clone, Default)]
pub struct NokhwaCameras {
    pub settings: CameraSettings,
}

impl NokhwaCameras {
    pub fn new(settings: CameraSettings) -> Self {
        Self { settings }
    }
}

impl CameraProvider for NokhwaCameras {
    fn open_camera(&mut self) -> Result<Box<dyn CameraDevice>, CameraError> {
        let mut camera = CameraCapture::open(self.settings.clone())?;
        camera.start()?;
        Ok(Box::new(camera))
    }
}
