//! Newest-frame hand-off between the camera thread and the recorder.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::types::CameraError;
use crate::frame::Frame;

/// Frames older than this are not served. A camera that stops delivering
/// drops out of the overlay instead of freezing on its last image.
pub const STALE_AFTER: Duration = Duration::from_millis(500);

/// Consecutive grab errors after which the camera is treated as lost.
pub const MAX_CONSECUTIVE_ERRORS: u32 = 30;

#[derive(Debug, Default)]
struct SlotState {
    frame: Option<(Frame, Instant)>,
    consecutive_errors: u32,
    failed: Option<String>,
}

/// Holds the most recent decoded frame.
///
/// The camera thread calls [`FrameSlot::store`] or [`FrameSlot::grab_failed`]
/// for every grab; readers call [`FrameSlot::latest`]. A failed grab empties
/// the slot, so that tick's frame is screen-only.
#[derive(Debug, Default)]
pub struct FrameSlot {
    state: Mutex<SlotState>,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, frame: Frame, at: Instant) {
        if let Ok(mut state) = self.state.lock() {
            state.frame = Some((frame, at));
            state.consecutive_errors = 0;
        }
    }

    /// Record a failed grab. Returns `true` once the camera should be given
    /// up on; every later read then fails with `reason`.
    pub fn grab_failed(&self, reason: &str) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return true;
        };
        state.frame = None;
        state.consecutive_errors += 1;
        if state.consecutive_errors >= MAX_CONSECUTIVE_ERRORS && state.failed.is_none() {
            state.failed = Some(reason.to_string());
        }
        state.failed.is_some()
    }

    /// Copy of the newest frame if it is fresh at `now`.
    pub fn latest(&self, now: Instant) -> Result<Option<Frame>, CameraError> {
        let state = self
            .state
            .lock()
            .map_err(|_| CameraError::ReadFailed("camera thread panicked".to_string()))?;
        if let Some(reason) = &state.failed {
            return Err(CameraError::ReadFailed(reason.clone()));
        }
        Ok(state
            .frame
            .as_ref()
            .filter(|(_, at)| now.saturating_duration_since(*at) <= STALE_AFTER)
            .map(|(frame, _)| frame.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Frame {
        Frame::filled(4, 3, [9, 8, 7])
    }

    #[test]
    fn test_fresh_frame_is_served_repeatedly() {
        let slot = FrameSlot::new();
        let t0 = Instant::now();
        assert!(slot.latest(t0).unwrap().is_none());

        slot.store(frame(), t0);
        let later = t0 + Duration::from_millis(40);
        for _ in 0..2 {
            let served = slot.latest(later).unwrap().unwrap();
            assert_eq!(served.data, frame().data);
        }
    }

    #[test]
    fn test_grab_error_clears_frame() {
        let slot = FrameSlot::new();
        let t0 = Instant::now();
        slot.store(frame(), t0);
        assert!(!slot.grab_failed("timeout"));
        assert!(slot.latest(t0).unwrap().is_none());

        slot.store(frame(), t0 + Duration::from_millis(33));
        assert!(slot.latest(t0 + Duration::from_millis(40)).unwrap().is_some());
    }

    #[test]
    fn test_stalled_stream_goes_stale() {
        let slot = FrameSlot::new();
        let t0 = Instant::now();
        slot.store(frame(), t0);
        assert!(slot.latest(t0 + STALE_AFTER).unwrap().is_some());
        assert!(slot
            .latest(t0 + STALE_AFTER + Duration::from_millis(1))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_repeated_errors_fail_reads() {
        let slot = FrameSlot::new();
        let t0 = Instant::now();
        for _ in 1..MAX_CONSECUTIVE_ERRORS {
            assert!(!slot.grab_failed("unplugged"));
        }
        assert!(slot.grab_failed("unplugged"));
        match slot.latest(t0) {
            Err(CameraError::ReadFailed(reason)) => assert_eq!(reason, "unplugged"),
            other => panic!("Expected ReadFailed, got {:?}", other),
        }
        slot.store(frame(), t0);
        assert!(slot.latest(t0).is_err());
    }

    #[test]
    fn test_success_resets_error_run() {
        let slot = FrameSlot::new();
        let t0 = Instant::now();
        for _ in 1..MAX_CONSECUTIVE_ERRORS {
            slot.grab_failed("glitch");
        }
        slot.store(frame(), t0);
        assert!(!slot.grab_failed("glitch"));
        assert!(slot.latest(t0).unwrap().is_none());
    }
}
