//! cpal microphone input.

use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SizedSample, Stream, StreamConfig};

use super::types::{AudioError, AudioFormat, PcmChunk};
use super::{AudioInput, AudioProvider};

/// A read that sees no data for this long treats the device as gone.
const READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Names of the available input devices.
pub fn list_input_devices() -> Result<Vec<String>, AudioError> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| AudioError::StreamFailed(e.to_string()))?;
    Ok(devices
        .map(|d| d.name().unwrap_or_else(|_| "Unknown".to_string()))
        .collect())
}

/// Opens the default (or a named) microphone through cpal.
#[derive(Debug, Clone, Default)]
pub struct CpalAudio {
    /// Input device name; `None` uses the host default
    pub device: Option<String>,
}

impl CpalAudio {
    pub fn new(device: Option<String>) -> Self {
        Self { device }
    }

    fn find_device(&self) -> Result<cpal::Device, AudioError> {
        let host = cpal::default_host();
        match &self.device {
            Some(name) => host
                .input_devices()
                .map_err(|e| AudioError::StreamFailed(e.to_string()))?
                .find(|d| d.name().map(|n| n == *name).unwrap_or(false))
                .ok_or_else(|| AudioError::DeviceNotFound(name.clone())),
            None => host.default_input_device().ok_or(AudioError::NoInputDevice),
        }
    }
}

impl AudioProvider for CpalAudio {
    fn open_input(&self, format: AudioFormat) -> Result<Box<dyn AudioInput>, AudioError> {
        let device = self.find_device()?;
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());

        // The device has to support the exact rate and channel count; there
        // is no resampling.
        let sample_format = device
            .supported_input_configs()
            .map_err(|e| AudioError::StreamFailed(e.to_string()))?
            .find(|range| {
                range.channels() == format.channels
                    && range.min_sample_rate().0 <= format.sample_rate
                    && format.sample_rate <= range.max_sample_rate().0
            })
            .map(|range| range.sample_format())
            .ok_or_else(|| {
                AudioError::UnsupportedConfig(format!(
                    "{} Hz / {} channel(s) on '{}'",
                    format.sample_rate, format.channels, name
                ))
            })?;

        let config = StreamConfig {
            channels: format.channels,
            sample_rate: cpal::SampleRate(format.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };
        let (tx, rx) = mpsc::channel();

        let stream = match sample_format {
            SampleFormat::I16 => build_stream::<i16, _>(&device, &config, tx, |s| s)?,
            SampleFormat::F32 => build_stream::<f32, _>(&device, &config, tx, f32_to_i16)?,
            SampleFormat::U16 => build_stream::<u16, _>(&device, &config, tx, u16_to_i16)?,
            other => {
                return Err(AudioError::UnsupportedConfig(format!(
                    "sample format {:?} on '{}'",
                    other, name
                )))
            }
        };
        stream
            .play()
            .map_err(|e| AudioError::StreamFailed(e.to_string()))?;

        log::info!(
            "Microphone '{}' open ({} Hz, {} ch, {:?})",
            name,
            format.sample_rate,
            format.channels,
            sample_format
        );
        Ok(Box::new(CpalInput {
            _stream: stream,
            rx,
            channels: format.channels as usize,
            pending: VecDeque::new(),
        }))
    }
}

fn build_stream<T, F>(
    device: &cpal::Device,
    config: &StreamConfig,
    tx: Sender<Vec<i16>>,
    convert: F,
) -> Result<Stream, AudioError>
where
    T: SizedSample,
    F: Fn(T) -> i16 + Send + 'static,
{
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let _ = tx.send(data.iter().map(|&s| convert(s)).collect());
            },
            |err| log::error!("Microphone stream error: {}", err),
            None,
        )
        .map_err(|e| AudioError::StreamFailed(e.to_string()))
}

fn f32_to_i16(s: f32) -> i16 {
    (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

fn u16_to_i16(s: u16) -> i16 {
    (s as i32 - 32_768) as i16
}

/// Blocking reader over the cpal callback's samples.
struct CpalInput {
    /// Dropping the stream closes the device
    _stream: Stream,
    rx: Receiver<Vec<i16>>,
    channels: usize,
    pending: VecDeque<i16>,
}

impl AudioInput for CpalInput {
    fn read_block(&mut self, frames: usize) -> Result<PcmChunk, AudioError> {
        let wanted = frames * self.channels;
        while self.pending.len() < wanted {
            match self.rx.recv_timeout(READ_TIMEOUT) {
                Ok(samples) => self.pending.extend(samples),
                Err(RecvTimeoutError::Timeout) => return Err(AudioError::Timeout(READ_TIMEOUT)),
                Err(RecvTimeoutError::Disconnected) => return Err(AudioError::Disconnected),
            }
        }
        Ok(PcmChunk::new(self.pending.drain(..wanted).collect()))
    }
}
