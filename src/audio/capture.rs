//! Live analyzer via `cpal`.
//!
//! [`LiveAnalyzer`] opens an input stream, downmixes each callback buffer to
//! mono, cuts it into `capture_size` windows at the configured capture rate
//! and forwards the packed spectrum of each window over a bounded channel.
//!
//! The stream runs for the analyzer's whole lifetime; delivery is gated by an
//! enable flag so frames never reach the pipeline while capture is stopped.
//! [`LiveAnalyzer::release`] tears the stream down and is safe to call any
//! number of times.
//!
//! `cpal::Stream` is not `Send`, so a `LiveAnalyzer` must be created and
//! dropped on the thread that drives it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use thiserror::Error;
use tokio::sync::{mpsc, Notify};

use super::spectrum::{is_valid_capture_size, SpectrumFrame};
use crate::config::CaptureConfig;

/// Frames buffered between the audio callback and the scheduler.
const FRAME_QUEUE: usize = 8;

// ---------------------------------------------------------------------------
// AnalyzerError
// ---------------------------------------------------------------------------

/// Reasons the live analyzer could not be constructed.
///
/// None of these are fatal: the caller substitutes the synthetic generator.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("input device {0:?} not found")]
    DeviceNotFound(String),

    #[error("failed to enumerate input devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("unsupported sample format {0:?}")]
    UnsupportedSampleFormat(cpal::SampleFormat),

    #[error("capture size {0} must be a power of two between 128 and 1024")]
    InvalidCaptureSize(usize),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start input stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

// ---------------------------------------------------------------------------
// FrameAssembler
// ---------------------------------------------------------------------------

/// Turns interleaved PCM callback buffers into spectrum frames.
///
/// One window of `capture_size` mono samples is analysed, then
/// `(rate_divisor - 1) * capture_size` samples are skipped, which delivers
/// frames at `max_capture_rate / rate_divisor`.
pub struct FrameAssembler {
    channels: usize,
    spectrum: SpectrumFrame,
    pending: Vec<f32>,
    skip_after_frame: usize,
    skipping: usize,
    acc: f32,
    acc_count: usize,
}

impl FrameAssembler {
    /// Returns `None` when `capture_size` is not a supported window size.
    pub fn new(channels: u16, capture_size: usize, rate_divisor: u32) -> Option<Self> {
        let spectrum = SpectrumFrame::new(capture_size)?;
        let divisor = rate_divisor.max(1) as usize;
        Some(Self {
            channels: usize::from(channels.max(1)),
            spectrum,
            pending: Vec::with_capacity(capture_size),
            skip_after_frame: (divisor - 1) * capture_size,
            skipping: 0,
            acc: 0.0,
            acc_count: 0,
        })
    }

    /// Feed one interleaved buffer; `emit` is called once per completed frame.
    pub fn push_interleaved<F>(&mut self, data: &[f32], mut emit: F)
    where
        F: FnMut(Vec<i8>),
    {
        for &sample in data {
            self.acc += sample;
            self.acc_count += 1;
            if self.acc_count < self.channels {
                continue;
            }
            let mono = self.acc / self.channels as f32;
            self.acc = 0.0;
            self.acc_count = 0;

            if self.skipping > 0 {
                self.skipping -= 1;
                continue;
            }
            self.pending.push(mono);
            if self.pending.len() == self.spectrum.size() {
                emit(self.spectrum.compute(&self.pending));
                self.pending.clear();
                self.skipping = self.skip_after_frame;
            }
        }
    }

    /// Drop any partially assembled window.
    pub fn reset(&mut self) {
        self.pending.clear();
        self.skipping = 0;
        self.acc = 0.0;
        self.acc_count = 0;
    }
}

// ---------------------------------------------------------------------------
// LiveAnalyzer
// ---------------------------------------------------------------------------

/// A running input stream that delivers `MagnitudeSample` frames.
pub struct LiveAnalyzer {
    stream: Option<cpal::Stream>,
    released: bool,
    enabled: Arc<AtomicBool>,
    lost: Arc<AtomicBool>,
    lost_signal: Arc<Notify>,
    frames: mpsc::Receiver<Vec<i8>>,
    sample_rate: u32,
    capture_size: usize,
    rate_divisor: u32,
}

impl LiveAnalyzer {
    /// Open the configured (or default) input device and start its stream.
    ///
    /// The analyzer starts disabled; call [`enable`](Self::enable) when
    /// capture begins.
    ///
    /// # Errors
    ///
    /// Any [`AnalyzerError`]: missing device, unsupported format or a
    /// platform refusal to build or start the stream.
    pub fn open(config: &CaptureConfig) -> Result<Self, AnalyzerError> {
        if !is_valid_capture_size(config.capture_size) {
            return Err(AnalyzerError::InvalidCaptureSize(config.capture_size));
        }

        let host = cpal::default_host();
        let device = match &config.input_device {
            Some(name) => host
                .input_devices()?
                .find(|d| d.name().map(|n| n == *name).unwrap_or(false))
                .ok_or_else(|| AnalyzerError::DeviceNotFound(name.clone()))?,
            None => host.default_input_device().ok_or(AnalyzerError::NoDevice)?,
        };

        let supported = device.default_input_config()?;
        let sample_format = supported.sample_format();
        let channels = supported.channels();
        let sample_rate = supported.sample_rate().0;
        let stream_config: cpal::StreamConfig = supported.into();

        let enabled = Arc::new(AtomicBool::new(false));
        let lost = Arc::new(AtomicBool::new(false));
        let lost_signal = Arc::new(Notify::new());
        let (tx, frames) = mpsc::channel(FRAME_QUEUE);

        let wiring = StreamWiring {
            enabled: Arc::clone(&enabled),
            lost: Arc::clone(&lost),
            lost_signal: Arc::clone(&lost_signal),
            tx,
            channels,
            capture_size: config.capture_size,
            rate_divisor: config.rate_divisor,
        };

        let stream = match sample_format {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, wiring)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, wiring)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, wiring)?,
            other => return Err(AnalyzerError::UnsupportedSampleFormat(other)),
        };
        stream.play()?;

        let analyzer = Self {
            stream: Some(stream),
            released: false,
            enabled,
            lost,
            lost_signal,
            frames,
            sample_rate,
            capture_size: config.capture_size,
            rate_divisor: config.rate_divisor.max(1),
        };
        log::info!(
            "live analyzer ready: {} Hz, {} ch, capture size {}, {:.1} frames/s (max {:.1})",
            sample_rate,
            channels,
            analyzer.capture_size,
            analyzer.capture_rate_hz(),
            analyzer.max_capture_rate_hz()
        );
        Ok(analyzer)
    }

    /// Analyzer fed directly from `frames`, with no device behind it.
    #[cfg(test)]
    pub(crate) fn from_receiver(frames: mpsc::Receiver<Vec<i8>>) -> Self {
        Self {
            stream: None,
            released: false,
            enabled: Arc::new(AtomicBool::new(false)),
            lost: Arc::new(AtomicBool::new(false)),
            lost_signal: Arc::new(Notify::new()),
            frames,
            sample_rate: 48_000,
            capture_size: 1024,
            rate_divisor: 2,
        }
    }

    /// Start delivering frames, discarding anything queued before this call.
    pub fn enable(&mut self) {
        while self.frames.try_recv().is_ok() {}
        self.enabled.store(true, Ordering::Release);
    }

    /// Stop delivering frames.  The stream keeps running.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
    }

    /// Wait for the next frame.
    ///
    /// Returns `None` once the analyzer has been released or the device was
    /// lost; the feed does not recover after that.
    pub async fn next_frame(&mut self) -> Option<Vec<i8>> {
        if self.released || self.lost.load(Ordering::Acquire) {
            return None;
        }
        tokio::select! {
            frame = self.frames.recv() => frame,
            _ = self.lost_signal.notified() => None,
        }
    }

    /// Disable and drop the stream.  Idempotent.
    pub fn release(&mut self) {
        self.disable();
        if self.released {
            return;
        }
        self.released = true;
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                log::debug!("pausing input stream before release failed: {e}");
            }
        }
        self.frames.close();
        log::info!("live analyzer released");
    }

    /// `true` after [`release`](Self::release).
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Native device sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Highest frame rate the device can deliver for this capture size.
    pub fn max_capture_rate_hz(&self) -> f64 {
        f64::from(self.sample_rate) / self.capture_size as f64
    }

    /// Configured frame rate.
    pub fn capture_rate_hz(&self) -> f64 {
        self.max_capture_rate_hz() / f64::from(self.rate_divisor)
    }
}

impl Drop for LiveAnalyzer {
    fn drop(&mut self) {
        self.release();
    }
}

// ---------------------------------------------------------------------------
// Stream construction
// ---------------------------------------------------------------------------

struct StreamWiring {
    enabled: Arc<AtomicBool>,
    lost: Arc<AtomicBool>,
    lost_signal: Arc<Notify>,
    tx: mpsc::Sender<Vec<i8>>,
    channels: u16,
    capture_size: usize,
    rate_divisor: u32,
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    wiring: StreamWiring,
) -> Result<cpal::Stream, AnalyzerError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let StreamWiring {
        enabled,
        lost,
        lost_signal,
        tx,
        channels,
        capture_size,
        rate_divisor,
    } = wiring;

    let mut assembler = FrameAssembler::new(channels, capture_size, rate_divisor)
        .ok_or(AnalyzerError::InvalidCaptureSize(capture_size))?;
    let mut was_enabled = false;
    let mut converted: Vec<f32> = Vec::new();

    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let is_enabled = enabled.load(Ordering::Acquire);
            if !is_enabled {
                was_enabled = false;
                return;
            }
            if !was_enabled {
                assembler.reset();
                was_enabled = true;
            }

            converted.clear();
            converted.extend(data.iter().map(|&s| s.to_sample::<f32>()));
            // A full queue means the consumer is behind; drop rather than block.
            assembler.push_interleaved(&converted, |frame| {
                let _ = tx.try_send(frame);
            });
        },
        move |err: cpal::StreamError| {
            log::error!("cpal stream error: {err}");
            if matches!(err, cpal::StreamError::DeviceNotAvailable) {
                lost.store(true, Ordering::Release);
                lost_signal.notify_one();
            }
        },
        None,
    )?;
    Ok(stream)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
