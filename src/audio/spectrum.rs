//! PCM window → byte-range frequency bins.
//!
//! [`SpectrumFrame`] turns `capture_size` mono samples into the packed
//! fixed-point layout used by platform audio visualizers:
//!
//! ```text
//! [ Re(0), Re(n/2), Re(1), Im(1), Re(2), Im(2), …, Re(n/2-1), Im(n/2-1) ]
//! ```
//!
//! Every component is scaled so a full-scale sinusoid lands on ±127 and is
//! saturated into `i8`.  The result is the `MagnitudeSample` consumed by
//! [`estimate`](super::estimate).

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// Smallest supported analysis window.
pub const MIN_CAPTURE_SIZE: usize = 128;

/// Largest supported analysis window.
pub const MAX_CAPTURE_SIZE: usize = 1024;

/// Forward FFT producing packed signed-byte bins.
pub struct SpectrumFrame {
    size: usize,
    fft: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl SpectrumFrame {
    /// Plan a forward FFT for windows of `size` samples.
    ///
    /// Returns `None` unless `size` is a power of two in
    /// `[MIN_CAPTURE_SIZE, MAX_CAPTURE_SIZE]`.
    pub fn new(size: usize) -> Option<Self> {
        if !is_valid_capture_size(size) {
            return None;
        }
        let fft = FftPlanner::new().plan_fft_forward(size);
        Some(Self {
            size,
            fft,
            scratch: vec![Complex::new(0.0, 0.0); size],
        })
    }

    /// Window length in samples (also the length of each produced frame).
    pub fn size(&self) -> usize {
        self.size
    }

    /// Transform `window` (exactly `size` samples in `[-1.0, 1.0]`).
    ///
    /// Shorter input is zero-padded; extra samples are ignored.
    pub fn compute(&mut self, window: &[f32]) -> Vec<i8> {
        for (slot, i) in self.scratch.iter_mut().zip(0..) {
            let sample = window.get(i).copied().unwrap_or(0.0);
            *slot = Complex::new(sample, 0.0);
        }
        self.fft.process(&mut self.scratch);

        let n = self.size;
        let scale = 2.0 / n as f32 * 128.0;
        let mut out = Vec::with_capacity(n);
        out.push(quantize(self.scratch[0].re * scale));
        out.push(quantize(self.scratch[n / 2].re * scale));
        for bin in &self.scratch[1..n / 2] {
            out.push(quantize(bin.re * scale));
            out.push(quantize(bin.im * scale));
        }
        out
    }
}

/// `true` when `size` is a power of two the analyzer can capture.
pub fn is_valid_capture_size(size: usize) -> bool {
    size.is_power_of_two() && (MIN_CAPTURE_SIZE..=MAX_CAPTURE_SIZE).contains(&size)
}

fn quantize(value: f32) -> i8 {
    value.round().clamp(i8::MIN as f32, i8::MAX as f32) as i8
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
