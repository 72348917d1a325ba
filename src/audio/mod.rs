//! Audio front end: live capture → spectrum frames → amplitude → smoothing.
//!
//! # Pipeline
//!
//! ```text
//! Input device → cpal callback → FrameAssembler (mono, capture_size windows)
//!             → SpectrumFrame (packed i8 bins) → estimate → SmoothingWindow
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use viseme_sync::audio::{estimate, SmoothingWindow};
//!
//! let mut window = SmoothingWindow::default();
//! let raw = estimate(&[-128; 128]);
//! let smoothed = window.push(raw);
//! assert!((smoothed - 0.2).abs() < 1e-12);
//! ```

pub mod capture;
pub mod magnitude;
pub mod smoothing;
pub mod spectrum;

pub use capture::{AnalyzerError, FrameAssembler, LiveAnalyzer};
pub use magnitude::{estimate, Amplitude, CONSUMED_BINS, SILENCE_DB};
pub use smoothing::{SmoothingWindow, DEFAULT_WINDOW};
pub use spectrum::{is_valid_capture_size, SpectrumFrame};
