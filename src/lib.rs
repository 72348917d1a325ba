//! Audio-driven mouth-shape (viseme) animation.
//!
//! Live frequency-domain frames (or a synthetic oscillation when no analyzer
//! is available) are reduced to a scalar amplitude, smoothed over a short
//! window and classified into one of nine mouth states.
//!
//! ```text
//! MagnitudeSample → estimate → SmoothingWindow → ThresholdTable → VisemeSink
//!                   ▲
//!   SyntheticGenerator (fallback, bypasses estimate)
//! ```

pub mod app;
pub mod audio;
pub mod config;
pub mod pipeline;
pub mod source;
pub mod viseme;
