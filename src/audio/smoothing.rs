//! Fixed-size moving average over raw amplitudes.
//!
//! The window is pre-filled with zeros and always holds exactly `capacity`
//! entries: every [`push`](SmoothingWindow::push) overwrites the oldest value
//! and returns the mean of the whole window.  Early outputs are therefore
//! damped towards silence until the window has seen `capacity` real values.
//!
//! # Example
//!
//! ```rust
//! use viseme_sync::audio::SmoothingWindow;
//!
//! let mut window = SmoothingWindow::new(5);
//! assert!((window.push(0.5) - 0.1).abs() < 1e-12); // (0.5 + 0 + 0 + 0 + 0) / 5
//! ```

use super::magnitude::Amplitude;

/// Window length used by the classification pipeline.
pub const DEFAULT_WINDOW: usize = 5;

// ---------------------------------------------------------------------------
// SmoothingWindow
// ---------------------------------------------------------------------------

/// A zero-initialised circular buffer of the last `capacity` raw amplitudes.
///
/// Owned by exactly one pipeline; it is never shared between threads.
#[derive(Debug, Clone)]
pub struct SmoothingWindow {
    buf: Vec<Amplitude>,
    /// Index of the oldest entry, which the next push overwrites.
    write_pos: usize,
}

impl SmoothingWindow {
    /// Create a window of `capacity` zeros.
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "SmoothingWindow capacity must be > 0");
        Self {
            buf: vec![0.0; capacity],
            write_pos: 0,
        }
    }

    /// Evict the oldest entry, append `raw`, and return the new mean.
    pub fn push(&mut self, raw: Amplitude) -> Amplitude {
        self.buf[self.write_pos] = raw;
        self.write_pos = (self.write_pos + 1) % self.buf.len();
        self.mean()
    }

    /// Arithmetic mean of every entry in the window.
    pub fn mean(&self) -> Amplitude {
        self.buf.iter().sum::<Amplitude>() / self.buf.len() as Amplitude
    }

    /// Entries in arrival order, oldest first.
    pub fn values(&self) -> Vec<Amplitude> {
        let (newer, older) = self.buf.split_at(self.write_pos);
        older.iter().chain(newer).copied().collect()
    }

    /// Refill the window with zeros.
    pub fn reset(&mut self) {
        self.buf.fill(0.0);
        self.write_pos = 0;
    }

    /// Number of entries held.  Constant for the lifetime of the window.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Always `false`; a window holds at least one entry.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

impl Default for SmoothingWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
