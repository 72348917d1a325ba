//! The synchronous signal-to-state stages.
//!
//! [`VisemePipeline`] owns the only state that survives between cycles, the
//! [`SmoothingWindow`].  Every call runs estimate → smooth → classify in
//! bounded time and returns the result by value.

use crate::audio::{estimate, Amplitude, SmoothingWindow};
use crate::viseme::ThresholdTable;

use super::sink::VisemeUpdate;

/// Smoothing window plus threshold table.
#[derive(Debug, Clone)]
pub struct VisemePipeline {
    window: SmoothingWindow,
    table: ThresholdTable,
}

impl VisemePipeline {
    /// Pipeline with a `window`-entry moving average and the default table.
    ///
    /// # Panics
    ///
    /// Panics if `window == 0`.
    pub fn new(window: usize) -> Self {
        Self::with_table(window, ThresholdTable::default())
    }

    pub fn with_table(window: usize, table: ThresholdTable) -> Self {
        Self {
            window: SmoothingWindow::new(window),
            table,
        }
    }

    /// Push one raw amplitude through smoothing and classification.
    ///
    /// ```
    /// use viseme_sync::pipeline::VisemePipeline;
    /// use viseme_sync::viseme::Viseme;
    ///
    /// let mut pipeline = VisemePipeline::new(5);
    /// let update = pipeline.process(0.5);
    /// assert_eq!(update.smoothed, 0.1);
    /// assert_eq!(update.viseme, Viseme::L);
    /// ```
    pub fn process(&mut self, raw: Amplitude) -> VisemeUpdate {
        let smoothed = self.window.push(raw);
        VisemeUpdate {
            viseme: self.table.classify(smoothed),
            smoothed,
            raw,
        }
    }

    /// Estimate the amplitude of a spectrum frame, then [`process`](Self::process) it.
    pub fn process_frame(&mut self, bins: &[i8]) -> VisemeUpdate {
        self.process(estimate(bins))
    }

    /// Refill the smoothing window with zeros.
    pub fn reset(&mut self) {
        self.window.reset();
    }

    pub fn window(&self) -> &SmoothingWindow {
        &self.window
    }
}

impl Default for VisemePipeline {
    fn default() -> Self {
        Self::new(crate::audio::DEFAULT_WINDOW)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
