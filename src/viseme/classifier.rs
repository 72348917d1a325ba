//! Smoothed amplitude → [`Viseme`] via an ordered threshold table.
//!
//! Bands are checked top to bottom with a strict `<`; the first match wins
//! and anything at or above the last bound takes the catch-all state.  The
//! default table routes the loudest band back to `Cdgknstxyz` (index 4), so
//! `Viseme::O` is never produced by classification.
//!
//! ```rust
//! use viseme_sync::viseme::{classify, Viseme};
//!
//! assert_eq!(classify(0.0), Viseme::Bmp);
//! assert_eq!(classify(0.01), Viseme::Fv);   // bound is exclusive
//! assert_eq!(classify(0.1), Viseme::L);
//! assert_eq!(classify(1.0), Viseme::Cdgknstxyz);
//! ```

use super::Viseme;
use crate::audio::Amplitude;

/// Ordered `(exclusive upper bound, state)` bands plus a catch-all.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdTable {
    bands: &'static [(Amplitude, Viseme)],
    fallback: Viseme,
}

/// The process-wide classification table.
pub const DEFAULT_TABLE: ThresholdTable = ThresholdTable {
    bands: &[
        (0.01, Viseme::Bmp),
        (0.03, Viseme::Fv),
        (0.05, Viseme::Th),
        (0.07, Viseme::R),
        (0.09, Viseme::Cdgknstxyz),
        (0.12, Viseme::L),
        (0.14, Viseme::Ae),
        (0.16, Viseme::Qw),
    ],
    fallback: Viseme::Cdgknstxyz,
};

impl ThresholdTable {
    /// Build a table from bands sorted ascending by bound.
    ///
    /// Returns `None` if the bounds are not strictly increasing.
    pub fn new(bands: &'static [(Amplitude, Viseme)], fallback: Viseme) -> Option<Self> {
        let ascending = bands.windows(2).all(|w| w[0].0 < w[1].0);
        ascending.then_some(Self { bands, fallback })
    }

    /// Map `smoothed` to a state.  Total over every input, NaN included
    /// (NaN fails every `<` and lands on the catch-all).
    pub fn classify(&self, smoothed: Amplitude) -> Viseme {
        self.bands
            .iter()
            .find(|(bound, _)| smoothed < *bound)
            .map(|&(_, viseme)| viseme)
            .unwrap_or(self.fallback)
    }

    /// The ordered bands.
    pub fn bands(&self) -> &'static [(Amplitude, Viseme)] {
        self.bands
    }

    /// State for amplitudes at or above the last bound.
    pub fn fallback(&self) -> Viseme {
        self.fallback
    }
}

impl Default for ThresholdTable {
    fn default() -> Self {
        DEFAULT_TABLE
    }
}

/// Classify with [`DEFAULT_TABLE`].
pub fn classify(smoothed: Amplitude) -> Viseme {
    DEFAULT_TABLE.classify(smoothed)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
