//! Sample producers feeding the classification pipeline.
//!
//! Exactly one producer is chosen at setup time:
//!
//! * [`SampleSource::Live`]: spectrum frames from a [`LiveAnalyzer`],
//!   reduced with [`estimate`].
//! * [`SampleSource::Synthetic`]: the timer-driven [`SyntheticGenerator`].
//!
//! Any analyzer construction failure selects the synthetic producer; the
//! failure is logged, never returned.

pub mod synthetic;

pub use synthetic::SyntheticGenerator;

use crate::audio::{estimate, Amplitude, AnalyzerError, LiveAnalyzer};
use crate::config::{AppConfig, FallbackConfig};

// ---------------------------------------------------------------------------
// SourceKind
// ---------------------------------------------------------------------------

/// Which producer is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Live,
    Synthetic,
}

impl SourceKind {
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Live => "live analyzer",
            SourceKind::Synthetic => "synthetic fallback",
        }
    }
}

// ---------------------------------------------------------------------------
// SampleSource
// ---------------------------------------------------------------------------

/// The single active producer of raw amplitudes.
pub enum SampleSource {
    Live(LiveAnalyzer),
    Synthetic(SyntheticGenerator),
}

impl SampleSource {
    /// Open the live analyzer if configured, degrading to the synthetic
    /// generator on any failure.
    pub fn open(config: &AppConfig) -> Self {
        if !config.capture.prefer_live {
            log::info!("live analyzer disabled in settings; using synthetic animation");
            return Self::synthetic(&config.fallback);
        }
        Self::from_analyzer(LiveAnalyzer::open(&config.capture), &config.fallback)
    }

    /// Select a producer from the outcome of analyzer construction.
    pub fn from_analyzer(
        analyzer: Result<LiveAnalyzer, AnalyzerError>,
        fallback: &FallbackConfig,
    ) -> Self {
        match analyzer {
            Ok(analyzer) => Self::Live(analyzer),
            Err(e) => {
                log::warn!("live analyzer unavailable ({e}); falling back to synthetic animation");
                Self::synthetic(fallback)
            }
        }
    }

    pub fn synthetic(fallback: &FallbackConfig) -> Self {
        Self::Synthetic(SyntheticGenerator::new(fallback))
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            SampleSource::Live(_) => SourceKind::Live,
            SampleSource::Synthetic(_) => SourceKind::Synthetic,
        }
    }

    /// Begin producing samples.
    pub fn arm(&mut self) {
        match self {
            SampleSource::Live(analyzer) => analyzer.enable(),
            SampleSource::Synthetic(generator) => generator.arm(),
        }
    }

    /// Stop producing samples.  The producer can be armed again.
    pub fn disarm(&mut self) {
        match self {
            SampleSource::Live(analyzer) => analyzer.disable(),
            SampleSource::Synthetic(generator) => generator.disarm(),
        }
    }

    /// Wait for the next raw amplitude.
    ///
    /// `None` means the live feed is gone for good; the synthetic producer
    /// never ends.
    pub async fn next_amplitude(&mut self) -> Option<Amplitude> {
        match self {
            SampleSource::Live(analyzer) => analyzer.next_frame().await.map(|f| estimate(&f)),
            SampleSource::Synthetic(generator) => Some(generator.next_amplitude().await),
        }
    }

    /// Disable and free the underlying resource.  Idempotent.
    pub fn release(&mut self) {
        match self {
            SampleSource::Live(analyzer) => analyzer.release(),
            SampleSource::Synthetic(generator) => generator.disarm(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
