//! Synthetic amplitude used when no live analyzer is available.
//!
//! Each tick yields `(sin(now_ms / time_scale_ms) + 1) / 2`, a smooth
//! oscillation over `[0, 1]` with period `2π · time_scale_ms` (≈ 628 ms with
//! the default scale).  Ticks only fire while the generator is armed; arming
//! schedules the first tick one period from now.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use crate::audio::Amplitude;
use crate::config::FallbackConfig;

/// Timer-driven sine generator.
#[derive(Debug)]
pub struct SyntheticGenerator {
    tick: Duration,
    time_scale_ms: f64,
    interval: Option<Interval>,
}

impl SyntheticGenerator {
    pub fn new(config: &FallbackConfig) -> Self {
        Self {
            tick: Duration::from_millis(config.tick_ms.max(1)),
            time_scale_ms: config.time_scale_ms,
            interval: None,
        }
    }

    /// Amplitude at wall-clock time `time_ms`.
    ///
    /// ```
    /// use viseme_sync::config::FallbackConfig;
    /// use viseme_sync::source::SyntheticGenerator;
    ///
    /// let generator = SyntheticGenerator::new(&FallbackConfig::default());
    /// assert_eq!(generator.sample_at(0.0), 0.5);
    /// ```
    pub fn sample_at(&self, time_ms: f64) -> Amplitude {
        ((time_ms / self.time_scale_ms).sin() + 1.0) / 2.0
    }

    /// Duration of one full oscillation.
    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(std::f64::consts::TAU * self.time_scale_ms / 1000.0)
    }

    /// Time between ticks.
    pub fn tick_period(&self) -> Duration {
        self.tick
    }

    /// Start (or restart) the tick schedule.
    pub fn arm(&mut self) {
        let mut interval = interval_at(Instant::now() + self.tick, self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.interval = Some(interval);
    }

    /// Cancel the tick schedule.  Pending waits never complete.
    pub fn disarm(&mut self) {
        self.interval = None;
    }

    pub fn is_armed(&self) -> bool {
        self.interval.is_some()
    }

    /// Wait for the next tick and sample the current wall-clock time.
    ///
    /// Never resolves while disarmed.
    pub async fn next_amplitude(&mut self) -> Amplitude {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
        self.sample_at(now_ms())
    }
}

fn now_ms() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
