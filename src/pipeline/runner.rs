//! Capture scheduler: ties one producer to one processing cycle per sample.
//!
//! [`CaptureScheduler`] owns the [`SampleSource`], the [`VisemePipeline`]
//! and the [`VisemeSink`].  It reacts to [`PlaybackState`] transitions
//! received over a `tokio::sync::mpsc` channel and, while capturing, turns
//! every sample from the producer into exactly one sink call.
//!
//! # Flow
//!
//! ```text
//! PlaybackState::Playing
//!   └─▶ arm producer                          [Capturing]
//!         └─▶ next_amplitude → process → sink (repeat)
//! any other PlaybackState
//!   └─▶ disarm producer                       [Stopped]
//! PlaybackState::Released / channel closed
//!   └─▶ release producer, exit
//! live feed lost while running
//!   └─▶ swap to SyntheticGenerator, keep state
//! ```
//!
//! Commands always win over pending samples, so once a stop has been handled
//! no further sample reaches the pipeline.

use std::thread::JoinHandle;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::audio::Amplitude;
use crate::config::{AppConfig, FallbackConfig};
use crate::source::{SampleSource, SourceKind};

use super::processor::VisemePipeline;
use super::sink::VisemeSink;
use super::state::{CaptureState, PlaybackState};

// ---------------------------------------------------------------------------
// SchedulerError
// ---------------------------------------------------------------------------

/// Failures starting the capture thread.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid configuration: {0:#}")]
    Config(anyhow::Error),

    #[error("failed to build capture runtime: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("failed to spawn capture thread: {0}")]
    Spawn(#[source] std::io::Error),
}

// ---------------------------------------------------------------------------
// RunSummary
// ---------------------------------------------------------------------------

/// What a scheduler did before it exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Samples processed across every capture session.
    pub processed: u64,
    /// Producer attached when the scheduler exited.
    pub source: SourceKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

// ---------------------------------------------------------------------------
// CaptureScheduler
// ---------------------------------------------------------------------------

pub struct CaptureScheduler<S: VisemeSink> {
    source: SampleSource,
    pipeline: VisemePipeline,
    sink: S,
    state: CaptureState,
    fallback: FallbackConfig,
    reset_on_restart: bool,
    log_updates: bool,
    processed: u64,
}

impl<S: VisemeSink> CaptureScheduler<S> {
    /// Create a scheduler in the `Idle` state.  The producer stays disarmed
    /// until the first `Playing` transition.
    pub fn new(source: SampleSource, sink: S, config: &AppConfig) -> Self {
        Self {
            source,
            pipeline: VisemePipeline::new(config.smoothing.window),
            sink,
            state: CaptureState::Idle,
            fallback: config.fallback.clone(),
            reset_on_restart: config.smoothing.reset_on_restart,
            log_updates: config.logging.log_updates,
            processed: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Main async loop
    // -----------------------------------------------------------------------

    /// Run until `Released` is received or `playback_rx` closes.
    pub async fn run(&mut self, mut playback_rx: mpsc::Receiver<PlaybackState>) -> RunSummary {
        log::info!("capture scheduler started with {}", self.source.kind().label());

        loop {
            let flow = if self.state.is_capturing() {
                tokio::select! {
                    biased;
                    playback = playback_rx.recv() => self.handle_command(playback),
                    raw = self.source.next_amplitude() => {
                        match raw {
                            Some(raw) => self.process_amplitude(raw),
                            None => self.degrade_to_synthetic(),
                        }
                        Flow::Continue
                    }
                }
            } else {
                let playback = playback_rx.recv().await;
                self.handle_command(playback)
            };

            if flow == Flow::Exit {
                break;
            }
        }

        self.teardown();
        log::info!("capture scheduler exited after {} updates", self.processed);
        self.summary()
    }

    fn handle_command(&mut self, playback: Option<PlaybackState>) -> Flow {
        match playback {
            Some(playback) => self.handle_playback(playback),
            None => {
                log::debug!("playback channel closed");
                Flow::Exit
            }
        }
    }

    // -----------------------------------------------------------------------
    // Event handlers
    // -----------------------------------------------------------------------

    /// Apply one playback transition.
    pub fn handle_playback(&mut self, playback: PlaybackState) -> Flow {
        log::debug!("scheduler: playback → {}", playback.label());

        let next = self.state.next(playback);
        match (self.state, next) {
            (CaptureState::Capturing, CaptureState::Capturing) => {}
            (from, CaptureState::Capturing) => {
                if from == CaptureState::Stopped {
                    log::debug!("scheduler: restarting after stop");
                    if self.reset_on_restart {
                        self.pipeline.reset();
                    }
                }
                self.source.arm();
                log::info!("capture started ({})", self.source.kind().label());
            }
            (CaptureState::Capturing, CaptureState::Stopped) => {
                self.source.disarm();
                log::info!("capture stopped ({} updates so far)", self.processed);
            }
            _ => {}
        }
        self.state = next;

        if playback.is_terminal() {
            Flow::Exit
        } else {
            Flow::Continue
        }
    }

    /// Run one raw amplitude through the pipeline and hand the result to the sink.
    pub fn process_amplitude(&mut self, raw: Amplitude) {
        let update = self.pipeline.process(raw);
        self.processed += 1;
        if self.log_updates {
            log::debug!(
                "viseme={} smoothed={:.3} raw={:.3}",
                update.viseme.index(),
                update.smoothed,
                update.raw
            );
        }
        self.sink.on_viseme_update(update);
    }

    fn degrade_to_synthetic(&mut self) {
        log::warn!("live feed lost; switching to synthetic animation");
        self.source.release();
        self.source = SampleSource::synthetic(&self.fallback);
        if self.state.is_capturing() {
            self.source.arm();
        }
    }

    fn teardown(&mut self) {
        if self.state.is_capturing() {
            self.state = CaptureState::Stopped;
        }
        self.source.release();
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source.kind()
    }

    pub fn pipeline(&self) -> &VisemePipeline {
        &self.pipeline
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            processed: self.processed,
            source: self.source.kind(),
        }
    }
}

impl<S: VisemeSink + Send + 'static> CaptureScheduler<S> {
    /// Start a scheduler on a dedicated thread.
    ///
    /// The producer is opened on that thread (the live analyzer's stream
    /// cannot move between threads) and driven by a current-thread tokio
    /// runtime.  The thread ends when `Released` is sent or every sender is
    /// dropped.
    ///
    /// `config` is validated first; nothing is started if it is rejected.
    pub fn spawn(
        config: AppConfig,
        sink: S,
        playback_rx: mpsc::Receiver<PlaybackState>,
    ) -> Result<JoinHandle<RunSummary>, SchedulerError> {
        config.validate().map_err(SchedulerError::Config)?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(SchedulerError::Runtime)?;

        std::thread::Builder::new()
            .name("viseme-capture".into())
            .spawn(move || {
                let source = SampleSource::open(&config);
                let mut scheduler = CaptureScheduler::new(source, sink, &config);
                runtime.block_on(scheduler.run(playback_rx))
            })
            .map_err(SchedulerError::Spawn)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::LiveAnalyzer;
    use crate::pipeline::VisemeUpdate;
    use crate::viseme::Viseme;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::time::sleep;

    type Seen = Arc<Mutex<Vec<VisemeUpdate>>>;

    fn scheduler(config: &AppConfig) -> (CaptureScheduler<impl VisemeSink>, Seen) {
        let seen: Seen = Arc::default();
        let sink_seen = Arc::clone(&seen);
        let sink = move |u: VisemeUpdate| sink_seen.lock().unwrap().push(u);
        let source = SampleSource::synthetic(&config.fallback);
        (CaptureScheduler::new(source, sink, config), seen)
    }

    #[tokio::test(start_paused = true)]
    async fn one_update_per_tick_while_playing() {
        let config = AppConfig::default();
        let (mut sched, seen) = scheduler(&config);
        let (tx, rx) = mpsc::channel(8);

        let driver = async move {
            tx.send(PlaybackState::Playing).await.unwrap();
            sleep(Duration::from_millis(275)).await;
            tx.send(PlaybackState::Stopped).await.unwrap();
            sleep(Duration::from_millis(500)).await;
            tx.send(PlaybackState::Released).await.unwrap();
        };
        let (summary, ()) = tokio::join!(sched.run(rx), driver);

        // ticks at 50, 100, 150, 200, 250 ms; nothing after the stop
        assert_eq!(summary.processed, 5);
        assert_eq!(seen.lock().unwrap().len(), 5);
        assert_eq!(summary.source, SourceKind::Synthetic);
        assert_eq!(sched.state(), CaptureState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_rearms_the_generator() {
        let config = AppConfig::default();
        let (mut sched, seen) = scheduler(&config);
        let (tx, rx) = mpsc::channel(8);

        let driver = async move {
            tx.send(PlaybackState::Playing).await.unwrap();
            sleep(Duration::from_millis(125)).await; // 2 ticks
            tx.send(PlaybackState::Stopped).await.unwrap();
            sleep(Duration::from_millis(1000)).await;
            tx.send(PlaybackState::Playing).await.unwrap();
            sleep(Duration::from_millis(175)).await; // 3 ticks
            tx.send(PlaybackState::Released).await.unwrap();
        };
        let (summary, ()) = tokio::join!(sched.run(rx), driver);

        assert_eq!(summary.processed, 5);
        assert!(seen
            .lock()
            .unwrap()
            .iter()
            .all(|u| (0.0..=1.0).contains(&u.smoothed) && u.viseme != Viseme::O));
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_is_produced_before_playing() {
        let config = AppConfig::default();
        let (mut sched, seen) = scheduler(&config);
        let (tx, rx) = mpsc::channel(8);

        let driver = async move {
            tx.send(PlaybackState::Preparing).await.unwrap();
            tx.send(PlaybackState::Ready).await.unwrap();
            sleep(Duration::from_secs(2)).await;
        };
        // Dropping the sender at the end of `driver` closes the channel.
        let (summary, ()) = tokio::join!(sched.run(rx), driver);

        assert_eq!(summary.processed, 0);
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(sched.state(), CaptureState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn closing_the_channel_mid_capture_tears_down() {
        let config = AppConfig::default();
        let (mut sched, _seen) = scheduler(&config);
        let (tx, rx) = mpsc::channel(8);

        let driver = async move {
            tx.send(PlaybackState::Playing).await.unwrap();
            sleep(Duration::from_millis(60)).await;
        };
        let (summary, ()) = tokio::join!(sched.run(rx), driver);

        assert_eq!(summary.processed, 1);
        assert_eq!(sched.state(), CaptureState::Stopped);
    }

    #[tokio::test]
    async fn window_carries_over_between_sessions_by_default() {
        let config = AppConfig::default();
        let (mut sched, seen) = scheduler(&config);

        sched.handle_playback(PlaybackState::Playing);
        sched.process_amplitude(0.5);
        sched.handle_playback(PlaybackState::Stopped);
        sched.handle_playback(PlaybackState::Playing);
        sched.process_amplitude(0.5);

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].smoothed, 0.1);
        assert_eq!(seen[1].smoothed, 0.2);
        assert_eq!(seen[1].viseme, Viseme::Cdgknstxyz);
    }

    #[tokio::test]
    async fn window_resets_on_restart_when_configured() {
        let mut config = AppConfig::default();
        config.smoothing.reset_on_restart = true;
        let (mut sched, seen) = scheduler(&config);

        sched.handle_playback(PlaybackState::Playing);
        sched.process_amplitude(0.5);
        sched.handle_playback(PlaybackState::Stopped);
        sched.handle_playback(PlaybackState::Playing);
        sched.process_amplitude(0.5);

        let seen = seen.lock().unwrap();
        assert_eq!(seen[1].smoothed, 0.1);
    }

    #[tokio::test]
    async fn released_exits_from_any_state() {
        let config = AppConfig::default();
        let (mut sched, _seen) = scheduler(&config);
        assert_eq!(sched.handle_playback(PlaybackState::Released), Flow::Exit);

        let (mut sched, _seen) = scheduler(&config);
        sched.handle_playback(PlaybackState::Playing);
        assert_eq!(sched.handle_playback(PlaybackState::Released), Flow::Exit);
        assert_eq!(sched.state(), CaptureState::Stopped);
    }

    #[tokio::test]
    async fn repeated_playing_keeps_capturing() {
        let config = AppConfig::default();
        let (mut sched, _seen) = scheduler(&config);
        assert_eq!(sched.handle_playback(PlaybackState::Playing), Flow::Continue);
        assert_eq!(sched.handle_playback(PlaybackState::Playing), Flow::Continue);
        assert_eq!(sched.state(), CaptureState::Capturing);
    }

    fn live_scheduler(
        config: &AppConfig,
    ) -> (CaptureScheduler<impl VisemeSink>, Seen, mpsc::Sender<Vec<i8>>) {
        let seen: Seen = Arc::default();
        let sink_seen = Arc::clone(&seen);
        let sink = move |u: VisemeUpdate| sink_seen.lock().unwrap().push(u);
        let (frames_tx, frames_rx) = mpsc::channel(8);
        let source = SampleSource::Live(LiveAnalyzer::from_receiver(frames_rx));
        (CaptureScheduler::new(source, sink, config), seen, frames_tx)
    }

    #[tokio::test(start_paused = true)]
    async fn lost_live_feed_switches_to_synthetic_ticks() {
        let config = AppConfig::default();
        let (mut sched, seen, frames_tx) = live_scheduler(&config);
        assert_eq!(sched.source_kind(), SourceKind::Live);
        let (tx, rx) = mpsc::channel(8);

        let driver = async move {
            tx.send(PlaybackState::Playing).await.unwrap();
            sleep(Duration::from_millis(10)).await;
            frames_tx.send(vec![-128; 128]).await.unwrap();
            sleep(Duration::from_millis(10)).await;
            drop(frames_tx); // feed gone at 20 ms
            sleep(Duration::from_millis(175)).await;
            tx.send(PlaybackState::Released).await.unwrap();
        };
        let (summary, ()) = tokio::join!(sched.run(rx), driver);

        // one live frame, then synthetic ticks at 70, 120, 170 ms
        assert_eq!(summary.source, SourceKind::Synthetic);
        assert_eq!(sched.source_kind(), SourceKind::Synthetic);
        assert_eq!(summary.processed, 4);
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].raw, 1.0);
        assert!(seen[1..].iter().all(|u| (0.0..=1.0).contains(&u.raw)));
    }

    #[tokio::test(start_paused = true)]
    async fn frames_queued_before_playing_never_reach_the_sink() {
        let config = AppConfig::default();
        let (mut sched, seen, frames_tx) = live_scheduler(&config);
        for _ in 0..3 {
            frames_tx.try_send(vec![-128; 128]).unwrap();
        }
        let (tx, rx) = mpsc::channel(8);

        let driver = async move {
            tx.send(PlaybackState::Playing).await.unwrap();
            sleep(Duration::from_millis(10)).await;
            frames_tx.send(vec![0; 128]).await.unwrap();
            sleep(Duration::from_millis(10)).await;
            tx.send(PlaybackState::Released).await.unwrap();
            drop(frames_tx);
        };
        let (summary, ()) = tokio::join!(sched.run(rx), driver);

        assert_eq!(summary.processed, 1);
        assert_eq!(summary.source, SourceKind::Live);
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].raw, 0.0);
        assert_eq!(seen[0].viseme, Viseme::Bmp);
    }

    #[test]
    fn spawn_rejects_zero_window() {
        let mut config = AppConfig::default();
        config.capture.prefer_live = false;
        config.smoothing.window = 0;
        let (_tx, rx) = mpsc::channel(8);

        let result = CaptureScheduler::spawn(config, |_: VisemeUpdate| {}, rx);
        assert!(matches!(result, Err(SchedulerError::Config(_))));
    }

    #[test]
    fn spawn_rejects_zero_time_scale() {
        let mut config = AppConfig::default();
        config.capture.prefer_live = false;
        config.fallback.time_scale_ms = 0.0;
        let (_tx, rx) = mpsc::channel(8);

        let err = CaptureScheduler::spawn(config, |_: VisemeUpdate| {}, rx).unwrap_err();
        assert!(err.to_string().contains("time_scale_ms"), "{err}");
    }

    #[test]
    fn spawned_scheduler_runs_synthetic_until_released() {
        let mut config = AppConfig::default();
        config.capture.prefer_live = false;
        config.fallback.tick_ms = 5;

        let seen: Seen = Arc::default();
        let sink_seen = Arc::clone(&seen);
        let sink = move |u: VisemeUpdate| sink_seen.lock().unwrap().push(u);
        let (tx, rx) = mpsc::channel(8);

        let handle = CaptureScheduler::spawn(config, sink, rx).expect("spawn");
        tx.blocking_send(PlaybackState::Playing).unwrap();
        std::thread::sleep(Duration::from_millis(200));
        tx.blocking_send(PlaybackState::Released).unwrap();

        let summary = handle.join().expect("capture thread panicked");
        assert_eq!(summary.source, SourceKind::Synthetic);
        assert!(summary.processed > 0);
        assert_eq!(seen.lock().unwrap().len() as u64, summary.processed);
    }
}
