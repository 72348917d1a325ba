//! Signal-to-state pipeline and its scheduling.
//!
//! # Architecture
//!
//! ```text
//! PlaybackState (mpsc)
//!        │
//!        ▼
//! CaptureScheduler::run()  ← current-thread runtime on "viseme-capture"
//!        │
//!        ├─ Playing        → arm SampleSource              [Capturing]
//!        ├─ sample ready   → VisemePipeline::process → VisemeSink
//!        ├─ other state    → disarm SampleSource           [Stopped]
//!        └─ Released       → release SampleSource, exit
//!
//! ChannelSink ──try_send──▶ mpsc::Receiver<VisemeUpdate> ← drained by the UI
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use tokio::sync::mpsc;
//! use viseme_sync::config::AppConfig;
//! use viseme_sync::pipeline::{CaptureScheduler, ChannelSink, PlaybackState};
//!
//! let config = AppConfig::default();
//! let (sink, mut updates) = ChannelSink::channel(32);
//! let (playback_tx, playback_rx) = mpsc::channel(8);
//!
//! let handle = CaptureScheduler::spawn(config, sink, playback_rx).unwrap();
//! playback_tx.blocking_send(PlaybackState::Playing).unwrap();
//!
//! while let Some(update) = updates.blocking_recv() {
//!     println!("{} @ {:.2}", update.viseme, update.smoothed);
//! }
//! # let _ = handle;
//! ```

pub mod processor;
pub mod runner;
pub mod sink;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use processor::VisemePipeline;
pub use runner::{CaptureScheduler, Flow, RunSummary, SchedulerError};
pub use sink::{ChannelSink, VisemeSink, VisemeUpdate};
pub use state::{CaptureState, PlaybackState};
