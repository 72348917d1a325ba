//! Hand-off from the capture thread to the renderer.
//!
//! The pipeline never waits on rendering: [`ChannelSink`] does a
//! `try_send` of each [`VisemeUpdate`] into a bounded queue drained by the
//! UI thread, and counts what it had to drop when the queue was full.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::audio::Amplitude;
use crate::viseme::Viseme;

// ---------------------------------------------------------------------------
// VisemeUpdate
// ---------------------------------------------------------------------------

/// Result of one processing cycle, passed to the renderer by value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisemeUpdate {
    /// Classified mouth state.
    pub viseme: Viseme,
    /// Moving-average amplitude the state was derived from.
    pub smoothed: Amplitude,
    /// Amplitude of this cycle before smoothing.
    pub raw: Amplitude,
}

// ---------------------------------------------------------------------------
// VisemeSink
// ---------------------------------------------------------------------------

/// Consumer of pipeline output.  Called once per processed sample on the
/// capture thread; implementations must not block.
pub trait VisemeSink {
    fn on_viseme_update(&mut self, update: VisemeUpdate);
}

impl<F> VisemeSink for F
where
    F: FnMut(VisemeUpdate),
{
    fn on_viseme_update(&mut self, update: VisemeUpdate) {
        self(update)
    }
}

// ---------------------------------------------------------------------------
// ChannelSink
// ---------------------------------------------------------------------------

type Waker = Box<dyn Fn() + Send>;

/// Non-blocking enqueue onto a bounded channel, with an optional wake-up
/// hook for the receiving event loop.
pub struct ChannelSink {
    tx: mpsc::Sender<VisemeUpdate>,
    dropped: Arc<AtomicU64>,
    waker: Option<Waker>,
    closed: bool,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<VisemeUpdate>) -> Self {
        Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
            waker: None,
            closed: false,
        }
    }

    /// Create a bounded channel and a sink feeding it.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<VisemeUpdate>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    /// Call `waker` after every successful enqueue (e.g. to request a
    /// repaint).
    pub fn with_waker<W>(mut self, waker: W) -> Self
    where
        W: Fn() + Send + 'static,
    {
        self.waker = Some(Box::new(waker));
        self
    }

    /// Shared count of updates dropped because the queue was full.
    pub fn dropped(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.dropped)
    }
}

impl VisemeSink for ChannelSink {
    fn on_viseme_update(&mut self, update: VisemeUpdate) {
        match self.tx.try_send(update) {
            Ok(()) => {
                if let Some(wake) = &self.waker {
                    wake();
                }
            }
            Err(TrySendError::Full(_)) => {
                let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                log::trace!("render queue full; dropped update ({total} total)");
            }
            Err(TrySendError::Closed(_)) => {
                if !self.closed {
                    log::debug!("renderer gone; discarding further updates");
                    self.closed = true;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
