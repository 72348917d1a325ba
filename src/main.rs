//! Application entry point: mouth viewer.
//!
//! # Startup sequence
//!
//! 1. Load [`AppConfig`] from disk (defaults on first run or on error).
//! 2. Initialise logging at `logging.level` (overridable via `RUST_LOG`).
//! 3. Run [`eframe::run_native`]; inside the creator:
//!    * build the render channel with a repaint waker,
//!    * spawn the capture scheduler thread,
//!    * hand both ends to [`VisemeApp`].
//!
//! Closing the window releases the scheduler and joins its thread.

use tokio::sync::mpsc;
use viseme_sync::{
    app::VisemeApp,
    config::AppConfig,
    pipeline::{CaptureScheduler, ChannelSink, PlaybackState},
};

use eframe::egui;

/// Render queue depth.  The UI only shows the newest update.
const UPDATE_QUEUE: usize = 32;
const PLAYBACK_QUEUE: usize = 8;

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options(config: &AppConfig) -> eframe::NativeOptions {
    let (w, h) = config.ui.window_size;
    let mut vp = egui::ViewportBuilder::default()
        .with_inner_size([w, h])
        .with_min_inner_size([200.0, 200.0]);

    if config.ui.always_on_top {
        vp = vp.with_always_on_top();
    }

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> eframe::Result<()> {
    // 1. Configuration (before logging so the level comes from it)
    let loaded = AppConfig::load().and_then(|c| c.validate().map(|()| c));
    let config = loaded.as_ref().cloned().unwrap_or_default();

    // 2. Logging
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();
    log::info!("viseme viewer starting up");
    if let Err(e) = &loaded {
        log::warn!("Failed to load config ({e:#}); using defaults");
    }

    // 3. Window + capture scheduler
    let options = native_options(&config);

    eframe::run_native(
        "Viseme Sync",
        options,
        Box::new(move |cc| {
            let ctx = cc.egui_ctx.clone();
            let (sink, updates) = ChannelSink::channel(UPDATE_QUEUE);
            let sink = sink.with_waker(move || ctx.request_repaint());
            let dropped = sink.dropped();

            let (playback_tx, playback_rx) = mpsc::channel::<PlaybackState>(PLAYBACK_QUEUE);
            let handle = CaptureScheduler::spawn(config.clone(), sink, playback_rx)?;

            Ok(Box::new(VisemeApp::new(
                config,
                updates,
                playback_tx,
                Some(handle),
                dropped,
            )))
        }),
    )
}
