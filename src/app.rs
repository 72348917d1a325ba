//! Mouth viewer: egui/eframe application.
//!
//! # Architecture
//!
//! [`VisemeApp`] is the top-level [`eframe::App`].  It plays the part of the
//! media player: the Play/Stop toggle drives [`PlaybackState`] into the
//! capture scheduler, and every [`VisemeUpdate`] the scheduler emits is
//! drained from a bounded channel once per frame.
//!
//! * `playback_tx`: sends [`PlaybackState`] transitions to the scheduler.
//! * `updates`:     receives [`VisemeUpdate`]s enqueued by the capture
//!   thread.
//!
//! The mouth is painted from primitives: lip width and opening follow the
//! current [`Viseme`], and the whole shape is scaled by
//! `1 + raw * ui.scale_gain`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use eframe::egui;
use tokio::sync::mpsc;

use crate::config::AppConfig;
use crate::pipeline::{PlaybackState, RunSummary, VisemeUpdate};
use crate::viseme::Viseme;

/// Lip size at scale 1.0 and full openness.
const MOUTH_BASE: egui::Vec2 = egui::vec2(120.0, 60.0);
/// The closed mouth is still drawn as a visible line.
const MIN_OPENING: f32 = 3.0;

// ---------------------------------------------------------------------------
// Mouth geometry
// ---------------------------------------------------------------------------

/// Outer lip size and inner opening size for `viseme` at amplitude `raw`.
pub fn mouth_geometry(viseme: Viseme, raw: f64, scale_gain: f32) -> (egui::Vec2, egui::Vec2) {
    let scale = 1.0 + raw.clamp(0.0, 1.0) as f32 * scale_gain;
    let openness = viseme.openness();

    // Rounded visemes pull the corners in.
    let width = match viseme {
        Viseme::O | Viseme::Qw => MOUTH_BASE.x * 0.7,
        _ => MOUTH_BASE.x,
    };
    let outer = egui::vec2(width, MOUTH_BASE.y * (0.35 + 0.65 * openness)) * scale;
    let inner = egui::vec2(
        outer.x * 0.8,
        (MOUTH_BASE.y * 0.8 * openness * scale).max(MIN_OPENING),
    );
    (outer, inner)
}

// ---------------------------------------------------------------------------
// VisemeApp
// ---------------------------------------------------------------------------

pub struct VisemeApp {
    // ── Display state ────────────────────────────────────────────────────
    /// Update currently on screen.
    current: VisemeUpdate,
    /// Playback state last sent to the scheduler.
    playback: PlaybackState,

    // ── Channels ─────────────────────────────────────────────────────────
    updates: mpsc::Receiver<VisemeUpdate>,
    /// `None` once the scheduler has been released.
    playback_tx: Option<mpsc::Sender<PlaybackState>>,

    // ── Capture thread ───────────────────────────────────────────────────
    capture_thread: Option<JoinHandle<RunSummary>>,
    /// Updates the capture thread could not enqueue.
    dropped: Arc<AtomicU64>,

    config: AppConfig,
}

impl VisemeApp {
    pub fn new(
        config: AppConfig,
        updates: mpsc::Receiver<VisemeUpdate>,
        playback_tx: mpsc::Sender<PlaybackState>,
        capture_thread: Option<JoinHandle<RunSummary>>,
        dropped: Arc<AtomicU64>,
    ) -> Self {
        Self {
            current: closed_mouth(),
            playback: PlaybackState::Ready,
            updates,
            playback_tx: Some(playback_tx),
            capture_thread,
            dropped,
            config,
        }
    }

    pub fn current(&self) -> VisemeUpdate {
        self.current
    }

    pub fn playback(&self) -> PlaybackState {
        self.playback
    }

    // ── Channel polling ──────────────────────────────────────────────────

    /// Drain all pending updates (non-blocking).  Only the newest matters.
    fn poll_updates(&mut self) {
        while let Ok(update) = self.updates.try_recv() {
            // Anything still queued after Stop belongs to the old session.
            if self.playback.is_playing() {
                self.current = update;
            }
        }
    }

    // ── Playback control ─────────────────────────────────────────────────

    fn send_playback(&mut self, state: PlaybackState) {
        self.playback = state;
        let Some(tx) = &self.playback_tx else {
            return;
        };
        if let Err(e) = tx.try_send(state) {
            log::warn!("could not deliver playback state {}: {e}", state.label());
        }
    }

    /// Flip between Playing and Stopped.
    pub fn toggle_playback(&mut self) {
        if self.playback.is_playing() {
            self.send_playback(PlaybackState::Stopped);
            self.current = closed_mouth();
        } else {
            self.send_playback(PlaybackState::Playing);
        }
    }

    /// Release the scheduler and wait for its thread.  Idempotent; only the
    /// first call returns the summary.
    pub fn shutdown(&mut self) -> Option<RunSummary> {
        self.send_playback(PlaybackState::Released);
        // Dropping the sender also ends the scheduler if Released was lost.
        self.playback_tx = None;

        let handle = self.capture_thread.take()?;
        match handle.join() {
            Ok(summary) => {
                log::info!(
                    "capture thread finished: {} samples via {}, {} updates dropped",
                    summary.processed,
                    summary.source.label(),
                    self.dropped.load(Ordering::Relaxed)
                );
                Some(summary)
            }
            Err(_) => {
                log::error!("capture thread panicked");
                None
            }
        }
    }

    // ── Drawing ──────────────────────────────────────────────────────────

    fn draw_mouth(&self, ui: &mut egui::Ui) {
        let height = (ui.available_height() - 70.0).max(MOUTH_BASE.y * 2.0);
        let (rect, _) = ui.allocate_exact_size(
            egui::vec2(ui.available_width(), height),
            egui::Sense::hover(),
        );
        let (outer, inner) =
            mouth_geometry(self.current.viseme, self.current.raw, self.config.ui.scale_gain);

        let painter = ui.painter();
        let center = rect.center();
        painter.rect_filled(
            egui::Rect::from_center_size(center, outer),
            outer.y / 2.0,
            egui::Color32::from_rgb(190, 70, 80),
        );
        painter.rect_filled(
            egui::Rect::from_center_size(center, inner),
            inner.y / 2.0,
            egui::Color32::from_rgb(60, 15, 20),
        );
    }

    fn draw_debug(&self, ui: &mut egui::Ui) {
        ui.label(
            egui::RichText::new(format!("Amplitude: {:.2}", self.current.smoothed))
                .color(egui::Color32::from_rgb(180, 180, 180))
                .size(12.0),
        );
        ui.label(
            egui::RichText::new(format!("State: {}", self.current.viseme.index()))
                .color(egui::Color32::from_rgb(180, 180, 180))
                .size(12.0),
        );
        let dropped = self.dropped.load(Ordering::Relaxed);
        if dropped > 0 {
            ui.label(
                egui::RichText::new(format!("Dropped: {dropped}"))
                    .color(egui::Color32::from_rgb(255, 136, 68))
                    .size(11.0),
            );
        }
    }

    fn draw_controls(&mut self, ui: &mut egui::Ui) {
        let label = if self.playback.is_playing() { "Stop" } else { "Play" };
        if ui
            .add(egui::Button::new(egui::RichText::new(label).size(14.0)))
            .clicked()
        {
            self.toggle_playback();
        }
    }
}

fn closed_mouth() -> VisemeUpdate {
    VisemeUpdate {
        viseme: Viseme::Bmp,
        smoothed: 0.0,
        raw: 0.0,
    }
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for VisemeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_updates();

        // The sink wakes us on every update; this covers a lost wake-up.
        if self.playback.is_playing() {
            ctx.request_repaint_after(Duration::from_millis(100));
        }

        let frame = egui::Frame::new()
            .fill(egui::Color32::from_rgb(30, 30, 30))
            .inner_margin(egui::Margin::same(8));

        egui::CentralPanel::default().frame(frame).show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                self.draw_mouth(ui);
                if self.config.ui.show_debug {
                    self.draw_debug(ui);
                }
                ui.add_space(4.0);
                self.draw_controls(ui);
            });
        });
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        log::info!("viewer closing");
        let _ = self.shutdown();
    }
}

impl Drop for VisemeApp {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
