//! Playback lifecycle and the capture state machine.
//!
//! [`PlaybackState`] is owned by whatever plays the audio; the scheduler only
//! consumes its transitions.  [`CaptureState`] is the scheduler's own view:
//!
//! ```text
//! Idle ──Playing──▶ Capturing ──any other playback state──▶ Stopped
//!                       ▲                                      │
//!                       └─────────────── Playing ──────────────┘
//! ```
//!
//! A restart goes straight from `Stopped` back to `Capturing`; `Idle` is
//! only the state before the first `Playing`.
//!
//! `Released` is terminal: the scheduler tears down its producer and exits.

// ---------------------------------------------------------------------------
// PlaybackState
// ---------------------------------------------------------------------------

/// Lifecycle of the external audio source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Preparing,
    Ready,
    Playing,
    Stopped,
    /// Resources freed; no further transitions.
    Released,
}

impl PlaybackState {
    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PlaybackState::Released)
    }

    pub fn label(&self) -> &'static str {
        match self {
            PlaybackState::Idle => "Idle",
            PlaybackState::Preparing => "Preparing",
            PlaybackState::Ready => "Ready",
            PlaybackState::Playing => "Playing",
            PlaybackState::Stopped => "Stopped",
            PlaybackState::Released => "Released",
        }
    }
}

// ---------------------------------------------------------------------------
// CaptureState
// ---------------------------------------------------------------------------

/// Whether a producer is currently attached to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureState {
    #[default]
    Idle,
    Capturing,
    Stopped,
}

impl CaptureState {
    /// State after observing `playback`.
    ///
    /// ```
    /// use viseme_sync::pipeline::{CaptureState, PlaybackState};
    ///
    /// let s = CaptureState::Idle.next(PlaybackState::Playing);
    /// assert_eq!(s, CaptureState::Capturing);
    /// assert_eq!(s.next(PlaybackState::Stopped), CaptureState::Stopped);
    /// ```
    pub fn next(self, playback: PlaybackState) -> CaptureState {
        match (self, playback.is_playing()) {
            (_, true) => CaptureState::Capturing,
            (CaptureState::Capturing, false) => CaptureState::Stopped,
            (other, false) => other,
        }
    }

    pub fn is_capturing(&self) -> bool {
        matches!(self, CaptureState::Capturing)
    }

    pub fn label(&self) -> &'static str {
        match self {
            CaptureState::Idle => "Idle",
            CaptureState::Capturing => "Capturing",
            CaptureState::Stopped => "Stopped",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const NOT_PLAYING: [PlaybackState; 5] = [
        PlaybackState::Idle,
        PlaybackState::Preparing,
        PlaybackState::Ready,
        PlaybackState::Stopped,
        PlaybackState::Released,
    ];

    #[test]
    fn defaults_are_idle() {
        assert_eq!(PlaybackState::default(), PlaybackState::Idle);
        assert_eq!(CaptureState::default(), CaptureState::Idle);
    }

    #[test]
    fn playing_starts_capture_from_any_state() {
        for s in [CaptureState::Idle, CaptureState::Capturing, CaptureState::Stopped] {
            assert_eq!(s.next(PlaybackState::Playing), CaptureState::Capturing);
        }
    }

    #[test]
    fn leaving_playing_stops_capture() {
        for p in NOT_PLAYING {
            assert_eq!(CaptureState::Capturing.next(p), CaptureState::Stopped, "{p:?}");
        }
    }

    #[test]
    fn idle_and_stopped_ignore_non_playing() {
        for p in NOT_PLAYING {
            assert_eq!(CaptureState::Idle.next(p), CaptureState::Idle);
            assert_eq!(CaptureState::Stopped.next(p), CaptureState::Stopped);
        }
    }

    #[test]
    fn restart_skips_idle() {
        let stopped = CaptureState::Idle
            .next(PlaybackState::Playing)
            .next(PlaybackState::Stopped);
        assert_eq!(stopped, CaptureState::Stopped);
        assert_eq!(stopped.next(PlaybackState::Idle), CaptureState::Stopped);
        assert_eq!(stopped.next(PlaybackState::Playing), CaptureState::Capturing);
    }

    #[test]
    fn only_capturing_is_capturing() {
        assert!(CaptureState::Capturing.is_capturing());
        assert!(!CaptureState::Idle.is_capturing());
        assert!(!CaptureState::Stopped.is_capturing());
    }

    #[test]
    fn released_is_the_only_terminal_state() {
        assert!(PlaybackState::Released.is_terminal());
        assert!(!PlaybackState::Stopped.is_terminal());
        assert!(PlaybackState::Playing.is_playing());
    }

    #[test]
    fn labels() {
        assert_eq!(PlaybackState::Preparing.label(), "Preparing");
        assert_eq!(CaptureState::Capturing.label(), "Capturing");
    }
}
