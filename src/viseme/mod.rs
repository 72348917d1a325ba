//! The nine mouth states and the amplitude → state classifier.
//!
//! Index order is fixed by the artwork set and is *not* monotonic in mouth
//! opening:
//!
//! | Index | Variant | Asset | Shape |
//! |-------|---------|-------|-------|
//! | 0 | `Bmp` | `bmp` | closed |
//! | 1 | `Fv` | `fv` | slightly open (A) |
//! | 2 | `Th` | `th` | slightly open (B) |
//! | 3 | `R` | `r` | slightly open (C) |
//! | 4 | `Cdgknstxyz` | `cdgknstxyz` | mostly open |
//! | 5 | `L` | `l` | slightly open (D) |
//! | 6 | `Ae` | `ae` | half open |
//! | 7 | `Qw` | `qw` | mostly open (B) |
//! | 8 | `O` | `o` | fully open |

pub mod classifier;

pub use classifier::{classify, ThresholdTable, DEFAULT_TABLE};

// ---------------------------------------------------------------------------
// Viseme
// ---------------------------------------------------------------------------

/// One of the nine drawable mouth states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum Viseme {
    /// Lips together: silence, b/m/p.
    #[default]
    Bmp = 0,
    Fv = 1,
    Th = 2,
    R = 3,
    Cdgknstxyz = 4,
    L = 5,
    Ae = 6,
    Qw = 7,
    /// Widest opening.  Not produced by the default threshold table.
    O = 8,
}

impl Viseme {
    /// Every state, in index order.
    pub const ALL: [Viseme; 9] = [
        Viseme::Bmp,
        Viseme::Fv,
        Viseme::Th,
        Viseme::R,
        Viseme::Cdgknstxyz,
        Viseme::L,
        Viseme::Ae,
        Viseme::Qw,
        Viseme::O,
    ];

    /// Look up a state by its index.
    ///
    /// ```
    /// use viseme_sync::viseme::Viseme;
    ///
    /// assert_eq!(Viseme::from_index(4), Some(Viseme::Cdgknstxyz));
    /// assert_eq!(Viseme::from_index(9), None);
    /// ```
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(usize::from(index)).copied()
    }

    /// Index in `0..=8`.
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Stem of the image asset drawn for this state.
    pub fn asset_name(self) -> &'static str {
        match self {
            Viseme::Bmp => "bmp",
            Viseme::Fv => "fv",
            Viseme::Th => "th",
            Viseme::R => "r",
            Viseme::Cdgknstxyz => "cdgknstxyz",
            Viseme::L => "l",
            Viseme::Ae => "ae",
            Viseme::Qw => "qw",
            Viseme::O => "o",
        }
    }

    /// Short description of the mouth shape.
    pub fn label(self) -> &'static str {
        match self {
            Viseme::Bmp => "closed",
            Viseme::Fv | Viseme::Th | Viseme::R | Viseme::L => "slightly open",
            Viseme::Cdgknstxyz | Viseme::Qw => "mostly open",
            Viseme::Ae => "half open",
            Viseme::O => "fully open",
        }
    }

    /// Vertical lip separation in `[0.0, 1.0]`, used when drawing without
    /// image assets.
    pub fn openness(self) -> f32 {
        match self {
            Viseme::Bmp => 0.0,
            Viseme::Fv => 0.15,
            Viseme::Th => 0.2,
            Viseme::R => 0.25,
            Viseme::L => 0.3,
            Viseme::Ae => 0.5,
            Viseme::Cdgknstxyz => 0.7,
            Viseme::Qw => 0.75,
            Viseme::O => 1.0,
        }
    }
}

impl std::fmt::Display for Viseme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.index(), self.asset_name())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
