//! Frequency-domain frame → normalised loudness.
//!
//! [`estimate`] reduces one analyzer frame (signed byte bins) to a single
//! [`Amplitude`] in `[0.0, 1.0]`:
//!
//! 1. take the first [`CONSUMED_BINS`] bins,
//! 2. average `|bin| / 128`,
//! 3. convert to a decibel-like score `20 · ln(mean)` (floor [`SILENCE_DB`]),
//! 4. map `[-60, 0]` onto `[0, 1]` and clamp.
//!
//! # Example
//!
//! ```rust
//! use viseme_sync::audio::estimate;
//!
//! assert_eq!(estimate(&[]), 0.0);
//! assert_eq!(estimate(&[0; 128]), 0.0);
//! assert_eq!(estimate(&[-128; 128]), 1.0);
//! ```

/// Normalised loudness for one sampling instant, always in `[0.0, 1.0]`.
pub type Amplitude = f64;

/// Number of leading bins consumed from each frame.
pub const CONSUMED_BINS: usize = 128;

/// Score assigned to a frame with zero magnitude.
pub const SILENCE_DB: f64 = -60.0;

/// Full-scale value of one byte bin.
const BIN_SCALE: f64 = 128.0;

/// Convert a frequency-domain frame into a normalised amplitude.
///
/// Never fails: an empty frame, or one whose bins are all zero, yields `0.0`.
///
/// The mean is taken over the bins actually present, so a frame shorter than
/// [`CONSUMED_BINS`] is not diluted by missing bins.
pub fn estimate(bins: &[i8]) -> Amplitude {
    if bins.is_empty() {
        return 0.0;
    }

    let prefix = &bins[..bins.len().min(CONSUMED_BINS)];
    let mean = prefix
        .iter()
        .map(|&b| (f64::from(b) / BIN_SCALE).abs())
        .sum::<f64>()
        / prefix.len() as f64;

    // mean > 0 guards the logarithm, so the score is always finite.
    let score = if mean > 0.0 { 20.0 * mean.ln() } else { SILENCE_DB };

    ((score - SILENCE_DB) / -SILENCE_DB).clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_frame_is_silent() {
        assert_eq!(estimate(&[]), 0.0);
    }

    #[test]
    fn zero_frame_hits_the_floor() {
        assert_eq!(estimate(&[0; 128]), 0.0);
    }

    #[test]
    fn negative_full_scale_is_exactly_one() {
        // |-128| / 128 = 1.0 → ln(1) = 0 dB → normalised 1.0
        assert_eq!(estimate(&[-128; 128]), 1.0);
    }

    #[test]
    fn positive_saturation_is_near_one() {
        let amp = estimate(&[127; 128]);
        assert!(amp > 0.99 && amp <= 1.0, "amp = {amp}");
    }

    #[test]
    fn only_first_128_bins_are_consumed() {
        let mut frame = vec![0_i8; 128];
        frame.extend(vec![127_i8; 896]);
        assert_eq!(estimate(&frame), 0.0);
    }

    #[test]
    fn short_frame_averages_over_its_own_length() {
        // 4 bins of 64 → mean 0.5, same as 128 bins of 64
        assert_eq!(estimate(&[64; 4]), estimate(&[64; 128]));
        // 20·ln(0.5) ≈ -13.9 dB
        assert!((estimate(&[64; 4]) - 0.769).abs() < 1e-3);
    }

    #[test]
    fn sign_of_bin_is_ignored() {
        assert_eq!(estimate(&[-40; 128]), estimate(&[40; 128]));
    }

    #[test]
    fn quiet_frame_clamps_to_zero() {
        // mean = 1/128 → 20·ln(0.0078) ≈ -97 dB, below the -60 floor
        assert_eq!(estimate(&[1; 128]), 0.0);
    }

    #[test]
    fn output_stays_in_unit_range() {
        for v in i8::MIN..=i8::MAX {
            let amp = estimate(&[v; 128]);
            assert!((0.0..=1.0).contains(&amp), "bin {v} → {amp}");
            assert!(!amp.is_nan());
        }
    }

    #[test]
    fn mid_level_maps_through_log_curve() {
        // mean = 0.5 → 20·ln(0.5) ≈ -13.86 → (60 - 13.86) / 60 ≈ 0.769
        let amp = estimate(&[64; 128]);
        let expected = (20.0 * 0.5_f64.ln() + 60.0) / 60.0;
        assert!((amp - expected).abs() < 1e-12, "amp = {amp}");
    }
}
