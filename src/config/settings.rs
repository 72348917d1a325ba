//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and moved onto the
//! capture thread.  Every section is `#[serde(default)]`, so a partial
//! `settings.toml` only overrides the keys it names.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::audio::is_valid_capture_size;

// ---------------------------------------------------------------------------
// CaptureConfig
// ---------------------------------------------------------------------------

/// Live analyzer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Try to open the live analyzer.  `false` goes straight to the
    /// synthetic generator.
    pub prefer_live: bool,
    /// Input device name; `None` means the system default.
    pub input_device: Option<String>,
    /// Samples per analysis window; a power of two in `[128, 1024]`.
    pub capture_size: usize,
    /// Configured capture rate is the device maximum divided by this.
    pub rate_divisor: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            prefer_live: true,
            input_device: None,
            capture_size: 1024,
            rate_divisor: 2,
        }
    }
}

// ---------------------------------------------------------------------------
// FallbackConfig
// ---------------------------------------------------------------------------

/// Synthetic generator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Tick period in milliseconds.
    pub tick_ms: u64,
    /// Divisor applied to wall-clock milliseconds before `sin`; the
    /// oscillation period is `2π · time_scale_ms`.
    pub time_scale_ms: f64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            tick_ms: 50,
            time_scale_ms: 100.0,
        }
    }
}

// ---------------------------------------------------------------------------
// SmoothingConfig
// ---------------------------------------------------------------------------

/// Moving-average settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Number of raw amplitudes averaged.
    pub window: usize,
    /// Zero the window when capture restarts after a stop.  Off by default:
    /// residual state from the previous run carries over.
    pub reset_on_restart: bool,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            window: crate::audio::DEFAULT_WINDOW,
            reset_on_restart: false,
        }
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// Viewer window settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Show the amplitude / state readout under the mouth.
    pub show_debug: bool,
    /// Keep the viewer above other windows.
    pub always_on_top: bool,
    /// Extra mouth scale per unit of raw amplitude.
    pub scale_gain: f32,
    /// Initial inner size `(width, height)` in points.
    pub window_size: (f32, f32),
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            show_debug: true,
            always_on_top: false,
            scale_gain: 0.2,
            window_size: (320.0, 320.0),
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingConfig
// ---------------------------------------------------------------------------

/// Logging settings.  `RUST_LOG` takes precedence over `level`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `env_logger` filter.
    pub level: String,
    /// Log every processed update at `debug`.
    pub log_updates: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            log_updates: false,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use viseme_sync::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub capture: CaptureConfig,
    pub fallback: FallbackConfig,
    pub smoothing: SmoothingConfig,
    pub ui: UiConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.smoothing.window == 0 {
            bail!("smoothing.window must be at least 1");
        }
        if !is_valid_capture_size(self.capture.capture_size) {
            bail!(
                "capture.capture_size must be a power of two between 128 and 1024 (got {})",
                self.capture.capture_size
            );
        }
        if self.capture.rate_divisor == 0 {
            bail!("capture.rate_divisor must be at least 1");
        }
        if self.fallback.tick_ms == 0 {
            bail!("fallback.tick_ms must be at least 1");
        }
        if !(self.fallback.time_scale_ms.is_finite() && self.fallback.time_scale_ms > 0.0) {
            bail!(
                "fallback.time_scale_ms must be a positive number (got {})",
                self.fallback.time_scale_ms
            );
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");
        assert_eq!(original, loaded);
    }

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert!(cfg.capture.prefer_live);
        assert!(cfg.capture.input_device.is_none());
        assert_eq!(cfg.capture.capture_size, 1024);
        assert_eq!(cfg.capture.rate_divisor, 2);
        assert_eq!(cfg.fallback.tick_ms, 50);
        assert_eq!(cfg.fallback.time_scale_ms, 100.0);
        assert_eq!(cfg.smoothing.window, 5);
        assert!(!cfg.smoothing.reset_on_restart);
        assert!(cfg.ui.show_debug);
        assert_eq!(cfg.ui.scale_gain, 0.2);
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.capture.prefer_live = false;
        cfg.capture.input_device = Some("Loopback".into());
        cfg.capture.capture_size = 256;
        cfg.fallback.tick_ms = 40;
        cfg.smoothing.window = 8;
        cfg.smoothing.reset_on_restart = true;
        cfg.ui.window_size = (400.0, 300.0);
        cfg.logging.log_updates = true;

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[smoothing]\nwindow = 3\n").expect("write");

        let loaded = AppConfig::load_from(&path).expect("load");
        assert_eq!(loaded.smoothing.window, 3);
        assert!(!loaded.smoothing.reset_on_restart);
        assert_eq!(loaded.capture, CaptureConfig::default());
        assert_eq!(loaded.fallback, FallbackConfig::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "smoothing = [").expect("write");
        assert!(AppConfig::load_from(&path).is_err());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = AppConfig::default();
        cfg.smoothing.window = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.capture.capture_size = 1000;
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("1000"), "{err}");

        let mut cfg = AppConfig::default();
        cfg.capture.rate_divisor = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.fallback.tick_ms = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = AppConfig::default();
        cfg.fallback.time_scale_ms = -1.0;
        assert!(cfg.validate().is_err());
    }
}
