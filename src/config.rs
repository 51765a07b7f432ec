//! Configuration system using Figment
//!
//! Settings are layered, lowest to highest precedence:
//! 1. Built-in defaults ([`Settings::default`])
//! 2. A TOML file (`temp_daq.toml` unless another path is given)
//! 3. Environment variables prefixed with `TEMPDAQ_`, nested with `__`
//!
//! ```text
//! TEMPDAQ_APPLICATION__LOG_LEVEL=debug
//! TEMPDAQ_ACQUISITION__MAX_SAMPLES=500
//! TEMPDAQ_STORAGE__OUTPUT_DIR=/data/runs
//! ```
//!
//! A missing TOML file is not an error; the defaults apply.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppResult, DaqError};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "temp_daq.toml";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "TEMPDAQ_";

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Sampling bounds enforced by the acquisition session
    #[serde(default)]
    pub acquisition: AcquisitionLimits,
    /// Export settings
    #[serde(default)]
    pub storage: StorageConfig,
    /// Simulated voltage source used when no DAQ is attached
    #[serde(default)]
    pub mock: MockSourceConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Application name
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: "Temperature DAQ".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Bounds on the sampling interval and on finite-sampling runs.
///
/// The interval bounds also bound the sample rate: a finite run must sample
/// between `1000 / max_interval_ms` and `1000 / min_interval_ms` hertz.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionLimits {
    /// Fastest update the polling loop can sustain
    #[serde(default = "default_min_interval")]
    pub min_interval_ms: u64,
    /// Slowest accepted update
    #[serde(default = "default_max_interval")]
    pub max_interval_ms: u64,
    /// Interval used for on-demand reads until the user picks another
    #[serde(default = "default_interval")]
    pub default_interval_ms: u64,
    /// Smallest accepted finite-sampling count
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,
    /// Largest accepted finite-sampling count
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,
}

impl Default for AcquisitionLimits {
    fn default() -> Self {
        Self {
            min_interval_ms: default_min_interval(),
            max_interval_ms: default_max_interval(),
            default_interval_ms: default_interval(),
            min_samples: default_min_samples(),
            max_samples: default_max_samples(),
        }
    }
}

impl AcquisitionLimits {
    /// Lowest accepted sample rate in hertz.
    pub fn min_rate_hz(&self) -> f64 {
        1000.0 / self.max_interval_ms as f64
    }

    /// Highest accepted sample rate in hertz.
    pub fn max_rate_hz(&self) -> f64 {
        1000.0 / self.min_interval_ms as f64
    }
}

/// Export configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory session exports are written to
    pub output_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: dirs::desktop_dir().unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}

/// Parameters of the simulated voltage source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockSourceConfig {
    /// First voltage produced, in volts
    pub base_voltage: f64,
    /// Linear drift added on every read
    pub drift_per_read: f64,
    /// Peak amplitude of uniform noise
    pub noise_amplitude: f64,
    /// Fixed RNG seed for reproducible runs
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for MockSourceConfig {
    fn default() -> Self {
        Self {
            base_voltage: 1.0,
            drift_per_read: 0.002,
            noise_amplitude: 0.005,
            seed: None,
        }
    }
}

// ============================================================================
// Default value functions
// ============================================================================

fn default_min_interval() -> u64 {
    60
}

fn default_max_interval() -> u64 {
    5100
}

fn default_interval() -> u64 {
    500
}

fn default_min_samples() -> usize {
    2
}

fn default_max_samples() -> usize {
    10_000
}

// ============================================================================
// Loading and Validation
// ============================================================================

impl Settings {
    /// Loads settings from `temp_daq.toml` (if present) and the environment.
    pub fn load() -> AppResult<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Loads settings from a specific TOML file and the environment.
    ///
    /// # Errors
    ///
    /// Fails if the file is malformed, a value has the wrong type, or
    /// [`validate`](Self::validate) rejects the result.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let settings: Self = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Checks values that parse but make no sense.
    pub fn validate(&self) -> AppResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.as_str()) {
            return Err(DaqError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        let acq = &self.acquisition;
        if acq.min_interval_ms == 0 || acq.min_interval_ms > acq.max_interval_ms {
            return Err(DaqError::Configuration(format!(
                "Invalid interval bounds [{}, {}] ms",
                acq.min_interval_ms, acq.max_interval_ms
            )));
        }
        if !(acq.min_interval_ms..=acq.max_interval_ms).contains(&acq.default_interval_ms) {
            return Err(DaqError::Configuration(format!(
                "default_interval_ms {} is outside [{}, {}]",
                acq.default_interval_ms, acq.min_interval_ms, acq.max_interval_ms
            )));
        }
        if acq.min_samples == 0 || acq.min_samples > acq.max_samples {
            return Err(DaqError::Configuration(format!(
                "Invalid sample count bounds [{}, {}]",
                acq.min_samples, acq.max_samples
            )));
        }

        let mock = &self.mock;
        if !mock.base_voltage.is_finite()
            || !mock.drift_per_read.is_finite()
            || !mock.noise_amplitude.is_finite()
            || mock.noise_amplitude < 0.0
        {
            return Err(DaqError::Configuration(
                "mock source parameters must be finite and noise_amplitude non-negative".into(),
            ));
        }

        Ok(())
    }

    /// Renders the settings as TOML.
    pub fn to_toml(&self) -> AppResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| DaqError::Configuration(format!("Failed to render settings: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = Settings::default();
        settings.validate().unwrap();
        assert_eq!(settings.acquisition.min_interval_ms, 60);
        assert_eq!(settings.acquisition.max_interval_ms, 5100);
        assert_eq!(settings.acquisition.max_samples, 10_000);
    }

    #[test]
    fn test_rate_bounds() {
        let limits = AcquisitionLimits::default();
        assert!((limits.max_rate_hz() - 16.666_666).abs() < 1e-3);
        assert!((limits.min_rate_hz() - 0.196_078).abs() < 1e-3);
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[application]
name = "Bench"
log_level = "debug"

[acquisition]
max_samples = 50
"#
        )
        .unwrap();

        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.application.name, "Bench");
        assert_eq!(settings.application.log_level, "debug");
        assert_eq!(settings.acquisition.max_samples, 50);
        // Untouched keys keep their defaults.
        assert_eq!(settings.acquisition.min_samples, 2);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings.acquisition, AcquisitionLimits::default());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut settings = Settings::default();
        settings.application.log_level = "verbose".into();
        assert!(matches!(
            settings.validate(),
            Err(DaqError::Configuration(_))
        ));

        let mut settings = Settings::default();
        settings.acquisition.min_interval_ms = 6000;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.acquisition.min_samples = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.mock.noise_amplitude = -1.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[acquisition]\nmax_samples = \"many\"").unwrap();
        assert!(matches!(
            Settings::load_from(file.path()),
            Err(DaqError::Config(_))
        ));
    }

    #[test]
    fn test_to_toml_round_trip() {
        let settings = Settings::default();
        let text = settings.to_toml().unwrap();
        let back: Settings = toml::from_str(&text).unwrap();
        assert_eq!(back, settings);
    }
}
