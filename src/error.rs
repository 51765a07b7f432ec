//! Custom error types for the application.
//!
//! This module defines the primary error type, `DaqError`, for the entire crate.
//! Using the `thiserror` crate, it provides a centralized and consistent way to
//! report everything that can go wrong while building a calibration or while
//! logging temperatures from the DAQ.
//!
//! ## Error Hierarchy
//!
//! `DaqError` consolidates two families of errors:
//!
//! - **Domain errors** raised by the calibration model and the acquisition
//!   session: `InvalidInput`, `DuplicateSample`, `InsufficientData`,
//!   `NotFitted`, `InvalidConversion`, `InvalidAlarmRange`,
//!   `UnknownCalibration` and `InvalidSampling`. None of them is ever clamped
//!   or coerced away; the caller decides whether to re-prompt the user.
//! - **Ambient errors**: `Hardware` (opaque failures from a voltage source),
//!   `Config`/`Configuration` (loading and validating settings), `Io`, `Csv`
//!   and `Processing` (numerical breakdown during a fit).
//!
//! By using `#[from]`, `DaqError` can be created from the underlying error
//! types, so the `?` operator works across module boundaries.

use thiserror::Error;

use crate::calibration::ExpressionKind;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, DaqError>;

/// Every failure the crate can report.
#[derive(Error, Debug)]
pub enum DaqError {
    /// A value that had to be a finite number was not.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The voltage is already present in the calibration samples.
    #[error("Duplicate sample: voltage {voltage:.3} V is already stored")]
    DuplicateSample {
        /// Offending voltage, already rounded.
        voltage: f64,
    },

    /// A fit was requested with fewer samples than the expression needs.
    #[error("Insufficient data: at least {required} samples are required, got {available}")]
    InsufficientData {
        /// Minimum sample count for the expression kind.
        required: usize,
        /// Samples currently stored.
        available: usize,
    },

    /// The calibration has no (or incomplete) coefficients.
    #[error("Calibration is not fitted: coefficients are unset")]
    NotFitted,

    /// A model was asked to convert to its own kind.
    #[error("Invalid conversion: calibration is already {0}")]
    InvalidConversion(ExpressionKind),

    /// Alarm bounds would violate `min < max`.
    #[error("Invalid alarm range: min {min:.3} ºC must be below max {max:.3} ºC")]
    InvalidAlarmRange {
        /// Resulting minimum bound.
        min: f64,
        /// Resulting maximum bound.
        max: f64,
    },

    /// No calibration in the history renders to the requested key.
    #[error("Unknown calibration: '{0}'")]
    UnknownCalibration(String),

    /// Rejected sampling rate, sample count or interval.
    #[error("Invalid sampling parameters: {0}")]
    InvalidSampling(String),

    /// Failure reported by the voltage source.
    #[error("Hardware error: {0}")]
    Hardware(String),

    /// Settings could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Settings loaded but are semantically wrong.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writer failure.
    #[cfg(feature = "storage_csv")]
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Numerical failure while fitting.
    #[error("Data processing error: {0}")]
    Processing(String),

    /// Functionality compiled out via feature flags.
    #[error("Feature '{0}' is not enabled. Please build with --features {0}")]
    FeatureNotEnabled(String),
}

impl From<figment::Error> for DaqError {
    fn from(err: figment::Error) -> Self {
        DaqError::Config(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DaqError::Hardware("ai0 read timed out".to_string());
        assert_eq!(err.to_string(), "Hardware error: ai0 read timed out");

        let err = DaqError::InsufficientData {
            required: 3,
            available: 2,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient data: at least 3 samples are required, got 2"
        );
    }

    #[test]
    fn test_alarm_range_error() {
        let err = DaqError::InvalidAlarmRange {
            min: 12.0,
            max: 10.0,
        };
        assert!(err.to_string().contains("min 12.000"));
        assert!(err.to_string().contains("max 10.000"));
    }

    #[test]
    fn test_conversion_error_names_kind() {
        let err = DaqError::InvalidConversion(ExpressionKind::NonLinear);
        assert_eq!(
            err.to_string(),
            "Invalid conversion: calibration is already non-linear"
        );
    }
}
