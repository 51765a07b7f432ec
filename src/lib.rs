//! Core library for the temp_daq application.
//!
//! This library contains the calibration model that maps sensor voltage to
//! temperature, the acquisition session that logs calibrated temperatures
//! from a DAQ with threshold alarms, and the glue around them (settings,
//! voltage sources, the polling loop and session export). It is used by the
//! `temp_daq` command-line binary.

pub mod acquisition;
pub mod calibration;
pub mod config;
pub mod data;
pub mod error;
pub mod instrument;
pub mod numeric;
pub mod session;

pub use calibration::{
    CalibrationModel, CalibrationState, Expression, ExpressionKind, FitMethod, Sample,
};
pub use error::{AppResult, DaqError};
pub use session::{AcquisitionSession, AlarmEvent, AlarmKind, AlarmState, DaqModel, Reading};
