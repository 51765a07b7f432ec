//! Acquisition session bound to one connected DAQ.
//!
//! The session keeps everything a temperature-logging run accumulates:
//!
//! - the calibration history and the key of the active calibration,
//! - the alarm bounds and the log of readings that crossed them,
//! - the time series of `(voltage, temperature)` readings with their
//!   millisecond offsets,
//! - the finite-sampling plan, when one is configured.
//!
//! [`AcquisitionSession::acquire_sample`] is the only entry point that grows
//! the time series. It is all-or-nothing: a failing voltage read or an
//! unfitted calibration leaves the session exactly as it was.
//!
//! # Example
//!
//! ```
//! use temp_daq::calibration::{CalibrationModel, ExpressionKind};
//! use temp_daq::config::AcquisitionLimits;
//! use temp_daq::instrument::SequenceSource;
//! use temp_daq::session::{AcquisitionSession, DaqModel};
//!
//! let mut session = AcquisitionSession::new(DaqModel::Usb6211, AcquisitionLimits::default());
//! let calibration = CalibrationModel::with_coefficients(ExpressionKind::Linear, &[2.0, 1.0])?;
//! session.commit_calibration(calibration)?;
//!
//! let mut source = SequenceSource::new([1.0]);
//! let reading = session.acquire_sample(&mut source)?;
//! assert_eq!(reading.temperature, 3.0);
//! # Ok::<(), temp_daq::error::DaqError>(())
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::calibration::{CalibrationModel, Sample};
use crate::config::AcquisitionLimits;
use crate::error::{AppResult, DaqError};
use crate::instrument::VoltageSource;
use crate::numeric::{finite_rounded, period_ms_from_rate};

/// Timestamp layout used for the start of a run.
pub const START_TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S%.6f";

/// Supported DAQ devices.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DaqModel {
    /// NI USB-6211
    #[serde(rename = "USB-6211")]
    Usb6211,
    /// NI USB-6001
    #[serde(rename = "USB-6001")]
    Usb6001,
    /// NI USB-6002
    #[serde(rename = "USB-6002")]
    Usb6002,
}

impl DaqModel {
    /// Every supported model.
    pub const ALL: [DaqModel; 3] = [DaqModel::Usb6211, DaqModel::Usb6001, DaqModel::Usb6002];

    /// Catalogue name of the device.
    pub fn name(self) -> &'static str {
        match self {
            DaqModel::Usb6211 => "USB-6211",
            DaqModel::Usb6001 => "USB-6001",
            DaqModel::Usb6002 => "USB-6002",
        }
    }
}

impl fmt::Display for DaqModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DaqModel {
    type Err = DaqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DaqModel::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let expected: Vec<&str> = DaqModel::ALL.iter().map(|m| m.name()).collect();
                DaqError::InvalidInput(format!(
                    "No matching DAQ model '{s}'. Expected one of: {}",
                    expected.join(", ")
                ))
            })
    }
}

/// Which bound a reading crossed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmKind {
    /// Temperature fell below the minimum.
    BelowMin,
    /// Temperature rose above the maximum.
    AboveMax,
}

impl AlarmKind {
    /// Label used in exported alarm tables.
    pub fn label(self) -> &'static str {
        match self {
            AlarmKind::BelowMin => "Below Minimum",
            AlarmKind::AboveMax => "Above Maximum",
        }
    }
}

impl fmt::Display for AlarmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One logged threshold crossing.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AlarmEvent {
    /// Bound that was crossed.
    pub kind: AlarmKind,
    /// Temperature of the offending reading, in ºC.
    pub temperature: f64,
    /// Offset of the reading from the start of the run.
    pub time_offset_ms: u64,
}

/// Indicator state of one alarm bound after the latest reading.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmState {
    /// No bound set.
    #[default]
    Unset,
    /// Bound set, latest reading within it.
    Clear,
    /// Bound set, latest reading beyond it.
    Triggered,
}

/// Result of one successful [`AcquisitionSession::acquire_sample`] call.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Measured voltage, rounded.
    pub voltage: f64,
    /// Calibrated temperature in ºC.
    pub temperature: f64,
    /// Milliseconds since the first reading of the run.
    pub time_offset_ms: u64,
    /// Alarm kinds this reading triggered, in min/max order.
    pub alarms: [Option<AlarmKind>; 2],
}

/// Finite-sampling parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SamplingPlan {
    /// Sample rate in hertz (samples per second).
    pub rate_hz: f64,
    /// Number of readings to take.
    pub count: usize,
}

/// State of one connected DAQ: calibrations, alarms and the current run.
#[derive(Debug, Clone)]
pub struct AcquisitionSession {
    model: DaqModel,
    limits: AcquisitionLimits,
    active_key: Option<String>,
    history: Vec<CalibrationModel>,
    alarm_min: Option<f64>,
    alarm_max: Option<f64>,
    alarm_states: [AlarmState; 2],
    sampling: Option<SamplingPlan>,
    interval_ms: f64,
    readings: Vec<Sample>,
    time_offsets: Vec<u64>,
    alarm_events: Vec<AlarmEvent>,
    started_at: Option<DateTime<Local>>,
}

impl AcquisitionSession {
    /// Creates an empty session for `model`.
    pub fn new(model: DaqModel, limits: AcquisitionLimits) -> Self {
        info!(%model, "Acquisition session created");
        Self {
            model,
            limits,
            active_key: None,
            history: Vec::new(),
            alarm_min: None,
            alarm_max: None,
            alarm_states: [AlarmState::Unset; 2],
            sampling: None,
            interval_ms: limits.default_interval_ms as f64,
            readings: Vec::new(),
            time_offsets: Vec::new(),
            alarm_events: Vec::new(),
            started_at: None,
        }
    }

    /// DAQ this session reads from.
    pub fn model(&self) -> DaqModel {
        self.model
    }

    /// Sampling bounds in force.
    pub fn limits(&self) -> &AcquisitionLimits {
        &self.limits
    }

    // =========================================================================
    // Calibrations
    // =========================================================================

    /// Moves a fitted calibration into the history and makes it active.
    ///
    /// Returns the key (textual form) it was stored under.
    pub fn commit_calibration(&mut self, calibration: CalibrationModel) -> AppResult<String> {
        let key = calibration.textual_form().ok_or(DaqError::NotFitted)?;
        self.history.push(calibration);
        self.active_key = Some(key.clone());
        info!(calibration = %key, history = self.history.len(), "Calibration committed");
        Ok(key)
    }

    /// Makes a calibration from the history active again.
    pub fn select_calibration(&mut self, key: &str) -> AppResult<()> {
        if !self.history.iter().any(|c| c.textual_form().as_deref() == Some(key)) {
            return Err(DaqError::UnknownCalibration(key.to_string()));
        }
        self.active_key = Some(key.to_string());
        info!(calibration = key, "Calibration selected");
        Ok(())
    }

    /// Key of the active calibration, if any.
    pub fn active_calibration_key(&self) -> Option<&str> {
        self.active_key.as_deref()
    }

    /// The earliest history entry rendering to the active key.
    pub fn active_calibration(&self) -> Option<&CalibrationModel> {
        let key = self.active_key.as_deref()?;
        self.history
            .iter()
            .find(|c| c.textual_form().as_deref() == Some(key))
    }

    /// True once a calibration is active.
    pub fn is_calibration_set(&self) -> bool {
        self.active_key.is_some()
    }

    /// Every committed calibration, oldest first.
    pub fn history(&self) -> &[CalibrationModel] {
        &self.history
    }

    /// Keys of the history entries, oldest first.
    pub fn history_keys(&self) -> Vec<String> {
        self.history.iter().filter_map(|c| c.textual_form()).collect()
    }

    // =========================================================================
    // Alarms
    // =========================================================================

    /// Sets one or both alarm bounds, keeping `min < max`.
    ///
    /// A bound left as `None` keeps its current value. On failure both bounds
    /// are left unchanged.
    pub fn set_alarm(&mut self, min: Option<f64>, max: Option<f64>) -> AppResult<()> {
        if min.is_none() && max.is_none() {
            return Err(DaqError::InvalidInput("no alarm bound supplied".into()));
        }
        let min = min.map(|v| finite_rounded("alarm min", v)).transpose()?;
        let max = max.map(|v| finite_rounded("alarm max", v)).transpose()?;

        let new_min = min.or(self.alarm_min);
        let new_max = max.or(self.alarm_max);
        if let (Some(lo), Some(hi)) = (new_min, new_max) {
            if lo >= hi {
                return Err(DaqError::InvalidAlarmRange { min: lo, max: hi });
            }
        }

        self.alarm_min = new_min;
        self.alarm_max = new_max;
        self.refresh_alarm_states();
        info!(min = ?self.alarm_min, max = ?self.alarm_max, "Alarm bounds set");
        Ok(())
    }

    /// Clears both alarm bounds.
    pub fn disable_alarms(&mut self) {
        self.alarm_min = None;
        self.alarm_max = None;
        self.alarm_states = [AlarmState::Unset; 2];
        info!("Alarms disabled");
    }

    /// Lower alarm bound in ºC.
    pub fn alarm_min(&self) -> Option<f64> {
        self.alarm_min
    }

    /// Upper alarm bound in ºC.
    pub fn alarm_max(&self) -> Option<f64> {
        self.alarm_max
    }

    /// Indicator states for the `[min, max]` bounds.
    pub fn alarm_status(&self) -> [AlarmState; 2] {
        self.alarm_states
    }

    /// Every logged crossing of the current run, in order.
    pub fn alarm_events(&self) -> &[AlarmEvent] {
        &self.alarm_events
    }

    fn crossings(&self, temperature: f64) -> [Option<AlarmKind>; 2] {
        [
            self.alarm_min
                .filter(|&min| temperature < min)
                .map(|_| AlarmKind::BelowMin),
            self.alarm_max
                .filter(|&max| temperature > max)
                .map(|_| AlarmKind::AboveMax),
        ]
    }

    fn refresh_alarm_states(&mut self) {
        let crossed = match self.readings.last() {
            Some(last) => self.crossings(last.temperature),
            None => [None, None],
        };
        let bounds = [self.alarm_min, self.alarm_max];
        for ((state, bound), hit) in self.alarm_states.iter_mut().zip(bounds).zip(crossed) {
            *state = match (bound, hit) {
                (None, _) => AlarmState::Unset,
                (Some(_), Some(_)) => AlarmState::Triggered,
                (Some(_), None) => AlarmState::Clear,
            };
        }
    }

    // =========================================================================
    // Sampling configuration
    // =========================================================================

    /// Interval between consecutive readings, in milliseconds.
    pub fn interval_ms(&self) -> f64 {
        self.interval_ms
    }

    /// Sets the on-demand update interval.
    pub fn set_interval_ms(&mut self, interval_ms: f64) -> AppResult<()> {
        let interval = finite_rounded("interval", interval_ms)?;
        let (lo, hi) = (
            self.limits.min_interval_ms as f64,
            self.limits.max_interval_ms as f64,
        );
        if !(lo..=hi).contains(&interval) {
            return Err(DaqError::InvalidSampling(format!(
                "interval must be between {lo} and {hi} ms, got {interval}"
            )));
        }
        self.interval_ms = interval;
        Ok(())
    }

    /// Configures a finite run of `count` readings at `rate_hz`.
    pub fn configure_finite_sampling(&mut self, rate_hz: f64, count: usize) -> AppResult<()> {
        let rate = finite_rounded("sample rate", rate_hz)?;
        let (min_rate, max_rate) = (self.limits.min_rate_hz(), self.limits.max_rate_hz());
        if !(min_rate..=max_rate).contains(&rate) {
            return Err(DaqError::InvalidSampling(format!(
                "sample rate must be between {min_rate:.3} and {max_rate:.3} Sa/s, got {rate}"
            )));
        }
        let (min_count, max_count) = (self.limits.min_samples, self.limits.max_samples);
        if !(min_count..=max_count).contains(&count) {
            return Err(DaqError::InvalidSampling(format!(
                "number of samples must be between {min_count} and {max_count}, got {count}"
            )));
        }

        self.interval_ms = period_ms_from_rate(rate)?;
        self.sampling = Some(SamplingPlan {
            rate_hz: rate,
            count,
        });
        info!(rate_hz = rate, count, interval_ms = self.interval_ms, "Finite sampling configured");
        Ok(())
    }

    /// Finite-sampling plan, if configured.
    pub fn sampling_plan(&self) -> Option<SamplingPlan> {
        self.sampling
    }

    /// Planned sample rate in finite-sampling mode.
    pub fn sample_rate(&self) -> Option<f64> {
        self.sampling.map(|p| p.rate_hz)
    }

    /// Planned number of readings in finite-sampling mode.
    pub fn sample_count(&self) -> Option<usize> {
        self.sampling.map(|p| p.count)
    }

    /// True once a finite run has taken all of its readings.
    pub fn is_sampling_complete(&self) -> bool {
        self.sampling
            .is_some_and(|plan| self.readings.len() >= plan.count)
    }

    // =========================================================================
    // Acquisition
    // =========================================================================

    /// Stamps the start of a run.
    pub fn start_run(&mut self) {
        let now = Local::now();
        self.started_at = Some(now);
        info!(started = %now.format(START_TIMESTAMP_FORMAT), "Acquisition run started");
    }

    /// Local time the current run started.
    pub fn started_at(&self) -> Option<DateTime<Local>> {
        self.started_at
    }

    /// Start of the run formatted as `dd/mm/YYYY HH:MM:SS.ffffff`.
    pub fn session_start_timestamp(&self) -> Option<String> {
        self.started_at
            .map(|t| t.format(START_TIMESTAMP_FORMAT).to_string())
    }

    /// Reads one voltage, converts it with the active calibration and records it.
    ///
    /// # Errors
    ///
    /// - [`DaqError::NotFitted`] if no calibration is active.
    /// - [`DaqError::Hardware`] (or whatever the source reports) if the read fails.
    /// - [`DaqError::InvalidInput`] if the source returns a non-finite voltage.
    ///
    /// Nothing is recorded when an error is returned.
    pub fn acquire_sample<S: VoltageSource + ?Sized>(
        &mut self,
        source: &mut S,
    ) -> AppResult<Reading> {
        let calibration = self.active_calibration().ok_or(DaqError::NotFitted)?;
        let voltage = finite_rounded("voltage", source.read_voltage()?)?;
        let temperature = calibration.calculate_temperature(voltage)?;

        let time_offset_ms = match self.time_offsets.last() {
            None => 0,
            Some(&prev) => (prev as f64 + self.interval_ms) as u64,
        };
        let alarms = self.crossings(temperature);

        self.readings.push(Sample {
            voltage,
            temperature,
        });
        self.time_offsets.push(time_offset_ms);
        for kind in alarms.into_iter().flatten() {
            warn!(%kind, temperature, time_offset_ms, "Temperature alarm");
            self.alarm_events.push(AlarmEvent {
                kind,
                temperature,
                time_offset_ms,
            });
        }
        self.refresh_alarm_states();

        debug!(voltage, temperature, time_offset_ms, "Reading recorded");
        Ok(Reading {
            voltage,
            temperature,
            time_offset_ms,
            alarms,
        })
    }

    /// Recorded `(voltage, temperature)` readings of the current run.
    pub fn readings(&self) -> &[Sample] {
        &self.readings
    }

    /// Millisecond offsets parallel to [`readings`](Self::readings).
    pub fn time_offsets(&self) -> &[u64] {
        &self.time_offsets
    }

    /// Number of readings in the current run.
    pub fn reading_count(&self) -> usize {
        self.readings.len()
    }

    /// True once the current run has at least one reading.
    pub fn has_data(&self) -> bool {
        !self.readings.is_empty()
    }

    /// Clears the run: readings, offsets, alarm log, sampling plan and start time.
    ///
    /// Calibrations and alarm bounds are kept.
    pub fn reset(&mut self) {
        self.readings.clear();
        self.time_offsets.clear();
        self.alarm_events.clear();
        self.sampling = None;
        self.interval_ms = self.limits.default_interval_ms as f64;
        self.started_at = None;
        self.refresh_alarm_states();
        info!("Acquisition run cleared");
    }
}

impl fmt::Display for AcquisitionSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = |b: Option<f64>| b.map_or_else(|| "unset".to_string(), |v| format!("{v:.3}"));
        write!(
            f,
            "model: {}, calibration: {}, alarm: [min, max] = [{}, {}] ºC",
            self.model,
            self.active_key.as_deref().unwrap_or("unset"),
            bound(self.alarm_min),
            bound(self.alarm_max)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::ExpressionKind;
    use crate::instrument::SequenceSource;

    fn session() -> AcquisitionSession {
        AcquisitionSession::new(DaqModel::Usb6211, AcquisitionLimits::default())
    }

    fn linear(m: f64, n: f64) -> CalibrationModel {
        CalibrationModel::with_coefficients(ExpressionKind::Linear, &[m, n]).unwrap()
    }

    #[test]
    fn test_daq_model_parsing() {
        assert_eq!("USB-6001".parse::<DaqModel>().unwrap(), DaqModel::Usb6001);
        assert_eq!("usb-6002".parse::<DaqModel>().unwrap(), DaqModel::Usb6002);
        assert!(matches!(
            "USB-9999".parse::<DaqModel>(),
            Err(DaqError::InvalidInput(_))
        ));
        assert_eq!(DaqModel::Usb6211.to_string(), "USB-6211");
    }

    #[test]
    fn test_commit_requires_coefficients() {
        let mut s = session();
        let err = s
            .commit_calibration(CalibrationModel::non_linear())
            .unwrap_err();
        assert!(matches!(err, DaqError::NotFitted));
        assert!(s.history().is_empty());
        assert!(!s.is_calibration_set());
    }

    #[test]
    fn test_commit_and_select() {
        let mut s = session();
        let first = s.commit_calibration(linear(2.0, 1.0)).unwrap();
        let second = s.commit_calibration(linear(3.0, -1.0)).unwrap();
        assert_eq!(first, "y = 2.000x + 1.000");
        assert_eq!(second, "y = 3.000x - 1.000");
        assert_eq!(s.active_calibration_key(), Some(second.as_str()));

        s.select_calibration(&first).unwrap();
        assert_eq!(
            s.active_calibration().and_then(|c| c.coefficients()),
            Some(vec![2.0, 1.0])
        );

        let err = s.select_calibration("y = 9.000x + 9.000").unwrap_err();
        assert!(matches!(err, DaqError::UnknownCalibration(_)));
        assert_eq!(s.active_calibration_key(), Some(first.as_str()));
        assert_eq!(s.history_keys(), vec![first, second]);
    }

    #[test]
    fn test_alarm_partial_updates() {
        let mut s = session();
        s.set_alarm(Some(5.0), None).unwrap();
        s.set_alarm(None, Some(10.0)).unwrap();
        assert_eq!((s.alarm_min(), s.alarm_max()), (Some(5.0), Some(10.0)));

        assert!(matches!(
            s.set_alarm(None, Some(5.0)),
            Err(DaqError::InvalidAlarmRange { .. })
        ));
        assert!(s.set_alarm(None, None).is_err());
        assert!(s.set_alarm(Some(f64::NAN), None).is_err());
        assert_eq!((s.alarm_min(), s.alarm_max()), (Some(5.0), Some(10.0)));
        assert_eq!(s.alarm_status(), [AlarmState::Clear, AlarmState::Clear]);

        s.disable_alarms();
        assert_eq!((s.alarm_min(), s.alarm_max()), (None, None));
        assert_eq!(s.alarm_status(), [AlarmState::Unset, AlarmState::Unset]);
    }

    #[test]
    fn test_acquire_without_calibration_records_nothing() {
        let mut s = session();
        let mut source = SequenceSource::new([1.0]);
        assert!(matches!(
            s.acquire_sample(&mut source),
            Err(DaqError::NotFitted)
        ));
        assert!(!s.has_data());
        assert!(s.time_offsets().is_empty());
    }

    #[test]
    fn test_acquire_propagates_hardware_error() {
        let mut s = session();
        s.commit_calibration(linear(2.0, 1.0)).unwrap();
        let mut source = SequenceSource::new([1.0]);
        s.acquire_sample(&mut source).unwrap();
        let err = s.acquire_sample(&mut source).unwrap_err();
        assert!(matches!(err, DaqError::Hardware(_)));
        assert_eq!(s.reading_count(), 1);
        assert_eq!(s.time_offsets(), &[0]);
    }

    #[test]
    fn test_acquire_rejects_non_finite_voltage() {
        let mut s = session();
        s.commit_calibration(linear(2.0, 1.0)).unwrap();
        let mut source = SequenceSource::new([f64::NAN]);
        assert!(matches!(
            s.acquire_sample(&mut source),
            Err(DaqError::InvalidInput(_))
        ));
        assert!(!s.has_data());
    }

    #[test]
    fn test_voltage_is_rounded_on_entry() {
        let mut s = session();
        s.commit_calibration(linear(1.0, 0.0)).unwrap();
        let reading = s
            .acquire_sample(&mut SequenceSource::new([1.23456]))
            .unwrap();
        assert_eq!(reading.voltage, 1.235);
        assert_eq!(reading.temperature, 1.235);
    }

    #[test]
    fn test_alarm_states_follow_latest_reading() {
        let mut s = session();
        s.commit_calibration(linear(10.0, 0.0)).unwrap();
        s.set_alarm(Some(15.0), Some(30.0)).unwrap();
        let mut source = SequenceSource::new([1.0, 2.0, 4.0]);

        let r = s.acquire_sample(&mut source).unwrap();
        assert_eq!(r.alarms, [Some(AlarmKind::BelowMin), None]);
        assert_eq!(s.alarm_status(), [AlarmState::Triggered, AlarmState::Clear]);

        s.acquire_sample(&mut source).unwrap();
        assert_eq!(s.alarm_status(), [AlarmState::Clear, AlarmState::Clear]);

        s.acquire_sample(&mut source).unwrap();
        assert_eq!(s.alarm_status(), [AlarmState::Clear, AlarmState::Triggered]);

        let kinds: Vec<AlarmKind> = s.alarm_events().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![AlarmKind::BelowMin, AlarmKind::AboveMax]);
        assert_eq!(s.alarm_events()[1].time_offset_ms, 1000);
    }

    #[test]
    fn test_interval_bounds() {
        let mut s = session();
        assert_eq!(s.interval_ms(), 500.0);
        s.set_interval_ms(60.0).unwrap();
        assert!(matches!(
            s.set_interval_ms(59.0),
            Err(DaqError::InvalidSampling(_))
        ));
        assert!(s.set_interval_ms(5101.0).is_err());
        assert_eq!(s.interval_ms(), 60.0);
    }

    #[test]
    fn test_finite_sampling_configuration() {
        let mut s = session();
        s.configure_finite_sampling(4.0, 10).unwrap();
        assert_eq!(s.sample_rate(), Some(4.0));
        assert_eq!(s.sample_count(), Some(10));
        assert_eq!(s.interval_ms(), 250.0);

        assert!(matches!(
            s.configure_finite_sampling(20.0, 10),
            Err(DaqError::InvalidSampling(_))
        ));
        assert!(s.configure_finite_sampling(0.1, 10).is_err());
        assert!(s.configure_finite_sampling(4.0, 1).is_err());
        assert!(s.configure_finite_sampling(4.0, 10_001).is_err());
        assert_eq!(s.sample_count(), Some(10));
    }

    #[test]
    fn test_sampling_complete() {
        let mut s = session();
        s.commit_calibration(linear(1.0, 0.0)).unwrap();
        assert!(!s.is_sampling_complete());
        s.configure_finite_sampling(10.0, 2).unwrap();
        let mut source = SequenceSource::new([1.0, 2.0]);
        s.acquire_sample(&mut source).unwrap();
        assert!(!s.is_sampling_complete());
        s.acquire_sample(&mut source).unwrap();
        assert!(s.is_sampling_complete());
        assert_eq!(s.time_offsets(), &[0, 100]);
    }

    #[test]
    fn test_offsets_truncate_fractional_intervals() {
        let mut s = session();
        s.commit_calibration(linear(1.0, 0.0)).unwrap();
        s.configure_finite_sampling(3.0, 4).unwrap();
        let mut source = SequenceSource::new([1.0, 1.1, 1.2, 1.3]);
        for _ in 0..4 {
            s.acquire_sample(&mut source).unwrap();
        }
        assert_eq!(s.time_offsets(), &[0, 333, 666, 999]);
    }

    #[test]
    fn test_reset_keeps_calibrations_and_alarms() {
        let mut s = session();
        let key = s.commit_calibration(linear(10.0, 0.0)).unwrap();
        s.set_alarm(Some(15.0), None).unwrap();
        s.configure_finite_sampling(2.0, 5).unwrap();
        s.start_run();
        s.acquire_sample(&mut SequenceSource::new([1.0])).unwrap();
        assert_eq!(s.alarm_events().len(), 1);
        assert!(s.session_start_timestamp().is_some());

        s.reset();
        assert!(!s.has_data());
        assert!(s.time_offsets().is_empty());
        assert!(s.alarm_events().is_empty());
        assert_eq!(s.sampling_plan(), None);
        assert_eq!(s.session_start_timestamp(), None);
        assert_eq!(s.interval_ms(), 500.0);
        assert_eq!(s.alarm_status(), [AlarmState::Clear, AlarmState::Unset]);

        assert_eq!(s.active_calibration_key(), Some(key.as_str()));
        assert_eq!(s.alarm_min(), Some(15.0));
    }

    #[test]
    fn test_display_summary() {
        let mut s = session();
        assert_eq!(
            s.to_string(),
            "model: USB-6211, calibration: unset, alarm: [min, max] = [unset, unset] ºC"
        );
        s.commit_calibration(linear(2.0, 1.0)).unwrap();
        s.set_alarm(Some(20.0), None).unwrap();
        assert_eq!(
            s.to_string(),
            concat!(
                "model: USB-6211, calibration: y = 2.000x + 1.000, ",
                "alarm: [min, max] = [20.000, unset] ºC"
            )
        );
    }
}
