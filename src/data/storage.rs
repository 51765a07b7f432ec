//! Session export writers with clean feature flag handling.
//!
//! A session is exported as one delimited text table made of sections:
//!
//! ```text
//! 18/10/2026 09:15:02.123456
//!
//! CALIBRATION
//! y = 2.000x + 1.000
//!
//! PARAMETERS
//! Number of samples,Sample rate [Sa/s]
//! 5,2.0
//!
//! ALARM LOGS
//! Min alarm,Max alarm
//! 20.0,
//! Alarm Type,Temperature,Time Interval
//! Below Minimum,18.0,0
//!
//! DATA
//! Voltage [V],Temperature [ºC]
//! 1.0,18.0
//! ```
//!
//! Unset values are written as empty cells.
use std::path::{Path, PathBuf};

use crate::error::AppResult;
use crate::session::AcquisitionSession;

/// Column names of the alarm event table.
pub const ALARM_LOG_FIELDNAMES: [&str; 3] = ["Alarm Type", "Temperature", "Time Interval"];

/// Column names of the data table.
pub const DATA_FIELDNAMES: [&str; 2] = ["Voltage [V]", "Temperature [ºC]"];

/// File name for an export started now, inside `dir`.
pub fn default_export_path(dir: &Path) -> PathBuf {
    dir.join(format!(
        "session_{}.csv",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    ))
}

/// Appends `.csv` unless the path already ends with it (any case).
fn with_csv_extension(path: &Path) -> PathBuf {
    let has_ext = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if has_ext {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_owned();
        name.push(".csv");
        PathBuf::from(name)
    }
}

// ============================================================================
// CSV Writer
// ============================================================================

#[cfg(feature = "storage_csv")]
mod csv_enabled {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tracing::info;

    fn cell(value: Option<f64>) -> String {
        value.map_or_else(String::new, |v| format!("{v:?}"))
    }

    /// Ends the current line with nothing on it.
    ///
    /// `csv` quotes an empty record as `""`; section separators are bare line ends.
    fn blank_line<W: Write>(writer: &mut csv::Writer<W>) -> AppResult<()> {
        writer.flush()?;
        writer.get_mut().write_all(b"\n")?;
        Ok(())
    }

    /// Writes a one-cell row, or a bare line end when `text` is empty.
    fn single_cell<W: Write>(writer: &mut csv::Writer<W>, text: &str) -> AppResult<()> {
        if text.is_empty() {
            blank_line(writer)
        } else {
            writer.write_record([text])?;
            Ok(())
        }
    }

    /// Writes the session export table to `out`.
    pub fn write_session<W: Write>(session: &AcquisitionSession, out: W) -> AppResult<()> {
        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(out);

        single_cell(
            &mut writer,
            &session.session_start_timestamp().unwrap_or_default(),
        )?;
        blank_line(&mut writer)?;

        writer.write_record(["CALIBRATION"])?;
        single_cell(
            &mut writer,
            session.active_calibration_key().unwrap_or_default(),
        )?;
        blank_line(&mut writer)?;

        writer.write_record(["PARAMETERS"])?;
        writer.write_record(["Number of samples", "Sample rate [Sa/s]"])?;
        writer.write_record([
            session
                .sample_count()
                .map_or_else(String::new, |n| n.to_string()),
            cell(session.sample_rate()),
        ])?;
        blank_line(&mut writer)?;

        writer.write_record(["ALARM LOGS"])?;
        writer.write_record(["Min alarm", "Max alarm"])?;
        writer.write_record([cell(session.alarm_min()), cell(session.alarm_max())])?;
        writer.write_record(ALARM_LOG_FIELDNAMES)?;
        for event in session.alarm_events() {
            writer.write_record([
                event.kind.label().to_string(),
                format!("{:?}", event.temperature),
                event.time_offset_ms.to_string(),
            ])?;
        }
        blank_line(&mut writer)?;

        writer.write_record(["DATA"])?;
        writer.write_record(DATA_FIELDNAMES)?;
        for reading in session.readings() {
            writer.write_record([
                format!("{:?}", reading.voltage),
                format!("{:?}", reading.temperature),
            ])?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Saves the session export to `path`, adding `.csv` when missing.
    ///
    /// Returns the path actually written.
    pub fn save_session(session: &AcquisitionSession, path: &Path) -> AppResult<PathBuf> {
        let path = with_csv_extension(path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(&path)?;
        write_session(session, file)?;
        info!(path = %path.display(), readings = session.reading_count(), "Session exported");
        Ok(path)
    }
}

#[cfg(not(feature = "storage_csv"))]
mod csv_disabled {
    use super::*;
    use crate::error::DaqError;
    use std::io::Write;

    /// Reports that CSV export was compiled out.
    pub fn write_session<W: Write>(_session: &AcquisitionSession, _out: W) -> AppResult<()> {
        Err(DaqError::FeatureNotEnabled("storage_csv".to_string()))
    }

    /// Reports that CSV export was compiled out.
    pub fn save_session(_session: &AcquisitionSession, _path: &Path) -> AppResult<PathBuf> {
        Err(DaqError::FeatureNotEnabled("storage_csv".to_string()))
    }
}

#[cfg(feature = "storage_csv")]
pub use csv_enabled::{save_session, write_session};

#[cfg(not(feature = "storage_csv"))]
pub use csv_disabled::{save_session, write_session};
