//! Cooperative polling loop that drives an [`AcquisitionSession`].
//!
//! Each tick of a `tokio::time::interval` calls
//! [`AcquisitionSession::acquire_sample`] exactly once, so the session is never
//! touched concurrently. New readings are optionally published on a
//! `broadcast` channel for whoever displays them.
//!
//! # Data Flow
//!
//! ```text
//! VoltageSource --read--> AcquisitionSession --Reading--> broadcast::channel ---> UI/CLI
//!                                ^
//!                  interval tick |  watch<bool> stop flag
//! ```
//!
//! A run ends when the finite-sampling plan is complete, when `max_reads`
//! readings were taken, when the stop flag turns `true`, or on the first
//! error. Readings recorded before an error stay in the session.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::error::{AppResult, DaqError};
use crate::instrument::VoltageSource;
use crate::session::{AcquisitionSession, Reading};

/// Capacity of the reading channel returned by [`reading_channel`].
pub const READING_CHANNEL_CAPACITY: usize = 1024;

/// Creates the channel a run publishes readings on.
pub fn reading_channel() -> (broadcast::Sender<Reading>, broadcast::Receiver<Reading>) {
    broadcast::channel(READING_CHANNEL_CAPACITY)
}

/// Optional controls for [`run_acquisition`].
#[derive(Debug, Default)]
pub struct RunOptions {
    /// Stop after this many readings (on-demand mode).
    pub max_reads: Option<usize>,
    /// Where each new reading is sent.
    pub publisher: Option<broadcast::Sender<Reading>>,
    /// Stop flag; the run ends once it reads `true`.
    pub stop: Option<watch::Receiver<bool>>,
}

/// Why a run ended without error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum RunOutcome {
    /// Planned sample count or `max_reads` reached.
    Completed,
    /// Stop flag raised.
    Stopped,
}

/// Summary of a finished run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Why the run ended.
    pub outcome: RunOutcome,
    /// Readings taken during this run.
    pub readings: usize,
}

/// Samples `source` into `session` at the session's interval until the run ends.
pub async fn run_acquisition<S: VoltageSource + ?Sized>(
    session: &mut AcquisitionSession,
    source: &mut S,
    mut options: RunOptions,
) -> AppResult<RunSummary> {
    let period_ms = session.interval_ms();
    if period_ms.is_nan() || period_ms <= 0.0 {
        return Err(DaqError::InvalidSampling(format!(
            "interval must be positive, got {period_ms} ms"
        )));
    }

    let mut ticker = interval(Duration::from_secs_f64(period_ms / 1000.0));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    session.start_run();
    let mut taken = 0usize;
    let outcome = loop {
        if session.is_sampling_complete() || options.max_reads.is_some_and(|max| taken >= max) {
            break RunOutcome::Completed;
        }

        tokio::select! {
            biased;
            _ = stop_requested(&mut options.stop) => break RunOutcome::Stopped,
            _ = ticker.tick() => {}
        }

        let reading = match session.acquire_sample(source) {
            Ok(reading) => reading,
            Err(err) => {
                warn!(error = %err, readings = taken, "Acquisition run aborted");
                return Err(err);
            }
        };
        taken += 1;

        if let Some(tx) = &options.publisher {
            // No subscribers is fine; the session keeps the reading.
            let _ = tx.send(reading);
        }
    };

    info!(?outcome, readings = taken, "Acquisition run finished");
    Ok(RunSummary {
        outcome,
        readings: taken,
    })
}

/// Resolves once the stop flag reads `true`; never resolves without a flag.
async fn stop_requested(stop: &mut Option<watch::Receiver<bool>>) {
    let Some(rx) = stop else {
        return std::future::pending().await;
    };
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            // Sender gone: nobody can ask us to stop any more.
            return std::future::pending().await;
        }
    }
}
