//! Command-line front end for temp_daq.
//!
//! ```bash
//! # Fit a calibration to measured pairs
//! temp_daq fit --kind non-linear --samples pairs.csv
//!
//! # Log 20 readings at 4 Sa/s with a low-temperature alarm, then export
//! temp_daq acquire --coefficients 2.0 1.0 --rate 4 --count 20 --min 2.5 --output run.csv
//! ```
//!
//! Without a DAQ attached, readings come from the simulated source configured
//! in the `[mock]` settings section.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use temp_daq::acquisition::{reading_channel, run_acquisition, RunOptions};
use temp_daq::calibration::{CalibrationModel, ExpressionKind, FitMethod};
use temp_daq::config::{Settings, DEFAULT_CONFIG_FILE};
use temp_daq::data::{default_export_path, save_session};
use temp_daq::instrument::SimulatedSource;
use temp_daq::numeric::{is_number, parse_number};
use temp_daq::session::{AcquisitionSession, DaqModel};

#[derive(Parser, Debug)]
#[command(name = "temp_daq", version, about = "Temperature sensor calibration and logging")]
struct Cli {
    /// Settings file (TOML)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fit a calibration to voltage,temperature pairs
    Fit {
        #[arg(long, value_enum, default_value_t = KindArg::Linear)]
        kind: KindArg,
        /// Fitting method for linear calibrations
        #[arg(long, value_enum, default_value_t = MethodArg::LeastSquares)]
        method: MethodArg,
        /// CSV file with one `voltage,temperature` pair per line
        #[arg(long)]
        samples: PathBuf,
        /// Print the fitted model as JSON
        #[arg(long)]
        json: bool,
    },
    /// Log calibrated temperatures from the DAQ
    Acquire {
        /// Coefficients, highest degree first (2 = linear, 3 = non-linear)
        #[arg(long, num_args = 2..=3, allow_hyphen_values = true, required = true)]
        coefficients: Vec<f64>,
        #[arg(long, default_value = "USB-6211")]
        daq: DaqModel,
        /// Finite sampling rate in Sa/s (requires --count)
        #[arg(long, requires = "count")]
        rate: Option<f64>,
        /// Finite sampling count (requires --rate)
        #[arg(long, requires = "rate")]
        count: Option<usize>,
        /// On-demand mode: number of reads to take
        #[arg(long, conflicts_with = "rate")]
        reads: Option<usize>,
        /// On-demand update interval in milliseconds
        #[arg(long, conflicts_with = "rate")]
        interval_ms: Option<f64>,
        /// Minimum temperature alarm [ºC]
        #[arg(long, allow_hyphen_values = true)]
        min: Option<f64>,
        /// Maximum temperature alarm [ºC]
        #[arg(long, allow_hyphen_values = true)]
        max: Option<f64>,
        /// Export the session to this file (".csv" is appended if missing)
        #[arg(long, conflicts_with = "save")]
        output: Option<PathBuf>,
        /// Export to a timestamped file in the configured output directory
        #[arg(long)]
        save: bool,
    },
    /// Print the effective settings as TOML
    Config,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindArg {
    Linear,
    NonLinear,
}

impl From<KindArg> for ExpressionKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Linear => ExpressionKind::Linear,
            KindArg::NonLinear => ExpressionKind::NonLinear,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum MethodArg {
    LeastSquares,
    Interpolation,
}

impl From<MethodArg> for FitMethod {
    fn from(method: MethodArg) -> Self {
        match method {
            MethodArg::LeastSquares => FitMethod::LeastSquares,
            MethodArg::Interpolation => FitMethod::LinearInterpolation,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load_from(&cli.config)
        .with_context(|| format!("Failed to load settings from {}", cli.config.display()))?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.application.log_level)),
        )
        .init();

    match cli.command {
        Command::Fit {
            kind,
            method,
            samples,
            json,
        } => fit(kind.into(), method.into(), &samples, json),
        Command::Acquire {
            coefficients,
            daq,
            rate,
            count,
            reads,
            interval_ms,
            min,
            max,
            output,
            save,
        } => {
            let mut session = AcquisitionSession::new(daq, settings.acquisition);
            let kind = match coefficients.len() {
                2 => ExpressionKind::Linear,
                _ => ExpressionKind::NonLinear,
            };
            let calibration = CalibrationModel::with_coefficients(kind, &coefficients)?;
            session.commit_calibration(calibration)?;
            if min.is_some() || max.is_some() {
                session.set_alarm(min, max)?;
            }
            match (rate, count) {
                (Some(rate), Some(count)) => session.configure_finite_sampling(rate, count)?,
                _ => {
                    if let Some(interval) = interval_ms {
                        session.set_interval_ms(interval)?;
                    }
                }
            }
            let output =
                output.or_else(|| save.then(|| default_export_path(&settings.storage.output_dir)));
            acquire(session, &settings, reads, output.as_deref()).await
        }
        Command::Config => {
            print!("{}", settings.to_toml()?);
            Ok(())
        }
    }
}

fn fit(kind: ExpressionKind, method: FitMethod, path: &Path, json: bool) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read samples from {}", path.display()))?;

    let mut model = match kind {
        ExpressionKind::Linear => CalibrationModel::linear(method),
        ExpressionKind::NonLinear => CalibrationModel::non_linear(),
    };
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != 2 {
            bail!("line {}: expected `voltage,temperature`", line_no + 1);
        }
        if line_no == 0 && !fields.iter().all(|f| is_number(f)) {
            // header row
            continue;
        }
        let voltage = parse_number(fields[0]).with_context(|| format!("line {}", line_no + 1))?;
        let temperature =
            parse_number(fields[1]).with_context(|| format!("line {}", line_no + 1))?;
        model
            .add_raw_sample(voltage, temperature)
            .with_context(|| format!("line {}", line_no + 1))?;
    }

    model.fit().context("Failed to fit calibration")?;
    info!(samples = model.sample_count(), "Calibration fitted");

    if json {
        println!("{}", serde_json::to_string_pretty(&model)?);
    } else {
        println!("{model}");
    }
    Ok(())
}

async fn acquire(
    mut session: AcquisitionSession,
    settings: &Settings,
    reads: Option<usize>,
    output: Option<&Path>,
) -> Result<()> {
    if session.sampling_plan().is_none() && reads.is_none() {
        info!("On-demand mode without --reads; press Ctrl-C to stop");
    }

    let mut source = SimulatedSource::new(settings.mock.clone());
    let (stop_tx, stop_rx) = watch::channel(false);
    let (tx, mut rx) = reading_channel();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = stop_tx.send(true);
        }
    });
    let printer = tokio::spawn(async move {
        while let Ok(reading) = rx.recv().await {
            let flags: Vec<String> = reading
                .alarms
                .iter()
                .flatten()
                .map(|k| k.to_string())
                .collect();
            println!(
                "{:>8} ms  {:>8.3} V  {:>8.3} ºC  {}",
                reading.time_offset_ms,
                reading.voltage,
                reading.temperature,
                flags.join(", ")
            );
        }
    });

    let options = RunOptions {
        max_reads: reads,
        publisher: Some(tx),
        stop: Some(stop_rx),
    };
    let summary = run_acquisition(&mut session, &mut source, options).await;
    // The sender was moved into the run; once it is dropped the printer drains and exits.
    printer.await.context("Reading printer task failed")?;
    let summary = summary.context("Acquisition failed")?;

    println!("{summary:?}");
    println!("{session}");
    if !session.alarm_events().is_empty() {
        println!("{} alarm event(s) logged", session.alarm_events().len());
    }

    if let Some(path) = output {
        let written = save_session(&session, path)?;
        println!("Session saved to {}", written.display());
    }
    Ok(())
}
