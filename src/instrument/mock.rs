//! Mock voltage sources for tests and for running without a DAQ attached.
use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::config::MockSourceConfig;
use crate::error::{AppResult, DaqError};
use crate::instrument::VoltageSource;

/// Replays a fixed list of voltages, then fails like a disconnected device.
#[derive(Debug, Clone, Default)]
pub struct SequenceSource {
    remaining: VecDeque<f64>,
    reads: usize,
}

impl SequenceSource {
    /// Creates a source that returns `voltages` in order.
    pub fn new<I: IntoIterator<Item = f64>>(voltages: I) -> Self {
        Self {
            remaining: voltages.into_iter().collect(),
            reads: 0,
        }
    }

    /// Voltages not yet read.
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    /// Successful reads so far.
    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl VoltageSource for SequenceSource {
    fn read_voltage(&mut self) -> AppResult<f64> {
        let voltage = self.remaining.pop_front().ok_or_else(|| {
            DaqError::Hardware(format!(
                "sequence source exhausted after {} reads",
                self.reads
            ))
        })?;
        self.reads += 1;
        Ok(voltage)
    }
}

/// Simulated sensor bridge: a drifting voltage with uniform noise.
pub struct SimulatedSource {
    config: MockSourceConfig,
    rng: StdRng,
    reads: u64,
}

impl SimulatedSource {
    /// Creates a source from the `[mock]` settings.
    pub fn new(config: MockSourceConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        info!(
            base_voltage = config.base_voltage,
            seeded = config.seed.is_some(),
            "Simulated voltage source ready"
        );
        Self {
            config,
            rng,
            reads: 0,
        }
    }
}

impl VoltageSource for SimulatedSource {
    fn read_voltage(&mut self) -> AppResult<f64> {
        let amplitude = self.config.noise_amplitude;
        let noise = if amplitude > 0.0 {
            self.rng.gen_range(-amplitude..=amplitude)
        } else {
            0.0
        };
        let voltage =
            self.config.base_voltage + self.config.drift_per_read * self.reads as f64 + noise;
        self.reads += 1;
        debug!(voltage, reads = self.reads, "Simulated read");
        Ok(voltage)
    }
}
