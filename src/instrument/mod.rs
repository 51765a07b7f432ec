//! Voltage sources consumed by the acquisition session.
//!
//! The session only needs one capability from the DAQ driver layer: read a
//! single voltage, synchronously. Hardware drivers implement [`VoltageSource`]
//! and report their failures as [`DaqError::Hardware`](crate::error::DaqError::Hardware),
//! which the session propagates untouched.

pub mod mock;

pub use mock::{SequenceSource, SimulatedSource};

use crate::error::AppResult;

/// Capability for instruments that can read one analog voltage on demand.
pub trait VoltageSource {
    /// Reads the current voltage in volts.
    fn read_voltage(&mut self) -> AppResult<f64>;
}

impl<T: VoltageSource + ?Sized> VoltageSource for &mut T {
    fn read_voltage(&mut self) -> AppResult<f64> {
        (**self).read_voltage()
    }
}

impl<T: VoltageSource + ?Sized> VoltageSource for Box<T> {
    fn read_voltage(&mut self) -> AppResult<f64> {
        (**self).read_voltage()
    }
}
