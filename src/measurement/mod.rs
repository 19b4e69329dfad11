//! Measurement pipeline: raw samples, calibration, conversion and the live
//! measurement record.

mod calibration;
mod conversion;
mod correction;

pub use calibration::*;
pub use conversion::*;
pub use correction::*;

/// One pair of ADC codes from an acquisition cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawSample {
    /// Current-sensor channel code
    pub current: u16,
    /// Divided line-voltage channel code
    pub voltage: u16,
}

impl RawSample {
    pub const fn new(current: u16, voltage: u16) -> Self {
        Self { current, voltage }
    }
}

/// Latest converted values plus the peak current since the last arm.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Measurement {
    /// Line current in amps
    pub current: f32,
    /// Line voltage in volts
    pub voltage: f32,
    /// Highest current seen since the fuse was last armed
    pub max_current_since_arm: f32,
}

impl Measurement {
    pub const fn new() -> Self {
        Self {
            current: 0.0,
            voltage: 0.0,
            max_current_since_arm: 0.0,
        }
    }

    /// Store a fresh reading and fold it into the peak.
    pub fn record(&mut self, reading: Reading) {
        self.current = reading.current;
        self.voltage = reading.voltage;
        if reading.current > self.max_current_since_arm {
            self.max_current_since_arm = reading.current;
        }
    }

    /// Clear the peak, called on re-arm.
    pub fn reset_peak(&mut self) {
        self.max_current_since_arm = 0.0;
    }

    /// Instantaneous power truncated to whole watts.
    pub fn power_watts(&self) -> u32 {
        (self.voltage * self.current) as u32
    }
}
