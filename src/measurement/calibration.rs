//! Startup zero-offset calibration of the current sensor.
//!
//! The hall sensor idles at roughly half its supply, and the exact idle
//! voltage differs between parts. With the power switch open, the first
//! [`CALIBRATION_SAMPLES`] readings are averaged into the zero offset. Once
//! latched, the offset never changes for the rest of the process.

use log::info;

use crate::config::CALIBRATION_SAMPLES;

/// Zero-offset calibration progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationState {
    /// Still averaging startup samples
    Collecting {
        /// Sum of the sensor voltages seen so far
        accumulator: f32,
        /// Samples left before the offset is latched
        remaining: u8,
    },
    /// Offset latched, in volts at the ADC pin
    Complete { zero_offset: f32 },
}

impl CalibrationState {
    pub const fn new() -> Self {
        Self::Collecting {
            accumulator: 0.0,
            remaining: CALIBRATION_SAMPLES,
        }
    }

    /// Feed one sensor voltage.
    ///
    /// Returns `true` if the sample was consumed by calibration, in which case
    /// the caller must report a current of exactly zero for it. Once complete,
    /// every call returns `false` and leaves the offset untouched.
    pub fn accumulate(&mut self, sensor_volts: f32) -> bool {
        let Self::Collecting {
            accumulator,
            remaining,
        } = *self
        else {
            return false;
        };

        let accumulator = accumulator + sensor_volts;
        let remaining = remaining.saturating_sub(1);

        *self = if remaining == 0 {
            let zero_offset = accumulator / f32::from(CALIBRATION_SAMPLES);
            info!("Current sensor calibrated, zero offset {} V", zero_offset);
            Self::Complete { zero_offset }
        } else {
            Self::Collecting {
                accumulator,
                remaining,
            }
        };

        true
    }

    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }

    /// Latched offset, once calibration has finished.
    pub const fn zero_offset(&self) -> Option<f32> {
        match self {
            Self::Complete { zero_offset } => Some(*zero_offset),
            Self::Collecting { .. } => None,
        }
    }
}

impl Default for CalibrationState {
    fn default() -> Self {
        Self::new()
    }
}
