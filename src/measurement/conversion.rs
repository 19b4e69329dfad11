//! Raw ADC code to engineering unit conversion.

use crate::config::{
    ADC_REF_VOLTS, ADC_RESOLUTION, CURRENT_NOISE_FLOOR, CURRENT_SENSOR_GAIN, DIVIDER_RATIO,
};

use super::{CalibrationState, CorrectionTable, RawSample};

/// Voltage at the ADC pin for a raw code.
#[inline]
pub fn adc_to_volts(code: u16) -> f32 {
    ADC_REF_VOLTS * f32::from(code) / ADC_RESOLUTION
}

/// Corrected line voltage for a raw voltage-channel code.
pub fn line_voltage(code: u16, correction: &CorrectionTable) -> f32 {
    let divided = adc_to_volts(code) * DIVIDER_RATIO;
    correction.correct(divided).max(0.0)
}

/// Line current for a sensor voltage, given the calibrated zero offset.
///
/// The sensor output falls as current rises, so the current is proportional
/// to `zero_offset - sensor_volts`. Anything below the noise floor, including
/// negative readings, is reported as exactly zero.
pub fn line_current(sensor_volts: f32, zero_offset: f32) -> f32 {
    let amps = (zero_offset - sensor_volts) / CURRENT_SENSOR_GAIN;
    if amps < CURRENT_NOISE_FLOOR {
        0.0
    } else {
        amps
    }
}

/// Converted pair for one acquisition cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Reading {
    /// Line current in amps (>= 0)
    pub current: f32,
    /// Line voltage in volts (>= 0)
    pub voltage: f32,
}

/// Stateful converter owning the startup calibration.
#[derive(Debug, Clone, Copy)]
pub struct Converter {
    calibration: CalibrationState,
    correction: CorrectionTable,
}

impl Converter {
    pub const fn new(correction: CorrectionTable) -> Self {
        Self {
            calibration: CalibrationState::new(),
            correction,
        }
    }

    /// Convert one raw sample.
    ///
    /// While calibration is collecting, the current channel feeds the zero
    /// offset and the reported current is exactly zero.
    pub fn convert(&mut self, sample: RawSample) -> Reading {
        let voltage = line_voltage(sample.voltage, &self.correction);
        let sensor_volts = adc_to_volts(sample.current);

        if self.calibration.accumulate(sensor_volts) {
            return Reading {
                current: 0.0,
                voltage,
            };
        }

        let current = self
            .calibration
            .zero_offset()
            .map_or(0.0, |zero| line_current(sensor_volts, zero));

        Reading { current, voltage }
    }

    pub const fn is_calibrated(&self) -> bool {
        self.calibration.is_complete()
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(CorrectionTable::voltage())
    }
}
