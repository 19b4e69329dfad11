//! Interrupt-side sampling pipeline.
//!
//! A periodic timer requests a conversion on every tick; the ADC completion
//! interrupt hands back the raw pair. The pipeline tracks whether a
//! conversion is in flight so overruns and failed conversions can be counted
//! instead of silently corrupting the sample stream.

use embedded_hal::delay::DelayNs;
use log::{info, trace};
use thiserror_no_std::Error;

use crate::measurement::{Converter, CorrectionTable, RawSample, Reading};

/// Starts one ADC conversion of both channels.
///
/// Implemented by the board support crate on top of its ADC peripheral; the
/// result arrives later through the conversion-complete interrupt.
pub trait ConversionTrigger {
    fn start_conversion(&mut self);
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupError {
    #[error("Current sensor calibration did not finish after {polls} polls")]
    CalibrationTimeout { polls: u32 },
}

/// Converter plus in-flight bookkeeping.
#[derive(Debug, Clone, Copy)]
pub struct SamplePipeline {
    converter: Converter,
    in_flight: bool,
    missed: u32,
}

impl SamplePipeline {
    pub const fn new(correction: CorrectionTable) -> Self {
        Self {
            converter: Converter::new(correction),
            in_flight: false,
            missed: 0,
        }
    }

    /// Periodic timer fired: request the next conversion.
    ///
    /// A conversion still in flight from the previous tick counts as missed.
    pub fn on_timer_tick<T: ConversionTrigger>(&mut self, trigger: &mut T) {
        if self.in_flight {
            self.note_missed();
        }
        self.in_flight = true;
        trigger.start_conversion();
    }

    /// Conversion finished. `None` means the ADC reported a failure.
    ///
    /// Returns the converted reading, or `None` if this cycle produced no
    /// usable sample.
    pub fn on_conversion_complete(&mut self, sample: Option<RawSample>) -> Option<Reading> {
        self.in_flight = false;
        match sample {
            Some(sample) => {
                let was_calibrated = self.converter.is_calibrated();
                let reading = self.converter.convert(sample);
                if !was_calibrated && self.converter.is_calibrated() {
                    info!("Sampling pipeline calibrated");
                }
                Some(reading)
            }
            None => {
                self.note_missed();
                None
            }
        }
    }

    fn note_missed(&mut self) {
        self.missed = self.missed.wrapping_add(1);
        trace!("Acquisition cycle missed ({} total)", self.missed);
    }

    pub const fn is_calibrated(&self) -> bool {
        self.converter.is_calibrated()
    }

    /// Cycles that produced no sample since boot.
    pub const fn missed_cycles(&self) -> u32 {
        self.missed
    }
}

impl Default for SamplePipeline {
    fn default() -> Self {
        Self::new(CorrectionTable::voltage())
    }
}

/// Block until `is_calibrated` reports true, polling every `poll_ms`.
///
/// Gives up after `max_polls` polls so a dead ADC cannot hang startup
/// forever. Returns the number of polls it took.
pub fn wait_for_calibration<D: DelayNs>(
    mut is_calibrated: impl FnMut() -> bool,
    delay: &mut D,
    poll_ms: u32,
    max_polls: u32,
) -> Result<u32, StartupError> {
    for polls in 0..max_polls {
        if is_calibrated() {
            return Ok(polls);
        }
        delay.delay_ms(poll_ms);
    }

    if is_calibrated() {
        return Ok(max_polls);
    }

    Err(StartupError::CalibrationTimeout { polls: max_polls })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CALIBRATION_SAMPLES;
    use core::cell::Cell;

    #[derive(Default)]
    struct CountingTrigger {
        started: u32,
    }

    impl ConversionTrigger for CountingTrigger {
        fn start_conversion(&mut self) {
            self.started += 1;
        }
    }

    struct NoopDelay;

    impl DelayNs for NoopDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    #[test]
    fn test_tick_starts_conversion() {
        let mut pipeline = SamplePipeline::default();
        let mut trigger = CountingTrigger::default();

        pipeline.on_timer_tick(&mut trigger);
        assert_eq!(trigger.started, 1);
        assert!(
            pipeline
                .on_conversion_complete(Some(RawSample::new(2048, 100)))
                .is_some()
        );
        assert_eq!(pipeline.missed_cycles(), 0);
    }

    #[test]
    fn test_overrun_counts_missed() {
        let mut pipeline = SamplePipeline::default();
        let mut trigger = CountingTrigger::default();

        pipeline.on_timer_tick(&mut trigger);
        pipeline.on_timer_tick(&mut trigger);
        assert_eq!(trigger.started, 2);
        assert_eq!(pipeline.missed_cycles(), 1);
    }

    #[test]
    fn test_failed_conversion_counts_missed() {
        let mut pipeline = SamplePipeline::default();
        let mut trigger = CountingTrigger::default();

        pipeline.on_timer_tick(&mut trigger);
        assert_eq!(pipeline.on_conversion_complete(None), None);
        assert_eq!(pipeline.missed_cycles(), 1);
        assert!(!pipeline.is_calibrated(), "failed cycles do not calibrate");
    }

    #[test]
    fn test_calibrates_after_enough_samples() {
        let mut pipeline = SamplePipeline::default();
        for _ in 0..CALIBRATION_SAMPLES {
            assert!(!pipeline.is_calibrated());
            let reading = pipeline
                .on_conversion_complete(Some(RawSample::new(2048, 0)))
                .unwrap();
            assert_eq!(reading.current, 0.0);
        }
        assert!(pipeline.is_calibrated());
    }

    #[test]
    fn test_wait_returns_once_calibrated() {
        let polls = Cell::new(0);
        let result = wait_for_calibration(
            || {
                polls.set(polls.get() + 1);
                polls.get() > 3
            },
            &mut NoopDelay,
            1,
            10,
        );
        assert_eq!(result, Ok(3));
    }

    #[test]
    fn test_wait_times_out() {
        let result = wait_for_calibration(|| false, &mut NoopDelay, 1, 10);
        assert_eq!(result, Err(StartupError::CalibrationTimeout { polls: 10 }));
    }
}
