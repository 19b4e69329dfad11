//! State shared between the sampling interrupt and the operator loop.
//!
//! Everything the interrupt touches lives in one [`FuseCore`] behind a
//! critical-section mutex, so each interrupt event and each operator command
//! is applied atomically: the operator never observes a half-updated
//! measurement, and a trip decision and its output change happen in the same
//! critical section. Button edges are lock-free and live outside the mutex.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::{debug, error, warn};

use crate::acquisition::{self, ConversionTrigger, SamplePipeline, StartupError};
use crate::config::{CALIBRATION_MAX_POLLS, CALIBRATION_POLL_MS};
use crate::input::Buttons;
use crate::measurement::{CorrectionTable, Measurement, RawSample};
use crate::outputs::FuseOutputs;
use crate::protection::{Protection, ProtectionStatus};
use crate::settings::ThresholdConfig;

/// Consistent copy of the shared state for the operator loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuseSnapshot {
    pub status: ProtectionStatus,
    pub measurement: Measurement,
    pub thresholds: ThresholdConfig,
    /// Samples left before a delayed trip
    pub watchdog: u16,
    pub missed_cycles: u32,
}

struct FuseCore<P: OutputPin> {
    pipeline: SamplePipeline,
    measurement: Measurement,
    protection: Protection,
    outputs: FuseOutputs<P>,
}

impl<P: OutputPin> FuseCore<P> {
    /// Bring the pins in line with the protection status.
    ///
    /// A failed pin write is logged; the protection state stays authoritative
    /// and the next transition writes every pin again.
    fn drive_outputs(&mut self) {
        if let Err(e) = self.outputs.apply(self.protection.status()) {
            warn!("Output pin write failed: {:?}", e);
        }
    }
}

/// The fuse controller's shared state.
pub struct FuseContext<P: OutputPin> {
    core: Mutex<CriticalSectionRawMutex, RefCell<FuseCore<P>>>,
    /// Operator buttons, fed from the input interrupt
    pub buttons: Buttons,
}

impl<P: OutputPin> FuseContext<P> {
    /// Create the context with protection disabled and the output open.
    pub const fn new(outputs: FuseOutputs<P>, correction: CorrectionTable) -> Self {
        Self {
            core: Mutex::new(RefCell::new(FuseCore {
                pipeline: SamplePipeline::new(correction),
                measurement: Measurement::new(),
                protection: Protection::new(ThresholdConfig::DEFAULT),
                outputs,
            })),
            buttons: Buttons::new(),
        }
    }

    fn with_core<R>(&self, f: impl FnOnce(&mut FuseCore<P>) -> R) -> R {
        self.core.lock(|core| f(&mut core.borrow_mut()))
    }

    // -------------------------------------------------------------------------
    // Interrupt context
    // -------------------------------------------------------------------------

    /// Sampling timer interrupt.
    pub fn on_timer_tick<T: ConversionTrigger>(&self, trigger: &mut T) {
        self.with_core(|core| core.pipeline.on_timer_tick(trigger));
    }

    /// ADC conversion-complete interrupt. `None` reports a failed conversion.
    ///
    /// Converts the pair, updates the live measurement and runs protection.
    /// A trip opens the switch before this returns. A failed conversion
    /// leaves the previous measurement in place and skips protection.
    pub fn on_conversion_complete(&self, sample: Option<RawSample>) {
        self.with_core(|core| {
            let Some(reading) = core.pipeline.on_conversion_complete(sample) else {
                return;
            };
            core.measurement.record(reading);
            if core.protection.evaluate(reading.current).is_some() {
                core.drive_outputs();
            }
        });
    }

    // -------------------------------------------------------------------------
    // Main-loop commands
    // -------------------------------------------------------------------------

    /// Startup lamp test: switch open, status LEDs lit.
    pub fn lamp_test(&self) {
        self.with_core(|core| {
            if let Err(e) = core.outputs.lamp_test() {
                warn!("Lamp test failed: {:?}", e);
            }
        });
    }

    /// Light the controller-ready LED.
    pub fn set_ready(&self) {
        self.with_core(|core| {
            if let Err(e) = core.outputs.set_ready() {
                warn!("Ready LED write failed: {:?}", e);
            }
        });
    }

    /// Arm the fuse and clear the peak current.
    pub fn rearm(&self) {
        self.with_core(|core| {
            core.protection.arm();
            core.measurement.reset_peak();
            core.drive_outputs();
        });
    }

    /// Force the output off until the next re-arm.
    pub fn disable(&self) {
        self.with_core(|core| {
            core.protection.disable();
            core.drive_outputs();
        });
    }

    /// Install new live thresholds.
    pub fn apply_thresholds(&self, thresholds: ThresholdConfig) {
        self.with_core(|core| core.protection.apply_thresholds(thresholds));
    }

    /// Consume the trip notification. `true` at most once per trip.
    pub fn take_trip_notification(&self) -> bool {
        self.with_core(|core| core.protection.take_trip_notification())
    }

    pub fn snapshot(&self) -> FuseSnapshot {
        self.with_core(|core| FuseSnapshot {
            status: core.protection.status(),
            measurement: core.measurement,
            thresholds: *core.protection.thresholds(),
            watchdog: core.protection.watchdog(),
            missed_cycles: core.pipeline.missed_cycles(),
        })
    }

    pub fn is_calibrated(&self) -> bool {
        self.with_core(|core| core.pipeline.is_calibrated())
    }

    /// Wait, bounded, for the sampling interrupt to finish calibration.
    pub fn wait_for_calibration<D: DelayNs>(&self, delay: &mut D) -> Result<(), StartupError> {
        let polls = acquisition::wait_for_calibration(
            || self.is_calibrated(),
            delay,
            CALIBRATION_POLL_MS,
            CALIBRATION_MAX_POLLS,
        )
        .inspect_err(|e| error!("{}", e))?;
        debug!("Calibration finished after {} polls", polls);
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::mock::{ZERO_CODE, calibrate, sample};
    use super::*;
    use crate::config::CALIBRATION_SAMPLES;
    use crate::outputs::mock::{MockOutputs, MockPin};

    fn context() -> (MockOutputs, FuseContext<MockPin>) {
        let (probes, outputs) = MockOutputs::pair();
        let ctx = FuseContext::new(outputs, CorrectionTable::identity());
        (probes, ctx)
    }

    /// Delay that delivers one zero-current sample per poll, like the
    /// sampling interrupt would.
    struct SamplingDelay<'a> {
        ctx: &'a FuseContext<MockPin>,
        delivered: u32,
    }

    impl DelayNs for SamplingDelay<'_> {
        fn delay_ns(&mut self, _ns: u32) {
            self.delivered += 1;
            self.ctx
                .on_conversion_complete(Some(RawSample::new(ZERO_CODE, 0)));
        }
    }

    #[test]
    fn test_starts_disabled_with_switch_open() {
        let (probes, ctx) = context();
        assert_eq!(ctx.snapshot().status, ProtectionStatus::Disabled);
        assert!(!probes.switch.is_high());
    }

    #[test]
    fn test_lamp_test_then_ready() {
        let (probes, ctx) = context();
        ctx.lamp_test();
        assert!(probes.on_led.is_high());
        assert!(probes.off_led.is_high());
        assert!(!probes.switch.is_high());

        ctx.set_ready();
        assert!(probes.ready_led.is_high());
    }

    #[test]
    fn test_rearm_closes_switch_and_clears_peak() {
        let (probes, ctx) = context();
        calibrate(&ctx);
        ctx.rearm();
        sample(&ctx, 3.0);
        assert!(ctx.snapshot().measurement.max_current_since_arm > 2.9);

        ctx.rearm();
        assert_eq!(ctx.snapshot().measurement.max_current_since_arm, 0.0);
        assert!(probes.switch.is_high());
        assert!(probes.on_led.is_high());
    }

    #[test]
    fn test_trip_opens_switch_inside_interrupt() {
        let (probes, ctx) = context();
        calibrate(&ctx);
        ctx.rearm();
        assert!(probes.switch.is_high());

        sample(&ctx, 12.0);
        assert!(!probes.switch.is_high());
        assert!(probes.off_led.is_high());

        let snap = ctx.snapshot();
        assert_eq!(snap.status, ProtectionStatus::Tripped);
        assert!(snap.measurement.max_current_since_arm > 11.9);
        assert!(ctx.take_trip_notification());
        assert!(!ctx.take_trip_notification());
    }

    #[test]
    fn test_failed_conversion_keeps_previous_measurement() {
        let (_probes, ctx) = context();
        calibrate(&ctx);
        ctx.rearm();
        sample(&ctx, 4.0);
        let before = ctx.snapshot().measurement;

        ctx.on_conversion_complete(None);
        let after = ctx.snapshot();
        assert_eq!(after.measurement, before);
        assert_eq!(after.missed_cycles, 1);
        assert_eq!(after.status, ProtectionStatus::Armed);
    }

    #[test]
    fn test_failed_conversion_holds_watchdog() {
        let (_probes, ctx) = context();
        calibrate(&ctx);
        ctx.apply_thresholds(ThresholdConfig {
            trip_delay_samples: 3,
            soft_limit_amps: 1.0,
            abs_limit_amps: 20.0,
        });
        ctx.rearm();

        sample(&ctx, 2.0);
        assert_eq!(ctx.snapshot().watchdog, 2);
        // Neither a countdown nor a reload
        ctx.on_conversion_complete(None);
        assert_eq!(ctx.snapshot().watchdog, 2);
        sample(&ctx, 2.0);

        let snap = ctx.snapshot();
        assert_eq!(snap.watchdog, 1);
        assert_eq!(snap.status, ProtectionStatus::Armed);
        assert_eq!(snap.missed_cycles, 1);
    }

    #[test]
    fn test_disable_opens_switch() {
        let (probes, ctx) = context();
        calibrate(&ctx);
        ctx.rearm();
        ctx.disable();
        assert!(!probes.switch.is_high());
        assert!(probes.disabled_led.is_high());

        // Overcurrent while disabled does nothing
        sample(&ctx, 25.0);
        assert_eq!(ctx.snapshot().status, ProtectionStatus::Disabled);
        assert!(!ctx.take_trip_notification());
    }

    #[test]
    fn test_applied_thresholds_govern_protection() {
        let (_probes, ctx) = context();
        calibrate(&ctx);
        ctx.apply_thresholds(ThresholdConfig {
            trip_delay_samples: 2,
            soft_limit_amps: 1.0,
            abs_limit_amps: 20.0,
        });
        ctx.rearm();
        assert_eq!(ctx.snapshot().watchdog, 2);

        sample(&ctx, 2.0);
        assert_eq!(ctx.snapshot().status, ProtectionStatus::Armed);
        sample(&ctx, 2.0);
        assert_eq!(ctx.snapshot().status, ProtectionStatus::Tripped);
    }

    #[test]
    fn test_wait_for_calibration_with_live_samples() {
        let (_probes, ctx) = context();
        let mut delay = SamplingDelay {
            ctx: &ctx,
            delivered: 0,
        };
        assert_eq!(ctx.wait_for_calibration(&mut delay), Ok(()));
        assert_eq!(delay.delivered, u32::from(CALIBRATION_SAMPLES));
    }

    #[test]
    fn test_wait_for_calibration_times_out_without_samples() {
        struct DeadAdc;
        impl DelayNs for DeadAdc {
            fn delay_ns(&mut self, _ns: u32) {}
        }

        let (_probes, ctx) = context();
        assert_eq!(
            ctx.wait_for_calibration(&mut DeadAdc),
            Err(StartupError::CalibrationTimeout {
                polls: CALIBRATION_MAX_POLLS
            })
        );
    }
}
