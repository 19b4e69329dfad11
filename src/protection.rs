//! Trip-decision state machine.
//!
//! Two tiers of protection run once per converted sample while the fuse is
//! armed:
//!
//! - **Instantaneous**: `current >= abs_limit` trips on that sample.
//! - **Delayed**: while `soft_limit <= current < abs_limit`, a watchdog counts
//!   down from `trip_delay_samples` and trips when it reaches zero. Any sample
//!   below the soft limit reloads the watchdog, so only uninterrupted overload
//!   trips.
//!
//! Re-arming and disabling are explicit operator commands.

use log::{debug, info};

use crate::settings::ThresholdConfig;

/// Protection state of the fuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionStatus {
    /// Output on, protection evaluating every sample
    Armed,
    /// Output forced off by an overcurrent, waiting for a manual reset
    Tripped,
    /// Output forced off by the operator
    Disabled,
}

impl ProtectionStatus {
    /// Whether the power switch should conduct in this state.
    pub const fn output_enabled(self) -> bool {
        matches!(self, Self::Armed)
    }
}

/// Which tier fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripCause {
    /// Current reached the absolute limit
    Instantaneous,
    /// Current stayed above the soft limit for the whole trip delay
    Sustained,
}

/// The protection state machine.
///
/// Starts `Disabled` so the output stays off until the first explicit arm,
/// which happens once calibration has finished.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Protection {
    status: ProtectionStatus,
    thresholds: ThresholdConfig,
    watchdog: u16,
    trip_notification: bool,
}

impl Protection {
    pub const fn new(thresholds: ThresholdConfig) -> Self {
        Self {
            status: ProtectionStatus::Disabled,
            thresholds,
            watchdog: 0,
            trip_notification: false,
        }
    }

    /// Evaluate one converted current sample.
    ///
    /// Does nothing unless armed. Returns the trip cause if this sample
    /// tripped the fuse.
    pub fn evaluate(&mut self, current: f32) -> Option<TripCause> {
        if self.status != ProtectionStatus::Armed {
            return None;
        }

        if current >= self.thresholds.abs_limit_amps {
            self.trip(TripCause::Instantaneous, current);
            return Some(TripCause::Instantaneous);
        }

        if current >= self.thresholds.soft_limit_amps {
            self.watchdog = self.watchdog.saturating_sub(1);
            if self.watchdog == 0 {
                self.trip(TripCause::Sustained, current);
                return Some(TripCause::Sustained);
            }
        } else {
            self.watchdog = self.thresholds.trip_delay();
        }

        None
    }

    fn trip(&mut self, cause: TripCause, current: f32) {
        info!("Fuse tripped ({:?}) at {} A", cause, current);
        self.status = ProtectionStatus::Tripped;
        self.trip_notification = true;
    }

    /// Re-arm from any state: output on, watchdog reloaded.
    pub fn arm(&mut self) {
        info!("Fuse armed");
        self.status = ProtectionStatus::Armed;
        self.watchdog = self.thresholds.trip_delay();
    }

    /// Disable from any state: output off, armed bookkeeping cleared.
    pub fn disable(&mut self) {
        info!("Fuse disabled");
        self.status = ProtectionStatus::Disabled;
        self.watchdog = self.thresholds.trip_delay();
    }

    /// Install new live thresholds.
    ///
    /// A countdown already in progress keeps its value; the new delay takes
    /// effect on the next reload.
    pub fn apply_thresholds(&mut self, thresholds: ThresholdConfig) {
        debug!("Applying thresholds {:?}", thresholds);
        self.thresholds = thresholds;
    }

    /// Consume the "just tripped" notification. Returns `true` at most once
    /// per trip.
    pub fn take_trip_notification(&mut self) -> bool {
        core::mem::take(&mut self.trip_notification)
    }

    pub const fn status(&self) -> ProtectionStatus {
        self.status
    }

    pub const fn thresholds(&self) -> &ThresholdConfig {
        &self.thresholds
    }

    /// Samples left before a delayed trip.
    pub const fn watchdog(&self) -> u16 {
        self.watchdog
    }
}
