//! Tunable trip thresholds and the edit rules the operator works under.
//!
//! Three parameters are exposed to the encoder: the trip delay, the soft
//! (delayed) limit and the absolute (instantaneous) limit. Every mutation path
//! keeps `soft_limit_amps <= abs_limit_amps`.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::config::SAVE_DEBOUNCE_TICKS;

// =============================================================================
// Ranges and defaults
// =============================================================================

/// Largest accepted trip delay, in samples.
pub const TRIP_DELAY_MAX: u16 = 1000;

/// Lowest soft limit the encoder can reach, in amps.
pub const SOFT_LIMIT_MIN: f32 = 0.5;

/// Lowest absolute limit, in amps.
pub const ABS_LIMIT_MIN: f32 = 1.0;

/// Highest absolute limit, in amps (sensor full scale).
pub const ABS_LIMIT_MAX: f32 = 30.0;

/// Soft limit change per encoder detent, in amps.
pub const SOFT_LIMIT_STEP: f32 = 0.1;

/// Absolute limit change per encoder detent, in amps.
pub const ABS_LIMIT_STEP: f32 = 1.0;

pub const DEFAULT_TRIP_DELAY: u16 = 25;
pub const DEFAULT_SOFT_LIMIT: f32 = 5.0;
pub const DEFAULT_ABS_LIMIT: f32 = 10.0;

const _: () = assert!(SOFT_LIMIT_MIN < ABS_LIMIT_MIN);
const _: () = assert!(ABS_LIMIT_MIN < ABS_LIMIT_MAX);
const _: () = assert!(DEFAULT_SOFT_LIMIT <= DEFAULT_ABS_LIMIT);
const _: () = assert!(DEFAULT_TRIP_DELAY <= TRIP_DELAY_MAX);

// =============================================================================
// Threshold configuration
// =============================================================================

/// Live protection thresholds, also the persisted configuration record.
///
/// The serialized form is fixed-size: a little-endian `i16` followed by two
/// little-endian `f32`s.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Consecutive over-soft-limit samples before a delayed trip
    #[serde(with = "postcard::fixint::le")]
    pub trip_delay_samples: i16,
    /// Current above which the delayed trip counts down, in amps
    pub soft_limit_amps: f32,
    /// Current causing an immediate trip, in amps
    pub abs_limit_amps: f32,
}

/// Reason a stored record was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidField {
    TripDelay,
    SoftLimit,
    AbsLimit,
}

impl ThresholdConfig {
    /// Safe defaults used on first boot and after a corrupted load.
    pub const DEFAULT: Self = Self {
        trip_delay_samples: DEFAULT_TRIP_DELAY as i16,
        soft_limit_amps: DEFAULT_SOFT_LIMIT,
        abs_limit_amps: DEFAULT_ABS_LIMIT,
    };

    /// Check every field against its valid range.
    ///
    /// NaN fails every range check.
    pub fn validate(&self) -> Result<(), InvalidField> {
        if !(0..=TRIP_DELAY_MAX as i16).contains(&self.trip_delay_samples) {
            return Err(InvalidField::TripDelay);
        }
        if !(ABS_LIMIT_MIN..=ABS_LIMIT_MAX).contains(&self.abs_limit_amps) {
            return Err(InvalidField::AbsLimit);
        }
        if !(SOFT_LIMIT_MIN..=self.abs_limit_amps).contains(&self.soft_limit_amps) {
            return Err(InvalidField::SoftLimit);
        }
        Ok(())
    }

    /// Trip delay as a sample count. Only meaningful on a validated record.
    pub fn trip_delay(&self) -> u16 {
        self.trip_delay_samples.clamp(0, TRIP_DELAY_MAX as i16) as u16
    }

    /// Apply `detents` encoder steps to `param`, clamping to its range.
    pub fn adjust(&mut self, param: Parameter, detents: i8) {
        let detents = i16::from(detents);
        match param {
            Parameter::TripDelay => {
                self.trip_delay_samples = self
                    .trip_delay_samples
                    .saturating_add(detents)
                    .clamp(0, TRIP_DELAY_MAX as i16);
            }
            Parameter::SoftLimit => {
                let soft = self.soft_limit_amps + SOFT_LIMIT_STEP * f32::from(detents);
                self.soft_limit_amps = soft.clamp(SOFT_LIMIT_MIN, self.abs_limit_amps);
            }
            Parameter::AbsLimit => {
                self.abs_limit_amps = (self.abs_limit_amps + ABS_LIMIT_STEP * f32::from(detents))
                    .clamp(ABS_LIMIT_MIN, ABS_LIMIT_MAX);
                // Pull the soft limit down with it
                if self.soft_limit_amps > self.abs_limit_amps {
                    self.soft_limit_amps = self.abs_limit_amps;
                }
            }
        }
    }
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// =============================================================================
// Parameter selection
// =============================================================================

/// Which field the encoder currently edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parameter {
    #[default]
    TripDelay,
    SoftLimit,
    AbsLimit,
}

impl Parameter {
    /// Next parameter, wrapping after the absolute limit.
    pub const fn next(self) -> Self {
        match self {
            Self::TripDelay => Self::SoftLimit,
            Self::SoftLimit => Self::AbsLimit,
            Self::AbsLimit => Self::TripDelay,
        }
    }

    /// Index shown on the edit readout.
    pub const fn index(self) -> u8 {
        match self {
            Self::TripDelay => 0,
            Self::SoftLimit => 1,
            Self::AbsLimit => 2,
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

// =============================================================================
// Save coalescing
// =============================================================================

/// Coalesces bursts of edits into a single persisted write.
///
/// Each edit re-arms the countdown; the write is due once the countdown runs
/// out with no further edits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveDebouncer {
    remaining: Option<u8>,
}

impl SaveDebouncer {
    pub const fn new() -> Self {
        Self { remaining: None }
    }

    /// Record an edit, restarting the countdown.
    pub fn touch(&mut self) {
        self.remaining = Some(SAVE_DEBOUNCE_TICKS);
    }

    /// Advance one operator tick. Returns `true` exactly once per burst, when
    /// the write is due.
    pub fn tick(&mut self) -> bool {
        match self.remaining {
            Some(ticks) if ticks > 1 => {
                self.remaining = Some(ticks - 1);
                false
            }
            Some(_) => {
                self.remaining = None;
                true
            }
            None => false,
        }
    }

    pub const fn is_pending(&self) -> bool {
        self.remaining.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(ThresholdConfig::DEFAULT.validate(), Ok(()));
        assert_eq!(ThresholdConfig::DEFAULT.trip_delay(), 25);
        assert_eq!(ThresholdConfig::DEFAULT.soft_limit_amps, 5.0);
        assert_eq!(ThresholdConfig::DEFAULT.abs_limit_amps, 10.0);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut cfg = ThresholdConfig::DEFAULT;
        cfg.abs_limit_amps = -5.0;
        assert_eq!(cfg.validate(), Err(InvalidField::AbsLimit));

        let mut cfg = ThresholdConfig::DEFAULT;
        cfg.trip_delay_samples = 1001;
        assert_eq!(cfg.validate(), Err(InvalidField::TripDelay));

        let mut cfg = ThresholdConfig::DEFAULT;
        cfg.trip_delay_samples = -1;
        assert_eq!(cfg.validate(), Err(InvalidField::TripDelay));

        let mut cfg = ThresholdConfig::DEFAULT;
        cfg.soft_limit_amps = 12.0;
        assert_eq!(cfg.validate(), Err(InvalidField::SoftLimit));

        let mut cfg = ThresholdConfig::DEFAULT;
        cfg.soft_limit_amps = f32::NAN;
        assert_eq!(cfg.validate(), Err(InvalidField::SoftLimit));
    }

    #[test]
    fn test_trip_delay_clamps() {
        let mut cfg = ThresholdConfig::DEFAULT;
        cfg.trip_delay_samples = 999;
        cfg.adjust(Parameter::TripDelay, 2);
        assert_eq!(cfg.trip_delay_samples, 1000);

        cfg.trip_delay_samples = 1;
        cfg.adjust(Parameter::TripDelay, -2);
        assert_eq!(cfg.trip_delay_samples, 0);
    }

    #[test]
    fn test_soft_limit_steps_by_tenth() {
        let mut cfg = ThresholdConfig::DEFAULT;
        cfg.adjust(Parameter::SoftLimit, 2);
        assert!(approx(cfg.soft_limit_amps, 5.2));
        cfg.adjust(Parameter::SoftLimit, -1);
        assert!(approx(cfg.soft_limit_amps, 5.1));
    }

    #[test]
    fn test_soft_limit_never_exceeds_abs_limit() {
        let mut cfg = ThresholdConfig::DEFAULT;
        cfg.soft_limit_amps = 9.95;
        cfg.adjust(Parameter::SoftLimit, 2);
        assert_eq!(cfg.soft_limit_amps, cfg.abs_limit_amps);
    }

    #[test]
    fn test_soft_limit_floor() {
        let mut cfg = ThresholdConfig::DEFAULT;
        cfg.soft_limit_amps = 0.6;
        cfg.adjust(Parameter::SoftLimit, -2);
        assert_eq!(cfg.soft_limit_amps, SOFT_LIMIT_MIN);
    }

    #[test]
    fn test_abs_limit_range() {
        let mut cfg = ThresholdConfig::DEFAULT;
        cfg.abs_limit_amps = 29.0;
        cfg.adjust(Parameter::AbsLimit, 2);
        assert_eq!(cfg.abs_limit_amps, ABS_LIMIT_MAX);

        cfg.soft_limit_amps = 1.0;
        cfg.abs_limit_amps = 2.0;
        cfg.adjust(Parameter::AbsLimit, -2);
        assert_eq!(cfg.abs_limit_amps, ABS_LIMIT_MIN);
    }

    #[test]
    fn test_lowering_abs_limit_drags_soft_limit() {
        let mut cfg = ThresholdConfig::DEFAULT;
        cfg.soft_limit_amps = 10.0;
        cfg.adjust(Parameter::AbsLimit, -2);
        assert_eq!(cfg.abs_limit_amps, 8.0);
        assert_eq!(cfg.soft_limit_amps, 8.0);
        assert_eq!(cfg.validate(), Ok(()));
    }

    #[test]
    fn test_parameter_cycle_wraps() {
        let mut param = Parameter::default();
        let mut seen = [0u8; 4];
        for slot in seen.iter_mut() {
            *slot = param.index();
            param = param.next();
        }
        assert_eq!(seen, [0, 1, 2, 0]);
    }

    #[test]
    fn test_save_debouncer_idle() {
        let mut debouncer = SaveDebouncer::new();
        for _ in 0..50 {
            assert!(!debouncer.tick());
        }
    }

    #[test]
    fn test_save_debouncer_single_edit() {
        let mut debouncer = SaveDebouncer::new();
        debouncer.touch();
        for _ in 0..SAVE_DEBOUNCE_TICKS - 1 {
            assert!(!debouncer.tick());
        }
        assert!(debouncer.tick());
        assert!(!debouncer.is_pending());
        assert!(!debouncer.tick());
    }

    #[test]
    fn test_save_debouncer_coalesces_burst() {
        let mut debouncer = SaveDebouncer::new();
        let mut writes = 0;

        // An edit every tick for a while, then quiet
        for _ in 0..30 {
            debouncer.touch();
            if debouncer.tick() {
                writes += 1;
            }
        }
        assert_eq!(writes, 0, "no write while edits keep coming");

        let mut quiet_ticks = 0;
        while !debouncer.tick() {
            quiet_ticks += 1;
            assert!(quiet_ticks < 100);
        }
        writes += 1;

        // Burst tick consumed one countdown step, quiet ticks the rest
        assert_eq!(quiet_ticks + 2, SAVE_DEBOUNCE_TICKS as i32);
        assert_eq!(writes, 1);
    }
}
