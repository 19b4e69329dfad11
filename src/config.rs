//! Compile-time hardware and timing constants.
//!
//! Everything the fuse needs to know about the analog front end and the
//! scheduling periods lives here. Orderings that the protection logic relies
//! on are checked at compile time.

// =============================================================================
// ADC front end
// =============================================================================

/// Full-scale ADC code count (12-bit converter).
pub const ADC_RESOLUTION: f32 = 4096.0;

/// ADC reference voltage in volts.
pub const ADC_REF_VOLTS: f32 = 3.3;

/// Upper resistor of the line-voltage divider in ohms.
pub const DIVIDER_R1_OHMS: f32 = 100_000.0;

/// Lower resistor of the line-voltage divider in ohms.
pub const DIVIDER_R2_OHMS: f32 = 3_300.0;

/// Line volts per volt at the ADC pin.
pub const DIVIDER_RATIO: f32 = (DIVIDER_R1_OHMS + DIVIDER_R2_OHMS) / DIVIDER_R2_OHMS;

/// Hall sensor gain in volts per amp (±30 A variant).
pub const CURRENT_SENSOR_GAIN: f32 = 0.066;

/// Currents below this value (A) are reported as exactly zero.
pub const CURRENT_NOISE_FLOOR: f32 = 0.1;

/// Number of startup samples averaged into the current zero offset.
pub const CALIBRATION_SAMPLES: u8 = 5;

const _: () = assert!(CALIBRATION_SAMPLES > 0);

// =============================================================================
// Scheduling
// =============================================================================

/// Sampling period of the acquisition timer in microseconds.
///
/// The delayed trip time is `trip_delay_samples × SAMPLE_PERIOD_US`.
pub const SAMPLE_PERIOD_US: u32 = 1_000;

/// Period of the cooperative operator loop in milliseconds.
pub const OPERATOR_TICK_MS: u32 = 100;

/// Operator ticks between the last edit and the persisted write.
pub const SAVE_DEBOUNCE_TICKS: u8 = 10;

/// Operator ticks the trip message stays on screen.
pub const TRIP_MESSAGE_TICKS: u8 = 20;

/// Poll interval while waiting for the startup calibration, in milliseconds.
pub const CALIBRATION_POLL_MS: u32 = 1;

/// Upper bound on calibration polls before startup gives up.
pub const CALIBRATION_MAX_POLLS: u32 = 500;

/// Splash screen duration at startup, in milliseconds.
pub const SPLASH_MS: u32 = 500;

const _: () = assert!(SAVE_DEBOUNCE_TICKS > 0);
// The calibration window must fit comfortably inside the wait budget.
const _: () = assert!(
    (CALIBRATION_SAMPLES as u32) * SAMPLE_PERIOD_US
        < CALIBRATION_MAX_POLLS * CALIBRATION_POLL_MS * 1_000
);

// =============================================================================
// Operator inputs
// =============================================================================

/// Largest encoder movement accepted in one operator tick.
pub const ENCODER_MAX_STEP: i8 = 2;

/// Consecutive identical button samples before a level change is accepted.
pub const BUTTON_STABLE_SAMPLES: u8 = 5;

// =============================================================================
// Display
// =============================================================================

/// Characters per display row.
pub const DISPLAY_COLUMNS: usize = 16;
