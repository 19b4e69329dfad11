//! Power switch and status indicators.
//!
//! The pins are plain [`OutputPin`]s in their *logical* sense: `set_high`
//! means "switch conducts" / "LED lit". Active-low wiring is the board
//! support crate's job (wrap the pin or pick an inverted pin type).

use embedded_hal::digital::OutputPin;

use crate::protection::ProtectionStatus;

/// Pins driven from protection state.
pub struct FuseOutputs<P: OutputPin> {
    /// Load switch (MOSFET gate driver)
    pub switch: P,
    /// Lit while armed
    pub on_led: P,
    /// Lit after a trip
    pub off_led: P,
    /// Lit while disabled
    pub disabled_led: P,
    /// Controller-ready indicator, lit once startup completes
    pub ready_led: P,
}

impl<P: OutputPin> FuseOutputs<P> {
    pub fn new(switch: P, on_led: P, off_led: P, disabled_led: P, ready_led: P) -> Self {
        Self {
            switch,
            on_led,
            off_led,
            disabled_led,
            ready_led,
        }
    }

    /// Startup state: switch open, every status LED lit as a lamp test.
    pub fn lamp_test(&mut self) -> Result<(), P::Error> {
        self.switch.set_low()?;
        self.on_led.set_high()?;
        self.off_led.set_high()?;
        self.disabled_led.set_high()?;
        self.ready_led.set_low()
    }

    /// Drive the switch and LEDs for `status`.
    ///
    /// The switch is always written first so that the load is cut even if a
    /// later LED write fails.
    pub fn apply(&mut self, status: ProtectionStatus) -> Result<(), P::Error> {
        match status {
            ProtectionStatus::Armed => {
                self.switch.set_high()?;
                self.on_led.set_high()?;
                self.off_led.set_low()?;
                self.disabled_led.set_low()
            }
            ProtectionStatus::Tripped => {
                self.switch.set_low()?;
                self.on_led.set_low()?;
                self.off_led.set_high()?;
                self.disabled_led.set_low()
            }
            ProtectionStatus::Disabled => {
                self.switch.set_low()?;
                self.on_led.set_low()?;
                self.off_led.set_low()?;
                self.disabled_led.set_high()
            }
        }
    }

    /// Light the controller-ready LED.
    pub fn set_ready(&mut self) -> Result<(), P::Error> {
        self.ready_led.set_high()
    }
}
