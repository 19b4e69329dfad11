//! Operator inputs: button edges and encoder movement.
//!
//! Buttons are reported by the interrupt context and consumed by the main
//! loop. Each button owns a lock-free [`ButtonEdge`] whose single consuming
//! operation, [`ButtonEdge::poll_and_clear`], reports every completed
//! press-and-release at most once.

use core::sync::atomic::{AtomicU8, Ordering};

use log::trace;

use crate::config::{BUTTON_STABLE_SAMPLES, ENCODER_MAX_STEP};

// =============================================================================
// Edge detection
// =============================================================================

const IDLE: u8 = 0;
const PRESSED: u8 = 1;
const RELEASED_PENDING: u8 = 2;

/// Observable state of a [`ButtonEdge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeState {
    /// Nothing to report
    Idle,
    /// Button is down
    Pressed,
    /// A release happened and has not been consumed yet
    ReleasedPending,
}

/// Release-edge latch shared between interrupt and main-loop contexts.
///
/// A release only counts after a press, so a stray release edge (contact
/// bounce, missed press) is ignored. A pending release absorbs further clicks
/// until it is consumed.
#[derive(Debug)]
pub struct ButtonEdge {
    state: AtomicU8,
}

impl ButtonEdge {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(IDLE),
        }
    }

    /// Button went down.
    pub fn on_press(&self) {
        self.state
            .compare_exchange(IDLE, PRESSED, Ordering::AcqRel, Ordering::Acquire)
            .ok();
    }

    /// Button came back up.
    pub fn on_release(&self) {
        self.state
            .compare_exchange(
                PRESSED,
                RELEASED_PENDING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .ok();
    }

    /// Consume a pending release. Returns `true` once per release.
    pub fn poll_and_clear(&self) -> bool {
        self.state
            .compare_exchange(RELEASED_PENDING, IDLE, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn state(&self) -> EdgeState {
        match self.state.load(Ordering::Acquire) {
            PRESSED => EdgeState::Pressed,
            RELEASED_PENDING => EdgeState::ReleasedPending,
            _ => EdgeState::Idle,
        }
    }
}

impl Default for ButtonEdge {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Level debouncing
// =============================================================================

/// Integrating debouncer for a sampled button level.
///
/// A level change is accepted once the raw input has read the new level for
/// [`BUTTON_STABLE_SAMPLES`] consecutive samples.
#[derive(Debug, Clone, Copy, Default)]
pub struct ButtonDebouncer {
    stable: bool,
    count: u8,
}

impl ButtonDebouncer {
    pub const fn new() -> Self {
        Self {
            stable: false,
            count: 0,
        }
    }

    /// Feed one raw sample (`true` = pressed). Returns the new stable level
    /// when it changes.
    pub fn update(&mut self, pressed: bool) -> Option<bool> {
        if pressed == self.stable {
            self.count = 0;
            return None;
        }

        self.count += 1;
        if self.count >= BUTTON_STABLE_SAMPLES {
            self.stable = pressed;
            self.count = 0;
            Some(pressed)
        } else {
            None
        }
    }

    /// Feed one raw sample and forward accepted changes to `edge`.
    pub fn feed(&mut self, pressed: bool, edge: &ButtonEdge) {
        match self.update(pressed) {
            Some(true) => edge.on_press(),
            Some(false) => edge.on_release(),
            None => {}
        }
    }

    pub const fn is_pressed(&self) -> bool {
        self.stable
    }
}

// =============================================================================
// Encoder
// =============================================================================

/// Turns a free-running quadrature counter into per-tick deltas.
#[derive(Debug, Clone, Copy)]
pub struct Encoder {
    last: u16,
}

impl Encoder {
    /// Start tracking from the counter's current value.
    pub const fn new(counter: u16) -> Self {
        Self { last: counter }
    }

    /// Movement since the previous call, clamped to ±[`ENCODER_MAX_STEP`].
    ///
    /// The counter counts down when the knob turns clockwise, so the delta
    /// is `previous - current`. Counter wraparound is handled.
    pub fn delta(&mut self, counter: u16) -> i8 {
        let diff = self.last.wrapping_sub(counter) as i16;
        self.last = counter;
        diff.clamp(i16::from(-ENCODER_MAX_STEP), i16::from(ENCODER_MAX_STEP)) as i8
    }
}

// =============================================================================
// Per-tick events
// =============================================================================

/// The three operator buttons.
#[derive(Debug, Default)]
pub struct Buttons {
    pub reset: ButtonEdge,
    pub disable: ButtonEdge,
    pub select: ButtonEdge,
}

impl Buttons {
    pub const fn new() -> Self {
        Self {
            reset: ButtonEdge::new(),
            disable: ButtonEdge::new(),
            select: ButtonEdge::new(),
        }
    }

    /// Consume pending releases and bundle them with the encoder movement.
    pub fn poll(&self, encoder: i8) -> InputEvents {
        let events = InputEvents {
            reset: self.reset.poll_and_clear(),
            disable: self.disable.poll_and_clear(),
            select: self.select.poll_and_clear(),
            encoder,
        };
        if events.any() {
            trace!("Input events {:?}", events);
        }
        events
    }
}

/// Inputs gathered for one operator tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputEvents {
    pub reset: bool,
    pub disable: bool,
    pub select: bool,
    /// Signed encoder detents, within ±[`ENCODER_MAX_STEP`]
    pub encoder: i8,
}

impl InputEvents {
    pub const fn any(&self) -> bool {
        self.reset || self.disable || self.select || self.encoder != 0
    }
}
