//! The cooperative operator loop.
//!
//! Runs once per [`OPERATOR_TICK_MS`](crate::config::OPERATOR_TICK_MS) on the
//! main loop. Each tick handles the button and encoder events gathered since
//! the previous one, edits and persists the thresholds, and redraws both
//! display rows.

use embedded_hal::digital::OutputPin;
use log::{debug, error, info};

use crate::config::TRIP_MESSAGE_TICKS;
use crate::context::FuseContext;
use crate::display::format::{disabled_line, edit_line, status_line, trip_line};
use crate::display::{CharDisplay, DisplayLines};
use crate::input::InputEvents;
use crate::protection::ProtectionStatus;
use crate::settings::{Parameter, SaveDebouncer, ThresholdConfig};
use crate::storage::{ConfigStorage, ConfigStore};

/// Main-loop UI bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UiState {
    /// Parameter the encoder edits
    pub selected: Parameter,
    /// Pending coalesced save
    pub save: SaveDebouncer,
    /// Ticks left on the trip message
    pub trip_message_ticks: u8,
}

/// Owns the configuration store and the UI state.
pub struct Operator<S: ConfigStorage> {
    store: ConfigStore<S>,
    ui: UiState,
}

impl<S: ConfigStorage> Operator<S> {
    /// Load the configuration, apply it and arm the fuse.
    ///
    /// Call once calibration has finished. Thresholds are installed before
    /// the first arm so the watchdog starts from the persisted trip delay.
    pub fn startup<P: OutputPin>(storage: S, ctx: &FuseContext<P>) -> Self {
        let store = ConfigStore::load(storage);
        ctx.apply_thresholds(*store.config());
        ctx.rearm();
        ctx.set_ready();
        info!("Fuse controller ready");

        Self {
            store,
            ui: UiState::default(),
        }
    }

    /// Run one operator tick and return what was drawn.
    pub fn tick<P: OutputPin, D: CharDisplay>(
        &mut self,
        ctx: &FuseContext<P>,
        events: InputEvents,
        display: &mut D,
    ) -> DisplayLines {
        if events.reset {
            ctx.rearm();
        }

        if events.select {
            self.ui.selected = self.ui.selected.next();
            debug!("Selected parameter {:?}", self.ui.selected);
        }

        if events.disable {
            ctx.disable();
        }

        if ctx.take_trip_notification() {
            self.ui.trip_message_ticks = TRIP_MESSAGE_TICKS;
        }

        if events.encoder != 0 {
            self.store
                .config_mut()
                .adjust(self.ui.selected, events.encoder);
            ctx.apply_thresholds(*self.store.config());
            self.ui.save.touch();
        }

        if self.ui.save.tick() {
            if let Err(e) = self.store.save() {
                error!("Failed to save thresholds: {}", e);
            }
        }

        let lines = self.render(ctx);
        lines.show(display);
        lines
    }

    fn render<P: OutputPin>(&mut self, ctx: &FuseContext<P>) -> DisplayLines {
        let snapshot = ctx.snapshot();

        let top = if self.ui.trip_message_ticks > 0 {
            self.ui.trip_message_ticks -= 1;
            trip_line(snapshot.measurement.max_current_since_arm)
        } else if snapshot.status == ProtectionStatus::Disabled {
            disabled_line()
        } else {
            edit_line(self.store.config(), self.ui.selected)
        };

        DisplayLines::new(top, status_line(&snapshot.measurement))
    }

    pub fn config(&self) -> &ThresholdConfig {
        self.store.config()
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn store(&self) -> &ConfigStore<S> {
        &self.store
    }
}
