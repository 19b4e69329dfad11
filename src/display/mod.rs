//! Two-line character display output.
//!
//! Formatting is pure (see [`format`]); the only side effect is handing the
//! finished rows to a [`CharDisplay`] driver.

pub mod format;

pub use format::{Line, render, render_int};

use core::fmt::Debug;

use log::warn;

/// Driver for a fixed-width character display.
pub trait CharDisplay {
    type Error: Debug;

    /// Write `text` at column 0 of `row`. `text` is at most
    /// [`DISPLAY_COLUMNS`](crate::config::DISPLAY_COLUMNS) characters.
    fn write_line(&mut self, row: u8, text: &str) -> Result<(), Self::Error>;
}

/// The two rows rendered for one operator tick.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DisplayLines {
    pub top: Line,
    pub bottom: Line,
}

impl DisplayLines {
    pub fn new(top: Line, bottom: Line) -> Self {
        Self { top, bottom }
    }

    /// Push both rows to the display. Failures are logged and dropped; the
    /// next tick redraws everything anyway.
    pub fn show<D: CharDisplay>(&self, display: &mut D) {
        for (row, text) in [(0u8, &self.top), (1, &self.bottom)] {
            if let Err(e) = display.write_line(row, text) {
                warn!("Display write failed on row {}: {:?}", row, e);
            }
        }
    }
}

/// Welcome text shown while the controller starts up.
pub fn splash() -> DisplayLines {
    let [top, bottom] = format::SPLASH_TEXT.map(|text| {
        let mut line = Line::new();
        line.push_str(text).ok();
        format::pad(line)
    });
    DisplayLines::new(top, bottom)
}
