//! Pure text formatting for the 16x2 character display.

use core::fmt::Write;

use heapless::String as HeaplessString;

use crate::config::DISPLAY_COLUMNS;
use crate::measurement::Measurement;
use crate::settings::{Parameter, ThresholdConfig};

/// One display row.
pub type Line = HeaplessString<DISPLAY_COLUMNS>;

/// Status-line field widths: voltage, power, current.
pub const VOLTAGE_FIELD: usize = 5;
pub const POWER_FIELD: usize = 5;
pub const CURRENT_FIELD: usize = 6;

const _: () = assert!(VOLTAGE_FIELD + POWER_FIELD + CURRENT_FIELD == DISPLAY_COLUMNS);

pub const DISABLED_TEXT: &str = "FUSE DISABLED!!!";

pub const SPLASH_TEXT: [&str; 2] = ["Electronic fuse", "starting..."];

/// Magnitude without unit, at most four characters for anything below a
/// million.
///
/// Breakpoints sit where rounding would otherwise push a value into the
/// next, wider format (99.96 renders as `100`, not `100.0`).
fn magnitude(value: f32) -> HeaplessString<8> {
    let mut text = HeaplessString::new();
    if value.is_nan() || value < 0.1 {
        text.push('0').ok();
    } else if value < 99.95 {
        write!(&mut text, "{:.1}", value).ok();
    } else if value < 999.5 {
        write!(&mut text, "{:.0}", value).ok();
    } else if value < 9_950.0 {
        write!(&mut text, "{:.1}k", value / 1000.0).ok();
    } else {
        write!(&mut text, "{:.0}k", value / 1000.0).ok();
    }
    text
}

fn right_align(text: &str, unit: char, width: usize) -> Line {
    let mut field = Line::new();
    let len = text.chars().count() + 1;
    for _ in len..width {
        field.push(' ').ok();
    }
    field.push_str(text).ok();
    field.push(unit).ok();
    field
}

/// Render `value` right-aligned in `width` columns with `unit` last.
pub fn render(value: f32, unit: char, width: usize) -> Line {
    right_align(&magnitude(value), unit, width)
}

/// Render an integer quantity; below 1000 it is shown without decimals.
pub fn render_int(value: u32, unit: char, width: usize) -> Line {
    if value < 1000 {
        let mut text = HeaplessString::<8>::new();
        write!(&mut text, "{}", value).ok();
        right_align(&text, unit, width)
    } else {
        render(value as f32, unit, width)
    }
}

/// Pad `line` with spaces to the full display width.
pub fn pad(mut line: Line) -> Line {
    while line.len() < DISPLAY_COLUMNS {
        if line.push(' ').is_err() {
            break;
        }
    }
    line
}

/// `"12.3V 151W 12.3A"`: voltage, power and current.
pub fn status_line(measurement: &Measurement) -> Line {
    let mut line = Line::new();
    let voltage = render(measurement.voltage, 'V', VOLTAGE_FIELD);
    let power = render_int(measurement.power_watts(), 'W', POWER_FIELD);
    let current = render(measurement.current, 'A', CURRENT_FIELD);
    line.push_str(&voltage).ok();
    line.push_str(&power).ok();
    line.push_str(&current).ok();
    pad(line)
}

/// Parameter-edit readout: selected index then all three thresholds.
pub fn edit_line(config: &ThresholdConfig, selected: Parameter) -> Line {
    let mut line = Line::new();
    write!(
        &mut line,
        "{} {} {:.1}A {:.0}A",
        selected, config.trip_delay_samples, config.soft_limit_amps, config.abs_limit_amps
    )
    .ok();
    pad(line)
}

/// Transient message shown after a trip.
pub fn trip_line(peak_amps: f32) -> Line {
    let mut line = Line::new();
    write!(&mut line, "TRIP! max:{:.1}A", peak_amps).ok();
    pad(line)
}

pub fn disabled_line() -> Line {
    let mut line = Line::new();
    line.push_str(DISABLED_TEXT).ok();
    line
}
