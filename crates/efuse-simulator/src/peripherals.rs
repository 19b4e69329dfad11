//! Host stand-ins for the board peripherals.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::thread;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};
use log::{debug, info};

use efuse::acquisition::ConversionTrigger;
use efuse::config::{ADC_REF_VOLTS, ADC_RESOLUTION, CURRENT_SENSOR_GAIN, DIVIDER_RATIO};
use efuse::display::CharDisplay;
use efuse::measurement::RawSample;
use efuse::storage::{ConfigStorage, RECORD_SIZE};

/// Sensor output at zero current, in volts.
const SENSOR_ZERO_VOLTS: f32 = 2.5;

/// Output pin that logs level changes.
#[derive(Clone)]
pub struct SimPin {
    name: &'static str,
    level: Arc<AtomicBool>,
}

impl SimPin {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            level: Arc::new(AtomicBool::new(false)),
        }
    }

    fn set(&self, high: bool) {
        if self.level.swap(high, Ordering::SeqCst) != high {
            debug!("{} -> {}", self.name, if high { "on" } else { "off" });
        }
    }
}

impl ErrorType for SimPin {
    type Error = core::convert::Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.set(true);
        Ok(())
    }
}

/// The simulated line: a fixed supply feeding an adjustable load.
#[derive(Clone)]
pub struct Line {
    supply_volts: f32,
    load_amps: Arc<AtomicU32>,
}

impl Line {
    pub fn new(supply_volts: f32) -> Self {
        Self {
            supply_volts,
            load_amps: Arc::new(AtomicU32::new(0f32.to_bits())),
        }
    }

    pub fn set_load(&self, amps: f32) {
        info!("Load set to {:.2} A", amps);
        self.load_amps.store(amps.to_bits(), Ordering::Relaxed);
    }

    fn load(&self) -> f32 {
        f32::from_bits(self.load_amps.load(Ordering::Relaxed))
    }

    /// ADC codes for the present line state. `switch_closed` gates the load.
    fn sample(&self, switch_closed: bool) -> RawSample {
        let amps = if switch_closed { self.load() } else { 0.0 };
        let sensor_volts = SENSOR_ZERO_VOLTS - amps * CURRENT_SENSOR_GAIN;
        let divided_volts = self.supply_volts / DIVIDER_RATIO;
        RawSample::new(to_code(sensor_volts), to_code(divided_volts))
    }
}

fn to_code(volts: f32) -> u16 {
    (volts * ADC_RESOLUTION / ADC_REF_VOLTS).clamp(0.0, ADC_RESOLUTION - 1.0) as u16
}

/// ADC that completes one tick after it was started.
pub struct SimAdc {
    line: Line,
    switch: SimPin,
    pending: bool,
}

impl SimAdc {
    pub fn new(line: Line, switch: SimPin) -> Self {
        Self {
            line,
            switch,
            pending: false,
        }
    }

    /// Result of the conversion started by the last trigger, if any.
    pub fn complete(&mut self) -> Option<RawSample> {
        if !std::mem::take(&mut self.pending) {
            return None;
        }
        let closed = self.switch.level.load(Ordering::SeqCst);
        Some(self.line.sample(closed))
    }
}

impl ConversionTrigger for SimAdc {
    fn start_conversion(&mut self) {
        self.pending = true;
    }
}

/// Configuration record kept in a file.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigStorage for FileStorage {
    type Error = io::Error;

    fn read(&mut self, buf: &mut [u8; RECORD_SIZE]) -> Result<(), Self::Error> {
        let bytes = fs::read(&self.path)?;
        let record: [u8; RECORD_SIZE] = bytes.as_slice().try_into().map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("expected {} bytes, found {}", RECORD_SIZE, bytes.len()),
            )
        })?;
        *buf = record;
        Ok(())
    }

    fn write(&mut self, buf: &[u8; RECORD_SIZE]) -> Result<(), Self::Error> {
        fs::write(&self.path, buf)?;
        info!("Thresholds written to {}", self.path.display());
        Ok(())
    }
}

/// Prints the display rows whenever they change.
#[derive(Default)]
pub struct TerminalDisplay {
    rows: [String; 2],
}

impl CharDisplay for TerminalDisplay {
    type Error = core::convert::Infallible;

    fn write_line(&mut self, row: u8, text: &str) -> Result<(), Self::Error> {
        let slot = &mut self.rows[usize::from(row) % 2];
        if *slot != text {
            *slot = text.to_owned();
            println!("[{}] |{:<16}|", row, text);
        }
        Ok(())
    }
}

pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}
