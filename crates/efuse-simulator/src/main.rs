//! Desktop simulator for the efuse-rs control core.
//!
//! Runs the sampling interrupt on a background thread against a simulated
//! 24 V line and the operator loop on the main thread. The two display rows
//! are printed whenever they change; thresholds persist to a file.
//!
//! # Commands
//!
//! | Input      | Action                          |
//! |------------|---------------------------------|
//! | `r`        | Reset (re-arm) button           |
//! | `d`        | Disable button                  |
//! | `s`        | Select button                   |
//! | `+` / `-`  | Encoder one detent cw / ccw     |
//! | `l <amps>` | Set the simulated load current  |
//! | `q`        | Quit                            |
//!
//! The configuration file defaults to `efuse.cfg` and can be moved with the
//! `EFUSE_CONFIG` environment variable. An optional first argument sets the
//! initial load in amps.

mod peripherals;

use std::io::{self, BufRead};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use log::{error, info, warn};

use efuse::config::{OPERATOR_TICK_MS, SAMPLE_PERIOD_US, SPLASH_MS};
use efuse::context::FuseContext;
use efuse::display;
use efuse::input::{ButtonEdge, Encoder};
use efuse::measurement::CorrectionTable;
use efuse::operator::Operator;
use efuse::outputs::FuseOutputs;

use peripherals::{FileStorage, Line, SimAdc, SimPin, StdDelay, TerminalDisplay};

/// Supply voltage of the simulated line.
const SUPPLY_VOLTS: f32 = 24.0;

const DEFAULT_CONFIG_PATH: &str = "efuse.cfg";

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
enum Command {
    Reset,
    Disable,
    Select,
    Turn(i8),
    Load(f32),
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    let mut words = line.split_whitespace();
    let command = match words.next()? {
        "r" => Command::Reset,
        "d" => Command::Disable,
        "s" => Command::Select,
        "+" => Command::Turn(1),
        "-" => Command::Turn(-1),
        "l" => Command::Load(words.next()?.parse().ok()?),
        "q" => Command::Quit,
        _ => return None,
    };
    Some(command)
}

/// Forward stdin lines as commands until EOF.
fn spawn_stdin_reader() -> Receiver<Command> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match parse_command(&line) {
                Some(command) => {
                    if tx.send(command).is_err() {
                        break;
                    }
                }
                None if line.trim().is_empty() => {}
                None => warn!("Unknown command {:?}", line.trim()),
            }
        }
        let _ = tx.send(Command::Quit);
    });
    rx
}

fn click(button: &ButtonEdge) {
    button.on_press();
    button.on_release();
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    env_logger::init();
    info!("Starting efuse-rs simulator");
    info!("Commands: r=reset  d=disable  s=select  +/-=encoder  l <amps>=load  q=quit");

    let switch = SimPin::new("switch");
    let outputs = FuseOutputs::new(
        switch.clone(),
        SimPin::new("led:on"),
        SimPin::new("led:off"),
        SimPin::new("led:disabled"),
        SimPin::new("led:ready"),
    );
    let ctx = Arc::new(FuseContext::new(outputs, CorrectionTable::voltage()));
    let line = Line::new(SUPPLY_VOLTS);
    if let Some(arg) = std::env::args().nth(1) {
        match arg.parse::<f32>() {
            Ok(amps) => line.set_load(amps),
            Err(_) => warn!("Ignoring initial load {:?}, expected amps", arg),
        }
    }
    let mut lcd = TerminalDisplay::default();
    let mut delay = StdDelay;

    ctx.lamp_test();
    display::splash().show(&mut lcd);
    thread::sleep(Duration::from_millis(u64::from(SPLASH_MS)));

    // Sampling "interrupt"
    let running = Arc::new(AtomicBool::new(true));
    let sampler = {
        let ctx = Arc::clone(&ctx);
        let running = Arc::clone(&running);
        let mut adc = SimAdc::new(line.clone(), switch);
        thread::spawn(move || {
            let period = Duration::from_micros(u64::from(SAMPLE_PERIOD_US));
            while running.load(Ordering::Relaxed) {
                ctx.on_timer_tick(&mut adc);
                ctx.on_conversion_complete(adc.complete());
                thread::sleep(period);
            }
        })
    };

    let fuse: &FuseContext<SimPin> = &ctx;
    if let Err(e) = fuse.wait_for_calibration(&mut delay) {
        error!("Startup failed: {}", e);
        running.store(false, Ordering::Relaxed);
        std::process::exit(1);
    }

    let config_path =
        std::env::var("EFUSE_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned());
    info!("Config file: {}", config_path);
    let mut operator = Operator::startup(FileStorage::new(config_path), fuse);

    let commands = spawn_stdin_reader();
    // Free-running counter the encoder commands move
    let mut counter: u16 = 0;
    let mut encoder = Encoder::new(counter);
    let tick = Duration::from_millis(u64::from(OPERATOR_TICK_MS));

    'main: loop {
        loop {
            match commands.try_recv() {
                Ok(Command::Reset) => click(&fuse.buttons.reset),
                Ok(Command::Disable) => click(&fuse.buttons.disable),
                Ok(Command::Select) => click(&fuse.buttons.select),
                // Clockwise counts the hardware counter down
                Ok(Command::Turn(detents)) => {
                    counter = counter.wrapping_add_signed(-i16::from(detents));
                }
                Ok(Command::Load(amps)) => line.set_load(amps),
                Ok(Command::Quit) | Err(TryRecvError::Disconnected) => break 'main,
                Err(TryRecvError::Empty) => break,
            }
        }

        let events = fuse.buttons.poll(encoder.delta(counter));
        operator.tick(fuse, events, &mut lcd);
        thread::sleep(tick);
    }

    info!("Shutting down");
    running.store(false, Ordering::Relaxed);
    let _ = sampler.join();
}
