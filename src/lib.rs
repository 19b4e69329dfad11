//! Hardware-independent control core for an electronic fuse
//!
//! This crate contains the platform-agnostic logic of the fuse: sample
//! calibration and unit conversion, the trip-decision state machine, the
//! persisted threshold configuration and the operator interaction loop.
//!
//! Drivers plug in through a handful of seams: [`embedded_hal::digital::OutputPin`]
//! for the power switch and LEDs, [`acquisition::ConversionTrigger`] for the ADC,
//! [`storage::ConfigStorage`] for the configuration record and
//! [`display::CharDisplay`] for the 16x2 character display.
//!
//! It is `#![no_std]` outside of tests, so it compiles on embedded targets and
//! on desktop hosts (for the simulator and tests).
//!
//! # Execution contexts
//!
//! - Interrupt context: [`context::FuseContext::on_timer_tick`] and
//!   [`context::FuseContext::on_conversion_complete`], plus the button edge
//!   callbacks on [`input::ButtonEdge`].
//! - Main loop: [`operator::Operator::tick`] once per cooperative tick.

#![cfg_attr(not(test), no_std)]

pub mod acquisition;
pub mod config;
pub mod context;
pub mod display;
pub mod input;
pub mod measurement;
pub mod operator;
pub mod outputs;
pub mod protection;
pub mod settings;
pub mod storage;
