//! Board-agnostic control core for the solder rework station
//!
//! This crate contains the closed-loop temperature control engine, free of
//! any hardware dependency:
//!
//! - PID controller and time-proportioning duty mapping
//! - Ramp/soak setpoint scheduler ("levels")
//! - Preheater and reballing process controller
//! - Relay auto-tuner producing new PID coefficients
//! - Configuration snapshots and the parameter store seam
//!
//! Everything is driven by an external tick at a fixed cadence. Nothing in
//! here blocks: waiting is a comparison between the current millisecond
//! counter and a stored deadline, re-checked on every tick. Because outputs
//! only change when the driver calls in, the finest duty-cycle step is one
//! tick period (about 16 ms at 60 Hz).

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod config;
pub mod control;
pub mod diag;
pub mod error;
pub mod process;
pub mod time;
pub mod traits;

pub use error::ControlError;
