//! Heating processes
//!
//! Only one process is active at a time; the menu layer guarantees that by
//! construction. Each process owns its heater bank for the whole session.

mod autotune;
mod bank;
mod controller;

pub use autotune::{RelayAutoTuner, TunerReport, TunerState, TuningResult};
pub use bank::HeaterBank;
pub use controller::{ProcessState, ReflowProfileController, TickReport};
