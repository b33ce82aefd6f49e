//! Control algorithms
//!
//! Pure numeric building blocks. None of them touch an output; the process
//! layer composes them and asserts the heaters.

pub mod duty;
pub mod levels;
pub mod pid;
pub mod stats;

pub use duty::{duty_fraction, DutyWindow, DUTY_BASE};
pub use levels::{Levels, Segment, Stage, MAX_SEGMENTS};
pub use pid::{PidCoefficients, PidController};
pub use stats::{ExtremeTracker, LinearRegression};
