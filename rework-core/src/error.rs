//! Control error taxonomy
//!
//! Every failure is local and synchronous: it is returned to the process
//! layer that made the call, after the outputs it owns have been driven
//! off. Whether the run is aborted or continued is the caller's decision.

use core::fmt;

use crate::traits::SensorError;

/// Errors raised by the control core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlError {
    /// PID step called with a non-positive or non-finite time step
    InvalidTimestep,
    /// Duty mapping with zero proportional gain or zero reference span
    DegenerateDutyMapping,
    /// Fewer than two distinct warm-up samples when fitting the slope
    DegenerateRegression,
    /// The process value was flagged as invalid by its sensor
    SensorFault(SensorError),
    /// Segment list is empty, too long, or a ramp never reaches its limit
    InvalidProfile,
    /// Sample period is not strictly positive
    InvalidSamplePeriod,
    /// Run duration is not strictly positive
    InvalidDuration,
    /// Heater bank layout differs from the configured channel layout
    ChannelMismatch,
    /// Tick requested while no run is active
    NotRunning,
    /// Tuning ended without any relay statistics to compute from
    TuningIncomplete,
    /// Tuning started at or above its setpoint, so there is no warm-up
    SetpointReached,
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlError::InvalidTimestep => write!(f, "PID time step must be positive"),
            ControlError::DegenerateDutyMapping => {
                write!(f, "duty mapping needs non-zero Kp and reference span")
            }
            ControlError::DegenerateRegression => {
                write!(f, "regression needs at least two distinct samples")
            }
            ControlError::SensorFault(kind) => write!(f, "sensor fault: {:?}", kind),
            ControlError::InvalidProfile => write!(f, "invalid ramp/soak profile"),
            ControlError::InvalidSamplePeriod => write!(f, "sample period must be positive"),
            ControlError::InvalidDuration => write!(f, "run duration must be positive"),
            ControlError::ChannelMismatch => write!(f, "heater channels do not match config"),
            ControlError::NotRunning => write!(f, "process is not running"),
            ControlError::TuningIncomplete => write!(f, "tuning never reached the setpoint"),
            ControlError::SetpointReached => {
                write!(f, "process already at or above the tuning setpoint")
            }
        }
    }
}

impl From<SensorError> for ControlError {
    fn from(err: SensorError) -> Self {
        ControlError::SensorFault(err)
    }
}
