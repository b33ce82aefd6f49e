//! Run configuration snapshots
//!
//! A snapshot is taken when a run starts and treated as read-only until it
//! ends. Edits made by the menu in the meantime only apply to the next run.

use crate::control::{PidCoefficients, Segment, MAX_SEGMENTS};
use crate::error::ControlError;
use crate::time::seconds_to_ms;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A reballing pattern, terminated by the first zero-rate leg
pub type Pattern = [Segment; MAX_SEGMENTS];

/// An all-zero pattern (no legs)
pub const EMPTY_PATTERN: Pattern = [Segment::new(0.0, 0.0, 0.0); MAX_SEGMENTS];

/// Heater channel layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Channels {
    /// Bottom heater only
    #[default]
    Single,
    /// Top and bottom heaters, always switched together
    Dual,
}

/// Where the setpoint comes from during a run
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SetpointMode {
    /// Fixed setpoint held for a fixed time
    Static {
        /// Setpoint (°C)
        setpoint: f32,
        /// Run time (seconds)
        duration_s: f32,
    },
    /// Ramp/soak profile; the run ends with the last leg
    Profile {
        /// Legs, zero-rate terminated
        pattern: Pattern,
    },
}

/// Configuration of a preheater or reballing run
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProcessConfig {
    /// PID coefficients
    pub coefficients: PidCoefficients,
    /// Duty window length, also the PID update period (seconds)
    pub sample_period_s: f32,
    /// Setpoint source
    pub setpoint: SetpointMode,
    /// Heater channels driven by this run
    pub channels: Channels,
}

impl ProcessConfig {
    /// Single heater held at a fixed setpoint
    pub fn preheater(
        coefficients: PidCoefficients,
        sample_period_s: f32,
        setpoint: f32,
        duration_s: f32,
    ) -> Self {
        Self {
            coefficients,
            sample_period_s,
            setpoint: SetpointMode::Static {
                setpoint,
                duration_s,
            },
            channels: Channels::Single,
        }
    }

    /// Top and bottom heaters following a ramp/soak pattern
    pub fn reballing(coefficients: PidCoefficients, sample_period_s: f32, pattern: Pattern) -> Self {
        Self {
            coefficients,
            sample_period_s,
            setpoint: SetpointMode::Profile { pattern },
            channels: Channels::Dual,
        }
    }

    /// Check everything that can be checked before the first reading
    pub fn validate(&self) -> Result<(), ControlError> {
        if self.coefficients.kp == 0.0 || !self.coefficients.kp.is_finite() {
            return Err(ControlError::DegenerateDutyMapping);
        }
        validate_sample_period(self.sample_period_s)?;

        match self.setpoint {
            SetpointMode::Static {
                setpoint,
                duration_s,
            } => {
                if !setpoint.is_finite() {
                    return Err(ControlError::DegenerateDutyMapping);
                }
                validate_duration(duration_s)
            }
            SetpointMode::Profile { pattern } => {
                if pattern[0].is_terminator() {
                    return Err(ControlError::InvalidProfile);
                }
                Ok(())
            }
        }
    }

    /// Sample period in whole milliseconds
    pub fn sample_period_ms(&self) -> u32 {
        seconds_to_ms(self.sample_period_s)
    }
}

/// Configuration of an auto-tuning run
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TuningConfig {
    /// Temperature the relay test oscillates around (°C)
    pub setpoint: f32,
    /// Total test time including warm-up (seconds)
    pub duration_s: f32,
    /// Relay decision period (seconds)
    pub sample_period_s: f32,
    /// Heater channels driven by the test
    pub channels: Channels,
}

impl TuningConfig {
    /// Check the configuration before the test starts
    pub fn validate(&self) -> Result<(), ControlError> {
        validate_sample_period(self.sample_period_s)?;
        validate_duration(self.duration_s)
    }

    /// Sample period in whole milliseconds
    pub fn sample_period_ms(&self) -> u32 {
        seconds_to_ms(self.sample_period_s)
    }

    /// Test duration in whole milliseconds
    pub fn duration_ms(&self) -> u32 {
        seconds_to_ms(self.duration_s)
    }
}

fn validate_sample_period(sample_period_s: f32) -> Result<(), ControlError> {
    if !(sample_period_s.is_finite() && seconds_to_ms(sample_period_s) > 0) {
        return Err(ControlError::InvalidSamplePeriod);
    }
    Ok(())
}

fn validate_duration(duration_s: f32) -> Result<(), ControlError> {
    if !(duration_s.is_finite() && duration_s > 0.0) {
        return Err(ControlError::InvalidDuration);
    }
    Ok(())
}
