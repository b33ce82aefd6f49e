//! Persisted station parameters
//!
//! Everything the menu edits lives in one record: the PID gains shared by
//! all processes, the sample period, the preheater and tuning targets, and
//! the reballing patterns. Runs never read this record directly; they get a
//! snapshot via [`StationParameters::preheater`],
//! [`StationParameters::reballing`] or [`StationParameters::tuning`].

use crate::control::{PidCoefficients, Segment, MAX_SEGMENTS};
use crate::process::TuningResult;

use super::types::{Channels, Pattern, ProcessConfig, TuningConfig, EMPTY_PATTERN};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Magic number to identify valid parameter data
pub const PARAMETERS_MAGIC: u32 = 0x5257_4B53; // "RWKS"

/// Current parameter layout version
pub const PARAMETERS_VERSION: u8 = 1;

/// Number of stored reballing patterns
pub const MAX_PATTERNS: usize = 5;

/// Largest serialized parameter record (postcard, varint encoded)
pub const MAX_SERIALIZED_SIZE: usize = 512;

/// A fixed setpoint held for a fixed time
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Hold {
    /// Setpoint (°C)
    pub setpoint: f32,
    /// Duration (seconds)
    pub duration_s: f32,
}

/// Complete parameter record
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StationParameters {
    /// Magic number for validation
    pub magic: u32,
    /// Layout version
    pub version: u8,
    /// PID gains shared by every process
    pub coefficients: PidCoefficients,
    /// Duty window / PID period (seconds)
    pub sample_period_s: f32,
    /// Preheater target
    pub preheater: Hold,
    /// Auto-tuning target
    pub tuning: Hold,
    /// Reballing patterns, each terminated by a zero-rate leg
    pub patterns: [Pattern; MAX_PATTERNS],
    /// Index of the pattern used by the next reballing run
    pub selected_pattern: u8,
}

impl Default for StationParameters {
    fn default() -> Self {
        let mut patterns = [EMPTY_PATTERN; MAX_PATTERNS];
        // Leaded BGA: preheat, soak below liquidus, short peak
        patterns[0][0] = Segment::new(1.0, 150.0, 60.0);
        patterns[0][1] = Segment::new(0.5, 183.0, 30.0);
        patterns[0][2] = Segment::new(1.0, 215.0, 20.0);
        // Lead-free BGA
        patterns[1][0] = Segment::new(1.0, 150.0, 60.0);
        patterns[1][1] = Segment::new(0.5, 217.0, 30.0);
        patterns[1][2] = Segment::new(1.0, 240.0, 20.0);

        Self {
            magic: PARAMETERS_MAGIC,
            version: PARAMETERS_VERSION,
            coefficients: PidCoefficients::new(2.0, 0.01, 5.0),
            sample_period_s: 2.0,
            preheater: Hold {
                setpoint: 150.0,
                duration_s: 600.0,
            },
            tuning: Hold {
                setpoint: 150.0,
                duration_s: 1800.0,
            },
            patterns,
            selected_pattern: 0,
        }
    }
}

impl StationParameters {
    /// Check the header
    pub fn is_valid(&self) -> bool {
        self.magic == PARAMETERS_MAGIC && self.version == PARAMETERS_VERSION
    }

    /// Snapshot for a preheater run
    pub fn preheater(&self) -> ProcessConfig {
        ProcessConfig::preheater(
            self.coefficients,
            self.sample_period_s,
            self.preheater.setpoint,
            self.preheater.duration_s,
        )
    }

    /// Snapshot for a reballing run with the selected pattern
    pub fn reballing(&self) -> ProcessConfig {
        ProcessConfig::reballing(
            self.coefficients,
            self.sample_period_s,
            *self.selected(),
        )
    }

    /// Snapshot for an auto-tuning run
    pub fn tuning(&self) -> TuningConfig {
        TuningConfig {
            setpoint: self.tuning.setpoint,
            duration_s: self.tuning.duration_s,
            sample_period_s: self.sample_period_s,
            channels: Channels::Dual,
        }
    }

    /// Selected pattern; an out-of-range index falls back to the first one
    pub fn selected(&self) -> &Pattern {
        self.patterns
            .get(self.selected_pattern as usize)
            .unwrap_or(&self.patterns[0])
    }

    /// Select a pattern. Returns false if the index is out of range.
    pub fn select_pattern(&mut self, index: u8) -> bool {
        if (index as usize) < MAX_PATTERNS {
            self.selected_pattern = index;
            true
        } else {
            false
        }
    }

    /// Number of legs in a pattern (up to its first zero-rate leg)
    pub fn pattern_len(&self, index: usize) -> usize {
        self.patterns
            .get(index)
            .map(|p| p.iter().take_while(|s| !s.is_terminator()).count())
            .unwrap_or(0)
    }

    /// Overwrite one leg of a pattern. Returns false if out of range.
    pub fn set_segment(&mut self, pattern: usize, leg: usize, segment: Segment) -> bool {
        if leg >= MAX_SEGMENTS {
            return false;
        }
        match self.patterns.get_mut(pattern) {
            Some(p) => {
                p[leg] = segment;
                true
            }
            None => false,
        }
    }

    /// Store the gains produced by an auto-tuning run
    pub fn apply_tuning(&mut self, result: &TuningResult) {
        self.coefficients = result.coefficients;
    }
}

/// Parameter persistence errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Serialization failed (buffer too small)
    Serialize,
    /// Deserialization failed
    Deserialize,
    /// Header magic or version does not match
    VersionMismatch,
}

#[cfg(feature = "serde")]
impl StationParameters {
    /// Serialize into `buf`, returning the used part
    pub fn to_slice<'a>(&self, buf: &'a mut [u8]) -> Result<&'a mut [u8], ConfigError> {
        postcard::to_slice(self, buf).map_err(|_| ConfigError::Serialize)
    }

    /// Deserialize and check the header
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let params: Self = postcard::from_bytes(bytes).map_err(|_| ConfigError::Deserialize)?;
        if !params.is_valid() {
            return Err(ConfigError::VersionMismatch);
        }
        Ok(params)
    }
}

/// Where parameters are kept between power cycles
///
/// Implemented by the board on top of its flash or EEPROM. Loading and
/// saving happen from the menu only, never while a run is active.
pub trait ParameterStore {
    /// Storage error type
    type Error;

    /// Load the stored parameters
    fn load(&mut self) -> Result<StationParameters, Self::Error>;

    /// Store the parameters
    fn save(&mut self, params: &StationParameters) -> Result<(), Self::Error>;

    /// Load, or fall back to defaults when nothing valid is stored
    fn load_or_default(&mut self) -> StationParameters {
        match self.load() {
            Ok(params) if params.is_valid() => params,
            _ => {
                #[cfg(feature = "defmt")]
                defmt::warn!("No valid parameters stored, using defaults");
                StationParameters::default()
            }
        }
    }
}
