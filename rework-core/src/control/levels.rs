//! Ramp/soak setpoint scheduler
//!
//! A profile is an ordered list of legs. Each leg ramps the setpoint from
//! the previous leg's limit (or the process value at start) towards its own
//! limit at a fixed rate, then holds the limit for a dwell time. The
//! scheduler precomputes where every leg ends on the run clock and then
//! walks the legs forward as time passes.

use core::fmt;

use heapless::Vec;

use crate::error::ControlError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Maximum legs per profile
pub const MAX_SEGMENTS: usize = 5;

/// One ramp-then-soak leg
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Segment {
    /// Ramp rate (°C/s). Zero ends the profile.
    pub rate: f32,
    /// Temperature the ramp heads for and then holds (°C)
    pub limit: f32,
    /// Hold time at the limit (seconds)
    pub dwell_s: f32,
}

impl Segment {
    /// Create a leg
    pub const fn new(rate: f32, limit: f32, dwell_s: f32) -> Self {
        Self {
            rate,
            limit,
            dwell_s,
        }
    }

    /// Zero-rate legs terminate a profile
    pub fn is_terminator(&self) -> bool {
        self.rate == 0.0
    }
}

/// Where in the profile the setpoint currently is
///
/// Leg numbers are 1-based, the way they are shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Stage {
    /// Ramping towards the limit of leg `n`
    Ramp(u8),
    /// Holding the limit of leg `n`
    Soak(u8),
}

impl Stage {
    /// 1-based leg number
    pub fn leg(&self) -> u8 {
        match self {
            Stage::Ramp(n) | Stage::Soak(n) => *n,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Ramp(n) => write!(f, "r{}", n),
            Stage::Soak(n) => write!(f, "L{}", n),
        }
    }
}

/// Profile scheduler
///
/// The cursor only moves forward, at most one leg per `value_at` call, so
/// it must be polled at least once per leg. Past the end of the last leg
/// the final limit is held; stopping the run is the caller's job.
#[derive(Debug, Clone)]
pub struct Levels {
    segments: Vec<Segment, MAX_SEGMENTS>,
    /// Setpoint each leg starts ramping from
    start: Vec<f32, MAX_SEGMENTS>,
    /// Run time (s) at which each leg ends, strictly increasing
    length: Vec<f32, MAX_SEGMENTS>,
    active: usize,
}

impl Levels {
    /// Build the schedule starting at `initial_process_value`.
    ///
    /// Legs from the first zero-rate one onwards are ignored.
    pub fn new(initial_process_value: f32, segments: &[Segment]) -> Result<Self, ControlError> {
        let mut legs: Vec<Segment, MAX_SEGMENTS> = Vec::new();
        for segment in segments.iter().take_while(|s| !s.is_terminator()) {
            legs.push(*segment)
                .map_err(|_| ControlError::InvalidProfile)?;
        }

        if legs.is_empty() || !initial_process_value.is_finite() {
            return Err(ControlError::InvalidProfile);
        }

        let mut start = Vec::new();
        let mut length = Vec::new();
        let mut from = initial_process_value;
        let mut elapsed = 0.0f32;

        for leg in &legs {
            if !leg.rate.is_finite() || !leg.limit.is_finite() || !leg.dwell_s.is_finite() {
                return Err(ControlError::InvalidProfile);
            }
            if leg.dwell_s < 0.0 {
                return Err(ControlError::InvalidProfile);
            }

            // A ramp pointing away from its limit would never get there
            let ramp_s = (leg.limit - from) / leg.rate;
            if ramp_s < 0.0 || ramp_s + leg.dwell_s <= 0.0 {
                return Err(ControlError::InvalidProfile);
            }

            let end = elapsed + ramp_s + leg.dwell_s;
            start.push(from).map_err(|_| ControlError::InvalidProfile)?;
            length.push(end).map_err(|_| ControlError::InvalidProfile)?;

            from = leg.limit;
            elapsed = end;
        }

        Ok(Self {
            segments: legs,
            start,
            length,
            active: 0,
        })
    }

    /// Setpoint and stage at `elapsed_s` seconds into the run.
    pub fn value_at(&mut self, elapsed_s: f32) -> (f32, Stage) {
        if elapsed_s > self.length[self.active] && self.active + 1 < self.segments.len() {
            self.active += 1;
        }

        let i = self.active;
        let leg = &self.segments[i];
        let leg_begins = if i == 0 { 0.0 } else { self.length[i - 1] };
        let n = (i + 1) as u8;

        if elapsed_s <= self.length[i] - leg.dwell_s {
            (self.start[i] + leg.rate * (elapsed_s - leg_begins), Stage::Ramp(n))
        } else {
            (leg.limit, Stage::Soak(n))
        }
    }

    /// Total run time in seconds (end of the last leg)
    pub fn total_duration(&self) -> f32 {
        self.length[self.length.len() - 1]
    }

    /// Limit of the active leg
    pub fn current_limit(&self) -> f32 {
        self.segments[self.active].limit
    }

    /// Setpoint the active leg ramps from
    pub fn current_segment_start(&self) -> f32 {
        self.start[self.active]
    }

    /// Index (0-based) of the active leg
    pub fn active_index(&self) -> usize {
        self.active
    }

    /// Number of legs in use
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false: a schedule has at least one leg
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Legs in use
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Start setpoint of every leg
    pub fn starts(&self) -> &[f32] {
        &self.start
    }

    /// Cumulative end time of every leg
    pub fn lengths(&self) -> &[f32] {
        &self.length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_single_leg() {
        let mut levels = Levels::new(50.0, &[Segment::new(10.0, 100.0, 5.0)]).unwrap();
        assert!(approx(levels.lengths()[0], 10.0));
        assert!(approx(levels.total_duration(), 10.0));

        let (sp, stage) = levels.value_at(3.0);
        assert!(approx(sp, 80.0));
        assert_eq!(stage, Stage::Ramp(1));

        let (sp, stage) = levels.value_at(9.0);
        assert!(approx(sp, 100.0));
        assert_eq!(stage, Stage::Soak(1));

        // Past the end the final limit is held
        let (sp, stage) = levels.value_at(20.0);
        assert!(approx(sp, 100.0));
        assert_eq!(stage, Stage::Soak(1));
    }

    #[test]
    fn test_two_legs() {
        let segments = [Segment::new(5.0, 60.0, 2.0), Segment::new(10.0, 100.0, 3.0)];
        let mut levels = Levels::new(50.0, &segments).unwrap();
        assert!(approx(levels.lengths()[0], 4.0));
        assert!(approx(levels.lengths()[1], 11.0));
        assert_eq!(levels.starts(), &[50.0, 60.0]);

        let (sp, stage) = levels.value_at(1.0);
        assert!(approx(sp, 55.0));
        assert_eq!(stage, Stage::Ramp(1));

        let (sp, stage) = levels.value_at(3.0);
        assert!(approx(sp, 60.0));
        assert_eq!(stage, Stage::Soak(1));

        // Leg 2 ramps from 60 starting at t = 4
        let (sp, stage) = levels.value_at(4.5);
        assert_eq!(levels.active_index(), 1);
        assert!(approx(sp, 65.0));
        assert_eq!(stage, Stage::Ramp(2));
        assert!(approx(levels.current_segment_start(), 60.0));
        assert!(approx(levels.current_limit(), 100.0));

        let (sp, stage) = levels.value_at(9.0);
        assert!(approx(sp, 100.0));
        assert_eq!(stage, Stage::Soak(2));
    }

    #[test]
    fn test_advances_one_leg_per_call() {
        let segments = [
            Segment::new(10.0, 60.0, 0.0),
            Segment::new(10.0, 70.0, 0.0),
            Segment::new(10.0, 80.0, 0.0),
        ];
        let mut levels = Levels::new(50.0, &segments).unwrap();

        levels.value_at(100.0);
        assert_eq!(levels.active_index(), 1);
        levels.value_at(100.0);
        assert_eq!(levels.active_index(), 2);
        levels.value_at(100.0);
        assert_eq!(levels.active_index(), 2);
    }

    #[test]
    fn test_never_moves_backwards() {
        let segments = [Segment::new(5.0, 60.0, 2.0), Segment::new(10.0, 100.0, 3.0)];
        let mut levels = Levels::new(50.0, &segments).unwrap();
        levels.value_at(5.0);
        assert_eq!(levels.active_index(), 1);
        levels.value_at(1.0);
        assert_eq!(levels.active_index(), 1);
    }

    #[test]
    fn test_zero_rate_terminates() {
        let segments = [
            Segment::new(5.0, 60.0, 2.0),
            Segment::new(0.0, 0.0, 0.0),
            Segment::new(10.0, 100.0, 3.0),
        ];
        let levels = Levels::new(50.0, &segments).unwrap();
        assert_eq!(levels.len(), 1);
        assert!(approx(levels.total_duration(), 4.0));
    }

    #[test]
    fn test_cooling_leg() {
        let segments = [Segment::new(2.0, 150.0, 10.0), Segment::new(-1.0, 120.0, 0.0)];
        let mut levels = Levels::new(100.0, &segments).unwrap();
        // 25 s up, 10 s hold, 30 s down
        assert!(approx(levels.total_duration(), 65.0));
        levels.value_at(36.0);
        let (sp, stage) = levels.value_at(45.0);
        assert!(approx(sp, 140.0));
        assert_eq!(stage, Stage::Ramp(2));
    }

    #[test]
    fn test_invalid_profiles() {
        assert_eq!(
            Levels::new(50.0, &[]).unwrap_err(),
            ControlError::InvalidProfile
        );
        assert_eq!(
            Levels::new(50.0, &[Segment::new(0.0, 100.0, 5.0)]).unwrap_err(),
            ControlError::InvalidProfile
        );
        // Ramp heading away from its limit
        assert_eq!(
            Levels::new(50.0, &[Segment::new(-1.0, 100.0, 5.0)]).unwrap_err(),
            ControlError::InvalidProfile
        );
        // Zero-length leg
        assert_eq!(
            Levels::new(50.0, &[Segment::new(1.0, 50.0, 0.0)]).unwrap_err(),
            ControlError::InvalidProfile
        );
        let six = [Segment::new(1.0, 100.0, 1.0); 6];
        assert_eq!(
            Levels::new(50.0, &six).unwrap_err(),
            ControlError::InvalidProfile
        );
    }

    #[test]
    fn test_stage_labels() {
        use core::fmt::Write;

        let mut label: heapless::String<4> = heapless::String::new();
        write!(label, "{}", Stage::Ramp(1)).unwrap();
        assert_eq!(label.as_str(), "r1");

        label.clear();
        write!(label, "{}", Stage::Soak(3)).unwrap();
        assert_eq!(label.as_str(), "L3");
    }
}
