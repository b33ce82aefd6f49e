//! PID controller
//!
//! Positional PID over floating-point temperatures. The derivative acts on
//! the error rather than on the measurement, so it reacts to a moving
//! setpoint (a ramp) as well as to the process value. The integral is not
//! clamped unless a limit is configured explicitly.

use crate::error::ControlError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// PID coefficients
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PidCoefficients {
    /// Proportional gain (Kp)
    pub kp: f32,
    /// Integral gain (Ki), per second
    pub ki: f32,
    /// Derivative gain (Kd), seconds
    pub kd: f32,
}

impl PidCoefficients {
    /// Create a coefficient triple
    pub const fn new(kp: f32, ki: f32, kd: f32) -> Self {
        Self { kp, ki, kd }
    }

    /// Check if any coefficient is non-zero
    pub fn is_configured(&self) -> bool {
        self.kp != 0.0 || self.ki != 0.0 || self.kd != 0.0
    }
}

/// Memory carried from one step to the next
#[derive(Debug, Clone, Copy, Default)]
struct PidState {
    /// Error of the previous step (setpoint - process)
    last_error: f32,
    /// Integral term of the previous step
    last_integral: f32,
}

/// PID controller
///
/// `step` is only meaningful after `start`, which seeds the derivative with
/// a zero error so the first step does not kick.
#[derive(Debug, Clone)]
pub struct PidController {
    coefficients: PidCoefficients,
    state: PidState,
    /// Optional symmetric clamp on the integral term
    integral_limit: Option<f32>,
}

impl PidController {
    /// Create a new PID controller
    pub fn new(coefficients: PidCoefficients) -> Self {
        Self {
            coefficients,
            state: PidState::default(),
            integral_limit: None,
        }
    }

    /// Builder: clamp the integral term to `±limit`.
    ///
    /// Off by default. Turning it on changes the numeric behavior and
    /// therefore the outcome of existing tunings.
    pub fn with_integral_limit(mut self, limit: f32) -> Self {
        self.integral_limit = Some(libm::fabsf(limit));
        self
    }

    /// Reset memory for a new run starting at `initial_process_value`.
    ///
    /// The error is tracked as `setpoint - process`; seeding it with zero is
    /// the same as assuming the setpoint starts at the process value.
    pub fn start(&mut self, _initial_process_value: f32) {
        self.state = PidState::default();
    }

    /// Replace the gains without touching integral or derivative memory
    pub fn set_coefficients(&mut self, coefficients: PidCoefficients) {
        self.coefficients = coefficients;
    }

    /// Get current PID coefficients
    pub fn coefficients(&self) -> &PidCoefficients {
        &self.coefficients
    }

    /// Accumulated integral term
    pub fn integral(&self) -> f32 {
        self.state.last_integral
    }

    /// Compute the control output for one step of `dt_s` seconds.
    pub fn step(&mut self, process: f32, setpoint: f32, dt_s: f32) -> Result<f32, ControlError> {
        if dt_s <= 0.0 || !dt_s.is_finite() {
            return Err(ControlError::InvalidTimestep);
        }

        let coeffs = &self.coefficients;
        let error = setpoint - process;

        let p_term = coeffs.kp * error;

        let mut integral = self.state.last_integral + coeffs.ki * error * dt_s;
        if let Some(limit) = self.integral_limit {
            integral = integral.clamp(-limit, limit);
        }

        let d_term = coeffs.kd * (error - self.state.last_error) / dt_s;

        self.state.last_integral = integral;
        self.state.last_error = error;

        Ok(p_term + integral + d_term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() <= 1e-4 * (1.0 + b.abs())
    }

    #[test]
    fn test_fixed_point_at_setpoint() {
        let mut pid = PidController::new(PidCoefficients::new(3.0, 0.5, 2.0));
        pid.start(150.0);

        for _ in 0..50 {
            let u = pid.step(150.0, 150.0, 0.5).unwrap();
            assert_eq!(u, 0.0);
        }
    }

    #[test]
    fn test_full_step() {
        let mut pid = PidController::new(PidCoefficients::new(2.0, 0.5, 1.0));
        pid.start(20.0);

        // e = 10: p = 20, i = 0.5 * 10 * 2 = 10, d = 1 * (10 - 0) / 2 = 5
        let u = pid.step(20.0, 30.0, 2.0).unwrap();
        assert!(approx(u, 35.0));

        // e = 8: p = 16, i = 10 + 0.5 * 8 * 2 = 18, d = (8 - 10) / 2 = -1
        let u = pid.step(22.0, 30.0, 2.0).unwrap();
        assert!(approx(u, 33.0));
        assert!(approx(pid.integral(), 18.0));
    }

    #[test]
    fn test_derivative_follows_setpoint_ramp() {
        let mut pid = PidController::new(PidCoefficients::new(0.0, 0.0, 1.0));
        pid.start(50.0);

        // Process is constant, only the setpoint moves
        let _ = pid.step(50.0, 50.0, 1.0).unwrap();
        let u = pid.step(50.0, 55.0, 1.0).unwrap();
        assert!(approx(u, 5.0));
    }

    #[test]
    fn test_zero_timestep_rejected() {
        let mut pid = PidController::new(PidCoefficients::new(1.0, 1.0, 1.0));
        pid.start(25.0);
        assert_eq!(pid.step(25.0, 30.0, 0.0), Err(ControlError::InvalidTimestep));
        assert_eq!(pid.step(25.0, 30.0, -1.0), Err(ControlError::InvalidTimestep));
        assert_eq!(
            pid.step(25.0, 30.0, f32::NAN),
            Err(ControlError::InvalidTimestep)
        );
        // Memory untouched by the rejected calls
        assert_eq!(pid.integral(), 0.0);
    }

    #[test]
    fn test_set_coefficients_keeps_memory() {
        let mut pid = PidController::new(PidCoefficients::new(1.0, 1.0, 0.0));
        pid.start(0.0);
        pid.step(0.0, 10.0, 1.0).unwrap();
        assert!(approx(pid.integral(), 10.0));

        pid.set_coefficients(PidCoefficients::new(2.0, 0.0, 0.0));
        assert!(approx(pid.integral(), 10.0));
        // p = 20, integral carried = 10
        let u = pid.step(0.0, 10.0, 1.0).unwrap();
        assert!(approx(u, 30.0));
    }

    #[test]
    fn test_start_resets_memory() {
        let mut pid = PidController::new(PidCoefficients::new(1.0, 1.0, 1.0));
        pid.start(0.0);
        pid.step(0.0, 10.0, 1.0).unwrap();
        pid.start(0.0);
        assert_eq!(pid.integral(), 0.0);
        assert_eq!(pid.step(0.0, 0.0, 1.0).unwrap(), 0.0);
    }

    #[test]
    fn test_integral_limit() {
        let mut pid =
            PidController::new(PidCoefficients::new(0.0, 1.0, 0.0)).with_integral_limit(15.0);
        pid.start(0.0);
        for _ in 0..10 {
            pid.step(0.0, 10.0, 1.0).unwrap();
        }
        assert_eq!(pid.integral(), 15.0);
    }

    proptest! {
        #[test]
        fn proportional_only_matches_kp_times_error(
            kp in 0.0f32..50.0,
            pv in -50.0f32..400.0,
            sp in -50.0f32..400.0,
            dt in 0.001f32..60.0,
        ) {
            let mut pid = PidController::new(PidCoefficients::new(kp, 0.0, 0.0));
            pid.start(pv);
            let u = pid.step(pv, sp, dt).unwrap();
            prop_assert!(approx(u, kp * (sp - pv)), "u={} expected={}", u, kp * (sp - pv));
        }
    }
}
