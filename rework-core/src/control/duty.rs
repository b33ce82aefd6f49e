//! Time-proportioning duty mapping
//!
//! The heaters are on/off devices, so the PID output is turned into the
//! share of a fixed sample window during which the relay is held on. The
//! output is normalized by `Kp * reference_span` (a full-scale excursion in
//! the same units) and pushed through an exponential with base 0.05, which
//! maps a full span to 95% on-time and saturates smoothly at both ends
//! instead of clipping. That softness compensates for the heater's thermal
//! lag.
//!
//! The window edge is only checked when the tick driver calls in, so its
//! resolution is one tick.

use crate::error::ControlError;
use crate::time::{is_before, ticks_add};

/// Base of the exponential mapping (95% on-time at one full span)
pub const DUTY_BASE: f32 = 0.05;

/// Map a PID output to an on-fraction in `[0, 1]`.
///
/// `reference_span` is the start temperature minus the target limit, so it
/// is negative while heating up and the fraction grows with the output.
/// Starting above the target flips the sign and inverts the mapping; the
/// process controller can hold its outputs off in that case instead.
pub fn duty_fraction(
    control_output: f32,
    kp: f32,
    reference_span: f32,
) -> Result<f32, ControlError> {
    let scale = kp * reference_span;
    if scale == 0.0 || !scale.is_finite() {
        return Err(ControlError::DegenerateDutyMapping);
    }

    let fraction = 1.0 - libm::powf(DUTY_BASE, -control_output / scale);
    Ok(clamp_unit(fraction))
}

/// On-time in milliseconds for a fraction of a sample period
pub fn on_duration_ms(fraction: f32, sample_period_ms: u32) -> u32 {
    let fraction = clamp_unit(fraction);
    let on_ms = libm::roundf(fraction * sample_period_ms as f32) as u32;
    on_ms.min(sample_period_ms)
}

fn clamp_unit(fraction: f32) -> f32 {
    if fraction.is_nan() {
        0.0
    } else {
        fraction.clamp(0.0, 1.0)
    }
}

/// The current slow-PWM cycle
///
/// The output is on in `[window_start_ms, stop_at_ms)` and off afterwards
/// until the next window is armed.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DutyWindow {
    /// Tick at which the window was armed
    pub window_start_ms: u32,
    /// Tick at which the output drops
    pub stop_at_ms: u32,
    /// On-fraction this window was armed with
    pub fraction: f32,
}

impl DutyWindow {
    /// A window that is already closed at `now_ms`
    pub const fn closed(now_ms: u32) -> Self {
        Self {
            window_start_ms: now_ms,
            stop_at_ms: now_ms,
            fraction: 0.0,
        }
    }

    /// Arm a window at `now_ms` with the given on-fraction
    pub fn arm(now_ms: u32, fraction: f32, sample_period_ms: u32) -> Self {
        let on_ms = on_duration_ms(fraction, sample_period_ms);
        Self {
            window_start_ms: now_ms,
            stop_at_ms: ticks_add(now_ms, on_ms),
            fraction: clamp_unit(fraction),
        }
    }

    /// Whether the output should be on at `now_ms`
    pub fn is_on(&self, now_ms: u32) -> bool {
        is_before(now_ms, self.stop_at_ms)
    }

    /// Length of the on part in milliseconds
    pub fn on_duration_ms(&self) -> u32 {
        self.stop_at_ms.wrapping_sub(self.window_start_ms)
    }

    /// Drop the rest of the on time, effective immediately
    pub fn cancel(&mut self, now_ms: u32) {
        *self = Self::closed(now_ms);
    }
}
