//! Millisecond tick arithmetic
//!
//! Timestamps come from a free-running `u32` millisecond counter which
//! wraps after about 49.7 days. All differences go through two's-complement
//! subtraction so a rollover in the middle of a run is harmless, as long as
//! the two instants being compared are less than ~24.8 days apart.

/// Signed difference `later - earlier` in milliseconds, rollover safe.
///
/// Positive when `later` is after `earlier`.
#[inline]
pub const fn ticks_diff(later: u32, earlier: u32) -> i32 {
    later.wrapping_sub(earlier) as i32
}

/// Add a millisecond offset to a timestamp, wrapping on overflow.
#[inline]
pub const fn ticks_add(ticks: u32, delta_ms: u32) -> u32 {
    ticks.wrapping_add(delta_ms)
}

/// Milliseconds elapsed from `since` to `now`.
///
/// A `now` that lies before `since` yields 0 rather than a huge value.
#[inline]
pub fn elapsed_ms(now: u32, since: u32) -> u32 {
    ticks_diff(now, since).max(0) as u32
}

/// Seconds elapsed from `since` to `now`.
#[inline]
pub fn elapsed_s(now: u32, since: u32) -> f32 {
    elapsed_ms(now, since) as f32 / 1000.0
}

/// Whether `deadline` is still in the future at `now`.
#[inline]
pub const fn is_before(now: u32, deadline: u32) -> bool {
    ticks_diff(deadline, now) > 0
}

/// Convert a period in seconds to whole milliseconds (rounded).
#[inline]
pub fn seconds_to_ms(seconds: f32) -> u32 {
    if seconds <= 0.0 {
        0
    } else {
        libm::roundf(seconds * 1000.0) as u32
    }
}
