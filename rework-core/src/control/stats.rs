//! Running statistics used by the auto-tuner
//!
//! Both accumulators are plain running sums with no sample storage, so
//! they fit a multi-hour run at tick rate. Sums are kept in `f64`: a
//! least-squares denominator built from `f32` sums of squared seconds loses
//! all its digits after a few thousand samples.

use crate::error::ControlError;

/// Minimum and maximum of a stream of `(x, y)` samples
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExtremeTracker {
    sample_count: u32,
    x_min: f32,
    x_max: f32,
    y_min: f32,
    y_max: f32,
}

impl Default for ExtremeTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ExtremeTracker {
    /// Create an empty tracker
    pub const fn new() -> Self {
        Self {
            sample_count: 0,
            x_min: f32::INFINITY,
            x_max: f32::NEG_INFINITY,
            y_min: f32::INFINITY,
            y_max: f32::NEG_INFINITY,
        }
    }

    /// Record one sample
    pub fn sample(&mut self, x: f32, y: f32) {
        self.x_min = self.x_min.min(x);
        self.x_max = self.x_max.max(x);
        self.y_min = self.y_min.min(y);
        self.y_max = self.y_max.max(y);
        self.sample_count = self.sample_count.saturating_add(1);
    }

    /// Forget everything
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Samples recorded since the last reset
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Smallest `x` seen, `+inf` before the first sample
    pub fn x_min(&self) -> f32 {
        self.x_min
    }

    /// Largest `x` seen, `-inf` before the first sample
    pub fn x_max(&self) -> f32 {
        self.x_max
    }

    /// Smallest `y` seen
    pub fn y_min(&self) -> f32 {
        self.y_min
    }

    /// Largest `y` seen
    pub fn y_max(&self) -> f32 {
        self.y_max
    }

    /// `x_max - x_min`, or zero before the first sample
    pub fn x_span(&self) -> f32 {
        if self.sample_count == 0 {
            0.0
        } else {
            self.x_max - self.x_min
        }
    }
}

/// Ordinary least squares fit of `y = slope * x + intercept`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinearRegression {
    sample_count: u32,
    dot_sum: f64,
    x_sum: f64,
    x_squared_sum: f64,
    y_sum: f64,
}

impl LinearRegression {
    /// Create an empty accumulator
    pub const fn new() -> Self {
        Self {
            sample_count: 0,
            dot_sum: 0.0,
            x_sum: 0.0,
            x_squared_sum: 0.0,
            y_sum: 0.0,
        }
    }

    /// Record one sample
    pub fn sample(&mut self, x: f32, y: f32) {
        let (x, y) = (x as f64, y as f64);
        self.dot_sum += x * y;
        self.x_sum += x;
        self.y_sum += y;
        self.x_squared_sum += x * x;
        self.sample_count = self.sample_count.saturating_add(1);
    }

    /// Forget everything
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Samples accumulated so far
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Fit the samples, returning `(slope, intercept)`.
    ///
    /// Fails when fewer than two distinct `x` values were sampled.
    pub fn fit(&self) -> Result<(f32, f32), ControlError> {
        let n = self.sample_count as f64;
        let denominator = n * self.x_squared_sum - self.x_sum * self.x_sum;

        // Identical x values cancel up to rounding of the two products
        let tolerance = f64::EPSILON * 4.0 * n * self.x_squared_sum;
        if self.sample_count < 2 || !(libm::fabs(denominator) > tolerance) {
            return Err(ControlError::DegenerateRegression);
        }

        let slope = (n * self.dot_sum - self.x_sum * self.y_sum) / denominator;
        let intercept =
            (self.y_sum * self.x_squared_sum - self.x_sum * self.dot_sum) / denominator;

        Ok((slope as f32, intercept as f32))
    }
}
