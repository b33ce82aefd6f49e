//! Relay auto-tuner
//!
//! Two-phase identification run that produces a new PID coefficient set:
//!
//! 1. **Warm-up**: heaters fully on until the process value first reaches
//!    the setpoint. Every tick's `(elapsed, PV)` feeds a linear regression
//!    whose slope is the plant's heating rate.
//! 2. **Relay**: bang-bang around the setpoint, decided once per sample
//!    period. Every tick feeds an extreme tracker, a zero-crossing counter
//!    and the integral of `PV - SV`.
//!
//! When the configured duration has passed:
//!
//! ```text
//! Kp = round(PVmax - PVmin, 1)
//! Ki = round(0.025 * Σ(PV - SV) * (d - t_cross) / (n * (SV - PV0)), 3)
//! Kd = round(0.05 * slope, 3)
//! ```

use crate::config::TuningConfig;
use crate::control::{DutyWindow, ExtremeTracker, LinearRegression, PidCoefficients};
use crate::diag::TuningRecord;
use crate::error::ControlError;
use crate::time::{elapsed_ms, ticks_diff};
use crate::traits::{HeaterOutput, SensorError};

use super::bank::HeaterBank;

/// Auto-tuner state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TunerState {
    /// Not running
    Idle,
    /// Full power until the setpoint is first reached
    WarmUp,
    /// Bang-bang around the setpoint, collecting statistics
    Relay,
    /// Finished, result available
    Done,
    /// Finished without a usable result
    Failed(ControlError),
    /// Stopped by the user
    Stopped,
}

/// Outcome of a successful tuning run
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TuningResult {
    /// New PID coefficients
    pub coefficients: PidCoefficients,
    /// Warm-up heating rate (°C/s)
    pub warmup_slope: f32,
    /// Setpoint crossings seen during the relay phase
    pub zero_crossings: u32,
    /// Ticks sampled during the relay phase
    pub relay_samples: u32,
}

/// Result of one tuner tick
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TunerReport {
    /// State after the tick
    pub state: TunerState,
    /// Heater command asserted by this tick
    pub heater_on: bool,
    /// Run time (seconds)
    pub elapsed_s: f32,
    /// Present when a relay decision was taken on this tick
    pub record: Option<TuningRecord>,
    /// Present on the tick the run completes
    pub result: Option<TuningResult>,
}

/// Round half away from zero to `decimals` places
fn round_to(value: f64, decimals: i32) -> f32 {
    let scale = libm::pow(10.0, decimals as f64);
    (libm::round(value * scale) / scale) as f32
}

/// Relay-feedback auto-tuner
pub struct RelayAutoTuner<H> {
    heaters: HeaterBank<H>,
    state: TunerState,
    setpoint: f32,
    duration_ms: u32,
    duration_s: f32,
    sample_period_ms: u32,
    started_at_ms: u32,
    last_decision_ms: u32,
    first_process_value: f32,
    last_process_value: f32,
    first_cross_ms: Option<u32>,
    window: DutyWindow,
    warmup: LinearRegression,
    extremes: ExtremeTracker,
    integral_error: f64,
    zero_crossings: u32,
    result: Option<TuningResult>,
}

impl<H: HeaterOutput> RelayAutoTuner<H> {
    /// Create an idle tuner owning `heaters`
    pub fn new(heaters: HeaterBank<H>) -> Self {
        Self {
            heaters,
            state: TunerState::Idle,
            setpoint: 0.0,
            duration_ms: 0,
            duration_s: 0.0,
            sample_period_ms: 0,
            started_at_ms: 0,
            last_decision_ms: 0,
            first_process_value: 0.0,
            last_process_value: 0.0,
            first_cross_ms: None,
            window: DutyWindow::closed(0),
            warmup: LinearRegression::new(),
            extremes: ExtremeTracker::new(),
            integral_error: 0.0,
            zero_crossings: 0,
            result: None,
        }
    }

    /// Begin a tuning run at `now_ms` from `initial_process_value`.
    ///
    /// The process must start below the setpoint. On error the outputs
    /// are driven off and the state is left as it was.
    pub fn start(
        &mut self,
        config: &TuningConfig,
        initial_process_value: f32,
        now_ms: u32,
    ) -> Result<(), ControlError> {
        if let Err(err) = self.check(config, initial_process_value) {
            self.heaters.all_off();
            #[cfg(feature = "defmt")]
            defmt::warn!("Tuning start rejected: {}", err);
            return Err(err);
        }

        self.setpoint = config.setpoint;
        self.duration_ms = config.duration_ms();
        self.duration_s = config.duration_s;
        self.sample_period_ms = config.sample_period_ms();
        self.started_at_ms = now_ms;
        self.last_decision_ms = now_ms;
        self.first_process_value = initial_process_value;
        self.last_process_value = initial_process_value;
        self.first_cross_ms = None;
        self.window = DutyWindow::closed(now_ms);
        self.warmup.reset();
        self.extremes.reset();
        self.integral_error = 0.0;
        self.zero_crossings = 0;
        self.result = None;
        self.state = TunerState::WarmUp;
        self.heaters.set_on(true);

        #[cfg(feature = "defmt")]
        defmt::info!(
            "Tuning started: {} C from {} C for {} s",
            config.setpoint,
            initial_process_value,
            config.duration_s
        );

        Ok(())
    }

    fn check(&self, config: &TuningConfig, initial_process_value: f32) -> Result<(), ControlError> {
        config.validate()?;
        if config.channels != self.heaters.channels() {
            return Err(ControlError::ChannelMismatch);
        }
        if !initial_process_value.is_finite() {
            return Err(ControlError::SensorFault(SensorError::ConversionError));
        }
        if !(initial_process_value < config.setpoint) {
            return Err(ControlError::SetpointReached);
        }
        Ok(())
    }

    /// Advance the run to `now_ms` with this tick's sensor reading.
    ///
    /// A faulty reading drives the outputs off and is returned; it is not
    /// sampled. When the run ends without a usable result the tuner moves
    /// to [`TunerState::Failed`] and the cause is returned.
    pub fn tick(
        &mut self,
        now_ms: u32,
        reading: Result<f32, SensorError>,
    ) -> Result<TunerReport, ControlError> {
        if !matches!(self.state, TunerState::WarmUp | TunerState::Relay) {
            return Err(ControlError::NotRunning);
        }

        let process_value = match reading {
            Ok(value) if value.is_finite() => value,
            Ok(_) => return Err(self.fault(now_ms, SensorError::ConversionError)),
            Err(err) => return Err(self.fault(now_ms, err)),
        };

        let elapsed = elapsed_ms(now_ms, self.started_at_ms);
        let elapsed_s = elapsed as f32 / 1000.0;
        let mut record = None;
        let mut decision_due =
            ticks_diff(now_ms, self.last_decision_ms) > self.sample_period_ms as i32;

        if self.state == TunerState::WarmUp {
            if process_value < self.setpoint {
                self.warmup.sample(elapsed_s, process_value);
                self.heaters.set_on(true);
                if decision_due {
                    self.last_decision_ms = now_ms;
                    record = Some(self.record(elapsed_s, process_value, 1.0));
                }
            } else {
                self.enter_relay(elapsed);
                // The crossing tick takes the first relay decision
                decision_due = true;
            }
        }

        let mut heater_on = true;
        if self.state == TunerState::Relay {
            if decision_due {
                let fraction = if process_value < self.setpoint { 1.0 } else { 0.0 };
                self.window = DutyWindow::arm(now_ms, fraction, self.sample_period_ms);
                self.last_decision_ms = now_ms;
                record = Some(self.record(elapsed_s, process_value, fraction));
            }

            self.extremes.sample(process_value, elapsed_s);
            let before = self.setpoint - self.last_process_value;
            let after = self.setpoint - process_value;
            if before * after < 0.0 {
                self.zero_crossings = self.zero_crossings.saturating_add(1);
            }
            self.integral_error += (process_value - self.setpoint) as f64;

            heater_on = self.window.is_on(now_ms);
            self.heaters.set_on(heater_on);
        }
        self.last_process_value = process_value;

        let mut result = None;
        if elapsed > self.duration_ms {
            result = Some(self.finish(now_ms)?);
            heater_on = false;
        }

        Ok(TunerReport {
            state: self.state,
            heater_on,
            elapsed_s,
            record,
            result,
        })
    }

    fn enter_relay(&mut self, elapsed_ms: u32) {
        self.first_cross_ms = Some(elapsed_ms);
        self.extremes.reset();
        self.integral_error = 0.0;
        self.zero_crossings = 0;
        self.state = TunerState::Relay;
        #[cfg(feature = "defmt")]
        defmt::info!(
            "Tuning: setpoint reached after {} ms, relay phase",
            elapsed_ms
        );
    }

    fn record(&self, elapsed_s: f32, process_value: f32, fraction: f32) -> TuningRecord {
        TuningRecord {
            elapsed_s,
            process_value,
            setpoint: self.setpoint,
            fraction,
        }
    }

    fn fault(&mut self, now_ms: u32, err: SensorError) -> ControlError {
        self.window.cancel(now_ms);
        self.heaters.all_off();
        #[cfg(feature = "defmt")]
        defmt::warn!("Tuning: heaters forced off, sensor {}", err);
        ControlError::SensorFault(err)
    }

    /// End the run, drive outputs off and compute the coefficients
    fn finish(&mut self, now_ms: u32) -> Result<TuningResult, ControlError> {
        self.window.cancel(now_ms);
        self.heaters.all_off();

        match self.compute() {
            Ok(result) => {
                self.result = Some(result);
                self.state = TunerState::Done;
                #[cfg(feature = "defmt")]
                defmt::info!(
                    "Tuning done: {}, {} crossings",
                    result.coefficients,
                    result.zero_crossings
                );
                Ok(result)
            }
            Err(err) => {
                self.state = TunerState::Failed(err);
                #[cfg(feature = "defmt")]
                defmt::warn!("Tuning failed: {}", err);
                Err(err)
            }
        }
    }

    fn compute(&self) -> Result<TuningResult, ControlError> {
        let first_cross_ms = self.first_cross_ms.ok_or(ControlError::TuningIncomplete)?;
        let samples = self.extremes.sample_count();
        if samples == 0 {
            return Err(ControlError::TuningIncomplete);
        }
        let (slope, _intercept) = self.warmup.fit()?;

        let relay_s = self.duration_s as f64 - first_cross_ms as f64 / 1000.0;
        let rise = (self.setpoint - self.first_process_value) as f64;
        let ki = 0.025 * self.integral_error * relay_s / (samples as f64 * rise);

        Ok(TuningResult {
            coefficients: PidCoefficients::new(
                round_to(self.extremes.x_span() as f64, 1),
                round_to(ki, 3),
                round_to(0.05 * slope as f64, 3),
            ),
            warmup_slope: slope,
            zero_crossings: self.zero_crossings,
            relay_samples: samples,
        })
    }

    /// Abort the run and drive every output off.
    ///
    /// Does nothing when the tuner is not running.
    pub fn stop(&mut self) {
        if matches!(self.state, TunerState::WarmUp | TunerState::Relay) {
            self.window = DutyWindow::closed(self.window.window_start_ms);
            self.heaters.all_off();
            self.state = TunerState::Stopped;
            #[cfg(feature = "defmt")]
            defmt::info!("Tuning stopped");
        }
    }

    /// Seconds left in the run, zero when not running
    pub fn remaining_s(&self, now_ms: u32) -> f32 {
        if matches!(self.state, TunerState::WarmUp | TunerState::Relay) {
            let elapsed_s = elapsed_ms(now_ms, self.started_at_ms) as f32 / 1000.0;
            (self.duration_s - elapsed_s).max(0.0)
        } else {
            0.0
        }
    }

    /// Current state
    pub fn state(&self) -> TunerState {
        self.state
    }

    /// Result of the last completed run
    pub fn result(&self) -> Option<&TuningResult> {
        self.result.as_ref()
    }

    /// Setpoint crossings counted so far in the relay phase
    pub fn zero_crossings(&self) -> u32 {
        self.zero_crossings
    }

    /// Run time (ms) at which the setpoint was first reached
    pub fn first_cross_ms(&self) -> Option<u32> {
        self.first_cross_ms
    }

    /// Heater bank driven by this tuner
    pub fn heaters(&self) -> &HeaterBank<H> {
        &self.heaters
    }

    /// Stop the run and hand the heater bank back
    pub fn release(mut self) -> HeaterBank<H> {
        self.stop();
        self.heaters
    }
}
