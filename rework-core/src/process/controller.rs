//! Preheater and reballing process controller
//!
//! One controller serves both heating processes. What differs between them
//! (static setpoint or ramp/soak profile, one heater or two) comes in with
//! the [`ProcessConfig`] snapshot handed to `start`.
//!
//! Per tick the controller looks up the setpoint, re-runs the PID once per
//! sample period to arm a new duty window, and asserts the heaters for the
//! current position in that window.

use crate::config::{ProcessConfig, SetpointMode};
use crate::control::{
    duty_fraction, DutyWindow, Levels, PidCoefficients, PidController, Segment, Stage,
};
use crate::diag::ControlRecord;
use crate::error::ControlError;
use crate::time::{elapsed_ms, ticks_diff};
use crate::traits::{HeaterOutput, SensorError};

use super::bank::HeaterBank;

/// Process state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProcessState {
    /// Never started
    Idle,
    /// Controlling the heaters
    Running,
    /// Ran for the configured time, outputs off
    Completed,
    /// Stopped by the user, outputs off
    Stopped,
}

/// Setpoint source of the current run
#[derive(Debug, Clone)]
enum Schedule {
    Static { setpoint: f32, duration_s: f32 },
    Profile(Levels),
}

impl Schedule {
    fn value_at(&mut self, elapsed_s: f32) -> (f32, Option<Stage>) {
        match self {
            Schedule::Static { setpoint, .. } => (*setpoint, None),
            Schedule::Profile(levels) => {
                let (setpoint, stage) = levels.value_at(elapsed_s);
                (setpoint, Some(stage))
            }
        }
    }

    /// Expected full-scale excursion used to normalize the PID output
    fn reference_span(&self, first_process_value: f32) -> f32 {
        match self {
            Schedule::Static { setpoint, .. } => first_process_value - setpoint,
            Schedule::Profile(levels) => {
                levels.current_segment_start() - levels.current_limit()
            }
        }
    }

    fn total_duration_s(&self) -> f32 {
        match self {
            Schedule::Static { duration_s, .. } => *duration_s,
            Schedule::Profile(levels) => levels.total_duration(),
        }
    }
}

/// Result of one tick
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickReport {
    /// State after the tick
    pub state: ProcessState,
    /// Setpoint in effect (°C)
    pub setpoint: f32,
    /// Profile stage, for profiled runs
    pub stage: Option<Stage>,
    /// Heater command asserted by this tick
    pub heater_on: bool,
    /// Run time (seconds)
    pub elapsed_s: f32,
    /// Present when the PID ran on this tick
    pub record: Option<ControlRecord>,
}

/// Closed-loop controller for the preheater and reballing processes
pub struct ReflowProfileController<H> {
    heaters: HeaterBank<H>,
    pid: PidController,
    state: ProcessState,
    schedule: Option<Schedule>,
    sample_period_ms: u32,
    started_at_ms: u32,
    last_update_ms: u32,
    first_process_value: f32,
    window: DutyWindow,
    overshoot_guard: bool,
    initial_record: Option<ControlRecord>,
}

impl<H: HeaterOutput> ReflowProfileController<H> {
    /// Create an idle controller owning `heaters`
    pub fn new(heaters: HeaterBank<H>) -> Self {
        Self {
            heaters,
            pid: PidController::new(PidCoefficients::default()),
            state: ProcessState::Idle,
            schedule: None,
            sample_period_ms: 0,
            started_at_ms: 0,
            last_update_ms: 0,
            first_process_value: 0.0,
            window: DutyWindow::closed(0),
            overshoot_guard: false,
            initial_record: None,
        }
    }

    /// Builder: clamp the PID integral term to `±limit` (off by default)
    pub fn with_integral_limit(mut self, limit: f32) -> Self {
        self.pid = self.pid.with_integral_limit(limit);
        self
    }

    /// Builder: hold the outputs off while the reference span is positive.
    ///
    /// A positive span (the run started above its setpoint, or a profile
    /// leg cools) inverts the duty mapping, so a larger PID output would
    /// mean less heat. With the guard on, such windows are armed at zero.
    pub fn with_overshoot_guard(mut self) -> Self {
        self.overshoot_guard = true;
        self
    }

    /// Begin a run at `now_ms` from `initial_process_value`.
    ///
    /// The configuration is validated first; on error the outputs are
    /// driven off and the state is left as it was. Starting over a
    /// finished or stopped run is allowed.
    ///
    /// The first window is full power for one sample period. Starting
    /// above the setpoint is accepted, but the reference span is then
    /// positive and the duty mapping runs backwards: the further the
    /// process falls below the setpoint, the less the heaters are on.
    /// Use [`Self::with_overshoot_guard`] to hold the outputs off instead.
    pub fn start(
        &mut self,
        config: &ProcessConfig,
        initial_process_value: f32,
        now_ms: u32,
    ) -> Result<(), ControlError> {
        let schedule = match self.prepare(config, initial_process_value) {
            Ok(schedule) => schedule,
            Err(err) => {
                self.heaters.all_off();
                #[cfg(feature = "defmt")]
                defmt::warn!("Process start rejected: {}", err);
                return Err(err);
            }
        };

        self.pid.set_coefficients(config.coefficients);
        self.pid.start(initial_process_value);
        self.schedule = Some(schedule);
        self.sample_period_ms = config.sample_period_ms();
        self.started_at_ms = now_ms;
        self.last_update_ms = now_ms;
        self.first_process_value = initial_process_value;
        // Full power for the first window; the PID takes over after one period
        let fraction = if self.holds_off(initial_process_value) {
            0.0
        } else {
            1.0
        };
        self.window = DutyWindow::arm(now_ms, fraction, self.sample_period_ms);
        self.initial_record = Some(ControlRecord {
            elapsed_s: 0.0,
            process_value: initial_process_value,
            setpoint: initial_process_value,
            fraction,
            control_output: 0.0,
        });
        self.state = ProcessState::Running;

        #[cfg(feature = "defmt")]
        defmt::info!(
            "Process started: {} from {} C, period {} ms, {}",
            config.setpoint,
            initial_process_value,
            self.sample_period_ms,
            config.coefficients
        );

        Ok(())
    }

    fn holds_off(&self, first_process_value: f32) -> bool {
        self.overshoot_guard
            && self
                .schedule
                .as_ref()
                .map_or(false, |schedule| schedule.reference_span(first_process_value) > 0.0)
    }

    fn prepare(
        &self,
        config: &ProcessConfig,
        initial_process_value: f32,
    ) -> Result<Schedule, ControlError> {
        config.validate()?;
        if config.channels != self.heaters.channels() {
            return Err(ControlError::ChannelMismatch);
        }
        if !initial_process_value.is_finite() {
            return Err(ControlError::SensorFault(SensorError::ConversionError));
        }

        match config.setpoint {
            SetpointMode::Static {
                setpoint,
                duration_s,
            } => {
                if initial_process_value - setpoint == 0.0 {
                    return Err(ControlError::DegenerateDutyMapping);
                }
                Ok(Schedule::Static {
                    setpoint,
                    duration_s,
                })
            }
            SetpointMode::Profile { pattern } => {
                let levels = Levels::new(initial_process_value, &pattern)?;
                let flat_leg = levels
                    .starts()
                    .iter()
                    .zip(levels.segments())
                    .any(|(start, leg): (&f32, &Segment)| *start - leg.limit == 0.0);
                if flat_leg {
                    return Err(ControlError::DegenerateDutyMapping);
                }
                Ok(Schedule::Profile(levels))
            }
        }
    }

    /// Advance the run to `now_ms` with this tick's sensor reading.
    ///
    /// A faulty or non-finite reading drives the outputs off, drops the
    /// current window and returns the fault; the run stays active so a
    /// later good reading picks it up again.
    pub fn tick(
        &mut self,
        now_ms: u32,
        reading: Result<f32, SensorError>,
    ) -> Result<TickReport, ControlError> {
        if self.state != ProcessState::Running {
            return Err(ControlError::NotRunning);
        }

        let process_value = match reading {
            Ok(value) if value.is_finite() => value,
            Ok(_) => return Err(self.fault(now_ms, SensorError::ConversionError.into())),
            Err(err) => return Err(self.fault(now_ms, err.into())),
        };

        self.control(now_ms, process_value)
            .map_err(|err| self.fault(now_ms, err))
    }

    fn control(&mut self, now_ms: u32, process_value: f32) -> Result<TickReport, ControlError> {
        let schedule = self.schedule.as_mut().ok_or(ControlError::NotRunning)?;
        let elapsed_s = elapsed_ms(now_ms, self.started_at_ms) as f32 / 1000.0;
        let (setpoint, stage) = schedule.value_at(elapsed_s);

        let mut record = None;
        let since_update = ticks_diff(now_ms, self.last_update_ms);
        if since_update > self.sample_period_ms as i32 {
            let dt_s = since_update as f32 / 1000.0;
            let output = self.pid.step(process_value, setpoint, dt_s)?;
            let span = schedule.reference_span(self.first_process_value);
            let mut fraction = duty_fraction(output, self.pid.coefficients().kp, span)?;
            if self.overshoot_guard && span > 0.0 {
                fraction = 0.0;
            }

            self.window = DutyWindow::arm(now_ms, fraction, self.sample_period_ms);
            self.last_update_ms = now_ms;
            record = Some(ControlRecord {
                elapsed_s,
                process_value,
                setpoint,
                fraction: self.window.fraction,
                control_output: output,
            });
        }
        let finished = elapsed_s > schedule.total_duration_s();

        let mut heater_on = self.window.is_on(now_ms);
        self.heaters.set_on(heater_on);

        if finished {
            self.finish(now_ms);
            heater_on = false;
        }

        Ok(TickReport {
            state: self.state,
            setpoint,
            stage,
            heater_on,
            elapsed_s,
            record,
        })
    }

    fn fault(&mut self, now_ms: u32, err: ControlError) -> ControlError {
        self.window.cancel(now_ms);
        self.heaters.all_off();
        #[cfg(feature = "defmt")]
        defmt::warn!("Heaters forced off: {}", err);
        err
    }

    fn finish(&mut self, now_ms: u32) {
        self.window.cancel(now_ms);
        self.heaters.all_off();
        self.state = ProcessState::Completed;
        #[cfg(feature = "defmt")]
        defmt::info!("Process completed");
    }

    /// Abort the run and drive every output off.
    ///
    /// Does nothing when idle or already stopped.
    pub fn stop(&mut self) {
        match self.state {
            ProcessState::Idle | ProcessState::Stopped => {}
            ProcessState::Completed => self.heaters.all_off(),
            ProcessState::Running => {
                self.window = DutyWindow::closed(self.window.window_start_ms);
                self.heaters.all_off();
                self.state = ProcessState::Stopped;
                #[cfg(feature = "defmt")]
                defmt::info!("Process stopped");
            }
        }
    }

    /// Replace the PID gains. Integral and derivative memory are kept.
    ///
    /// A zero `Kp` is refused while running since the duty mapping
    /// divides by it.
    pub fn set_coefficients(&mut self, coefficients: PidCoefficients) -> Result<(), ControlError> {
        if self.state == ProcessState::Running && coefficients.kp == 0.0 {
            return Err(ControlError::DegenerateDutyMapping);
        }
        self.pid.set_coefficients(coefficients);
        Ok(())
    }

    /// Seconds left in the run, zero when not running
    pub fn remaining_s(&self, now_ms: u32) -> f32 {
        match (&self.schedule, self.state) {
            (Some(schedule), ProcessState::Running) => {
                let elapsed_s = elapsed_ms(now_ms, self.started_at_ms) as f32 / 1000.0;
                (schedule.total_duration_s() - elapsed_s).max(0.0)
            }
            _ => 0.0,
        }
    }

    /// Current state
    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// PID coefficients in use
    pub fn coefficients(&self) -> &PidCoefficients {
        self.pid.coefficients()
    }

    /// Diagnostic row for the start of the last run.
    ///
    /// Both temperatures are the start process value and the control
    /// output is zero, so a log begins at the starting point.
    pub fn initial_record(&self) -> Option<ControlRecord> {
        self.initial_record
    }

    /// Current duty window
    pub fn window(&self) -> &DutyWindow {
        &self.window
    }

    /// Process value captured by `start`
    pub fn first_process_value(&self) -> f32 {
        self.first_process_value
    }

    /// Heater bank driven by this controller
    pub fn heaters(&self) -> &HeaterBank<H> {
        &self.heaters
    }

    /// Stop the run and hand the heater bank back
    pub fn release(mut self) -> HeaterBank<H> {
        self.stop();
        self.heaters
    }
}
