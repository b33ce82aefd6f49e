//! Diagnostic records
//!
//! One record is produced per control update. Formatting a record gives the
//! semicolon-separated line used to check tunings against logged runs;
//! where the line goes (serial, RTT, nowhere) is up to the caller.

use core::fmt;

/// Column header for [`ControlRecord`] lines
pub const CONTROL_HEADER: &str = "t;PV;SV;FACTOR;u";

/// Column header for [`TuningRecord`] lines
pub const TUNING_HEADER: &str = "t;PV;SV;FACTOR";

/// One PID update of a preheater or reballing run
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlRecord {
    /// Run time in seconds
    pub elapsed_s: f32,
    /// Process value (°C)
    pub process_value: f32,
    /// Setpoint (°C)
    pub setpoint: f32,
    /// Duty fraction armed for the next window
    pub fraction: f32,
    /// Raw PID output
    pub control_output: f32,
}

impl fmt::Display for ControlRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{};{};{};{};{}",
            self.elapsed_s, self.process_value, self.setpoint, self.fraction, self.control_output
        )
    }
}

/// One relay decision of a tuning run
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TuningRecord {
    /// Run time in seconds
    pub elapsed_s: f32,
    /// Process value (°C)
    pub process_value: f32,
    /// Tuning setpoint (°C)
    pub setpoint: f32,
    /// Relay state as a fraction (0 or 1)
    pub fraction: f32,
}

impl fmt::Display for TuningRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{};{};{};{}",
            self.elapsed_s, self.process_value, self.setpoint, self.fraction
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write;

    #[test]
    fn test_control_line() {
        let record = ControlRecord {
            elapsed_s: 12.5,
            process_value: 98.25,
            setpoint: 100.0,
            fraction: 0.5,
            control_output: -3.0,
        };
        let mut line: heapless::String<64> = heapless::String::new();
        write!(line, "{}", record).unwrap();
        assert_eq!(line.as_str(), "12.5;98.25;100;0.5;-3");
    }

    #[test]
    fn test_tuning_line() {
        let record = TuningRecord {
            elapsed_s: 1.0,
            process_value: 150.5,
            setpoint: 150.0,
            fraction: 0.0,
        };
        let mut line: heapless::String<64> = heapless::String::new();
        write!(line, "{}", record).unwrap();
        assert_eq!(line.as_str(), "1;150.5;150;0");
        assert_eq!(TUNING_HEADER.split(';').count(), 4);
    }
}
