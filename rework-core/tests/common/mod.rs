//! Shared fixtures for the process integration tests

#![allow(dead_code)]

use rework_core::traits::HeaterOutput;

/// Tick period of the driver loop (about 60 Hz)
pub const TICK_MS: u32 = 16;

/// Heater output that only remembers its state
#[derive(Debug, Default)]
pub struct MockHeater {
    pub on: bool,
}

impl HeaterOutput for MockHeater {
    fn set_on(&mut self, on: bool) {
        self.on = on;
    }

    fn is_on(&self) -> bool {
        self.on
    }
}

/// First-order thermal plant
///
/// Full power heats at `heating_rate` °C/s; the body loses heat to
/// ambient proportionally to the temperature difference.
#[derive(Debug, Clone)]
pub struct ThermalPlant {
    pub temperature: f32,
    pub ambient: f32,
    pub heating_rate: f32,
    pub loss: f32,
}

impl ThermalPlant {
    /// Board-sized plant: 2 °C/s at full power, 100 s time constant
    pub fn board(ambient: f32) -> Self {
        Self {
            temperature: ambient,
            ambient,
            heating_rate: 2.0,
            loss: 0.01,
        }
    }

    /// Integrate one step of `dt_ms` with the heater on or off
    pub fn step(&mut self, heater_on: bool, dt_ms: u32) {
        let dt_s = dt_ms as f32 / 1000.0;
        let input = if heater_on { self.heating_rate } else { 0.0 };
        let cooling = self.loss * (self.temperature - self.ambient);
        self.temperature += (input - cooling) * dt_s;
    }
}
