//! GPIO heater output
//!
//! Drives a relay coil or SSR input from an `embedded-hal` output pin.

use embedded_hal::digital::OutputPin;
use rework_core::traits::HeaterOutput;

/// GPIO heater output
///
/// The pin can be configured as active-high (default) or active-low, for
/// SSR boards with an inverted input stage.
pub struct GpioHeater<P> {
    pin: P,
    /// If true, heater ON = pin LOW
    inverted: bool,
    /// Last state written to the pin (true = heater on)
    on: bool,
    /// Set when a pin write failed; cleared by the next good write
    fault: bool,
}

impl<P: OutputPin> GpioHeater<P> {
    /// Create a heater output and drive it off
    ///
    /// # Arguments
    /// - `pin`: The GPIO pin to control
    /// - `inverted`: If true, heater is ON when pin is LOW
    pub fn new(pin: P, inverted: bool) -> Self {
        let mut heater = Self {
            pin,
            inverted,
            on: false,
            fault: false,
        };
        heater.set_on(false);
        heater
    }

    /// Heater on when the pin is high
    pub fn new_active_high(pin: P) -> Self {
        Self::new(pin, false)
    }

    /// Heater on when the pin is low
    pub fn new_active_low(pin: P) -> Self {
        Self::new(pin, true)
    }

    /// Whether the last pin write failed
    pub fn has_fault(&self) -> bool {
        self.fault
    }

    /// Give the pin back, driven off
    pub fn release(mut self) -> P {
        self.set_on(false);
        self.pin
    }
}

impl<P: OutputPin> HeaterOutput for GpioHeater<P> {
    /// Drive the pin. A failed write leaves [`is_on`](Self::is_on) at the
    /// last state that reached the pin and raises the fault flag.
    fn set_on(&mut self, on: bool) {
        // on=true, inverted=false -> high; on=true, inverted=true -> low
        let result = if on != self.inverted {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };

        self.fault = result.is_err();
        if self.fault {
            #[cfg(feature = "defmt")]
            defmt::warn!("Heater pin write failed, output still {}", self.on);
        } else {
            self.on = on;
        }
    }

    fn is_on(&self) -> bool {
        self.on
    }
}
