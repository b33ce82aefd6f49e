//! Heater output trait and temperature sensor faults

/// Faults a thermocouple front end can report alongside a reading
///
/// The core never inspects raw sensor registers. The collaborator that owns
/// the sensor hands over either a temperature or one of these, and any of
/// them forces the heater outputs off for that tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// Thermocouple disconnected (open input bit set)
    OpenCircuit,
    /// Thermocouple shorted to ground or supply
    ShortCircuit,
    /// Reading out of the converter's range
    OutOfRange,
    /// Conversion failed or the value is not a number
    ConversionError,
}

/// One heater channel (mechanical relay or SSR)
///
/// Implementations control the heater element via a GPIO pin.
pub trait HeaterOutput {
    /// Turn the heater on or off
    fn set_on(&mut self, on: bool);

    /// Check if the heater is currently on
    fn is_on(&self) -> bool;
}

impl<H: HeaterOutput + ?Sized> HeaterOutput for &mut H {
    fn set_on(&mut self, on: bool) {
        (**self).set_on(on)
    }

    fn is_on(&self) -> bool {
        (**self).is_on()
    }
}
