//! Hardware abstraction traits
//!
//! These traits define the interface between the control core and the
//! board-specific outputs it drives.

pub mod heater;

pub use heater::{HeaterOutput, SensorError};
