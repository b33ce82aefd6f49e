//! Hardware driver implementations
//!
//! Concrete implementations of the traits defined in rework-core:
//!
//! - Heater outputs on an `embedded-hal` GPIO pin (relay or SSR, active
//!   high or active low)

#![no_std]
#![deny(unsafe_code)]

pub mod heater;
