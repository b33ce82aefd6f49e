//! Heater bank
//!
//! The preheater drives the bottom heater alone; reballing and tuning drive
//! top and bottom together. Both channels always get the same command, so a
//! bank behaves like a single output to the controllers.

use crate::config::Channels;
use crate::traits::HeaterOutput;

/// One or two heater channels switched in lockstep
pub struct HeaterBank<H> {
    bottom: H,
    top: Option<H>,
}

impl<H: HeaterOutput> HeaterBank<H> {
    /// Bottom heater only. The output is driven off.
    pub fn single(bottom: H) -> Self {
        let mut bank = Self { bottom, top: None };
        bank.all_off();
        bank
    }

    /// Top and bottom heaters. Both outputs are driven off.
    pub fn dual(top: H, bottom: H) -> Self {
        let mut bank = Self {
            bottom,
            top: Some(top),
        };
        bank.all_off();
        bank
    }

    /// Channel layout of this bank
    pub fn channels(&self) -> Channels {
        if self.top.is_some() {
            Channels::Dual
        } else {
            Channels::Single
        }
    }

    /// Command every channel
    pub fn set_on(&mut self, on: bool) {
        self.bottom.set_on(on);
        if let Some(top) = self.top.as_mut() {
            top.set_on(on);
        }
    }

    /// Drive every channel off
    pub fn all_off(&mut self) {
        self.set_on(false);
    }

    /// Whether any channel is on
    pub fn is_on(&self) -> bool {
        self.bottom.is_on() || self.top.as_ref().map_or(false, |top| top.is_on())
    }

    /// Bottom heater
    pub fn bottom(&self) -> &H {
        &self.bottom
    }

    /// Top heater, if fitted
    pub fn top(&self) -> Option<&H> {
        self.top.as_ref()
    }

    /// Give the outputs back as `(bottom, top)`, driven off
    pub fn release(mut self) -> (H, Option<H>) {
        self.all_off();
        (self.bottom, self.top)
    }
}
