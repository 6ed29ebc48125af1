//! Dark/light decision with hysteresis.
//!
//! Readings grow as light falls. While light the gate needs the upper
//! threshold to switch to dark; once dark it stays dark down to the lower
//! threshold, so a reading hovering between the two never flickers the
//! display.

use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmbientGate {
    upper: u32,
    lower: u32,
    dark: bool,
}

impl AmbientGate {
    /// New gate, starting dark.
    pub fn new(upper: u32, lower: u32) -> Self {
        Self {
            upper,
            lower,
            dark: true,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.dark_upper_threshold(), config.dark_lower_threshold())
    }

    /// Threshold the next reading is compared against.
    pub fn threshold(&self) -> u32 {
        if self.dark { self.lower } else { self.upper }
    }

    /// Feed one raw reading and return the new state.
    pub fn sense(&mut self, raw: u32) -> bool {
        self.dark = raw >= self.threshold();
        self.dark
    }

    pub fn is_dark(&self) -> bool {
        self.dark
    }

    /// Replace the thresholds, keeping the current state.
    pub fn set_thresholds(&mut self, upper: u32, lower: u32) {
        self.upper = upper;
        self.lower = lower;
    }
}
