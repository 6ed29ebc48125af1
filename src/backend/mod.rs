//! Indicator outputs for the six-slice moon display.
//!
//! The control loop only ever hands a [`BitPattern`] to an
//! [`IndicatorBackend`]; how the pattern becomes visible is up to the backend.
//!
//! ## Supported Backends
//!
//! - **Terminal**: logs the pattern. Runs anywhere, used for development and
//!   simulation.
//! - **GPIO**: drives six LEDs through the Linux sysfs GPIO interface.
//!
//! Bit 5 (the most significant of the six) is the leftmost slice and maps to
//! the first configured pin.

use anyhow::Result;
use std::path::Path;

use crate::common::constants::SYSFS_GPIO_ROOT;
use crate::config::{Backend, Config};
use crate::phase::BitPattern;

pub mod gpio;
pub mod terminal;

/// Output sink for bit patterns.
pub trait IndicatorBackend {
    /// Show `pattern` on the display.
    fn apply_pattern(&mut self, pattern: BitPattern) -> Result<()>;

    /// Human-readable name for logs.
    fn backend_name(&self) -> &'static str;

    /// Release hardware resources on shutdown.
    ///
    /// The default implementation does nothing.
    fn cleanup(self: Box<Self>, debug_enabled: bool) {
        let _ = debug_enabled;
    }
}

/// Create the backend selected in `config`.
pub fn create_backend(config: &Config, debug_enabled: bool) -> Result<Box<dyn IndicatorBackend>> {
    match config.backend() {
        Backend::Terminal => Ok(Box::new(terminal::TerminalBackend::new(debug_enabled))),
        Backend::Gpio => Ok(Box::new(gpio::GpioBackend::new(
            Path::new(SYSFS_GPIO_ROOT),
            &config.gpio_pins(),
            debug_enabled,
        )?)),
    }
}
