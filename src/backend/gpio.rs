//! Sysfs GPIO backend.
//!
//! Each pin is exported through `<root>/export`, switched to output and then
//! driven by writing `0` or `1` to `<root>/gpioN/value`. Pins exported here are
//! unexported again on cleanup; pins that were already exported are left as
//! found.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::IndicatorBackend;
use crate::phase::BitPattern;

// udev may need a moment to apply permissions after export
const EXPORT_POLL_ATTEMPTS: u32 = 20;
const EXPORT_POLL_DELAY: Duration = Duration::from_millis(50);

/// Pin direction as written to the `direction` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }
}

/// One exported sysfs GPIO line.
#[derive(Debug)]
pub struct SysfsPin {
    number: u32,
    root: PathBuf,
    exported_here: bool,
}

impl SysfsPin {
    /// Export `number` under `root` unless it is already exported.
    pub fn export(root: &Path, number: u32) -> Result<Self> {
        let pin_dir = root.join(format!("gpio{number}"));
        let mut exported_here = false;

        if !pin_dir.exists() {
            fs::write(root.join("export"), number.to_string())
                .with_context(|| format!("Failed to export GPIO {number}"))?;
            exported_here = true;

            let mut attempts = 0;
            while !pin_dir.join("value").exists() {
                attempts += 1;
                if attempts > EXPORT_POLL_ATTEMPTS {
                    anyhow::bail!("GPIO {number} did not appear after export");
                }
                std::thread::sleep(EXPORT_POLL_DELAY);
            }
        }

        Ok(Self {
            number,
            root: root.to_path_buf(),
            exported_here,
        })
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    fn attribute(&self, name: &str) -> PathBuf {
        self.root.join(format!("gpio{}", self.number)).join(name)
    }

    pub fn set_direction(&self, direction: Direction) -> Result<()> {
        fs::write(self.attribute("direction"), direction.as_str())
            .with_context(|| format!("Failed to set GPIO {} direction", self.number))
    }

    pub fn write(&self, high: bool) -> Result<()> {
        fs::write(self.attribute("value"), if high { "1" } else { "0" })
            .with_context(|| format!("Failed to write GPIO {}", self.number))
    }

    pub fn read(&self) -> Result<bool> {
        let value = fs::read_to_string(self.attribute("value"))
            .with_context(|| format!("Failed to read GPIO {}", self.number))?;
        Ok(value.trim() == "1")
    }

    /// Release the line if it was exported by [`SysfsPin::export`].
    pub fn unexport(self) -> Result<()> {
        if self.exported_here {
            fs::write(self.root.join("unexport"), self.number.to_string())
                .with_context(|| format!("Failed to unexport GPIO {}", self.number))?;
        }
        Ok(())
    }
}

/// Six LEDs on sysfs GPIO lines, leftmost slice first.
pub struct GpioBackend {
    pins: Vec<SysfsPin>,
    debug_enabled: bool,
}

impl GpioBackend {
    /// Export and configure every pin as an output, starting dark.
    pub fn new(root: &Path, pin_numbers: &[u32], debug_enabled: bool) -> Result<Self> {
        if pin_numbers.len() != 6 {
            anyhow::bail!(
                "GPIO backend needs exactly 6 pins, got {}",
                pin_numbers.len()
            );
        }

        let mut pins = Vec::with_capacity(6);
        for &number in pin_numbers {
            let pin = match SysfsPin::export(root, number) {
                Ok(pin) => pin,
                Err(e) => {
                    release_pins(pins);
                    return Err(e);
                }
            };
            let configured = pin
                .set_direction(Direction::Out)
                .and_then(|()| pin.write(false));
            pins.push(pin);
            if let Err(e) = configured {
                release_pins(pins);
                return Err(e);
            }
        }

        if debug_enabled {
            let numbers: Vec<String> = pin_numbers.iter().map(u32::to_string).collect();
            log_debug!("GPIO outputs ready on lines {}", numbers.join(", "));
        }

        Ok(Self {
            pins,
            debug_enabled,
        })
    }
}

impl IndicatorBackend for GpioBackend {
    fn apply_pattern(&mut self, pattern: BitPattern) -> Result<()> {
        for (index, pin) in self.pins.iter().enumerate() {
            pin.write(pattern.is_lit(index))?;
        }
        if self.debug_enabled {
            log_debug!("GPIO pattern written: {}", pattern);
        }
        log_decorated!("LED arrangement: {}", pattern);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "GPIO"
    }

    fn cleanup(self: Box<Self>, debug_enabled: bool) {
        for pin in self.pins {
            let number = pin.number();
            let _ = pin.write(false);
            if let Err(e) = pin.unexport() {
                log_warning!("Could not release GPIO {}: {}", number, e);
            } else if debug_enabled {
                log_debug!("Released GPIO {}", number);
            }
        }
    }
}

/// Give back lines claimed by a setup that failed part way.
fn release_pins(pins: Vec<SysfsPin>) {
    for pin in pins {
        let number = pin.number();
        if let Err(e) = pin.unexport() {
            log_warning!("Could not release GPIO {}: {}", number, e);
        }
    }
}
