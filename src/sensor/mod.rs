//! Ambient light sources.
//!
//! A sensor reports a raw magnitude where a higher value means darker. The
//! [`AmbientGate`](crate::core::ambient::AmbientGate) turns readings into a
//! dark/light decision; sensors know nothing about thresholds.

use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;

use crate::backend::gpio::{Direction, SysfsPin};
use crate::common::constants::SYSFS_GPIO_ROOT;
use crate::config::{Config, SensorKind};

/// Capacitor discharge time before a measurement
const DISCHARGE_TIME: Duration = Duration::from_millis(100);

/// Source of raw ambient light readings.
pub trait LightSensor {
    /// Take one reading. Higher means darker.
    fn read_raw(&mut self) -> Result<u32>;

    fn sensor_name(&self) -> &'static str;

    /// Release hardware resources on shutdown. The default does nothing.
    fn cleanup(self: Box<Self>, debug_enabled: bool) {
        let _ = debug_enabled;
    }
}

/// Sensor that always reports the same value.
pub struct FixedSensor {
    reading: u32,
}

impl FixedSensor {
    pub fn new(reading: u32) -> Self {
        Self { reading }
    }
}

impl LightSensor for FixedSensor {
    fn read_raw(&mut self) -> Result<u32> {
        Ok(self.reading)
    }

    fn sensor_name(&self) -> &'static str {
        "Fixed"
    }
}

/// Light-dependent resistor charging a capacitor on one GPIO line.
///
/// The pin is driven low to empty the capacitor, then switched to input; the
/// number of polls until it reads high grows as the resistance rises, so the
/// count grows as light falls.
pub struct RcTimingSensor {
    pin: SysfsPin,
    max_count: u32,
    discharge: Duration,
}

impl RcTimingSensor {
    pub fn new(root: &Path, pin_number: u32, max_count: u32) -> Result<Self> {
        let pin = SysfsPin::export(root, pin_number)
            .with_context(|| format!("Failed to prepare light sensor on GPIO {pin_number}"))?;
        Ok(Self {
            pin,
            max_count,
            discharge: DISCHARGE_TIME,
        })
    }

    #[cfg(test)]
    fn with_discharge(mut self, discharge: Duration) -> Self {
        self.discharge = discharge;
        self
    }
}

impl LightSensor for RcTimingSensor {
    fn read_raw(&mut self) -> Result<u32> {
        self.pin.set_direction(Direction::Out)?;
        self.pin.write(false)?;
        std::thread::sleep(self.discharge);

        self.pin.set_direction(Direction::In)?;
        let mut count = 0;
        while count < self.max_count && !self.pin.read()? {
            count += 1;
        }
        Ok(count)
    }

    fn sensor_name(&self) -> &'static str {
        "RC timing"
    }

    fn cleanup(self: Box<Self>, debug_enabled: bool) {
        let number = self.pin.number();
        if let Err(e) = self.pin.unexport() {
            log_warning!("Could not release sensor GPIO {}: {}", number, e);
        } else if debug_enabled {
            log_debug!("Released sensor GPIO {}", number);
        }
    }
}

/// Create the sensor selected in `config`.
pub fn create_sensor(config: &Config) -> Result<Box<dyn LightSensor>> {
    match config.sensor() {
        SensorKind::Fixed => Ok(Box::new(FixedSensor::new(config.fixed_reading()))),
        SensorKind::RcTiming => Ok(Box::new(RcTimingSensor::new(
            Path::new(SYSFS_GPIO_ROOT),
            config.sensor_pin(),
            config.sensor_max_count(),
        )?)),
    }
}
