//! Configuration for the moon display.
//!
//! Settings live in `moonlite.toml` under `$XDG_CONFIG_HOME/moonlite/` (or the
//! directory passed with `--config`). A commented default file is written on
//! first start.
//!
//! ```toml
//! #[Hardware]
//! backend = "terminal"                             # Output: "terminal" (log only) or "gpio" (sysfs LEDs)
//! sensor = "fixed"                                 # Ambient light: "fixed" or "rc_timing"
//! gpio_pins = [17, 27, 22, 5, 6, 13]               # Six LED GPIO lines, leftmost slice first
//! sensor_pin = 4                                   # GPIO line of the RC light sensor
//! fixed_reading = 100                              # Reading reported by the fixed sensor
//! sensor_max_count = 10000                         # Upper bound of an RC timing count (1-1000000)
//!
//! #[Darkness]
//! dark_upper_threshold = 85                        # Reading needed to switch on (higher is darker)
//! dark_lower_threshold = 75                        # Reading needed to stay on once dark
//! poll_interval = 1                                # Seconds between light checks (1-3600)
//!
//! #[Phase data]
//! identity = "moonLite"                            # Tag sent with each request (1-8 letters or digits)
//! api_url = "https://api.usno.navy.mil/moon/phase" # Moon phase table endpoint
//! update_interval = 86400                          # Seconds between refreshes (60-604800)
//! request_timeout = 30                             # Seconds before a request is abandoned (1-300)
//!
//! #[Errors]
//! error_state = 0b001100                           # LED pattern shown after a failed fetch
//! error_retry = 10                                 # Seconds between retries (1-3600)
//! error_limit = 5                                  # Failures before waiting for the next refresh (1-100)
//! failure_pause = 1                                # Extra seconds to wait after a failure (0-3600)
//! ```
//!
//! Every field is optional; missing fields fall back to the `DEFAULT_*`
//! constants. Values are range-checked by [`validation::validate_config`].

pub mod builder;
pub mod loading;
pub mod validation;

use serde::Deserialize;
use std::time::Duration;

use crate::common::constants::*;
use crate::common::utils::format_seconds;
use crate::phase::BitPattern;

pub use builder::create_default_config;
pub use loading::{get_config_path, get_custom_config_dir, load, load_from_path, set_config_dir};

/// Where the six-bit pattern is sent.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Log the pattern only. Useful without hardware attached.
    Terminal,
    /// Drive six LEDs through the sysfs GPIO interface.
    Gpio,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Terminal => "terminal",
            Backend::Gpio => "gpio",
        }
    }
}

/// Where ambient light readings come from.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// Constant reading from `fixed_reading`.
    Fixed,
    /// Charge-time count of a light-dependent resistor and capacitor on one GPIO line.
    RcTiming,
}

impl SensorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorKind::Fixed => "fixed",
            SensorKind::RcTiming => "rc_timing",
        }
    }
}

/// Contents of `moonlite.toml`.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct Config {
    pub backend: Option<Backend>,
    pub sensor: Option<SensorKind>,

    /// Pattern shown after a failed fetch; must not be producible by the encoder.
    pub error_state: Option<u8>,
    pub error_retry: Option<u64>,  // seconds
    pub error_limit: Option<u32>,  // consecutive failures
    pub update_interval: Option<u64>, // seconds

    /// Readings at or above this turn the display on while it is off.
    pub dark_upper_threshold: Option<u32>,
    /// Readings at or above this keep the display on once it is on.
    pub dark_lower_threshold: Option<u32>,

    pub identity: Option<String>,
    pub api_url: Option<String>,
    pub request_timeout: Option<u64>, // seconds
    pub poll_interval: Option<u64>,   // seconds between ticks
    pub failure_pause: Option<u64>,   // extra seconds after a failed fetch

    pub gpio_pins: Option<Vec<u32>>,
    pub sensor_pin: Option<u32>,
    pub fixed_reading: Option<u32>,
    pub sensor_max_count: Option<u32>,
}

impl Config {
    /// Load configuration using the module's load function
    pub fn load() -> anyhow::Result<Self> {
        load()
    }

    pub fn backend(&self) -> Backend {
        self.backend.unwrap_or(DEFAULT_BACKEND)
    }

    pub fn sensor(&self) -> SensorKind {
        self.sensor.unwrap_or(DEFAULT_SENSOR)
    }

    pub fn error_pattern(&self) -> BitPattern {
        BitPattern::new(self.error_state.unwrap_or(DEFAULT_ERROR_STATE))
    }

    pub fn error_retry(&self) -> Duration {
        Duration::from_secs(self.error_retry.unwrap_or(DEFAULT_ERROR_RETRY))
    }

    pub fn error_limit(&self) -> u32 {
        self.error_limit.unwrap_or(DEFAULT_ERROR_LIMIT)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval.unwrap_or(DEFAULT_UPDATE_INTERVAL))
    }

    pub fn dark_upper_threshold(&self) -> u32 {
        self.dark_upper_threshold
            .unwrap_or(DEFAULT_DARK_UPPER_THRESHOLD)
    }

    pub fn dark_lower_threshold(&self) -> u32 {
        self.dark_lower_threshold
            .unwrap_or(DEFAULT_DARK_LOWER_THRESHOLD)
    }

    pub fn identity(&self) -> String {
        self.identity
            .clone()
            .unwrap_or_else(|| DEFAULT_IDENTITY.to_string())
    }

    pub fn api_url(&self) -> String {
        self.api_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub fn request_timeout(&self) -> u64 {
        self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL))
    }

    pub fn failure_pause(&self) -> Duration {
        Duration::from_secs(self.failure_pause.unwrap_or(DEFAULT_FAILURE_PAUSE))
    }

    pub fn gpio_pins(&self) -> Vec<u32> {
        self.gpio_pins
            .clone()
            .unwrap_or_else(|| DEFAULT_GPIO_PINS.to_vec())
    }

    pub fn sensor_pin(&self) -> u32 {
        self.sensor_pin.unwrap_or(DEFAULT_SENSOR_PIN)
    }

    pub fn fixed_reading(&self) -> u32 {
        self.fixed_reading.unwrap_or(DEFAULT_FIXED_READING)
    }

    pub fn sensor_max_count(&self) -> u32 {
        self.sensor_max_count.unwrap_or(DEFAULT_SENSOR_MAX_COUNT)
    }

    pub fn log_config(&self) {
        let source = match get_custom_config_dir() {
            Some(_) => "custom configuration",
            None => "default configuration",
        };
        log_block_start!("Loaded {}", source);

        match self.backend() {
            Backend::Terminal => log_indented!("Backend: Terminal"),
            Backend::Gpio => {
                let pins: Vec<String> = self.gpio_pins().iter().map(u32::to_string).collect();
                log_indented!("Backend: GPIO (pins {})", pins.join(", "));
            }
        }

        match self.sensor() {
            SensorKind::Fixed => log_indented!("Sensor: Fixed ({})", self.fixed_reading()),
            SensorKind::RcTiming => log_indented!(
                "Sensor: RC timing (pin {}, max {})",
                self.sensor_pin(),
                self.sensor_max_count()
            ),
        }

        log_indented!(
            "Darkness: on at {}, off below {}",
            self.dark_upper_threshold(),
            self.dark_lower_threshold()
        );
        log_indented!(
            "Update interval: {}",
            format_seconds(self.update_interval().as_secs())
        );
        log_indented!(
            "Errors: show {}, retry every {}, give up after {}",
            self.error_pattern(),
            format_seconds(self.error_retry().as_secs()),
            self.error_limit()
        );
        log_indented!("Identity: {}", self.identity());
    }
}
