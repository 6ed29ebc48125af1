//! Application-wide constants: defaults, validation limits and exit codes.

use crate::config::{Backend, SensorKind};

// # Defaults

pub const DEFAULT_BACKEND: Backend = Backend::Terminal;
pub const DEFAULT_SENSOR: SensorKind = SensorKind::Fixed;

/// Pattern shown after a failed fetch (0b001100, never produced by the encoder)
pub const DEFAULT_ERROR_STATE: u8 = 0b001100;
pub const DEFAULT_ERROR_RETRY: u64 = 10; // seconds
pub const DEFAULT_ERROR_LIMIT: u32 = 5;
pub const DEFAULT_UPDATE_INTERVAL: u64 = 24 * 60 * 60; // seconds
pub const DEFAULT_DARK_UPPER_THRESHOLD: u32 = 85;
pub const DEFAULT_DARK_LOWER_THRESHOLD: u32 = 75;
pub const DEFAULT_IDENTITY: &str = "moonLite";
pub const DEFAULT_API_URL: &str = "https://api.usno.navy.mil/moon/phase";
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 30; // seconds
pub const DEFAULT_POLL_INTERVAL: u64 = 1; // seconds
pub const DEFAULT_FAILURE_PAUSE: u64 = 1; // seconds
pub const DEFAULT_GPIO_PINS: [u32; 6] = [17, 27, 22, 5, 6, 13];
pub const DEFAULT_SENSOR_PIN: u32 = 4;
pub const DEFAULT_FIXED_READING: u32 = 100;
pub const DEFAULT_SENSOR_MAX_COUNT: u32 = 10_000;

// # Validation limits

pub const MINIMUM_ERROR_RETRY: u64 = 1;
pub const MAXIMUM_ERROR_RETRY: u64 = 3600;
pub const MINIMUM_ERROR_LIMIT: u32 = 1;
pub const MAXIMUM_ERROR_LIMIT: u32 = 100;
pub const MINIMUM_UPDATE_INTERVAL: u64 = 60;
pub const MAXIMUM_UPDATE_INTERVAL: u64 = 7 * 24 * 60 * 60;
pub const MINIMUM_REQUEST_TIMEOUT: u64 = 1;
pub const MAXIMUM_REQUEST_TIMEOUT: u64 = 300;
pub const MINIMUM_POLL_INTERVAL: u64 = 1;
pub const MAXIMUM_POLL_INTERVAL: u64 = 3600;
pub const MAXIMUM_FAILURE_PAUSE: u64 = 3600;
pub const MINIMUM_SENSOR_MAX_COUNT: u32 = 1;
pub const MAXIMUM_SENSOR_MAX_COUNT: u32 = 1_000_000;
pub const MAXIMUM_IDENTITY_LENGTH: usize = 8;

// # Phase table request

/// Number of upcoming primary phases requested per fetch
pub const PHASE_TABLE_ENTRIES: u32 = 5;
/// Synodic month: 29 days 12 hours 44 minutes 3 seconds
pub const SYNODIC_MONTH_SECONDS: i64 = ((29 * 24 + 12) * 60 + 44) * 60 + 3;

// # Runtime

/// Longest single sleep inside a pause, so shutdown requests are seen promptly
pub const SLEEP_SLICE_MS: u64 = 250;
pub const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

// # Exit codes

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
