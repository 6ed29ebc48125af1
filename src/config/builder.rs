//! Default configuration file generation.
//!
//! Writes a commented `moonlite.toml` whose values come from the `DEFAULT_*`
//! constants, with comments aligned in one column.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::common::constants::*;

/// Write the default configuration to `path`, creating parent directories.
pub fn create_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    fs::write(path, default_config_content())
        .with_context(|| format!("Failed to write default config to {}", path.display()))?;

    Ok(())
}

/// Text of the default configuration file.
pub fn default_config_content() -> String {
    let pins: Vec<String> = DEFAULT_GPIO_PINS.iter().map(u32::to_string).collect();

    let content = ConfigBuilder::new()
        .add_section("Hardware")
        .add_setting(
            "backend",
            &format!("\"{}\"", DEFAULT_BACKEND.as_str()),
            "Output: \"terminal\" (log only) or \"gpio\" (sysfs LEDs)",
        )
        .add_setting(
            "sensor",
            &format!("\"{}\"", DEFAULT_SENSOR.as_str()),
            "Ambient light: \"fixed\" or \"rc_timing\"",
        )
        .add_setting(
            "gpio_pins",
            &format!("[{}]", pins.join(", ")),
            "Six LED GPIO lines, leftmost slice first",
        )
        .add_setting(
            "sensor_pin",
            &DEFAULT_SENSOR_PIN.to_string(),
            "GPIO line of the RC light sensor",
        )
        .add_setting(
            "fixed_reading",
            &DEFAULT_FIXED_READING.to_string(),
            "Reading reported by the fixed sensor",
        )
        .add_setting(
            "sensor_max_count",
            &DEFAULT_SENSOR_MAX_COUNT.to_string(),
            &format!(
                "Upper bound of an RC timing count ({MINIMUM_SENSOR_MAX_COUNT}-{MAXIMUM_SENSOR_MAX_COUNT})"
            ),
        )
        .add_section("Darkness")
        .add_setting(
            "dark_upper_threshold",
            &DEFAULT_DARK_UPPER_THRESHOLD.to_string(),
            "Reading needed to switch on (higher is darker)",
        )
        .add_setting(
            "dark_lower_threshold",
            &DEFAULT_DARK_LOWER_THRESHOLD.to_string(),
            "Reading needed to stay on once dark",
        )
        .add_setting(
            "poll_interval",
            &DEFAULT_POLL_INTERVAL.to_string(),
            &format!("Seconds between light checks ({MINIMUM_POLL_INTERVAL}-{MAXIMUM_POLL_INTERVAL})"),
        )
        .add_section("Phase data")
        .add_setting(
            "identity",
            &format!("\"{DEFAULT_IDENTITY}\""),
            &format!("Tag sent with each request (1-{MAXIMUM_IDENTITY_LENGTH} letters or digits)"),
        )
        .add_setting(
            "api_url",
            &format!("\"{DEFAULT_API_URL}\""),
            "Moon phase table endpoint",
        )
        .add_setting(
            "update_interval",
            &DEFAULT_UPDATE_INTERVAL.to_string(),
            &format!(
                "Seconds between refreshes ({MINIMUM_UPDATE_INTERVAL}-{MAXIMUM_UPDATE_INTERVAL})"
            ),
        )
        .add_setting(
            "request_timeout",
            &DEFAULT_REQUEST_TIMEOUT.to_string(),
            &format!(
                "Seconds before a request is abandoned ({MINIMUM_REQUEST_TIMEOUT}-{MAXIMUM_REQUEST_TIMEOUT})"
            ),
        )
        .add_section("Errors")
        .add_setting(
            "error_state",
            &format!("0b{DEFAULT_ERROR_STATE:06b}"),
            "LED pattern shown after a failed fetch",
        )
        .add_setting(
            "error_retry",
            &DEFAULT_ERROR_RETRY.to_string(),
            &format!("Seconds between retries ({MINIMUM_ERROR_RETRY}-{MAXIMUM_ERROR_RETRY})"),
        )
        .add_setting(
            "error_limit",
            &DEFAULT_ERROR_LIMIT.to_string(),
            &format!(
                "Failures before waiting for the next refresh ({MINIMUM_ERROR_LIMIT}-{MAXIMUM_ERROR_LIMIT})"
            ),
        )
        .add_setting(
            "failure_pause",
            &DEFAULT_FAILURE_PAUSE.to_string(),
            &format!("Extra seconds to wait after a failure (0-{MAXIMUM_FAILURE_PAUSE})"),
        )
        .build();

    format!("{content}\n")
}

/// Builder for a config file with aligned trailing comments.
struct ConfigBuilder {
    entries: Vec<ConfigEntry>,
}

enum ConfigEntry {
    Section(String),
    Setting { line: String, comment: String },
}

impl ConfigBuilder {
    fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    fn add_section(mut self, title: &str) -> Self {
        self.entries.push(ConfigEntry::Section(format!("#[{title}]")));
        self
    }

    fn add_setting(mut self, key: &str, value: &str, comment: &str) -> Self {
        self.entries.push(ConfigEntry::Setting {
            line: format!("{key} = {value}"),
            comment: format!("# {comment}"),
        });
        self
    }

    fn build(self) -> String {
        let column = self
            .entries
            .iter()
            .filter_map(|entry| match entry {
                ConfigEntry::Setting { line, .. } => Some(line.len()),
                ConfigEntry::Section(_) => None,
            })
            .max()
            .unwrap_or(0)
            + 1;

        let mut lines = Vec::new();
        for entry in self.entries {
            match entry {
                ConfigEntry::Section(title) => {
                    if !lines.is_empty() {
                        lines.push(String::new());
                    }
                    lines.push(title);
                }
                ConfigEntry::Setting { line, comment } => {
                    let padding = " ".repeat(column - line.len());
                    lines.push(format!("{line}{padding}{comment}"));
                }
            }
        }

        lines.join("\n")
    }
}
