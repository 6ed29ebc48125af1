//! Configuration validation.
//!
//! Rejects values the control loop cannot work with: out-of-range intervals,
//! an error pattern the encoder could also produce, inverted darkness
//! thresholds, and unusable GPIO wiring.

use anyhow::Result;
use std::collections::HashSet;

use super::{Backend, Config, SensorKind};
use crate::common::constants::*;
use crate::phase::BitPattern;

/// Check every configured value, failing on the first problem found.
pub fn validate_config(config: &Config) -> Result<()> {
    if let Some(state) = config.error_state {
        if state > BitPattern::MASK {
            anyhow::bail!("error_state ({state:#b}) must fit in 6 bits (0 to 0b111111)");
        }
        if BitPattern::new(state).is_encodable() {
            anyhow::bail!(
                "error_state ({:06b}) is a real moon phase pattern. \
                Choose a pattern that is not a single run of lit LEDs, such as 001100.",
                state
            );
        }
    }

    if let Some(retry) = config.error_retry
        && !(MINIMUM_ERROR_RETRY..=MAXIMUM_ERROR_RETRY).contains(&retry)
    {
        anyhow::bail!(
            "error_retry ({} seconds) must be between {} and {} seconds",
            retry,
            MINIMUM_ERROR_RETRY,
            MAXIMUM_ERROR_RETRY
        );
    }

    if let Some(limit) = config.error_limit
        && !(MINIMUM_ERROR_LIMIT..=MAXIMUM_ERROR_LIMIT).contains(&limit)
    {
        anyhow::bail!(
            "error_limit ({}) must be between {} and {}",
            limit,
            MINIMUM_ERROR_LIMIT,
            MAXIMUM_ERROR_LIMIT
        );
    }

    if let Some(interval) = config.update_interval
        && !(MINIMUM_UPDATE_INTERVAL..=MAXIMUM_UPDATE_INTERVAL).contains(&interval)
    {
        anyhow::bail!(
            "update_interval ({} seconds) must be between {} and {} seconds",
            interval,
            MINIMUM_UPDATE_INTERVAL,
            MAXIMUM_UPDATE_INTERVAL
        );
    }

    // Thresholds are compared after defaults so a single override can't invert them
    let upper = config.dark_upper_threshold();
    let lower = config.dark_lower_threshold();
    if lower > upper {
        anyhow::bail!(
            "dark_lower_threshold ({}) must not be greater than dark_upper_threshold ({})",
            lower,
            upper
        );
    }

    if let Some(ref identity) = config.identity {
        validate_identity(identity)?;
    }

    if let Some(ref url) = config.api_url
        && !(url.starts_with("http://") || url.starts_with("https://"))
    {
        anyhow::bail!("api_url ({url}) must start with http:// or https://");
    }

    if let Some(timeout) = config.request_timeout
        && !(MINIMUM_REQUEST_TIMEOUT..=MAXIMUM_REQUEST_TIMEOUT).contains(&timeout)
    {
        anyhow::bail!(
            "request_timeout ({} seconds) must be between {} and {} seconds",
            timeout,
            MINIMUM_REQUEST_TIMEOUT,
            MAXIMUM_REQUEST_TIMEOUT
        );
    }

    if let Some(interval) = config.poll_interval
        && !(MINIMUM_POLL_INTERVAL..=MAXIMUM_POLL_INTERVAL).contains(&interval)
    {
        anyhow::bail!(
            "poll_interval ({} seconds) must be between {} and {} seconds",
            interval,
            MINIMUM_POLL_INTERVAL,
            MAXIMUM_POLL_INTERVAL
        );
    }

    if let Some(pause) = config.failure_pause
        && pause > MAXIMUM_FAILURE_PAUSE
    {
        anyhow::bail!(
            "failure_pause ({} seconds) must be at most {} seconds",
            pause,
            MAXIMUM_FAILURE_PAUSE
        );
    }

    if let Some(count) = config.sensor_max_count
        && !(MINIMUM_SENSOR_MAX_COUNT..=MAXIMUM_SENSOR_MAX_COUNT).contains(&count)
    {
        anyhow::bail!(
            "sensor_max_count ({}) must be between {} and {}",
            count,
            MINIMUM_SENSOR_MAX_COUNT,
            MAXIMUM_SENSOR_MAX_COUNT
        );
    }

    if config.backend() == Backend::Gpio {
        validate_gpio_pins(config)?;
    }

    Ok(())
}

/// The identity tag is sent as a query parameter: short and plain.
pub fn validate_identity(identity: &str) -> Result<()> {
    if identity.is_empty() || identity.len() > MAXIMUM_IDENTITY_LENGTH {
        anyhow::bail!(
            "identity ('{}') must be 1 to {} characters long",
            identity,
            MAXIMUM_IDENTITY_LENGTH
        );
    }
    if !identity.chars().all(|c| c.is_ascii_alphanumeric()) {
        anyhow::bail!("identity ('{identity}') may only contain ASCII letters and digits");
    }
    Ok(())
}

fn validate_gpio_pins(config: &Config) -> Result<()> {
    let pins = config.gpio_pins();
    if pins.len() != 6 {
        anyhow::bail!(
            "gpio_pins must list exactly 6 GPIO lines, one per moon slice (got {})",
            pins.len()
        );
    }

    let unique: HashSet<u32> = pins.iter().copied().collect();
    if unique.len() != pins.len() {
        anyhow::bail!("gpio_pins contains the same GPIO line more than once: {pins:?}");
    }

    if config.sensor() == SensorKind::RcTiming && unique.contains(&config.sensor_pin()) {
        anyhow::bail!(
            "sensor_pin ({}) is also used as an LED output in gpio_pins",
            config.sensor_pin()
        );
    }

    Ok(())
}
