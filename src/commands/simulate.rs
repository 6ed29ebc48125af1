//! Implementation of the `simulate` command.
//!
//! Installs a simulated clock so the daemon can be watched across days of
//! refreshes, retries and phase changes without waiting for them.

use anyhow::Result;
use chrono::{DateTime, Local};
use std::sync::Arc;

use crate::time_source::{self, SimulatedTimeSource};

/// Parse the simulation window and install the simulated time source.
///
/// `multiplier` of `0.0` selects fast-forward. Returns control to the caller,
/// which then runs the daemon normally on the simulated clock.
pub fn handle_simulate_command(
    start_time: &str,
    end_time: &str,
    multiplier: f64,
    debug_enabled: bool,
) -> Result<()> {
    let (start, end) = parse_window(start_time, end_time)?;

    time_source::init_time_source(Arc::new(SimulatedTimeSource::new(start, end, multiplier)));

    log_version!();
    log_block_start!("Simulation Mode");
    log_decorated!(
        "Simulating from {} to {}",
        start.format("%Y-%m-%d %H:%M:%S"),
        end.format("%Y-%m-%d %H:%M:%S")
    );

    let duration = end - start;
    log_indented!(
        "Total simulated time: {} days {} hours",
        duration.num_days(),
        duration.num_hours() % 24
    );

    if multiplier == 0.0 {
        log_indented!("Time acceleration: fast-forward");
    } else {
        log_indented!(
            "Time acceleration: {}x (will complete in ~{:.1} seconds)",
            multiplier,
            duration.num_seconds() as f64 / multiplier
        );
    }

    if debug_enabled {
        log_pipe!();
        log_debug!("Simulated time source initialized");
    }

    Ok(())
}

/// Parse and order-check the start and end of a simulation.
pub fn parse_window(start_time: &str, end_time: &str) -> Result<(DateTime<Local>, DateTime<Local>)> {
    let start = time_source::parse_datetime(start_time)
        .map_err(|e| anyhow::anyhow!("Invalid start time: {}", e))?;
    let end = time_source::parse_datetime(end_time)
        .map_err(|e| anyhow::anyhow!("Invalid end time: {}", e))?;

    if end <= start {
        anyhow::bail!("End time must be after start time");
    }

    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_must_move_forward() {
        assert!(parse_window("2024-01-02 00:00:00", "2024-01-01 00:00:00").is_err());
        assert!(parse_window("2024-01-01 00:00:00", "2024-01-01 00:00:00").is_err());
        let (start, end) = parse_window("2024-01-01 00:00:00", "2024-01-03 12:00:00").unwrap();
        assert_eq!((end - start).num_hours(), 60);
    }

    #[test]
    fn test_window_rejects_bad_format() {
        assert!(parse_window("yesterday", "2024-01-01 00:00:00").is_err());
    }
}
