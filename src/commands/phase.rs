//! Implementation of the `phase` command.
//!
//! Fetches the phase table once with the configured source and identity,
//! prints what the daemon would show and exits.

use anyhow::Result;

use crate::backend::terminal::render;
use crate::config::Config;
use crate::phase::usno::UsnoClient;
use crate::phase::PhaseProvider;

/// Fetch and display the current moon phase pattern.
///
/// Fails when the lookup fails, so scripts can rely on the exit status.
pub fn handle_phase_command(debug_enabled: bool) -> Result<()> {
    log_version!();

    let config = Config::load()?;
    let client = UsnoClient::from_config(&config)?;
    if debug_enabled {
        log_pipe!();
        log_debug!("Querying {}", client.api_url());
    }

    let provider = PhaseProvider::new(client, debug_enabled);
    let now = crate::time_source::now();

    log_block_start!("Fetching moon phase data...");
    match provider.fetch_phase(now, &config.identity()) {
        Ok(pattern) => {
            log_block_start!("LED arrangement: {} {}", pattern, render(pattern));
            log_end!();
            Ok(())
        }
        Err(e) => {
            log_indented!("The daemon would show the error pattern {}", config.error_pattern());
            Err(anyhow::Error::from(e).context("Failed to fetch moon phase"))
        }
    }
}
