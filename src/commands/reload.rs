//! Implementation of the `reload` command.
//!
//! Validates the configuration on disk, then sends SIGUSR2 to the daemon
//! recorded in the lock file.

use anyhow::{Context, Result};
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;

use crate::common::utils;
use crate::io::lock;

/// Ask the running daemon to reload its configuration.
pub fn handle_reload_command(debug_enabled: bool) -> Result<()> {
    log_version!();

    // Fail here rather than in the daemon, where the error is easy to miss
    crate::config::Config::load().context("Configuration is invalid, not reloading")?;

    let lock_path = lock::get_lock_path();
    let pid = match lock::read_lock_pid(&lock_path) {
        Some(pid) if utils::is_process_running(pid) => pid,
        _ => {
            log_pipe!();
            log_warning!("moonlite is not running");
            log_indented!("Start it with: moonlite");
            log_end!();
            return Ok(());
        }
    };

    if debug_enabled {
        log_pipe!();
        log_debug!("Lock file {} names PID {}", utils::private_path(&lock_path), pid);
    }

    log_block_start!("Signaling moonlite to reload...");
    kill(Pid::from_raw(pid as i32), Signal::SIGUSR2)
        .with_context(|| format!("Failed to signal moonlite (PID: {pid})"))?;
    log_decorated!("Sent reload signal to moonlite (PID: {pid})");
    log_end!();

    Ok(())
}
