//! Application coordinator that manages the complete lifecycle of moonlite.
//!
//! Acquires resources in order (configuration, lock file, signal handlers,
//! backend, sensor, phase client), hands them to the [`Core`] and releases
//! them once the loop returns.
//!
//! - Normal startup: `Moonlite::new(debug_enabled).run()`
//! - Simulation mode: `Moonlite::new(debug_enabled).without_lock().without_headers().run()`

use anyhow::{Context, Result};

use crate::{
    backend::create_backend,
    config::{self, Config},
    core::{Core, CoreParams},
    io::lock::{self, LockOutcome},
    io::signals::setup_signal_handler,
    phase::usno::UsnoClient,
    sensor::create_sensor,
};

/// Builder for configuring and running the daemon.
pub struct Moonlite {
    debug_enabled: bool,
    create_lock: bool,
    show_headers: bool,
}

impl Moonlite {
    /// Create a new runner with defaults matching normal run
    pub fn new(debug_enabled: bool) -> Self {
        Self {
            debug_enabled,
            create_lock: true,
            show_headers: true,
        }
    }

    /// Skip lock file creation (simulation runs next to a live daemon)
    pub fn without_lock(mut self) -> Self {
        self.create_lock = false;
        self
    }

    pub fn without_headers(mut self) -> Self {
        self.show_headers = false;
        self
    }

    /// Run until a shutdown signal (or the end of a simulation).
    pub fn run(self) -> Result<()> {
        if self.show_headers {
            log_version!();
            if self.debug_enabled {
                log_pipe!();
                log_debug!("Debug mode enabled - showing sensor readings and hardware operations");
            }
        }

        let config = Config::load()?;

        let lock_file = if self.create_lock {
            match lock::acquire_lock()? {
                LockOutcome::Acquired(lock_file) => Some(lock_file),
                LockOutcome::AlreadyRunning { pid } => {
                    log_pipe!();
                    match pid {
                        Some(pid) => log_error!("moonlite is already running (PID: {pid})"),
                        None => log_error!("moonlite is already running"),
                    }
                    log_block_start!("Did you mean to:");
                    log_indented!("• Reload configuration: moonlite reload");
                    log_indented!("• Check the current phase: moonlite phase");
                    anyhow::bail!("another moonlite instance is running");
                }
            }
        } else {
            None
        };

        let signal_state = setup_signal_handler(self.debug_enabled)?;

        if let Some(custom_dir) = config::get_custom_config_dir() {
            log_block_start!(
                "Base directory: {}",
                crate::common::utils::private_path(&custom_dir)
            );
        }
        config.log_config();

        let backend = create_backend(&config, self.debug_enabled)
            .context("Failed to initialize the LED backend")?;
        let sensor = create_sensor(&config).context("Failed to initialize the light sensor")?;
        let client = UsnoClient::from_config(&config)?;

        if self.debug_enabled {
            log_debug!("Phase data from {}", client.api_url());
        }
        if let Some(lock_file) = &lock_file {
            log_block_start!("Lock acquired, starting moonlite...");
            if self.debug_enabled {
                log_debug!(
                    "Lock file: {}",
                    crate::common::utils::private_path(lock_file.path())
                );
            }
        }

        let core = Core::new(CoreParams {
            backend,
            sensor,
            source: Box::new(client),
            config,
            signal_state,
            debug_enabled: self.debug_enabled,
        });

        let result = core.execute();

        if let Some(lock_file) = lock_file {
            lock_file.release();
        }
        log_end!();

        result
    }
}
