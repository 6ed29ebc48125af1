//! Structured logging with box-drawing output.
//!
//! Every line the daemon prints goes through the macros in this module so the
//! output keeps one visual shape:
//!
//! ```text
//! ┏ moonlite v0.3.0 ━━╸
//! ┃
//! ┣ Loaded default configuration
//! ┃   Backend: Terminal
//! ┃
//! ┣ Fetching moon phase table...
//! ┃   Next new moon: 2019 Jun 03 10:02 UTC
//! ┣[INFO] LED arrangement: 011111
//! ╹
//! ```
//!
//! ## Conventions
//!
//! - **`log_block_start!`** opens a new conceptual block (`┃` spacer, then `┣ message`).
//! - **`log_decorated!`** continues the current block (`┣ message`).
//! - **`log_indented!`** prints detail lines under a block (`┃   message`).
//! - **`log_pipe!`** inserts a spacer before a semantic message that starts a block.
//! - **`log_version!`** / **`log_end!`** frame the whole run.
//! - **`log_info!`**, **`log_warning!`**, **`log_error!`**, **`log_debug!`**,
//!   **`log_critical!`** carry a colored `[LEVEL]` tag.
//!
//! Logging can be switched off at runtime with [`Log::set_enabled`], which the
//! tests use to keep their output quiet.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

static LOGGING_ENABLED: AtomicBool = AtomicBool::new(true);

/// Runtime switch and helpers used by the logging macros.
pub struct Log;

impl Log {
    /// Enable or disable all log output.
    pub fn set_enabled(enabled: bool) {
        LOGGING_ENABLED.store(enabled, Ordering::SeqCst);
    }

    /// Check if logging is currently enabled.
    pub fn is_enabled() -> bool {
        LOGGING_ENABLED.load(Ordering::SeqCst)
    }

    /// Timestamp prefix shown while running on a simulated clock.
    ///
    /// Moon phases move over days, so the simulated date is included.
    /// Returns an empty string on the real clock.
    pub fn get_timestamp_prefix() -> String {
        if crate::time_source::is_initialized() && crate::time_source::is_simulated() {
            format!(
                "[{}] ",
                crate::time_source::now().format("%Y-%m-%d %H:%M:%S")
            )
        } else {
            String::new()
        }
    }
}

/// Write an already formatted line to stdout.
pub fn write_output(text: &str) {
    let mut stdout = std::io::stdout().lock();
    let _ = stdout.write_all(text.as_bytes());
    let _ = stdout.flush();
}

/// Shared body of every logging macro: `$head` is the decoration placed
/// before the message, `$lead` an optional line emitted before it.
#[doc(hidden)]
#[macro_export]
macro_rules! __log_line {
    ($lead:expr, $head:expr, $($arg:tt)+) => {{
        use $crate::logger::Log;
        if Log::is_enabled() {
            let prefix = Log::get_timestamp_prefix();
            let message = format!($($arg)+);
            let lead: &str = $lead;
            let formatted = if lead.is_empty() {
                format!("{prefix}{}{message}\n", $head)
            } else {
                format!("{prefix}{lead}\n{prefix}{}{message}\n", $head)
            };
            $crate::logger::write_output(&formatted);
        }
    }};
}

/// Log a message that continues the current block.
#[macro_export]
macro_rules! log_decorated {
    ($($arg:tt)+) => {
        $crate::__log_line!("", "┣ ", $($arg)+)
    };
}

/// Log a detail line under the current block.
#[macro_export]
macro_rules! log_indented {
    ($($arg:tt)+) => {
        $crate::__log_line!("", "┃   ", $($arg)+)
    };
}

/// Log an empty spacer line.
#[macro_export]
macro_rules! log_pipe {
    () => {{
        use $crate::logger::Log;
        if Log::is_enabled() {
            let prefix = Log::get_timestamp_prefix();
            $crate::logger::write_output(&format!("{prefix}┃\n"));
        }
    }};
}

/// Log the start of a new block.
#[macro_export]
macro_rules! log_block_start {
    ($($arg:tt)+) => {
        $crate::__log_line!("┃", "┣ ", $($arg)+)
    };
}

/// Log the application header.
#[macro_export]
macro_rules! log_version {
    () => {
        $crate::__log_line!("", "┏ ", "moonlite v{} ━━╸", env!("CARGO_PKG_VERSION"))
    };
}

/// Log the final termination marker.
#[macro_export]
macro_rules! log_end {
    () => {{
        use $crate::logger::Log;
        if Log::is_enabled() {
            let prefix = Log::get_timestamp_prefix();
            $crate::logger::write_output(&format!("{prefix}╹\n"));
        }
    }};
}

/// Log an informational message.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)+) => {
        $crate::__log_line!("", "┣[\x1b[32mINFO\x1b[0m] ", $($arg)+)
    };
}

/// Log a warning.
#[macro_export]
macro_rules! log_warning {
    ($($arg:tt)+) => {
        $crate::__log_line!("", "┣[\x1b[33mWARNING\x1b[0m] ", $($arg)+)
    };
}

/// Log an error.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)+) => {
        $crate::__log_line!("", "┣[\x1b[31mERROR\x1b[0m] ", $($arg)+)
    };
}

/// Log an error that ends the run, closing the block with `┗`.
#[macro_export]
macro_rules! log_error_exit {
    ($($arg:tt)+) => {
        $crate::__log_line!("┃", "┗[\x1b[31mERROR\x1b[0m] ", $($arg)+)
    };
}

/// Log a debug/operational message.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)+) => {
        $crate::__log_line!("", "┣[\x1b[32mDEBUG\x1b[0m] ", $($arg)+)
    };
}

/// Log a critical message.
#[macro_export]
macro_rules! log_critical {
    ($($arg:tt)+) => {
        $crate::__log_line!("", "┣[\x1b[31mCRITICAL\x1b[0m] ", $($arg)+)
    };
}
