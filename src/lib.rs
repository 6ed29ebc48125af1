//! # Moonlite Library
//!
//! Internal library for the moonlite binary application
//!
//! This library exists to enable testing of the control loop and provide clean
//! separation between CLI dispatch (main.rs) and application logic.
//!
//! ## Architecture
//!
//! - **Entry Point**: `Moonlite` struct acquires resources and runs the daemon
//! - **Core Logic**: `core` module with the control loop, retry policy and ambient gate
//! - **Phase**: `phase` module turning the next new moon into a six-bit pattern
//! - **Hardware**: `backend` (LED outputs) and `sensor` (ambient light) modules
//! - **Configuration**: `config` module for TOML-based settings
//! - **Commands**: `commands` module for CLI subcommands (phase, reload, simulate)
//! - **Infrastructure**: lock file, signal handling, clock abstraction and logging

// Import macros from logger module for use in all submodules
#[macro_use]
pub mod logger;

pub mod args;
pub mod backend;
pub mod commands;
pub mod common;
pub mod config;
pub mod core;
pub mod io;
pub mod phase;
pub mod sensor;
pub mod time_source;

mod moonlite;

pub use moonlite::Moonlite;
