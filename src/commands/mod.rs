//! Command-line command handlers for moonlite.
//!
//! One-shot commands that run instead of (or before) the daemon loop, each in
//! its own submodule.

pub mod phase;
pub mod reload;
pub mod simulate;
