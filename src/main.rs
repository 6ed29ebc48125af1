//! Main application entry point.
//!
//! Parses the command line, sets the configuration directory and dispatches
//! to the daemon runner or a one-shot command. Errors are reported through the
//! logger and turned into a non-zero exit status.

use anyhow::Result;

use moonlite::args::{CliAction, ParsedArgs};
use moonlite::common::constants::{EXIT_FAILURE, EXIT_SUCCESS};
use moonlite::{Moonlite, args, commands, config, log_end, log_error_exit, log_indented};

fn main() {
    let parsed_args = ParsedArgs::from_env();

    let code = match run(parsed_args.action) {
        Ok(code) => code,
        Err(e) => {
            log_error_exit!("{}", e);
            for cause in e.chain().skip(1) {
                log_indented!("{}", cause);
            }
            log_end!();
            EXIT_FAILURE
        }
    };

    std::process::exit(code);
}

fn run(action: CliAction) -> Result<i32> {
    match action {
        CliAction::ShowVersion => {
            args::display_version_info();
        }
        CliAction::ShowHelp => {
            args::display_help();
        }
        CliAction::ShowHelpDueToError => {
            args::display_help();
            return Ok(EXIT_FAILURE);
        }
        CliAction::Run {
            debug_enabled,
            config_dir,
        } => {
            config::set_config_dir(config_dir)?;
            Moonlite::new(debug_enabled).run()?;
        }
        CliAction::PhaseCommand {
            debug_enabled,
            config_dir,
        } => {
            config::set_config_dir(config_dir)?;
            commands::phase::handle_phase_command(debug_enabled)?;
        }
        CliAction::ReloadCommand {
            debug_enabled,
            config_dir,
        } => {
            config::set_config_dir(config_dir)?;
            commands::reload::handle_reload_command(debug_enabled)?;
        }
        CliAction::Simulate {
            debug_enabled,
            start_time,
            end_time,
            multiplier,
            config_dir,
        } => {
            config::set_config_dir(config_dir)?;
            commands::simulate::handle_simulate_command(
                &start_time,
                &end_time,
                multiplier,
                debug_enabled,
            )?;
            Moonlite::new(debug_enabled)
                .without_lock()
                .without_headers()
                .run()?;
        }
    }

    Ok(EXIT_SUCCESS)
}
