//! Command-line argument parsing and processing.
//!
//! Hand-rolled parser for the small moonlite CLI: global flags (`--debug`,
//! `--config <dir>`, `--help`, `--version`) may appear anywhere, and the first
//! positional argument selects a subcommand.

/// Represents the parsed command-line arguments and their intended actions.
#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// Run the daemon with these settings
    Run {
        debug_enabled: bool,
        config_dir: Option<String>,
    },
    /// Fetch and print the current phase once
    PhaseCommand {
        debug_enabled: bool,
        config_dir: Option<String>,
    },
    /// Signal the running daemon to reload
    ReloadCommand {
        debug_enabled: bool,
        config_dir: Option<String>,
    },
    /// Run the daemon on a simulated clock
    Simulate {
        debug_enabled: bool,
        start_time: String,
        end_time: String,
        multiplier: f64,
        config_dir: Option<String>,
    },
    /// Display help information and exit
    ShowHelp,
    /// Display version information and exit
    ShowVersion,
    /// Show help due to unknown arguments and exit
    ShowHelpDueToError,
}

/// Result of parsing command-line arguments.
pub struct ParsedArgs {
    pub action: CliAction,
}

impl ParsedArgs {
    /// Parse command-line arguments (including the program name) into an action.
    pub fn parse<I, S>(args: I) -> ParsedArgs
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args_vec: Vec<String> = args
            .into_iter()
            .skip(1)
            .map(|s| s.as_ref().to_string())
            .collect();

        let mut debug_enabled = false;
        let mut display_help = false;
        let mut display_version = false;
        let mut config_dir: Option<String> = None;
        let mut positionals: Vec<String> = Vec::new();

        let mut idx = 0;
        while idx < args_vec.len() {
            let arg = args_vec[idx].as_str();
            match arg {
                "--debug" | "-d" => debug_enabled = true,
                "--help" | "-h" => display_help = true,
                "--version" | "-V" | "-v" => display_version = true,
                "--config" | "-c" => match args_vec.get(idx + 1) {
                    Some(dir) if !dir.starts_with('-') => {
                        config_dir = Some(dir.clone());
                        idx += 1;
                    }
                    _ => {
                        log_warning!("Missing directory. Usage: moonlite --config <dir>");
                        return Self::error();
                    }
                },
                // Negative multipliers are not flags but still invalid
                _ if arg.starts_with('-') && arg.parse::<f64>().is_err() => {
                    log_warning!("Unknown option: {}", arg);
                    return Self::error();
                }
                _ => positionals.push(arg.to_string()),
            }
            idx += 1;
        }

        // Version and help take precedence over everything else
        if display_version {
            return ParsedArgs {
                action: CliAction::ShowVersion,
            };
        }
        if display_help {
            return ParsedArgs {
                action: CliAction::ShowHelp,
            };
        }

        let Some((command, rest)) = positionals.split_first() else {
            return ParsedArgs {
                action: CliAction::Run {
                    debug_enabled,
                    config_dir,
                },
            };
        };

        let action = match command.as_str() {
            "phase" | "p" if rest.is_empty() => CliAction::PhaseCommand {
                debug_enabled,
                config_dir,
            },
            "reload" | "r" if rest.is_empty() => CliAction::ReloadCommand {
                debug_enabled,
                config_dir,
            },
            "simulate" => match parse_simulate(rest) {
                Some((start_time, end_time, multiplier)) => CliAction::Simulate {
                    debug_enabled,
                    start_time,
                    end_time,
                    multiplier,
                    config_dir,
                },
                None => {
                    log_warning!(
                        "Invalid simulate arguments. Usage: moonlite simulate <start> <end> [multiplier]"
                    );
                    CliAction::ShowHelpDueToError
                }
            },
            "phase" | "p" | "reload" | "r" => {
                log_warning!("'{}' takes no arguments", command);
                CliAction::ShowHelpDueToError
            }
            other => {
                log_warning!("Unknown command: {}", other);
                CliAction::ShowHelpDueToError
            }
        };

        ParsedArgs { action }
    }

    /// Convenience method to parse from std::env::args()
    pub fn from_env() -> ParsedArgs {
        Self::parse(std::env::args())
    }

    fn error() -> ParsedArgs {
        ParsedArgs {
            action: CliAction::ShowHelpDueToError,
        }
    }
}

/// `<start> <end> [multiplier]`, multiplier defaulting to fast-forward.
fn parse_simulate(rest: &[String]) -> Option<(String, String, f64)> {
    match rest {
        [start, end] => Some((start.clone(), end.clone(), 0.0)),
        [start, end, multiplier] => {
            let multiplier = multiplier.parse::<f64>().ok()?;
            if !multiplier.is_finite() || multiplier < 0.0 {
                return None;
            }
            Some((start.clone(), end.clone(), multiplier))
        }
        _ => None,
    }
}

/// Displays version information using custom logging style.
pub fn display_version_info() {
    log_version!();
    log_pipe!();
    crate::logger::write_output(&format!("┗ {}\n", env!("CARGO_PKG_DESCRIPTION")));
}

/// Displays custom help message using logger methods.
pub fn display_help() {
    log_version!();
    log_block_start!(env!("CARGO_PKG_DESCRIPTION"));
    log_block_start!("Usage:");
    log_indented!("moonlite [OPTIONS] [COMMAND]");
    log_block_start!("Options:");
    log_indented!("-c, --config <dir>     Use custom configuration directory");
    log_indented!("-d, --debug            Enable detailed debug output");
    log_indented!("-h, --help             Print help information");
    log_indented!("-V, --version          Print version information");
    log_block_start!("Commands:");
    log_indented!("phase, p               Fetch the moon phase once and show the pattern");
    log_indented!("reload, r              Make the running daemon reload its configuration");
    log_indented!("simulate <start> <end> [multiplier]");
    log_indented!("                       Run on a simulated clock (YYYY-MM-DD HH:MM:SS,");
    log_indented!("                       multiplier 0 = fast-forward)");
    log_end!();
}
