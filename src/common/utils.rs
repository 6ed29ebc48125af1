//! Small shared helpers.

use std::path::Path;

/// Replace the home directory prefix with `~` so logged paths don't leak the user name.
pub fn private_path(path: &Path) -> String {
    if let Some(home) = dirs::home_dir()
        && let Ok(rest) = path.strip_prefix(&home)
    {
        return format!("~/{}", rest.display());
    }
    path.display().to_string()
}

/// Whether a process with the given PID is alive.
pub fn is_process_running(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    // Signal 0 performs the permission and existence check only
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

/// Format a duration in seconds as a short human label ("10 seconds", "24 hours").
pub fn format_seconds(secs: u64) -> String {
    let (value, unit) = if secs >= 3600 && secs % 3600 == 0 {
        (secs / 3600, "hour")
    } else if secs >= 60 && secs % 60 == 0 {
        (secs / 60, "minute")
    } else {
        (secs, "second")
    };
    if value == 1 {
        format!("{value} {unit}")
    } else {
        format!("{value} {unit}s")
    }
}
