//! Clock abstraction for real and simulated time.
//!
//! The control loop reads the current time and pauses between ticks through
//! this module. In normal operation that is the system clock; under
//! `moonlite simulate` a [`SimulatedTimeSource`] is installed instead so that
//! days of refresh cycles can be watched in seconds.

use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveDateTime, TimeZone};
use once_cell::sync::OnceCell;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

static TIME_SOURCE: OnceCell<Arc<dyn TimeSource>> = OnceCell::new();

/// Trait for abstracting time operations
pub trait TimeSource: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Local>;

    /// Sleep for the specified duration (or simulate it)
    fn sleep(&self, duration: StdDuration);

    /// Check if this is a simulated time source
    fn is_simulated(&self) -> bool;

    /// Check if simulation has ended (always false for real time)
    fn is_ended(&self) -> bool {
        false
    }
}

/// The system clock.
pub struct RealTimeSource;

impl TimeSource for RealTimeSource {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    fn sleep(&self, duration: StdDuration) {
        std::thread::sleep(duration);
    }

    fn is_simulated(&self) -> bool {
        false
    }
}

/// Simulated clock running between a start and an end time.
///
/// With a positive multiplier simulated time flows `multiplier` times faster
/// than real time. A multiplier of `0.0` selects fast-forward: every sleep
/// advances the clock instantly by the requested amount.
pub struct SimulatedTimeSource {
    end_time: DateTime<Local>,
    time_multiplier: f64,
    current: Mutex<DateTime<Local>>,
}

impl SimulatedTimeSource {
    /// Create a simulated clock. Negative multipliers fall back to 3600x.
    pub fn new(start_time: DateTime<Local>, end_time: DateTime<Local>, multiplier: f64) -> Self {
        let time_multiplier = if multiplier < 0.0 { 3600.0 } else { multiplier };
        Self {
            end_time,
            time_multiplier,
            current: Mutex::new(start_time),
        }
    }

    fn is_fast_forward(&self) -> bool {
        self.time_multiplier == 0.0
    }

    fn current_time(&self) -> DateTime<Local> {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl TimeSource for SimulatedTimeSource {
    fn now(&self) -> DateTime<Local> {
        self.current_time()
    }

    fn sleep(&self, duration: StdDuration) {
        let remaining = (self.end_time - self.current_time())
            .to_std()
            .unwrap_or(StdDuration::ZERO);
        let step = duration.min(remaining);
        if step.is_zero() {
            return;
        }

        if self.is_fast_forward() {
            // Yield so the log output keeps up
            std::thread::sleep(StdDuration::from_millis(1));
        } else {
            std::thread::sleep(StdDuration::from_secs_f64(
                step.as_secs_f64() / self.time_multiplier,
            ));
        }

        let advance = ChronoDuration::from_std(step).unwrap_or(ChronoDuration::zero());
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current = (*current + advance).min(self.end_time);
    }

    fn is_simulated(&self) -> bool {
        true
    }

    fn is_ended(&self) -> bool {
        self.current_time() >= self.end_time
    }
}

/// Initialize the global time source (call once at startup)
pub fn init_time_source(source: Arc<dyn TimeSource>) {
    TIME_SOURCE.set(source).ok();
}

/// Check if the time source has been initialized
pub fn is_initialized() -> bool {
    TIME_SOURCE.get().is_some()
}

fn source() -> &'static Arc<dyn TimeSource> {
    TIME_SOURCE.get_or_init(|| Arc::new(RealTimeSource))
}

/// Current time from the global time source
pub fn now() -> DateTime<Local> {
    source().now()
}

/// Sleep using the global time source
pub fn sleep(duration: StdDuration) {
    source().sleep(duration)
}

/// Check if we're running in simulation mode
pub fn is_simulated() -> bool {
    source().is_simulated()
}

/// Check if simulation has reached its end time (always false for real time)
pub fn simulation_ended() -> bool {
    source().is_ended()
}

/// Parse a local datetime in the format "YYYY-MM-DD HH:MM:SS"
pub fn parse_datetime(s: &str) -> Result<DateTime<Local>, String> {
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map_err(|e| format!("Invalid datetime format: {e}. Use YYYY-MM-DD HH:MM:SS"))?;
    Local
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| "Ambiguous or invalid local time".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(s: &str) -> DateTime<Local> {
        parse_datetime(s).unwrap()
    }

    #[test]
    fn test_fast_forward_advances_by_requested_duration() {
        let source = SimulatedTimeSource::new(
            local("2024-01-01 20:00:00"),
            local("2024-01-03 20:00:00"),
            0.0,
        );
        source.sleep(StdDuration::from_secs(3600));
        assert_eq!(source.now(), local("2024-01-01 21:00:00"));
        assert!(!source.is_ended());
    }

    #[test]
    fn test_simulation_caps_at_end_time() {
        let source = SimulatedTimeSource::new(
            local("2024-01-01 20:00:00"),
            local("2024-01-01 20:30:00"),
            0.0,
        );
        source.sleep(StdDuration::from_secs(7200));
        assert_eq!(source.now(), local("2024-01-01 20:30:00"));
        assert!(source.is_ended());

        // Further sleeps are no-ops
        source.sleep(StdDuration::from_secs(60));
        assert_eq!(source.now(), local("2024-01-01 20:30:00"));
    }

    #[test]
    fn test_parse_datetime_rejects_bad_format() {
        assert!(parse_datetime("2024/01/01 20:00").is_err());
        assert!(parse_datetime("2024-01-01 20:00:00").is_ok());
    }
}
