//! Core control loop.
//!
//! Each tick reads the light sensor, and while it is dark asks the retry
//! policy whether the phase data needs refreshing, fetches it if so and shows
//! the resulting pattern. When it turns light the display is blanked and all
//! fetch history is forgotten, so the next dark period starts with a fresh
//! fetch.
//!
//! The [`Core`] owns every piece of mutable loop state. The signal thread only
//! reaches it through the `running` flag and the message channel, which are
//! checked between ticks.

pub mod ambient;
pub mod retry;

use anyhow::Result;
use chrono::{DateTime, Local};
use std::time::Duration;

use crate::{
    backend::IndicatorBackend,
    common::constants::SLEEP_SLICE_MS,
    config::Config,
    io::signals::{SignalMessage, SignalState},
    phase::{BitPattern, FetchError, PhaseProvider, PhaseSource},
    sensor::LightSensor,
    time_source,
};

use ambient::AmbientGate;
use retry::{RetryPolicy, RetryState};

/// Whether the display is currently meant to be on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Dark enough: the phase pattern (or error pattern) is shown.
    DarkActive,
    /// Too bright: the display is blank.
    LightIdle,
}

/// What happened to phase data during a tick.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// No fetch was due, or it was light.
    Skipped,
    Succeeded(BitPattern),
    Failed(FetchError),
}

/// Result of one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub state: LoopState,
    pub fetch: FetchOutcome,
    /// How long to wait before the next tick.
    pub pause: Duration,
}

/// Parameters for creating a Core instance.
pub struct CoreParams {
    pub backend: Box<dyn IndicatorBackend>,
    pub sensor: Box<dyn LightSensor>,
    pub source: Box<dyn PhaseSource>,
    pub config: Config,
    pub signal_state: SignalState,
    pub debug_enabled: bool,
}

/// Control loop state machine.
pub struct Core {
    backend: Box<dyn IndicatorBackend>,
    sensor: Box<dyn LightSensor>,
    provider: PhaseProvider<Box<dyn PhaseSource>>,
    config: Config,
    signal_state: SignalState,
    debug_enabled: bool,
    gate: AmbientGate,
    policy: RetryPolicy,
    retry: RetryState,
    state: LoopState,
    last_written: Option<BitPattern>,
}

impl Core {
    pub fn new(params: CoreParams) -> Self {
        let gate = AmbientGate::from_config(&params.config);
        let policy = RetryPolicy::from_config(&params.config);

        Self {
            backend: params.backend,
            sensor: params.sensor,
            provider: PhaseProvider::new(params.source, params.debug_enabled),
            retry: policy.initial_state(),
            config: params.config,
            signal_state: params.signal_state,
            debug_enabled: params.debug_enabled,
            gate,
            policy,
            // The gate starts dark, so the loop does too
            state: LoopState::DarkActive,
            last_written: None,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn retry_state(&self) -> &RetryState {
        &self.retry
    }

    /// Run one tick at `now`.
    pub fn tick(&mut self, now: DateTime<Local>) -> TickOutcome {
        let dark = match self.sensor.read_raw() {
            Ok(raw) => {
                let dark = self.gate.sense(raw);
                if self.debug_enabled {
                    log_debug!(
                        "Light reading {} ({})",
                        raw,
                        if dark { "dark" } else { "light" }
                    );
                }
                dark
            }
            Err(e) => {
                log_warning!("Failed to read {} sensor: {}", self.sensor.sensor_name(), e);
                self.gate.is_dark()
            }
        };

        if dark {
            self.dark_tick(now)
        } else {
            self.light_tick()
        }
    }

    fn dark_tick(&mut self, now: DateTime<Local>) -> TickOutcome {
        if self.state == LoopState::LightIdle {
            log_block_start!("It is dark, showing the moon");
            self.state = LoopState::DarkActive;
        }

        let mut pause = self.config.poll_interval();
        let mut fetch = FetchOutcome::Skipped;

        if self.policy.should_fetch(&self.retry, now) {
            log_block_start!("Fetching moon phase data...");
            let result = self.provider.fetch_phase(now, &self.config.identity());

            match &result {
                Ok(pattern) => fetch = FetchOutcome::Succeeded(*pattern),
                Err(e) => {
                    log_error!("Failed to fetch moon phase: {}", e);
                    fetch = FetchOutcome::Failed(e.clone());
                    pause += self.config.failure_pause();
                }
            }

            self.policy.record_result(&mut self.retry, now, &result);

            if self.policy.is_exhausted(&self.retry) {
                log_warning!(
                    "Giving up after {} failed attempts until the next scheduled refresh",
                    self.retry.consecutive_failures
                );
            }
        }

        self.write_pattern(self.retry.pattern);

        TickOutcome {
            state: self.state,
            fetch,
            pause,
        }
    }

    fn light_tick(&mut self) -> TickOutcome {
        if self.state == LoopState::DarkActive {
            log_block_start!("It is light, display off");
            self.state = LoopState::LightIdle;
            self.retry = self.policy.initial_state();
        }

        self.write_pattern(BitPattern::OFF);

        TickOutcome {
            state: self.state,
            fetch: FetchOutcome::Skipped,
            pause: self.config.poll_interval(),
        }
    }

    /// Send `pattern` to the backend unless it is already showing.
    ///
    /// A failed write leaves the display state unknown, so the next tick
    /// tries again.
    fn write_pattern(&mut self, pattern: BitPattern) {
        if self.last_written == Some(pattern) {
            return;
        }
        match self.backend.apply_pattern(pattern) {
            Ok(()) => self.last_written = Some(pattern),
            Err(e) => {
                log_error!(
                    "Failed to show pattern {} on {}: {}",
                    pattern,
                    self.backend.backend_name(),
                    e
                );
                self.last_written = None;
            }
        }
    }

    /// Apply a new configuration and start fetch history over.
    ///
    /// Backend, sensor and phase source settings only take effect on restart.
    pub fn apply_config(&mut self, new_config: Config) {
        if new_config.backend() != self.config.backend()
            || new_config.gpio_pins() != self.config.gpio_pins()
            || new_config.sensor() != self.config.sensor()
            || new_config.sensor_pin() != self.config.sensor_pin()
            || new_config.api_url() != self.config.api_url()
            || new_config.request_timeout() != self.config.request_timeout()
        {
            log_warning!("Hardware and phase source changes take effect after a restart");
        }

        self.gate.set_thresholds(
            new_config.dark_upper_threshold(),
            new_config.dark_lower_threshold(),
        );
        self.policy = RetryPolicy::from_config(&new_config);
        self.retry = self.policy.initial_state();
        self.config = new_config;

        log_block_start!("Configuration reloaded");
        if self.debug_enabled {
            self.config.log_config();
        }
    }

    /// Handle queued signal messages. Returns whether a new configuration
    /// was applied.
    fn process_signals(&mut self) -> bool {
        let mut reloaded = false;
        while let Ok(message) = self.signal_state.signal_receiver.try_recv() {
            match message {
                SignalMessage::Reload => match crate::config::load() {
                    Ok(config) => {
                        self.apply_config(config);
                        reloaded = true;
                    }
                    Err(e) => {
                        log_error!("Failed to reload config: {e:#}");
                        log_indented!("Continuing with previous configuration");
                    }
                },
                SignalMessage::Shutdown => self.signal_state.request_shutdown(),
            }
        }
        reloaded
    }

    fn should_continue(&self) -> bool {
        self.signal_state.is_running() && !time_source::simulation_ended()
    }

    /// Wait out `duration`, waking early for shutdown or a reload.
    fn pause(&mut self, duration: Duration) {
        if time_source::is_simulated() {
            time_source::sleep(duration);
            return;
        }

        let slice = Duration::from_millis(SLEEP_SLICE_MS);
        let mut remaining = duration;
        while !remaining.is_zero() && self.should_continue() {
            // A reload ends the pause so the next tick runs with the new settings
            if self.process_signals() || !self.signal_state.is_running() {
                return;
            }
            let step = remaining.min(slice);
            time_source::sleep(step);
            remaining -= step;
        }
    }

    /// Run ticks until shutdown, then blank the display and release the hardware.
    pub fn execute(mut self) -> Result<()> {
        log_block_start!(
            "Showing the moon on the {} backend",
            self.backend.backend_name()
        );
        log_indented!("Ambient light from the {} sensor", self.sensor.sensor_name());

        while self.should_continue() {
            self.process_signals();
            if !self.signal_state.is_running() {
                break;
            }

            let outcome = self.tick(time_source::now());
            self.pause(outcome.pause);
        }

        log_block_start!("Shutting down moonlite...");
        if let Err(e) = self.backend.apply_pattern(BitPattern::OFF) {
            log_warning!("Failed to blank display: {e}");
        }
        self.backend.cleanup(self.debug_enabled);
        self.sensor.cleanup(self.debug_enabled);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::{PhaseEntry, PhaseTable, provider::NEW_MOON};
    use chrono::{Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    const ERROR: BitPattern = BitPattern::new(0b001100);

    /// Backend recording every pattern it is given.
    struct RecordingBackend {
        writes: Rc<RefCell<Vec<BitPattern>>>,
        /// Number of upcoming writes that fail.
        failing_writes: u32,
    }

    impl IndicatorBackend for RecordingBackend {
        fn apply_pattern(&mut self, pattern: BitPattern) -> Result<()> {
            self.writes.borrow_mut().push(pattern);
            if self.failing_writes > 0 {
                self.failing_writes -= 1;
                anyhow::bail!("write failed");
            }
            Ok(())
        }

        fn backend_name(&self) -> &'static str {
            "Recording"
        }
    }

    /// Sensor replaying a script of readings, repeating the last one.
    struct ScriptedSensor {
        readings: Rc<RefCell<VecDeque<Result<u32>>>>,
        last: u32,
    }

    impl LightSensor for ScriptedSensor {
        fn read_raw(&mut self) -> Result<u32> {
            match self.readings.borrow_mut().pop_front() {
                Some(Ok(raw)) => {
                    self.last = raw;
                    Ok(raw)
                }
                Some(Err(e)) => Err(e),
                None => Ok(self.last),
            }
        }

        fn sensor_name(&self) -> &'static str {
            "Scripted"
        }
    }

    /// Phase source whose answer can be switched between ticks.
    struct SwitchableSource {
        new_moon: Rc<RefCell<Option<DateTime<Utc>>>>,
        calls: Rc<RefCell<u32>>,
    }

    impl PhaseSource for SwitchableSource {
        fn fetch_table(&self, _date: NaiveDate, _identity: &str) -> Result<PhaseTable, FetchError> {
            *self.calls.borrow_mut() += 1;
            match *self.new_moon.borrow() {
                Some(at) => Ok(PhaseTable {
                    error: false,
                    phasedata: vec![PhaseEntry {
                        phase: NEW_MOON.to_string(),
                        date: at.format("%Y %b %d").to_string(),
                        time: at.format("%H:%M").to_string(),
                    }],
                }),
                None => Err(FetchError::Network("unreachable".to_string())),
            }
        }
    }

    struct Harness {
        core: Core,
        writes: Rc<RefCell<Vec<BitPattern>>>,
        readings: Rc<RefCell<VecDeque<Result<u32>>>>,
        new_moon: Rc<RefCell<Option<DateTime<Utc>>>>,
        calls: Rc<RefCell<u32>>,
    }

    fn start() -> DateTime<Local> {
        Local.with_ymd_and_hms(2019, 5, 20, 22, 0, 0).unwrap()
    }

    fn secs(n: i64) -> ChronoDuration {
        ChronoDuration::seconds(n)
    }

    fn harness(config: Config, failing_writes: u32) -> Harness {
        crate::logger::Log::set_enabled(false);
        let writes = Rc::new(RefCell::new(Vec::new()));
        let readings = Rc::new(RefCell::new(VecDeque::new()));
        let new_moon = Rc::new(RefCell::new(None));
        let calls = Rc::new(RefCell::new(0));

        let core = Core::new(CoreParams {
            backend: Box::new(RecordingBackend {
                writes: writes.clone(),
                failing_writes,
            }),
            sensor: Box::new(ScriptedSensor {
                readings: readings.clone(),
                last: 100,
            }),
            source: Box::new(SwitchableSource {
                new_moon: new_moon.clone(),
                calls: calls.clone(),
            }),
            config,
            signal_state: SignalState::detached(),
            debug_enabled: false,
        });

        Harness {
            core,
            writes,
            readings,
            new_moon,
            calls,
        }
    }

    impl Harness {
        fn set_new_moon_in(&self, from: DateTime<Local>, ahead: ChronoDuration) {
            *self.new_moon.borrow_mut() = Some(from.with_timezone(&Utc) + ahead);
        }

        fn push_reading(&self, raw: u32) {
            self.readings.borrow_mut().push_back(Ok(raw));
        }
    }

    #[test]
    fn test_dark_tick_fetches_and_shows_phase() {
        let mut h = harness(Config::default(), 0);
        h.set_new_moon_in(start(), ChronoDuration::days(14) + ChronoDuration::hours(22));

        let outcome = h.core.tick(start());

        assert_eq!(outcome.state, LoopState::DarkActive);
        assert_eq!(outcome.fetch, FetchOutcome::Succeeded(BitPattern::FULL));
        assert_eq!(outcome.pause, Duration::from_secs(1));
        assert_eq!(*h.writes.borrow(), vec![BitPattern::FULL]);
        assert_eq!(h.core.retry_state().consecutive_failures, 0);
    }

    #[test]
    fn test_transport_error_shows_error_pattern() {
        let mut h = harness(Config::default(), 0);

        let outcome = h.core.tick(start());

        assert!(matches!(outcome.fetch, FetchOutcome::Failed(FetchError::Network(_))));
        assert_eq!(outcome.pause, Duration::from_secs(2));
        assert_eq!(*h.writes.borrow(), vec![ERROR]);
        assert_eq!(h.core.retry_state().consecutive_failures, 1);
    }

    #[test]
    fn test_pattern_written_only_on_change() {
        let mut h = harness(Config::default(), 0);
        h.set_new_moon_in(start(), ChronoDuration::days(7) + ChronoDuration::hours(9));

        for i in 0..5 {
            h.core.tick(start() + secs(i));
        }

        assert_eq!(*h.calls.borrow(), 1);
        assert_eq!(h.writes.borrow().len(), 1);
    }

    #[test]
    fn test_light_blanks_and_resets() {
        let mut h = harness(Config::default(), 0);
        h.core.tick(start());
        h.core.tick(start() + secs(11));
        assert_eq!(h.core.retry_state().consecutive_failures, 2);

        h.push_reading(10);
        let outcome = h.core.tick(start() + secs(12));

        assert_eq!(outcome.state, LoopState::LightIdle);
        assert_eq!(h.writes.borrow().last(), Some(&BitPattern::OFF));
        assert_eq!(*h.core.retry_state(), RetryState::new(ERROR));
        assert_eq!(*h.calls.borrow(), 2);
    }

    #[test]
    fn test_light_idle_never_fetches() {
        let mut h = harness(Config::default(), 0);
        h.push_reading(0);
        for i in 0..10 {
            let outcome = h.core.tick(start() + secs(i * 60));
            assert_eq!(outcome.state, LoopState::LightIdle);
            assert_eq!(outcome.fetch, FetchOutcome::Skipped);
        }
        assert_eq!(*h.calls.borrow(), 0);
        assert_eq!(*h.writes.borrow(), vec![BitPattern::OFF]);
    }

    #[test]
    fn test_return_to_dark_fetches_immediately() {
        let mut h = harness(Config::default(), 0);
        h.set_new_moon_in(start(), ChronoDuration::days(14) + ChronoDuration::hours(22));
        h.core.tick(start());
        h.push_reading(0);
        h.core.tick(start() + secs(1));
        h.push_reading(100);

        let outcome = h.core.tick(start() + secs(2));

        assert_eq!(outcome.state, LoopState::DarkActive);
        assert!(matches!(outcome.fetch, FetchOutcome::Succeeded(_)));
        assert_eq!(*h.calls.borrow(), 2);
        assert_eq!(
            *h.writes.borrow(),
            vec![BitPattern::FULL, BitPattern::OFF, BitPattern::FULL]
        );
    }

    #[test]
    fn test_hysteresis_band_keeps_state() {
        let mut h = harness(Config::default(), 0);
        h.push_reading(80);
        assert_eq!(h.core.tick(start()).state, LoopState::DarkActive);

        h.push_reading(10);
        h.push_reading(80);
        h.core.tick(start() + secs(1));
        assert_eq!(h.core.tick(start() + secs(2)).state, LoopState::LightIdle);
    }

    #[test]
    fn test_failures_stop_at_limit() {
        let config = Config {
            error_limit: Some(3),
            ..Config::default()
        };
        let mut h = harness(config, 0);

        for i in 0..20 {
            h.core.tick(start() + secs(i * 11));
        }

        assert_eq!(*h.calls.borrow(), 3);
        assert_eq!(h.core.retry_state().consecutive_failures, 3);
    }

    #[test]
    fn test_recovery_after_failure() {
        let mut h = harness(Config::default(), 0);
        h.core.tick(start());
        h.set_new_moon_in(start(), ChronoDuration::days(7) + ChronoDuration::hours(9));

        // Within backoff: still showing the error pattern
        let outcome = h.core.tick(start() + secs(5));
        assert_eq!(outcome.fetch, FetchOutcome::Skipped);

        let outcome = h.core.tick(start() + secs(11));
        assert!(matches!(outcome.fetch, FetchOutcome::Succeeded(_)));
        assert_eq!(*h.writes.borrow(), vec![ERROR, BitPattern::new(0b111000)]);
    }

    #[test]
    fn test_sensor_error_keeps_ambient_state() {
        let mut h = harness(Config::default(), 0);
        h.push_reading(0);
        h.core.tick(start());
        h.readings
            .borrow_mut()
            .push_back(Err(anyhow::anyhow!("sensor unplugged")));

        let outcome = h.core.tick(start() + secs(1));
        assert_eq!(outcome.state, LoopState::LightIdle);
    }

    #[test]
    fn test_failed_write_is_retried_next_tick() {
        let mut h = harness(Config::default(), 1);
        h.set_new_moon_in(start(), ChronoDuration::days(14) + ChronoDuration::hours(22));

        h.core.tick(start());
        h.core.tick(start() + secs(1));
        h.core.tick(start() + secs(2));

        assert_eq!(*h.writes.borrow(), vec![BitPattern::FULL, BitPattern::FULL]);
    }

    #[test]
    fn test_failed_blank_is_retried_until_display_is_off() {
        let mut h = harness(Config::default(), 0);
        h.set_new_moon_in(start(), ChronoDuration::days(14) + ChronoDuration::hours(22));
        h.core.tick(start());

        // The first blanking write fails
        h.core.backend = Box::new(RecordingBackend {
            writes: h.writes.clone(),
            failing_writes: 1,
        });
        for i in 1..=5 {
            h.push_reading(0);
            assert_eq!(h.core.tick(start() + secs(i)).state, LoopState::LightIdle);
        }

        assert_eq!(
            *h.writes.borrow(),
            vec![BitPattern::FULL, BitPattern::OFF, BitPattern::OFF]
        );
    }

    #[test]
    fn test_pause_wakes_for_queued_shutdown() {
        let mut h = harness(Config::default(), 0);
        h.core
            .signal_state
            .signal_sender
            .send(SignalMessage::Shutdown)
            .unwrap();

        let started = std::time::Instant::now();
        h.core.pause(Duration::from_secs(30));

        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!h.core.signal_state.is_running());
    }

    #[test]
    #[serial_test::serial]
    fn test_pause_applies_reload_without_waiting() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_dir = temp_dir.path().join("moonlite");
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(config_dir.join("moonlite.toml"), "poll_interval = 7\n").unwrap();

        let mut h = harness(Config::default(), 0);
        h.core.tick(start());
        h.core
            .signal_state
            .signal_sender
            .send(SignalMessage::Reload)
            .unwrap();

        let original = std::env::var("XDG_CONFIG_HOME").ok();
        unsafe {
            std::env::set_var("XDG_CONFIG_HOME", temp_dir.path());
        }

        let started = std::time::Instant::now();
        h.core.pause(Duration::from_secs(30));
        let elapsed = started.elapsed();

        unsafe {
            match original {
                Some(val) => std::env::set_var("XDG_CONFIG_HOME", val),
                None => std::env::remove_var("XDG_CONFIG_HOME"),
            }
        }

        assert!(elapsed < Duration::from_secs(5));
        assert_eq!(h.core.config.poll_interval(), Duration::from_secs(7));
        assert_eq!(h.core.retry_state().consecutive_failures, 0);
        assert!(h.core.signal_state.is_running());
    }

    #[test]
    fn test_apply_config_resets_history_and_thresholds() {
        let mut h = harness(Config::default(), 0);
        h.core.tick(start());
        assert_eq!(h.core.retry_state().consecutive_failures, 1);

        h.core.apply_config(Config {
            dark_upper_threshold: Some(500),
            dark_lower_threshold: Some(400),
            ..Config::default()
        });
        assert_eq!(h.core.retry_state().consecutive_failures, 0);

        // 100 is now below the lower threshold
        assert_eq!(h.core.tick(start() + secs(1)).state, LoopState::LightIdle);
    }
}
