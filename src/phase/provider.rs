//! Phase table lookup and new-moon extraction.
//!
//! A [`PhaseSource`] returns the raw table of upcoming primary phases; the
//! [`PhaseProvider`] finds the next new moon in it, turns the time remaining
//! into a fraction of a synodic month and hands that to the encoder.
//!
//! Failures are classified for diagnostics only. The control loop treats every
//! [`FetchError`] the same way: show the error pattern and back off.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::Deserialize;

use super::{BitPattern, encoder};
use crate::common::constants::SYNODIC_MONTH_SECONDS;

/// Phase name marking the anchor event.
pub const NEW_MOON: &str = "New Moon";

const ENTRY_DATE_FORMAT: &str = "%Y %b %d";
const ENTRY_TIME_FORMAT: &str = "%H:%M";

/// One row of the phase table, e.g. `{"phase": "New Moon", "date": "2019 Jun 03", "time": "10:02"}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PhaseEntry {
    pub phase: String,
    pub date: String,
    pub time: String,
}

/// Response body of a phase table lookup.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct PhaseTable {
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub phasedata: Vec<PhaseEntry>,
}

impl PhaseTable {
    /// First entry tagged as a new moon, in table order.
    pub fn next_new_moon(&self) -> Option<&PhaseEntry> {
        self.phasedata.iter().find(|entry| entry.phase == NEW_MOON)
    }
}

/// Why a phase lookup produced no pattern.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    /// The remote source could not be reached or the transfer failed.
    #[error("network failure: {0}")]
    Network(String),
    /// The remote source answered but flagged its own error.
    #[error("remote source reported an error")]
    RemoteError,
    /// The table contained no new moon.
    #[error("new moon not found in phase table")]
    NotFound,
    /// The body or the new-moon entry could not be understood.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Successful lookup result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseReading {
    pub new_moon: DateTime<Utc>,
    /// Time until `new_moon` in synodic months. Not clamped.
    pub fraction: f64,
}

/// Source of phase tables.
#[cfg_attr(test, mockall::automock)]
pub trait PhaseSource {
    /// Fetch the table of upcoming phases starting at `date`, tagged with `identity`.
    fn fetch_table(&self, date: NaiveDate, identity: &str) -> Result<PhaseTable, FetchError>;
}

impl<S: PhaseSource + ?Sized> PhaseSource for Box<S> {
    fn fetch_table(&self, date: NaiveDate, identity: &str) -> Result<PhaseTable, FetchError> {
        (**self).fetch_table(date, identity)
    }
}

/// Parse the UT timestamp of a phase table entry.
pub fn parse_entry_time(entry: &PhaseEntry) -> Result<DateTime<Utc>, FetchError> {
    let date = NaiveDate::parse_from_str(entry.date.trim(), ENTRY_DATE_FORMAT).map_err(|e| {
        FetchError::InvalidResponse(format!("bad phase date '{}': {e}", entry.date))
    })?;
    let time = NaiveTime::parse_from_str(entry.time.trim(), ENTRY_TIME_FORMAT).map_err(|e| {
        FetchError::InvalidResponse(format!("bad phase time '{}': {e}", entry.time))
    })?;
    Ok(Utc.from_utc_datetime(&NaiveDateTime::new(date, time)))
}

/// Time from `now` until `new_moon`, in synodic months.
pub fn fraction_until(new_moon: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    (new_moon - now).num_milliseconds() as f64 / (SYNODIC_MONTH_SECONDS as f64 * 1000.0)
}

/// Turns phase tables into patterns.
pub struct PhaseProvider<S> {
    source: S,
    debug_enabled: bool,
}

impl<S: PhaseSource> PhaseProvider<S> {
    pub fn new(source: S, debug_enabled: bool) -> Self {
        Self {
            source,
            debug_enabled,
        }
    }

    /// Look up the next new moon relative to `now`.
    pub fn read_phase(
        &self,
        now: DateTime<Local>,
        identity: &str,
    ) -> Result<PhaseReading, FetchError> {
        let table = self.source.fetch_table(now.date_naive(), identity)?;

        if table.error {
            return Err(FetchError::RemoteError);
        }

        let entry = table.next_new_moon().ok_or(FetchError::NotFound)?;
        let new_moon = parse_entry_time(entry)?;
        let fraction = fraction_until(new_moon, now.with_timezone(&Utc));

        if self.debug_enabled {
            log_debug!("Phase table returned {} entries", table.phasedata.len());
        }

        Ok(PhaseReading { new_moon, fraction })
    }

    /// Look up the next new moon and encode the visible pattern.
    pub fn fetch_phase(
        &self,
        now: DateTime<Local>,
        identity: &str,
    ) -> Result<BitPattern, FetchError> {
        let reading = self.read_phase(now, identity)?;
        let rotation = encoder::rotate_amount(reading.fraction);
        let pattern = encoder::encode(reading.fraction);

        log_indented!(
            "Next new moon: {}",
            reading.new_moon.format("%Y %b %d %H:%M UTC")
        );
        log_indented!("Fraction of lunar month until new moon: {:.4}", reading.fraction);
        log_indented!("Shifting LEDs left: {}", rotation);

        Ok(pattern)
    }
}
