//! Virtual clock: a drop-in stand-in for the platform date type.
//!
//! The clock lets the host freeze or shift "now" and apply a fixed timezone
//! offset while every instance reproduces the full local/UTC getter-setter
//! contract of the original type, legacy quirks included. Time is kept as one
//! authoritative UTC instant per instance; all local accessors convert
//! through the configured offset (platform convention: positive = west of
//! UTC), never the host's real one.
//!
//! Rather than monkey-patching a global constructor, the clock is a service
//! handed to whatever needs time; [`VirtualClock::install`] additionally
//! fills a page-global slot for hosts that still want a drop-in replacement.
//! Installing is idempotent and replaces any previous clock in place.
//!
//! # Example
//!
//! ```rust
//! use envmask::clock::VirtualClock;
//!
//! // Two hours ahead of UTC (offset is minutes west, so negative).
//! let clock = VirtualClock::new(-120);
//! let date = clock.date_from_millis(0);
//! assert_eq!(date.get_utc_hours(), 0);
//! assert_eq!(date.get_hours(), 2);
//! assert_eq!(date.get_timezone_offset(), -120);
//! ```

pub mod fields;

mod date;

pub use date::VirtualDate;

use std::sync::Arc;

use chrono::{DateTime, Local, LocalResult, TimeZone, Utc};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::debug;

use fields::{ms_from_fields, MS_PER_MINUTE};

/// The page-global clock slot for hosts that need a drop-in replacement.
static INSTALLED: Lazy<Mutex<Option<VirtualClock>>> = Lazy::new(|| Mutex::new(None));

pub(crate) type SharedClockState = Arc<Mutex<ClockState>>;

/// Mutable state shared by a clock and every date it hands out.
#[derive(Debug, Clone)]
pub struct ClockState {
    /// When set, "now" is pinned to this instant; otherwise it tracks real
    /// elapsed time.
    pub frozen_time_ms: Option<i64>,
    /// Minutes west of UTC reported by every date instance.
    pub timezone_offset_minutes: i32,
    /// Whether this clock currently occupies the page-global slot.
    pub installed: bool,
}

/// The clock service. Cheap to clone; clones share state, so offset and
/// freeze changes are visible to every previously created date.
#[derive(Debug, Clone)]
pub struct VirtualClock {
    state: SharedClockState,
}

impl VirtualClock {
    /// Clock with the given offset in minutes west of UTC.
    pub fn new(timezone_offset_minutes: i32) -> Self {
        Self {
            state: Arc::new(Mutex::new(ClockState {
                frozen_time_ms: None,
                timezone_offset_minutes,
                installed: false,
            })),
        }
    }

    /// Clock initialized to the host's real offset, as the unconfigured
    /// original type would report.
    pub fn with_host_offset() -> Self {
        Self::new(host_offset_minutes_at(real_now_ms()))
    }

    /// Current virtual time in epoch milliseconds.
    pub fn now_ms(&self) -> i64 {
        self.state
            .lock()
            .frozen_time_ms
            .unwrap_or_else(real_now_ms)
    }

    /// Pin "now" to a fixed instant.
    pub fn freeze(&self, ms: i64) {
        self.state.lock().frozen_time_ms = Some(ms);
    }

    /// Resume tracking real elapsed time.
    pub fn unfreeze(&self) {
        self.state.lock().frozen_time_ms = None;
    }

    pub fn frozen_time_ms(&self) -> Option<i64> {
        self.state.lock().frozen_time_ms
    }

    pub fn set_timezone_offset(&self, minutes: i32) {
        self.state.lock().timezone_offset_minutes = minutes;
    }

    pub fn timezone_offset_minutes(&self) -> i32 {
        self.state.lock().timezone_offset_minutes
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> ClockState {
        self.state.lock().clone()
    }

    pub(crate) fn shared_state(&self) -> SharedClockState {
        Arc::clone(&self.state)
    }

    /// Zero-argument construction: a date at the current virtual time.
    pub fn date(&self) -> VirtualDate {
        let now = self.now_ms();
        VirtualDate::from_utc_millis(now, self.shared_state())
    }

    /// Single-argument construction: an absolute instant, already UTC.
    pub fn date_from_millis(&self, ms: i64) -> VirtualDate {
        VirtualDate::from_utc_millis(ms, self.shared_state())
    }

    /// Civil-field construction (`[year, month, day?, hours?, minutes?,
    /// seconds?, millis?]`, month zero-based, at least two entries).
    ///
    /// The fields are interpreted as local time in the real, unshifted host
    /// zone and then re-expressed under the virtual offset: what a user
    /// typing this date on their own machine would mean, translated into the
    /// spoofed zone. Out-of-range fields roll over; years 0-99 land in the
    /// twentieth century as the original type has it.
    pub fn date_from_fields(&self, fields: &[i64]) -> VirtualDate {
        let mut year = fields.first().copied().unwrap_or(1970);
        if (0..=99).contains(&year) {
            year += 1900;
        }
        let month = fields.get(1).copied().unwrap_or(0);
        let day = fields.get(2).copied().unwrap_or(1);
        let hours = fields.get(3).copied().unwrap_or(0);
        let minutes = fields.get(4).copied().unwrap_or(0);
        let seconds = fields.get(5).copied().unwrap_or(0);
        let millis = fields.get(6).copied().unwrap_or(0);

        let wall_ms = ms_from_fields(year, month, day, hours, minutes, seconds, millis);
        // real-local -> real-UTC -> virtual-local-as-if-UTC
        let real_epoch = host_epoch_from_wall_ms(wall_ms);
        let real_offset = i64::from(host_offset_minutes_at(real_epoch));
        let virtual_offset = i64::from(self.timezone_offset_minutes());
        let utc = real_epoch - real_offset * MS_PER_MINUTE + virtual_offset * MS_PER_MINUTE;
        VirtualDate::from_utc_millis(utc, self.shared_state())
    }

    /// Occupy the page-global slot, replacing any previous clock in place.
    pub fn install(&self) {
        let mut slot = INSTALLED.lock();
        if let Some(previous) = slot.take() {
            previous.state.lock().installed = false;
        }
        self.state.lock().installed = true;
        debug!(
            offset_minutes = self.timezone_offset_minutes(),
            "virtual clock installed"
        );
        *slot = Some(self.clone());
    }

    /// Clear the page-global slot so later code observes the true platform
    /// clock again. Returns the clock that was installed, if any.
    pub fn uninstall() -> Option<VirtualClock> {
        let mut slot = INSTALLED.lock();
        let previous = slot.take();
        if let Some(clock) = &previous {
            clock.state.lock().installed = false;
            debug!("virtual clock uninstalled");
        }
        previous
    }

    /// The currently installed clock, if any.
    pub fn installed() -> Option<VirtualClock> {
        INSTALLED.lock().clone()
    }

    pub fn is_installed(&self) -> bool {
        self.state.lock().installed
    }

    /// Delegate of the original type's string parser. Accepts the ISO and
    /// RFC 2822 forms the underlying platform accepts.
    pub fn parse(input: &str) -> Option<i64> {
        DateTime::parse_from_rfc3339(input)
            .or_else(|_| DateTime::parse_from_rfc2822(input))
            .map(|dt| dt.timestamp_millis())
            .ok()
    }

    /// `Date.UTC` equivalent: civil fields taken as UTC directly.
    pub fn utc_ms(fields: &[i64]) -> i64 {
        let mut year = fields.first().copied().unwrap_or(1970);
        if (0..=99).contains(&year) {
            year += 1900;
        }
        ms_from_fields(
            year,
            fields.get(1).copied().unwrap_or(0),
            fields.get(2).copied().unwrap_or(1),
            fields.get(3).copied().unwrap_or(0),
            fields.get(4).copied().unwrap_or(0),
            fields.get(5).copied().unwrap_or(0),
            fields.get(6).copied().unwrap_or(0),
        )
    }
}

pub(crate) fn real_now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// The host's real timezone offset, in minutes west of UTC, at instant `ms`.
pub(crate) fn host_offset_minutes_at(ms: i64) -> i32 {
    let naive = DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| dt.naive_utc())
        .unwrap_or_else(|| Utc::now().naive_utc());
    -(Local.offset_from_utc_datetime(&naive).local_minus_utc() / 60)
}

/// Epoch milliseconds of a wall-clock reading in the host's real local zone.
/// Ambiguous readings (clock set back) resolve to the earlier instant; times
/// skipped by a forward transition use the surrounding offset.
pub(crate) fn host_epoch_from_wall_ms(wall_ms: i64) -> i64 {
    let naive = match DateTime::<Utc>::from_timestamp_millis(wall_ms) {
        Some(dt) => dt.naive_utc(),
        None => {
            let offset =
                i64::from(Local.offset_from_utc_datetime(&Utc::now().naive_utc()).local_minus_utc());
            return wall_ms - offset * 1_000;
        }
    };
    match Local.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.timestamp_millis(),
        LocalResult::Ambiguous(earliest, _) => earliest.timestamp_millis(),
        LocalResult::None => {
            let offset = i64::from(Local.offset_from_utc_datetime(&naive).local_minus_utc());
            wall_ms - offset * 1_000
        }
    }
}
