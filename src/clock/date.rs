//! The date instance type handed out by the virtual clock.
//!
//! Every instance stores one authoritative UTC instant. Local getters project
//! `utc - offset` and read the field off that shifted instant; local setters
//! shift, mutate, and inverse-shift; UTC accessors act on `utc` directly.
//! The offset is read live from the owning clock's state, so changing the
//! clock's timezone re-projects every existing instance.

use std::fmt;

use super::fields::{fields_from_ms, ms_from_fields, CalendarFields, MS_PER_MINUTE};
use super::SharedClockState;

const WEEKDAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// A date under the virtual clock's offset.
#[derive(Clone)]
pub struct VirtualDate {
    utc: i64,
    state: SharedClockState,
}

impl VirtualDate {
    pub(crate) fn from_utc_millis(utc: i64, state: SharedClockState) -> Self {
        Self { utc, state }
    }

    fn offset_minutes(&self) -> i32 {
        self.state.lock().timezone_offset_minutes
    }

    fn offset_ms(&self) -> i64 {
        i64::from(self.offset_minutes()) * MS_PER_MINUTE
    }

    fn local_fields(&self) -> CalendarFields {
        fields_from_ms(self.utc - self.offset_ms())
    }

    fn utc_fields(&self) -> CalendarFields {
        fields_from_ms(self.utc)
    }

    /// Rebuild the instant from its local projection with one field replaced.
    fn set_local(&mut self, rebuild: impl FnOnce(CalendarFields) -> i64) -> i64 {
        let offset = self.offset_ms();
        let local = rebuild(fields_from_ms(self.utc - offset));
        self.utc = local + offset;
        self.utc
    }

    fn set_utc(&mut self, rebuild: impl FnOnce(CalendarFields) -> i64) -> i64 {
        self.utc = rebuild(fields_from_ms(self.utc));
        self.utc
    }

    // ---- epoch accessors ----

    pub fn get_time(&self) -> i64 {
        self.utc
    }

    pub fn set_time(&mut self, ms: i64) -> i64 {
        self.utc = ms;
        self.utc
    }

    /// Primitive value, identical to [`get_time`](Self::get_time).
    pub fn value_of(&self) -> i64 {
        self.utc
    }

    /// Always the configured virtual offset, never the host's real one.
    pub fn get_timezone_offset(&self) -> i32 {
        self.offset_minutes()
    }

    // ---- local getters ----

    pub fn get_full_year(&self) -> i64 {
        self.local_fields().year
    }

    pub fn get_month(&self) -> u32 {
        self.local_fields().month
    }

    pub fn get_date(&self) -> u32 {
        self.local_fields().day
    }

    pub fn get_day(&self) -> u32 {
        self.local_fields().weekday
    }

    pub fn get_hours(&self) -> u32 {
        self.local_fields().hours
    }

    pub fn get_minutes(&self) -> u32 {
        self.local_fields().minutes
    }

    pub fn get_seconds(&self) -> u32 {
        self.local_fields().seconds
    }

    pub fn get_milliseconds(&self) -> u32 {
        self.local_fields().millis
    }

    // ---- UTC getters ----

    pub fn get_utc_full_year(&self) -> i64 {
        self.utc_fields().year
    }

    pub fn get_utc_month(&self) -> u32 {
        self.utc_fields().month
    }

    pub fn get_utc_date(&self) -> u32 {
        self.utc_fields().day
    }

    pub fn get_utc_day(&self) -> u32 {
        self.utc_fields().weekday
    }

    pub fn get_utc_hours(&self) -> u32 {
        self.utc_fields().hours
    }

    pub fn get_utc_minutes(&self) -> u32 {
        self.utc_fields().minutes
    }

    pub fn get_utc_seconds(&self) -> u32 {
        self.utc_fields().seconds
    }

    pub fn get_utc_milliseconds(&self) -> u32 {
        self.utc_fields().millis
    }

    // ---- local setters (out-of-range values roll over) ----
    //
    // Trailing `Option` arguments mirror the optional parameters of the
    // platform setters; `None` keeps the field's current value.

    pub fn set_full_year(&mut self, year: i64, month: Option<i64>, day: Option<i64>) -> i64 {
        self.set_local(|f| {
            ms_from_fields(
                year,
                month.unwrap_or(i64::from(f.month)),
                day.unwrap_or(i64::from(f.day)),
                f.hours.into(),
                f.minutes.into(),
                f.seconds.into(),
                f.millis.into(),
            )
        })
    }

    pub fn set_month(&mut self, month: i64, day: Option<i64>) -> i64 {
        self.set_local(|f| {
            ms_from_fields(
                f.year,
                month,
                day.unwrap_or(i64::from(f.day)),
                f.hours.into(),
                f.minutes.into(),
                f.seconds.into(),
                f.millis.into(),
            )
        })
    }

    pub fn set_date(&mut self, day: i64) -> i64 {
        self.set_local(|f| {
            ms_from_fields(
                f.year,
                f.month.into(),
                day,
                f.hours.into(),
                f.minutes.into(),
                f.seconds.into(),
                f.millis.into(),
            )
        })
    }

    pub fn set_hours(
        &mut self,
        hours: i64,
        minutes: Option<i64>,
        seconds: Option<i64>,
        millis: Option<i64>,
    ) -> i64 {
        self.set_local(|f| {
            ms_from_fields(
                f.year,
                f.month.into(),
                f.day.into(),
                hours,
                minutes.unwrap_or(i64::from(f.minutes)),
                seconds.unwrap_or(i64::from(f.seconds)),
                millis.unwrap_or(i64::from(f.millis)),
            )
        })
    }

    pub fn set_minutes(&mut self, minutes: i64, seconds: Option<i64>, millis: Option<i64>) -> i64 {
        self.set_local(|f| {
            ms_from_fields(
                f.year,
                f.month.into(),
                f.day.into(),
                f.hours.into(),
                minutes,
                seconds.unwrap_or(i64::from(f.seconds)),
                millis.unwrap_or(i64::from(f.millis)),
            )
        })
    }

    pub fn set_seconds(&mut self, seconds: i64, millis: Option<i64>) -> i64 {
        self.set_local(|f| {
            ms_from_fields(
                f.year,
                f.month.into(),
                f.day.into(),
                f.hours.into(),
                f.minutes.into(),
                seconds,
                millis.unwrap_or(i64::from(f.millis)),
            )
        })
    }

    pub fn set_milliseconds(&mut self, millis: i64) -> i64 {
        self.set_local(|f| {
            ms_from_fields(
                f.year,
                f.month.into(),
                f.day.into(),
                f.hours.into(),
                f.minutes.into(),
                f.seconds.into(),
                millis,
            )
        })
    }

    // ---- UTC setters ----

    pub fn set_utc_full_year(&mut self, year: i64, month: Option<i64>, day: Option<i64>) -> i64 {
        self.set_utc(|f| {
            ms_from_fields(
                year,
                month.unwrap_or(i64::from(f.month)),
                day.unwrap_or(i64::from(f.day)),
                f.hours.into(),
                f.minutes.into(),
                f.seconds.into(),
                f.millis.into(),
            )
        })
    }

    pub fn set_utc_month(&mut self, month: i64, day: Option<i64>) -> i64 {
        self.set_utc(|f| {
            ms_from_fields(
                f.year,
                month,
                day.unwrap_or(i64::from(f.day)),
                f.hours.into(),
                f.minutes.into(),
                f.seconds.into(),
                f.millis.into(),
            )
        })
    }

    pub fn set_utc_date(&mut self, day: i64) -> i64 {
        self.set_utc(|f| {
            ms_from_fields(
                f.year,
                f.month.into(),
                day,
                f.hours.into(),
                f.minutes.into(),
                f.seconds.into(),
                f.millis.into(),
            )
        })
    }

    pub fn set_utc_hours(
        &mut self,
        hours: i64,
        minutes: Option<i64>,
        seconds: Option<i64>,
        millis: Option<i64>,
    ) -> i64 {
        self.set_utc(|f| {
            ms_from_fields(
                f.year,
                f.month.into(),
                f.day.into(),
                hours,
                minutes.unwrap_or(i64::from(f.minutes)),
                seconds.unwrap_or(i64::from(f.seconds)),
                millis.unwrap_or(i64::from(f.millis)),
            )
        })
    }

    pub fn set_utc_minutes(
        &mut self,
        minutes: i64,
        seconds: Option<i64>,
        millis: Option<i64>,
    ) -> i64 {
        self.set_utc(|f| {
            ms_from_fields(
                f.year,
                f.month.into(),
                f.day.into(),
                f.hours.into(),
                minutes,
                seconds.unwrap_or(i64::from(f.seconds)),
                millis.unwrap_or(i64::from(f.millis)),
            )
        })
    }

    pub fn set_utc_seconds(&mut self, seconds: i64, millis: Option<i64>) -> i64 {
        self.set_utc(|f| {
            ms_from_fields(
                f.year,
                f.month.into(),
                f.day.into(),
                f.hours.into(),
                f.minutes.into(),
                seconds,
                millis.unwrap_or(i64::from(f.millis)),
            )
        })
    }

    pub fn set_utc_milliseconds(&mut self, millis: i64) -> i64 {
        self.set_utc(|f| {
            ms_from_fields(
                f.year,
                f.month.into(),
                f.day.into(),
                f.hours.into(),
                f.minutes.into(),
                f.seconds.into(),
                millis,
            )
        })
    }

    // ---- legacy two-digit year methods (quirk preserved) ----

    pub fn get_year(&self) -> i64 {
        self.get_full_year() - 1900
    }

    pub fn set_year(&mut self, year: i64) -> i64 {
        self.set_full_year(year + 1900, None, None)
    }

    // ---- string renderings ----

    /// `"Wed Jan 07 2026 13:05:09 GMT+0200"` from the local projection.
    pub fn to_date_time_string(&self) -> String {
        let f = self.local_fields();
        format!(
            "{} {} {:02} {} {:02}:{:02}:{:02} {}",
            WEEKDAYS[f.weekday as usize],
            MONTHS[f.month as usize],
            f.day,
            f.year,
            f.hours,
            f.minutes,
            f.seconds,
            timezone_suffix(self.offset_minutes()),
        )
    }

    /// `"Wed Jan 07 2026"` from the local projection.
    pub fn to_date_string(&self) -> String {
        let f = self.local_fields();
        format!(
            "{} {} {:02} {}",
            WEEKDAYS[f.weekday as usize], MONTHS[f.month as usize], f.day, f.year
        )
    }

    pub fn to_iso_string(&self) -> String {
        let f = self.utc_fields();
        format!(
            "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
            f.year,
            f.month + 1,
            f.day,
            f.hours,
            f.minutes,
            f.seconds,
            f.millis
        )
    }

    pub fn to_utc_string(&self) -> String {
        let f = self.utc_fields();
        format!(
            "{}, {:02} {} {} {:02}:{:02}:{:02} GMT",
            WEEKDAYS[f.weekday as usize],
            f.day,
            MONTHS[f.month as usize],
            f.year,
            f.hours,
            f.minutes,
            f.seconds
        )
    }

    pub fn to_json(&self) -> String {
        self.to_iso_string()
    }
}

impl fmt::Display for VirtualDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_date_time_string())
    }
}

impl fmt::Debug for VirtualDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VirtualDate(utc={}, offset={})",
            self.utc,
            self.offset_minutes()
        )
    }
}

/// `GMT±HHMM` suffix for an offset in minutes west of UTC; bare `GMT` at
/// zero. The sign flips: minutes west of UTC render as a positive zone east.
pub fn timezone_suffix(offset_minutes: i32) -> String {
    if offset_minutes == 0 {
        return "GMT".to_string();
    }
    let sign = if offset_minutes < 0 { '+' } else { '-' };
    let magnitude = offset_minutes.unsigned_abs();
    format!("GMT{}{:02}{:02}", sign, magnitude / 60, magnitude % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::VirtualClock;

    #[test]
    fn construction_round_trips_the_instant() {
        let clock = VirtualClock::new(-120);
        let date = clock.date_from_millis(1_700_000_000_123);
        assert_eq!(date.get_time(), 1_700_000_000_123);
    }

    #[test]
    fn local_getters_apply_the_virtual_offset() {
        // 2026-01-07 11:05:09 UTC, two hours ahead locally.
        let clock = VirtualClock::new(-120);
        let mut date = clock.date_from_millis(0);
        date.set_utc_full_year(2026, Some(0), Some(7));
        date.set_utc_hours(11, Some(5), Some(9), None);
        assert_eq!(date.get_utc_hours(), 11);
        assert_eq!(date.get_hours(), 13);
        assert_eq!(date.get_date(), 7);
        assert_eq!(date.to_date_time_string(), "Wed Jan 07 2026 13:05:09 GMT+0200");
        assert_eq!(date.to_utc_string(), "Wed, 07 Jan 2026 11:05:09 GMT");
        assert_eq!(date.to_iso_string(), "2026-01-07T11:05:09.000Z");
    }

    #[test]
    fn set_hours_reads_back_in_local_time() {
        for offset in [-120, 0, 330, 720] {
            let clock = VirtualClock::new(offset);
            let mut date = clock.date_from_millis(1_700_000_000_000);
            for hours in [0, 7, 23] {
                date.set_hours(hours, None, None, None);
                assert_eq!(i64::from(date.get_hours()), hours, "offset {}", offset);
            }
            // Overflow rolls into the next day.
            let day_before = date.get_date();
            date.set_hours(24, None, None, None);
            assert_eq!(date.get_hours(), 0);
            assert_ne!(date.get_date(), day_before);
        }
    }

    #[test]
    fn local_setters_shift_mutate_and_inverse_shift() {
        let clock = VirtualClock::new(-120);
        let mut date = clock.date_from_millis(0); // 02:00 local
        date.set_hours(5, None, None, None);
        // 05:00 local is 03:00 UTC.
        assert_eq!(date.get_utc_hours(), 3);
        assert_eq!(date.get_hours(), 5);
    }

    #[test]
    fn timezone_offset_reports_the_configured_value() {
        let clock = VirtualClock::new(330);
        assert_eq!(clock.date_from_millis(0).get_timezone_offset(), 330);
    }

    #[test]
    fn suffix_rendering() {
        assert_eq!(timezone_suffix(-120), "GMT+0200");
        assert_eq!(timezone_suffix(0), "GMT");
        assert_eq!(timezone_suffix(330), "GMT-0530");
        assert_eq!(timezone_suffix(-570), "GMT+0930");
    }

    #[test]
    fn legacy_year_methods_keep_the_quirk() {
        let clock = VirtualClock::new(0);
        let mut date = clock.date_from_millis(0);
        assert_eq!(date.get_year(), 70);
        date.set_year(99);
        assert_eq!(date.get_full_year(), 1999);
        // Unconditional 1900 addition, as the original had it.
        date.set_year(2000);
        assert_eq!(date.get_full_year(), 3900);
    }

    #[test]
    fn month_setter_rolls_out_of_range_values() {
        let clock = VirtualClock::new(0);
        let mut date = clock.date_from_millis(0);
        date.set_month(12, None);
        assert_eq!(date.get_full_year(), 1971);
        assert_eq!(date.get_month(), 0);
    }

    #[test]
    fn trailing_setter_fields_replace_in_one_call() {
        let clock = VirtualClock::new(0);
        let mut date = clock.date_from_millis(0);

        date.set_full_year(1995, Some(11), Some(17));
        assert_eq!(date.get_full_year(), 1995);
        assert_eq!(date.get_month(), 11);
        assert_eq!(date.get_date(), 17);

        date.set_hours(8, Some(30), Some(15), Some(250));
        assert_eq!(date.get_hours(), 8);
        assert_eq!(date.get_minutes(), 30);
        assert_eq!(date.get_seconds(), 15);
        assert_eq!(date.get_milliseconds(), 250);

        // Omitted trailing fields keep their current values.
        date.set_minutes(45, None, None);
        assert_eq!(date.get_minutes(), 45);
        assert_eq!(date.get_seconds(), 15);
        assert_eq!(date.get_milliseconds(), 250);

        date.set_seconds(59, Some(0));
        assert_eq!(date.get_seconds(), 59);
        assert_eq!(date.get_milliseconds(), 0);
    }

    #[test]
    fn utc_accessors_ignore_the_offset() {
        let clock = VirtualClock::new(-480);
        let mut date = clock.date_from_millis(0);
        date.set_utc_hours(23, None, None, None);
        assert_eq!(date.get_utc_hours(), 23);
        assert_eq!(date.get_time(), 23 * 60 * 60 * 1000);
    }

    #[test]
    fn json_matches_iso() {
        let clock = VirtualClock::new(-60);
        let date = clock.date_from_millis(86_400_000);
        assert_eq!(date.to_json(), date.to_iso_string());
        assert_eq!(date.to_json(), "1970-01-02T00:00:00.000Z");
    }

    #[test]
    fn date_string_uses_the_local_projection() {
        let clock = VirtualClock::new(-120);
        // 23:00 UTC Jan 1 is 01:00 local Jan 2.
        let date = clock.date_from_millis(23 * 60 * 60 * 1000);
        assert_eq!(date.to_date_string(), "Fri Jan 02 1970");
    }
}
