//! Civil calendar field math on millisecond timestamps.
//!
//! The virtual clock works on one authoritative epoch-milliseconds value and
//! projects it into calendar fields (and back) without any timezone database:
//! the caller applies the offset shift before converting. Out-of-range fields
//! normalize the way the platform date type rolls them (month 13 rolls into
//! the next year, hour 25 into the next day, and so on) because everything
//! reduces to day and millisecond arithmetic.

pub const MS_PER_SECOND: i64 = 1_000;
pub const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;
pub const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;
pub const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

/// Calendar projection of an instant. `month` is zero-based and `weekday`
/// counts from Sunday, matching the accessor contract being reproduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarFields {
    pub year: i64,
    pub month: u32,
    pub day: u32,
    pub weekday: u32,
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub millis: u32,
}

/// Days since 1970-01-01 for a civil date (`month` is 1-based here).
/// Howard Hinnant's days-from-civil algorithm.
fn days_from_civil(year: i64, month: u32, day: i64) -> i64 {
    let year = if month <= 2 { year - 1 } else { year };
    let era = if year >= 0 { year } else { year - 399 } / 400;
    let year_of_era = year - era * 400;
    let month_prime = (i64::from(month) + 9) % 12;
    let day_of_year = (153 * month_prime + 2) / 5 + day - 1;
    let day_of_era = year_of_era * 365 + year_of_era / 4 - year_of_era / 100 + day_of_year;
    era * 146_097 + day_of_era - 719_468
}

/// Inverse of [`days_from_civil`]; returns (year, 1-based month, day).
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let days = days + 719_468;
    let era = if days >= 0 { days } else { days - 146_096 } / 146_097;
    let day_of_era = days - era * 146_097;
    let year_of_era =
        (day_of_era - day_of_era / 1_460 + day_of_era / 36_524 - day_of_era / 146_096) / 365;
    let year = year_of_era + era * 400;
    let day_of_year = day_of_era - (365 * year_of_era + year_of_era / 4 - year_of_era / 100);
    let month_prime = (5 * day_of_year + 2) / 153;
    let day = day_of_year - (153 * month_prime + 2) / 5 + 1;
    let month = if month_prime < 10 {
        month_prime + 3
    } else {
        month_prime - 9
    };
    let year = if month <= 2 { year + 1 } else { year };
    (year, month as u32, day as u32)
}

/// Milliseconds since the epoch for civil fields. `month` is zero-based and
/// every field may be out of range; excess rolls into the next larger unit.
pub fn ms_from_fields(
    year: i64,
    month: i64,
    day: i64,
    hours: i64,
    minutes: i64,
    seconds: i64,
    millis: i64,
) -> i64 {
    let year = year + month.div_euclid(12);
    let month = month.rem_euclid(12);
    let days = days_from_civil(year, (month + 1) as u32, 1) + (day - 1);
    days * MS_PER_DAY
        + hours * MS_PER_HOUR
        + minutes * MS_PER_MINUTE
        + seconds * MS_PER_SECOND
        + millis
}

/// Project epoch milliseconds into calendar fields.
pub fn fields_from_ms(ms: i64) -> CalendarFields {
    let days = ms.div_euclid(MS_PER_DAY);
    let time_of_day = ms.rem_euclid(MS_PER_DAY);
    let (year, month, day) = civil_from_days(days);
    CalendarFields {
        year,
        month: month - 1,
        day,
        // 1970-01-01 was a Thursday.
        weekday: (days + 4).rem_euclid(7) as u32,
        hours: (time_of_day / MS_PER_HOUR) as u32,
        minutes: (time_of_day % MS_PER_HOUR / MS_PER_MINUTE) as u32,
        seconds: (time_of_day % MS_PER_MINUTE / MS_PER_SECOND) as u32,
        millis: (time_of_day % MS_PER_SECOND) as u32,
    }
}
