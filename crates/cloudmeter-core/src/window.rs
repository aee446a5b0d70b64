//! Billing window and calendar helpers.
//!
//! A billing window covers one calendar day in a fixed UTC offset, from
//! midnight through 23:59:59.999. Both bounds are epoch milliseconds and are
//! always whole integers; the upstream spending endpoint rejects fractional
//! or exponential timestamps.

use chrono::{Datelike, FixedOffset, NaiveDate, NaiveTime, TimeZone};

use crate::error::{CoreError, Result};

/// Milliseconds in one calendar day.
const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// The time interval for which spending is aggregated: one calendar day in a
/// fixed time zone offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BillingWindow {
    /// The calendar day this window covers.
    pub date: NaiveDate,

    /// Epoch milliseconds of 00:00:00.000 on `date` in the collection zone.
    pub start_ms: i64,

    /// Epoch milliseconds of 23:59:59.999 on `date` in the collection zone.
    pub end_ms: i64,
}

impl BillingWindow {
    /// Build the window for a calendar day in the given UTC offset.
    #[must_use]
    pub fn for_date(date: NaiveDate, offset: FixedOffset) -> Self {
        // INVARIANT: a fixed offset maps every local time to exactly one
        // instant, so `single()` cannot be ambiguous or missing here.
        let start = offset
            .from_local_datetime(&date.and_time(NaiveTime::MIN))
            .single()
            .expect("fixed offsets map local times uniquely");
        let start_ms = start.timestamp_millis();

        Self {
            date,
            start_ms,
            end_ms: start_ms + DAY_MS - 1,
        }
    }
}

/// Parse a `YYYY-MM-DD` date string.
///
/// # Errors
///
/// Returns [`CoreError::InvalidDate`] when the string does not parse.
pub fn parse_date(date_str: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .map_err(|_| CoreError::InvalidDate(date_str.to_string()))
}

/// Parse a `YYYY-MM` month string into (year, month).
///
/// # Errors
///
/// Returns [`CoreError::InvalidMonth`] when the string does not parse or the
/// month is out of range.
pub fn parse_month(month_str: &str) -> Result<(i32, u32)> {
    let err = || CoreError::InvalidMonth(month_str.to_string());

    let (year, month) = month_str.split_once('-').ok_or_else(err)?;
    let year: i32 = year.parse().map_err(|_| err())?;
    let month: u32 = month.parse().map_err(|_| err())?;
    if !(1..=12).contains(&month) {
        return Err(err());
    }
    Ok((year, month))
}

/// Parse a `+HH:MM` / `-HH:MM` UTC offset string.
///
/// # Errors
///
/// Returns [`CoreError::InvalidOffset`] when the string does not parse.
pub fn parse_offset(offset_str: &str) -> Result<FixedOffset> {
    let err = || CoreError::InvalidOffset(offset_str.to_string());

    let (sign, rest) = if let Some(rest) = offset_str.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = offset_str.strip_prefix('-') {
        (-1, rest)
    } else {
        return Err(err());
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(err)?;
    let hours: i32 = hours.parse().map_err(|_| err())?;
    let minutes: i32 = minutes.parse().map_err(|_| err())?;

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(err)
}

/// Every calendar day of the given month, in order.
#[must_use]
pub fn days_in_month(year: i32, month: u32) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(31);
    let mut day = 1;
    while let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
        days.push(date);
        day += 1;
    }
    days
}

/// The (year, month) preceding the month containing `today`.
#[must_use]
pub fn previous_month(today: NaiveDate) -> (i32, u32) {
    if today.month() == 1 {
        (today.year() - 1, 12)
    } else {
        (today.year(), today.month() - 1)
    }
}
