//! Arrival-time choices and forecast slot rounding.

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Timelike, Utc};
use std::fmt::Display;

use crate::error::ServiceError;

/// The forecast provider only resolves 3-hour slots.
pub const FORECAST_SLOT_MILLIS: i64 = 3 * 60 * 60 * 1000;

/// Number of hourly arrival choices, starting with the current hour.
pub const ARRIVAL_OPTION_COUNT: i64 = 12;

const INVALID_TIME: &str = "Invalid time selected.";

/// Truncate to the top of the current hour.
pub fn start_of_hour<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Tz> {
    let into_hour = Duration::minutes(i64::from(now.minute()))
        + Duration::seconds(i64::from(now.second()))
        + Duration::nanoseconds(i64::from(now.nanosecond()));
    now.clone() - into_hour
}

/// Twelve hourly labels such as "03:00 PM", the first one being the
/// current hour.
pub fn arrival_options<Tz: TimeZone>(now: &DateTime<Tz>) -> Vec<String>
where
    Tz::Offset: Display,
{
    let first = start_of_hour(now);
    (0..ARRIVAL_OPTION_COUNT)
        .map(|i| (first.clone() + Duration::hours(i)).format("%I:%M %p").to_string())
        .collect()
}

/// Parse "hh:mm AM" / "hh:mm PM" into a 24-hour (hour, minute) pair.
///
/// 12 AM is midnight (hour 0) and 12 PM is noon (hour 12). A label with no
/// AM/PM marker is read as 24-hour time.
pub fn parse_clock_12h(label: &str) -> Result<(u32, u32), ServiceError> {
    let mut parts = label.split_whitespace();
    let clock = parts.next().ok_or_else(|| ServiceError::validation(INVALID_TIME))?;
    let modifier = parts.next().map(str::to_ascii_uppercase);
    if parts.next().is_some() {
        return Err(ServiceError::validation(INVALID_TIME));
    }

    let (hours, minutes) =
        clock.split_once(':').ok_or_else(|| ServiceError::validation(INVALID_TIME))?;
    let mut hour: u32 = hours.parse().map_err(|_| ServiceError::validation(INVALID_TIME))?;
    let minute: u32 = minutes.parse().map_err(|_| ServiceError::validation(INVALID_TIME))?;

    match modifier.as_deref() {
        Some("AM") | Some("PM") if !(1..=12).contains(&hour) => {
            return Err(ServiceError::validation(INVALID_TIME));
        }
        Some("AM") if hour == 12 => hour = 0,
        Some("PM") if hour != 12 => hour += 12,
        Some("AM") | Some("PM") | None => {}
        Some(_) => return Err(ServiceError::validation(INVALID_TIME)),
    }

    if hour > 23 || minute > 59 {
        return Err(ServiceError::validation(INVALID_TIME));
    }
    Ok((hour, minute))
}

/// The next occurrence of `label` at or after the start of the previous
/// hour.
///
/// Choices past midnight land on the following day. The extra hour covers a
/// list built just before the hour turned and submitted just after it.
pub fn resolve_arrival<Tz: TimeZone>(
    now: &DateTime<Tz>,
    label: &str,
) -> Result<DateTime<Tz>, ServiceError> {
    let (hour, minute) = parse_clock_12h(label)?;
    let time = NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| ServiceError::validation(INVALID_TIME))?;

    let tz = now.timezone();
    let floor = start_of_hour(now) - Duration::hours(1);
    let today = now.date_naive();

    let dates = [today.pred_opt(), Some(today), today.succ_opt()];
    for date in dates.into_iter().flatten() {
        let candidate = tz.from_local_datetime(&date.and_time(time)).earliest();
        if let Some(candidate) = candidate.filter(|c| *c >= floor) {
            return Ok(candidate);
        }
    }

    Err(ServiceError::validation(INVALID_TIME))
}

/// Round to the nearest 3-hour boundary since the Unix epoch. An exact
/// midpoint rounds up.
pub fn round_to_forecast_slot(at: DateTime<Utc>) -> DateTime<Utc> {
    let millis = at.timestamp_millis();
    let rounded = (millis + FORECAST_SLOT_MILLIS / 2).div_euclid(FORECAST_SLOT_MILLIS)
        * FORECAST_SLOT_MILLIS;
    DateTime::from_timestamp_millis(rounded).unwrap_or(at)
}
