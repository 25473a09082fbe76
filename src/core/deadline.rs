use chrono::{DateTime, Local, NaiveTime, TimeDelta, TimeZone};

use crate::core::error::PlanError;

/// Parse a strict `HH:MM` time of day.
pub fn parse_time_of_day(text: &str) -> Result<NaiveTime, PlanError> {
    let invalid = || PlanError::InvalidTimeFormat(text.to_string());
    let (hours, minutes) = text.trim().split_once(':').ok_or_else(invalid)?;
    let is_digits = |part: &str| part.bytes().all(|byte| byte.is_ascii_digit());
    ensure_format(matches!(hours.len(), 1 | 2) && minutes.len() == 2, text)?;
    ensure_format(is_digits(hours) && is_digits(minutes), text)?;
    let hours: u32 = hours.parse().map_err(|_| invalid())?;
    let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
    NaiveTime::from_hms_opt(hours, minutes, 0).ok_or_else(invalid)
}

fn ensure_format(condition: bool, text: &str) -> Result<(), PlanError> {
    if condition { Ok(()) } else { Err(PlanError::InvalidTimeFormat(text.to_string())) }
}

/// Next occurrence of the time of day after `now`.
///
/// A time of day equal to or before the current one means «tomorrow».
pub fn resolve_deadline(now: DateTime<Local>, time_of_day: NaiveTime) -> DateTime<Local> {
    let naive = now.date_naive().and_time(time_of_day);
    let today = Local
        .from_local_datetime(&naive)
        .earliest()
        // The local time does not exist today (DST gap), fall back to the naive offset:
        .unwrap_or_else(|| now + (naive - now.naive_local()));
    next_after(now, today)
}

/// Push a deadline that is not after `now` forward by one day.
pub fn next_after(now: DateTime<Local>, deadline: DateTime<Local>) -> DateTime<Local> {
    if deadline <= now { deadline + TimeDelta::days(1) } else { deadline }
}
