//! Per-field validators for the booking dialogue.
//!
//! Each validator returns the parsed value or a corrective message that
//! names what was wrong, ready to show to the user as-is.

use std::sync::LazyLock;

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Timelike, Weekday};
use regex::Regex;

use crate::config::BookingPolicy;

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}][\p{L} .'-]*$").unwrap());

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());

const NAME_MAX_LEN: usize = 100;

pub fn validate_name(input: &str) -> Result<String, String> {
    let name = input.trim();
    // Length limits are in characters, not bytes, so accented names are
    // measured the way the user wrote them.
    let char_count = name.chars().count();
    if char_count < 2 {
        return Err("Please provide your full name (at least 2 characters).".to_string());
    }
    if char_count > NAME_MAX_LEN {
        return Err("That name is too long. Please provide your full name.".to_string());
    }
    if !NAME_RE.is_match(name) {
        return Err(
            "A name should only contain letters, spaces, and hyphens. Please try again."
                .to_string(),
        );
    }
    Ok(name.to_string())
}

pub fn validate_email(input: &str) -> Result<String, String> {
    let email = input.trim();
    if !EMAIL_RE.is_match(email) {
        return Err(
            "That doesn't look like a valid email address. \
             Please provide a valid email (e.g., user@example.com)."
                .to_string(),
        );
    }
    Ok(email.to_string())
}

/// Validate a requested date against the booking policy.
///
/// `today` is injected so the horizon and past checks are testable.
pub fn validate_date(
    input: &str,
    policy: &BookingPolicy,
    today: NaiveDate,
) -> Result<NaiveDate, String> {
    let Ok(date) = NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d") else {
        return Err(
            "Invalid date. Please use YYYY-MM-DD format (e.g., 2025-11-20).".to_string(),
        );
    };

    if date < today {
        return Err("That date is in the past. Please pick a future date.".to_string());
    }

    let horizon = today + Duration::days(i64::from(policy.horizon_days));
    if date > horizon {
        return Err(format!(
            "We can only book up to {} days ahead. Please pick an earlier date.",
            policy.horizon_days
        ));
    }

    if !policy.include_weekends
        && matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    {
        return Err("We don't schedule on weekends. Please pick a weekday.".to_string());
    }

    Ok(date)
}

/// Validate a requested time-of-day against business hours and slot grid.
pub fn validate_time(input: &str, policy: &BookingPolicy) -> Result<NaiveTime, String> {
    let Ok(time) = NaiveTime::parse_from_str(input.trim(), "%H:%M") else {
        return Err(
            "Invalid time. Please use HH:MM in 24-hour format (e.g., 14:30).".to_string(),
        );
    };

    if time.hour() < policy.open_hour || time.hour() >= policy.close_hour {
        return Err(format!(
            "We schedule between {:02}:00 and {:02}:00. Please pick a time in that window.",
            policy.open_hour, policy.close_hour
        ));
    }

    if policy.slot_minutes > 0 && time.minute() % policy.slot_minutes != 0 {
        return Err(format!(
            "Appointments start every {} minutes. Please pick a time on that grid.",
            policy.slot_minutes
        ));
    }

    Ok(time)
}
