//! Business-hours gate (§6.4): evaluated once at call start, before the
//! start node is dispatched.

use std::collections::HashMap;

use time::{OffsetDateTime, Weekday};

use crate::flow::model::ScheduleWindow;
use crate::flow::registry::ConfigRegistry;

/// Whether a call may proceed past the gate right now. `false` means the
/// driver should play the unavailability audio and terminate without
/// touching the start node.
pub fn gate_allows_call(registry: &ConfigRegistry, now: OffsetDateTime) -> bool {
    if is_unavailable_date(&registry.unavailable_dates, now) {
        return false;
    }
    is_within_business_hours(&registry.schedule, now)
}

/// A flow with no `IVRAvailablitySchedule` setting at all has no gate;
/// one with a schedule but an empty window for today is closed.
fn is_within_business_hours(schedule: &HashMap<String, ScheduleWindow>, now: OffsetDateTime) -> bool {
    if schedule.is_empty() {
        return true;
    }
    let Some(window) = schedule.get(weekday_key(now.weekday())) else {
        return false;
    };
    let (Some(from), Some(to)) = (parse_clock(&window.from), parse_clock(&window.to)) else {
        return false;
    };
    let minutes_now = now.hour() as u32 * 60 + now.minute() as u32;
    from <= minutes_now && minutes_now <= to
}

fn is_unavailable_date(unavailable_dates: &[String], now: OffsetDateTime) -> bool {
    let today = format!("{:02}{:02}{:04}", u8::from(now.month()), now.day(), now.year());
    unavailable_dates.iter().any(|d| d == &today)
}

fn weekday_key(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Sunday => "SUN",
        Weekday::Monday => "MON",
        Weekday::Tuesday => "TUE",
        Weekday::Wednesday => "WED",
        Weekday::Thursday => "THU",
        Weekday::Friday => "FRI",
        Weekday::Saturday => "SAT",
    }
}

/// Parse a `"h:mmAM/PM"` clock string into minutes since midnight.
fn parse_clock(value: &str) -> Option<u32> {
    let value = value.trim();
    let (time_part, is_pm) = if let Some(stripped) = value.strip_suffix("AM") {
        (stripped, false)
    } else if let Some(stripped) = value.strip_suffix("PM") {
        (stripped, true)
    } else {
        return None;
    };
    let mut parts = time_part.splitn(2, ':');
    let hour: u32 = parts.next()?.trim().parse().ok()?;
    let minute: u32 = parts.next()?.trim().parse().ok()?;
    let hour24 = match (hour % 12, is_pm) {
        (0, false) => 0,
        (h, false) => h,
        (0, true) => 12,
        (h, true) => h + 12,
    };
    Some(hour24 * 60 + minute)
}
