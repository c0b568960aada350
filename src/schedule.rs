use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::models::Event;

const DATE_FORMATS: [&str; 6] = [
    "%b %d, %Y",
    "%B %d, %Y",
    "%b %e, %Y",
    "%B %e, %Y",
    "%Y-%m-%d",
    "%m/%d/%Y",
];

const TIME_FORMATS: [&str; 4] = ["%I:%M %p", "%I %p", "%H:%M", "%H:%M:%S"];

pub fn clean_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn parse_date_label(label: &str) -> Option<NaiveDate> {
    let cleaned = clean_text(label);
    if cleaned.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(&cleaned, fmt).ok())
}

/// Parses a clock label. "All Day" and anything unparsable yield `None`.
pub fn parse_time_label(label: &str) -> Option<NaiveTime> {
    let cleaned = clean_text(label).to_uppercase();
    if cleaned.is_empty() || cleaned == "ALL DAY" {
        return None;
    }
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(&cleaned, fmt).ok())
}

/// Start of the event; all-day events start at midnight.
pub fn event_start(event: &Event) -> Option<NaiveDateTime> {
    let date = parse_date_label(&event.date)?;
    let time = parse_time_label(&event.time).unwrap_or(NaiveTime::MIN);
    Some(date.and_time(time))
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Badge {
    Urgent,
    Ended,
    HappeningNow,
    StartsIn { hours: i64 },
}

impl Badge {
    pub fn label(&self) -> String {
        match self {
            Badge::Urgent => "Urgent".to_string(),
            Badge::Ended => "Event Ended".to_string(),
            Badge::HappeningNow => "Happening Now".to_string(),
            Badge::StartsIn { hours } => format!("Starts in {hours}h"),
        }
    }
}

pub fn status_badge(event: &Event, now: NaiveDateTime) -> Option<Badge> {
    if event.is_urgent {
        return Some(Badge::Urgent);
    }
    let start = event_start(event)?;
    let millis = start.signed_duration_since(now).num_milliseconds();
    // floor, so any moment past the start already counts as ended
    let hours_until = millis.div_euclid(3_600_000);
    match hours_until {
        h if h < 0 => Some(Badge::Ended),
        h if h < 2 => Some(Badge::HappeningNow),
        h if h < 24 => Some(Badge::StartsIn { hours: h }),
        _ => None,
    }
}

pub fn reference_today(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}
