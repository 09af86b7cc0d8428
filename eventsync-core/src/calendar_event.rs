//! Calendar-side representation of a reconciled event.
//!
//! This is what gets sent to a provider's `create_event`. Times stay local
//! to the configured zone; providers convert them as their API requires.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_EVENT_DURATION_MINUTES;
use crate::event::EventRecord;

/// Start or end of a calendar event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTime {
    /// All-day; as an end this is exclusive
    Date(NaiveDate),
    DateTime {
        local: NaiveDateTime,
        time_zone: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub summary: String,
    pub description: String,
    pub location: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    pub color_id: u8,
}

impl CalendarEvent {
    pub fn from_record(record: &EventRecord, time_zone: &str, created_at: NaiveDateTime) -> Self {
        let (start, end) = match record.start_time {
            None => (
                EventTime::Date(record.start_date),
                EventTime::Date(record.effective_end_date() + Duration::days(1)),
            ),
            Some(start_time) => {
                let start = record.start_date.and_time(start_time);
                let mut end = match record.end_time {
                    Some(end_time) => record.effective_end_date().and_time(end_time),
                    None => start + Duration::minutes(DEFAULT_EVENT_DURATION_MINUTES),
                };
                // Late shows end after midnight
                if end <= start {
                    end += Duration::days(1);
                }
                (
                    EventTime::DateTime {
                        local: start,
                        time_zone: time_zone.to_string(),
                    },
                    EventTime::DateTime {
                        local: end,
                        time_zone: time_zone.to_string(),
                    },
                )
            }
        };

        CalendarEvent {
            summary: record.subject.clone(),
            description: format!(
                "{}\n\nEvent created on: {}",
                record.description,
                created_at.format("%Y-%m-%d %H:%M:%S")
            ),
            location: record.location.clone(),
            start,
            end,
            color_id: record.colour.id(),
        }
    }
}
