use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use eventsync_core::calendar_event::{CalendarEvent, EventTime};
use google_calendar::types::EventDateTime;

/// Resolve a wall-clock time in `time_zone` to UTC.
///
/// Ambiguous times (DST fall-back) take the earlier instant; times inside a
/// spring-forward gap move one hour later.
fn local_to_utc(local: NaiveDateTime, time_zone: &str) -> Result<DateTime<Utc>> {
    let tz: Tz = time_zone
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid time zone '{time_zone}': {e}"))?;

    tz.from_local_datetime(&local)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(local + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("{local} does not exist in {time_zone}"))
}

fn event_time_to_google(time: &EventTime) -> Result<EventDateTime> {
    Ok(match time {
        EventTime::Date(d) => EventDateTime {
            date: Some(*d),
            date_time: None,
            time_zone: String::new(),
        },
        EventTime::DateTime { local, time_zone } => EventDateTime {
            date: None,
            date_time: Some(local_to_utc(*local, time_zone)?),
            time_zone: time_zone.clone(),
        },
    })
}

/// Convert a calendar event to a Google Calendar API event.
pub fn to_google_event(event: &CalendarEvent) -> Result<google_calendar::types::Event> {
    Ok(google_calendar::types::Event {
        summary: event.summary.clone(),
        description: event.description.clone(),
        location: event.location.clone().unwrap_or_default(),
        start: Some(event_time_to_google(&event.start)?),
        end: Some(event_time_to_google(&event.end)?),
        color_id: event.color_id.to_string(),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn local(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn timed(start: &str, end: &str) -> CalendarEvent {
        CalendarEvent {
            summary: "Jazz im Hafen".into(),
            description: "Live".into(),
            location: Some("Halle 400".into()),
            start: EventTime::DateTime {
                local: local(start),
                time_zone: "Europe/Berlin".into(),
            },
            end: EventTime::DateTime {
                local: local(end),
                time_zone: "Europe/Berlin".into(),
            },
            color_id: 3,
        }
    }

    #[test]
    fn test_timed_event_converts_to_utc() {
        let google = to_google_event(&timed("2024-11-01 20:00", "2024-11-01 21:00")).unwrap();

        let start = google.start.unwrap();
        assert_eq!(start.date_time.unwrap().to_rfc3339(), "2024-11-01T19:00:00+00:00");
        assert_eq!(start.time_zone, "Europe/Berlin");
        assert_eq!(google.color_id, "3");
        assert_eq!(google.location, "Halle 400");
        assert!(google.id.is_empty());
    }

    #[test]
    fn test_summer_time_offset() {
        let google = to_google_event(&timed("2024-07-01 20:00", "2024-07-01 21:00")).unwrap();
        assert_eq!(
            google.start.unwrap().date_time.unwrap().to_rfc3339(),
            "2024-07-01T18:00:00+00:00"
        );
    }

    #[test]
    fn test_time_in_dst_gap_moves_forward() {
        let utc = local_to_utc(local("2024-03-31 02:30"), "Europe/Berlin").unwrap();
        assert_eq!(utc.to_rfc3339(), "2024-03-31T01:30:00+00:00");
    }

    #[test]
    fn test_all_day_event_uses_dates() {
        let event = CalendarEvent {
            start: EventTime::Date(NaiveDate::from_ymd_opt(2024, 11, 1).unwrap()),
            end: EventTime::Date(NaiveDate::from_ymd_opt(2024, 11, 2).unwrap()),
            location: None,
            ..timed("2024-11-01 20:00", "2024-11-01 21:00")
        };
        let google = to_google_event(&event).unwrap();

        let end = google.end.unwrap();
        assert_eq!(end.date, NaiveDate::from_ymd_opt(2024, 11, 2));
        assert!(end.date_time.is_none());
        assert!(google.location.is_empty());
    }

    #[test]
    fn test_unknown_time_zone_is_an_error() {
        assert!(local_to_utc(local("2024-11-01 20:00"), "Mars/Olympus").is_err());
    }
}
