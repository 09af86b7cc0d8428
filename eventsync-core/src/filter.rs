//! Temporal filter and first-pass colour assignment.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::DEFAULT_WINDOW_DAYS;
use crate::event::{Colour, EventRecord};

/// Inclusive range of start dates worth publishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateWindow {
    /// `today` through `today + days`, both inclusive.
    pub fn from_today(today: NaiveDate, days: i64) -> Self {
        DateWindow {
            from: today,
            to: today + Duration::days(days),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from <= date && date <= self.to
    }
}

/// Which in-window events are published.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterPolicy {
    /// Only duplicates and music-labelled events
    #[default]
    Flagged,
    /// Everything in the window
    Permissive,
}

#[derive(Debug, Clone)]
pub struct TemporalFilter {
    pub window: DateWindow,
    pub policy: FilterPolicy,
}

impl TemporalFilter {
    pub fn new(today: NaiveDate, window_days: i64, policy: FilterPolicy) -> Self {
        TemporalFilter {
            window: DateWindow::from_today(today, window_days),
            policy,
        }
    }

    pub fn with_defaults(today: NaiveDate) -> Self {
        Self::new(today, DEFAULT_WINDOW_DAYS, FilterPolicy::default())
    }

    fn keeps(&self, record: &EventRecord) -> bool {
        if !self.window.contains(record.start_date) {
            return false;
        }
        match self.policy {
            FilterPolicy::Flagged => record.counter > 0 || record.music_label,
            FilterPolicy::Permissive => true,
        }
    }

    /// Drop out-of-window and unflagged records and colour the rest.
    pub fn apply(&self, records: Vec<EventRecord>) -> Vec<EventRecord> {
        let before = records.len();

        let kept: Vec<EventRecord> = records
            .into_iter()
            .filter(|record| self.keeps(record))
            .map(|mut record| {
                record.colour = first_pass_colour(&record);
                record
            })
            .collect();

        debug!(
            before,
            after = kept.len(),
            from = %self.window.from,
            to = %self.window.to,
            "Filtered records"
        );
        kept
    }
}

fn first_pass_colour(record: &EventRecord) -> Colour {
    if record.counter > 0 {
        Colour::Duplicate
    } else if record.music_label {
        Colour::Music
    } else {
        Colour::Unchanged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn record(subject: &str, start: &str) -> EventRecord {
        let mut record = EventRecord::new(subject, date(start), "Kiel");
        record.music_label = true;
        record
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let window = DateWindow::from_today(date("2024-11-01"), 30);
        assert!(window.contains(date("2024-11-01")));
        assert!(window.contains(date("2024-12-01")));
        assert!(!window.contains(date("2024-10-31")));
        assert!(!window.contains(date("2024-12-02")));
    }

    #[test]
    fn test_out_of_window_records_are_dropped() {
        let filter = TemporalFilter::with_defaults(date("2024-11-01"));
        let records = vec![
            record("past", "2024-10-31"),
            record("today", "2024-11-01"),
            record("last", "2024-12-01"),
            record("too far", "2024-12-02"),
        ];

        let subjects: Vec<String> = filter.apply(records).into_iter().map(|r| r.subject).collect();
        assert_eq!(subjects, vec!["today", "last"]);
    }

    #[test]
    fn test_flagged_policy_keeps_duplicates_and_music() {
        let filter = TemporalFilter::new(date("2024-11-01"), 30, FilterPolicy::Flagged);

        let music = record("music", "2024-11-02");
        let mut duplicate = record("duplicate", "2024-11-02");
        duplicate.music_label = false;
        duplicate.counter = 1;
        let mut plain = record("plain", "2024-11-02");
        plain.music_label = false;

        let kept = filter.apply(vec![music, duplicate, plain]);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].colour, Colour::Music);
        assert_eq!(kept[1].colour, Colour::Duplicate);
    }

    #[test]
    fn test_permissive_policy_keeps_everything_in_window() {
        let filter = TemporalFilter::new(date("2024-11-01"), 30, FilterPolicy::Permissive);

        let mut plain = record("plain", "2024-11-02");
        plain.music_label = false;

        let kept = filter.apply(vec![plain]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].colour, Colour::Unchanged);
    }

    #[test]
    fn test_duplicate_colour_wins_over_music() {
        let filter = TemporalFilter::with_defaults(date("2024-11-01"));
        let mut both = record("both", "2024-11-02");
        both.counter = 2;

        assert_eq!(filter.apply(vec![both])[0].colour, Colour::Duplicate);
    }

    #[test]
    fn test_policy_parses_from_config_text() {
        let policy: FilterPolicy = serde_json::from_str("\"permissive\"").unwrap();
        assert_eq!(policy, FilterPolicy::Permissive);
    }
}
