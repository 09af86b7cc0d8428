//! Canonical event types.
//!
//! Every scraper's output is normalized into `EventRecord`. The reconciliation
//! pipeline works exclusively with these types, and the final output of a run
//! is a list of `ReconciledEvent`s (a record plus its day-over-day status).

use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// One scraped and normalized event occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub subject: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    /// `None` means all day or unspecified
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub location: Option<String>,
    /// ASCII-folded city name, the partition key of the diff
    pub city: String,
    /// Free text; may embed the source URL and merged duplicate summaries
    pub description: String,
    pub category: Option<String>,
    pub music_label: bool,
    /// Number of suppressed duplicates merged into this record
    pub counter: u32,
    pub colour: Colour,
}

impl EventRecord {
    pub fn new(subject: impl Into<String>, start_date: NaiveDate, city: impl Into<String>) -> Self {
        EventRecord {
            subject: subject.into(),
            start_date,
            end_date: None,
            start_time: None,
            end_time: None,
            location: None,
            city: city.into(),
            description: String::new(),
            category: None,
            music_label: false,
            counter: 0,
            colour: Colour::default(),
        }
    }

    /// The end date, falling back to the start date for single-day events.
    pub fn effective_end_date(&self) -> NaiveDate {
        self.end_date
            .filter(|end| *end >= self.start_date)
            .unwrap_or(self.start_date)
    }

    pub fn is_all_day(&self) -> bool {
        self.start_time.is_none()
    }

    /// Flagged by the deduplicator (directly or carried over from a previous run).
    pub fn is_duplicate(&self) -> bool {
        self.colour == Colour::Duplicate
    }

    pub fn append_description(&mut self, text: &str) {
        self.description.push_str(text);
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.subject)
    }
}

/// Calendar colour of an event.
///
/// The discriminants are Google Calendar colour ids. Besides driving the
/// display, the colour records the dedup and diff status of an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Colour {
    #[default]
    Music = 1,
    Duplicate = 4,
    Changed = 5,
    Unchanged = 10,
    Deleted = 11,
}

impl Colour {
    pub fn id(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Colour::Music => "music",
            Colour::Duplicate => "duplicate",
            Colour::Changed => "changed",
            Colour::Unchanged => "unchanged",
            Colour::Deleted => "deleted",
        }
    }
}

impl From<Colour> for u8 {
    fn from(colour: Colour) -> u8 {
        colour.id()
    }
}

impl TryFrom<u8> for Colour {
    type Error = String;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        match id {
            1 => Ok(Colour::Music),
            4 => Ok(Colour::Duplicate),
            5 => Ok(Colour::Changed),
            10 => Ok(Colour::Unchanged),
            11 => Ok(Colour::Deleted),
            other => Err(format!("unknown colour id {other}")),
        }
    }
}

impl fmt::Display for Colour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Day-over-day classification of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    New,
    Unchanged,
    Changed,
    Deleted,
}

impl Status {
    pub fn symbol(&self) -> &'static str {
        match self {
            Status::New => "+",
            Status::Unchanged => "=",
            Status::Changed => "~",
            Status::Deleted => "-",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::New => "new",
            Status::Unchanged => "unchanged",
            Status::Changed => "changed",
            Status::Deleted => "deleted",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An event after reconciliation: the record to publish and how it relates
/// to the previous run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledEvent {
    #[serde(flatten)]
    pub record: EventRecord,
    pub status: Status,
}

impl ReconciledEvent {
    pub fn new(record: EventRecord, status: Status) -> Self {
        ReconciledEvent { record, status }
    }
}

impl fmt::Display for ReconciledEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status.symbol(), self.record)
    }
}
