//! The per-run summary entry shown at the top of the calendar day.

use chrono::NaiveDate;

use crate::diff::{StatusCounts, format_date};
use crate::event::{Colour, EventRecord, ReconciledEvent, Status};

pub const SUMMARY_LOCATION: &str = "Only visible in this calendar";

/// Build the summary record for a run on `date` in the sentinel `city`.
pub fn summary_record(date: NaiveDate, counts: &StatusCounts, city: &str) -> ReconciledEvent {
    let mut record = EventRecord::new(
        format!("Summary of today's events from {}", format_date(date)),
        date,
        city,
    );
    record.end_date = Some(date);
    record.location = Some(SUMMARY_LOCATION.to_string());
    record.colour = Colour::Unchanged;
    record.description = format!(
        "Total events: {}.\nDeleted events: {}.\nChanged events: {}.\nUnchanged/new events: {}.",
        counts.total(),
        counts.deleted,
        counts.changed,
        counts.unchanged + counts.new,
    );

    ReconciledEvent::new(record, Status::Unchanged)
}
