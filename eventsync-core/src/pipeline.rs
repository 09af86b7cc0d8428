//! The reconciliation pipeline: dedup, filter, diff, summary.
//!
//! `reconcile` is pure. Loading input and snapshots and talking to the
//! calendar happen around it, in the CLI.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::info;

use crate::calendar_event::CalendarEvent;
use crate::constants::{DEFAULT_SIMILARITY_THRESHOLD, DEFAULT_WINDOW_DAYS, SUMMARY_CITY};
use crate::dedup::Deduplicator;
use crate::diff::{Differ, MatchMode, StatusCounts};
use crate::event::{EventRecord, ReconciledEvent, Status};
use crate::filter::{FilterPolicy, TemporalFilter};
use crate::snapshot::Snapshot;
use crate::summary::summary_record;

/// Everything the pipeline needs to know about one run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub today: NaiveDate,
    pub window_days: i64,
    pub policy: FilterPolicy,
    pub fuzzy_subjects: bool,
    pub similarity_threshold: f64,
    pub match_mode: MatchMode,
    pub summary_city: String,
}

impl PipelineSettings {
    pub fn with_defaults(today: NaiveDate) -> Self {
        PipelineSettings {
            today,
            window_days: DEFAULT_WINDOW_DAYS,
            policy: FilterPolicy::default(),
            fuzzy_subjects: true,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            match_mode: MatchMode::default(),
            summary_city: SUMMARY_CITY.to_string(),
        }
    }
}

/// Output of one run.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub date: NaiveDate,
    /// Classified events followed by the summary record
    pub events: Vec<ReconciledEvent>,
    /// Counts over the classified events, summary excluded
    pub counts: StatusCounts,
}

impl Reconciliation {
    /// The classified events without the summary record.
    pub fn classified(&self) -> &[ReconciledEvent] {
        match self.events.split_last() {
            Some((_, rest)) => rest,
            None => &[],
        }
    }

    pub fn calendar_events(&self, time_zone: &str, created_at: NaiveDateTime) -> Vec<CalendarEvent> {
        self.events
            .iter()
            .map(|event| CalendarEvent::from_record(&event.record, time_zone, created_at))
            .collect()
    }

    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            load_date: self.date,
            rows: self.events.clone(),
        }
    }
}

/// Turn the previous run's output into the old side of today's diff.
///
/// Rows already reported as deleted, the summary row and events starting
/// before `today` are dropped. The temporal filter uses the same bound, so a
/// multi-day event still running today is neither new nor deleted.
pub fn prepare_old(
    rows: Vec<ReconciledEvent>,
    today: NaiveDate,
    summary_city: &str,
) -> Vec<EventRecord> {
    let before = rows.len();

    let old: Vec<EventRecord> = rows
        .into_iter()
        .filter(|row| row.status != Status::Deleted)
        .filter(|row| row.record.city != summary_city)
        .filter(|row| row.record.start_date >= today)
        .map(|row| row.record)
        .collect();

    info!(before, after = old.len(), "Prepared previous events");
    old
}

/// Reconcile today's scraped records against the previous run.
pub fn reconcile(
    settings: &PipelineSettings,
    scraped: Vec<EventRecord>,
    old: Vec<EventRecord>,
) -> Reconciliation {
    let deduplicator = Deduplicator::new(settings.fuzzy_subjects, settings.similarity_threshold);
    let deduplicated = deduplicator.dedup(scraped);

    let filter = TemporalFilter::new(settings.today, settings.window_days, settings.policy);
    let current = filter.apply(deduplicated);

    let differ = Differ::new(settings.match_mode, settings.summary_city.clone());
    let mut events = differ.diff(old, current);

    let counts = StatusCounts::from_events(&events);
    events.push(summary_record(settings.today, &counts, &settings.summary_city));

    info!(
        new = counts.new,
        unchanged = counts.unchanged,
        changed = counts.changed,
        deleted = counts.deleted,
        "Reconciled events"
    );

    Reconciliation {
        date: settings.today,
        events,
        counts,
    }
}
