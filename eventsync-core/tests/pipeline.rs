use chrono::{NaiveDate, NaiveTime};
use pretty_assertions::assert_eq;

use eventsync_core::diff::MatchMode;
use eventsync_core::normalize::{RawRecord, normalize_all};
use eventsync_core::pipeline::{PipelineSettings, prepare_old, reconcile};
use eventsync_core::{Colour, EventRecord, Status};

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn today() -> NaiveDate {
    date("2024-11-01")
}

fn concert(subject: &str, start: &str, location: &str) -> EventRecord {
    let mut record = EventRecord::new(subject, date(start), "Kiel");
    record.start_time = NaiveTime::from_hms_opt(20, 0, 0);
    record.location = Some(location.to_string());
    record.music_label = true;
    record
}

fn settings() -> PipelineSettings {
    PipelineSettings::with_defaults(today())
}

/// Run once on `previous` to produce yesterday's snapshot rows.
fn yesterday(previous: Vec<EventRecord>) -> Vec<EventRecord> {
    let settings = PipelineSettings::with_defaults(date("2024-10-31"));
    let result = reconcile(&settings, previous, vec![]);
    prepare_old(result.to_snapshot().rows, today(), &settings.summary_city)
}

#[test]
fn test_vanished_event_is_reported_deleted() {
    let old = yesterday(vec![concert("Konzert B", "2024-11-03", "Pumpe")]);

    let result = reconcile(&settings(), vec![], old);
    let deleted = &result.events[0];

    assert_eq!(deleted.status, Status::Deleted);
    assert_eq!(deleted.record.colour, Colour::Deleted);
    assert!(deleted.record.description.contains("event deleted"));
    assert_eq!(result.counts.deleted, 1);
}

#[test]
fn test_moved_event_is_reported_changed() {
    let old = yesterday(vec![concert("Konzert A", "2024-11-03", "Halle X")]);
    let new = vec![concert("Konzert A", "2024-11-03", "Halle Y")];

    let result = reconcile(&settings(), new, old);
    let changed = &result.events[0];

    assert_eq!(changed.status, Status::Changed);
    assert_eq!(changed.record.colour, Colour::Changed);
    assert_eq!(changed.record.location.as_deref(), Some("Halle Y"));
    assert!(changed.record.description.contains("previous location: Halle X"));
}

#[test]
fn test_three_sources_collapse_into_one() {
    let mut a = concert("A", "2024-11-03", "Pumpe");
    a.description = "text a".to_string();
    let mut b = concert("B", "2024-11-03", "Pumpe");
    b.description = "text b".to_string();
    let mut c = concert("C", "2024-11-03", "Pumpe");
    c.description = "text c".to_string();

    let result = reconcile(&settings(), vec![a, b, c], vec![]);
    assert_eq!(result.events.len(), 2);

    let merged = &result.events[0].record;
    assert_eq!(merged.subject, "A");
    assert_eq!(merged.counter, 2);
    assert_eq!(merged.colour, Colour::Duplicate);

    let b_at = merged.description.find("Event B: text b").unwrap();
    let c_at = merged.description.find("Event C: text c").unwrap();
    let a_at = merged.description.find("text a").unwrap();
    assert!(b_at < a_at && c_at < a_at);
}

#[test]
fn test_duplicate_colour_survives_location_change() {
    let old = yesterday(vec![
        concert("Konzert A", "2024-11-03", "Halle X"),
        concert("Konzert A2", "2024-11-03", "Halle X"),
    ]);
    assert_eq!(old[0].colour, Colour::Duplicate);

    let new = vec![concert("Konzert A", "2024-11-03", "Halle Y")];
    let result = reconcile(&settings(), new, old);

    assert_eq!(result.events[0].status, Status::Changed);
    assert_eq!(result.events[0].record.colour, Colour::Duplicate);
    assert!(result.events[0].record.description.contains("previous location: Halle X"));
}

#[test]
fn test_unchanged_input_round_trips() {
    let scraped = vec![
        concert("Jazz Night", "2024-11-02", "Pumpe"),
        concert("Jazz Night", "2024-11-09", "Pumpe"),
        concert("Lesung", "2024-11-04", "Literaturhaus"),
        concert("Lesung Zwei", "2024-11-04", "Literaturhaus"),
    ];

    let old = yesterday(scraped.clone());
    let result = reconcile(&settings(), scraped, old);

    assert_eq!(result.counts.unchanged, result.counts.total());
    assert_eq!(result.counts.total(), 3);
}

#[test]
fn test_every_old_event_appears_once() {
    let old = yesterday(vec![
        concert("A", "2024-11-02", "Pumpe"),
        concert("B", "2024-11-03", "Pumpe"),
        concert("C", "2024-11-04", "Pumpe"),
    ]);
    let old_count = old.len();
    let new = vec![
        concert("A", "2024-11-02", "Pumpe"),
        concert("C", "2024-11-05", "Pumpe"),
        concert("D", "2024-11-06", "Pumpe"),
    ];

    let result = reconcile(&settings(), new, old);
    let counts = result.counts;

    assert_eq!(counts.unchanged + counts.changed + counts.deleted, old_count);
    assert_eq!(counts.new, 1);
    assert_eq!(counts.changed, 1);
    assert_eq!(counts.deleted, 1);
}

#[test]
fn test_summary_describes_run() {
    let old = yesterday(vec![concert("Gone", "2024-11-03", "Pumpe")]);
    let new = vec![concert("Fresh", "2024-11-03", "Schaubude")];

    let result = reconcile(&settings(), new, old);
    let summary = result.events.last().unwrap();

    assert_eq!(summary.record.subject, "Summary of today's events from 01.11.2024");
    assert_eq!(
        summary.record.description,
        "Total events: 2.\nDeleted events: 1.\nChanged events: 0.\nUnchanged/new events: 1."
    );
}

#[test]
fn test_exact_mode_annotation() {
    let old = yesterday(vec![concert("Konzert A", "2024-11-03", "Halle X")]);
    let new = vec![concert("Konzert A", "2024-11-03", "Halle Y")];

    let mut settings = settings();
    settings.match_mode = MatchMode::Exact;
    let result = reconcile(&settings, new, old);

    assert!(result.events[0].record.description.ends_with("\nOriginal Location: Halle X"));
}

#[test]
fn test_exact_mode_round_trips_recurring_series() {
    let scraped = vec![
        concert("Quiz", "2024-11-02", "Pumpe"),
        concert("Quiz", "2024-11-09", "Pumpe"),
    ];
    let old = yesterday(scraped.clone());

    let mut settings = settings();
    settings.match_mode = MatchMode::Exact;
    let result = reconcile(&settings, scraped, old);

    assert_eq!(result.counts.unchanged, 2);
    assert_eq!(result.counts.changed, 0);
    assert_eq!(result.counts.deleted, 0);
}

#[test]
fn test_normalized_rows_flow_through() {
    let raw = |subject: &str, city: &str, time: &str| RawRecord {
        subject: Some(subject.to_string()),
        start_date: Some("02.11.2024".to_string()),
        start_time: Some(time.to_string()),
        location: Some("Kulturzentrum".to_string()),
        city: Some(city.to_string()),
        ..Default::default()
    };

    let (records, report) = normalize_all(vec![
        raw("Poetry Slam", "Lübeck", "20 Uhr"),
        raw("Poetry-Slam", "Lübeck-Travemünde", "20:00"),
        raw("Broken", "http://example.org", "20:00"),
    ]);
    assert_eq!(report.dropped_total(), 1);

    let result = reconcile(&settings(), records, vec![]);
    let merged = &result.events[0];

    assert_eq!(merged.record.city, "Luebeck");
    assert_eq!(merged.record.counter, 1);
    assert_eq!(merged.status, Status::New);
    assert_eq!(merged.record.colour, Colour::Duplicate);
}
