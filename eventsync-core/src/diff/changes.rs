//! Field-level comparison of a matched old/new pair.

use chrono::{NaiveDate, NaiveTime};

use crate::diff::MatchMode;
use crate::event::EventRecord;

/// Fields that decide whether a matched event changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    StartDate,
    StartTime,
    EndDate,
    EndTime,
    Location,
    Category,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::StartDate,
        Field::StartTime,
        Field::EndDate,
        Field::EndTime,
        Field::Location,
        Field::Category,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Field::StartDate => "date",
            Field::StartTime => "time",
            Field::EndDate => "end date",
            Field::EndTime => "end time",
            Field::Location => "location",
            Field::Category => "category",
        }
    }

    fn title(self) -> &'static str {
        match self {
            Field::StartDate => "Date",
            Field::StartTime => "Time",
            Field::EndDate => "End Date",
            Field::EndTime => "End Time",
            Field::Location => "Location",
            Field::Category => "Category",
        }
    }

    /// The field as display text; `None` when the record has no value.
    fn value(self, record: &EventRecord) -> Option<String> {
        match self {
            Field::StartDate => Some(format_date(record.start_date)),
            Field::StartTime => record.start_time.map(format_time),
            Field::EndDate => record.end_date.map(format_date),
            Field::EndTime => record.end_time.map(format_time),
            Field::Location => record.location.clone(),
            Field::Category => record.category.clone(),
        }
    }
}

/// One differing field with the value it had in the previous run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: Field,
    pub old: String,
}

impl FieldChange {
    /// Description suffix recording the previous value.
    pub fn annotation(&self, mode: MatchMode) -> String {
        match mode {
            MatchMode::Ranked => format!(" | previous {}: {}", self.field.label(), self.old),
            MatchMode::Exact => format!("\nOriginal {}: {}", self.field.title(), self.old),
        }
    }
}

/// Fields that differ between `old` and `new`. A field missing on either
/// side is never a difference.
pub fn compare(old: &EventRecord, new: &EventRecord) -> Vec<FieldChange> {
    Field::ALL
        .iter()
        .filter_map(|&field| match (field.value(old), field.value(new)) {
            (Some(old), Some(new)) if old != new => Some(FieldChange { field, old }),
            _ => None,
        })
        .collect()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> EventRecord {
        let start = NaiveDate::from_ymd_opt(2024, 11, 1).unwrap();
        let mut record = EventRecord::new("Konzert", start, "Kiel");
        record.start_time = NaiveTime::from_hms_opt(20, 0, 0);
        record.location = Some("Halle X".to_string());
        record
    }

    #[test]
    fn test_identical_records_have_no_changes() {
        assert!(compare(&record(), &record()).is_empty());
    }

    #[test]
    fn test_missing_values_are_not_differences() {
        let old = record();
        let mut new = record();
        new.location = None;
        new.start_time = None;
        new.category = Some("Konzert".to_string());

        assert!(compare(&old, &new).is_empty());
    }

    #[test]
    fn test_changes_carry_old_values() {
        let old = record();
        let mut new = record();
        new.location = Some("Halle Y".to_string());
        new.start_date = NaiveDate::from_ymd_opt(2024, 11, 2).unwrap();

        let changes = compare(&old, &new);
        assert_eq!(
            changes,
            vec![
                FieldChange {
                    field: Field::StartDate,
                    old: "01.11.2024".to_string()
                },
                FieldChange {
                    field: Field::Location,
                    old: "Halle X".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_annotation_per_mode() {
        let change = FieldChange {
            field: Field::StartTime,
            old: "20:00".to_string(),
        };
        assert_eq!(change.annotation(MatchMode::Ranked), " | previous time: 20:00");
        assert_eq!(change.annotation(MatchMode::Exact), "\nOriginal Time: 20:00");
    }
}
