//! Day-over-day diff of the event set.
//!
//! Old (previous snapshot) and new (today's filtered records) are partitioned
//! by city and matched within each city. Every new event becomes `new`,
//! `changed` or `unchanged`; every old event without a counterpart is kept as
//! `deleted`.

mod changes;
mod city_diff;

pub use changes::{Field, FieldChange, compare, format_date};
pub use city_diff::CityDiff;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::SUMMARY_CITY;
use crate::event::{EventRecord, ReconciledEvent, Status};

/// How old and new events are paired within a city.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Normalized subject, paired by start order
    #[default]
    Ranked,
    /// Identical subject
    Exact,
}

/// Subject reduced to lowercase alphanumerics, the ranked matching key.
pub fn normalize_subject(subject: &str) -> String {
    subject
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone)]
pub struct Differ {
    pub mode: MatchMode,
    /// City of the synthetic summary record, excluded from matching
    pub summary_city: String,
}

impl Default for Differ {
    fn default() -> Self {
        Differ {
            mode: MatchMode::default(),
            summary_city: SUMMARY_CITY.to_string(),
        }
    }
}

impl Differ {
    pub fn new(mode: MatchMode, summary_city: impl Into<String>) -> Self {
        Differ {
            mode,
            summary_city: summary_city.into(),
        }
    }

    /// Classify today's events against the previous run, city by city in
    /// sorted order.
    pub fn diff(&self, old: Vec<EventRecord>, new: Vec<EventRecord>) -> Vec<ReconciledEvent> {
        let mut cities: BTreeMap<String, CityDiff> = BTreeMap::new();

        for record in old {
            if record.city != self.summary_city {
                cities.entry(record.city.clone()).or_default().old.push(record);
            }
        }
        for record in new {
            if record.city != self.summary_city {
                cities.entry(record.city.clone()).or_default().new.push(record);
            }
        }

        let mut events = Vec::new();
        for (city, city_diff) in cities {
            let (old_count, new_count) = (city_diff.old.len(), city_diff.new.len());
            let city_events = city_diff.reconcile(self.mode);
            debug!(city = %city, old = old_count, new = new_count, "Diffed city");
            events.extend(city_events);
        }

        events
    }
}

/// Number of events per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub new: usize,
    pub unchanged: usize,
    pub changed: usize,
    pub deleted: usize,
}

impl StatusCounts {
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a ReconciledEvent>) -> Self {
        let mut counts = StatusCounts::default();
        for event in events {
            match event.status {
                Status::New => counts.new += 1,
                Status::Unchanged => counts.unchanged += 1,
                Status::Changed => counts.changed += 1,
                Status::Deleted => counts.deleted += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.new + self.unchanged + self.changed + self.deleted
    }
}
