//! Deduplication of events scraped from several sources.
//!
//! Many listing sites republish the same occurrence. Records that agree on
//! date, time, location and city are collapsed into the first one seen; the
//! others survive only as lines in its description and as its `counter`.

mod similarity;

pub use similarity::{is_similar, subject_similarity};

use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, NaiveTime};
use tracing::debug;

use crate::constants::DEFAULT_SIMILARITY_THRESHOLD;
use crate::event::EventRecord;

/// Key under which records are the same occurrence regardless of subject.
type GroupKey = (NaiveDate, Option<NaiveTime>, String, String);

/// Key for the fuzzy subject pass.
type SlotKey = (NaiveDate, Option<NaiveTime>, String);

#[derive(Debug, Clone)]
pub struct Deduplicator {
    pub fuzzy_subjects: bool,
    pub similarity_threshold: f64,
}

impl Default for Deduplicator {
    fn default() -> Self {
        Deduplicator {
            fuzzy_subjects: true,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

impl Deduplicator {
    pub fn new(fuzzy_subjects: bool, similarity_threshold: f64) -> Self {
        Deduplicator {
            fuzzy_subjects,
            similarity_threshold,
        }
    }

    /// Collapse duplicate groups, then optionally drop near-identical subjects.
    pub fn dedup(&self, records: Vec<EventRecord>) -> Vec<EventRecord> {
        let before = records.len();
        let mut records = collapse_groups(records);

        if self.fuzzy_subjects {
            records = drop_similar_subjects(records, self.similarity_threshold);
        }

        debug!(before, after = records.len(), "Deduplicated records");
        records
    }
}

fn group_key(record: &EventRecord) -> Option<GroupKey> {
    // Without a location there is no evidence two records are the same place
    let location = record.location.as_ref()?;
    Some((
        record.start_date,
        record.start_time,
        location.clone(),
        record.city.clone(),
    ))
}

/// Merge every group of same-time, same-place records into its first member.
///
/// Output order follows the first occurrence of each group.
pub fn collapse_groups(records: Vec<EventRecord>) -> Vec<EventRecord> {
    let mut groups: Vec<(EventRecord, Vec<EventRecord>)> = Vec::new();
    let mut index: HashMap<GroupKey, usize> = HashMap::new();

    for record in records {
        match group_key(&record) {
            Some(key) => match index.get(&key) {
                Some(&i) => groups[i].1.push(record),
                None => {
                    index.insert(key, groups.len());
                    groups.push((record, Vec::new()));
                }
            },
            None => groups.push((record, Vec::new())),
        }
    }

    groups
        .into_iter()
        .map(|(keeper, dropped)| merge_group(keeper, dropped))
        .collect()
}

fn merge_group(mut keeper: EventRecord, dropped: Vec<EventRecord>) -> EventRecord {
    if dropped.is_empty() {
        return keeper;
    }

    let suppressed = dropped.len() as u32;
    let mut description = format!(
        "{} event(s) found at the same time/location. Please check the following:\n",
        suppressed
    );
    for other in &dropped {
        description.push_str(&format!("Event {}: {}\n", other.subject, other.description));
    }
    description.push_str(&keeper.description);

    keeper.counter += suppressed + dropped.iter().map(|r| r.counter).sum::<u32>();
    keeper.description = description;
    keeper
}

/// Merge records whose subject nearly equals an earlier one in the same slot.
///
/// Within each (date, time, city) slot subjects are visited in sorted order;
/// a record survives only if it is dissimilar to every surviving record,
/// otherwise it is merged into the first similar survivor like an exact
/// duplicate.
pub fn drop_similar_subjects(records: Vec<EventRecord>, threshold: f64) -> Vec<EventRecord> {
    let mut slots: HashMap<SlotKey, Vec<usize>> = HashMap::new();
    for (i, record) in records.iter().enumerate() {
        slots
            .entry((record.start_date, record.start_time, record.city.clone()))
            .or_default()
            .push(i);
    }

    let mut absorbed: HashMap<usize, Vec<usize>> = HashMap::new();
    let mut dropped = HashSet::new();
    for mut members in slots.into_values() {
        if members.len() < 2 {
            continue;
        }
        members.sort_by(|a, b| records[*a].subject.cmp(&records[*b].subject));

        let mut kept: Vec<usize> = Vec::new();
        for i in members {
            let subject = &records[i].subject;
            if let Some(&similar) = kept
                .iter()
                .find(|&&k| is_similar(&records[k].subject, subject, threshold))
            {
                debug!(
                    subject = %subject,
                    kept = %records[similar].subject,
                    "Merging near-duplicate subject"
                );
                absorbed.entry(similar).or_default().push(i);
                dropped.insert(i);
            } else {
                kept.push(i);
            }
        }
    }

    let mut pool: Vec<Option<EventRecord>> = records.into_iter().map(Some).collect();
    let mut result = Vec::with_capacity(pool.len() - dropped.len());
    for i in 0..pool.len() {
        if dropped.contains(&i) {
            continue;
        }
        let Some(keeper) = pool[i].take() else {
            continue;
        };
        let others: Vec<EventRecord> = absorbed
            .remove(&i)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|j| pool[j].take())
            .collect();
        result.push(merge_group(keeper, others));
    }
    result
}
