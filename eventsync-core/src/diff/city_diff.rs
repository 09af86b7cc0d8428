//! Matching of old and new events within one city.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use crate::diff::changes::compare;
use crate::diff::{MatchMode, normalize_subject};
use crate::event::{Colour, EventRecord, ReconciledEvent, Status};

/// Old and new events of one city.
#[derive(Debug, Default)]
pub struct CityDiff {
    pub old: Vec<EventRecord>,
    pub new: Vec<EventRecord>,
}

impl CityDiff {
    /// Classify every event of this city.
    ///
    /// New events come first in their input order, followed by the old
    /// events that found no counterpart.
    pub fn reconcile(self, mode: MatchMode) -> Vec<ReconciledEvent> {
        let matches = match mode {
            MatchMode::Ranked => rank_pairs(&self.old, &self.new),
            MatchMode::Exact => exact_pairs(&self.old, &self.new),
        };

        let mut old_matched = vec![false; self.old.len()];
        for old_index in matches.iter().flatten() {
            old_matched[*old_index] = true;
        }
        if mode == MatchMode::Exact {
            // An old event whose subject is still listed is never reported deleted
            let listed: HashSet<&str> = self.new.iter().map(|r| r.subject.as_str()).collect();
            for (matched, old) in old_matched.iter_mut().zip(&self.old) {
                *matched |= listed.contains(old.subject.as_str());
            }
        }

        let mut events: Vec<ReconciledEvent> = self
            .new
            .into_iter()
            .zip(&matches)
            .map(|(new, matched)| match matched {
                Some(old_index) => resolve_match(&self.old[*old_index], new, mode),
                None => resolve_new(new),
            })
            .collect();

        events.extend(
            self.old
                .iter()
                .zip(old_matched)
                .filter(|(_, matched)| !matched)
                .map(|(old, _)| resolve_deleted(old)),
        );

        events
    }
}

/// For each new event, the index of the old event it pairs with.
///
/// Events with the same normalized subject are ordered by start and paired
/// by rank, so a recurring event pairs occurrence by occurrence.
fn rank_pairs(old: &[EventRecord], new: &[EventRecord]) -> Vec<Option<usize>> {
    let mut buckets: BTreeMap<String, (Vec<usize>, Vec<usize>)> = BTreeMap::new();
    for (i, record) in old.iter().enumerate() {
        buckets
            .entry(normalize_subject(&record.subject))
            .or_default()
            .0
            .push(i);
    }
    for (i, record) in new.iter().enumerate() {
        buckets
            .entry(normalize_subject(&record.subject))
            .or_default()
            .1
            .push(i);
    }

    let mut matches = vec![None; new.len()];
    for (mut old_indices, mut new_indices) in buckets.into_values() {
        old_indices.sort_by_key(|&i| (old[i].start_date, old[i].start_time, i));
        new_indices.sort_by_key(|&i| (new[i].start_date, new[i].start_time, i));

        for (old_index, new_index) in old_indices.into_iter().zip(new_indices) {
            matches[new_index] = Some(old_index);
        }
    }
    matches
}

/// Events with identical subjects pair in scan order; no old event is used twice.
fn exact_pairs(old: &[EventRecord], new: &[EventRecord]) -> Vec<Option<usize>> {
    let mut unused: HashMap<&str, VecDeque<usize>> = HashMap::new();
    for (i, record) in old.iter().enumerate() {
        unused.entry(record.subject.as_str()).or_default().push_back(i);
    }

    new.iter()
        .map(|record| {
            unused
                .get_mut(record.subject.as_str())
                .and_then(VecDeque::pop_front)
        })
        .collect()
}

fn resolve_match(old: &EventRecord, mut new: EventRecord, mode: MatchMode) -> ReconciledEvent {
    let changes = compare(old, &new);
    for change in &changes {
        new.append_description(&change.annotation(mode));
    }

    let status = if changes.is_empty() {
        Status::Unchanged
    } else {
        Status::Changed
    };

    new.colour = if old.is_duplicate() || new.is_duplicate() {
        Colour::Duplicate
    } else if status == Status::Changed {
        Colour::Changed
    } else {
        Colour::Unchanged
    };

    ReconciledEvent::new(new, status)
}

fn resolve_new(mut new: EventRecord) -> ReconciledEvent {
    if !new.is_duplicate() {
        new.colour = Colour::Unchanged;
    }
    ReconciledEvent::new(new, Status::New)
}

fn resolve_deleted(old: &EventRecord) -> ReconciledEvent {
    let mut record = old.clone();
    record.append_description(" | event deleted");
    record.colour = Colour::Deleted;
    ReconciledEvent::new(record, Status::Deleted)
}
