//! Durable store for the output of previous runs.
//!
//! One JSON file per run date (`snapshot-YYYYMMDD.json`) in the data
//! directory. The next run diffs against the newest file dated before it.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constants::DEFAULT_SNAPSHOT_RETENTION;
use crate::error::{EventsyncError, EventsyncResult};
use crate::event::ReconciledEvent;

const FILE_PREFIX: &str = "snapshot-";
const FILE_SUFFIX: &str = ".json";

/// The finalized output of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub load_date: NaiveDate,
    pub rows: Vec<ReconciledEvent>,
}

pub struct SnapshotStore {
    dir: PathBuf,
    retention: usize,
}

impl SnapshotStore {
    pub fn open(dir: impl Into<PathBuf>) -> EventsyncResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| {
            EventsyncError::Snapshot(format!("Could not create {}: {e}", dir.display()))
        })?;

        Ok(SnapshotStore {
            dir,
            retention: DEFAULT_SNAPSHOT_RETENTION,
        })
    }

    pub fn with_retention(mut self, retention: usize) -> Self {
        self.retention = retention;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{FILE_PREFIX}{}{FILE_SUFFIX}", date.format("%Y%m%d")))
    }

    /// Dates of all stored snapshots, oldest first.
    pub fn dates(&self) -> EventsyncResult<Vec<NaiveDate>> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| {
            EventsyncError::Snapshot(format!("Could not read {}: {e}", self.dir.display()))
        })?;

        let mut dates: Vec<NaiveDate> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().to_str().and_then(parse_file_name))
            .collect();

        dates.sort();
        Ok(dates)
    }

    pub fn load(&self, date: NaiveDate) -> EventsyncResult<Snapshot> {
        let path = self.path_for(date);
        let content = std::fs::read_to_string(&path).map_err(|e| {
            EventsyncError::Snapshot(format!("Could not read {}: {e}", path.display()))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            EventsyncError::Serialization(format!("Invalid snapshot {}: {e}", path.display()))
        })
    }

    /// The newest snapshot dated strictly before `today`, if any.
    pub fn load_previous(&self, today: NaiveDate) -> EventsyncResult<Option<Snapshot>> {
        let previous = self.dates()?.into_iter().rev().find(|date| *date < today);

        match previous {
            Some(date) => {
                let snapshot = self.load(date)?;
                info!(date = %date, rows = snapshot.rows.len(), "Loaded previous snapshot");
                Ok(Some(snapshot))
            }
            None => {
                info!("No previous snapshot, every event is new");
                Ok(None)
            }
        }
    }

    /// Atomically replace the snapshot for `snapshot.load_date`, then prune.
    pub fn save(&self, snapshot: &Snapshot) -> EventsyncResult<PathBuf> {
        let path = self.path_for(snapshot.load_date);
        let temp = path.with_extension("json.tmp");

        let content = serde_json::to_string_pretty(snapshot)
            .map_err(|e| EventsyncError::Serialization(e.to_string()))?;

        std::fs::write(&temp, content)?;
        std::fs::rename(&temp, &path)?;
        debug!(path = %path.display(), rows = snapshot.rows.len(), "Saved snapshot");

        self.prune()?;
        Ok(path)
    }

    /// Remove all but the newest `retention` snapshots.
    fn prune(&self) -> EventsyncResult<()> {
        let dates = self.dates()?;
        if dates.len() <= self.retention {
            return Ok(());
        }

        let excess = dates.len() - self.retention;
        for date in &dates[..excess] {
            std::fs::remove_file(self.path_for(*date))?;
            debug!(date = %date, "Pruned snapshot");
        }
        Ok(())
    }
}

fn parse_file_name(name: &str) -> Option<NaiveDate> {
    let stamp = name.strip_prefix(FILE_PREFIX)?.strip_suffix(FILE_SUFFIX)?;
    NaiveDate::parse_from_str(stamp, "%Y%m%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventRecord, Status};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn snapshot(day: &str, subjects: &[&str]) -> Snapshot {
        Snapshot {
            load_date: date(day),
            rows: subjects
                .iter()
                .map(|s| ReconciledEvent::new(EventRecord::new(*s, date(day), "Kiel"), Status::New))
                .collect(),
        }
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();

        let saved = snapshot("2024-11-01", &["A", "B"]);
        let path = store.save(&saved).unwrap();
        assert!(path.ends_with("snapshot-20241101.json"));

        assert_eq!(store.load(date("2024-11-01")).unwrap(), saved);
    }

    #[test]
    fn test_load_previous_is_strictly_before_today() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();
        store.save(&snapshot("2024-10-30", &["old"])).unwrap();
        store.save(&snapshot("2024-10-31", &["yesterday"])).unwrap();
        store.save(&snapshot("2024-11-01", &["today"])).unwrap();

        let previous = store.load_previous(date("2024-11-01")).unwrap().unwrap();
        assert_eq!(previous.load_date, date("2024-10-31"));
        assert_eq!(previous.rows[0].record.subject, "yesterday");

        assert!(store.load_previous(date("2024-10-30")).unwrap().is_none());
    }

    #[test]
    fn test_save_replaces_same_day() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();
        store.save(&snapshot("2024-11-01", &["first"])).unwrap();
        store.save(&snapshot("2024-11-01", &["second"])).unwrap();

        let loaded = store.load(date("2024-11-01")).unwrap();
        assert_eq!(loaded.rows.len(), 1);
        assert_eq!(loaded.rows[0].record.subject, "second");
        assert!(!dir.path().join("snapshot-20241101.json.tmp").exists());
    }

    #[test]
    fn test_prune_keeps_newest() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap().with_retention(2);
        for day in ["2024-10-29", "2024-10-30", "2024-10-31", "2024-11-01"] {
            store.save(&snapshot(day, &[])).unwrap();
        }

        assert_eq!(store.dates().unwrap(), vec![date("2024-10-31"), date("2024-11-01")]);
    }

    #[test]
    fn test_unrelated_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.json"), "{}").unwrap();
        std::fs::write(dir.path().join("snapshot-latest.json"), "{}").unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();

        assert!(store.dates().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("snapshot-20241031.json"), "not json").unwrap();
        let store = SnapshotStore::open(dir.path()).unwrap();

        assert!(store.load_previous(date("2024-11-01")).is_err());
    }
}
