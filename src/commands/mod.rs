pub mod purge;
pub mod run;
pub mod status;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use eventsync_core::config::EventsyncConfig;
use eventsync_core::normalize::{self, NormalizeReport};
use eventsync_core::pipeline::{self, Reconciliation};
use eventsync_core::snapshot::SnapshotStore;
use tracing::debug;

const SNAPSHOT_DIR: &str = "snapshots";

/// A reconciled run, ready to print or publish.
pub struct Prepared {
    pub reconciliation: Reconciliation,
    pub report: NormalizeReport,
    pub store: SnapshotStore,
}

/// Today in the configured zone, unless overridden on the command line.
pub fn resolve_today(date: Option<NaiveDate>, config: &EventsyncConfig) -> Result<NaiveDate> {
    match date {
        Some(date) => Ok(date),
        None => Ok(Utc::now().with_timezone(&config.tz()?).date_naive()),
    }
}

pub fn local_now(config: &EventsyncConfig) -> Result<NaiveDateTime> {
    Ok(Utc::now().with_timezone(&config.tz()?).naive_local())
}

pub fn open_store(config: &EventsyncConfig) -> Result<SnapshotStore> {
    let store = SnapshotStore::open(config.data_path().join(SNAPSHOT_DIR))
        .context("Failed to open snapshot store")?;
    Ok(store.with_retention(config.snapshot.retention))
}

/// Load today's scraper output and the previous snapshot, and reconcile.
pub fn prepare(config: &EventsyncConfig, today: NaiveDate) -> Result<Prepared> {
    let input_dir = config.input_path();
    debug!(input_dir = %input_dir.display(), %today, "Loading scraper output");
    let raws = normalize::load_dir(&input_dir)
        .with_context(|| format!("Failed to load scraper output from {}", input_dir.display()))?;
    let (records, report) = normalize::normalize_all(raws);

    let store = open_store(config)?;
    let old = store
        .load_previous(today)
        .context("Failed to load previous snapshot")?
        .map(|snapshot| pipeline::prepare_old(snapshot.rows, today, &config.summary.city))
        .unwrap_or_default();

    let settings = config.pipeline_settings(today);
    let reconciliation = pipeline::reconcile(&settings, records, old);

    Ok(Prepared {
        reconciliation,
        report,
        store,
    })
}
