use anyhow::{Context, Result};
use chrono::NaiveDate;
use eventsync_core::config::EventsyncConfig;
use eventsync_core::sync::SyncDriver;
use owo_colors::OwoColorize;
use tracing::warn;

use crate::render::{ReconciliationRender, Render, render_sync_report};
use crate::singleton;
use crate::utils::tui;

use super::{local_now, prepare, resolve_today};

pub async fn run(date: Option<NaiveDate>, verbose: bool) -> Result<()> {
    let config = EventsyncConfig::load()?;
    let remote = config.calendar()?.clone();
    let _lock = singleton::acquire_lock(&config.data_path())?;
    let today = resolve_today(date, &config)?;

    let prepared = prepare(&config, today)?;
    let reconciliation = &prepared.reconciliation;

    println!("{}", prepared.report.render());
    println!("{}", format!("Events from {}", today.format("%d.%m.%Y")).bold());
    println!("{}", reconciliation.render(verbose));
    println!();

    let events = reconciliation.calendar_events(&config.time_zone, local_now(&config)?);
    let driver = SyncDriver::new(remote.clone(), remote.calendar_id.clone(), config.sync_policy()?);

    let spinner = tui::create_spinner(format!("Syncing {} events to {}", events.len(), remote.render()));
    let result = driver.replace_all(&events).await;
    spinner.finish_and_clear();

    println!("{}", remote.render());
    let (insert_failures, delete_failures) = match result {
        Ok(report) => {
            println!("{}", render_sync_report(&report));
            (report.inserts.failed(), report.deletes.failed())
        }
        // The snapshot is still written: the next diff is against today's data
        Err(e) => {
            warn!(error = %e, "Calendar sync aborted");
            println!("   {}", format!("Could not list calendar events: {e}").red());
            (events.len(), 0)
        }
    };

    let path = prepared
        .store
        .save(&reconciliation.to_snapshot())
        .context("Failed to save snapshot")?;

    let counts = &reconciliation.counts;
    println!(
        "\nProcessed {} events: {} new, {} unchanged, {} changed, {} deleted",
        counts.total(),
        counts.new,
        counts.unchanged,
        counts.changed,
        counts.deleted
    );
    if insert_failures > 0 || delete_failures > 0 {
        println!(
            "{}",
            format!("{insert_failures} insert failures, {delete_failures} delete failures").red()
        );
    }
    println!("{}", format!("Snapshot saved to {}", path.display()).dimmed());

    Ok(())
}
