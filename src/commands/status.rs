use anyhow::Result;
use chrono::NaiveDate;
use eventsync_core::config::EventsyncConfig;
use owo_colors::OwoColorize;

use crate::render::{ReconciliationRender, Render};

use super::{prepare, resolve_today};

pub fn run(date: Option<NaiveDate>, verbose: bool) -> Result<()> {
    let config = EventsyncConfig::load()?;
    let today = resolve_today(date, &config)?;

    let prepared = prepare(&config, today)?;

    println!("{}", prepared.report.render());
    println!("{}", format!("Events from {}", today.format("%d.%m.%Y")).bold());
    println!("{}", prepared.reconciliation.render(verbose));
    println!("\n{}", "Dry run: calendar and snapshot left untouched".dimmed());

    Ok(())
}
