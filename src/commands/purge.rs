use anyhow::Result;
use eventsync_core::config::EventsyncConfig;
use eventsync_core::sync::SyncDriver;

use crate::render::Render;
use crate::singleton;
use crate::utils::tui;

pub async fn run() -> Result<()> {
    let config = EventsyncConfig::load()?;
    let remote = config.calendar()?.clone();
    let _lock = singleton::acquire_lock(&config.data_path())?;

    let driver = SyncDriver::new(remote.clone(), remote.calendar_id.clone(), config.sync_policy()?);

    let spinner = tui::create_spinner(format!("Purging {}", remote.render()));
    let result = driver.purge().await;
    spinner.finish_and_clear();

    let stats = result?;
    println!("{}", remote.render());
    println!("   Deleted: {}", stats.render());
    for failure in &stats.failures {
        println!("      {}: {}", failure.item, failure.error);
    }

    Ok(())
}
