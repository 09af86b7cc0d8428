//! TUI rendering traits for eventsync types.
//!
//! Extension traits that add colored terminal rendering to eventsync-core
//! types using owo_colors.

use eventsync_core::normalize::NormalizeReport;
use eventsync_core::pipeline::Reconciliation;
use eventsync_core::remote::Remote;
use eventsync_core::sync::{SyncReport, SyncStats};
use eventsync_core::{Colour, ReconciledEvent, Status};
use owo_colors::OwoColorize;

/// Extension trait for TUI rendering with colors.
pub trait Render {
    fn render(&self) -> String;
}

impl Render for Status {
    fn render(&self) -> String {
        let symbol = self.symbol();
        match self {
            Status::New | Status::Unchanged => symbol.green().to_string(),
            Status::Changed => symbol.yellow().to_string(),
            Status::Deleted => symbol.red().to_string(),
        }
    }
}

/// Colorize text according to status, duplicates standing out
fn colorize(event: &ReconciledEvent, text: &str) -> String {
    if event.record.colour == Colour::Duplicate {
        return text.magenta().to_string();
    }
    match event.status {
        Status::New | Status::Unchanged => text.green().to_string(),
        Status::Changed => text.yellow().to_string(),
        Status::Deleted => text.red().to_string(),
    }
}

impl Render for ReconciledEvent {
    fn render(&self) -> String {
        let record = &self.record;
        let subject = colorize(self, &record.subject);

        let when = match record.start_time {
            Some(time) => format!("{} {}", record.start_date.format("%d.%m.%Y"), time.format("%H:%M")),
            None => record.start_date.format("%d.%m.%Y").to_string(),
        };
        let duplicates = if record.counter > 0 {
            format!(" (+{} duplicate)", record.counter)
        } else {
            String::new()
        };

        format!(
            "{} {}{} {}",
            self.status.render(),
            subject,
            duplicates.magenta(),
            when.dimmed()
        )
    }
}

impl Render for Remote {
    fn render(&self) -> String {
        format!("📅 {} ({})", self.calendar_id, self.provider.name())
    }
}

impl Render for NormalizeReport {
    fn render(&self) -> String {
        let mut line = format!("Loaded {} scraped {}", self.accepted, pluralize("event", self.accepted));

        if !self.dropped.is_empty() {
            let reasons: Vec<String> = self
                .dropped
                .iter()
                .map(|(reason, count)| format!("{} {}", count, reason))
                .collect();
            let dropped = format!(", dropped {}", reasons.join(", "));
            line.push_str(&dropped.dimmed().to_string());
        }

        line
    }
}

impl Render for SyncStats {
    fn render(&self) -> String {
        let mut line = format!("{} ok", self.succeeded);
        if self.failed() > 0 {
            line.push_str(&format!(", {}", format!("{} failed", self.failed()).red()));
        }
        line
    }
}

/// Threshold for compact view (show counts instead of individual events)
const COMPACT_THRESHOLD: usize = 10;

fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}

/// Rendering for a whole run, grouped by city
pub trait ReconciliationRender {
    fn render(&self, verbose: bool) -> String;
}

impl ReconciliationRender for Reconciliation {
    fn render(&self, verbose: bool) -> String {
        let counts = &self.counts;
        if counts.total() == 0 {
            return "   No events".dimmed().to_string();
        }

        let mut lines = Vec::new();

        if verbose || counts.total() <= COMPACT_THRESHOLD {
            let mut city: Option<&str> = None;
            for event in self.classified() {
                if city != Some(event.record.city.as_str()) {
                    city = Some(event.record.city.as_str());
                    lines.push(format!("   {}", event.record.city.bold()));
                }
                lines.push(format!("      {}", event.render()));
            }
        } else {
            let duplicates = self
                .classified()
                .iter()
                .filter(|e| e.record.colour == Colour::Duplicate)
                .count();

            let rows = [
                (counts.new, "+".green().to_string(), "new"),
                (counts.unchanged, "=".green().to_string(), "unchanged"),
                (counts.changed, "~".yellow().to_string(), "changed"),
                (counts.deleted, "-".red().to_string(), "deleted"),
            ];
            for (count, symbol, label) in rows {
                if count > 0 {
                    lines.push(format!(
                        "   {} ({} {} {})",
                        symbol,
                        count,
                        label,
                        pluralize("event", count)
                    ));
                }
            }
            if duplicates > 0 {
                let label = format!("({} flagged as duplicate)", duplicates);
                lines.push(format!("   {} {}", "!".magenta(), label.magenta()));
            }
        }

        lines.join("\n")
    }
}

pub fn render_sync_report(report: &SyncReport) -> String {
    let mut lines = vec![
        format!("   Deleted: {}", report.deletes.render()),
        format!("   Inserted: {}", report.inserts.render()),
    ];

    for failure in report.deletes.failures.iter().chain(&report.inserts.failures) {
        lines.push(format!(
            "      {} {}: {}",
            "x".red(),
            failure.item,
            failure.error.dimmed()
        ));
    }

    lines.join("\n")
}
