//! Calendar sync driver with bounded retries.

use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::calendar_event::CalendarEvent;
use crate::constants::{DEFAULT_BATCH_SIZE, DEFAULT_COOLDOWN_SECS, DEFAULT_MAX_ROUNDS};
use crate::error::{EventsyncError, EventsyncResult};
use crate::remote::{CalendarRemote, EventPage};

/// Retry and rate-limit behaviour for calendar writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPolicy {
    /// Passes over the operations; transient failures wait for the next pass
    pub max_rounds: usize,
    /// Successful operations between two cooldowns
    pub batch_size: usize,
    pub cooldown: Duration,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        SyncPolicy {
            max_rounds: DEFAULT_MAX_ROUNDS,
            batch_size: DEFAULT_BATCH_SIZE,
            cooldown: Duration::from_secs(DEFAULT_COOLDOWN_SECS),
        }
    }
}

/// An operation that could not be completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    pub item: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub succeeded: usize,
    pub failures: Vec<SyncFailure>,
}

impl SyncStats {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    fn record_failure(&mut self, item: String, error: &EventsyncError) {
        self.failures.push(SyncFailure {
            item,
            error: error.to_string(),
        });
    }
}

/// Outcome of replacing a calendar's contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub deletes: SyncStats,
    pub inserts: SyncStats,
}

enum Operation<'a> {
    Insert(&'a CalendarEvent),
    Delete(&'a str),
}

impl fmt::Display for Operation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Insert(event) => write!(f, "insert '{}'", event.summary),
            Operation::Delete(id) => write!(f, "delete {}", id),
        }
    }
}

pub struct SyncDriver<R> {
    remote: R,
    calendar_id: String,
    policy: SyncPolicy,
}

impl<R: CalendarRemote> SyncDriver<R> {
    pub fn new(remote: R, calendar_id: impl Into<String>, policy: SyncPolicy) -> Self {
        SyncDriver {
            remote,
            calendar_id: calendar_id.into(),
            policy,
        }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub async fn insert_all(&self, events: &[CalendarEvent]) -> SyncStats {
        self.run(events.iter().map(Operation::Insert).collect()).await
    }

    pub async fn delete_all(&self, event_ids: &[String]) -> SyncStats {
        self.run(event_ids.iter().map(|id| Operation::Delete(id)).collect())
            .await
    }

    /// Ids of every event in the calendar, following page tokens.
    pub async fn list_all_ids(&self) -> EventsyncResult<Vec<String>> {
        let mut ids = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self.list_page(page_token.as_deref()).await?;
            ids.extend(page.event_ids);

            match page.next_page_token {
                Some(token) if Some(&token) != page_token.as_ref() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(count = ids.len(), "Listed calendar events");
        Ok(ids)
    }

    /// One listing page; transient failures are retried up to `max_rounds` times.
    async fn list_page(&self, page_token: Option<&str>) -> EventsyncResult<EventPage> {
        let mut attempt = 1;
        loop {
            match self.remote.list(&self.calendar_id, page_token).await {
                Err(e) if e.is_transient() && attempt < self.policy.max_rounds => {
                    debug!(attempt, error = %e, "Listing failed, will retry");
                    attempt += 1;
                    self.cool_down().await;
                }
                result => return result,
            }
        }
    }

    /// Delete every event in the calendar.
    pub async fn purge(&self) -> EventsyncResult<SyncStats> {
        let ids = self.list_all_ids().await?;
        info!(count = ids.len(), calendar = %self.calendar_id, "Purging calendar");
        Ok(self.delete_all(&ids).await)
    }

    /// Purge the calendar, then insert `events`.
    pub async fn replace_all(&self, events: &[CalendarEvent]) -> EventsyncResult<SyncReport> {
        let deletes = self.purge().await?;
        let inserts = self.insert_all(events).await;
        Ok(SyncReport { deletes, inserts })
    }

    async fn execute(&self, operation: &Operation<'_>) -> EventsyncResult<()> {
        match operation {
            Operation::Insert(event) => self
                .remote
                .insert(&self.calendar_id, event)
                .await
                .map(|_| ()),
            Operation::Delete(id) => self.remote.delete(&self.calendar_id, id).await,
        }
    }

    async fn cool_down(&self) {
        if self.policy.cooldown.is_zero() {
            return;
        }
        info!(seconds = self.policy.cooldown.as_secs(), "Cooling down");
        tokio::time::sleep(self.policy.cooldown).await;
    }

    /// Run operations in rounds. Transient failures are retried in the next
    /// round; permanent failures are recorded at once.
    async fn run(&self, operations: Vec<Operation<'_>>) -> SyncStats {
        let mut stats = SyncStats::default();
        let mut pending: Vec<(Operation<'_>, Option<EventsyncError>)> =
            operations.into_iter().map(|op| (op, None)).collect();
        let mut since_cooldown = 0;

        for round in 1..=self.policy.max_rounds {
            if pending.is_empty() {
                break;
            }
            if round > 1 {
                info!(round, pending = pending.len(), "Retrying transient failures");
                self.cool_down().await;
                since_cooldown = 0;
            }

            let mut retry = Vec::new();
            for (operation, _) in pending {
                match self.execute(&operation).await {
                    Ok(()) => {
                        stats.succeeded += 1;
                        since_cooldown += 1;
                        if since_cooldown >= self.policy.batch_size {
                            self.cool_down().await;
                            since_cooldown = 0;
                        }
                    }
                    Err(e) if e.is_transient() => {
                        debug!(%operation, error = %e, "Transient failure, will retry");
                        retry.push((operation, Some(e)));
                    }
                    Err(e) => {
                        warn!(%operation, error = %e, "Calendar operation failed");
                        stats.record_failure(operation.to_string(), &e);
                    }
                }
            }
            pending = retry;
        }

        for (operation, error) in pending {
            if let Some(e) = error {
                warn!(%operation, error = %e, "Giving up after retries");
                stats.record_failure(operation.to_string(), &e);
            }
        }

        stats
    }
}
