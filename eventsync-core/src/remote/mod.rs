pub mod protocol;
pub mod provider;
mod remote;

pub use protocol::EventPage;
pub use provider::Provider;
pub use remote::{Remote, RemoteConfig};

use crate::calendar_event::CalendarEvent;
use crate::error::EventsyncResult;

/// Write access to an external calendar.
#[allow(async_fn_in_trait)]
pub trait CalendarRemote {
    /// Create an event and return its provider id.
    async fn insert(&self, calendar_id: &str, event: &CalendarEvent) -> EventsyncResult<String>;

    async fn delete(&self, calendar_id: &str, event_id: &str) -> EventsyncResult<()>;

    /// One page of event ids; pass the previous page's token to continue.
    async fn list(&self, calendar_id: &str, page_token: Option<&str>) -> EventsyncResult<EventPage>;
}
