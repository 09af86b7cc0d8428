//! Google Calendar API implementation.

mod api;
mod to_google;

pub use api::{create_event, delete_event, http_status, list_event_ids};
