//! Defines the JSON protocol used between eventsync and provider binaries
//! over stdin/stdout.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::calendar_event::CalendarEvent;

pub trait ProviderCommand: Serialize {
    type Response: DeserializeOwned;
    fn command() -> Command;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    ListEvents,
    CreateEvent,
    DeleteEvent,
}

/// Request sent from eventsync to a provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    pub command: Command,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Response sent from a provider back to eventsync.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response<T> {
    Success {
        data: T,
    },
    Error {
        error: String,
        /// Rate limit or temporary outage; the operation may be retried
        #[serde(default)]
        retryable: bool,
    },
}

impl<T: Serialize> Response<T> {
    pub fn success(data: T) -> String {
        serde_json::to_string(&Response::Success { data }).unwrap_or_else(|e| {
            Response::<()>::error(&format!("Failed to serialize response: {e}"), false)
        })
    }
}

impl Response<()> {
    pub fn error(msg: &str, retryable: bool) -> String {
        serde_json::json!({
            "status": "error",
            "error": msg,
            "retryable": retryable,
        })
        .to_string()
    }
}

/// One page of event ids from a calendar listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPage {
    pub event_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// List the ids of events in a calendar, one page at a time.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListEvents {
    /// Provider-specific config (e.g., google_account)
    #[serde(flatten)]
    pub remote_config: serde_json::Map<String, serde_json::Value>,
    pub calendar_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
}

impl ProviderCommand for ListEvents {
    type Response = EventPage;
    fn command() -> Command {
        Command::ListEvents
    }
}

/// Create an event; the provider answers with the new event's id.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateEvent {
    #[serde(flatten)]
    pub remote_config: serde_json::Map<String, serde_json::Value>,
    pub calendar_id: String,
    pub event: CalendarEvent,
}

impl ProviderCommand for CreateEvent {
    type Response = String;
    fn command() -> Command {
        Command::CreateEvent
    }
}

/// Delete an event by id.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteEvent {
    #[serde(flatten)]
    pub remote_config: serde_json::Map<String, serde_json::Value>,
    pub calendar_id: String,
    pub event_id: String,
}

impl ProviderCommand for DeleteEvent {
    type Response = ();
    fn command() -> Command {
        Command::DeleteEvent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_carries_retryable() {
        let line = Response::<()>::error("503 Service Unavailable", true);
        let response: Response<()> = serde_json::from_str(&line).unwrap();

        match response {
            Response::Error { error, retryable } => {
                assert_eq!(error, "503 Service Unavailable");
                assert!(retryable);
            }
            Response::Success { .. } => panic!("Expected error response"),
        }
    }

    #[test]
    fn test_retryable_defaults_to_false() {
        let response: Response<()> =
            serde_json::from_str(r#"{"status": "error", "error": "bad request"}"#).unwrap();

        assert!(matches!(response, Response::Error { retryable: false, .. }));
    }

    #[test]
    fn test_list_request_flattens_remote_config() {
        let mut remote_config = serde_json::Map::new();
        remote_config.insert("google_account".into(), "me@example.com".into());

        let params = serde_json::to_value(ListEvents {
            remote_config,
            calendar_id: "primary".into(),
            page_token: None,
        })
        .unwrap();

        assert_eq!(params["google_account"], "me@example.com");
        assert_eq!(params["calendar_id"], "primary");
        assert!(params.get("page_token").is_none());
    }
}
