//! Calendar operations via a provider binary.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::calendar_event::CalendarEvent;
use crate::error::EventsyncResult;
use crate::remote::CalendarRemote;
use crate::remote::protocol::{CreateEvent, DeleteEvent, EventPage, ListEvents};
use crate::remote::provider::Provider;

#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct RemoteConfig(pub HashMap<String, toml::Value>);

impl From<&RemoteConfig> for serde_json::Map<String, serde_json::Value> {
    fn from(config: &RemoteConfig) -> Self {
        config
            .0
            .iter()
            .filter_map(|(k, v)| serde_json::to_value(v).ok().map(|v| (k.clone(), v)))
            .collect()
    }
}

/// The `[calendar]` config section: which provider, which calendar, and
/// whatever else the provider needs.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Remote {
    pub provider: Provider,
    pub calendar_id: String,
    #[serde(flatten)]
    pub config: RemoteConfig,
}

impl Remote {
    pub fn new(provider: Provider, calendar_id: impl Into<String>, config: RemoteConfig) -> Self {
        Remote {
            provider,
            calendar_id: calendar_id.into(),
            config,
        }
    }

    fn remote_config(&self) -> serde_json::Map<String, serde_json::Value> {
        serde_json::Map::from(&self.config)
    }

    /// The account identifier, taken from a `{provider}_account` key
    /// (e.g., `google_account`).
    pub fn account_identifier(&self) -> Option<&str> {
        let key = format!("{}_account", self.provider.name());
        self.config.0.get(&key).and_then(|v| v.as_str())
    }
}

impl CalendarRemote for Remote {
    async fn insert(&self, calendar_id: &str, event: &CalendarEvent) -> EventsyncResult<String> {
        self.provider
            .call(CreateEvent {
                remote_config: self.remote_config(),
                calendar_id: calendar_id.to_string(),
                event: event.clone(),
            })
            .await
    }

    async fn delete(&self, calendar_id: &str, event_id: &str) -> EventsyncResult<()> {
        self.provider
            .call(DeleteEvent {
                remote_config: self.remote_config(),
                calendar_id: calendar_id.to_string(),
                event_id: event_id.to_string(),
            })
            .await
    }

    async fn list(&self, calendar_id: &str, page_token: Option<&str>) -> EventsyncResult<EventPage> {
        self.provider
            .call(ListEvents {
                remote_config: self.remote_config(),
                calendar_id: calendar_id.to_string(),
                page_token: page_token.map(str::to_string),
            })
            .await
    }
}
