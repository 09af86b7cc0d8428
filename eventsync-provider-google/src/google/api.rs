use crate::config;
use crate::google::to_google::to_google_event;
use crate::types::{AccountTokens, GoogleCredentials};
use anyhow::{Context, Result};
use eventsync_core::calendar_event::CalendarEvent;
use eventsync_core::remote::EventPage;
use google_calendar::{Client, ClientError};
use google_calendar::types::{OrderBy, SendUpdates};
use tracing::{debug, info};

const REDIRECT_URI: &str = "http://localhost:8085/callback";

const HTTP_GONE: u16 = 410;

fn client_error_status(err: &ClientError) -> Option<u16> {
    match err {
        ClientError::HttpError { status, .. } => Some(status.as_u16()),
        _ => None,
    }
}

/// HTTP status the Calendar API answered a failed call with, if any
pub fn http_status(err: &anyhow::Error) -> Option<u16> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<ClientError>())
        .and_then(client_error_status)
}

/// Create a Google Calendar client from stored tokens
fn create_client(creds: &GoogleCredentials, tokens: &AccountTokens) -> Client {
    Client::new(
        creds.client_id.clone(),
        creds.client_secret.clone(),
        REDIRECT_URI.to_string(),
        tokens.access_token.clone(),
        tokens.refresh_token.clone(),
    )
}

/// Client for an account, refreshing its tokens first if they are about to expire
async fn client_for_account(account: &str) -> Result<Client> {
    let creds = config::load_credentials()?;
    let mut tokens = config::load_tokens(account)?;

    if tokens.need_refresh(chrono::Utc::now()) {
        info!(account, "Access token expired, refreshing");
        tokens = refresh_tokens(&creds, &tokens).await?;
        config::save_tokens(account, &tokens)?;
    }

    Ok(create_client(&creds, &tokens))
}

async fn refresh_tokens(creds: &GoogleCredentials, tokens: &AccountTokens) -> Result<AccountTokens> {
    let client = create_client(creds, tokens);

    let access_token = client
        .refresh_access_token()
        .await
        .context("Failed to refresh token")?;

    let expires_at = if access_token.expires_in > 0 {
        Some(chrono::Utc::now() + chrono::Duration::seconds(access_token.expires_in))
    } else {
        None
    };

    // Google usually keeps the old refresh token
    let refresh_token = if access_token.refresh_token.is_empty() {
        tokens.refresh_token.clone()
    } else {
        access_token.refresh_token
    };

    Ok(AccountTokens {
        access_token: access_token.access_token,
        refresh_token,
        expires_at,
    })
}

/// Create an event and return the id Google assigned to it
pub async fn create_event(account: &str, calendar_id: &str, event: &CalendarEvent) -> Result<String> {
    let client = client_for_account(account).await?;
    let google_event = to_google_event(event)?;

    let response = client
        .events()
        .insert(calendar_id, 0, 0, false, SendUpdates::None, false, &google_event)
        .await
        .with_context(|| format!("Failed to create event: {}", event.summary))?;

    debug!(id = %response.body.id, "Created event");
    Ok(response.body.id)
}

/// Delete an event; an event that is already gone counts as deleted
pub async fn delete_event(account: &str, calendar_id: &str, event_id: &str) -> Result<()> {
    let client = client_for_account(account).await?;

    let result = client
        .events()
        .delete(calendar_id, event_id, false, SendUpdates::None)
        .await;

    match result {
        Ok(_) => Ok(()),
        Err(e) if client_error_status(&e) == Some(HTTP_GONE) => Ok(()),
        Err(e) => Err(e).with_context(|| format!("Failed to delete event: {event_id}")),
    }
}

/// Ids of every live event in the calendar.
///
/// The client pages internally, so the whole listing comes back as one page.
pub async fn list_event_ids(account: &str, calendar_id: &str) -> Result<EventPage> {
    let client = client_for_account(account).await?;

    let response = client
        .events()
        .list_all(
            calendar_id,
            "",
            0,
            OrderBy::default(),
            &[],
            "",
            &[],
            false,
            false,
            false,
            "",
            "",
            "",
            "",
        )
        .await
        .context("Failed to fetch events")?;

    let event_ids: Vec<String> = response
        .body
        .into_iter()
        .filter(|event| event.status != "cancelled" && !event.id.is_empty())
        .map(|event| event.id)
        .collect();

    debug!(count = event_ids.len(), "Listed events");
    Ok(EventPage {
        event_ids,
        next_page_token: None,
    })
}
