//! eventsync-provider-google - Google Calendar provider for eventsync
//!
//! This binary implements the eventsync provider protocol, communicating
//! with eventsync via JSON over stdin/stdout.
//!
//! The provider reads its own credentials and tokens:
//!   ~/.config/eventsync/providers/google/credentials.json
//!   ~/.config/eventsync/providers/google/tokens/{account}.json

mod config;
mod google;
mod types;

use eventsync_core::calendar_event::CalendarEvent;
use eventsync_core::remote::protocol::{Command, Request, Response};
use serde::Deserialize;
use std::io::{self, BufRead, Write};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Google's alias for the user's main calendar
const DEFAULT_CALENDAR_ID: &str = "primary";

/// Status codes Google uses for rate limits and temporary outages
const RETRYABLE_STATUS_CODES: &[u16] = &[403, 503];

#[tokio::main]
async fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to read stdin: {e}");
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Request>(&line) {
            Ok(request) => handle_request(request).await,
            Err(e) => Response::<()>::error(&format!("Failed to parse request: {e}"), false),
        };

        writeln!(stdout, "{response}")?;
        stdout.flush()?;
    }

    Ok(())
}

async fn handle_request(request: Request) -> String {
    match request.command {
        Command::ListEvents => handle_list_events(request.params).await,
        Command::CreateEvent => handle_create_event(request.params).await,
        Command::DeleteEvent => handle_delete_event(request.params).await,
    }
}

fn error_response(e: &anyhow::Error) -> String {
    let retryable = google::http_status(e).is_some_and(is_retryable);
    Response::<()>::error(&format!("{e:#}"), retryable)
}

fn is_retryable(status: u16) -> bool {
    RETRYABLE_STATUS_CODES.contains(&status)
}

fn invalid_params(e: serde_json::Error) -> String {
    Response::<()>::error(&format!("Invalid params: {e}"), false)
}

#[derive(Debug, Deserialize)]
struct ListEventsParams {
    google_account: String,
    calendar_id: Option<String>,
}

async fn handle_list_events(params: serde_json::Value) -> String {
    let params: ListEventsParams = match serde_json::from_value(params) {
        Ok(p) => p,
        Err(e) => return invalid_params(e),
    };

    let calendar_id = params.calendar_id.as_deref().unwrap_or(DEFAULT_CALENDAR_ID);

    match google::list_event_ids(&params.google_account, calendar_id).await {
        Ok(page) => Response::success(page),
        Err(e) => error_response(&e),
    }
}

#[derive(Debug, Deserialize)]
struct CreateEventParams {
    google_account: String,
    calendar_id: Option<String>,
    event: CalendarEvent,
}

async fn handle_create_event(params: serde_json::Value) -> String {
    let params: CreateEventParams = match serde_json::from_value(params) {
        Ok(p) => p,
        Err(e) => return invalid_params(e),
    };

    let calendar_id = params.calendar_id.as_deref().unwrap_or(DEFAULT_CALENDAR_ID);

    match google::create_event(&params.google_account, calendar_id, &params.event).await {
        Ok(id) => Response::success(id),
        Err(e) => error_response(&e),
    }
}

#[derive(Debug, Deserialize)]
struct DeleteEventParams {
    google_account: String,
    calendar_id: Option<String>,
    event_id: String,
}

async fn handle_delete_event(params: serde_json::Value) -> String {
    let params: DeleteEventParams = match serde_json::from_value(params) {
        Ok(p) => p,
        Err(e) => return invalid_params(e),
    };

    let calendar_id = params.calendar_id.as_deref().unwrap_or(DEFAULT_CALENDAR_ID);

    match google::delete_event(&params.google_account, calendar_id, &params.event_id).await {
        Ok(()) => Response::success(()),
        Err(e) => error_response(&e),
    }
}
