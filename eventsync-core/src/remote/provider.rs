//! Provider subprocess protocol.
//!
//! Calendar writes go through an external provider binary
//! (e.g., `eventsync-provider-google`) speaking JSON over stdin/stdout.
//! Providers manage their own credentials; core only passes along the
//! provider-specific keys from the `[calendar]` config section.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;
use tracing::trace;

use crate::error::{EventsyncError, EventsyncResult};
use crate::remote::protocol::{Command, ProviderCommand, Request, Response};

const PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider(String);

impl Provider {
    pub fn from_name(name: &str) -> Self {
        Provider(name.to_string())
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn binary_name(&self) -> String {
        format!("eventsync-provider-{}", self.0)
    }

    fn binary_path(&self) -> EventsyncResult<std::path::PathBuf> {
        let binary_name = self.binary_name();
        which::which(&binary_name).map_err(|_| {
            EventsyncError::ProviderNotInstalled(format!(
                "{} (install it with: cargo install {})",
                self.0, binary_name
            ))
        })
    }

    /// Call a typed provider command and return the result.
    ///
    /// The response type is inferred from the command's associated type.
    pub async fn call<C: ProviderCommand>(&self, cmd: C) -> EventsyncResult<C::Response> {
        timeout(PROVIDER_TIMEOUT, self.call_raw(C::command(), cmd))
            .await
            .map_err(|_| EventsyncError::ProviderTimeout(PROVIDER_TIMEOUT.as_secs()))?
    }

    async fn call_raw<P: Serialize, R: serde::de::DeserializeOwned>(
        &self,
        command: Command,
        params: P,
    ) -> EventsyncResult<R> {
        let params = serde_json::to_value(params)
            .map_err(|e| EventsyncError::Serialization(e.to_string()))?;
        let request = Request { command, params };
        let request_json = serde_json::to_string(&request)
            .map_err(|e| EventsyncError::Serialization(e.to_string()))?;

        let binary_path = self.binary_path()?;
        trace!(provider = %self.0, ?command, "Calling provider");

        let mut child = TokioCommand::new(&binary_path)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                EventsyncError::Provider(format!(
                    "Failed to spawn {}: {}",
                    binary_path.display(),
                    e
                ))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| EventsyncError::Provider("Provider stdin unavailable".into()))?;
        stdin
            .write_all(format!("{request_json}\n").as_bytes())
            .await?;
        drop(stdin);

        let output = child.wait_with_output().await?;

        if !output.status.success() {
            return Err(EventsyncError::Provider(format!(
                "Provider exited with status: {}",
                output.status.code().unwrap_or(-1)
            )));
        }

        let response_str = String::from_utf8_lossy(&output.stdout);
        if response_str.trim().is_empty() {
            return Err(EventsyncError::Provider("Provider returned no response".into()));
        }

        parse_response(&response_str)
    }
}

/// Map a provider's response line onto the result type.
fn parse_response<R: serde::de::DeserializeOwned>(line: &str) -> EventsyncResult<R> {
    let response: Response<R> = serde_json::from_str(line.trim())
        .map_err(|e| EventsyncError::Provider(format!("Failed to parse response: {}", e)))?;

    match response {
        Response::Success { data } => Ok(data),
        Response::Error {
            error,
            retryable: true,
        } => Err(EventsyncError::ProviderUnavailable(error)),
        Response::Error { error, .. } => Err(EventsyncError::Provider(error)),
    }
}
