//! Credential and token storage for the Google provider.
//!
//! Credentials and tokens are stored in:
//!   ~/.config/eventsync/providers/google/credentials.json
//!   ~/.config/eventsync/providers/google/tokens/{account}.json

use crate::types::{AccountTokens, GoogleCredentials};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

fn base_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .context("Could not determine config directory")?
        .join("eventsync")
        .join("providers")
        .join("google"))
}

pub fn load_credentials() -> Result<GoogleCredentials> {
    let path = base_dir()?.join("credentials.json");

    if !path.exists() {
        anyhow::bail!(
            "Google credentials not found.\n\n\
            Create {} with:\n\n\
            {{\n  \
              \"client_id\": \"your-client-id.apps.googleusercontent.com\",\n  \
              \"client_secret\": \"your-client-secret\"\n\
            }}",
            path.display()
        );
    }

    read_json(&path)
}

pub fn load_tokens(account: &str) -> Result<AccountTokens> {
    let path = token_path(&base_dir()?, account);

    if !path.exists() {
        anyhow::bail!(
            "No tokens for account: {}\nExpected them at {}",
            account,
            path.display()
        );
    }

    read_json(&path)
}

pub fn save_tokens(account: &str, tokens: &AccountTokens) -> Result<()> {
    let path = token_path(&base_dir()?, account);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create tokens directory at {}", parent.display()))?;
    }

    let contents = serde_json::to_string_pretty(tokens).context("Failed to serialize tokens")?;
    std::fs::write(&path, contents)
        .with_context(|| format!("Failed to write tokens to {}", path.display()))?;

    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}

fn token_path(base: &Path, account: &str) -> PathBuf {
    let safe_account = account.replace(['/', '\\', ':'], "_");
    base.join("tokens").join(format!("{safe_account}.json"))
}
