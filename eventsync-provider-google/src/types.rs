use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Refresh this long before the access token actually expires
const REFRESH_MARGIN_SECONDS: i64 = 60;

/// OAuth client credentials for Google Calendar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Tokens for a single authenticated account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountTokens {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl AccountTokens {
    pub fn need_refresh(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at - Duration::seconds(REFRESH_MARGIN_SECONDS) <= now,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn tokens(expires_at: Option<DateTime<Utc>>) -> AccountTokens {
        AccountTokens {
            access_token: "access".into(),
            refresh_token: "refresh".into(),
            expires_at,
        }
    }

    #[test]
    fn test_need_refresh() {
        let now = Utc.with_ymd_and_hms(2024, 11, 1, 12, 0, 0).unwrap();

        assert!(tokens(Some(now - Duration::minutes(5))).need_refresh(now));
        assert!(tokens(Some(now + Duration::seconds(30))).need_refresh(now));
        assert!(!tokens(Some(now + Duration::hours(1))).need_refresh(now));
        assert!(!tokens(None).need_refresh(now));
    }

    #[test]
    fn test_tokens_without_expiry_parse() {
        let parsed: AccountTokens =
            serde_json::from_str(r#"{"access_token": "a", "refresh_token": "r"}"#).unwrap();
        assert!(parsed.expires_at.is_none());
    }
}
