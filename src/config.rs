//! Application configuration

use crate::auth::Identity;
use crate::runtime::DEFAULT_REVEAL_DELAY;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_GATEWAY_URL: &str = "http://localhost:5000";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Settings read from the environment at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Base URL of the answering service
    pub gateway_url: String,
    pub db_path: PathBuf,
    /// How long an answer is spoken before it enters the transcript
    pub reveal_delay: Duration,
    pub request_timeout: Duration,
    /// Signed-in caller; `None` when no credentials were provided
    pub identity: Option<Identity>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let gateway_url = lookup("MENTOR_GATEWAY_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_GATEWAY_URL.to_string());

        let db_path = lookup("MENTOR_DB_PATH").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".mentor-chat").join("history.db")
            },
            PathBuf::from,
        );

        let reveal_delay = lookup("MENTOR_REVEAL_DELAY_MS")
            .and_then(|ms| ms.parse().ok())
            .map_or(DEFAULT_REVEAL_DELAY, Duration::from_millis);

        let request_timeout = lookup("MENTOR_REQUEST_TIMEOUT_SECS")
            .and_then(|secs| secs.parse().ok())
            .map_or(DEFAULT_REQUEST_TIMEOUT, Duration::from_secs);

        let identity = match (lookup("MENTOR_USER_ID"), lookup("MENTOR_TOKEN")) {
            (Some(user_id), Some(token))
                if !user_id.trim().is_empty() && !token.trim().is_empty() =>
            {
                Some(Identity::new(user_id, token))
            }
            (Some(_), _) => {
                tracing::warn!("MENTOR_USER_ID set without MENTOR_TOKEN; continuing signed out");
                None
            }
            _ => None,
        };

        Self {
            gateway_url,
            db_path,
            reveal_delay,
            request_timeout,
            identity,
        }
    }
}
