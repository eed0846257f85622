//! Runtime configuration.
//!
//! Store credentials come from the environment first (a URL/key pair or a
//! single connection string), then from the OS keyring. Tunables fall back
//! to defaults with a warning when unset or malformed.

use std::{env, fmt::Display, str::FromStr, time::Duration};

use tracing::{info, warn};

use crate::api;
use crate::storage;

pub const ENV_STORE_URL: &str = "CAMPUS_BITES_SUPABASE_URL";
pub const ENV_ANON_KEY: &str = "CAMPUS_BITES_SUPABASE_ANON_KEY";
pub const ENV_CONNECTION: &str = "CAMPUS_BITES_CONNECTION";
pub const ENV_POLL_SECS: &str = "CAMPUS_BITES_POLL_SECS";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "CAMPUS_BITES_HTTP_TIMEOUT_SECS";

const DEFAULT_POLL_SECS: u64 = 10;
const MIN_POLL_SECS: u64 = 2;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;

#[derive(Clone)]
pub struct Config {
    pub store_url: String,
    pub anon_key: String,
    pub poll_interval: Duration,
    pub http_timeout: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("store_url", &self.store_url)
            .field("anon_key", &"***")
            .field("poll_interval", &self.poll_interval)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

impl Config {
    pub fn load() -> Result<Self, String> {
        Self::load_with(storage::get_credential)
    }

    /// Load with an injectable credential lookup in place of the keyring.
    pub fn load_with(credential: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let connection = var(ENV_CONNECTION);

        let store_url = var(ENV_STORE_URL)
            .or_else(|| {
                connection
                    .as_deref()
                    .and_then(api::extract_url_from_connection_string)
            })
            .or_else(|| credential(storage::KEY_STORE_URL))
            .map(|url| api::normalize_store_url(&url))
            .filter(|url| !url.is_empty())
            .ok_or("Store not configured: missing URL")?;

        let anon_key = var(ENV_ANON_KEY)
            .or_else(|| {
                connection
                    .as_deref()
                    .and_then(api::extract_key_from_connection_string)
            })
            .or_else(|| credential(storage::KEY_ANON_KEY))
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or("Store not configured: missing anon key")?;

        let poll_secs: u64 = try_load(ENV_POLL_SECS, DEFAULT_POLL_SECS);
        let http_timeout_secs: u64 = try_load(ENV_HTTP_TIMEOUT_SECS, DEFAULT_HTTP_TIMEOUT_SECS);

        Ok(Config {
            store_url,
            anon_key,
            poll_interval: Duration::from_secs(poll_secs.max(MIN_POLL_SECS)),
            http_timeout: Duration::from_secs(http_timeout_secs.max(1)),
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn try_load<T: FromStr + Display>(key: &str, default: T) -> T
where
    T::Err: Display,
{
    match var(key) {
        None => {
            info!("{key} not set, using default: {default}");
            default
        }
        Some(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value {raw:?}: {e}; using default: {default}");
            default
        }),
    }
}
