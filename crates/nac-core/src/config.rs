use std::{env, fs, path::Path, time::Duration};

use crate::{errors::Error, Result};

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 15_000;

/// Typed configuration for the console.
///
/// Loaded from the environment (with an optional `.env` file that never
/// overrides variables already set).
#[derive(Clone, Debug)]
pub struct Config {
    /// Platform API root, e.g. `https://platform.example.com/notification-api/api/v1/o`.
    pub api_base_url: String,

    /// Operator bearer token presented on every request.
    pub auth_token: String,

    /// Default client context for commands that take an optional client id.
    pub default_client_id: Option<String>,

    /// Per-request timeout. Expiry surfaces as a retryable network error.
    pub request_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let api_base_url = env_str("NAC_API_BASE_URL").and_then(non_empty);
        let auth_token = env_str("NAC_AUTH_TOKEN").and_then(non_empty);

        let Some(api_base_url) = api_base_url else {
            return Err(Error::Config(
                "NAC_API_BASE_URL environment variable is required".to_string(),
            ));
        };
        let Some(auth_token) = auth_token else {
            return Err(Error::Config(
                "NAC_AUTH_TOKEN environment variable is required".to_string(),
            ));
        };

        let default_client_id = env_str("NAC_CLIENT_ID").and_then(non_empty);
        let request_timeout = Duration::from_millis(
            env_u64("NAC_REQUEST_TIMEOUT_MS").unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS),
        );

        Ok(Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            auth_token,
            default_client_id,
            request_timeout,
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}
