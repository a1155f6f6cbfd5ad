use std::env;
use std::time::Duration;

use tracing::{info, warn};

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";

/// Where the gateway lives and how long to wait on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL including the `/api` prefix, without a trailing slash.
    pub api_url: String,
    /// `None` waits on the transport indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: None,
        }
    }
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Read `SWAPMEET_API_URL` and `SWAPMEET_HTTP_TIMEOUT_SECS`. Loading a
    /// `.env` file is left to the embedding binary.
    pub fn from_env() -> Self {
        let api_url = env::var("SWAPMEET_API_URL").unwrap_or_else(|_| {
            info!("SWAPMEET_API_URL not set, using default: {}", DEFAULT_API_URL);
            DEFAULT_API_URL.to_string()
        });

        let timeout = env::var("SWAPMEET_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| parse_timeout(&raw));

        Self {
            timeout,
            ..Self::new(api_url)
        }
    }
}

fn parse_timeout(raw: &str) -> Option<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(0) => None,
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(e) => {
            warn!("Ignoring SWAPMEET_HTTP_TIMEOUT_SECS '{}': {}", raw, e);
            None
        }
    }
}
