use std::net::SocketAddr;
use std::path::PathBuf;
use std::{env, fmt::Display, str::FromStr};

use anyhow::{Context, Result, bail};
use tracing::info;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub body_limit: usize,
    pub seed_defaults: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let jwt_secret = env::var("SWAPMEET_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("SWAPMEET_JWT_SECRET is unset or still a placeholder; set it in .env and restart");
        }

        let host: String = try_load("SWAPMEET_HOST", "0.0.0.0")?;
        let port: u16 = try_load("SWAPMEET_PORT", "5000")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", host, port))?;

        Ok(Self {
            addr,
            db_path: try_load::<String>("SWAPMEET_DB_PATH", "swapmeet.db")?.into(),
            jwt_secret,
            body_limit: try_load("SWAPMEET_BODY_LIMIT", "2097152")?,
            seed_defaults: try_load("SWAPMEET_SEED_DEFAULTS", "true")?,
        })
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.parse()
        .map_err(|e| anyhow::anyhow!("invalid {key} value '{raw}': {e}"))
}
