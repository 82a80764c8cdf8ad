use std::net::SocketAddr;

use anyhow::{Context, Result};
use chrono::TimeDelta;
use secrecy::SecretString;

use stockroom_auth::{DEFAULT_TOKEN_TTL_HOURS, HashCost};
use stockroom_observability::LogFormat;

/// Signing secret used when none is configured. Never fit for production.
const DEV_JWT_SECRET: &str = "stockroom-dev-secret";

/// Resolved runtime configuration.
#[derive(Debug)]
pub struct Config {
    pub bind: SocketAddr,
    pub jwt_secret: SecretString,
    /// True when `jwt_secret` is the built-in development secret.
    pub uses_dev_secret: bool,
    pub token_ttl: TimeDelta,
    /// Postgres DSN; `None` selects the in-memory stores.
    pub dsn: Option<SecretString>,
    pub hash_cost: HashCost,
    pub log_format: LogFormat,
}

impl Config {
    /// Defaults with the given secret, in-memory storage and an ephemeral port.
    pub fn new(jwt_secret: &str) -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 0)),
            jwt_secret: SecretString::from(jwt_secret.to_string()),
            uses_dev_secret: false,
            token_ttl: TimeDelta::hours(DEFAULT_TOKEN_TTL_HOURS),
            dsn: None,
            hash_cost: HashCost::default(),
            log_format: LogFormat::default(),
        }
    }

    /// # Errors
    /// Returns an error if a value that clap accepted cannot be interpreted.
    pub fn from_matches(matches: &clap::ArgMatches) -> Result<Self> {
        let bind = matches
            .get_one::<SocketAddr>("bind")
            .copied()
            .context("missing argument: --bind")?;

        let (jwt_secret, uses_dev_secret) = match matches.get_one::<String>("jwt-secret") {
            Some(secret) if !secret.is_empty() => (secret.clone(), false),
            _ => (DEV_JWT_SECRET.to_string(), true),
        };

        let ttl_hours = matches
            .get_one::<i64>("token-ttl-hours")
            .copied()
            .unwrap_or(DEFAULT_TOKEN_TTL_HOURS);

        let defaults = HashCost::default();
        let hash_cost = HashCost {
            memory_kib: matches
                .get_one::<u32>("argon2-memory-kib")
                .copied()
                .unwrap_or(defaults.memory_kib),
            iterations: matches
                .get_one::<u32>("argon2-iterations")
                .copied()
                .unwrap_or(defaults.iterations),
            ..defaults
        };

        let log_format = matches
            .get_one::<String>("log-format")
            .map(|s| s.parse::<LogFormat>())
            .transpose()
            .map_err(|e| anyhow::anyhow!(e))?
            .unwrap_or_default();

        Ok(Self {
            bind,
            jwt_secret: SecretString::from(jwt_secret),
            uses_dev_secret,
            token_ttl: TimeDelta::hours(ttl_hours),
            dsn: matches.get_one::<String>("dsn").cloned().map(SecretString::from),
            hash_cost,
            log_format,
        })
    }
}
