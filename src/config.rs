//! Runtime configuration, read from the environment (and `.env`, which
//! `main` loads before calling [`Config::from_env`]).

use anyhow::{anyhow, bail, Context, Result};
use std::{env, fmt::Display, net::SocketAddr, str::FromStr};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" | "test" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(anyhow!("unknown environment {s}")),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub session_secret: Vec<u8>,
    pub listen_addr: SocketAddr,
    pub environment: Environment,
    pub token_ttl: chrono::Duration,
    pub reminder_poll_interval: std::time::Duration,
    pub reminder_lookahead: chrono::Duration,
    /// Added to the reminder of every newly created note. Zero keeps the
    /// reminder the client chose; the weekly planner UI sends 7.
    pub reminder_offset: chrono::Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = match lookup("DATABASE_URL") {
            Some(url) => url,
            None => {
                let required = |key: &str| {
                    lookup(key).ok_or_else(|| {
                        anyhow!("{key} or DATABASE_URL must be defined")
                    })
                };
                let host = lookup("POSTGRES_HOST")
                    .unwrap_or_else(|| "localhost".to_string());
                format!(
                    "postgres://{}:{}@{}:5432/{}",
                    required("POSTGRES_USER")?,
                    required("POSTGRES_PASSWORD")?,
                    host,
                    required("POSTGRES_DB")?
                )
            }
        };
        let session_secret = lookup("SESSION_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("SESSION_SECRET must be defined"))?
            .into_bytes();

        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port: u16 = parse_or(&lookup, "PORT", 8000)?;
        let listen_addr = format!("{host}:{port}")
            .parse()
            .with_context(|| format!("{host}:{port} is not a listen address"))?;
        let offset_days: u64 = parse_or(&lookup, "REMINDER_OFFSET_DAYS", 0)?;
        let poll_secs: u64 = parse_or(&lookup, "REMINDER_POLL_SECS", 60)?;
        if poll_secs == 0 {
            bail!("REMINDER_POLL_SECS must be at least 1");
        }
        let reminder_poll_interval = std::time::Duration::from_secs(poll_secs);

        Ok(Self {
            database_url,
            database_max_connections: parse_or(
                &lookup,
                "DATABASE_MAX_CONNECTIONS",
                10,
            )?,
            session_secret,
            listen_addr,
            environment: parse_or(
                &lookup,
                "APP_ENV",
                Environment::Development,
            )?,
            token_ttl: to_duration(
                "TOKEN_TTL_SECS",
                parse_or(&lookup, "TOKEN_TTL_SECS", 30 * 24 * 60 * 60)?,
            )?,
            reminder_poll_interval,
            reminder_lookahead: to_duration(
                "REMINDER_LOOKAHEAD_SECS",
                parse_or(&lookup, "REMINDER_LOOKAHEAD_SECS", 5 * 60)?,
            )?,
            reminder_offset: to_duration(
                "REMINDER_OFFSET_DAYS",
                offset_days.saturating_mul(24 * 60 * 60),
            )?,
        })
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{key}={raw:?} is invalid: {e}")),
        None => Ok(default),
    }
}

/// Fails when `secs` is past what `chrono::Duration` can hold.
fn to_duration(key: &str, secs: u64) -> Result<chrono::Duration> {
    chrono::Duration::from_std(std::time::Duration::from_secs(secs))
        .map_err(|_| anyhow!("{key} is out of range"))
}

#[cfg(test)]
pub fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/unused".into(),
        database_max_connections: 1,
        session_secret: b"foo".to_vec(),
        listen_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
        environment: Environment::Development,
        token_ttl: chrono::Duration::days(30),
        reminder_poll_interval: std::time::Duration::from_secs(60),
        reminder_lookahead: chrono::Duration::minutes(5),
        reminder_offset: chrono::Duration::zero(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(
        pairs: &[(&str, &str)],
    ) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://u:p@db/notes"),
            ("SESSION_SECRET", "s3cret"),
        ]))
        .expect("config");

        assert_eq!(config.database_url, "postgres://u:p@db/notes");
        assert_eq!(config.listen_addr.port(), 8000);
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.reminder_lookahead, chrono::Duration::minutes(5));
        assert_eq!(config.reminder_offset, chrono::Duration::zero());
        assert_eq!(config.token_ttl, chrono::Duration::days(30));
    }

    #[test]
    fn test_database_url_from_postgres_parts() {
        let config = Config::from_lookup(lookup_from(&[
            ("POSTGRES_USER", "jack"),
            ("POSTGRES_PASSWORD", "pw"),
            ("POSTGRES_DB", "notes"),
            ("SESSION_SECRET", "s3cret"),
            ("APP_ENV", "production"),
            ("REMINDER_OFFSET_DAYS", "7"),
        ]))
        .expect("config");

        assert_eq!(config.database_url, "postgres://jack:pw@localhost:5432/notes");
        assert!(config.environment.is_production());
        assert_eq!(config.reminder_offset, chrono::Duration::days(7));
    }

    #[test]
    fn test_missing_secret_is_an_error() {
        let result = Config::from_lookup(lookup_from(&[(
            "DATABASE_URL",
            "postgres://u:p@db/notes",
        )]));
        assert!(result.is_err());
    }

    #[test]
    fn test_bad_number_names_the_variable() {
        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://u:p@db/notes"),
            ("SESSION_SECRET", "s3cret"),
            ("PORT", "eighty"),
        ]))
        .err()
        .expect("error");
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_huge_durations_name_the_variable() {
        for key in [
            "TOKEN_TTL_SECS",
            "REMINDER_LOOKAHEAD_SECS",
            "REMINDER_OFFSET_DAYS",
        ] {
            let huge = u64::MAX.to_string();
            let err = Config::from_lookup(lookup_from(&[
                ("DATABASE_URL", "postgres://u:p@db/notes"),
                ("SESSION_SECRET", "s3cret"),
                (key, huge.as_str()),
            ]))
            .err()
            .expect("error");
            assert!(err.to_string().contains(key), "{err}");
        }
    }

    #[test]
    fn test_zero_poll_interval_is_an_error() {
        let err = Config::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://u:p@db/notes"),
            ("SESSION_SECRET", "s3cret"),
            ("REMINDER_POLL_SECS", "0"),
        ]))
        .err()
        .expect("error");
        assert!(err.to_string().contains("REMINDER_POLL_SECS"));
    }
}
