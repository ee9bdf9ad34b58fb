use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// In-memory storage is used when unset
    pub database_url: Option<String>,
    pub storage_timeout: Duration,
    pub rating_tolerance: f64,
    pub rating_max_iterations: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_source(|key| std::env::var(key).ok())
    }

    fn from_source(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let timeout_ms: u64 = parse_or(&var, "STORAGE_TIMEOUT_MS", 5000)?;

        Ok(Self {
            host: var("HOST").context("Cannot load HOST env variable")?,
            port: var("PORT")
                .context("Cannot load PORT env variable")?
                .parse()
                .context("PORT must be a number")?,
            database_url: var("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            storage_timeout: Duration::from_millis(timeout_ms),
            rating_tolerance: parse_or(&var, "RATING_TOLERANCE", 1e-4)?,
            rating_max_iterations: parse_or(&var, "RATING_MAX_ITERATIONS", 100)?,
        })
    }
}

fn parse_or<T>(var: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        None => Ok(default),
    }
}
