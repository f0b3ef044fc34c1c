use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use anyhow::{Context, Result, anyhow};
use tracing::{info, warn};

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    /// External store. When `None` the server falls back to a local file.
    pub database_url: Option<String>,
    pub database_path: String,
    pub max_connections: u32,
}

impl Config {
    pub fn load() -> Result<Self> {
        Ok(Self {
            port: try_load("RUST_PORT", "8000")?,
            database_url: var("DATABASE_URL")
                .ok()
                .or_else(|| read_secret("DATABASE_URL")),
            database_path: try_load("DATABASE_PATH", "survey.db")?,
            max_connections: try_load("DATABASE_MAX_CONNECTIONS", "10")?,
        })
    }
}

fn var(key: &str) -> Result<String, ()> {
    env::var(key).map_err(|_| {
        info!("Environment variable {key} not found");
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
            anyhow!("Invalid {key} value: {e}")
        })
        .with_context(|| "Environment misconfigured!")
}

fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            info!("No {secret_name} secret at {path}: {e}");
        })
        .ok()
        .filter(|s| !s.is_empty())
}
