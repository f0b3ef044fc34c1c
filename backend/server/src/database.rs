//! # SQLite
//!
//! Relational store for surveys, responses and answers.
//!
//! ## Requirements
//!
//! - Surveys own a JSON config with an ordered `questions` list
//! - Responses reference an existing survey
//! - Answers reference a response, one row per submitted question
//! - Config and answer values are arbitrary JSON, stored as text
//!
//! ## Implementation
//!
//! - `sqlx` pool handed to every handler through the shared state
//! - Schema is created once during startup, before the router exists
//! - No `DATABASE_URL`: local file, created if missing, single connection
//! - With `DATABASE_URL`: full pool of `DATABASE_MAX_CONNECTIONS`
//! - Foreign keys are enforced (sqlx enables them by default)
use std::str::FromStr;

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tracing::info;

use crate::config::Config;

pub const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS surveys (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title TEXT NOT NULL,
        config TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS responses (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        survey_id INTEGER NOT NULL REFERENCES surveys(id),
        submitted_at TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS answers (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        response_id INTEGER NOT NULL REFERENCES responses(id),
        question_id TEXT NOT NULL,
        answer TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS responses_survey_id ON responses(survey_id)",
    "CREATE INDEX IF NOT EXISTS answers_response_id ON answers(response_id)",
];

pub async fn init_database(config: &Config) -> Result<SqlitePool, sqlx::Error> {
    let (options, max_connections) = connect_options(config)?;

    connect(options, max_connections).await
}

/// Picks the target store and pool size from the config.
pub fn connect_options(config: &Config) -> Result<(SqliteConnectOptions, u32), sqlx::Error> {
    match &config.database_url {
        Some(url) => {
            info!("Using external database with {} connections", config.max_connections);

            let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
            Ok((options, config.max_connections.max(1)))
        }
        None => {
            info!("Using local database file {}", config.database_path);

            let options = SqliteConnectOptions::new()
                .filename(&config.database_path)
                .create_if_missing(true);
            Ok((options, 1))
        }
    }
}

pub async fn connect(
    options: SqliteConnectOptions,
    max_connections: u32,
) -> Result<SqlitePool, sqlx::Error> {
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    create_schema(&pool).await?;

    Ok(pool)
}

pub async fn create_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    for statement in SCHEMA {
        sqlx::query(*statement).execute(&mut *tx).await?;
    }

    tx.commit().await
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    // in-memory databases are per connection, so keep exactly one
    let options = SqliteConnectOptions::from_str("sqlite::memory:").unwrap();
    connect(options, 1).await.unwrap()
}
