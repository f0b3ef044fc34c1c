//! Documentation of a survey collection backend.
//!
//! Stores survey definitions, accepts responses against them and hands the
//! results back as nested JSON, a flat table or a CSV download.
//!
//!
//!
//! # General Infrastructure
//! - Single axum server, one SQLite database behind a `sqlx` pool
//! - Pool is built and the schema created before the router exists
//! - Every handler borrows a connection for one store call and gives it back
//! - Survey `1` is (re)seeded with the baseline questions on every boot
//!
//!
//!
//! # Routes
//!
//! | Method | Path | Body | Success |
//! |---|---|---|---|
//! | POST | `/surveys` | `{title, config}` | 201 `{id}` |
//! | GET | `/surveys/{id}` | | 200 `{id, title, config}` |
//! | PUT | `/surveys/{id}` | `{config}` | 204 |
//! | POST | `/surveys/{id}/responses` | `{answers: {qid: value}}` | 200 `{response_id}` |
//! | GET | `/surveys/{id}/responses` | | 200 `[{response_id, submitted_at, answers}]` |
//! | GET | `/surveys/{id}/responses/flat` | | 200 `{columns, data}` |
//! | GET | `/surveys/{id}/export` | | 200 `text/csv` attachment `survey_{id}.csv` |
//! | GET | `/health` | | 200 `{status, version}` |
//!
//! Missing surveys answer 404, bodies that do not type-check answer 400.
//!
//!
//!
//! # Notes
//!
//! ## Consistency
//! A submission (response row plus all answer rows) is a single transaction. Reads
//! for the nested and flat views are a single joined query, so an export never
//! sees half of a submission.
//!
//! ## Flat Columns
//! The flat view unions question ids across every response and sorts them. A
//! question only answered by later responses still gets a column.
//!
//!
//!
//! # Setup
//!
//! Environment
//! - `RUST_PORT`: listen port, default `8000`
//! - `DATABASE_URL`: external SQLite URL, also read from `/run/secrets/DATABASE_URL`
//! - `DATABASE_PATH`: local file when no URL is set, default `survey.db`
//! - `DATABASE_MAX_CONNECTIONS`: pool size for `DATABASE_URL`, default `10`
//! - `RUST_LOG`: log filter, e.g. `survey=debug,tower_http=debug`
//!
//! Run.
//! ```sh
//! RUST_LOG=info cargo run
//! ```
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! ```
use std::{sync::Arc, time::Duration};

use anyhow::Result;
use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, post},
};
#[cfg(unix)]
use signal::unix::{SignalKind, signal};
use tokio::{net::TcpListener, signal, signal::ctrl_c};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod models;
pub mod responses;
pub mod routes;
pub mod seed;
pub mod state;
pub mod surveys;

use config::Config;
use routes::{
    create_survey_handler, export_handler, flat_handler, get_survey_handler, health_handler,
    responses_handler, submit_response_handler, update_survey_handler,
};
use state::AppState;

pub fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/health", get(health_handler))
        .route("/surveys", post(create_survey_handler))
        .route(
            "/surveys/{id}",
            get(get_survey_handler).put(update_survey_handler),
        )
        .route(
            "/surveys/{id}/responses",
            get(responses_handler).post(submit_response_handler),
        )
        .route("/surveys/{id}/responses/flat", get(flat_handler))
        .route("/surveys/{id}/export", get(export_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn start_server() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading config...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = AppState::new(config).await?;

    info!("Starting server...");
    let address = format!("0.0.0.0:{}", state.config.port);
    let router = app(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutting down...");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to listen for Ctrl+C: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
