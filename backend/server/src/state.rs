use std::sync::Arc;

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::info;

use super::{config::Config, database::init_database, seed::seed_survey};

pub struct AppState {
    pub config: Config,
    pub pool: SqlitePool,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Arc<Self>> {
        let pool = init_database(&config).await?;
        info!("Database ready");

        seed_survey(&pool).await?;

        Ok(Arc::new(Self { config, pool }))
    }
}
