//! # Seeding
//!
//! Baseline survey guaranteed at every boot.
//!
//! Survey `1` always carries the seed questions: it is inserted when missing
//! and its config is overwritten when present. The title of an existing row is
//! left alone.
use chrono::Utc;
use serde_json::{Value, json};
use sqlx::{SqlitePool, types::Json};
use tracing::info;

use crate::models::{Question, SurveyId};

pub const SEED_SURVEY_ID: SurveyId = 1;
pub const SEED_SURVEY_TITLE: &str = "Company Info";

pub fn seed_questions() -> Vec<Question> {
    vec![
        Question::text("q1", "Company name"),
        Question::text("q2", "Your name"),
        Question::text("q3", "Company address"),
    ]
}

pub fn seed_config() -> Value {
    json!({ "questions": seed_questions() })
}

pub async fn seed_survey(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO surveys (id, title, config, created_at) VALUES (?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET config = excluded.config",
    )
    .bind(SEED_SURVEY_ID)
    .bind(SEED_SURVEY_TITLE)
    .bind(Json(seed_config()))
    .bind(Utc::now())
    .execute(pool)
    .await?;

    info!("Survey {SEED_SURVEY_ID} seeded");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        database::test_pool,
        surveys::{get_survey, update_survey},
    };

    async fn survey_count(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM surveys")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_seed_inserts_when_missing() {
        let pool = test_pool().await;
        seed_survey(&pool).await.unwrap();

        let survey = get_survey(&pool, SEED_SURVEY_ID).await.unwrap();
        assert_eq!(survey.title, SEED_SURVEY_TITLE);
        assert_eq!(survey.config, seed_config());
        assert_eq!(survey.config["questions"][2]["label"], "Company address");
    }

    #[tokio::test]
    async fn test_seed_twice_is_idempotent() {
        let pool = test_pool().await;
        seed_survey(&pool).await.unwrap();
        seed_survey(&pool).await.unwrap();

        assert_eq!(survey_count(&pool).await, 1);
        let survey = get_survey(&pool, SEED_SURVEY_ID).await.unwrap();
        assert_eq!(survey.config, seed_config());
    }

    #[tokio::test]
    async fn test_seed_overwrites_config() {
        let pool = test_pool().await;
        seed_survey(&pool).await.unwrap();

        update_survey(&pool, SEED_SURVEY_ID, &json!({"questions": []}))
            .await
            .unwrap();
        seed_survey(&pool).await.unwrap();

        let survey = get_survey(&pool, SEED_SURVEY_ID).await.unwrap();
        assert_eq!(survey.config, seed_config());
        assert_eq!(survey_count(&pool).await, 1);
    }
}
