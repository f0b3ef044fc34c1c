use chrono::Utc;
use serde_json::Value;
use sqlx::{FromRow, SqlitePool, types::Json};
use tracing::debug;

use crate::{
    error::AppError,
    models::{Survey, SurveyId},
};

#[derive(FromRow)]
struct SurveyRow {
    id: SurveyId,
    title: String,
    config: Json<Value>,
}

impl From<SurveyRow> for Survey {
    fn from(row: SurveyRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            config: row.config.0,
        }
    }
}

pub async fn create_survey(
    pool: &SqlitePool,
    title: &str,
    config: &Value,
) -> Result<SurveyId, AppError> {
    let id = sqlx::query("INSERT INTO surveys (title, config, created_at) VALUES (?, ?, ?)")
        .bind(title)
        .bind(Json(config))
        .bind(Utc::now())
        .execute(pool)
        .await?
        .last_insert_rowid();

    debug!("Created survey {id}");

    Ok(id)
}

pub async fn get_survey(pool: &SqlitePool, id: SurveyId) -> Result<Survey, AppError> {
    sqlx::query_as::<_, SurveyRow>("SELECT id, title, config FROM surveys WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(Survey::from)
        .ok_or(AppError::NotFound("Survey"))
}

/// Replaces the whole config document.
pub async fn update_survey(
    pool: &SqlitePool,
    id: SurveyId,
    config: &Value,
) -> Result<(), AppError> {
    let updated = sqlx::query("UPDATE surveys SET config = ? WHERE id = ?")
        .bind(Json(config))
        .bind(id)
        .execute(pool)
        .await?
        .rows_affected();

    if updated == 0 {
        return Err(AppError::NotFound("Survey"));
    }

    debug!("Replaced config of survey {id}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::database::test_pool;

    #[tokio::test]
    async fn test_create_then_get_round_trip() {
        let pool = test_pool().await;
        let config = json!({
            "questions": [
                {"id": "q1", "type": "text", "label": "Company name"},
                {"id": "q2", "type": "number", "label": "Employees"}
            ]
        });

        let id = create_survey(&pool, "Company Info", &config).await.unwrap();
        let survey = get_survey(&pool, id).await.unwrap();

        assert_eq!(survey.id, id);
        assert_eq!(survey.title, "Company Info");
        assert_eq!(survey.config, config);
    }

    #[tokio::test]
    async fn test_ids_are_assigned() {
        let pool = test_pool().await;
        let first = create_survey(&pool, "A", &json!({"questions": []})).await.unwrap();
        let second = create_survey(&pool, "B", &json!({"questions": []})).await.unwrap();

        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_update_replaces_config() {
        let pool = test_pool().await;
        let id = create_survey(&pool, "Old", &json!({"questions": [], "theme": "dark"}))
            .await
            .unwrap();

        let new_config = json!({"questions": [{"id": "q9", "type": "text", "label": "New"}]});
        update_survey(&pool, id, &new_config).await.unwrap();

        let survey = get_survey(&pool, id).await.unwrap();
        assert_eq!(survey.config, new_config);
        assert!(survey.config.get("theme").is_none());
        assert_eq!(survey.title, "Old");
    }

    #[tokio::test]
    async fn test_missing_survey() {
        let pool = test_pool().await;

        assert!(matches!(
            get_survey(&pool, 42).await,
            Err(AppError::NotFound("Survey"))
        ));
        assert!(matches!(
            update_survey(&pool, 42, &json!({"questions": []})).await,
            Err(AppError::NotFound("Survey"))
        ));
    }
}
