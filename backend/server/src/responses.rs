use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, SqlitePool, types::Json};
use tracing::debug;

use crate::{
    error::AppError,
    models::{Answers, ResponseId, ResponseRecord, SurveyId},
};

/// One response joined with at most one of its answers.
#[derive(FromRow)]
struct AnswerRow {
    response_id: ResponseId,
    submitted_at: DateTime<Utc>,
    question_id: Option<String>,
    answer: Option<Json<Value>>,
}

/// Stores a response and all of its answers in one transaction.
pub async fn submit_response(
    pool: &SqlitePool,
    survey_id: SurveyId,
    answers: &Answers,
) -> Result<ResponseId, AppError> {
    let mut tx = pool.begin().await?;

    let survey: Option<SurveyId> = sqlx::query_scalar("SELECT id FROM surveys WHERE id = ?")
        .bind(survey_id)
        .fetch_optional(&mut *tx)
        .await?;

    if survey.is_none() {
        return Err(AppError::NotFound("Survey"));
    }

    let response_id = sqlx::query("INSERT INTO responses (survey_id, submitted_at) VALUES (?, ?)")
        .bind(survey_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

    for (question_id, answer) in answers {
        sqlx::query("INSERT INTO answers (response_id, question_id, answer) VALUES (?, ?, ?)")
            .bind(response_id)
            .bind(question_id.as_str())
            .bind(Json(answer))
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    debug!(
        "Stored response {response_id} for survey {survey_id} with {} answers",
        answers.len()
    );

    Ok(response_id)
}

/// Every response of a survey with its answers, oldest first.
///
/// A single joined read, so a concurrent submission is either fully visible
/// or not at all.
pub async fn get_responses(
    pool: &SqlitePool,
    survey_id: SurveyId,
) -> Result<Vec<ResponseRecord>, AppError> {
    let rows = sqlx::query_as::<_, AnswerRow>(
        "SELECT r.id AS response_id, r.submitted_at, a.question_id, a.answer
         FROM responses r
         LEFT JOIN answers a ON a.response_id = r.id
         WHERE r.survey_id = ?
         ORDER BY r.id, a.id",
    )
    .bind(survey_id)
    .fetch_all(pool)
    .await?;

    Ok(group_rows(rows))
}

fn group_rows(rows: Vec<AnswerRow>) -> Vec<ResponseRecord> {
    let mut records: Vec<ResponseRecord> = Vec::new();

    for row in rows {
        // rows arrive ordered by response, so a new id starts a new record
        if records
            .last()
            .is_none_or(|last| last.response_id != row.response_id)
        {
            records.push(ResponseRecord {
                response_id: row.response_id,
                submitted_at: row.submitted_at,
                answers: Answers::new(),
            });
        }

        if let (Some(record), Some(question_id), Some(Json(answer))) =
            (records.last_mut(), row.question_id, row.answer)
        {
            record.answers.insert(question_id, answer);
        }
    }

    records
}
