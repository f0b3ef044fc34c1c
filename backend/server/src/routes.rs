use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::{
        StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::IntoResponse,
};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::{
    error::AppError,
    export::{csv_filename, flatten_survey, write_csv},
    models::{
        CreateSurvey, ResponseSubmitted, SubmitResponse, SurveyCreated, SurveyId, UpdateSurvey,
    },
    responses::{get_responses, submit_response},
    state::AppState,
    surveys::{create_survey, get_survey, update_survey},
};

fn payload<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload.map(|Json(inner)| inner).map_err(|e| {
        debug!("Rejected payload: {e}");
        AppError::MalformedPayload
    })
}

pub async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn create_survey_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Json<CreateSurvey>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let survey = payload(body)?;
    let id = create_survey(&state.pool, &survey.title, &Value::Object(survey.config)).await?;

    info!("Survey {id} created");

    Ok((StatusCode::CREATED, Json(SurveyCreated { id })))
}

pub async fn get_survey_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SurveyId>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(get_survey(&state.pool, id).await?))
}

pub async fn update_survey_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SurveyId>,
    body: Result<Json<UpdateSurvey>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let update = payload(body)?;
    update_survey(&state.pool, id, &Value::Object(update.config)).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn submit_response_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SurveyId>,
    body: Result<Json<SubmitResponse>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let submission = payload(body)?;
    let response_id = submit_response(&state.pool, id, &submission.answers).await?;

    Ok(Json(ResponseSubmitted { response_id }))
}

pub async fn responses_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SurveyId>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(get_responses(&state.pool, id).await?))
}

pub async fn flat_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SurveyId>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(flatten_survey(&state.pool, id).await?))
}

pub async fn export_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SurveyId>,
) -> Result<impl IntoResponse, AppError> {
    let flat = flatten_survey(&state.pool, id).await?;
    let body = write_csv(&flat)?;

    debug!("Exporting {} rows of survey {id}", flat.data.len());

    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", csv_filename(id)),
            ),
        ],
        body,
    ))
}
