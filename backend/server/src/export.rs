//! # Export
//!
//! Pivots normalized responses into a column-aligned table and renders it as CSV.
//!
//! ## Columns
//! - `response_id`, `submitted_at`, then every question id seen in any response
//! - Question ids are the sorted union across all responses, so a question that
//!   only later responses answer still gets its own column
//! - Cells for unanswered questions are `null`
//! - No responses means no columns and no rows
//!
//! ## CSV
//! - Header record first, then one record per response
//! - Strings are written as-is, `null` as an empty cell, everything else as compact JSON
use std::collections::BTreeSet;

use chrono::SecondsFormat;
use serde_json::Value;
use sqlx::SqlitePool;
use tracing::debug;

use crate::{
    error::AppError,
    models::{FlatResults, ResponseRecord, SurveyId},
    responses::get_responses,
};

pub const RESPONSE_ID: &str = "response_id";
pub const SUBMITTED_AT: &str = "submitted_at";

pub async fn flatten_survey(
    pool: &SqlitePool,
    survey_id: SurveyId,
) -> Result<FlatResults, AppError> {
    let records = get_responses(pool, survey_id).await?;

    Ok(flatten(&records))
}

pub fn flatten(records: &[ResponseRecord]) -> FlatResults {
    if records.is_empty() {
        return FlatResults::default();
    }

    let question_ids: BTreeSet<&str> = records
        .iter()
        .flat_map(|record| record.answers.keys())
        .map(String::as_str)
        .filter(|id| {
            let reserved = *id == RESPONSE_ID || *id == SUBMITTED_AT;
            if reserved {
                debug!("Dropping answer to reserved question id {id} from flat view");
            }
            !reserved
        })
        .collect();

    let columns = [RESPONSE_ID, SUBMITTED_AT]
        .into_iter()
        .chain(question_ids.iter().copied())
        .map(str::to_string)
        .collect();

    let data = records
        .iter()
        .map(|record| {
            let mut row = Vec::with_capacity(question_ids.len() + 2);
            row.push(Value::from(record.response_id));
            // same rendering as the nested view's serde output
            row.push(Value::from(
                record
                    .submitted_at
                    .to_rfc3339_opts(SecondsFormat::AutoSi, true),
            ));
            row.extend(
                question_ids
                    .iter()
                    .map(|id| record.answers.get(*id).cloned().unwrap_or(Value::Null)),
            );
            row
        })
        .collect();

    FlatResults { columns, data }
}

pub fn write_csv(flat: &FlatResults) -> Result<Vec<u8>, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    if !flat.columns.is_empty() {
        writer.write_record(&flat.columns)?;
    }

    for row in &flat.data {
        writer.write_record(row.iter().map(csv_field))?;
    }

    writer
        .into_inner()
        .map_err(|e| AppError::InternalError(Box::new(e.into_error())))
}

fn csv_field(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn csv_filename(survey_id: SurveyId) -> String {
    format!("survey_{survey_id}.csv")
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Timelike, Utc};
    use serde_json::json;

    use super::*;
    use crate::models::Answers;

    fn record(response_id: i64, answers: Value) -> ResponseRecord {
        ResponseRecord {
            response_id,
            submitted_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
            answers: answers.as_object().cloned().unwrap_or_else(Answers::new),
        }
    }

    #[test]
    fn test_empty() {
        let flat = flatten(&[]);
        assert!(flat.columns.is_empty());
        assert!(flat.data.is_empty());
        assert!(write_csv(&flat).unwrap().is_empty());
    }

    #[test]
    fn test_same_questions() {
        let flat = flatten(&[
            record(1, json!({"q1": "Acme", "q2": "Jane"})),
            record(2, json!({"q1": "Globex", "q2": "Hank"})),
        ]);

        assert_eq!(flat.columns, ["response_id", "submitted_at", "q1", "q2"]);
        assert_eq!(flat.data.len(), 2);
        assert_eq!(
            flat.data[0],
            vec![json!(1), json!("2025-03-01T12:00:00Z"), json!("Acme"), json!("Jane")]
        );
        assert_eq!(flat.data[1][2], json!("Globex"));
    }

    #[test]
    fn test_later_questions_are_unioned() {
        let flat = flatten(&[
            record(1, json!({"q2": "Jane"})),
            record(2, json!({"q3": "Main St", "q1": "Acme"})),
        ]);

        assert_eq!(
            flat.columns,
            ["response_id", "submitted_at", "q1", "q2", "q3"]
        );
        assert_eq!(flat.data[0][2..], [Value::Null, json!("Jane"), Value::Null]);
        assert_eq!(flat.data[1][2..], [json!("Acme"), Value::Null, json!("Main St")]);
    }

    #[test]
    fn test_timestamp_matches_nested_view() {
        let mut with_nanos = record(3, json!({"q1": "Acme"}));
        with_nanos.submitted_at = Utc
            .with_ymd_and_hms(2026, 10, 18, 12, 45, 9)
            .unwrap()
            .with_nanosecond(974_316_122)
            .unwrap();

        let nested = serde_json::to_value(&with_nanos).unwrap();
        let flat = flatten(&[with_nanos]);

        assert_eq!(flat.data[0][1], nested["submitted_at"]);
        assert_eq!(flat.data[0][1], json!("2026-10-18T12:45:09.974316122Z"));
    }

    #[test]
    fn test_reserved_question_ids() {
        let flat = flatten(&[record(5, json!({"response_id": "spoof", "q1": "x"}))]);

        assert_eq!(flat.columns, ["response_id", "submitted_at", "q1"]);
        assert_eq!(flat.data[0][0], json!(5));
    }

    #[test]
    fn test_csv_header_and_rows() {
        let flat = flatten(&[
            record(1, json!({"q1": "Acme", "q2": "Jane"})),
            record(2, json!({"q1": "Globex, Inc.", "q2": ["a", "b"]})),
        ]);

        let csv = String::from_utf8(write_csv(&flat).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], flat.columns.join(","));
        assert_eq!(lines[1], "1,2025-03-01T12:00:00Z,Acme,Jane");
        assert_eq!(
            lines[2],
            r#"2,2025-03-01T12:00:00Z,"Globex, Inc.","[""a"",""b""]""#
        );
    }

    #[test]
    fn test_csv_field() {
        assert_eq!(csv_field(&Value::Null), "");
        assert_eq!(csv_field(&json!("text")), "text");
        assert_eq!(csv_field(&json!(3.5)), "3.5");
        assert_eq!(csv_field(&json!(true)), "true");
        assert_eq!(csv_field(&json!({"a": 1})), r#"{"a":1}"#);
    }

    #[test]
    fn test_csv_filename() {
        assert_eq!(csv_filename(12), "survey_12.csv");
    }
}
