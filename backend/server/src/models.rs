use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type SurveyId = i64;
pub type ResponseId = i64;

/// Question ids mapped to arbitrary JSON answers.
pub type Answers = Map<String, Value>;

/// One prompt inside a survey's config: `{"id", "type", "label"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub label: String,
}

impl Question {
    pub fn text(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: "text".to_string(),
            label: label.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Survey {
    pub id: SurveyId,
    pub title: String,
    pub config: Value,
}

/// Normalized view of one submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseRecord {
    pub response_id: ResponseId,
    pub submitted_at: DateTime<Utc>,
    pub answers: Answers,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FlatResults {
    pub columns: Vec<String>,
    pub data: Vec<Vec<Value>>,
}

// Payloads

#[derive(Debug, Deserialize)]
pub struct CreateSurvey {
    pub title: String,
    pub config: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSurvey {
    pub config: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub answers: Answers,
}

#[derive(Debug, Serialize)]
pub struct SurveyCreated {
    pub id: SurveyId,
}

#[derive(Debug, Serialize)]
pub struct ResponseSubmitted {
    pub response_id: ResponseId,
}
