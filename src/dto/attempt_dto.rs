use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SaveAnswersRequest {
    /// Map of question id -> submitted value. Existing answers for the same
    /// question are replaced.
    pub answers: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveAnswersResponse {
    pub attempt_id: uuid::Uuid,
    pub saved: bool,
    pub answered_questions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptResultResponse {
    pub attempt_id: uuid::Uuid,
    pub status: String,
    pub marks: rust_decimal::Decimal,
    pub question_wise_marks_obtained: serde_json::Value,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}
