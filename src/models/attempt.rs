use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

/// One candidate's run through a test. Mutated only by the scoring
/// orchestrator and the answer-saving flow.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Attempt {
    pub id: Uuid,
    pub test_id: Uuid,
    pub candidate_id: Uuid,
    /// Map of question id -> submitted value.
    pub answers: Option<JsonValue>,
    /// Per-question outcome records written by the orchestrator, never
    /// candidate-supplied. Always updated together with `marks`.
    pub question_wise_marks_obtained: Option<JsonValue>,
    pub marks: Option<rust_decimal::Decimal>,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    /// Set only on final submission.
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Attempt {
    /// The submitted value for a question id, if any.
    pub fn answer_for(&self, question_id: i32) -> Option<String> {
        self.answers
            .as_ref()?
            .get(question_id.to_string())
            .map(|v| match v {
                JsonValue::String(s) => s.clone(),
                other => other.to_string(),
            })
    }
}
