use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

pub const MAX_SOLUTION_CHARS: usize = 50_000;
pub const MAX_SOLUTION_LINES: usize = 2_000;

/// One code-upload event against a coding question. Append-only: rows are
/// never mutated or deleted once persisted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Submission {
    pub id: Uuid,
    pub coding_question_id: Uuid,
    /// Mandatory when `submission_type = submit`.
    pub attempt_id: Option<Uuid>,
    pub candidate_id: Uuid,
    pub solution_code: String,
    pub language: String,
    pub submission_type: String,
    pub score: rust_decimal::Decimal,
    /// Ordered per-test-case outcome records, same order as the question's
    /// test cases.
    pub test_results: JsonValue,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionType {
    TestRunning,
    Submit,
}

impl SubmissionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionType::TestRunning => "test_running",
            SubmissionType::Submit => "submit",
        }
    }
}

impl std::fmt::Display for SubmissionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
