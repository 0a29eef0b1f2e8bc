use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::services::execution_client::CaseOutcome;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RunCodeRequest {
    /// Resolved by the upstream auth layer; carried through, never trusted
    /// for anything beyond rate-limit keying and ledger attribution here.
    pub candidate_id: uuid::Uuid,
    pub attempt_id: Option<uuid::Uuid>,
    #[validate(length(min = 1, max = 50000))]
    pub code: String,
    #[validate(length(min = 1, max = 32))]
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FinalSubmitRequest {
    pub candidate_id: uuid::Uuid,
    pub attempt_id: uuid::Uuid,
    #[validate(length(min = 1, max = 50000))]
    pub code: String,
    #[validate(length(min = 1, max = 32))]
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionResponse {
    pub submission_id: uuid::Uuid,
    pub submission_type: String,
    pub passed: usize,
    pub total: usize,
    pub score: rust_decimal::Decimal,
    pub test_results: Vec<CaseOutcome>,
}
