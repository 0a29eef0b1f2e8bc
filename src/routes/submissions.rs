use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::submission_dto::{FinalSubmitRequest, RunCodeRequest, SubmissionResponse};
use crate::models::submission::Submission;
use crate::services::submission_ledger::ExecutionSummary;
use crate::AppState;

#[axum::debug_handler]
pub async fn run_code(
    State(state): State<AppState>,
    Path(coding_question_id): Path<Uuid>,
    Json(req): Json<RunCodeRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let question = state.test_service.get_coding_question(coding_question_id).await?;
    let (submission, summary) = state
        .ledger
        .record_test_run(
            req.attempt_id,
            &question,
            &req.code,
            &req.language,
            req.candidate_id,
        )
        .await?;
    Ok(Json(submission_response(submission, summary)).into_response())
}

#[axum::debug_handler]
pub async fn submit_code(
    State(state): State<AppState>,
    Path(coding_question_id): Path<Uuid>,
    Json(req): Json<FinalSubmitRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let question = state.test_service.get_coding_question(coding_question_id).await?;
    let (submission, summary) = state
        .ledger
        .record_final_submission(
            req.attempt_id,
            &question,
            &req.code,
            &req.language,
            req.candidate_id,
        )
        .await?;

    // Derived-value refresh; failures here must not lose the submission.
    if let Err(e) = state.test_service.recompute_total_marks(question.test_id).await {
        tracing::error!(
            test_id = %question.test_id,
            error = %e,
            "Failed to refresh total_marks after final submission"
        );
    }

    Ok(Json(submission_response(submission, summary)).into_response())
}

#[axum::debug_handler]
pub async fn submission_stats(
    State(state): State<AppState>,
    Path(coding_question_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let question = state.test_service.get_coding_question(coding_question_id).await?;
    let stats = state.ledger.stats_for_question(&question).await?;
    Ok(Json(stats).into_response())
}

fn submission_response(submission: Submission, summary: ExecutionSummary) -> SubmissionResponse {
    SubmissionResponse {
        submission_id: submission.id,
        submission_type: submission.submission_type,
        passed: summary.passed,
        total: summary.total,
        score: summary.score,
        test_results: summary.results,
    }
}
