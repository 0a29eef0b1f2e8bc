use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json, Response},
};
use uuid::Uuid;
use validator::Validate;

use crate::dto::attempt_dto::{AttemptResultResponse, SaveAnswersRequest, SaveAnswersResponse};
use crate::models::attempt::Attempt;
use crate::AppState;

#[axum::debug_handler]
pub async fn save_answers(
    State(state): State<AppState>,
    Path(attempt_id): Path<Uuid>,
    Json(req): Json<SaveAnswersRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let attempt = state
        .attempt_service
        .save_answers(attempt_id, req.answers)
        .await?;
    let answered = attempt
        .answers
        .as_ref()
        .and_then(|a| a.as_object())
        .map(|m| m.len())
        .unwrap_or(0);

    Ok(Json(SaveAnswersResponse {
        attempt_id: attempt.id,
        saved: true,
        answered_questions: answered,
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn evaluate_attempt(
    State(state): State<AppState>,
    Path(attempt_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let attempt = state.attempt_service.evaluate(attempt_id, false).await?;
    Ok(Json(result_response(attempt)).into_response())
}

#[axum::debug_handler]
pub async fn submit_attempt(
    State(state): State<AppState>,
    Path(attempt_id): Path<Uuid>,
) -> crate::error::Result<Response> {
    let attempt = state.attempt_service.evaluate(attempt_id, true).await?;
    Ok(Json(result_response(attempt)).into_response())
}

fn result_response(attempt: Attempt) -> AttemptResultResponse {
    AttemptResultResponse {
        attempt_id: attempt.id,
        status: attempt.status,
        marks: attempt.marks.unwrap_or_default(),
        question_wise_marks_obtained: attempt
            .question_wise_marks_obtained
            .unwrap_or_else(|| serde_json::json!([])),
        completed_at: attempt.completed_at,
    }
}
