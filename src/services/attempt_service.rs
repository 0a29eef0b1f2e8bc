use chrono::Utc;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::attempt::Attempt;
use crate::models::question::QuestionType;
use crate::models::test::Test;
use crate::services::scoring::{self, QuestionOutcome};
use crate::services::submission_ledger::SubmissionLedger;
use crate::services::theoretical_eval::{TheoreticalEvalService, TheoreticalQuestion};

/// Top-level scoring orchestrator: classifies every question in the test,
/// routes it to the matching grader, folds in the coding aggregate and
/// finalizes the attempt record.
#[derive(Clone)]
pub struct AttemptService {
    pool: PgPool,
    evaluator: TheoreticalEvalService,
    ledger: SubmissionLedger,
}

impl AttemptService {
    pub fn new(pool: PgPool, evaluator: TheoreticalEvalService, ledger: SubmissionLedger) -> Self {
        Self { pool, evaluator, ledger }
    }

    pub async fn get_attempt(&self, attempt_id: Uuid) -> Result<Attempt> {
        let attempt =
            sqlx::query_as::<_, Attempt>(r#"SELECT * FROM attempts WHERE id = $1"#)
                .bind(attempt_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(attempt)
    }

    pub async fn get_attempt_and_test(&self, attempt_id: Uuid) -> Result<(Attempt, Test)> {
        let attempt = self.get_attempt(attempt_id).await?;
        let test = sqlx::query_as::<_, Test>(r#"SELECT * FROM tests WHERE id = $1"#)
            .bind(attempt.test_id)
            .fetch_one(&self.pool)
            .await?;
        Ok((attempt, test))
    }

    /// Merges an autosave payload (question id -> submitted value) into the
    /// attempt's answers map. Existing keys are replaced.
    pub async fn save_answers(&self, attempt_id: Uuid, answers: JsonValue) -> Result<Attempt> {
        let incoming = answers
            .as_object()
            .ok_or_else(|| Error::BadRequest("answers must be an object".to_string()))?
            .clone();

        let attempt = self.get_attempt(attempt_id).await?;
        if attempt.completed_at.is_some() {
            return Err(Error::BadRequest(
                "Attempt has already been submitted".to_string(),
            ));
        }

        let mut merged = attempt
            .answers
            .as_ref()
            .and_then(|v| v.as_object().cloned())
            .unwrap_or_default();
        for (question_id, value) in incoming {
            merged.insert(question_id, value);
        }

        let updated = sqlx::query_as::<_, Attempt>(
            r#"
            UPDATE attempts
            SET answers = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(JsonValue::Object(merged))
        .bind(attempt_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(updated)
    }

    /// Runs one full evaluation pass. Objective and theoretical scores may
    /// be recomputed any number of times while the attempt is open; the
    /// coding contribution only changes when new final submissions land.
    /// `finalize` stamps `completed_at` and closes the attempt.
    pub async fn evaluate(&self, attempt_id: Uuid, finalize: bool) -> Result<Attempt> {
        let (attempt, test) = self.get_attempt_and_test(attempt_id).await?;
        if attempt.completed_at.is_some() {
            return Err(Error::BadRequest(
                "Attempt has already been submitted".to_string(),
            ));
        }

        let questions = test.parsed_questions();

        // A test with no questions evaluates to an empty outcome set, not
        // an error; the coding aggregate can still contribute.
        let mut outcomes: Vec<QuestionOutcome> = Vec::with_capacity(questions.len());
        let mut theoretical_batch = Vec::new();

        for question in &questions {
            match question.question_type {
                QuestionType::Mcq | QuestionType::Msq => {
                    let given = attempt.answer_for(question.id);
                    outcomes.push(scoring::grade_objective(question, given.as_deref()));
                }
                QuestionType::Theoretical => {
                    theoretical_batch.push(TheoreticalQuestion {
                        question_id: question.id,
                        question: question.content.clone(),
                        reference_answer: question.correct_answer.clone(),
                        candidate_answer: attempt.answer_for(question.id).unwrap_or_default(),
                        max_marks: question.marks,
                    });
                }
            }
        }

        if !theoretical_batch.is_empty() {
            let scores = self.evaluator.evaluate_batch(theoretical_batch).await;
            for score in &scores {
                if let Some(question) = questions.iter().find(|q| q.id == score.question_id) {
                    outcomes.push(scoring::theoretical_outcome(question, score));
                }
            }
        }
        outcomes.sort_by_key(|o| o.question_id);

        let coding_total = self.ledger.aggregate_score_for_attempt(attempt.id).await?;
        let total = scoring::compose_total(&outcomes, coding_total);
        let outcomes_json = serde_json::to_value(&outcomes)?;

        // marks and question_wise_marks_obtained are written in one
        // statement; a partial write of one without the other is not an
        // acceptable state. A failure here fails the whole scoring pass and
        // the orchestrator is simply re-invoked.
        let completed_at = finalize.then(Utc::now);
        let status = if finalize { "completed" } else { "in_progress" };
        let updated = sqlx::query_as::<_, Attempt>(
            r#"
            UPDATE attempts
            SET question_wise_marks_obtained = $1,
                marks = $2,
                status = $3,
                completed_at = COALESCE(completed_at, $4),
                updated_at = NOW()
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(outcomes_json)
        .bind(total)
        .bind(status)
        .bind(completed_at)
        .bind(attempt.id)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(
            attempt_id = %attempt.id,
            candidate_id = %attempt.candidate_id,
            marks = %total,
            finalize,
            "Attempt evaluated"
        );

        Ok(updated)
    }
}
