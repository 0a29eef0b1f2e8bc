use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::submission::{Submission, SubmissionType};

#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub coding_question_id: Uuid,
    pub attempt_id: Option<Uuid>,
    pub candidate_id: Uuid,
    pub solution_code: String,
    pub language: String,
    pub submission_type: SubmissionType,
    pub score: rust_decimal::Decimal,
    pub test_results: JsonValue,
}

/// Persistence seam for the append-only submission ledger.
///
/// Implementations must guarantee at most one `submit`-type row per
/// (attempt, coding question) even under concurrent inserts: a duplicate
/// fails with `AlreadySubmitted` carrying the existing row's id. A naive
/// check-then-insert is not enough; the Postgres store relies on a partial
/// unique index, the in-memory store serializes through its mutex.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn insert(&self, new: NewSubmission) -> Result<Submission>;

    async fn find_final(
        &self,
        attempt_id: Uuid,
        coding_question_id: Uuid,
    ) -> Result<Option<Submission>>;

    async fn list_for_question(&self, coding_question_id: Uuid) -> Result<Vec<Submission>>;

    async fn final_submissions_for_attempt(&self, attempt_id: Uuid) -> Result<Vec<Submission>>;
}

#[derive(Clone)]
pub struct PgSubmissionStore {
    pool: PgPool,
}

impl PgSubmissionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubmissionStore for PgSubmissionStore {
    async fn insert(&self, new: NewSubmission) -> Result<Submission> {
        let inserted = sqlx::query_as::<_, Submission>(
            r#"
            INSERT INTO submissions (
                coding_question_id, attempt_id, candidate_id, solution_code,
                language, submission_type, score, test_results
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(new.coding_question_id)
        .bind(new.attempt_id)
        .bind(new.candidate_id)
        .bind(&new.solution_code)
        .bind(&new.language)
        .bind(new.submission_type.as_str())
        .bind(new.score)
        .bind(&new.test_results)
        .fetch_one(&self.pool)
        .await;

        match inserted {
            Ok(submission) => Ok(submission),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                // Lost the race to another final submission; surface the
                // winner's id instead of an opaque constraint error.
                let attempt_id = new.attempt_id.ok_or_else(|| {
                    Error::Internal("Unique violation on submission without attempt".to_string())
                })?;
                let existing = self
                    .find_final(attempt_id, new.coding_question_id)
                    .await?
                    .ok_or_else(|| {
                        Error::Internal(
                            "Unique violation but no existing final submission found".to_string(),
                        )
                    })?;
                Err(Error::AlreadySubmitted { submission_id: existing.id })
            }
            Err(other) => Err(other.into()),
        }
    }

    async fn find_final(
        &self,
        attempt_id: Uuid,
        coding_question_id: Uuid,
    ) -> Result<Option<Submission>> {
        let existing = sqlx::query_as::<_, Submission>(
            r#"
            SELECT * FROM submissions
            WHERE attempt_id = $1
              AND coding_question_id = $2
              AND submission_type = 'submit'
            "#,
        )
        .bind(attempt_id)
        .bind(coding_question_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(existing)
    }

    async fn list_for_question(&self, coding_question_id: Uuid) -> Result<Vec<Submission>> {
        let rows = sqlx::query_as::<_, Submission>(
            r#"
            SELECT * FROM submissions
            WHERE coding_question_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(coding_question_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn final_submissions_for_attempt(&self, attempt_id: Uuid) -> Result<Vec<Submission>> {
        let rows = sqlx::query_as::<_, Submission>(
            r#"
            SELECT * FROM submissions
            WHERE attempt_id = $1
              AND submission_type = 'submit'
            ORDER BY created_at ASC
            "#,
        )
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
