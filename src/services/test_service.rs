use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::coding_question::CodingQuestion;
use crate::models::test::Test;

#[derive(Clone)]
pub struct TestService {
    pool: PgPool,
}

impl TestService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_test(&self, test_id: Uuid) -> Result<Test> {
        let test = sqlx::query_as::<_, Test>(r#"SELECT * FROM tests WHERE id = $1"#)
            .bind(test_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(test)
    }

    pub async fn get_coding_question(&self, coding_question_id: Uuid) -> Result<CodingQuestion> {
        let question = sqlx::query_as::<_, CodingQuestion>(
            r#"SELECT * FROM coding_questions WHERE id = $1"#,
        )
        .bind(coding_question_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(question)
    }

    /// Refreshes the derived `total_marks` on a test: the sum of all
    /// question and coding-question marks under it. Called when a final
    /// submission lands or a question's marks change. Idempotent; the stored
    /// value is never a source of truth.
    pub async fn recompute_total_marks(&self, test_id: Uuid) -> Result<Decimal> {
        let test = self.get_test(test_id).await?;
        let question_total: i64 = test
            .parsed_questions()
            .iter()
            .map(|q| i64::from(q.marks))
            .sum();

        let coding_total: i64 = sqlx::query_scalar::<_, Option<i64>>(
            r#"SELECT SUM(marks)::bigint FROM coding_questions WHERE test_id = $1"#,
        )
        .bind(test_id)
        .fetch_one(&self.pool)
        .await?
        .unwrap_or(0);

        let total = Decimal::from(question_total + coding_total);
        sqlx::query(r#"UPDATE tests SET total_marks = $1, updated_at = NOW() WHERE id = $2"#)
            .bind(total)
            .bind(test_id)
            .execute(&self.pool)
            .await?;

        Ok(total)
    }
}
