use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::coding_question::CodingQuestion;
use crate::models::submission::{Submission, SubmissionType};
use crate::services::code_safety;
use crate::services::execution_client::{CaseOutcome, ExecutionClient};
use crate::services::rate_limit::SubmissionRateLimiter;
use crate::services::submission_store::{NewSubmission, SubmissionStore};

/// Mediates all writes to the submission history and derives aggregates.
/// Validation and rate limiting happen before any execution or persistence;
/// execution failures are isolated per submission.
#[derive(Clone)]
pub struct SubmissionLedger {
    store: Arc<dyn SubmissionStore>,
    limiter: SubmissionRateLimiter,
    execution: ExecutionClient,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecutionSummary {
    pub passed: usize,
    pub total: usize,
    pub score: Decimal,
    pub results: Vec<CaseOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionStats {
    pub submission_count: usize,
    pub final_submission_count: usize,
    /// Mean fraction of test cases passed across all recorded submissions.
    pub success_rate: f64,
    /// Mean per-case execution time in seconds across all recorded results.
    pub average_execution_time: f64,
    /// Mean complexity score of the question's test cases.
    pub average_case_complexity: f64,
}

impl SubmissionLedger {
    pub fn new(
        store: Arc<dyn SubmissionStore>,
        limiter: SubmissionRateLimiter,
        execution: ExecutionClient,
    ) -> Self {
        Self { store, limiter, execution }
    }

    /// Records a trial run. The submission is persisted regardless of the
    /// execution outcome (failed compiles included) so the history stays
    /// complete; only an unreachable execution service persists an
    /// empty-result record before the error is surfaced.
    pub async fn record_test_run(
        &self,
        attempt_id: Option<Uuid>,
        question: &CodingQuestion,
        code: &str,
        language: &str,
        candidate_id: Uuid,
    ) -> Result<(Submission, ExecutionSummary)> {
        let sanitized = code_safety::validate_solution(code, language)?;
        self.limiter.check((candidate_id, question.id))?;

        let cases = question.parsed_test_cases();
        match self.execution.run(language, &sanitized, &cases).await {
            Ok(results) => {
                let summary = summarize(question.marks, cases.len(), results);
                let submission = self
                    .persist(
                        attempt_id,
                        question,
                        sanitized,
                        language,
                        candidate_id,
                        SubmissionType::TestRunning,
                        &summary,
                    )
                    .await?;
                Ok((submission, summary))
            }
            Err(err @ Error::ExecutionUnavailable(_)) => {
                tracing::error!(
                    coding_question_id = %question.id,
                    attempt_id = ?attempt_id,
                    candidate_id = %candidate_id,
                    error = %err,
                    "Execution service unavailable during test run"
                );
                let summary = summarize(question.marks, cases.len(), Vec::new());
                let _ = self
                    .persist(
                        attempt_id,
                        question,
                        sanitized,
                        language,
                        candidate_id,
                        SubmissionType::TestRunning,
                        &summary,
                    )
                    .await?;
                Err(err)
            }
            Err(other) => Err(other),
        }
    }

    /// Records the single graded submission for (attempt, coding question).
    /// If a final submission already exists the call fails with
    /// `AlreadySubmitted` carrying the existing id; the storage layer
    /// enforces the same invariant under concurrent requests. An unreachable
    /// execution service rejects the request without writing anything, so
    /// the candidate's one final submission is not consumed by an outage.
    pub async fn record_final_submission(
        &self,
        attempt_id: Uuid,
        question: &CodingQuestion,
        code: &str,
        language: &str,
        candidate_id: Uuid,
    ) -> Result<(Submission, ExecutionSummary)> {
        let sanitized = code_safety::validate_solution(code, language)?;

        if let Some(existing) = self.store.find_final(attempt_id, question.id).await? {
            return Err(Error::AlreadySubmitted { submission_id: existing.id });
        }

        self.limiter.check((candidate_id, question.id))?;

        let cases = question.parsed_test_cases();
        let results = self.execution.run(language, &sanitized, &cases).await.map_err(|e| {
            tracing::error!(
                coding_question_id = %question.id,
                attempt_id = %attempt_id,
                candidate_id = %candidate_id,
                error = %e,
                "Execution service unavailable during final submission"
            );
            e
        })?;

        let summary = summarize(question.marks, cases.len(), results);
        let submission = self
            .persist(
                Some(attempt_id),
                question,
                sanitized,
                language,
                candidate_id,
                SubmissionType::Submit,
                &summary,
            )
            .await?;
        Ok((submission, summary))
    }

    /// Sum of `submit`-type scores for the attempt. Trial runs never
    /// contribute to the final mark.
    pub async fn aggregate_score_for_attempt(&self, attempt_id: Uuid) -> Result<Decimal> {
        let finals = self.store.final_submissions_for_attempt(attempt_id).await?;
        Ok(finals.iter().map(|s| s.score).sum())
    }

    /// Statistics derived from the ledger on demand, never stored.
    pub async fn stats_for_question(&self, question: &CodingQuestion) -> Result<SubmissionStats> {
        let submissions = self.store.list_for_question(question.id).await?;

        let mut pass_ratios = Vec::new();
        let mut case_times = Vec::new();
        let mut final_count = 0usize;
        for submission in &submissions {
            if submission.submission_type == SubmissionType::Submit.as_str() {
                final_count += 1;
            }
            let results: Vec<CaseOutcome> =
                serde_json::from_value(submission.test_results.clone()).unwrap_or_default();
            if !results.is_empty() {
                let passed = results.iter().filter(|r| r.passed).count();
                pass_ratios.push(passed as f64 / results.len() as f64);
                case_times.extend(results.iter().map(|r| r.execution_time));
            }
        }

        let complexities: Vec<f64> = question
            .parsed_test_cases()
            .iter()
            .map(|c| f64::from(c.complexity_score()))
            .collect();

        Ok(SubmissionStats {
            submission_count: submissions.len(),
            final_submission_count: final_count,
            success_rate: mean(&pass_ratios),
            average_execution_time: mean(&case_times),
            average_case_complexity: mean(&complexities),
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn persist(
        &self,
        attempt_id: Option<Uuid>,
        question: &CodingQuestion,
        solution_code: String,
        language: &str,
        candidate_id: Uuid,
        submission_type: SubmissionType,
        summary: &ExecutionSummary,
    ) -> Result<Submission> {
        self.store
            .insert(NewSubmission {
                coding_question_id: question.id,
                attempt_id,
                candidate_id,
                solution_code,
                language: language.to_string(),
                submission_type,
                score: summary.score,
                test_results: serde_json::to_value(&summary.results)?,
            })
            .await
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn summarize(marks: i32, total: usize, results: Vec<CaseOutcome>) -> ExecutionSummary {
    let passed = results.iter().filter(|r| r.passed).count();
    ExecutionSummary {
        passed,
        total,
        score: score_for(marks, passed, total),
        results,
    }
}

/// score = passed/total x marks, rounded to 2 decimal places. A question
/// with no test cases scores 0 regardless of the execution result.
pub fn score_for(marks: i32, passed: usize, total: usize) -> Decimal {
    if total == 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(passed as u64) / Decimal::from(total as u64) * Decimal::from(marks))
        .round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::execution_client::ExecutionClient;
    use crate::services::submission_store::MockSubmissionStore;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn score_rounds_to_two_decimals() {
        assert_eq!(score_for(20, 3, 4), dec("15"));
        assert_eq!(score_for(10, 1, 3), dec("3.33"));
        assert_eq!(score_for(10, 2, 3), dec("6.67"));
    }

    #[test]
    fn zero_test_cases_scores_zero() {
        assert_eq!(score_for(100, 0, 0), Decimal::ZERO);
        assert_eq!(score_for(100, 5, 0), Decimal::ZERO);
    }

    #[test]
    fn aggregate_sums_final_scores_only() {
        let attempt_id = Uuid::new_v4();
        let mut store = MockSubmissionStore::new();
        store
            .expect_final_submissions_for_attempt()
            .returning(move |_| {
                Ok(vec![
                    fixture_submission(dec("15"), SubmissionType::Submit),
                    fixture_submission(dec("7.5"), SubmissionType::Submit),
                ])
            });

        let ledger = SubmissionLedger::new(
            Arc::new(store),
            SubmissionRateLimiter::new(10, std::time::Duration::from_secs(60)),
            ExecutionClient::new(
                reqwest::Client::new(),
                "http://127.0.0.1:9/execute".to_string(),
                std::time::Duration::from_secs(1),
            ),
        );

        let total = tokio_test::block_on(ledger.aggregate_score_for_attempt(attempt_id)).unwrap();
        assert_eq!(total, dec("22.5"));
    }

    fn fixture_submission(
        score: Decimal,
        submission_type: SubmissionType,
    ) -> crate::models::submission::Submission {
        crate::models::submission::Submission {
            id: Uuid::new_v4(),
            coding_question_id: Uuid::new_v4(),
            attempt_id: Some(Uuid::new_v4()),
            candidate_id: Uuid::new_v4(),
            solution_code: "print(1)".to_string(),
            language: "python".to_string(),
            submission_type: submission_type.as_str().to_string(),
            score,
            test_results: serde_json::json!([]),
            created_at: None,
        }
    }
}
