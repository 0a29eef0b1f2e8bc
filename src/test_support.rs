//! Helpers for integration tests: an in-memory submission store and an
//! ephemeral-port server for stubbing the external HTTP services.

use async_trait::async_trait;
use axum::Router;
use chrono::Utc;
use std::sync::Mutex;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::coding_question::{CodingQuestion, TestCase};
use crate::models::submission::{Submission, SubmissionType};
use crate::services::submission_store::{NewSubmission, SubmissionStore};

/// Mutex-serialized store upholding the same one-final-submission invariant
/// the Postgres partial unique index provides.
#[derive(Default)]
pub struct InMemorySubmissionStore {
    rows: Mutex<Vec<Submission>>,
}

impl InMemorySubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SubmissionStore for InMemorySubmissionStore {
    async fn insert(&self, new: NewSubmission) -> Result<Submission> {
        let mut rows = self.rows.lock().expect("store mutex poisoned");

        if new.submission_type == SubmissionType::Submit {
            let existing = rows.iter().find(|s| {
                s.submission_type == SubmissionType::Submit.as_str()
                    && s.attempt_id == new.attempt_id
                    && s.coding_question_id == new.coding_question_id
            });
            if let Some(existing) = existing {
                return Err(Error::AlreadySubmitted { submission_id: existing.id });
            }
        }

        let submission = Submission {
            id: Uuid::new_v4(),
            coding_question_id: new.coding_question_id,
            attempt_id: new.attempt_id,
            candidate_id: new.candidate_id,
            solution_code: new.solution_code,
            language: new.language,
            submission_type: new.submission_type.as_str().to_string(),
            score: new.score,
            test_results: new.test_results,
            created_at: Some(Utc::now()),
        };
        rows.push(submission.clone());
        Ok(submission)
    }

    async fn find_final(
        &self,
        attempt_id: Uuid,
        coding_question_id: Uuid,
    ) -> Result<Option<Submission>> {
        let rows = self.rows.lock().expect("store mutex poisoned");
        Ok(rows
            .iter()
            .find(|s| {
                s.submission_type == SubmissionType::Submit.as_str()
                    && s.attempt_id == Some(attempt_id)
                    && s.coding_question_id == coding_question_id
            })
            .cloned())
    }

    async fn list_for_question(&self, coding_question_id: Uuid) -> Result<Vec<Submission>> {
        let rows = self.rows.lock().expect("store mutex poisoned");
        Ok(rows
            .iter()
            .filter(|s| s.coding_question_id == coding_question_id)
            .cloned()
            .collect())
    }

    async fn final_submissions_for_attempt(&self, attempt_id: Uuid) -> Result<Vec<Submission>> {
        let rows = self.rows.lock().expect("store mutex poisoned");
        Ok(rows
            .iter()
            .filter(|s| {
                s.submission_type == SubmissionType::Submit.as_str()
                    && s.attempt_id == Some(attempt_id)
            })
            .cloned()
            .collect())
    }
}

/// Serves a stub router on an ephemeral local port, returning its base URL.
pub async fn serve_stub(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("stub server");
    });
    format!("http://{}", addr)
}

pub fn coding_question_fixture(marks: i32, cases: Vec<TestCase>) -> CodingQuestion {
    CodingQuestion {
        id: Uuid::new_v4(),
        test_id: Uuid::new_v4(),
        title: "Sum two numbers".to_string(),
        description: Some("Read two integers, print their sum".to_string()),
        marks,
        difficulty: "easy".to_string(),
        boilerplate_code: None,
        test_cases: serde_json::to_value(&cases).expect("serialize test cases"),
        created_at: None,
        updated_at: None,
    }
}
