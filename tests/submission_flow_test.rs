use axum::{routing::post, Json, Router};
use rust_decimal::Decimal;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use assessment_backend::error::Error;
use assessment_backend::models::coding_question::TestCase;
use assessment_backend::models::question::{Question, QuestionType};
use assessment_backend::services::execution_client::ExecutionClient;
use assessment_backend::services::rate_limit::SubmissionRateLimiter;
use assessment_backend::services::scoring;
use assessment_backend::services::submission_ledger::SubmissionLedger;
use assessment_backend::services::theoretical_eval::{
    TheoreticalEvalService, TheoreticalQuestion,
};
use assessment_backend::test_support::{
    coding_question_fixture, serve_stub, InMemorySubmissionStore,
};

fn four_cases() -> Vec<TestCase> {
    (0..4)
        .map(|i| TestCase {
            input: format!("{} {}", i, i + 1),
            expected_output: format!("{}", 2 * i + 1),
        })
        .collect()
}

/// Stub execution service: case `i` passes iff `passes[i]` is true.
fn execution_stub(passes: Vec<bool>) -> Router {
    Router::new().route(
        "/execute",
        post(move |Json(req): Json<JsonValue>| {
            let passes = passes.clone();
            async move {
                let results: Vec<JsonValue> = req["test_cases"]
                    .as_array()
                    .unwrap()
                    .iter()
                    .zip(passes.iter())
                    .map(|(case, passed)| {
                        json!({
                            "input": case["input"],
                            "expected_output": case["expected_output"],
                            "actual_output": if *passed { case["expected_output"].clone() } else { json!("wrong") },
                            "passed": passed,
                            "errors": [],
                            "exit_code": 0,
                            "execution_time": 0.02,
                        })
                    })
                    .collect();
                Json(json!({ "results": results }))
            }
        }),
    )
}

async fn ledger_with(stub: Router, limit: u32) -> (SubmissionLedger, Arc<InMemorySubmissionStore>) {
    let base_url = serve_stub(stub).await;
    let store = Arc::new(InMemorySubmissionStore::new());
    let ledger = SubmissionLedger::new(
        store.clone(),
        SubmissionRateLimiter::new(limit, Duration::from_secs(60)),
        ExecutionClient::new(
            reqwest::Client::new(),
            format!("{}/execute", base_url),
            Duration::from_secs(5),
        ),
    );
    (ledger, store)
}

#[tokio::test]
async fn test_run_is_persisted_with_execution_results() {
    let (ledger, _store) = ledger_with(execution_stub(vec![true, true, true, false]), 10).await;
    let question = coding_question_fixture(20, four_cases());
    let candidate = Uuid::new_v4();

    let (submission, summary) = ledger
        .record_test_run(None, &question, "print(1)", "python", candidate)
        .await
        .unwrap();

    assert_eq!(submission.submission_type, "test_running");
    assert_eq!(summary.passed, 3);
    assert_eq!(summary.total, 4);
    assert_eq!(summary.score, Decimal::from(15));

    let stats = ledger.stats_for_question(&question).await.unwrap();
    assert_eq!(stats.submission_count, 1);
    assert_eq!(stats.final_submission_count, 0);
    assert!((stats.success_rate - 0.75).abs() < 1e-9);
    assert!(stats.average_execution_time > 0.0);
}

#[tokio::test]
async fn failed_run_is_still_recorded_so_history_is_complete() {
    let (ledger, store) = ledger_with(execution_stub(vec![false, false, false, false]), 10).await;
    let question = coding_question_fixture(20, four_cases());

    let (submission, summary) = ledger
        .record_test_run(None, &question, "syntax error here(", "python", Uuid::new_v4())
        .await
        .unwrap();

    assert_eq!(summary.passed, 0);
    assert_eq!(submission.score, Decimal::ZERO);
    use assessment_backend::services::submission_store::SubmissionStore;
    assert_eq!(store.list_for_question(question.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn unsafe_code_is_rejected_before_anything_is_written() {
    let (ledger, store) = ledger_with(execution_stub(vec![true; 4]), 10).await;
    let question = coding_question_fixture(20, four_cases());

    let err = ledger
        .record_test_run(None, &question, "os.system('ls')", "python", Uuid::new_v4())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidSubmission(_)));
    use assessment_backend::services::submission_store::SubmissionStore;
    assert!(store.list_for_question(question.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn rate_limit_rejects_before_execution_and_is_keyed() {
    let (ledger, _store) = ledger_with(execution_stub(vec![true; 4]), 2).await;
    let question = coding_question_fixture(20, four_cases());
    let candidate = Uuid::new_v4();

    for _ in 0..2 {
        ledger
            .record_test_run(None, &question, "print(1)", "python", candidate)
            .await
            .unwrap();
    }
    let err = ledger
        .record_test_run(None, &question, "print(1)", "python", candidate)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RateLimitExceeded { .. }));

    // Another candidate is unaffected.
    ledger
        .record_test_run(None, &question, "print(1)", "python", Uuid::new_v4())
        .await
        .unwrap();
}

#[tokio::test]
async fn second_final_submission_gets_already_submitted_with_existing_id() {
    let (ledger, _store) = ledger_with(execution_stub(vec![true; 4]), 10).await;
    let question = coding_question_fixture(20, four_cases());
    let attempt = Uuid::new_v4();
    let candidate = Uuid::new_v4();

    let (first, _) = ledger
        .record_final_submission(attempt, &question, "print(1)", "python", candidate)
        .await
        .unwrap();

    let err = ledger
        .record_final_submission(attempt, &question, "print(2)", "python", candidate)
        .await
        .unwrap_err();

    match err {
        Error::AlreadySubmitted { submission_id } => assert_eq!(submission_id, first.id),
        other => panic!("expected AlreadySubmitted, got {:?}", other),
    }
}

#[tokio::test]
async fn concurrent_final_submissions_admit_exactly_one() {
    let (ledger, store) = ledger_with(execution_stub(vec![true; 4]), 10).await;
    let question = coding_question_fixture(20, four_cases());
    let attempt = Uuid::new_v4();
    let candidate = Uuid::new_v4();

    let a = {
        let ledger = ledger.clone();
        let question = question.clone();
        tokio::spawn(async move {
            ledger
                .record_final_submission(attempt, &question, "print(1)", "python", candidate)
                .await
        })
    };
    let b = {
        let ledger = ledger.clone();
        let question = question.clone();
        tokio::spawn(async move {
            ledger
                .record_final_submission(attempt, &question, "print(2)", "python", candidate)
                .await
        })
    };

    let results = vec![a.await.unwrap(), b.await.unwrap()];
    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "exactly one final submission may land");

    let winner_id = results
        .iter()
        .find_map(|r| r.as_ref().ok().map(|(s, _)| s.id))
        .unwrap();
    let loser = results.into_iter().find(|r| r.is_err()).unwrap().unwrap_err();
    match loser {
        Error::AlreadySubmitted { submission_id } => assert_eq!(submission_id, winner_id),
        other => panic!("expected AlreadySubmitted, got {:?}", other),
    }

    use assessment_backend::services::submission_store::SubmissionStore;
    let finals = store.final_submissions_for_attempt(attempt).await.unwrap();
    assert_eq!(finals.len(), 1);
}

#[tokio::test]
async fn execution_outage_rejects_final_submission_without_burning_it() {
    let unreachable = Router::new();
    let (ledger, store) = ledger_with(unreachable, 10).await;
    let question = coding_question_fixture(20, four_cases());
    let attempt = Uuid::new_v4();

    let err = ledger
        .record_final_submission(attempt, &question, "print(1)", "python", Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ExecutionUnavailable(_)));

    use assessment_backend::services::submission_store::SubmissionStore;
    assert!(
        store.final_submissions_for_attempt(attempt).await.unwrap().is_empty(),
        "the candidate's single final submission must not be consumed by an outage"
    );
}

#[tokio::test]
async fn aggregate_counts_final_submissions_only() {
    let (ledger, _store) = ledger_with(execution_stub(vec![true, true, true, false]), 10).await;
    let question = coding_question_fixture(20, four_cases());
    let attempt = Uuid::new_v4();
    let candidate = Uuid::new_v4();

    ledger
        .record_test_run(Some(attempt), &question, "print(1)", "python", candidate)
        .await
        .unwrap();
    ledger
        .record_final_submission(attempt, &question, "print(1)", "python", candidate)
        .await
        .unwrap();

    let total = ledger.aggregate_score_for_attempt(attempt).await.unwrap();
    assert_eq!(total, Decimal::from(15), "trial runs never contribute");
}

/// End-to-end scenario from the product docs: a 10-mark MCQ answered
/// correctly, a 10-mark theoretical question left blank, and a 20-mark
/// coding question passing 3 of 4 cases => 10 + 0 + 15 = 25.
#[tokio::test]
async fn end_to_end_attempt_totals_twenty_five() {
    let (ledger, _store) = ledger_with(execution_stub(vec![true, true, true, false]), 10).await;
    let question = coding_question_fixture(20, four_cases());
    let attempt = Uuid::new_v4();
    let candidate = Uuid::new_v4();

    ledger
        .record_final_submission(attempt, &question, "print(1)", "python", candidate)
        .await
        .unwrap();
    let coding_total = ledger.aggregate_score_for_attempt(attempt).await.unwrap();

    let mcq = Question {
        id: 1,
        question_type: QuestionType::Mcq,
        content: "2 + 2 = ?".to_string(),
        marks: 10,
        correct_answer: "4".to_string(),
        options: vec!["2".into(), "3".into(), "4".into(), "5".into()],
    };
    let theoretical = Question {
        id: 2,
        question_type: QuestionType::Theoretical,
        content: "Explain TCP slow start".to_string(),
        marks: 10,
        correct_answer: "Congestion window doubles each RTT".to_string(),
        options: vec![],
    };

    // Unreachable grader endpoint: the blank answer must short-circuit
    // before any network call, so this still succeeds cleanly.
    let evaluator = TheoreticalEvalService::new(
        reqwest::Client::new(),
        "test-key".to_string(),
        "http://127.0.0.1:9".to_string(),
        "grader-model".to_string(),
    );
    let scores = evaluator
        .evaluate_batch(vec![TheoreticalQuestion {
            question_id: theoretical.id,
            question: theoretical.content.clone(),
            reference_answer: theoretical.correct_answer.clone(),
            candidate_answer: String::new(),
            max_marks: theoretical.marks,
        }])
        .await;
    assert!(scores[0].error.is_none());

    let mut outcomes = vec![scoring::grade_objective(&mcq, Some(" 4 "))];
    outcomes.push(scoring::theoretical_outcome(&theoretical, &scores[0]));

    let total = scoring::compose_total(&outcomes, coding_total);
    assert_eq!(total, Decimal::from(25));
}
