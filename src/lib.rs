pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod test_support;
pub mod utils;

use crate::services::{
    attempt_service::AttemptService, execution_client::ExecutionClient,
    rate_limit::SubmissionRateLimiter, submission_ledger::SubmissionLedger,
    submission_store::PgSubmissionStore, test_service::TestService,
    theoretical_eval::TheoreticalEvalService,
};
use reqwest::Client;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub test_service: TestService,
    pub attempt_service: AttemptService,
    pub ledger: SubmissionLedger,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let config = crate::config::get_config();
        let http_client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("failed to build HTTP client");

        let execution = ExecutionClient::new(
            http_client.clone(),
            config.execution_service_url.clone(),
            Duration::from_secs(config.execution_timeout_secs),
        );
        let evaluator = TheoreticalEvalService::new(
            http_client,
            config.openai_api_key.clone(),
            config.openai_base_url.clone(),
            config.grading_model.clone(),
        );
        let limiter = SubmissionRateLimiter::new(
            config.submissions_per_window,
            Duration::from_secs(config.submission_window_secs),
        );
        let ledger = SubmissionLedger::new(
            Arc::new(PgSubmissionStore::new(pool.clone())),
            limiter,
            execution,
        );
        let test_service = TestService::new(pool.clone());
        let attempt_service = AttemptService::new(pool.clone(), evaluator, ledger.clone());

        Self {
            pool,
            test_service,
            attempt_service,
            ledger,
        }
    }
}
