pub mod attempt_service;
pub mod code_safety;
pub mod execution_client;
pub mod rate_limit;
pub mod scoring;
pub mod submission_ledger;
pub mod submission_store;
pub mod test_service;
pub mod theoretical_eval;
