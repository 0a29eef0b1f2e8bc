use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::models::coding_question::TestCase;

/// Synchronous adapter to the external stateless compile/run service.
///
/// One network call per invocation, no retries: retry policy belongs to the
/// caller, and coding-test time limits make silent retries a product
/// integrity problem rather than a convenience.
#[derive(Clone)]
pub struct ExecutionClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct ExecutionRequest<'a> {
    language: &'a str,
    code: &'a str,
    test_cases: Vec<WireTestCase>,
}

#[derive(Debug, Serialize)]
struct WireTestCase {
    input: JsonValue,
    expected_output: String,
}

#[derive(Debug, Deserialize)]
struct ExecutionResponse {
    results: Vec<CaseOutcome>,
}

/// Per-test-case outcome, in the same order the cases were submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseOutcome {
    #[serde(default)]
    pub input: JsonValue,
    #[serde(default)]
    pub expected_output: String,
    #[serde(default)]
    pub actual_output: String,
    pub passed: bool,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub execution_time: f64,
}

impl ExecutionClient {
    pub fn new(client: Client, endpoint: String, timeout: Duration) -> Self {
        Self { client, endpoint, timeout }
    }

    /// Runs already-validated source against the question's test cases.
    /// Any transport failure, non-2xx status or unusable body surfaces as
    /// `ExecutionUnavailable` so callers can report "service temporarily
    /// unavailable" instead of silently zero-scoring.
    pub async fn run(
        &self,
        language: &str,
        code: &str,
        test_cases: &[TestCase],
    ) -> Result<Vec<CaseOutcome>> {
        let request = ExecutionRequest {
            language,
            code,
            test_cases: test_cases.iter().map(wire_case).collect(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::ExecutionUnavailable(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body = body.chars().take(512).collect::<String>();
            return Err(Error::ExecutionUnavailable(format!(
                "upstream status {}: {}",
                status, body
            )));
        }

        let parsed: ExecutionResponse = response
            .json()
            .await
            .map_err(|e| Error::ExecutionUnavailable(format!("malformed response body: {}", e)))?;

        Ok(parsed.results)
    }
}

/// Inputs that look like a serialized map are passed as structured data;
/// everything else goes through as a literal string.
fn wire_case(case: &TestCase) -> WireTestCase {
    let trimmed = case.input.trim();
    let input = if trimmed.starts_with('{') {
        match serde_json::from_str::<JsonValue>(trimmed) {
            Ok(value @ JsonValue::Object(_)) => value,
            _ => JsonValue::String(case.input.clone()),
        }
    } else {
        JsonValue::String(case.input.clone())
    };

    WireTestCase {
        input,
        expected_output: case.expected_output.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_like_input_is_sent_structured() {
        let case = TestCase {
            input: r#"{"n": 4, "values": [1, 2]}"#.to_string(),
            expected_output: "3".to_string(),
        };
        let wire = wire_case(&case);
        assert!(wire.input.is_object());
        assert_eq!(wire.input["n"], 4);
    }

    #[test]
    fn plain_and_malformed_inputs_stay_literal() {
        for raw in ["1 2 3", "{not json", "[1,2]"] {
            let case = TestCase {
                input: raw.to_string(),
                expected_output: String::new(),
            };
            assert!(wire_case(&case).input.is_string(), "input: {}", raw);
        }
    }
}
