use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::utils::normalize::normalize_case_text;

pub const MAX_TEST_CASE_CHARS: usize = 10_000;
pub const MAX_TEST_CASE_LINES: usize = 1_000;
pub const MAX_BOILERPLATE_CHARS: usize = 10_000;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CodingQuestion {
    pub id: Uuid,
    pub test_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub marks: i32,
    pub difficulty: String,
    pub boilerplate_code: Option<String>,
    /// Array of `TestCase`, exclusively owned and cascade-deleted with the
    /// question.
    pub test_cases: JsonValue,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestCase {
    pub input: String,
    pub expected_output: String,
}

impl TestCase {
    /// Derived difficulty signal used in ledger statistics: line counts plus
    /// a fifth of the word counts keeps the score integral and small.
    pub fn complexity_score(&self) -> i32 {
        let lines =
            self.input.lines().count() + self.expected_output.lines().count();
        let words = self.input.split_whitespace().count()
            + self.expected_output.split_whitespace().count();
        (lines + words / 5) as i32
    }

    fn check_size(&self, index: usize) -> Result<()> {
        for (field, text) in [("input", &self.input), ("expected_output", &self.expected_output)] {
            if text.chars().count() > MAX_TEST_CASE_CHARS {
                return Err(Error::BadRequest(format!(
                    "Test case {} {} exceeds {} characters",
                    index + 1,
                    field,
                    MAX_TEST_CASE_CHARS
                )));
            }
            if text.lines().count() > MAX_TEST_CASE_LINES {
                return Err(Error::BadRequest(format!(
                    "Test case {} {} exceeds {} lines",
                    index + 1,
                    field,
                    MAX_TEST_CASE_LINES
                )));
            }
        }
        Ok(())
    }
}

impl CodingQuestion {
    pub fn parsed_test_cases(&self) -> Vec<TestCase> {
        serde_json::from_value(self.test_cases.clone()).unwrap_or_default()
    }
}

/// Authoring-side invariants: size caps per case, no duplicate cases after
/// line-ending normalization (order-independent), and at least one case when
/// the owning test is published.
pub fn validate_test_cases(cases: &[TestCase], test_published: bool) -> Result<()> {
    if test_published && cases.is_empty() {
        return Err(Error::BadRequest(
            "A coding question on a published test must have at least one test case".to_string(),
        ));
    }

    let mut seen = std::collections::HashSet::new();
    for (index, case) in cases.iter().enumerate() {
        case.check_size(index)?;
        let key = (
            normalize_case_text(&case.input),
            normalize_case_text(&case.expected_output),
        );
        if !seen.insert(key) {
            return Err(Error::BadRequest(format!(
                "Test case {} duplicates an earlier case (same input and expected output)",
                index + 1
            )));
        }
    }
    Ok(())
}
