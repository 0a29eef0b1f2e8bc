use regex::Regex;
use reqwest::Client;
use serde_json::json;
use std::sync::OnceLock;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::utils::normalize::strip_html;

const EVAL_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RESPONSE_TOKENS: u32 = 10;

#[derive(Debug, Clone)]
pub struct TheoreticalQuestion {
    pub question_id: i32,
    pub question: String,
    pub reference_answer: String,
    pub candidate_answer: String,
    pub max_marks: i32,
}

#[derive(Debug, Clone)]
pub struct TheoreticalScore {
    pub question_id: i32,
    pub marks_awarded: i32,
    pub max_marks: i32,
    /// Set when grading degraded (network/parse failure). The question
    /// scores 0 but never aborts the batch.
    pub error: Option<String>,
}

/// Grades free-text answers against a reference answer via an external
/// chat-completion API. One call per question; no caching here.
#[derive(Clone)]
pub struct TheoreticalEvalService {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl TheoreticalEvalService {
    pub fn new(client: Client, api_key: String, base_url: String, model: String) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    /// Returns one score per question, ordered by question id. Blank
    /// answers short-circuit to 0 marks without a network call.
    pub async fn evaluate_batch(
        &self,
        mut batch: Vec<TheoreticalQuestion>,
    ) -> Vec<TheoreticalScore> {
        batch.sort_by_key(|q| q.question_id);

        let mut scores = Vec::with_capacity(batch.len());
        for question in batch {
            if question.candidate_answer.trim().is_empty() {
                scores.push(TheoreticalScore {
                    question_id: question.question_id,
                    marks_awarded: 0,
                    max_marks: question.max_marks,
                    error: None,
                });
                continue;
            }

            let score = match self.grade_one(&question).await {
                Ok(marks) => TheoreticalScore {
                    question_id: question.question_id,
                    marks_awarded: marks,
                    max_marks: question.max_marks,
                    error: None,
                },
                Err(e) => {
                    tracing::warn!(
                        question_id = question.question_id,
                        error = %e,
                        "Theoretical grading degraded, awarding 0"
                    );
                    TheoreticalScore {
                        question_id: question.question_id,
                        marks_awarded: 0,
                        max_marks: question.max_marks,
                        error: Some(e.to_string()),
                    }
                }
            };
            scores.push(score);
        }
        scores
    }

    async fn grade_one(&self, question: &TheoreticalQuestion) -> Result<i32> {
        let payload = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": system_prompt(question.max_marks)},
                {"role": "user", "content": user_prompt(question)}
            ],
            "temperature": 0.0,
            "max_tokens": MAX_RESPONSE_TOKENS,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .timeout(EVAL_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Internal(format!(
                "Grader API error {}: {}",
                status,
                body.chars().take(256).collect::<String>()
            )));
        }

        let body: serde_json::Value = response.json().await?;
        let content = body
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| Error::Internal("Grader response missing content".to_string()))?;

        parse_score(content, question.max_marks)
    }
}

fn system_prompt(max_marks: i32) -> String {
    format!(
        "You are a strict examiner grading a candidate's free-text answer \
         against a reference answer.\n\
         Award marks for semantic correctness, not wording.\n\
         Rules:\n\
         1. A fully correct answer (same meaning as the reference, case and \
         phrasing irrelevant) earns the full {max} marks.\n\
         2. A partially correct answer (covers a key part of the reference \
         meaning, or only matching keywords) earns half marks.\n\
         3. An unrelated or wrong answer earns 0.\n\
         Worked examples for a 10-mark question:\n\
         - Expected \"Paris\", Answer \"paris\" -> 10\n\
         - Expected \"Jupiter Planet\", Answer \"Jupiter\" -> 5\n\
         - Expected \"Photosynthesis\", Answer \"Gravity\" -> 0\n\
         Respond with ONLY a single number between 0 and {max}. \
         No words, no punctuation, no explanation.",
        max = max_marks
    )
}

fn user_prompt(question: &TheoreticalQuestion) -> String {
    format!(
        "Question: {}\nReference answer: {}\nCandidate answer: {}\nMaximum marks: {}",
        strip_html(&question.question),
        strip_html(&question.reference_answer),
        strip_html(&question.candidate_answer),
        question.max_marks
    )
}

fn numeric_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[-+]?\d+(\.\d+)?").expect("valid regex"))
}

/// Parses the grader's reply as a bare number, repairing the common
/// deviations (markdown fences, stray labels) before giving up. Clamps to
/// [0, max_marks] and rounds to the nearest integer. Isolated here so a
/// stricter structured-output contract can replace it without touching
/// scoring logic.
pub fn parse_score(raw: &str, max_marks: i32) -> Result<i32> {
    let mut cleaned = raw.trim();
    if cleaned.starts_with("```") {
        cleaned = cleaned.trim_start_matches("```");
        cleaned = cleaned.strip_prefix("json").unwrap_or(cleaned);
        cleaned = cleaned.trim_end_matches("```").trim();
    }

    let token = numeric_token_re()
        .find(cleaned)
        .ok_or_else(|| Error::Internal(format!("Unparseable grader reply: {:?}", raw)))?;
    let value: f64 = token
        .as_str()
        .parse()
        .map_err(|_| Error::Internal(format!("Unparseable grader reply: {:?}", raw)))?;

    Ok((value.clamp(0.0, max_marks as f64)).round() as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_numbers() {
        assert_eq!(parse_score("7", 10).unwrap(), 7);
        assert_eq!(parse_score(" 5.4 ", 10).unwrap(), 5);
        assert_eq!(parse_score("5.5", 10).unwrap(), 6);
    }

    #[test]
    fn repairs_fenced_and_labelled_replies() {
        assert_eq!(parse_score("```json\n8\n```", 10).unwrap(), 8);
        assert_eq!(parse_score("Score: 3", 10).unwrap(), 3);
    }

    #[test]
    fn clamps_out_of_range_values() {
        assert_eq!(parse_score("42", 10).unwrap(), 10);
        assert_eq!(parse_score("-3", 10).unwrap(), 0);
    }

    #[test]
    fn rejects_non_numeric_replies() {
        assert!(parse_score("excellent answer", 10).is_err());
        assert!(parse_score("", 10).is_err());
    }
}
