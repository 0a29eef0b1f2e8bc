use serde::{Deserialize, Serialize};

/// One objective or theoretical question inside a test's JSONB snapshot.
///
/// `correct_answer` holds a single option token for MCQ, a comma-separated
/// set of option tokens for MSQ, and the reference answer for theoretical
/// questions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    #[serde(default)]
    pub id: i32,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub content: String,
    #[serde(default = "default_marks")]
    pub marks: i32,
    #[serde(default)]
    pub correct_answer: String,
    #[serde(default)]
    pub options: Vec<String>,
}

fn default_marks() -> i32 {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Mcq,
    Msq,
    Theoretical,
}
