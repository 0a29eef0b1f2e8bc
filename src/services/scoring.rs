use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::question::{Question, QuestionType};
use crate::services::theoretical_eval::TheoreticalScore;
use crate::utils::normalize::answers_match;

/// One per-question grading record, persisted on the attempt as
/// `question_wise_marks_obtained`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub question_id: i32,
    pub question_type: QuestionType,
    pub marks_obtained: i32,
    pub max_marks: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
    /// Present when AI grading degraded; the question scored 0 but the rest
    /// of the attempt still counts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation_error: Option<String>,
}

/// Exact-match grading for MCQ/MSQ: full marks on a normalized match,
/// otherwise 0. Unanswered questions score 0.
pub fn grade_objective(question: &Question, candidate_answer: Option<&str>) -> QuestionOutcome {
    let correct = candidate_answer
        .map(|given| answers_match(given, &question.correct_answer))
        .unwrap_or(false);

    QuestionOutcome {
        question_id: question.id,
        question_type: question.question_type,
        marks_obtained: if correct { question.marks } else { 0 },
        max_marks: question.marks,
        is_correct: Some(correct),
        evaluation_error: None,
    }
}

/// Maps a theoretical evaluator result onto an outcome record, preserving
/// the question's original marks as the maximum even when grading degraded.
pub fn theoretical_outcome(question: &Question, score: &TheoreticalScore) -> QuestionOutcome {
    QuestionOutcome {
        question_id: question.id,
        question_type: question.question_type,
        marks_obtained: score.marks_awarded,
        max_marks: question.marks,
        is_correct: None,
        evaluation_error: score.error.clone(),
    }
}

/// Total mark: objective + theoretical marks awarded plus the coding
/// aggregate from the submission ledger.
pub fn compose_total(outcomes: &[QuestionOutcome], coding_total: Decimal) -> Decimal {
    let question_total: i64 = outcomes.iter().map(|o| i64::from(o.marks_obtained)).sum();
    Decimal::from(question_total) + coding_total
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mcq(id: i32, marks: i32, correct_answer: &str) -> Question {
        Question {
            id,
            question_type: QuestionType::Mcq,
            content: "pick one".to_string(),
            marks,
            correct_answer: correct_answer.to_string(),
            options: vec!["1".into(), "2".into(), "3".into(), "4".into()],
        }
    }

    #[test]
    fn full_marks_on_match_zero_otherwise() {
        let q = mcq(1, 10, "2,1");
        assert_eq!(grade_objective(&q, Some(" 1 , 2 ")).marks_obtained, 10);
        assert_eq!(grade_objective(&q, Some("1,3")).marks_obtained, 0);
        assert_eq!(grade_objective(&q, None).marks_obtained, 0);
    }

    #[test]
    fn compose_adds_coding_aggregate() {
        let outcomes = vec![
            grade_objective(&mcq(1, 10, "a"), Some("a")),
            grade_objective(&mcq(2, 5, "b"), Some("c")),
        ];
        let total = compose_total(&outcomes, Decimal::new(155, 1)); // 15.5
        assert_eq!(total, "25.5".parse().unwrap());
    }
}
