pub mod attempt;
pub mod coding_question;
pub mod question;
pub mod submission;
