pub mod attempt_dto;
pub mod submission_dto;
