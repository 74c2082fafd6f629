pub mod models;
pub mod questionnaire;
pub mod scoring;
