pub mod access;
pub mod awards;
pub mod cycle;
pub mod eligibility;
pub mod form_schema;
pub mod models;
pub mod scoring;
pub mod workflow;
