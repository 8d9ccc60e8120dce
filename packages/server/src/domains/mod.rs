// Business domains
pub mod extraction_jobs;
