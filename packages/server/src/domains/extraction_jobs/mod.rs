//! Extraction jobs domain: persistence of the job lifecycle.

pub mod models;
pub mod store;

pub use models::ExtractionJobRow;
pub use store::{count_by_status, PostgresJobStore};
