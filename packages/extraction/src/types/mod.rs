//! Data types for the catalog extraction pipeline.

pub mod config;
pub mod job;
pub mod page;
pub mod product;
pub mod scrape;
