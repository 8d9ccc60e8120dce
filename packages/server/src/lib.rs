// Catalog Extraction - API Core
//
// HTTP surface, worker and production adapters around the
// `catalog_extraction` pipeline. Jobs are persisted in Postgres and drained
// one at a time by the trigger endpoint or the polling worker.

pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
