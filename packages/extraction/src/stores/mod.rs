//! Job store implementations shipped with the library.
//!
//! - `MemoryJobStore` - in-process store for tests and local runs
//!
//! The Postgres-backed store lives with the application, next to its
//! migrations.

pub mod memory;

pub use memory::MemoryJobStore;
