//! Core trait abstractions for the extraction pipeline.
//!
//! These traits define the external collaborators the pipeline consumes.
//! The application injects concrete implementations; tests inject the
//! doubles in [`crate::testing`].

pub mod ai;
pub mod fetcher;
pub mod ocr;
pub mod renderer;
pub mod storage;
pub mod store;
