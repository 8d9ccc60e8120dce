//! Kernel module - server infrastructure and dependencies.
//!
//! Concrete adapters for the extraction library's service traits.

pub mod deps;
pub mod gemini_ai;
pub mod object_storage;
pub mod vision_ocr;

pub use deps::{build_processor, pipeline_config};
pub use gemini_ai::GeminiAI;
pub use object_storage::SupabaseStorage;
pub use vision_ocr::VisionOcr;
