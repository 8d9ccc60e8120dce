//! AI trait for the generative extraction service.
//!
//! The pipeline only needs one capability from the service: send a prompt
//! (optionally search-grounded) and get text plus token usage back. Provider
//! specifics (request envelopes, auth, tool names) stay in the implementation.

use async_trait::async_trait;

use crate::error::AiError;

/// Sampling parameters for a generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_output_tokens: 8_192,
        }
    }
}

/// A generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    /// Model id, e.g. "gemini-2.0-flash"
    pub model: String,

    /// Fixed system instruction
    pub system_instruction: Option<String>,

    /// User prompt parts, sent in order
    pub parts: Vec<String>,

    pub config: GenerationConfig,

    /// Ask the service to ground the answer in live search results
    pub grounding: bool,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_instruction: None,
            parts: Vec::new(),
            config: GenerationConfig::default(),
            grounding: false,
        }
    }

    pub fn system(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn part(mut self, part: impl Into<String>) -> Self {
        self.parts.push(part.into());
        self
    }

    pub fn config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }

    pub fn grounded(mut self, grounding: bool) -> Self {
        self.grounding = grounding;
        self
    }

    /// Total prompt length in chars (system + parts).
    pub fn prompt_len(&self) -> usize {
        self.system_instruction
            .as_deref()
            .map(|s| s.chars().count())
            .unwrap_or(0)
            + self.parts.iter().map(|p| p.chars().count()).sum::<usize>()
    }
}

/// Token usage reported by the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// A generation response.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateResponse {
    /// Concatenated text of the first candidate
    pub text: String,

    /// Absent when the service omits usage metadata
    pub usage: Option<TokenUsage>,
}

impl GenerateResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            usage: None,
        }
    }

    pub fn with_usage(mut self, prompt_tokens: u64, completion_tokens: u64) -> Self {
        self.usage = Some(TokenUsage {
            prompt_tokens,
            completion_tokens,
        });
        self
    }
}

/// Generative AI service.
#[async_trait]
pub trait AI: Send + Sync {
    /// Run one generation call.
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, AiError>;

    /// Whether `grounding: true` is honoured. Requests to services that
    /// don't support it are sent ungrounded.
    fn supports_grounding(&self) -> bool {
        true
    }
}
