// AI implementation using Gemini
//
// Infrastructure adapter only. What to prompt for lives in the extraction
// library's orchestrator.

use async_trait::async_trait;
use catalog_extraction::{AiError, GenerateRequest, GenerateResponse, AI};
use gemini_client::{GeminiClient, GeminiError, GenerateContentRequest};

/// Gemini-backed implementation of the pipeline's AI service.
#[derive(Clone)]
pub struct GeminiAI {
    client: GeminiClient,
}

impl GeminiAI {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }

    pub fn from_api_key(api_key: impl Into<String>) -> Self {
        Self::new(GeminiClient::new(api_key))
    }
}

/// Map a pipeline request onto the Gemini wire request.
pub fn to_gemini_request(request: GenerateRequest) -> GenerateContentRequest {
    let mut out = GenerateContentRequest::new(request.model)
        .user(request.parts)
        .generation(request.config.temperature, request.config.max_output_tokens);
    if let Some(system) = request.system_instruction {
        out = out.system(system);
    }
    if request.grounding {
        out = out.with_google_search();
    }
    out
}

fn to_ai_error(e: GeminiError) -> AiError {
    match e {
        GeminiError::Network(message) => AiError::Network(message),
        GeminiError::Parse(message) => AiError::Decode(message),
        other => AiError::Api(other.to_string()),
    }
}

#[async_trait]
impl AI for GeminiAI {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, AiError> {
        let response = self
            .client
            .generate_content(to_gemini_request(request))
            .await
            .map_err(to_ai_error)?;

        let text = response.text().unwrap_or_default();
        Ok(match response.usage_metadata {
            Some(usage) => GenerateResponse::new(text)
                .with_usage(usage.prompt_token_count, usage.candidates_token_count),
            None => GenerateResponse::new(text),
        })
    }
}
