//! Extraction orchestrator.
//!
//! Builds one prompt from the parsed PDF, the vendor scrapes and the
//! caller's instructions, picks a model tier, makes one AI call and turns
//! the answer into validated [`ExtractedProduct`]s with a cost figure.
//!
//! A transport-level AI failure is the only error returned from
//! [`ExtractionOrchestrator::extract`]; anything wrong with the response
//! itself is reported in [`ExtractionOutcome::errors`].

pub mod prompts;
pub mod response;
pub mod tier;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::traits::ai::{GenerateRequest, GenerateResponse, GenerationConfig, AI};
use crate::types::config::{ExtractionConfig, ModelTier};
use crate::types::job::JobOptions;
use crate::types::page::PageExtraction;
use crate::types::product::ExtractedProduct;
use crate::types::scrape::ScrapeResult;

pub use response::{normalize_price, parse_extraction_response, strip_code_fences};
pub use tier::select_tier;

/// Everything the orchestrator reads for one extraction.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionRequest<'a> {
    pub instructions: &'a str,
    pub options: &'a JobOptions,
    pub pages: Option<&'a PageExtraction>,
    pub scrapes: &'a [ScrapeResult],
}

impl<'a> ExtractionRequest<'a> {
    pub fn new(instructions: &'a str, options: &'a JobOptions) -> Self {
        Self {
            instructions,
            options,
            pages: None,
            scrapes: &[],
        }
    }

    pub fn with_pages(mut self, pages: Option<&'a PageExtraction>) -> Self {
        self.pages = pages;
        self
    }

    pub fn with_scrapes(mut self, scrapes: &'a [ScrapeResult]) -> Self {
        self.scrapes = scrapes;
        self
    }

    /// Chars of source material (instructions, page text, vendor text).
    pub fn content_len(&self) -> usize {
        let pages = self.pages.map(PageExtraction::total_chars).unwrap_or(0);
        let vendor: usize = self
            .scrapes
            .iter()
            .filter(|s| !s.is_failed())
            .map(|s| {
                s.raw_text.chars().count()
                    + s.description.as_deref().map(|d| d.chars().count()).unwrap_or(0)
            })
            .sum();
        self.instructions.chars().count() + pages + vendor
    }

    /// Rough product count: pages read plus vendor pages scraped, at least 1.
    pub fn estimated_products(&self) -> usize {
        let pages = self.pages.map(|p| p.pages_processed.len()).unwrap_or(0);
        let vendors = self.scrapes.iter().filter(|s| !s.is_failed()).count();
        (pages + vendors).max(1)
    }
}

/// Result of one extraction call.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOutcome {
    pub products: Vec<ExtractedProduct>,
    pub errors: Vec<String>,
    pub suggestions: Vec<String>,
    pub model_tier: ModelTier,
    pub model_used: String,
    pub execution_time_ms: u64,
    /// USD
    pub cost: f64,
}

/// A value returned by an auxiliary call, with what it cost.
#[derive(Debug, Clone, PartialEq)]
pub struct Priced<T> {
    pub value: T,
    pub cost: f64,
    pub model_used: String,
}

/// Data returned by a grounded enrichment call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    #[serde(default)]
    pub specifications: BTreeMap<String, String>,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub price_cents: Option<i64>,
    #[serde(default)]
    pub sources: Vec<String>,
}

/// One problem found by a validation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub field: String,
    pub problem: String,
    #[serde(default)]
    pub suggestion: Option<String>,
}

/// Outcome of a validation call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Validation {
    #[serde(default = "default_valid")]
    pub valid: bool,
    #[serde(default)]
    pub issues: Vec<ValidationIssue>,
}

fn default_valid() -> bool {
    true
}

/// Prompt building, tier selection, the AI call and response handling.
pub struct ExtractionOrchestrator {
    ai: Arc<dyn AI>,
    config: ExtractionConfig,
}

impl ExtractionOrchestrator {
    pub fn new(ai: Arc<dyn AI>, config: ExtractionConfig) -> Self {
        Self { ai, config }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    fn request(&self, tier: ModelTier, grounding: bool) -> GenerateRequest {
        GenerateRequest::new(self.config.tier(tier).model.clone())
            .config(GenerationConfig {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_output_tokens,
            })
            .grounded(grounding && self.ai.supports_grounding())
    }

    fn cost_of(&self, tier: ModelTier, response: &GenerateResponse) -> f64 {
        response
            .usage
            .map(|u| self.config.tier(tier).cost(u.prompt_tokens, u.completion_tokens))
            .unwrap_or(0.0)
    }

    /// Run one extraction.
    pub async fn extract(&self, request: ExtractionRequest<'_>) -> Result<ExtractionOutcome> {
        let started = Instant::now();

        let content_len = request.content_len();
        let product_estimate = request.estimated_products();
        let tier = select_tier(content_len, product_estimate, &self.config);
        let model = self.config.tier(tier).model.clone();

        let user_prompt = prompts::build_user_prompt(
            request.instructions,
            request.options,
            request.pages,
            request.scrapes,
            &self.config,
        );

        info!(
            tier = %tier,
            model = %model,
            content_len,
            product_estimate,
            prompt_chars = user_prompt.len(),
            "Calling AI for extraction"
        );

        let generate = self
            .request(tier, self.config.grounding)
            .system(prompts::SYSTEM_INSTRUCTION)
            .part(user_prompt);
        let response = self.ai.generate(generate).await?;

        let cost = self.cost_of(tier, &response);
        if response.usage.is_none() {
            debug!(model = %model, "AI response had no usage metadata, cost recorded as 0");
        }

        let target_category = request.options.target_category.as_deref();
        let parsed = parse_extraction_response(&response.text, target_category);
        for error in &parsed.errors {
            warn!(error = %error, "AI response problem");
        }

        let mut suggestions = parsed.suggestions;
        for product in &parsed.products {
            if product.is_low_confidence(self.config.low_confidence_threshold) {
                suggestions.push(format!(
                    "Review \"{}\": confidence {:.2} is below {:.2}",
                    product.name, product.confidence, self.config.low_confidence_threshold
                ));
            }
        }

        let execution_time_ms = started.elapsed().as_millis() as u64;
        info!(
            products = parsed.products.len(),
            errors = parsed.errors.len(),
            cost,
            execution_time_ms,
            "Extraction finished"
        );

        Ok(ExtractionOutcome {
            products: parsed.products,
            errors: parsed.errors,
            suggestions,
            model_tier: tier,
            model_used: model,
            execution_time_ms,
            cost,
        })
    }

    /// Write a fresh long-form description for one product.
    pub async fn generate_description(&self, product: &ExtractedProduct) -> Result<Priced<String>> {
        let tier = ModelTier::Fast;
        let request = self
            .request(tier, false)
            .part(prompts::description_prompt(product));
        let response = self.ai.generate(request).await?;

        let description = strip_code_fences(&response.text).trim().to_string();
        if description.is_empty() {
            return Err(PipelineError::MalformedResponse(
                "empty description".to_string(),
            ));
        }

        Ok(Priced {
            value: description,
            cost: self.cost_of(tier, &response),
            model_used: self.config.tier(tier).model.clone(),
        })
    }

    /// Look up missing specifications with a search-grounded call.
    pub async fn enrich(&self, product: &ExtractedProduct) -> Result<Priced<Enrichment>> {
        let tier = ModelTier::Fast;
        let request = self
            .request(tier, true)
            .part(prompts::enrichment_prompt(product));
        let response = self.ai.generate(request).await?;

        let value = response::parse_json_lenient(&response.text, "specifications").ok_or_else(|| {
            PipelineError::MalformedResponse("enrichment response is not JSON".to_string())
        })?;
        let enrichment = Enrichment {
            specifications: match value.get("specifications") {
                Some(Value::Object(map)) => map
                    .iter()
                    .filter_map(|(k, v)| {
                        let v = match v {
                            Value::String(s) => s.clone(),
                            Value::Null => return None,
                            other => other.to_string(),
                        };
                        Some((k.clone(), v))
                    })
                    .collect(),
                _ => BTreeMap::new(),
            },
            highlights: string_array(&value, "highlights"),
            price_cents: value
                .get("price_cents")
                .filter(|v| !v.is_null())
                .map(|_| normalize_price(&value)),
            sources: string_array(&value, "sources"),
        };

        Ok(Priced {
            value: enrichment,
            cost: self.cost_of(tier, &response),
            model_used: self.config.tier(tier).model.clone(),
        })
    }

    /// Ask for corrections to one product record.
    pub async fn validate(&self, product: &ExtractedProduct) -> Result<Priced<Validation>> {
        let tier = ModelTier::Fast;
        let request = self
            .request(tier, false)
            .part(prompts::validation_prompt(product));
        let response = self.ai.generate(request).await?;

        let value = response::parse_json_lenient(&response.text, "issues").ok_or_else(|| {
            PipelineError::MalformedResponse("validation response is not JSON".to_string())
        })?;
        let validation = read_validation(&value).ok_or_else(|| {
            PipelineError::MalformedResponse("validation response is not an object".to_string())
        })?;

        Ok(Priced {
            value: validation,
            cost: self.cost_of(tier, &response),
            model_used: self.config.tier(tier).model.clone(),
        })
    }
}

/// Map a loosely-shaped validation answer. Issues without a `problem` are
/// dropped; a missing `field` is empty. `valid` may be a bool or a
/// "true"/"false" string and otherwise follows whether any issue was kept.
fn read_validation(value: &Value) -> Option<Validation> {
    let object = value.as_object()?;

    let issues: Vec<ValidationIssue> = match object.get("issues") {
        Some(Value::Array(items)) => items.iter().filter_map(read_issue).collect(),
        _ => Vec::new(),
    };

    let valid = match object.get("valid") {
        Some(Value::Bool(valid)) => Some(*valid),
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
    .unwrap_or(issues.is_empty());

    Some(Validation { valid, issues })
}

fn read_issue(item: &Value) -> Option<ValidationIssue> {
    let text = |key: &str| {
        item.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    };
    match item {
        Value::Object(_) => Some(ValidationIssue {
            field: text("field").unwrap_or_default(),
            problem: text("problem")?,
            suggestion: text("suggestion"),
        }),
        Value::String(problem) if !problem.trim().is_empty() => Some(ValidationIssue {
            field: String::new(),
            problem: problem.trim().to_string(),
            suggestion: None,
        }),
        _ => None,
    }
}

fn string_array(value: &Value, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}
