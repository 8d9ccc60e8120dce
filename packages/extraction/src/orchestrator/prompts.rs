//! Prompt assembly for catalog extraction.
//!
//! Order is fixed: system instruction, then the caller's instructions (with
//! option directives), then one block per PDF page, then one block per
//! scraped vendor page.

use std::fmt::Write;

use crate::types::config::ExtractionConfig;
use crate::types::job::JobOptions;
use crate::types::page::PageExtraction;
use crate::types::product::ExtractedProduct;
use crate::types::scrape::ScrapeResult;

/// Fixed extraction rules, output schema and vocabulary.
pub const SYSTEM_INSTRUCTION: &str = r#"You are a product data specialist who turns manufacturer catalogs and vendor web pages into clean, structured product records for a building-products retailer.

Rules:
1. Only extract products that are actually present in the supplied material or that the user explicitly names. Never invent specifications, dimensions or prices.
2. Prices are integers in cents (USD unless stated). "$1,295.00" is 129500. If no price is given, use 0.
3. One record per distinct product. Sizes, finishes, glass types and hardware options of the same product are variants, not separate products.
4. Cite where each fact came from in "sources": "page:<n>" for catalog pages, "url:<host/path>" for web pages, "search" for grounded search results.
5. Set "confidence" between 0 and 1. Use less than 0.8 whenever a field was inferred rather than read.
6. Keep "highlights" to short selling points (under 12 words each).

Vocabulary: frameless, semi-frameless, framed, sliding/bypass, pivot, hinged, neo-angle, inline panel, return panel, header, clamp, channel, tempered glass, low-iron glass, glass thickness (e.g. 3/8"), finish (chrome, brushed nickel, matte black, oil-rubbed bronze), rough opening, out-of-plumb adjustment.

Respond with JSON only, no prose, in exactly this shape:
{
  "products": [
    {
      "name": "string",
      "description": "string",
      "price_cents": 0,
      "category": "string",
      "variants": [
        {"name": "string", "material": "string or null", "price_cents": 0, "image_url": "string or null", "notes": "string or null"}
      ],
      "highlights": ["string"],
      "images": ["absolute image URL"],
      "confidence": 0.0,
      "sources": ["page:12"]
    }
  ],
  "suggestions": ["anything the user should double-check"]
}"#;

/// Default request when the caller gave no instructions.
const DEFAULT_INSTRUCTIONS: &str = "Extract every product in the material below.";

fn truncate_chars(text: &str, cap: usize) -> (&str, bool) {
    match text.char_indices().nth(cap) {
        Some((idx, _)) => (&text[..idx], true),
        None => (text, false),
    }
}

fn format_price(cents: i64) -> String {
    format!("${}.{:02}", cents / 100, (cents % 100).abs())
}

/// The user section of the extraction prompt.
pub fn build_user_prompt(
    instructions: &str,
    options: &JobOptions,
    pages: Option<&PageExtraction>,
    scrapes: &[ScrapeResult],
    config: &ExtractionConfig,
) -> String {
    let mut prompt = String::new();

    prompt.push_str("## Instructions\n");
    let instructions = instructions.trim();
    prompt.push_str(if instructions.is_empty() {
        DEFAULT_INSTRUCTIONS
    } else {
        instructions
    });
    prompt.push('\n');

    if let Some(category) = options
        .target_category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
    {
        let _ = writeln!(
            prompt,
            "\nSet \"category\" to \"{}\" for every product.",
            category
        );
    }
    if options.generate_descriptions {
        prompt.push_str(
            "\nWrite a long-form marketing description (2-3 paragraphs) for each product, grounded in the supplied specifications.\n",
        );
    }

    if let Some(pages) = pages.filter(|p| !p.pages.is_empty()) {
        prompt.push_str("\n## Catalog pages\n");
        for (page, text) in &pages.pages {
            let (text, truncated) = truncate_chars(text.trim(), config.page_text_cap);
            let source = if pages.ocr_results.iter().any(|r| r.page == *page) {
                " (OCR)"
            } else {
                ""
            };
            let _ = writeln!(prompt, "\n### Page {}{}\n{}", page, source, text);
            if truncated {
                prompt.push_str("[page text truncated]\n");
            }
        }
    }

    let vendors: Vec<&ScrapeResult> = scrapes.iter().filter(|s| !s.is_failed()).collect();
    if !vendors.is_empty() {
        prompt.push_str("\n## Vendor pages\n");
        for scrape in vendors {
            let _ = writeln!(prompt, "\n### {}", scrape.url);
            if let Some(name) = &scrape.name {
                let _ = writeln!(prompt, "Name: {}", name);
            }
            if let Some(description) = &scrape.description {
                let _ = writeln!(prompt, "Description: {}", description);
            }
            if let Some(cents) = scrape.price_cents {
                let currency = scrape.currency.as_deref().unwrap_or("USD");
                let _ = writeln!(prompt, "Price: {} {} ({} cents)", format_price(cents), currency, cents);
            }
            if !scrape.images.is_empty() {
                prompt.push_str("Images:\n");
                for image in &scrape.images {
                    let _ = writeln!(prompt, "- {}", image);
                }
            }
            if !scrape.raw_text.is_empty() {
                let (text, _) = truncate_chars(&scrape.raw_text, config.vendor_text_cap);
                let _ = writeln!(prompt, "Page text:\n{}", text);
            }
        }
    }

    prompt
}

/// Prompt for regenerating one product's description.
pub fn description_prompt(product: &ExtractedProduct) -> String {
    format!(
        "Write a long-form marketing description (2-3 paragraphs) for this product. Use only the facts given; do not invent specifications.\n\nProduct JSON:\n{}\n\nRespond with the description text only.",
        product_json(product)
    )
}

/// Prompt for a search-grounded enrichment pass.
pub fn enrichment_prompt(product: &ExtractedProduct) -> String {
    format!(
        r#"Search for the manufacturer's published specifications for this product and fill in what is missing.

Product JSON:
{}

Respond with JSON only:
{{
  "specifications": {{"spec name": "value"}},
  "highlights": ["string"],
  "price_cents": 0,
  "sources": ["url"]
}}
Use null for "price_cents" if no list price is published."#,
        product_json(product)
    )
}

/// Prompt for checking one product record for errors.
pub fn validation_prompt(product: &ExtractedProduct) -> String {
    format!(
        r#"Check this product record for mistakes: implausible prices (remember prices are in cents), missing or contradictory specifications, variants that are really separate products, and a vague name.

Product JSON:
{}

Respond with JSON only:
{{
  "valid": true,
  "issues": [{{"field": "price_cents", "problem": "string", "suggestion": "string or null"}}]
}}"#,
        product_json(product)
    )
}

fn product_json(product: &ExtractedProduct) -> String {
    serde_json::to_string_pretty(product).unwrap_or_else(|_| product.name.clone())
}
