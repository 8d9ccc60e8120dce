//! Tolerant parsing of the AI response and normalization into
//! [`ExtractedProduct`].
//!
//! The response is handled as untyped JSON here and nowhere else. Every
//! product goes through [`normalize_product`] before it leaves this module.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::types::product::{ExtractedProduct, Variant};

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*\s*\n?(.*?)\n?\s*```\s*$")
        .expect("code fence regex is valid")
});

/// Confidence assumed when the response omits it.
pub const DEFAULT_CONFIDENCE: f64 = 0.8;

/// Ceiling on confidence for a product whose name had to be synthesized.
pub const UNNAMED_CONFIDENCE_CAP: f64 = 0.5;

/// Bare `price` values above this are taken to be cents already.
pub const BARE_PRICE_CENTS_THRESHOLD: f64 = 1000.0;

/// Candidate spans tried when salvaging a `{...}` block.
const MAX_SALVAGE_ATTEMPTS: usize = 256;

/// Products and side channels parsed from one response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedResponse {
    pub products: Vec<ExtractedProduct>,
    pub suggestions: Vec<String>,
    pub errors: Vec<String>,
}

/// Remove a surrounding markdown code fence, if any.
pub fn strip_code_fences(text: &str) -> &str {
    match CODE_FENCE.captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => text.trim(),
    }
}

/// Parse JSON, falling back to the largest `{...}` span that contains
/// `key` (e.g. `"products"`) and parses.
pub fn parse_json_lenient(text: &str, key: &str) -> Option<Value> {
    let body = strip_code_fences(text);
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        return Some(value);
    }

    let quoted = format!("\"{}\"", key);
    let key_at = body.find(&quoted)?;
    let starts: Vec<usize> = body[..key_at].match_indices('{').map(|(i, _)| i).collect();
    let ends: Vec<usize> = body[key_at..]
        .match_indices('}')
        .map(|(i, _)| key_at + i)
        .rev()
        .collect();

    let mut attempts = 0;
    for &start in &starts {
        for &end in &ends {
            attempts += 1;
            if attempts > MAX_SALVAGE_ATTEMPTS {
                return None;
            }
            if let Ok(value) = serde_json::from_str::<Value>(&body[start..=end]) {
                if value.get(key).is_some() {
                    return Some(value);
                }
            }
        }
    }
    None
}

/// Parse an extraction response. Never fails: unusable input yields no
/// products and a descriptive error.
pub fn parse_extraction_response(
    text: &str,
    target_category: Option<&str>,
) -> ParsedResponse {
    let mut parsed = ParsedResponse::default();

    let Some(value) = parse_json_lenient(text, "products") else {
        let preview: String = text.trim().chars().take(120).collect();
        parsed.errors.push(format!(
            "Could not parse AI response as JSON (starts with: {:?})",
            preview
        ));
        return parsed;
    };

    let items = match &value {
        Value::Object(map) => match map.get("products") {
            Some(Value::Array(items)) => items.clone(),
            Some(Value::Object(single)) => vec![Value::Object(single.clone())],
            Some(_) | None => {
                parsed
                    .errors
                    .push("AI response has no \"products\" array".to_string());
                Vec::new()
            }
        },
        // A bare array of products
        Value::Array(items) => items.clone(),
        _ => {
            parsed
                .errors
                .push("AI response is not a JSON object".to_string());
            Vec::new()
        }
    };

    for (index, item) in items.iter().enumerate() {
        if !item.is_object() {
            parsed
                .errors
                .push(format!("Skipped product #{}: not an object", index + 1));
            continue;
        }
        parsed
            .products
            .push(normalize_product(item, index, target_category));
    }

    if let Some(Value::Array(suggestions)) = value.get("suggestions") {
        parsed.suggestions.extend(
            suggestions
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from),
        );
    }

    parsed
}

/// Numbers, or strings holding a number ("1,295.00", "$630").
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    }
    .filter(|n| n.is_finite())
}

/// Price in cents from an object with `price_cents` and/or `price`.
///
/// `price_cents` is used as is. A bare `price` above 1000 is assumed to be
/// cents already, otherwise dollars. This misreads large dollar amounts and
/// small cent amounts; it is kept for compatibility with existing records.
/// A `price` string carrying a currency symbol ("$1,295") is always dollars.
/// Negative prices become 0.
pub fn normalize_price(object: &Value) -> i64 {
    if let Some(cents) = object.get("price_cents").and_then(coerce_number) {
        return (cents.round() as i64).max(0);
    }
    let Some(raw) = object.get("price") else {
        return 0;
    };
    let cents = match coerce_number(raw) {
        Some(price) if has_currency_symbol(raw) => (price * 100.0).round() as i64,
        Some(price) if price > BARE_PRICE_CENTS_THRESHOLD => price.round() as i64,
        Some(price) => (price * 100.0).round() as i64,
        None => 0,
    };
    cents.max(0)
}

fn has_currency_symbol(value: &Value) -> bool {
    value
        .as_str()
        .is_some_and(|s| s.chars().any(|c| matches!(c, '$' | '€' | '£' | '¥')))
}

fn string_field(object: &Value, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn string_list(object: &Value, key: &str) -> Vec<String> {
    match object.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Object(obj) => obj.get("url").and_then(Value::as_str).map(String::from),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

fn normalize_variant(value: &Value, index: usize) -> Option<Variant> {
    match value {
        Value::Object(_) => Some(Variant {
            name: string_field(value, "name").unwrap_or_else(|| format!("Variant {}", index + 1)),
            material: string_field(value, "material"),
            price_cents: normalize_price(value),
            image_url: string_field(value, "image_url").or_else(|| string_field(value, "image")),
            notes: string_field(value, "notes"),
        }),
        Value::String(name) if !name.trim().is_empty() => Some(Variant::new(name.trim(), 0)),
        _ => None,
    }
}

/// Map one loosely-shaped product object into an [`ExtractedProduct`].
pub fn normalize_product(
    value: &Value,
    index: usize,
    target_category: Option<&str>,
) -> ExtractedProduct {
    let mut confidence = value
        .get("confidence")
        .and_then(coerce_number)
        .map(|c| c.clamp(0.0, 1.0))
        .unwrap_or(DEFAULT_CONFIDENCE);

    let name = match string_field(value, "name") {
        Some(name) => name,
        None => {
            confidence = confidence.min(UNNAMED_CONFIDENCE_CAP);
            format!("Unnamed product {}", index + 1)
        }
    };

    let category = target_category
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(String::from)
        .or_else(|| string_field(value, "category"))
        .unwrap_or_default();

    let variants = match value.get("variants") {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .filter_map(|(i, v)| normalize_variant(v, i))
            .collect(),
        _ => Vec::new(),
    };

    ExtractedProduct {
        name,
        description: string_field(value, "description").unwrap_or_default(),
        price_cents: normalize_price(value),
        category,
        variants,
        highlights: string_list(value, "highlights"),
        images: string_list(value, "images"),
        confidence,
        sources: string_list(value, "sources"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const RESPONSE: &str = r#"{"products":[{"name":"Aria Door","price":630,"confidence":0.9,
        "variants":[{"name":"36 in","price_cents":69900},{"name":"48 in"}],
        "highlights":["3/8 in glass"],"images":["https://cdn.example/a.jpg"],"sources":["page:45"]}],
        "suggestions":["Confirm hardware finish"]}"#;

    #[test]
    fn test_price_normalization() {
        assert_eq!(normalize_price(&json!({"price": 630})), 63_000);
        assert_eq!(normalize_price(&json!({"price_cents": 63_000})), 63_000);
        assert_eq!(normalize_price(&json!({"name": "x"})), 0);
        assert_eq!(normalize_price(&json!({"price": 1500})), 1_500);
        assert_eq!(normalize_price(&json!({"price": 19.99})), 1_999);
        assert_eq!(normalize_price(&json!({"price": "1,295"})), 1_295);
        assert_eq!(
            normalize_price(&json!({"price_cents": 100, "price": 5})),
            100
        );
    }

    #[test]
    fn test_symbol_marked_price_is_dollars() {
        assert_eq!(normalize_price(&json!({"price": "$1,295"})), 129_500);
        assert_eq!(normalize_price(&json!({"price": "£2400"})), 240_000);
        assert_eq!(normalize_price(&json!({"price": "$12.50"})), 1_250);
    }

    #[test]
    fn test_negative_price_clamps_to_zero() {
        assert_eq!(normalize_price(&json!({"price": -5})), 0);
        assert_eq!(normalize_price(&json!({"price": "-$20"})), 0);
        assert_eq!(normalize_price(&json!({"price_cents": -100})), 0);
    }

    #[test]
    fn test_fenced_response_parses_identically() {
        let fenced = format!("```json\n{}\n```", RESPONSE);
        let plain = parse_extraction_response(RESPONSE, None);
        let wrapped = parse_extraction_response(&fenced, None);
        assert_eq!(plain, wrapped);
        assert_eq!(plain.products.len(), 1);

        let bare_fence = format!("```\n{}\n```", RESPONSE);
        assert_eq!(parse_extraction_response(&bare_fence, None), plain);
    }

    #[test]
    fn test_normalized_product() {
        let parsed = parse_extraction_response(RESPONSE, None);
        let product = &parsed.products[0];
        assert_eq!(product.name, "Aria Door");
        assert_eq!(product.price_cents, 63_000);
        assert_eq!(product.variants.len(), 2);
        assert_eq!(product.variants[0].price_cents, 69_900);
        assert_eq!(product.variants[1].price_cents, 0);
        assert_eq!(product.description, "");
        assert_eq!(product.sources, vec!["page:45"]);
        assert_eq!(parsed.suggestions, vec!["Confirm hardware finish"]);
        assert!(parsed.errors.is_empty());
    }

    #[test]
    fn test_missing_fields_default() {
        let product = normalize_product(&json!({}), 2, None);
        assert_eq!(product.name, "Unnamed product 3");
        assert_eq!(product.confidence, 0.5);
        assert_eq!(product.price_cents, 0);
        assert!(product.variants.is_empty());
        assert!(product.highlights.is_empty());
        assert!(product.images.is_empty());
        assert!(product.sources.is_empty());

        let named = normalize_product(&json!({"name": "Door"}), 0, None);
        assert_eq!(named.confidence, DEFAULT_CONFIDENCE);

        let unsure = normalize_product(&json!({"confidence": 0.3}), 0, None);
        assert_eq!(unsure.confidence, 0.3);
    }

    #[test]
    fn test_target_category_pins() {
        let product = normalize_product(
            &json!({"name": "Door", "category": "mirrors"}),
            0,
            Some("shower-doors"),
        );
        assert_eq!(product.category, "shower-doors");
    }

    #[test]
    fn test_salvages_embedded_object() {
        let text = r#"Sure! Here is the data: {"products":[{"name":"Door","price_cents":100}]} Let me know {if} you need more."#;
        let parsed = parse_extraction_response(text, None);
        assert_eq!(parsed.products.len(), 1);
        assert_eq!(parsed.products[0].price_cents, 100);
        assert!(parsed.errors.is_empty());
    }

    #[test]
    fn test_garbage_yields_error_not_panic() {
        let parsed = parse_extraction_response("I could not find any products.", None);
        assert!(parsed.products.is_empty());
        assert_eq!(parsed.errors.len(), 1);

        let parsed = parse_extraction_response(r#"{"items": []}"#, None);
        assert!(parsed.products.is_empty());
        assert_eq!(parsed.errors.len(), 1);
    }
}
