//! Machine-readable metadata: JSON-LD, Open Graph, named meta tags.

use scraper::{Html, Selector};
use serde_json::Value;
use std::collections::BTreeMap;

use super::price::json_price_to_cents;

/// Every JSON-LD object on the page, with arrays and `@graph` flattened.
pub fn json_ld_objects(document: &Html) -> Vec<Value> {
    let Ok(selector) = Selector::parse(r#"script[type="application/ld+json"]"#) else {
        return Vec::new();
    };

    let mut objects = Vec::new();
    for script in document.select(&selector) {
        let raw = script.text().collect::<String>();
        match serde_json::from_str::<Value>(raw.trim()) {
            Ok(value) => flatten_into(value, &mut objects),
            Err(e) => tracing::debug!(error = %e, "Skipping unparseable JSON-LD block"),
        }
    }
    objects
}

fn flatten_into(value: Value, out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => items.into_iter().for_each(|v| flatten_into(v, out)),
        Value::Object(mut map) => {
            if let Some(graph) = map.remove("@graph") {
                flatten_into(graph, out);
            }
            if !map.is_empty() {
                out.push(Value::Object(map));
            }
        }
        _ => {}
    }
}

/// Whether a JSON-LD object's `@type` names a product.
pub fn is_product(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(t)) => t.contains("Product"),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(|t| t.contains("Product")),
        _ => false,
    }
}

/// The product object if there is one, else the first object.
pub fn choose_json_ld(objects: &[Value]) -> Option<&Value> {
    objects.iter().find(|v| is_product(v)).or_else(|| objects.first())
}

/// `og:*` and `product:*` properties, first occurrence wins.
pub fn open_graph(document: &Html) -> BTreeMap<String, String> {
    let mut tags = BTreeMap::new();
    let Ok(selector) = Selector::parse("meta[property][content]") else {
        return tags;
    };
    for meta in document.select(&selector) {
        let (Some(property), Some(content)) =
            (meta.value().attr("property"), meta.value().attr("content"))
        else {
            continue;
        };
        let property = property.trim().to_lowercase();
        let content = content.trim();
        if content.is_empty() || !(property.starts_with("og:") || property.starts_with("product:")) {
            continue;
        }
        tags.entry(property).or_insert_with(|| content.to_string());
    }
    tags
}

/// Named `<meta>` tags (`description`, `keywords`, `twitter:*`, ...).
pub fn named_meta(document: &Html) -> BTreeMap<String, String> {
    let mut tags = BTreeMap::new();
    let Ok(selector) = Selector::parse("meta[name][content]") else {
        return tags;
    };
    for meta in document.select(&selector) {
        let (Some(name), Some(content)) = (meta.value().attr("name"), meta.value().attr("content"))
        else {
            continue;
        };
        let content = content.trim();
        if content.is_empty() {
            continue;
        }
        tags.entry(name.trim().to_lowercase())
            .or_insert_with(|| content.to_string());
    }
    tags
}

/// A string field, or `{ "name": ... }` for nested things like `brand`.
pub fn text_field(value: &Value, key: &str) -> Option<String> {
    let field = value.get(key)?;
    let text = match field {
        Value::String(s) => s.clone(),
        Value::Object(obj) => obj.get("name")?.as_str()?.to_string(),
        Value::Array(items) => items.iter().find_map(|item| match item {
            Value::String(s) => Some(s.clone()),
            Value::Object(obj) => obj.get("name").and_then(Value::as_str).map(String::from),
            _ => None,
        })?,
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Image URLs from a JSON-LD `image` field (string, list, or ImageObject).
pub fn json_ld_images(value: &Value) -> Vec<String> {
    fn collect(value: &Value, out: &mut Vec<String>) {
        match value {
            Value::String(s) => out.push(s.clone()),
            Value::Array(items) => items.iter().for_each(|v| collect(v, out)),
            Value::Object(obj) => {
                if let Some(url) = obj.get("url").or_else(|| obj.get("contentUrl")) {
                    collect(url, out);
                }
            }
            _ => {}
        }
    }

    let mut images = Vec::new();
    if let Some(image) = value.get("image") {
        collect(image, &mut images);
    }
    images
}

/// Price and currency from `offers` (object or list; `price`, `lowPrice`,
/// or a nested `priceSpecification`).
pub fn json_ld_offer(value: &Value) -> Option<(i64, Option<String>)> {
    let offers = value.get("offers")?;
    let candidates: Vec<&Value> = match offers {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    candidates.into_iter().find_map(|offer| {
        let spec = offer.get("priceSpecification");
        let price = offer
            .get("price")
            .or_else(|| offer.get("lowPrice"))
            .or_else(|| spec.and_then(|s| s.get("price")))?;
        let cents = json_price_to_cents(price)?;
        let currency = offer
            .get("priceCurrency")
            .or_else(|| spec.and_then(|s| s.get("priceCurrency")))
            .and_then(Value::as_str)
            .map(|c| c.trim().to_uppercase());
        Some((cents, currency))
    })
}
