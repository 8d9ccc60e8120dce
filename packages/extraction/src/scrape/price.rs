//! Price detection and conversion to minor units.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Amount with an optional currency symbol before it ("$1,234.56", "€ 99").
static SYMBOL_PRICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<sym>[$€£¥])\s?(?P<num>\d{1,3}(?:,\d{3})+(?:\.\d{1,2})?|\d+(?:\.\d{1,2})?)")
        .expect("symbol price regex is valid")
});

/// Amount followed by an ISO currency code ("1234.56 USD").
static CODE_PRICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?P<num>\d{1,3}(?:,\d{3})+(?:\.\d{1,2})?|\d+(?:\.\d{1,2})?)\s?(?P<code>USD|CAD|EUR|GBP|AUD)\b")
        .expect("code price regex is valid")
});

/// Bare number, used only where the context already says "price".
static BARE_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<num>\d{1,3}(?:,\d{3})+(?:\.\d{1,2})?|\d+(?:\.\d{1,2})?)")
        .expect("bare amount regex is valid")
});

/// A price found in text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceMatch {
    pub cents: i64,
    pub currency: Option<String>,
}

fn symbol_currency(symbol: &str) -> &'static str {
    match symbol {
        "€" => "EUR",
        "£" => "GBP",
        "¥" => "JPY",
        _ => "USD",
    }
}

/// Convert a decimal amount string ("1,234.56") to minor units.
pub fn amount_to_cents(amount: &str) -> Option<i64> {
    let cleaned: String = amount
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some((value * 100.0).round() as i64)
}

/// Scan text for a currency-marked price. `None` when nothing confident
/// is found; bare numbers are ignored.
pub fn extract_price(text: &str) -> Option<PriceMatch> {
    if let Some(caps) = SYMBOL_PRICE.captures(text) {
        let cents = amount_to_cents(caps.name("num")?.as_str())?;
        let currency = symbol_currency(caps.name("sym")?.as_str());
        return Some(PriceMatch {
            cents,
            currency: Some(currency.to_string()),
        });
    }

    let caps = CODE_PRICE.captures(text)?;
    Some(PriceMatch {
        cents: amount_to_cents(caps.name("num")?.as_str())?,
        currency: Some(caps.name("code")?.as_str().to_uppercase()),
    })
}

/// Price from an element already known to hold a price (`itemprop="price"`,
/// `data-price`, `product:price:amount`). Accepts bare numbers.
pub fn price_from_labelled(text: &str) -> Option<PriceMatch> {
    if let Some(found) = extract_price(text) {
        return Some(found);
    }
    let caps = BARE_AMOUNT.captures(text)?;
    Some(PriceMatch {
        cents: amount_to_cents(caps.name("num")?.as_str())?,
        currency: None,
    })
}

/// Price from a JSON-LD value (number or numeric string) to minor units.
pub fn json_price_to_cents(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => {
            let amount = n.as_f64()?;
            (amount >= 0.0).then(|| (amount * 100.0).round() as i64)
        }
        Value::String(s) => price_from_labelled(s).map(|p| p.cents),
        _ => None,
    }
}
