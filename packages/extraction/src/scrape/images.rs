//! Candidate product image discovery.

use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

use crate::types::config::ScraperConfig;

/// Selectors that usually wrap the main product gallery, best first.
const PRODUCT_IMAGE_SELECTORS: &[&str] = &[
    r#"[itemprop="image"]"#,
    "[data-zoom-image]",
    ".product-gallery img",
    ".product-images img",
    ".product-image img",
    ".product__media img",
    ".woocommerce-product-gallery img",
    "#product-image img",
    ".product-photo img",
    ".gallery img",
    "picture source[srcset]",
];

/// Substrings in a `src` or `class` that mark site chrome rather than a
/// product photo.
const EXCLUDED_MARKERS: &[&str] = &[
    "logo",
    "icon",
    "sprite",
    "placeholder",
    "spinner",
    "loading",
    "avatar",
    "badge",
    "pixel",
];

/// Attributes checked for an image URL, in order.
const IMAGE_ATTRS: &[&str] = &[
    "data-zoom-image",
    "data-large_image",
    "data-src",
    "content",
    "src",
    "href",
];

/// Collects absolute, deduplicated image URLs up to a cap.
struct ImageCollector<'a> {
    base: &'a Url,
    cap: usize,
    seen: HashSet<String>,
    urls: Vec<String>,
}

impl<'a> ImageCollector<'a> {
    fn new(base: &'a Url, cap: usize) -> Self {
        Self {
            base,
            cap,
            seen: HashSet::new(),
            urls: Vec::new(),
        }
    }

    fn is_full(&self) -> bool {
        self.urls.len() >= self.cap
    }

    fn push(&mut self, raw: &str) {
        if self.is_full() {
            return;
        }
        let raw = raw.trim();
        if raw.is_empty() || raw.starts_with("data:") {
            return;
        }
        let Ok(resolved) = self.base.join(raw) else {
            return;
        };
        if !matches!(resolved.scheme(), "http" | "https") {
            return;
        }
        let url = resolved.to_string();
        if self.seen.insert(url.clone()) {
            self.urls.push(url);
        }
    }
}

/// Largest candidate in a `srcset` ("a.jpg 480w, b.jpg 1080w").
pub fn best_srcset_candidate(srcset: &str) -> Option<&str> {
    srcset
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split_whitespace();
            let url = parts.next()?;
            let size = parts
                .next()
                .and_then(|d| d.trim_end_matches(['w', 'x']).parse::<f64>().ok())
                .unwrap_or(1.0);
            Some((url, size))
        })
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(url, _)| url)
}

fn element_image_url(element: &ElementRef<'_>) -> Option<String> {
    let attrs = element.value();
    for name in IMAGE_ATTRS {
        if let Some(value) = attrs.attr(name) {
            if !value.trim().is_empty() {
                return Some(value.to_string());
            }
        }
    }
    attrs
        .attr("srcset")
        .or_else(|| attrs.attr("data-srcset"))
        .and_then(best_srcset_candidate)
        .map(String::from)
}

fn looks_like_chrome(element: &ElementRef<'_>, url: &str) -> bool {
    let class = element.value().attr("class").unwrap_or("").to_lowercase();
    let url = url.to_lowercase();
    EXCLUDED_MARKERS
        .iter()
        .any(|marker| url.contains(marker) || class.contains(marker))
}

fn declared_too_small(element: &ElementRef<'_>, min: u32) -> bool {
    ["width", "height"].iter().any(|attr| {
        element
            .value()
            .attr(attr)
            .and_then(|v| v.trim().trim_end_matches("px").parse::<u32>().ok())
            .is_some_and(|v| v < min)
    })
}

/// Find product images.
///
/// `preferred` (JSON-LD and `og:image` URLs) come first, then the product
/// gallery selectors until `selector_image_target` is reached. Only when
/// neither yields anything are plain `<img>` tags scanned, skipping chrome
/// and images declared smaller than `min_image_dimension`.
pub fn extract_images(
    document: &Html,
    base: &Url,
    preferred: &[String],
    config: &ScraperConfig,
) -> Vec<String> {
    let mut collector = ImageCollector::new(base, config.max_images);

    for url in preferred {
        collector.push(url);
    }

    for selector in PRODUCT_IMAGE_SELECTORS {
        if collector.urls.len() >= config.selector_image_target || collector.is_full() {
            break;
        }
        let Ok(selector) = Selector::parse(selector) else {
            continue;
        };
        for element in document.select(&selector) {
            if let Some(url) = element_image_url(&element) {
                if !looks_like_chrome(&element, &url) {
                    collector.push(&url);
                }
            }
        }
    }

    if collector.urls.is_empty() {
        if let Ok(img) = Selector::parse("img") {
            for element in document.select(&img) {
                if collector.is_full() {
                    break;
                }
                let Some(url) = element_image_url(&element) else {
                    continue;
                };
                if looks_like_chrome(&element, &url)
                    || declared_too_small(&element, config.min_image_dimension)
                {
                    continue;
                }
                collector.push(&url);
            }
        }
    }

    collector.urls
}
