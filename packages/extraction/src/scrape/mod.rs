//! Page scraper.
//!
//! Fetches a vendor URL and pulls best-effort product data out of the HTML:
//! JSON-LD first, then Open Graph, then named meta tags, then CSS-selector
//! heuristics. Failures come back as `Err(FetchError)`; callers that want the
//! degraded `ScrapeResult` form use [`PageScraper::scrape_or_degraded`].

pub mod images;
pub mod metadata;
pub mod price;

use futures::future::join_all;
use scraper::{Html, Selector};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{FetchError, FetchResult};
use crate::http::parse_http_url;
use crate::traits::fetcher::{FetchLimits, Fetcher};
use crate::types::config::ScraperConfig;
use crate::types::scrape::{DownloadedImage, ScrapeResult, StructuredData};

use self::price::PriceMatch;

/// Elements whose text never reaches `raw_text`.
const INVISIBLE_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "svg", "head"];

const PRICE_SELECTORS: &[&str] = &[
    r#"[itemprop="price"]"#,
    "[data-price]",
    r#"[class*="price"]"#,
];

const DESCRIPTION_SELECTORS: &[&str] = &[
    r#"[itemprop="description"]"#,
    ".product-description",
    "#product-description",
    ".description",
    "#description",
];

/// Add `https://` to bare hosts ("vendor.example/p/1").
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else if let Some(rest) = trimmed.strip_prefix("//") {
        format!("https://{}", rest)
    } else {
        format!("https://{}", trimmed)
    }
}

/// Vendor page scraper over an injected [`Fetcher`].
pub struct PageScraper {
    fetcher: Arc<dyn Fetcher>,
    config: ScraperConfig,
}

impl PageScraper {
    pub fn new(fetcher: Arc<dyn Fetcher>, config: ScraperConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Fetch and parse one page within the configured timeout.
    pub async fn scrape(&self, url: &str) -> FetchResult<ScrapeResult> {
        let url = normalize_url(url);
        parse_http_url(&url)?;

        // Upper bound on HTML we are willing to parse
        let limits = FetchLimits::new(self.config.timeout, 5 * 1024 * 1024);
        let response = self.fetcher.get(&url, limits).await?;

        let page_url = Url::parse(&response.url)
            .or_else(|_| Url::parse(&url))
            .map_err(|_| FetchError::InvalidUrl { url: url.clone() })?;

        let html = response.text();
        let mut result = parse_product_page(&html, &page_url, &self.config);
        result.url = url;

        debug!(
            url = %result.url,
            name = ?result.name,
            price_cents = ?result.price_cents,
            images = result.images.len(),
            has_json_ld = result.structured.json_ld.is_some(),
            "Scraped vendor page"
        );

        Ok(result)
    }

    /// Like [`scrape`](Self::scrape) but never fails: errors become a
    /// result carrying only `url` and `error`.
    pub async fn scrape_or_degraded(&self, url: &str) -> ScrapeResult {
        match self.scrape(url).await {
            Ok(result) => result,
            Err(e) => {
                warn!(url = %url, error = %e, "Scrape failed");
                ScrapeResult::from(&e)
            }
        }
    }

    /// Scrape several URLs, `batch_size` at a time with `batch_delay`
    /// between batches. Results keep input order.
    pub async fn scrape_batch(&self, urls: &[String]) -> Vec<FetchResult<ScrapeResult>> {
        let batch_size = self.config.batch_size.max(1);
        let mut results = Vec::with_capacity(urls.len());

        for (i, batch) in urls.chunks(batch_size).enumerate() {
            if i > 0 && !self.config.batch_delay.is_zero() {
                tokio::time::sleep(self.config.batch_delay).await;
            }
            debug!(batch = i, size = batch.len(), "Scraping batch");
            results.extend(join_all(batch.iter().map(|url| self.scrape(url))).await);
        }

        info!(
            urls = urls.len(),
            failed = results.iter().filter(|r| r.is_err()).count(),
            "Batch scrape finished"
        );
        results
    }

    /// Download one image for re-upload. Rejects non-image content types.
    pub async fn download_image(&self, url: &str) -> FetchResult<DownloadedImage> {
        let limits = FetchLimits::new(self.config.image_timeout, self.config.max_image_bytes);
        let response = self.fetcher.get(url, limits).await?;

        let content_type = response
            .content_type
            .as_deref()
            .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_lowercase())
            .unwrap_or_default();
        if !content_type.starts_with("image/") {
            return Err(FetchError::NotAnImage {
                url: url.to_string(),
                content_type: if content_type.is_empty() {
                    "unknown".to_string()
                } else {
                    content_type
                },
            });
        }

        let size = response.body.len();
        Ok(DownloadedImage {
            bytes: response.body,
            content_type,
            size,
        })
    }
}

fn first_text(document: &Html, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|s| {
        let selector = Selector::parse(s).ok()?;
        document.select(&selector).find_map(|el| {
            let text = collapse_whitespace(&el.text().collect::<String>());
            (!text.is_empty()).then_some(text)
        })
    })
}

fn heuristic_price(document: &Html) -> Option<PriceMatch> {
    PRICE_SELECTORS.iter().find_map(|s| {
        let selector = Selector::parse(s).ok()?;
        document.select(&selector).find_map(|el| {
            let attrs = el.value();
            if let Some(found) = attrs
                .attr("content")
                .or_else(|| attrs.attr("data-price"))
                .and_then(price::price_from_labelled)
            {
                return Some(found);
            }
            let text = el.text().collect::<String>();
            if attrs.attr("itemprop") == Some("price") {
                price::price_from_labelled(&text)
            } else {
                price::extract_price(&text)
            }
        })
    })
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Visible body text, whitespace-collapsed and cut to `max_chars`.
fn visible_text(document: &Html, max_chars: usize) -> String {
    let root = Selector::parse("body")
        .ok()
        .and_then(|s| document.select(&s).next())
        .unwrap_or_else(|| document.root_element());

    let mut pieces = Vec::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| INVISIBLE_ELEMENTS.contains(&e.name()))
        });
        if hidden {
            continue;
        }
        let text = text.trim();
        if !text.is_empty() {
            pieces.push(text);
        }
    }

    collapse_whitespace(&pieces.join(" "))
        .chars()
        .take(max_chars)
        .collect()
}

/// Base for relative links: `<base href>` if present, else the page URL.
fn base_url(document: &Html, page_url: &Url) -> Url {
    Selector::parse("base[href]")
        .ok()
        .and_then(|s| document.select(&s).next())
        .and_then(|el| el.value().attr("href"))
        .and_then(|href| page_url.join(href).ok())
        .unwrap_or_else(|| page_url.clone())
}

/// Extract product data from fetched HTML. Pure; no I/O.
pub fn parse_product_page(html: &str, page_url: &Url, config: &ScraperConfig) -> ScrapeResult {
    let document = Html::parse_document(html);
    let base = base_url(&document, page_url);

    let objects = metadata::json_ld_objects(&document);
    let json_ld = metadata::choose_json_ld(&objects).cloned();
    let product = json_ld.as_ref().filter(|v| metadata::is_product(v));
    let og = metadata::open_graph(&document);
    let meta = metadata::named_meta(&document);

    let ld_text = |key: &str| product.and_then(|p| metadata::text_field(p, key));
    let og_text = |key: &str| og.get(key).cloned();
    let meta_text = |key: &str| meta.get(key).cloned();

    let name = ld_text("name")
        .or_else(|| og_text("og:title"))
        .or_else(|| meta_text("twitter:title"))
        .or_else(|| first_text(&document, &["h1", "title"]));

    let description = ld_text("description")
        .or_else(|| og_text("og:description"))
        .or_else(|| meta_text("description"))
        .or_else(|| meta_text("twitter:description"))
        .or_else(|| first_text(&document, DESCRIPTION_SELECTORS));

    let og_price = ["product:price:amount", "og:price:amount"]
        .iter()
        .find_map(|k| og.get(*k))
        .and_then(|p| price::price_from_labelled(p))
        .map(|found| {
            let currency = ["product:price:currency", "og:price:currency"]
                .iter()
                .find_map(|k| og.get(*k).cloned())
                .or(found.currency);
            (found.cents, currency)
        });

    let (price_cents, currency) = product
        .and_then(metadata::json_ld_offer)
        .or(og_price)
        .or_else(|| heuristic_price(&document).map(|p| (p.cents, p.currency)))
        .map(|(cents, currency)| (Some(cents), currency))
        .unwrap_or((None, None));

    let brand = ld_text("brand")
        .or_else(|| og_text("product:brand"))
        .or_else(|| meta_text("brand"));

    let sku = ld_text("sku")
        .or_else(|| ld_text("mpn"))
        .or_else(|| first_text(&document, &[r#"[itemprop="sku"]"#]));

    let category = ld_text("category").or_else(|| og_text("product:category"));

    let mut preferred = product.map(metadata::json_ld_images).unwrap_or_default();
    preferred.extend(og_text("og:image"));
    preferred.extend(og_text("og:image:secure_url"));
    let images = images::extract_images(&document, &base, &preferred, config);

    ScrapeResult {
        url: page_url.to_string(),
        name,
        description,
        price_cents,
        currency,
        images,
        brand,
        sku,
        category,
        raw_text: visible_text(&document, config.max_raw_text_chars),
        structured: StructuredData {
            json_ld,
            open_graph: og,
            meta,
        },
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockFetcher;
    use std::time::Duration;

    const PRODUCT_PAGE: &str = r#"<!doctype html>
<html><head>
  <title>Aria Frameless Door | Acme Glass</title>
  <meta property="og:title" content="Aria OG Title">
  <meta property="og:image" content="https://cdn.acme.example/aria-og.jpg">
  <meta name="description" content="Meta description">
  <script type="application/ld+json">
  {"@context":"https://schema.org","@type":"Product","name":"Aria Frameless Door",
   "description":"3/8 inch tempered glass","sku":"AR-36","brand":{"name":"Acme"},
   "image":"/media/aria.jpg","offers":{"price":"1295.00","priceCurrency":"USD"}}
  </script>
  <style>.price{color:red}</style>
</head><body>
  <h1>Aria Frameless Door</h1>
  <div class="price">$1,295.00</div>
  <script>var tracking = 1;</script>
  <p>Hand-built in   Minnesota.</p>
</body></html>"#;

    fn page_url() -> Url {
        Url::parse("https://acme.example/doors/aria").unwrap()
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("acme.example/x"), "https://acme.example/x");
        assert_eq!(normalize_url(" http://acme.example "), "http://acme.example");
        assert_eq!(normalize_url("//acme.example"), "https://acme.example");
    }

    #[test]
    fn test_json_ld_wins() {
        let result = parse_product_page(PRODUCT_PAGE, &page_url(), &ScraperConfig::default());
        assert_eq!(result.name.as_deref(), Some("Aria Frameless Door"));
        assert_eq!(result.description.as_deref(), Some("3/8 inch tempered glass"));
        assert_eq!(result.price_cents, Some(129_500));
        assert_eq!(result.currency.as_deref(), Some("USD"));
        assert_eq!(result.brand.as_deref(), Some("Acme"));
        assert_eq!(result.sku.as_deref(), Some("AR-36"));
        assert_eq!(
            result.images,
            vec![
                "https://acme.example/media/aria.jpg",
                "https://cdn.acme.example/aria-og.jpg",
            ]
        );
        assert!(result.structured.json_ld.is_some());
        assert!(!result.is_failed());
    }

    #[test]
    fn test_raw_text_skips_scripts_and_is_bounded() {
        let result = parse_product_page(PRODUCT_PAGE, &page_url(), &ScraperConfig::default());
        assert!(result.raw_text.contains("Hand-built in Minnesota."));
        assert!(!result.raw_text.contains("tracking"));
        assert!(!result.raw_text.contains("color:red"));

        let config = ScraperConfig {
            max_raw_text_chars: 10,
            ..Default::default()
        };
        let short = parse_product_page(PRODUCT_PAGE, &page_url(), &config);
        assert_eq!(short.raw_text.chars().count(), 10);
    }

    #[test]
    fn test_heuristics_as_last_resort() {
        let html = r#"<html><head><title>Fallback Title</title></head><body>
            <h1>  Series 500   Slider </h1>
            <span class="product-price">Sale: $899.99</span>
            <div class="description">Bypass slider with soft-close.</div>
        </body></html>"#;
        let result = parse_product_page(html, &page_url(), &ScraperConfig::default());
        assert_eq!(result.name.as_deref(), Some("Series 500 Slider"));
        assert_eq!(result.price_cents, Some(89_999));
        assert_eq!(
            result.description.as_deref(),
            Some("Bypass slider with soft-close.")
        );
        assert!(result.structured.is_empty());
    }

    #[test]
    fn test_open_graph_before_meta() {
        let html = r#"<html><head>
            <meta property="og:title" content="OG Door">
            <meta property="product:price:amount" content="450">
            <meta property="product:price:currency" content="CAD">
            <meta name="description" content="Meta only">
        </head><body><h1>H1 Door</h1></body></html>"#;
        let result = parse_product_page(html, &page_url(), &ScraperConfig::default());
        assert_eq!(result.name.as_deref(), Some("OG Door"));
        assert_eq!(result.description.as_deref(), Some("Meta only"));
        assert_eq!(result.price_cents, Some(45_000));
        assert_eq!(result.currency.as_deref(), Some("CAD"));
    }

    #[test]
    fn test_base_href_resolves_images() {
        let html = r#"<html><head><base href="https://static.acme.example/p/"></head>
            <body><div class="product-gallery"><img src="door.jpg"></div></body></html>"#;
        let result = parse_product_page(html, &page_url(), &ScraperConfig::default());
        assert_eq!(result.images, vec!["https://static.acme.example/p/door.jpg"]);
    }

    #[tokio::test]
    async fn test_http_500_is_soft_failure() {
        let fetcher = Arc::new(MockFetcher::new().with_status("https://acme.example/x", 500));
        let scraper = PageScraper::new(fetcher, ScraperConfig::default());

        let err = scraper.scrape("https://acme.example/x").await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 500, .. }));

        let degraded = scraper.scrape_or_degraded("https://acme.example/x").await;
        assert!(degraded.is_failed());
        assert!(degraded.images.is_empty());
        assert_eq!(degraded.url, "https://acme.example/x");
    }

    #[tokio::test]
    async fn test_timeout_is_soft_failure() {
        let fetcher = Arc::new(MockFetcher::new().with_timeout("https://acme.example/slow"));
        let scraper = PageScraper::new(fetcher, ScraperConfig::default());

        let degraded = scraper.scrape_or_degraded("https://acme.example/slow").await;
        assert!(degraded.error.unwrap().contains("timeout"));
        assert!(degraded.images.is_empty());
    }

    #[tokio::test]
    async fn test_scrape_via_fetcher() {
        let fetcher = Arc::new(MockFetcher::new().with_html("https://acme.example/doors/aria", PRODUCT_PAGE));
        let scraper = PageScraper::new(fetcher.clone(), ScraperConfig::default());

        let result = scraper.scrape("acme.example/doors/aria").await.unwrap();

        assert_eq!(result.url, "https://acme.example/doors/aria");
        assert_eq!(result.price_cents, Some(129_500));
        assert_eq!(fetcher.requested(), vec!["https://acme.example/doors/aria"]);
    }

    #[tokio::test]
    async fn test_batch_preserves_order_and_isolates_failures() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .with_html("https://a.example/", "<h1>A</h1>")
                .with_status("https://b.example/", 404)
                .with_html("https://c.example/", "<h1>C</h1>")
                .with_html("https://d.example/", "<h1>D</h1>"),
        );
        let scraper = PageScraper::new(
            fetcher,
            ScraperConfig::default().with_batch_delay(Duration::from_millis(1)),
        );
        let urls: Vec<String> = ["a", "b", "c", "d"]
            .iter()
            .map(|h| format!("https://{}.example/", h))
            .collect();

        let results = scraper.scrape_batch(&urls).await;

        assert_eq!(results.len(), 4);
        assert_eq!(results[0].as_ref().unwrap().name.as_deref(), Some("A"));
        assert!(results[1].is_err());
        assert_eq!(results[3].as_ref().unwrap().name.as_deref(), Some("D"));
    }

    /// Serves a small page after a short pause and records peak concurrency.
    #[derive(Default)]
    struct CountingFetcher {
        in_flight: std::sync::atomic::AtomicUsize,
        max_in_flight: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl crate::traits::fetcher::Fetcher for CountingFetcher {
        async fn get(
            &self,
            url: &str,
            _limits: crate::traits::fetcher::FetchLimits,
        ) -> FetchResult<crate::traits::fetcher::FetchedResponse> {
            use std::sync::atomic::Ordering;

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            Ok(crate::traits::fetcher::FetchedResponse::new(url, "<h1>Door</h1>")
                .with_content_type("text/html"))
        }
    }

    #[tokio::test]
    async fn test_batch_bounds_concurrency_and_waits_between_batches() {
        let fetcher = Arc::new(CountingFetcher::default());
        let delay = Duration::from_millis(100);
        let config = ScraperConfig::default().with_batch_delay(delay);
        let batch_size = config.batch_size;
        let scraper = PageScraper::new(fetcher.clone(), config);
        let urls: Vec<String> = (0..7)
            .map(|i| format!("https://vendor{}.example/door", i))
            .collect();

        let started = std::time::Instant::now();
        let results = scraper.scrape_batch(&urls).await;
        let elapsed = started.elapsed();

        assert_eq!(results.len(), 7);
        assert!(results.iter().all(|r| r.is_ok()));
        let peak = fetcher
            .max_in_flight
            .load(std::sync::atomic::Ordering::SeqCst);
        assert!(peak <= batch_size, "peak {} exceeds batch size {}", peak, batch_size);
        assert_eq!(batch_size, 3);
        // 7 urls in windows of 3 means two pauses
        assert!(elapsed >= delay * 2, "finished in {:?}", elapsed);
    }

    #[tokio::test]
    async fn test_download_rejects_non_images() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .with_html("https://acme.example/not-image", "<html></html>")
                .with_image("https://acme.example/door.png", "image/png", vec![1, 2, 3]),
        );
        let scraper = PageScraper::new(fetcher, ScraperConfig::default());

        let err = scraper
            .download_image("https://acme.example/not-image")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::NotAnImage { .. }));

        let image = scraper
            .download_image("https://acme.example/door.png")
            .await
            .unwrap();
        assert_eq!(image.size, 3);
        assert_eq!(image.extension(), "png");
    }
}
