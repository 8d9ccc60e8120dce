//! Page-range mini-language.
//!
//! `"1-5"`, `"1,3,5"`, `"1-3,7,9-10"`. Hyphen or en-dash separate a range.
//! Malformed tokens are skipped, never raised.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Ranges spanning more pages than this are treated as malformed.
const MAX_RANGE_SPAN: u32 = 10_000;

static PAGE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bpages?\s+(\d+(?:\s*[-–]\s*\d+)?(?:\s*,\s*\d+(?:\s*[-–]\s*\d+)?)*)")
        .expect("page reference regex is valid")
});

/// Expand a page-range string into ascending, deduplicated page numbers.
pub fn parse_page_range(input: &str) -> Vec<u32> {
    let mut pages = BTreeSet::new();

    for token in input.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        match token.split_once(['-', '–']) {
            Some((start, end)) => {
                let (Ok(start), Ok(end)) = (start.trim().parse::<u32>(), end.trim().parse::<u32>())
                else {
                    continue;
                };
                if start == 0 || end < start || end - start > MAX_RANGE_SPAN {
                    continue;
                }
                pages.extend(start..=end);
            }
            None => {
                if let Ok(page) = token.parse::<u32>() {
                    if page > 0 {
                        pages.insert(page);
                    }
                }
            }
        }
    }

    pages.into_iter().collect()
}

/// Find page references ("page 45", "pages 60-65", "Pages 1, 3–4") in free
/// text and expand them. Empty when the text names no pages.
pub fn page_references(instructions: &str) -> Vec<u32> {
    let mut pages = BTreeSet::new();
    for caps in PAGE_REFERENCE.captures_iter(instructions) {
        if let Some(range) = caps.get(1) {
            pages.extend(parse_page_range(range.as_str()));
        }
    }
    pages.into_iter().collect()
}
