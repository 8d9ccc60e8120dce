//! Model tier selection.

use crate::types::config::{ExtractionConfig, ModelTier};

/// Pick a tier from estimated content size and product count.
///
/// A forced tier always wins. Otherwise content above
/// `large_content_threshold` chars or more than `many_products_threshold`
/// products selects the capable tier; everything else stays on the fast one.
pub fn select_tier(content_len: usize, product_count: usize, config: &ExtractionConfig) -> ModelTier {
    if let Some(forced) = config.forced_tier {
        return forced;
    }
    if content_len > config.large_content_threshold
        || product_count > config.many_products_threshold
    {
        ModelTier::Capable
    } else {
        ModelTier::Fast
    }
}
