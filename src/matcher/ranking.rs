//! Option ranking for presentation

use std::cmp::Ordering;

use super::MatchResult;
use crate::types::TradeOption;

/// Best `best_n` options by ascending total variation, ties broken by the
/// cheaper bundle. Single-good options can be hidden.
pub fn rank_options(
    result: &MatchResult,
    best_n: usize,
    ignore_single_item_sellers: bool,
) -> Vec<&TradeOption> {
    let mut ranked: Vec<&TradeOption> = result
        .options
        .iter()
        .filter(|o| !ignore_single_item_sellers || o.good_count() > 1)
        .collect();

    ranked.sort_by(|a, b| {
        a.total_variation
            .partial_cmp(&b.total_variation)
            .unwrap_or(Ordering::Equal)
            .then(a.total_price.cmp(&b.total_price))
    });
    ranked.truncate(best_n);
    ranked
}
