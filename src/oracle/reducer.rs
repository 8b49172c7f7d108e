//! Price Reducer - Collapses a statistics window into one fair price
//!
//! Every bucket carries a median trade price and a trade count. The
//! volume-weighted strategies count each bucket as `volume` trades at its
//! median, so a busy hour outweighs a quiet one. Buckets are weighted, never
//! expanded, so cost grows with the number of buckets only.

use std::cmp::Ordering;
use std::fmt;

use crate::oracle::window::{Horizon, StatHistory};
use crate::types::{RankFilter, TimestampedStat};

/// Hourly buckets used by the default oracle price
pub const DEFAULT_ORACLE_HOURS: u32 = 48;

/// Fraction of the most expensive trades kept by the default oracle price
pub const DEFAULT_ORACLE_RATIO: f64 = 0.3;

/// Reduction strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Mean of bucket medians, ignoring volume
    AvgMedian,
    /// Mean of the most expensive `ratio` share of volume-expanded prices
    TopKAvg,
    /// Mean of the cheapest `ratio` share of volume-expanded prices
    BottomKAvg,
    /// Median of the most expensive `ratio` share of volume-expanded prices
    TopKMedian,
}

impl Strategy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "avg_median" => Some(Strategy::AvgMedian),
            "top_k_avg" => Some(Strategy::TopKAvg),
            "bottom_k_avg" => Some(Strategy::BottomKAvg),
            "top_k_median" => Some(Strategy::TopKMedian),
            _ => None,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::AvgMedian => write!(f, "avg_median"),
            Strategy::TopKAvg => write!(f, "top_k_avg"),
            Strategy::BottomKAvg => write!(f, "bottom_k_avg"),
            Strategy::TopKMedian => write!(f, "top_k_median"),
        }
    }
}

/// Reduce a window to a single price.
///
/// Returns 0 for an empty window. That 0 means "no data", not "free": check
/// for it before using the value economically. `ratio` is ignored by
/// [`Strategy::AvgMedian`].
pub fn reduce(window: &[TimestampedStat], strategy: Strategy, ratio: f64) -> f64 {
    if window.is_empty() {
        return 0.0;
    }

    let kept = match strategy {
        Strategy::AvgMedian => return weighted_mean(&unweighted(window)),
        Strategy::TopKAvg | Strategy::TopKMedian => keep_share(weighted(window), ratio, true),
        Strategy::BottomKAvg => keep_share(weighted(window), ratio, false),
    };
    let kept = if kept.is_empty() { unweighted(window) } else { kept };

    match strategy {
        Strategy::TopKMedian => weighted_median(kept),
        _ => weighted_mean(&kept),
    }
}

/// The price used by default everywhere: volume-weighted mean of the top 30%
/// trade prices over the last 48 hourly buckets.
pub fn oracle_price(history: &StatHistory, ranks: &RankFilter) -> f64 {
    let window = history.window(Horizon::LastHours(DEFAULT_ORACLE_HOURS), None, ranks);
    reduce(&window, Strategy::TopKAvg, DEFAULT_ORACLE_RATIO)
}

/// `(price, weight)` pairs, one per bucket, weight 1
fn unweighted(window: &[TimestampedStat]) -> Vec<(f64, u64)> {
    window.iter().map(|s| (s.median_price, 1)).collect()
}

/// `(price, weight)` pairs weighted by trade count; empty buckets dropped
fn weighted(window: &[TimestampedStat]) -> Vec<(f64, u64)> {
    window
        .iter()
        .filter(|s| s.volume > 0)
        .map(|s| (s.median_price, s.volume))
        .collect()
}

/// Number of trades kept out of `total`: `floor(total * ratio)`, capped at `total`
fn kept_count(total: u64, ratio: f64) -> u64 {
    if ratio.is_nan() || ratio <= 0.0 {
        return 0;
    }
    let count = (total as f64 * ratio).floor();
    if count >= total as f64 {
        total
    } else {
        count as u64
    }
}

fn sort_by_price(pairs: &mut [(f64, u64)], descending: bool) {
    pairs.sort_by(|a, b| {
        let ord = a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal);
        if descending {
            ord.reverse()
        } else {
            ord
        }
    });
}

/// Keep the `ratio` share of trades from the expensive (or cheap) end.
/// The bucket on the boundary contributes only part of its weight.
fn keep_share(mut pairs: Vec<(f64, u64)>, ratio: f64, descending: bool) -> Vec<(f64, u64)> {
    let total: u64 = pairs.iter().map(|&(_, w)| w).sum();
    let mut remaining = kept_count(total, ratio);

    sort_by_price(&mut pairs, descending);
    let mut kept = Vec::new();
    for (price, weight) in pairs {
        if remaining == 0 {
            break;
        }
        let take = weight.min(remaining);
        kept.push((price, take));
        remaining -= take;
    }
    kept
}

fn weighted_mean(pairs: &[(f64, u64)]) -> f64 {
    let total: f64 = pairs.iter().map(|&(_, w)| w as f64).sum();
    if total == 0.0 {
        return 0.0;
    }
    pairs.iter().map(|&(p, w)| p * w as f64).sum::<f64>() / total
}

/// Median of the expanded multiset; the mean of the two middle values for
/// even counts
fn weighted_median(mut pairs: Vec<(f64, u64)>) -> f64 {
    let total: u64 = pairs.iter().map(|&(_, w)| w).sum();
    if total == 0 {
        return 0.0;
    }
    sort_by_price(&mut pairs, false);

    // price at 0-based position `k` of the expanded, ascending sequence
    let nth = |k: u64| {
        let mut seen = 0u64;
        for &(price, weight) in &pairs {
            seen += weight;
            if k < seen {
                return price;
            }
        }
        pairs.last().map(|&(p, _)| p).unwrap_or(0.0)
    };

    let mid = total / 2;
    if total % 2 == 0 {
        (nth(mid - 1) + nth(mid)) / 2.0
    } else {
        nth(mid)
    }
}
