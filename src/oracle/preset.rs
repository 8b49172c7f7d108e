//! Named oracle presets selectable from the CLI and config

use std::fmt;

use crate::market::orderbook::OrderBook;
use crate::oracle::reducer::{
    oracle_price, reduce, Strategy, DEFAULT_ORACLE_HOURS, DEFAULT_ORACLE_RATIO,
};
use crate::oracle::window::{Horizon, StatHistory};
use crate::types::RankFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OraclePreset {
    /// Top 30% volume-weighted average over 48h
    Default48h,
    Top30Avg48h,
    Bottom30Avg48h,
    /// Lowest live sell price on the book right now
    CurrentLowestSell,
}

impl OraclePreset {
    pub const ALL: [OraclePreset; 4] = [
        OraclePreset::Default48h,
        OraclePreset::Top30Avg48h,
        OraclePreset::Bottom30Avg48h,
        OraclePreset::CurrentLowestSell,
    ];

    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "default_oracle_price_48h" => Some(OraclePreset::Default48h),
            "top_30%_avg_in_48h" => Some(OraclePreset::Top30Avg48h),
            "bottom_30%_avg_in_48h" => Some(OraclePreset::Bottom30Avg48h),
            "cur_lowest_price" => Some(OraclePreset::CurrentLowestSell),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OraclePreset::Default48h => "default_oracle_price_48h",
            OraclePreset::Top30Avg48h => "top_30%_avg_in_48h",
            OraclePreset::Bottom30Avg48h => "bottom_30%_avg_in_48h",
            OraclePreset::CurrentLowestSell => "cur_lowest_price",
        }
    }

    /// Quote a fair price for one good. 0 means unknown.
    pub fn quote(&self, history: &StatHistory, book: &OrderBook, ranks: &RankFilter) -> f64 {
        let last_48h = || history.window(Horizon::LastHours(DEFAULT_ORACLE_HOURS), None, ranks);
        match self {
            OraclePreset::Default48h => oracle_price(history, ranks),
            OraclePreset::Top30Avg48h => reduce(&last_48h(), Strategy::TopKAvg, DEFAULT_ORACLE_RATIO),
            OraclePreset::Bottom30Avg48h => {
                reduce(&last_48h(), Strategy::BottomKAvg, DEFAULT_ORACLE_RATIO)
            }
            OraclePreset::CurrentLowestSell => {
                let lowest = book.lowest_live_sell(ranks);
                if lowest.is_finite() {
                    lowest
                } else {
                    0.0
                }
            }
        }
    }
}

impl Default for OraclePreset {
    fn default() -> Self {
        OraclePreset::Default48h
    }
}

impl fmt::Display for OraclePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Order, Seller, SellerStatus, Side, TimestampedStat};
    use chrono::{Duration, Utc};

    fn sell(price: u32, status: SellerStatus) -> Order {
        Order {
            good_id: "g".to_string(),
            side: Side::Sell,
            visible: true,
            price,
            quantity: 1,
            rank: 0,
            seller: Seller {
                id: format!("s{}", price),
                display_name: format!("Seller{}", price),
                slug: format!("seller{}", price),
                reputation: 0,
                status,
            },
        }
    }

    #[test]
    fn presets_parse_by_name() {
        for preset in OraclePreset::ALL {
            assert_eq!(OraclePreset::from_name(preset.name()), Some(preset));
        }
        assert_eq!(OraclePreset::from_name("ducats"), None);
    }

    #[test]
    fn lowest_sell_preset_reads_the_book() {
        let book = OrderBook::new(vec![
            sell(15, SellerStatus::InGame),
            sell(9, SellerStatus::Offline),
            sell(12, SellerStatus::InGame),
        ]);
        let history = StatHistory::default();
        let price = OraclePreset::CurrentLowestSell.quote(&history, &book, &RankFilter::base());
        assert_eq!(price, 12.0);

        let empty = OrderBook::new(vec![]);
        let price = OraclePreset::CurrentLowestSell.quote(&history, &empty, &RankFilter::base());
        assert_eq!(price, 0.0);
    }

    #[test]
    fn bottom_preset_is_not_above_top_preset() {
        let basis = Utc::now();
        let hourly: Vec<TimestampedStat> = (1..=10)
            .map(|h| TimestampedStat {
                timestamp: basis - Duration::hours(h),
                volume: h as u64,
                median_price: 10.0 + h as f64,
                rank: 0,
            })
            .collect();
        let history = StatHistory::new(hourly, vec![]);
        let book = OrderBook::new(vec![]);
        let ranks = RankFilter::base();
        let top = OraclePreset::Top30Avg48h.quote(&history, &book, &ranks);
        let bottom = OraclePreset::Bottom30Avg48h.quote(&history, &book, &ranks);
        assert!(bottom <= top);
        assert_eq!(top, OraclePreset::Default48h.quote(&history, &book, &ranks));
    }
}
