//! Order Book - Queryable view over the resting orders of one good
//!
//! Liveness (`visible && in game`) is checked inside every query rather than
//! at construction, so the same book can be queried with or without it.

use std::cmp::Reverse;

use crate::types::{Order, RankFilter, Side};

/// Resting orders for one good
#[derive(Debug, Clone, Default)]
pub struct OrderBook {
    orders: Vec<Order>,
    live_only: bool,
}

impl OrderBook {
    /// Book whose queries only see live orders
    pub fn new(orders: Vec<Order>) -> Self {
        Self {
            orders,
            live_only: true,
        }
    }

    /// Book whose queries see every order regardless of visibility or presence
    pub fn including_hidden(orders: Vec<Order>) -> Self {
        Self {
            orders,
            live_only: false,
        }
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    fn eligible<'a>(
        &'a self,
        side: Side,
        ranks: &'a RankFilter,
    ) -> impl Iterator<Item = &'a Order> + 'a {
        self.orders.iter().filter(move |o| {
            o.side == side && (!self.live_only || o.is_live()) && ranks.contains(o.rank)
        })
    }

    /// Live sell orders with a rank in `ranks`
    pub fn live_sells<'a>(&'a self, ranks: &'a RankFilter) -> impl Iterator<Item = &'a Order> + 'a {
        self.eligible(Side::Sell, ranks)
    }

    /// Live buy orders with a rank in `ranks`
    pub fn live_buys<'a>(&'a self, ranks: &'a RankFilter) -> impl Iterator<Item = &'a Order> + 'a {
        self.eligible(Side::Buy, ranks)
    }

    /// Cheapest live sell price, `+inf` if there is none
    pub fn lowest_live_sell(&self, ranks: &RankFilter) -> f64 {
        self.live_sells(ranks)
            .map(|o| o.price)
            .min()
            .map(f64::from)
            .unwrap_or(f64::INFINITY)
    }

    /// Most generous live buy price, `-inf` if there is none
    pub fn highest_live_buy(&self, ranks: &RankFilter) -> f64 {
        self.live_buys(ranks)
            .map(|o| o.price)
            .max()
            .map(f64::from)
            .unwrap_or(f64::NEG_INFINITY)
    }

    /// The `k` cheapest live sells as `(price, quantity)`, ascending
    pub fn bottom_k_sell(&self, k: usize, ranks: &RankFilter) -> Vec<(u32, u32)> {
        let mut ladder: Vec<(u32, u32)> = self
            .live_sells(ranks)
            .map(|o| (o.price, o.quantity))
            .collect();
        ladder.sort_unstable();
        ladder.truncate(k);
        ladder
    }

    /// The `k` most generous live buys as `(price, quantity)`, descending
    pub fn top_k_buy(&self, k: usize, ranks: &RankFilter) -> Vec<(u32, u32)> {
        let mut ladder: Vec<(u32, u32)> = self
            .live_buys(ranks)
            .map(|o| (o.price, o.quantity))
            .collect();
        ladder.sort_unstable_by_key(|&level| Reverse(level));
        ladder.truncate(k);
        ladder
    }
}
