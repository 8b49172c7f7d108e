//! Trade Matcher - Per-seller bundle construction against fair prices
//!
//! Given a shopping list, a fair price per good and the live sell offers of
//! every requested good, builds candidate bundles seller by seller:
//! - Cheaper-than-fair goods are all taken at once
//! - Pricier goods are added one unit at a time, least overpriced first
//!
//! The result is unordered. Picking the best options is left to
//! [`rank_options`].

mod message;
mod ranking;

pub use message::trade_message;
pub use ranking::rank_options;

use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace};

use crate::types::{
    GoodId, Order, RankFilter, SellerId, SellerInfo, TakenItem, TradeOption, DEFAULT_SITE_URL,
};

/// Output of one matching run
#[derive(Debug, Clone, Default)]
pub struct MatchResult {
    /// Metadata for every seller with at least one usable offer
    pub sellers: HashMap<SellerId, SellerInfo>,
    /// Candidate bundles across all sellers, unordered
    pub options: Vec<TradeOption>,
}

impl MatchResult {
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

/// Greedy per-seller trade matcher
#[derive(Debug, Clone)]
pub struct TradeMatcher {
    /// Site used to build seller profile links
    pub site_url: String,
    /// Ranks an offer must carry to be matched
    pub ranks: RankFilter,
}

impl Default for TradeMatcher {
    fn default() -> Self {
        // Rank-bearing goods are only ever matched at base rank
        Self {
            site_url: DEFAULT_SITE_URL.to_string(),
            ranks: RankFilter::base(),
        }
    }
}

/// Cheapest offer of one seller for one good
struct SellerOffer<'a> {
    order: &'a Order,
    desired: u32,
}

impl TradeMatcher {
    pub fn new(site_url: impl Into<String>) -> Self {
        Self {
            site_url: site_url.into(),
            ..Self::default()
        }
    }

    /// Build candidate trade options.
    ///
    /// Entries of `want` with a non-positive quantity, or for a good absent
    /// from `live_offers`, are dropped. A good without a fair price is priced
    /// at 0, which makes every offer for it look overpriced.
    pub fn match_trades(
        &self,
        want: &HashMap<GoodId, i64>,
        fair_price: &HashMap<GoodId, f64>,
        live_offers: &HashMap<GoodId, Vec<Order>>,
    ) -> MatchResult {
        let wanted: BTreeMap<&GoodId, u32> = want
            .iter()
            .filter_map(|(good, &qty)| {
                if qty <= 0 || !live_offers.contains_key(good) {
                    debug!(good = %good, quantity = qty, "Dropping request entry");
                    return None;
                }
                Some((good, u32::try_from(qty).unwrap_or(u32::MAX)))
            })
            .collect();

        let fair: BTreeMap<&GoodId, f64> = wanted
            .keys()
            .map(|&good| {
                let price = fair_price.get(good).copied().unwrap_or_else(|| {
                    debug!(good = %good, "No fair price, using 0");
                    0.0
                });
                (good, price)
            })
            .collect();

        let mut result = MatchResult::default();
        let mut seller_order: Vec<&SellerId> = Vec::new();
        let mut per_seller: HashMap<&SellerId, BTreeMap<&GoodId, SellerOffer<'_>>> = HashMap::new();

        for (&good, &desired) in &wanted {
            let offers = live_offers.get(good).map(Vec::as_slice).unwrap_or_default();
            for order in offers.iter().filter(|o| self.accepts(o)) {
                let seller = &order.seller.id;
                let goods = per_seller.entry(seller).or_insert_with(|| {
                    seller_order.push(seller);
                    result
                        .sellers
                        .insert(seller.clone(), SellerInfo::from_seller(&order.seller, &self.site_url));
                    BTreeMap::new()
                });

                match goods.get_mut(good) {
                    Some(best) => {
                        if (order.price, order.quantity) < (best.order.price, best.order.quantity) {
                            best.order = order;
                        }
                    }
                    None => {
                        goods.insert(good, SellerOffer { order, desired });
                    }
                }
            }
        }

        for seller in seller_order {
            if let Some(goods) = per_seller.get(seller) {
                let before = result.options.len();
                build_options(seller, goods, &fair, &mut result.options);
                trace!(seller = %seller, options = result.options.len() - before, "Seller matched");
            }
        }

        debug!(
            goods = wanted.len(),
            sellers = result.sellers.len(),
            options = result.options.len(),
            "Matching complete"
        );
        result
    }

    fn accepts(&self, order: &Order) -> bool {
        order.is_sell() && order.is_live() && order.quantity > 0 && self.ranks.contains(order.rank)
    }
}

/// Match with the default matcher
pub fn match_trades(
    want: &HashMap<GoodId, i64>,
    fair_price: &HashMap<GoodId, f64>,
    live_offers: &HashMap<GoodId, Vec<Order>>,
) -> MatchResult {
    TradeMatcher::default().match_trades(want, fair_price, live_offers)
}

fn build_options(
    seller: &SellerId,
    goods: &BTreeMap<&GoodId, SellerOffer<'_>>,
    fair: &BTreeMap<&GoodId, f64>,
    out: &mut Vec<TradeOption>,
) {
    let fair_of = |good: &GoodId| fair.get(good).copied().unwrap_or(0.0);

    let mut bundle: BTreeMap<GoodId, TakenItem> = BTreeMap::new();
    let mut positive: Vec<(&GoodId, &SellerOffer<'_>, f64)> = Vec::new();

    for (&good, offer) in goods {
        let variation = f64::from(offer.order.price) - fair_of(good);
        if variation <= 0.0 {
            bundle.insert(good.clone(), take(offer, offer.desired.min(offer.order.quantity)));
        } else {
            positive.push((good, offer, variation));
        }
    }

    if !bundle.is_empty() {
        out.push(option(seller, &bundle, &fair_of));
    }

    positive.sort_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal));

    for (good, offer, _) in positive {
        let limit = offer.desired.min(offer.order.quantity);
        for quantity in 1..=limit {
            bundle.insert(good.clone(), take(offer, quantity));
            out.push(option(seller, &bundle, &fair_of));
        }
    }
}

fn take(offer: &SellerOffer<'_>, quantity: u32) -> TakenItem {
    TakenItem {
        price: offer.order.price,
        quantity,
        rank: offer.order.rank,
    }
}

fn option(
    seller: &SellerId,
    items: &BTreeMap<GoodId, TakenItem>,
    fair_of: &impl Fn(&GoodId) -> f64,
) -> TradeOption {
    let total_price = items.values().map(TakenItem::cost).sum();
    let total_variation = items
        .iter()
        .map(|(good, item)| (f64::from(item.price) - fair_of(good)) * f64::from(item.quantity))
        .sum();
    TradeOption {
        seller_id: seller.clone(),
        items: items.clone(),
        total_price,
        total_variation,
    }
}
