//! Core types used throughout wfm-oracle
//!
//! Defines the records shared by the oracle, the order book and the matcher:
//! statistics buckets, resting orders, sellers and trade options.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;

/// Identifier of a tradeable good (the catalog slug, e.g. `"loyal_companion"`)
pub type GoodId = String;

/// Identifier of a seller account
pub type SellerId = String;

/// Public site used to build profile and item links
pub const DEFAULT_SITE_URL: &str = "https://warframe.market";

/// Order side (buy/sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Parse the feed's `type` field
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "buy" => Some(Side::Buy),
            "sell" => Some(Side::Sell),
            _ => None,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// Presence of the account that posted an order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SellerStatus {
    Offline,
    Online,
    InGame,
}

impl SellerStatus {
    /// Parse the feed's `user.status` field (`offline`, `online`, `ingame`)
    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "offline" => Some(SellerStatus::Offline),
            "online" => Some(SellerStatus::Online),
            "ingame" | "in_game" => Some(SellerStatus::InGame),
            _ => None,
        }
    }
}

impl fmt::Display for SellerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SellerStatus::Offline => write!(f, "offline"),
            SellerStatus::Online => write!(f, "online"),
            SellerStatus::InGame => write!(f, "in_game"),
        }
    }
}

/// Set of acceptable rank values for statistics and order queries.
///
/// Goods without ranks report rank 0, so the default filter `{0}` selects
/// them as well as the base rank of rank-bearing goods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RankFilter {
    /// Explicit list of ranks
    Only(Vec<i32>),
    /// Inclusive range of ranks
    Range(RangeInclusive<i32>),
}

impl RankFilter {
    /// Base rank only
    pub fn base() -> Self {
        RankFilter::Only(vec![0])
    }

    /// A single rank (e.g. the maxed rank of a mod)
    pub fn exactly(rank: i32) -> Self {
        RankFilter::Only(vec![rank])
    }

    /// Every rank
    pub fn any() -> Self {
        RankFilter::Range(i32::MIN..=i32::MAX)
    }

    pub fn contains(&self, rank: i32) -> bool {
        match self {
            RankFilter::Only(ranks) => ranks.contains(&rank),
            RankFilter::Range(range) => range.contains(&rank),
        }
    }
}

impl Default for RankFilter {
    fn default() -> Self {
        RankFilter::base()
    }
}

/// One aggregate statistics bucket (an hour or a day) for a good
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestampedStat {
    /// Bucket start, UTC
    pub timestamp: DateTime<Utc>,
    /// Number of closed trades in the bucket
    pub volume: u64,
    /// Median trade price in the bucket
    pub median_price: f64,
    /// Rank the bucket refers to (0 if not rank-bearing)
    pub rank: i32,
}

/// Account that posted an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seller {
    pub id: SellerId,
    pub display_name: String,
    pub slug: String,
    pub reputation: i64,
    pub status: SellerStatus,
}

impl Seller {
    /// Profile page on the public site
    pub fn profile_url(&self, site_url: &str) -> Option<String> {
        if self.slug.is_empty() {
            None
        } else {
            Some(format!(
                "{}/profile/{}",
                site_url.trim_end_matches('/'),
                self.slug
            ))
        }
    }
}

/// A resting order for one good
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Good identifier as delivered by the order feed
    pub good_id: String,
    pub side: Side,
    pub visible: bool,
    /// Price in platinum
    pub price: u32,
    /// Number of units offered, always > 0
    pub quantity: u32,
    pub rank: i32,
    pub seller: Seller,
}

impl Order {
    pub fn is_sell(&self) -> bool {
        self.side == Side::Sell
    }

    pub fn is_buy(&self) -> bool {
        self.side == Side::Buy
    }

    /// Tradeable right now: visible and the poster is in game
    pub fn is_live(&self) -> bool {
        self.visible && self.seller.status == SellerStatus::InGame
    }
}

/// Seller metadata attached to a match result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellerInfo {
    pub display_name: String,
    pub reputation: i64,
    pub status: SellerStatus,
    pub slug: String,
    pub profile_url: Option<String>,
}

impl SellerInfo {
    pub fn from_seller(seller: &Seller, site_url: &str) -> Self {
        Self {
            display_name: seller.display_name.clone(),
            reputation: seller.reputation,
            status: seller.status,
            slug: seller.slug.clone(),
            profile_url: seller.profile_url(site_url),
        }
    }
}

/// One good inside a trade option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TakenItem {
    pub price: u32,
    pub quantity: u32,
    pub rank: i32,
}

impl TakenItem {
    pub fn cost(&self) -> u64 {
        u64::from(self.price) * u64::from(self.quantity)
    }
}

/// Candidate bundle to buy from a single seller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeOption {
    pub seller_id: SellerId,
    pub items: BTreeMap<GoodId, TakenItem>,
    /// Sum of `price * quantity`
    pub total_price: u64,
    /// Sum of `(price - fair_price) * quantity`; negative is cheaper than fair
    pub total_variation: f64,
}

impl TradeOption {
    /// Number of distinct goods in the bundle
    pub fn good_count(&self) -> usize {
        self.items.len()
    }

    /// Total units across all goods
    pub fn unit_count(&self) -> u64 {
        self.items.values().map(|i| u64::from(i.quantity)).sum()
    }
}
