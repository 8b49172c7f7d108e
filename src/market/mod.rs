//! Market module - warframe.market data access
//!
//! Wire decoding, the HTTP client, per-good order books and the versioned
//! snapshot that the oracle and matcher read from.

pub mod orderbook;
pub mod rest;
pub mod snapshot;
pub mod types;

pub use orderbook::OrderBook;
pub use rest::{MarketClient, MarketSource};
pub use snapshot::{
    GoodData, MarketSnapshot, RankQuotes, SnapshotStore, ARCANE_FUSION_COPIES, ARCANE_TAG,
};
pub use types::{decode_catalog, decode_orders, decode_statistics, CatalogItem};
