//! Market Types - Payloads of the warframe.market feeds
//!
//! Wire records are decoded with serde and converted into the core records at
//! the boundary, so a malformed payload fails here and never reaches the
//! oracle or the matcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::RecordError;
use crate::oracle::StatHistory;
use crate::types::{Order, Seller, SellerStatus, Side, TimestampedStat};

/// `{"data": ...}` envelope of the v2 API
#[derive(Debug, Clone, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

/// `{"payload": ...}` envelope of the v1 API
#[derive(Debug, Clone, Deserialize)]
pub struct PayloadEnvelope<T> {
    pub payload: T,
}

/// Order as delivered by `/v2/orders/item/{slug}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub item_id: String,
    #[serde(rename = "type")]
    pub order_type: String,
    pub visible: bool,
    pub platinum: u32,
    pub quantity: u32,
    #[serde(default, alias = "mod_rank")]
    pub rank: Option<i32>,
    pub user: UserRecord,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub ingame_name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub reputation: i64,
    pub status: String,
}

impl OrderRecord {
    /// Convert into a core [`Order`]; `index` is only used in error messages
    pub fn into_order(self, index: usize) -> Result<Order, RecordError> {
        let side = Side::from_wire(&self.order_type).ok_or_else(|| RecordError::UnknownSide {
            index,
            value: self.order_type.clone(),
        })?;
        let status =
            SellerStatus::from_wire(&self.user.status).ok_or_else(|| RecordError::UnknownStatus {
                index,
                value: self.user.status.clone(),
            })?;
        if self.quantity == 0 {
            return Err(RecordError::ZeroQuantity { index });
        }

        Ok(Order {
            good_id: self.item_id,
            side,
            visible: self.visible,
            price: self.platinum,
            quantity: self.quantity,
            rank: self.rank.unwrap_or(0),
            seller: Seller {
                id: self.user.id,
                display_name: self.user.ingame_name,
                slug: self.user.slug.unwrap_or_default(),
                reputation: self.user.reputation,
                status,
            },
        })
    }
}

/// Decode the body of an order feed response
pub fn decode_orders(body: &str) -> Result<Vec<Order>, RecordError> {
    let envelope: DataEnvelope<Vec<OrderRecord>> = serde_json::from_str(body)?;
    envelope
        .data
        .into_iter()
        .enumerate()
        .map(|(index, record)| record.into_order(index))
        .collect()
}

/// One closed-trade bucket from `/v1/items/{slug}/statistics`
#[derive(Debug, Clone, Deserialize)]
pub struct StatRecord {
    pub datetime: String,
    pub volume: u64,
    pub median: f64,
    #[serde(default)]
    pub mod_rank: Option<i32>,
}

impl StatRecord {
    pub fn into_stat(self, index: usize) -> Result<TimestampedStat, RecordError> {
        let timestamp = DateTime::parse_from_rfc3339(&self.datetime)
            .map_err(|source| RecordError::Timestamp {
                index,
                value: self.datetime.clone(),
                source,
            })?
            .with_timezone(&Utc);
        if !self.median.is_finite() {
            return Err(RecordError::NonFiniteMedian { index });
        }
        Ok(TimestampedStat {
            timestamp,
            volume: self.volume,
            median_price: self.median,
            rank: self.mod_rank.unwrap_or(0),
        })
    }
}

/// Hourly and daily series; either may be absent or short
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatSeries {
    #[serde(rename = "48hours", default)]
    pub hourly: Vec<StatRecord>,
    #[serde(rename = "90days", default)]
    pub daily: Vec<StatRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatisticsPayload {
    #[serde(default)]
    pub statistics_closed: StatSeries,
}

impl StatisticsPayload {
    pub fn into_history(self) -> Result<StatHistory, RecordError> {
        let convert = |records: Vec<StatRecord>| -> Result<Vec<TimestampedStat>, RecordError> {
            records
                .into_iter()
                .enumerate()
                .map(|(index, r)| r.into_stat(index))
                .collect()
        };
        let hourly = convert(self.statistics_closed.hourly)?;
        let daily = convert(self.statistics_closed.daily)?;
        Ok(StatHistory::new(hourly, daily))
    }
}

/// Decode the body of a statistics response
pub fn decode_statistics(body: &str) -> Result<StatHistory, RecordError> {
    let envelope: PayloadEnvelope<StatisticsPayload> = serde_json::from_str(body)?;
    envelope.payload.into_history()
}

/// Localized names of a catalog entry
#[derive(Debug, Clone, Default, Deserialize)]
pub struct I18nRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub thumb: Option<String>,
}

/// Catalog entry from `/v2/items`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRecord {
    pub id: String,
    pub slug: String,
    #[serde(default)]
    pub game_ref: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub max_rank: Option<i32>,
    #[serde(default)]
    pub i18n: HashMap<String, I18nRecord>,
}

/// Tradeable good known to the market
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Opaque market id, matches `Order::good_id`
    pub id: String,
    pub slug: String,
    pub name: String,
    pub game_ref: Option<String>,
    pub tags: Vec<String>,
    /// Present only for rank-bearing goods (mods, arcanes)
    pub max_rank: Option<i32>,
    pub thumb: Option<String>,
    pub icon: Option<String>,
}

impl CatalogItem {
    pub fn is_rank_bearing(&self) -> bool {
        self.max_rank.is_some()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Item page on the public site
    pub fn market_url(&self, site_url: &str) -> String {
        format!("{}/items/{}", site_url.trim_end_matches('/'), self.slug)
    }
}

impl From<CatalogRecord> for CatalogItem {
    fn from(mut r: CatalogRecord) -> Self {
        let en = r.i18n.remove("en").unwrap_or_default();
        Self {
            name: en.name.unwrap_or_else(|| r.slug.clone()),
            id: r.id,
            slug: r.slug,
            game_ref: r.game_ref,
            tags: r.tags,
            max_rank: r.max_rank,
            thumb: en.thumb,
            icon: en.icon,
        }
    }
}

/// Decode the body of a catalog response
pub fn decode_catalog(body: &str) -> Result<Vec<CatalogItem>, RecordError> {
    let envelope: DataEnvelope<Vec<CatalogRecord>> = serde_json::from_str(body)?;
    Ok(envelope.data.into_iter().map(CatalogItem::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RankFilter;
    use crate::oracle::Horizon;

    const ORDERS: &str = r#"{
        "apiVersion": "0.20.0",
        "data": [
            {
                "id": "o1", "type": "sell", "platinum": 8, "quantity": 5, "visible": true,
                "itemId": "54aae292e7798909064f1575",
                "user": {"id": "u1", "ingameName": "Ordis", "slug": "ordis",
                         "reputation": 42, "status": "ingame", "platform": "pc"}
            },
            {
                "id": "o2", "type": "buy", "platinum": 6, "quantity": 1, "visible": false,
                "rank": 3, "itemId": "54aae292e7798909064f1575",
                "user": {"id": "u2", "ingameName": "Lotus", "status": "offline"}
            }
        ]
    }"#;

    #[test]
    fn decodes_v2_orders() {
        let orders = decode_orders(ORDERS).unwrap();
        assert_eq!(orders.len(), 2);

        let sell = &orders[0];
        assert_eq!(sell.side, Side::Sell);
        assert_eq!(sell.price, 8);
        assert_eq!(sell.quantity, 5);
        assert_eq!(sell.rank, 0);
        assert!(sell.is_live());
        assert_eq!(sell.seller.display_name, "Ordis");
        assert_eq!(sell.seller.reputation, 42);

        let buy = &orders[1];
        assert_eq!(buy.side, Side::Buy);
        assert_eq!(buy.rank, 3);
        assert_eq!(buy.seller.slug, "");
        assert_eq!(buy.seller.status, SellerStatus::Offline);
    }

    #[test]
    fn malformed_orders_are_hard_failures() {
        let unknown_type = ORDERS.replace(r#""type": "buy""#, r#""type": "trade""#);
        assert!(matches!(
            decode_orders(&unknown_type),
            Err(RecordError::UnknownSide { index: 1, .. })
        ));

        let unknown_status = ORDERS.replace(r#""status": "offline""#, r#""status": "away""#);
        assert!(matches!(
            decode_orders(&unknown_status),
            Err(RecordError::UnknownStatus { index: 1, .. })
        ));

        let zero = ORDERS.replace(r#""quantity": 5"#, r#""quantity": 0"#);
        assert!(matches!(decode_orders(&zero), Err(RecordError::ZeroQuantity { index: 0 })));

        let missing_price = ORDERS.replace(r#""platinum": 8, "#, "");
        assert!(matches!(decode_orders(&missing_price), Err(RecordError::Payload(_))));
    }

    #[test]
    fn decodes_statistics_with_partial_series() {
        let body = r#"{"payload": {"statistics_closed": {
            "48hours": [
                {"datetime": "2024-07-29T07:00:00.000+00:00", "volume": 2, "median": 10,
                 "min_price": 9, "max_price": 11, "avg_price": 10.0, "id": "a"},
                {"datetime": "2024-07-29T08:00:00.000+00:00", "volume": 1, "median": 20.5,
                 "mod_rank": 5, "id": "b"}
            ]
        }}}"#;
        let history = decode_statistics(body).unwrap();
        assert_eq!(history.hourly().len(), 2);
        assert!(history.daily().is_empty());
        assert_eq!(history.hourly()[1].rank, 5);
        assert_eq!(history.hourly()[1].median_price, 20.5);

        let basis = DateTime::parse_from_rfc3339("2024-07-29T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let window = history.window(Horizon::LastHours(48), Some(basis), &RankFilter::base());
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn empty_statistics_payload_is_valid() {
        let history = decode_statistics(r#"{"payload": {}}"#).unwrap();
        assert!(history.is_empty());
    }

    #[test]
    fn bad_statistics_timestamp_is_rejected() {
        let body = r#"{"payload": {"statistics_closed": {"90days": [
            {"datetime": "yesterday", "volume": 2, "median": 10}
        ]}}}"#;
        assert!(matches!(
            decode_statistics(body),
            Err(RecordError::Timestamp { index: 0, .. })
        ));
    }

    #[test]
    fn decodes_catalog_entries() {
        let body = r#"{"data": [
            {"id": "62a2baebfbd62c00450b71d9", "slug": "molt_augmented",
             "gameRef": "/Lotus/Upgrades/CosmeticEnhancers/Offensive/PowerStrengthOnKill",
             "tags": ["rare", "arcane_enhancement"], "bulkTradable": true, "maxRank": 5,
             "i18n": {"en": {"name": "Molt Augmented", "thumb": "items/images/en/thumbs/molt.png"}}},
            {"id": "54aae292e7798909064f1575", "slug": "loyal_companion", "tags": ["mod"],
             "i18n": {"en": {"name": "Loyal Companion"}}}
        ]}"#;
        let items = decode_catalog(body).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Molt Augmented");
        assert!(items[0].is_rank_bearing());
        assert!(items[0].has_tag("arcane_enhancement"));
        assert!(!items[1].is_rank_bearing());
        assert_eq!(
            items[1].market_url("https://warframe.market"),
            "https://warframe.market/items/loyal_companion"
        );
    }
}
